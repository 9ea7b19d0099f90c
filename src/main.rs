//! Command line front end: forward and inverse kinematics and camera projection for a
//! robot described in YAML or URDF.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rs_chain_kinematics::ik_solver::{IkSolver, SolverConfig, SolverMode};
use rs_chain_kinematics::pose::Pose;
use rs_chain_kinematics::robot::Robot;
use rs_chain_kinematics::urdf::from_urdf_file;
use rs_chain_kinematics::utils::{dump_joints, dump_pose, format_joints};
use rs_chain_kinematics::vec3::Vec3;

/// Kinematics of serial robot arms.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Robot description, YAML or URDF. The built-in six-axis arm is used if not given.
    #[arg(short, long, global = true)]
    robot: Option<PathBuf>,

    /// Tip link when reading URDF with several branches.
    #[arg(long, global = true)]
    tip: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pose of every link for the given joints.
    Fk {
        /// Joint angles in degrees, comma separated.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        joints: Vec<f64>,
    },

    /// Find joints that bring the hand to a position (and orientation, if given).
    Ik {
        /// Target position in meters: x,y,z
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        position: Vec<f64>,

        /// Target roll, pitch and yaw in degrees. Only the position is matched if omitted.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        rpy: Option<Vec<f64>>,

        /// Starting joints in degrees. Zero if omitted.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        seed: Option<Vec<f64>>,

        /// Random restarts if the seed does not converge.
        #[arg(long, default_value_t = 10)]
        restarts: usize,

        /// Seed of the random restarts.
        #[arg(long, default_value_t = 0)]
        random_seed: u64,
    },

    /// Project a world point into the image of the robot's camera.
    Project {
        /// Joint angles in degrees, comma separated.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        joints: Vec<f64>,

        /// World point in meters: x,y,z
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        point: Vec<f64>,
    },

    /// Walk through the built-in six-axis arm.
    Demo,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut robot = load_robot(cli.robot.as_ref(), cli.tip.as_deref())?;

    match cli.command {
        Commands::Fk { joints } => forward(&mut robot, &joints),
        Commands::Ik { position, rpy, seed, restarts, random_seed } => {
            inverse(&mut robot, &position, rpy.as_deref(), seed.as_deref(), restarts, random_seed)
        }
        Commands::Project { joints, point } => project(&mut robot, &joints, &point),
        Commands::Demo => demo(),
    }
}

fn load_robot(path: Option<&PathBuf>, tip: Option<&str>) -> Result<Robot> {
    let Some(path) = path else {
        return Robot::six_axis_arm().context("Built-in robot");
    };
    let is_urdf = path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("urdf") || e.eq_ignore_ascii_case("xacro"));
    let robot = if is_urdf {
        from_urdf_file(path, tip)
    } else {
        Robot::from_yaml_file(path)
    };
    let robot = robot.with_context(|| format!("Failed to read robot from {}", path.display()))?;
    info!("Loaded {} with {} joints", path.display(), robot.parameters.dof());
    Ok(robot)
}

fn radians(degrees: &[f64]) -> Vec<f64> {
    degrees.iter().map(|d| d.to_radians()).collect()
}

fn vec3(values: &[f64], what: &str) -> Result<Vec3> {
    match values {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => bail!("{} needs three values, got {}", what, values.len()),
    }
}

fn forward(robot: &mut Robot, joints: &[f64]) -> Result<()> {
    let hand = robot.jnt2pos(&radians(joints)).context("Forward kinematics")?;
    for (i, link) in robot.links().iter().enumerate() {
        println!("link {}:", i);
        println!("{}", link);
    }
    print!("hand: ");
    dump_pose(&hand);
    if robot.parameters.dof() >= 5 {
        println!("{}", robot.posture(&radians(joints))?);
    }
    Ok(())
}

fn inverse(robot: &mut Robot, position: &[f64], rpy: Option<&[f64]>, seed: Option<&[f64]>,
           restarts: usize, random_seed: u64) -> Result<()> {
    let p = vec3(position, "Position")?;
    let (target, mode) = match rpy {
        Some(rpy) => {
            let rpy = vec3(&radians(rpy), "Orientation")?;
            (Pose::from_xyz_rpy(p, rpy), SolverMode::Pose)
        }
        None => (Pose::from_xyz_rpy(p, Vec3::zeros()), SolverMode::Position),
    };
    let seed = seed.map(radians).unwrap_or_else(|| vec![0.0; robot.parameters.dof()]);

    robot.solver = SolverConfig { mode, ..robot.solver.clone() };
    let solver = IkSolver::new(robot.solver.clone());
    let mut rng = StdRng::seed_from_u64(random_seed);
    let solution = solver.solve_with_restarts(&robot.model(), &target, &seed, restarts, &mut rng)
        .context("Inverse kinematics")?;

    info!("Converged in {} iterations, position error {:.3e}, orientation error {:.3e}",
        solution.iterations, solution.position_error, solution.orientation_error);
    println!("joints (deg): {}", format_joints(&solution.joints));
    print!("hand: ");
    dump_pose(&robot.jnt2pos(&solution.joints)?);
    Ok(())
}

fn project(robot: &mut Robot, joints: &[f64], point: &[f64]) -> Result<()> {
    robot.jnt2pos(&radians(joints)).context("Forward kinematics")?;
    let camera = robot.camera()?.context("The robot has no camera")?;
    let uv = camera.world2image(&vec3(point, "Point")?).context("Projection")?;
    println!("u = {:.6}, v = {:.6}", uv.x, uv.y);
    Ok(())
}

fn demo() -> Result<()> {
    let mut robot = Robot::six_axis_arm()?;
    println!("Robot:\n{}", robot.parameters.to_yaml());

    let joints = [0.0, 0.3, 0.9, 0.0, 0.9, 0.0];
    print!("Joints (deg): ");
    dump_joints(&joints);
    let hand = robot.jnt2pos(&joints)?;
    print!("Hand: ");
    dump_pose(&hand);
    println!("{}", robot.posture(&joints)?);

    let solver = IkSolver::new(SolverConfig::default().with_mode(SolverMode::Pose));
    let solution = solver.solve(&robot.model(), &hand, &[0.1, 0.2, 0.7, 0.1, 0.8, 0.1])?;
    println!("Solved back from a nearby seed in {} iterations: {}",
             solution.iterations, format_joints(&solution.joints));

    if let Some(camera) = robot.camera()? {
        println!("Camera:\n{}", camera.mount);
        match camera.footprint(&Pose::identity()) {
            Ok(corners) => {
                println!("Camera view on the floor:");
                for corner in corners {
                    println!("  {}", corner);
                }
            }
            Err(e) => println!("The camera does not see the floor: {}", e),
        }
    }
    Ok(())
}

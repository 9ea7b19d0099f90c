//! Error handling for robot description loading

use std::fmt;
use std::io;

use crate::kinematic_error::KinematicError;

#[derive(Debug)]
pub enum ParameterError {
    IoError(io::Error),
    ParseError(String),
    MissingField(String),
    WrongAngle(String),
    InvalidLength { expected: usize, found: usize },
    XmlProcessingError(String),
    /// The description was read but does not form a valid chain
    Kinematics(KinematicError),
}

impl From<io::Error> for ParameterError {
    fn from(err: io::Error) -> Self {
        ParameterError::IoError(err)
    }
}

impl From<KinematicError> for ParameterError {
    fn from(err: KinematicError) -> Self {
        ParameterError::Kinematics(err)
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::IoError(err) => write!(f, "IO Error: {}", err),
            ParameterError::ParseError(msg) => write!(f, "Parse Error: {}", msg),
            ParameterError::WrongAngle(msg) => write!(f, "Wrong angle representation: {}", msg),
            ParameterError::MissingField(msg) => write!(f, "Missing Field: {}", msg),
            ParameterError::InvalidLength { expected, found } => {
                write!(f, "Invalid Length: expected {}, found {}", expected, found)
            }
            ParameterError::XmlProcessingError(msg) => write!(f, "XML Processing Error: {}", msg),
            ParameterError::Kinematics(err) => write!(f, "Invalid chain: {}", err),
        }
    }
}

impl std::error::Error for ParameterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParameterError::IoError(err) => Some(err),
            ParameterError::Kinematics(err) => Some(err),
            _ => None,
        }
    }
}

mod test_utils;
mod test_from_yaml;

//! Value parsers for CLI arguments

use std::fs;
use std::path::PathBuf;

use crate::jobs::parse_job_list;

/// The file must exist, be a regular file and be readable
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// A job list must name at least one job once split and trimmed.
///
/// Unknown names are accepted here; the manager warns about them.
pub fn validate_job_list(list: &str) -> Result<String, String> {
    if parse_job_list(list).is_empty() {
        return Err(format!(
            "Job list '{}' does not name any job. Use comma-separated names, e.g. cleanupcache,tmpstorecleanup",
            list
        ));
    }
    Ok(list.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn test_config_file_path() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(validate_config_file_path(path).unwrap(), file.path());

        let dir = tempdir().unwrap();
        let err = validate_config_file_path(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.contains("not a file"));

        let missing = dir.path().join("missing.toml");
        let err = validate_config_file_path(missing.to_str().unwrap()).unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_job_list() {
        assert_eq!(validate_job_list("a,b").unwrap(), "a,b");
        assert!(validate_job_list("nosuchjob").is_ok());
        assert!(validate_job_list("").is_err());
        assert!(validate_job_list(" ,, ").is_err());
    }
}

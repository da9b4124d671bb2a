use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use validator::ValidationError;

/// Largest permission value (setuid/setgid/sticky plus rwx bits)
const MAX_FILE_MODE: u32 = 0o7777;

/// Return error if command is not executable or not found in PATH
pub fn validate_command_executable(command: &OsStr) -> Result<PathBuf, ValidationError> {
    let command = command.to_str().ok_or_else(|| {
        let mut err = ValidationError::new("invalid_utf8");
        err.message = Some("command contains invalid UTF-8".into());
        err
    })?;

    let command = command.trim();
    if command.is_empty() {
        let mut err = ValidationError::new("empty");
        err.message = Some("command is empty".into());
        return Err(err);
    }

    which::which(command).map_err(|_| {
        let mut err = ValidationError::new("command_not_found");
        err.message =
            Some(format!("`{command:?}` command is not executable or not in PATH").into());
        err
    })
}

/// Return error if path is empty
pub fn validate_path_not_empty(path: &PathBuf) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        let mut err = ValidationError::new("empty");
        err.message = Some("destination path is empty".into());
        return Err(err);
    }
    Ok(())
}

/// Return error if mode has bits outside of the permission range
pub fn validate_file_mode(mode: u32) -> Result<(), ValidationError> {
    if mode > MAX_FILE_MODE {
        let mut err = ValidationError::new("invalid_mode");
        err.message = Some(format!("file mode {mode:o} exceeds {MAX_FILE_MODE:o}").into());
        return Err(err);
    }
    Ok(())
}

/// Return error if region is missing or blank
pub fn validate_region(region: Option<&str>) -> Result<&str, ValidationError> {
    match region.map(str::trim) {
        Some(region) if !region.is_empty() => Ok(region),
        _ => {
            let mut err = ValidationError::new("missing_region");
            err.message = Some("region is required for object store locators".into());
            Err(err)
        }
    }
}

/// Return error if path is an existing directory
pub fn validate_not_dir(path: &Path) -> Result<(), ValidationError> {
    if path.is_dir() {
        let mut err = ValidationError::new("is_dir");
        err.message = Some(format!("destination {path:?} is a directory").into());
        return Err(err);
    }
    Ok(())
}

/// Return error if the parent of path exists but is not a directory
pub fn validate_parent_is_dir(path: &Path) -> Result<(), ValidationError> {
    if let Some(parent) = path.parent()
        && parent.exists()
        && !parent.is_dir()
    {
        let mut err = ValidationError::new("parent_not_dir");
        err.message = Some(format!("parent of {path:?} is not a directory").into());
        return Err(err);
    }
    Ok(())
}

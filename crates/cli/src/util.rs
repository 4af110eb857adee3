use std::path::PathBuf;

// For argp::FromArgs
pub fn path_buf(value: &str) -> Result<PathBuf, String> {
    Ok(PathBuf::from(value))
}

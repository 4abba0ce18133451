use crate::error::RuntimeError;
use std::path::PathBuf;

/// `~/.cbreport/state`, where checkpoints and journals live unless the
/// caller picks another directory.
pub fn default_state_dir() -> Result<PathBuf, RuntimeError> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        RuntimeError::InitializationError("Could not determine home directory".to_string())
    })?;
    Ok(home_dir.join(".cbreport/state"))
}

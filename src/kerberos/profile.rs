//! The kinit password profile
//!
//! The password is stored base64-encoded in `~/.kinit_profile` with mode
//! 0600. The encoding keeps it out of casual view only; the file permission
//! is the actual protection.

use crate::error::{IoResultExt, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::fs;
use std::path::PathBuf;

/// Name of the profile file under the home directory
pub const PROFILE_NAME: &str = ".kinit_profile";

/// Path to the kinit profile for the current user
pub fn profile_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROFILE_NAME)
}

/// Encode and store the password, restricting the file to the owner
pub fn save_passwd(path: &PathBuf, passwd: &str) -> Result<()> {
    fs::write(path, BASE64.encode(passwd.as_bytes())).with_path(path)?;
    restrict_permissions(path)
}

/// Read back the stored password. Returns an empty string when no profile
/// exists.
pub fn read_passwd(path: &PathBuf) -> Result<String> {
    if !path.is_file() {
        return Ok(String::new());
    }
    restrict_permissions(path)?;
    let encoded = fs::read_to_string(path).with_path(path)?;
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| crate::error::DsutilError::ConfigError(format!(
            "corrupt kinit profile {}: {e}",
            path.display()
        )))?;
    String::from_utf8(bytes).map_err(|e| {
        crate::error::DsutilError::ConfigError(format!(
            "corrupt kinit profile {}: {e}",
            path.display()
        ))
    })
}

#[cfg(unix)]
fn restrict_permissions(path: &PathBuf) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).with_path(path)
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &PathBuf) -> Result<()> {
    Ok(())
}

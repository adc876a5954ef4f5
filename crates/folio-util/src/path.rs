//! Path utilities.

use std::path::PathBuf;

/// Get the folio configuration directory.
///
/// On Unix `~/.config/folio` wins when it exists, matching other CLI tools;
/// otherwise the platform config directory is used.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("folio");
            if xdg.exists() {
                return Some(xdg);
            }
        }
    }

    dirs::config_dir().map(|p| p.join("folio"))
}

/// Get the folio data directory (`~/.local/share/folio` on Linux).
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("folio"))
}

/// Get the folio logs directory.
pub fn logs_dir() -> Option<PathBuf> {
    data_dir().map(|p| p.join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_namespaced() {
        if let Some(dir) = data_dir() {
            assert!(dir.ends_with("folio"));
        }
        if let Some(dir) = logs_dir() {
            assert!(dir.ends_with("folio/logs"));
        }
        if let Some(dir) = config_dir() {
            assert!(dir.ends_with("folio"));
        }
    }
}

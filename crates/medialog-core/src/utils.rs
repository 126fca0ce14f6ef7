//! Utility functions shared across modules.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Characters stripped from names before they are used as folder names
pub const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>', '#', ','];

/// Remove every forbidden character from `name`.
///
/// # Examples
///
/// ```
/// use medialog_core::utils::strip_forbidden;
///
/// assert_eq!(strip_forbidden("Re:Zero"), "ReZero");
/// assert_eq!(strip_forbidden("a/b\\c"), "abc");
/// assert_eq!(strip_forbidden("Fate/stay night"), "Fatestay night");
/// ```
pub fn strip_forbidden(name: &str) -> String {
    name.chars()
        .filter(|c| !FORBIDDEN_NAME_CHARS.contains(c))
        .collect()
}

/// Recursively copy a directory
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)?;
    }

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

/// Move a directory, falling back to copy + delete when a plain rename is
/// not possible (e.g. across filesystems).
pub fn move_dir(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(
                "rename {} -> {} failed ({}), copying instead",
                src.display(),
                dst.display(),
                e
            );
            copy_dir_recursive(src, dst)?;
            fs::remove_dir_all(src)?;
            Ok(())
        }
    }
}

/// Empty a directory, creating it if needed.
pub fn reset_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Local timestamp used in export file names
pub fn file_stamp() -> String {
    chrono::Local::now().format("%Y.%m.%d-%H.%M.%S").to_string()
}

/*!
 * Filesystem helpers for dataset storage roots.
 */

use std::fs;
use std::io;
use std::path::Path;

/// Create `path`, creating at most `max_depth - 1` missing ancestors first
///
/// Unlike `fs::create_dir_all` this refuses to materialize deep trees under a
/// mistyped root: if more than `max_depth` levels are missing, the innermost
/// `create_dir` fails with `NotFound`. An existing directory is left untouched.
pub fn ensure_dir(path: &Path, max_depth: usize) -> io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() && max_depth > 1 {
            ensure_dir(parent, max_depth - 1)?;
        }
    }
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        // Lost a race with another creator
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Workspace Manager - run-scoped scratch directories
///
/// Every grading run owns exactly one directory under the scratch root,
/// named after a random token. The same token is embedded in the generated
/// source and class names so concurrent runs never collide.
///
/// Cleanup is guaranteed by `Drop`; `release()` may also be called
/// explicitly and is idempotent. Cleanup failures are logged, never
/// returned, so they cannot mask a verdict.

use crate::error::EngineError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const DIR_PREFIX: &str = "grade-";
const CLASS_PREFIX: &str = "Main_";

/// Random base36 token derived from a v4 UUID (25 chars max)
pub fn new_token() -> String {
    to_base36(Uuid::new_v4().as_u128())
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut buf = Vec::with_capacity(25);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

#[derive(Debug)]
pub struct Workspace {
    token: String,
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    /// Allocate a fresh directory under `scratch_root`.
    ///
    /// The directory is created with `create_dir` (not `create_dir_all`) so
    /// an existing directory with the same name is an error rather than a
    /// silently shared workspace.
    pub fn acquire(scratch_root: &Path) -> Result<Self, EngineError> {
        fs::create_dir_all(scratch_root).map_err(|source| EngineError::ScratchRoot {
            path: scratch_root.to_path_buf(),
            source,
        })?;

        let token = new_token();
        let dir = scratch_root.join(format!("{}{}", DIR_PREFIX, token));

        fs::create_dir(&dir).map_err(|source| EngineError::WorkspaceCreate {
            path: dir.clone(),
            source,
        })?;

        debug!(token = %token, dir = %dir.display(), "Workspace acquired");

        Ok(Self {
            token,
            dir,
            released: false,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entry-point class name for this run
    pub fn class_name(&self) -> String {
        format!("{}{}", CLASS_PREFIX, self.token)
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn write_file(&self, file_name: &str, contents: &str) -> Result<PathBuf, EngineError> {
        let path = self.path(file_name);
        fs::write(&path, contents).map_err(|source| EngineError::WriteFile {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Remove the workspace directory (best-effort, idempotent)
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(token = %self.token, "Workspace released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(token = %self.token, "Workspace already gone");
            }
            Err(e) => {
                warn!(
                    token = %self.token,
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to remove workspace"
                );
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}

/*!
 * Source tree enumeration
 */

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{KeyMode, SourceConfig, WalkErrorMode};
use crate::error::{Result, StashError};

/// One regular file found under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Object key the file is stored under
    pub key: String,
}

/// List every regular file under `root`, sorted by path
///
/// Symlinks are not followed. A `root` that is a file yields exactly that file.
/// A missing root is a configuration error.
pub fn collect_files(root: &Path, config: &SourceConfig) -> Result<Vec<SourceFile>> {
    let root_meta = std::fs::metadata(root).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            StashError::Config(format!("source path does not exist: {}", root.display()))
        } else {
            StashError::io(root, e)
        }
    })?;

    if root_meta.is_file() {
        let key = object_key(root, root, config.key_mode)?;
        return Ok(vec![SourceFile {
            path: root.to_path_buf(),
            key,
        }]);
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                match config.walk_errors {
                    WalkErrorMode::Skip => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                    WalkErrorMode::Abort => {
                        return Err(StashError::io(path, io::Error::from(e)));
                    }
                }
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let key = object_key(root, entry.path(), config.key_mode)?;
        files.push(SourceFile {
            path: entry.into_path(),
            key,
        });
    }

    debug!(root = %root.display(), files = files.len(), "source walk finished");
    Ok(files)
}

/// Object key for `path`, found while walking `root`
///
/// Keys always use `/` separators. In relative mode a file that is the root itself
/// is keyed by its file name.
pub fn object_key(root: &Path, path: &Path, mode: KeyMode) -> Result<String> {
    match mode {
        KeyMode::FullPath => Ok(join_components(path)),
        KeyMode::Relative => {
            let relative = path.strip_prefix(root).map_err(|_| {
                StashError::Config(format!(
                    "{} is not under source root {}",
                    path.display(),
                    root.display()
                ))
            })?;

            if relative.as_os_str().is_empty() {
                return path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        StashError::Config(format!("cannot derive a key for {}", path.display()))
                    });
            }
            Ok(join_components(relative))
        }
    }
}

fn join_components(path: &Path) -> String {
    let mut key = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => key.push('/'),
            Component::Prefix(prefix) => key.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::CurDir => {}
            other => {
                if !key.is_empty() && !key.ends_with('/') {
                    key.push('/');
                }
                key.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    key
}

//! 根目录约束与安全路径解析。
//!
//! Every target name is untrusted. `resolve` cleans it lexically against a
//! virtual root, then walks the components that already exist on disk and
//! re-checks containment after following each symlink.
//!
//! The check happens at resolve time only. A symlink swapped into place
//! between `resolve` and the subsequent create is not detected; callers
//! accept that window.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::ErrorKind;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("path escapes root directory")]
    PathEscape,
    #[error("name is empty or refers to the root directory")]
    InvalidName,
    #[error("could not inspect path: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// 创建（如缺失）并规范化根目录。
    pub async fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).await?;
        let root = fs::canonicalize(root).await?;
        if !fs::metadata(&root).await?.is_dir() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// 将不可信名称解析为根目录下的绝对路径。
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, ResolveError> {
        let relative = clean_name(name);
        if relative.as_os_str().is_empty() {
            return Err(ResolveError::InvalidName);
        }

        let mut resolved = self.root.clone();
        let mut components = relative.components();
        while let Some(component) = components.next() {
            let candidate = resolved.join(component);
            match fs::symlink_metadata(&candidate).await {
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    resolved = match fs::canonicalize(&candidate).await {
                        Ok(target) => target,
                        // Dangling link: rejected even when it names a path
                        // inside the root, since its target is unverifiable.
                        Err(err) if err.kind() == ErrorKind::NotFound => {
                            return Err(ResolveError::PathEscape);
                        }
                        Err(err) => return Err(err.into()),
                    };
                    if !resolved.starts_with(&self.root) {
                        return Err(ResolveError::PathEscape);
                    }
                }
                Ok(_) => resolved = candidate,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    resolved = candidate;
                    resolved.extend(components.by_ref());
                }
                Err(err) => return Err(err.into()),
            }
        }

        if resolved == self.root {
            return Err(ResolveError::InvalidName);
        }
        if !resolved.starts_with(&self.root) {
            return Err(ResolveError::PathEscape);
        }
        Ok(resolved)
    }
}

/// Lexical clean: leading separators and `.` are dropped, `..` pops the last
/// kept segment and stops at the virtual root.
fn clean_name(name: &str) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(segment) => cleaned.push(segment),
            Component::ParentDir => {
                cleaned.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    cleaned
}

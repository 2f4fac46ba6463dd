//! Build workspace directory

use std::path::{Path, PathBuf};

use crate::filesys::file::File;

/// Root of a build workspace. Descriptor names resolve relative to it.
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File named `name` inside the workspace
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }
}

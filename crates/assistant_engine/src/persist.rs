//! Atomic writes for canvas downloads and the client settings file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot create {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Creates `dir` (and its parents) unless it already exists as a directory.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let directory_error = |source: io::Error| PersistError::Directory {
        path: dir.to_path_buf(),
        source,
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PersistError::NotADirectory(dir.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(directory_error)
        }
        Err(err) => Err(directory_error(err)),
    }
}

/// Writes `{dir}/{filename}` through a temp file and a rename, so readers
/// never observe a half-written download or settings file.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let write_error = |source: io::Error| PersistError::Write {
            path: target.clone(),
            source,
        };
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(write_error)?;
        staged.write_all(content.as_ref()).map_err(write_error)?;
        staged.as_file_mut().sync_all().map_err(write_error)?;
        // The rename replaces an existing target in one step.
        staged
            .persist(&target)
            .map_err(|err| write_error(err.error))?;
        Ok(target)
    }
}

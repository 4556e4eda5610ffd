use std::fs;
use std::io::{self, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use crate::document::ProfileDocument;

/// File name of the generated profile, relative to the run's working directory.
///
/// There is one profile per working directory. Two client runs must not share a directory.
pub const PROFILE_FILE_NAME: &str = "profile.xml";

pub fn profile_path(dir: &Path) -> PathBuf {
    dir.join(PROFILE_FILE_NAME)
}

/// A profile written to disk, removed again when this is dropped.
#[derive(Debug)]
pub struct ProfileFile {
    path: PathBuf,
}

impl ProfileFile {
    /// Remove a profile left behind in `dir` by an earlier run. A missing file is not an error.
    pub fn remove_stale(dir: &Path) -> io::Result<()> {
        let path = profile_path(dir);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed stale profile '{}'", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Write `document` to `<dir>/profile.xml`.
    pub fn create(dir: &Path, document: &ProfileDocument) -> io::Result<Self> {
        let path = profile_path(dir);
        log::trace!("Writing profile to '{}'", path.display());

        let file = fs::File::create(&path)?;
        // From here on a partial file is cleaned up by the guard.
        let guard = Self { path };
        document.write(BufWriter::new(file))?;

        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileFile {
    fn drop(&mut self) {
        log::trace!("Removing profile '{}'", self.path.display());
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::error!(
                "Failed to remove profile '{}': {e}",
                self.path.display()
            ),
        }
    }
}

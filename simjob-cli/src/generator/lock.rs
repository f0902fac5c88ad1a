//! Exclusive lock on a route registry
//!
//! A `<routes_file>.lock` file created with `create_new` marks a generation
//! run in progress. The lock is released when dropped.

use simjob_core::SimJobError;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
}

impl RegistryLock {
    /// Takes the lock, failing with [`SimJobError::Conflict`] if it is held
    pub fn acquire(routes_file: &Path) -> Result<Self, SimJobError> {
        Self::acquire_with(routes_file, |file| writeln!(file, "{}", std::process::id()))
    }

    /// Takes the lock and lets `stamp` write the owner into the lock file
    ///
    /// The lock file is removed again if `stamp` fails.
    fn acquire_with(
        routes_file: &Path,
        stamp: impl FnOnce(&mut File) -> io::Result<()>,
    ) -> Result<Self, SimJobError> {
        let path = lock_path(routes_file);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SimJobError::file(parent, e))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(SimJobError::Conflict(format!(
                    "route registry {} is locked by another generator (remove {} if stale)",
                    routes_file.display(),
                    path.display()
                )));
            }
            Err(e) => return Err(SimJobError::file(&path, e)),
        };
        // Owns the file from here on so a failed stamp still removes it.
        let lock = Self { path };
        stamp(&mut file).map_err(|e| SimJobError::file(&lock.path, e))?;

        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// `routes.json` -> `routes.json.lock`
pub fn lock_path(routes_file: &Path) -> PathBuf {
    let mut name = OsString::from(routes_file.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

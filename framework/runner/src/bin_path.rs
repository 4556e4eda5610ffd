use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use crate::types::HarnessResult;

/// Environment variable to override the uperf binary.
pub const UPERF_PATH_ENV: &str = "UPERF_PATH";

const DEFAULT_BINARY: &str = "uperf";

/// Locate the uperf binary.
///
/// [`UPERF_PATH_ENV`] may hold either a path to the binary or a bare program name such as
/// `uperf-1.0.8`, which is looked up in `PATH`. When it is unset, `uperf` is looked up in `PATH`.
pub fn uperf_path() -> HarnessResult<PathBuf> {
    let path = match env::var(UPERF_PATH_ENV).ok().as_deref() {
        Some("") => bail!("'{UPERF_PATH_ENV}' set to empty string"),
        None => find_in_path(DEFAULT_BINARY)?,
        Some(name) if !name.contains(std::path::MAIN_SEPARATOR) => {
            log::debug!("'{UPERF_PATH_ENV}={name}' is not a path so looking in 'PATH'");
            find_in_path(name)?
        }
        Some(path) => check_override(Path::new(path))?,
    };

    log::info!("Using uperf at {}", path.display());
    Ok(path)
}

fn find_in_path(name: &str) -> HarnessResult<PathBuf> {
    which::which(name).with_context(|| {
        format!(
            "'{name}' not found in PATH. Install uperf (it needs to be on both the client and the server host) or set '{UPERF_PATH_ENV}' to the binary."
        )
    })
}

fn check_override(path: &Path) -> HarnessResult<PathBuf> {
    let metadata = std::fs::metadata(path).with_context(|| {
        format!(
            "uperf binary overridden with '{UPERF_PATH_ENV}={}' but that path can't be read",
            path.display()
        )
    })?;
    if !metadata.is_file() {
        bail!(
            "'{UPERF_PATH_ENV}={}' is not a file",
            path.display()
        );
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        if metadata.permissions().mode() & 0o111 == 0 {
            bail!(
                "'{UPERF_PATH_ENV}={}' is not executable",
                path.display()
            );
        }
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt as _;

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    /// Runs `f` with `PATH` and [`UPERF_PATH_ENV`] set, restoring both afterwards.
    fn with_env<T>(path: &Path, uperf_path: Option<&str>, f: impl FnOnce() -> T) -> T {
        let original_path: Option<OsString> = env::var_os("PATH");
        let original_uperf: Option<OsString> = env::var_os(UPERF_PATH_ENV);

        env::set_var("PATH", path);
        match uperf_path {
            Some(value) => env::set_var(UPERF_PATH_ENV, value),
            None => env::remove_var(UPERF_PATH_ENV),
        }

        let result = f();

        match original_path {
            Some(value) => env::set_var("PATH", value),
            None => env::remove_var("PATH"),
        }
        match original_uperf {
            Some(value) => env::set_var(UPERF_PATH_ENV, value),
            None => env::remove_var(UPERF_PATH_ENV),
        }
        result
    }

    #[cfg(unix)]
    fn install(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\necho 'uperf version 1.0.8'\n")
            .expect("failed to write uperf");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .expect("failed to set permissions");
        path
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn unset_override_finds_uperf_in_path() {
        let bin = TempDir::new().expect("failed to create temp dir");
        let expected = install(bin.path(), "uperf", 0o755);

        let found = with_env(bin.path(), None, uperf_path).expect("uperf not found");
        assert_eq!(found, expected);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn bare_name_override_is_looked_up_in_path() {
        let bin = TempDir::new().expect("failed to create temp dir");
        install(bin.path(), "uperf", 0o755);
        let pinned = install(bin.path(), "uperf-1.0.8", 0o755);

        let found = with_env(bin.path(), Some("uperf"), uperf_path).expect("uperf not found");
        assert_eq!(found, bin.path().join("uperf"));

        let found =
            with_env(bin.path(), Some("uperf-1.0.8"), uperf_path).expect("uperf not found");
        assert_eq!(found, pinned);
    }

    #[test]
    #[serial]
    fn missing_from_path_is_an_error() {
        let empty = TempDir::new().expect("failed to create temp dir");

        let err = with_env(empty.path(), None, uperf_path).unwrap_err();
        assert!(err.to_string().contains(UPERF_PATH_ENV));
    }

    #[test]
    #[serial]
    fn empty_override_is_an_error() {
        let empty = TempDir::new().expect("failed to create temp dir");
        assert!(with_env(empty.path(), Some(""), uperf_path).is_err());
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn override_path_is_used_as_given() {
        let install_dir = TempDir::new().expect("failed to create temp dir");
        let empty = TempDir::new().expect("failed to create temp dir");
        let uperf = install(install_dir.path(), "uperf", 0o755);
        let value = uperf.to_str().expect("temp path is not UTF-8");

        let found = with_env(empty.path(), Some(value), uperf_path).expect("uperf not found");
        assert_eq!(found, uperf);
    }

    #[test]
    #[serial]
    fn override_to_missing_file_is_an_error() {
        let empty = TempDir::new().expect("failed to create temp dir");
        let result = with_env(empty.path(), Some("/opt/uperf/bin/uperf-missing"), uperf_path);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn override_to_directory_is_an_error() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let value = dir.path().to_str().expect("temp path is not UTF-8");

        let err = with_env(dir.path(), Some(value), uperf_path).unwrap_err();
        assert!(err.to_string().contains("is not a file"));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn override_to_non_executable_is_an_error() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let uperf = install(dir.path(), "uperf", 0o644);
        let value = uperf.to_str().expect("temp path is not UTF-8");

        let err = with_env(dir.path(), Some(value), uperf_path).unwrap_err();
        assert!(err.to_string().contains("is not executable"));
    }
}

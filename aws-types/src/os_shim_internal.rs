/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Abstractions for testing code that interacts with the operating system:
//! - Reading environment variables
//! - Reading from and writing to the file system

use std::collections::HashMap;
use std::env::VarError;
use std::ffi::OsString;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// File system abstraction
///
/// Simple abstraction enabling in-memory mocking of the file system
///
/// # Example
/// Construct a file system which delegates to `tokio::fs`:
/// ```rust
/// let fs = aws_types::os_shim_internal::Fs::real();
/// ```
///
/// Construct an in-memory file system for testing:
/// ```rust
/// use std::collections::HashMap;
/// let fs = aws_types::os_shim_internal::Fs::from_map({
///     let mut map = HashMap::new();
///     map.insert("/home/.aws/config".to_string(), "[default]\nregion = us-east-1".into());
///     map
/// });
/// ```
#[derive(Clone, Debug)]
pub struct Fs(Arc<fs::Inner>);

impl Default for Fs {
    fn default() -> Self {
        Fs::real()
    }
}

impl Fs {
    /// Create `Fs` representing a real file system.
    pub fn real() -> Self {
        Fs(Arc::new(fs::Inner::Real))
    }

    /// Create `Fs` from a map of `OsString` to `Vec<u8>`.
    pub fn from_raw_map(fs: HashMap<OsString, Vec<u8>>) -> Self {
        Fs(Arc::new(fs::Inner::Fake(Mutex::new(fs))))
    }

    /// Create `Fs` from a map of `String` to `Vec<u8>`.
    pub fn from_map(data: HashMap<String, Vec<u8>>) -> Self {
        let fs = data.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::from_raw_map(fs)
    }

    /// Create a test filesystem from a slice of `(path, contents)` pairs.
    pub fn from_slice<'a>(files: &[(&'a str, &'a str)]) -> Self {
        let fs: HashMap<String, Vec<u8>> = files
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect();
        Self::from_map(fs)
    }

    /// Create a test filesystem rooted in real files
    ///
    /// Creates a test filesystem from the contents of `test_directory` rooted into `namespaced_to`.
    /// Writes land in the real directory, beneath `test_directory`.
    ///
    /// ```rust,no_run
    /// use aws_types::os_shim_internal::Fs;
    /// # async fn docs() {
    /// let fs = Fs::from_test_dir("my-test-dir/aws-config", "/Users/me/.aws");
    /// let config = fs.read_to_end("/Users/me/.aws/config").await.unwrap();
    /// # }
    /// ```
    pub fn from_test_dir(
        test_directory: impl Into<PathBuf>,
        namespaced_to: impl Into<PathBuf>,
    ) -> Self {
        Self(Arc::new(fs::Inner::Namespaced {
            real_path: test_directory.into(),
            namespaced_to: namespaced_to.into(),
        }))
    }

    /// Read the entire contents of a file
    ///
    /// _Note: This function is currently `async` primarily for forward compatibility. Currently,
    /// this function does not use Tokio (or any other runtime) to perform IO, the IO is performed
    /// directly within the function._
    pub async fn read_to_end(&self, path: impl AsRef<Path>) -> std::io::Result<Vec<u8>> {
        use fs::Inner;
        let path = path.as_ref();
        match self.0.as_ref() {
            Inner::Real => std::fs::read(path),
            Inner::Fake(fs) => fs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(path.as_os_str())
                .cloned()
                .ok_or_else(|| ErrorKind::NotFound.into()),
            Inner::Namespaced {
                real_path,
                namespaced_to,
            } => {
                let actual_path = path
                    .strip_prefix(namespaced_to)
                    .map_err(|_| std::io::Error::from(ErrorKind::NotFound))?;
                std::fs::read(real_path.join(actual_path))
            }
        }
    }

    /// Replace the contents of a file, creating missing parent directories.
    ///
    /// On a real file system the contents are written to a temporary sibling which is then renamed
    /// over `path`, so readers never observe a partially written file. On Unix the file is only
    /// readable by its owner.
    pub async fn write(
        &self,
        path: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
    ) -> std::io::Result<()> {
        use fs::Inner;
        let path = path.as_ref();
        match self.0.as_ref() {
            Inner::Real => write_atomic(path, contents.as_ref()).await,
            Inner::Fake(fs) => {
                fs.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(path.as_os_str().to_owned(), contents.as_ref().to_vec());
                Ok(())
            }
            Inner::Namespaced {
                real_path,
                namespaced_to,
            } => {
                let actual_path = path
                    .strip_prefix(namespaced_to)
                    .map_err(|_| std::io::Error::from(ErrorKind::NotFound))?;
                write_atomic(&real_path.join(actual_path), contents.as_ref()).await
            }
        }
    }
}

async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no file name"))?;
    tokio::fs::create_dir_all(parent).await?;

    let mut temp_name = OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(format!(".{:016x}.tmp", fastrand::u64(..)));
    let temp_path = parent.join(temp_name);

    let result = async {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&temp_path).await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, path).await
    }
    .await;
    if result.is_err() {
        if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
            tracing::debug!(path = ?temp_path, error = %cleanup, "failed to remove temporary file");
        }
    }
    result
}

mod fs {
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Debug)]
    pub(super) enum Inner {
        Real,
        Fake(Mutex<HashMap<OsString, Vec<u8>>>),
        Namespaced {
            real_path: PathBuf,
            namespaced_to: PathBuf,
        },
    }
}

/// Environment variable abstraction
///
/// Environment variables are global to a process, and, as such, are difficult to test with a multi-
/// threaded test runner like Rust's. This enables loading environment variables either from the
/// actual process environment ([`std::env::var`]) or from a hash map.
///
/// Process environments are cheap to clone:
/// - Faked process environments are wrapped in an internal Arc
/// - Real process environments are pointer-sized
#[derive(Clone, Debug)]
pub struct Env(Arc<env::Inner>);

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

impl Env {
    /// Retrieve a value for the given `k` and return `VarError` is that key is not present.
    pub fn get(&self, k: &str) -> Result<String, VarError> {
        use env::Inner;
        match self.0.as_ref() {
            Inner::Real => std::env::var(k),
            Inner::Fake(map) => map.get(k).cloned().ok_or(VarError::NotPresent),
        }
    }

    /// Create a fake process environment from a slice of tuples.
    ///
    /// # Example
    /// ```rust
    /// use aws_types::os_shim_internal::Env;
    /// let mock_env = Env::from_slice(&[
    ///     ("HOME", "/home/myname"),
    ///     ("AWS_PROFILE", "dev")
    /// ]);
    /// assert_eq!(mock_env.get("HOME").unwrap(), "/home/myname");
    /// ```
    pub fn from_slice<'a>(vars: &[(&'a str, &'a str)]) -> Self {
        use env::Inner;
        Self(Arc::new(Inner::Fake(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )))
    }

    /// Create a process environment that uses the real process environment
    ///
    /// Calls will be delegated to [`std::env::var`].
    pub fn real() -> Self {
        Self(Arc::new(env::Inner::Real))
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(hash_map: HashMap<String, String>) -> Self {
        Self(Arc::new(env::Inner::Fake(hash_map)))
    }
}

mod env {
    use std::collections::HashMap;

    #[derive(Debug)]
    pub(super) enum Inner {
        Real,
        Fake(HashMap<String, String>),
    }
}

#[cfg(test)]
mod test {
    use crate::os_shim_internal::{Env, Fs};
    use std::env::VarError;
    use std::io::ErrorKind;

    #[test]
    fn env_works() {
        let env = Env::from_slice(&[("FOO", "BAR")]);
        assert_eq!(env.get("FOO").unwrap(), "BAR");
        assert_eq!(
            env.get("OTHER").expect_err("no present"),
            VarError::NotPresent
        )
    }

    #[tokio::test]
    async fn fake_fs_reads_back_writes() {
        let fs = Fs::from_slice(&[("/home/.aws/config", "[default]")]);
        assert_eq!(
            b"[default]".to_vec(),
            fs.read_to_end("/home/.aws/config").await.unwrap()
        );
        fs.write("/home/.aws/sso/cache/abc.json", "{}")
            .await
            .unwrap();
        // clones share the same fake file system
        let clone = fs.clone();
        assert_eq!(
            b"{}".to_vec(),
            clone
                .read_to_end("/home/.aws/sso/cache/abc.json")
                .await
                .unwrap()
        );
        assert_eq!(
            ErrorKind::NotFound,
            fs.read_to_end("doesntexist").await.unwrap_err().kind()
        );
    }

    #[tokio::test]
    async fn real_write_is_atomic_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sso").join("cache").join("token.json");
        let fs = Fs::real();
        fs.write(&path, "first").await.unwrap();
        fs.write(&path, "second").await.unwrap();
        assert_eq!(b"second".to_vec(), fs.read_to_end(&path).await.unwrap());

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(1, leftovers.len(), "temporary files were left: {leftovers:?}");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(0o600, mode & 0o777);
        }
    }

    #[tokio::test]
    async fn namespaced_fs_maps_onto_test_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fs = Fs::from_test_dir(dir.path(), "/users/test");
        fs.write("/users/test/.aws/credentials", "[default]")
            .await
            .unwrap();
        assert!(dir.path().join(".aws/credentials").exists());
        assert_eq!(
            b"[default]".to_vec(),
            fs.read_to_end("/users/test/.aws/credentials").await.unwrap()
        );
        assert_eq!(
            ErrorKind::NotFound,
            fs.read_to_end("/elsewhere/file").await.unwrap_err().kind()
        );
    }
}

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use geotiff_heatmap_core::StorageError;

use super::object_store::ObjectStore;

/// Object store backed by a local directory: `{root}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an object path, refusing names that leave the bucket directory.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for (label, name) in [("bucket", bucket), ("key", key)] {
            let relative = Path::new(name);
            let confined = !name.is_empty()
                && relative
                    .components()
                    .all(|component| matches!(component, Component::Normal(_)));
            if !confined {
                return Err(StorageError::Transport(format!(
                    "{label} '{name}' escapes the storage root"
                )));
            }
            path.push(relative);
        }
        Ok(path)
    }
}

impl ObjectStore for FsObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|error| map_io_error(error, bucket, key))
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| map_io_error(error, bucket, key))?;
        }
        fs::write(&path, body).map_err(|error| map_io_error(error, bucket, key))
    }
}

fn map_io_error(error: io::Error, bucket: &str, key: &str) -> StorageError {
    match error.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        io::ErrorKind::PermissionDenied => StorageError::AccessDenied {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        _ => StorageError::Transport(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips_nested_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsObjectStore::new(dir.path());

        store
            .put_object("bucket", "nested/dir/object.bin", b"payload", "application/octet-stream")
            .expect("put should succeed");

        let body = store
            .get_object("bucket", "nested/dir/object.bin")
            .expect("get should succeed");
        assert_eq!(body, b"payload");
        assert!(dir.path().join("bucket/nested/dir/object.bin").is_file());
    }

    #[test]
    fn put_overwrites_existing_object() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsObjectStore::new(dir.path());

        store.put_object("b", "k", b"first", "text/plain").expect("first put");
        store.put_object("b", "k", b"second", "text/plain").expect("second put");

        assert_eq!(store.get_object("b", "k").expect("get"), b"second");
    }

    #[test]
    fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsObjectStore::new(dir.path());

        let error = store.get_object("bucket", "absent.tif").expect_err("should fail");
        assert!(matches!(error, StorageError::NotFound { .. }));
    }

    #[test]
    fn keys_cannot_escape_the_bucket() {
        let store = FsObjectStore::new("/srv/objects");

        for key in ["../secret.tif", "a/../../b.tif", "/etc/passwd", ""] {
            let error = store
                .object_path("bucket", key)
                .expect_err("escaping key should be rejected");
            assert!(matches!(error, StorageError::Transport(_)), "key {key:?}");
        }
        assert!(store.object_path("..", "a.tif").is_err());
    }

    #[test]
    fn object_path_joins_bucket_and_key() {
        let store = FsObjectStore::new("/srv/objects");

        let path = store.object_path("rasters", "2024/elev.tif").expect("path");
        assert_eq!(path, PathBuf::from("/srv/objects/rasters/2024/elev.tif"));
    }
}

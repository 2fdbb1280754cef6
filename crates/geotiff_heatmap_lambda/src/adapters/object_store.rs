use geotiff_heatmap_core::StorageError;

/// Blocking access to a bucket/key object store.
pub trait ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Creates or overwrites the object at `bucket`/`key`.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError>;
}

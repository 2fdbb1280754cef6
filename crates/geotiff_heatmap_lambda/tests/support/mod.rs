#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use geotiff_heatmap_core::raster::GDAL_NODATA_TAG;
use geotiff_heatmap_core::{RenderOptions, StorageError};
use geotiff_heatmap_lambda::adapters::object_store::ObjectStore;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

pub const BUCKET: &str = "rasters";

pub fn small_figure() -> RenderOptions {
    RenderOptions {
        size_inches: 3.0,
        dpi: 50,
        pad_inches: 0.1,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// In-memory bucket store with optional injected read/write failures.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    fail_reads: bool,
    fail_writes: bool,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, key: &str, body: Vec<u8>) {
        self.objects.lock().expect("poisoned mutex").insert(
            (BUCKET.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: "image/tiff".to_string(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .get(&(BUCKET.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .expect("poisoned mutex")
            .keys()
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().expect("poisoned mutex")
    }
}

impl ObjectStore for MemoryStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        self.objects
            .lock()
            .expect("poisoned mutex")
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.clone())
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        *self.writes.lock().expect("poisoned mutex") += 1;
        if self.fail_writes {
            return Err(StorageError::Transport("connection reset by peer".to_string()));
        }
        self.objects.lock().expect("poisoned mutex").insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Single-band float32 GeoTIFF, optionally tagged with a GDAL no-data value.
pub fn float_geotiff(width: u32, height: u32, values: &[f32], nodata: Option<&str>) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor).expect("encoder should open");
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(width, height)
            .expect("image should start");
        if let Some(text) = nodata {
            image
                .encoder()
                .write_tag(Tag::Unknown(GDAL_NODATA_TAG), text)
                .expect("nodata tag should write");
        }
        image.write_data(values).expect("pixels should write");
    }
    cursor.into_inner()
}

pub fn ramp_geotiff(width: u32, height: u32) -> Vec<u8> {
    let values: Vec<f32> = (0..width * height).map(|index| index as f32).collect();
    float_geotiff(width, height, &values, None)
}

pub fn body_text(body: &str) -> String {
    serde_json::from_str::<String>(body).expect("error body should be a JSON string")
}

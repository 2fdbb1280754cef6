pub const STORAGE_SCHEME: &str = "s3";
pub const RASTER_EXTENSIONS: [&str; 2] = [".tif", ".tiff"];
pub const OUTPUT_KEY_PREFIX: &str = "png_";
pub const OUTPUT_KEY_SUFFIX: &str = ".png";

/// True when the key ends in `.tif` or `.tiff`, ignoring case.
pub fn is_raster_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    RASTER_EXTENSIONS
        .iter()
        .any(|extension| lowered.ends_with(extension))
}

/// File name of the key without its directory path and final extension.
///
/// Leading dots belong to the name, so `dir/.tif` has the stem `.tif`.
pub fn file_stem(key: &str) -> &str {
    let base = key.rsplit('/').next().unwrap_or(key);
    let leading_dots = base.len() - base.trim_start_matches('.').len();
    match base[leading_dots..].rfind('.') {
        Some(dot) => &base[..leading_dots + dot],
        None => base,
    }
}

/// Output key for a converted raster: `png_{stem}.png` at the bucket root.
///
/// The input's directory is dropped, so `data/elev.tif` and `other/elev.tif`
/// both map to `png_elev.png`.
pub fn output_object_key(key: &str) -> String {
    format!("{OUTPUT_KEY_PREFIX}{}{OUTPUT_KEY_SUFFIX}", file_stem(key))
}

pub fn storage_uri(bucket: &str, key: &str) -> String {
    format!("{STORAGE_SCHEME}://{bucket}/{key}")
}

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use geotiff_heatmap_core::contract::PNG_CONTENT_TYPE;
use geotiff_heatmap_core::storage_keys::{is_raster_key, output_object_key, storage_uri};
use geotiff_heatmap_core::{
    decode_first_band, render_heatmap, ConversionError, ConversionRequest, ConversionSuccess,
    DecodedRaster, HandlerResponse, RenderOptions,
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapters::object_store::ObjectStore;

/// Runs one conversion and maps every outcome, panics included, to a response.
pub fn handle_conversion_event(
    event: Value,
    store: &dyn ObjectStore,
    options: &RenderOptions,
) -> HandlerResponse {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_pipeline(event, store, options)))
        .unwrap_or_else(|payload| Err(ConversionError::Unexpected(panic_message(payload))));

    match outcome {
        Ok(success) => HandlerResponse::success(&success),
        Err(error) => {
            if error.is_client_error() {
                warn!(stage = error.stage(), %error, "conversion rejected");
            } else {
                error!(stage = error.stage(), %error, "conversion failed");
            }
            HandlerResponse::from_error(&error)
        }
    }
}

/// [`handle_conversion_event`] for callers on a multi-threaded tokio runtime.
///
/// Decode and render are CPU-bound; the worker thread is handed off to the
/// scheduler for the duration of the call.
pub fn handle_conversion_event_in_place(
    event: Value,
    store: &dyn ObjectStore,
    options: &RenderOptions,
) -> HandlerResponse {
    tokio::task::block_in_place(|| handle_conversion_event(event, store, options))
}

fn run_pipeline(
    event: Value,
    store: &dyn ObjectStore,
    options: &RenderOptions,
) -> Result<ConversionSuccess, ConversionError> {
    let request = ConversionRequest::from_event(event)?;
    info!(bucket = %request.bucket, key = %request.key, "processing raster");

    validate_extension(&request)?;
    let bytes = download(store, &request)?;
    let raster = decode(&bytes)?;
    let png = render(&raster, options)?;

    let output_key = output_object_key(&request.key);
    upload(store, &request.bucket, &output_key, &png)?;

    Ok(ConversionSuccess::new(&request, &output_key))
}

fn validate_extension(request: &ConversionRequest) -> Result<(), ConversionError> {
    if is_raster_key(&request.key) {
        Ok(())
    } else {
        Err(ConversionError::UnsupportedExtension {
            key: request.key.clone(),
        })
    }
}

fn download(
    store: &dyn ObjectStore,
    request: &ConversionRequest,
) -> Result<Vec<u8>, ConversionError> {
    let bytes = store
        .get_object(&request.bucket, &request.key)
        .map_err(|source| ConversionError::Download {
            key: request.key.clone(),
            source,
        })?;
    info!(bytes = bytes.len(), "raster downloaded");
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<DecodedRaster, ConversionError> {
    let raster = decode_first_band(bytes)?;
    info!(
        width = raster.width(),
        height = raster.height(),
        nodata = ?raster.nodata(),
        masked = raster.masked_count(),
        "band decoded"
    );
    Ok(raster)
}

fn render(raster: &DecodedRaster, options: &RenderOptions) -> Result<Vec<u8>, ConversionError> {
    let rendered = render_heatmap(raster, options)?;
    info!(
        width = rendered.width,
        height = rendered.height,
        bytes = rendered.png.len(),
        "heatmap rendered"
    );
    Ok(rendered.png)
}

fn upload(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    png: &[u8],
) -> Result<(), ConversionError> {
    store
        .put_object(bucket, key, png, PNG_CONTENT_TYPE)
        .map_err(ConversionError::Upload)?;
    info!(location = %storage_uri(bucket, key), "heatmap uploaded");
    Ok(())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "conversion panicked".to_string()
    }
}

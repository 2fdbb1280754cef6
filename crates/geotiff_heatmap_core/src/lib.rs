//! GeoTIFF-to-heatmap conversion domain.
//!
//! This crate owns the request/response contract, output key derivation,
//! raster decoding and heatmap rendering. AWS SDK and Lambda runtime
//! concerns live in `geotiff_heatmap_lambda`.

pub mod colormap;
pub mod contract;
pub mod error;
pub mod raster;
pub mod render;
pub mod storage_keys;

pub use contract::{ConversionRequest, ConversionSuccess, HandlerResponse, RequestField};
pub use error::{ConversionError, RasterError, RenderError, StorageError};
pub use raster::{decode_first_band, DecodedRaster};
pub use render::{render_heatmap, RenderOptions, RenderedHeatmap};

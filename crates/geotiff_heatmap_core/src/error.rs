use thiserror::Error;

use crate::contract::RequestField;

/// Failure of one conversion stage.
///
/// `Display` renders the exact message returned to the invoker.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(
        "Error: Missing required key in event: '{field}'. Event must contain \"bucket\" and \"key\"."
    )]
    MissingField { field: RequestField },

    #[error("Error: File {key} is not a TIF file")]
    UnsupportedExtension { key: String },

    #[error("Error downloading {key}: {source}")]
    Download {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Error reading TIF file: {0}")]
    Decode(#[from] RasterError),

    #[error("Error creating PNG: {0}")]
    Render(#[from] RenderError),

    #[error("Error uploading PNG: {0}")]
    Upload(#[source] StorageError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ConversionError {
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. } | Self::UnsupportedExtension { .. }
        )
    }

    /// Short stage name used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MissingField { .. } | Self::UnsupportedExtension { .. } => "validate",
            Self::Download { .. } => "download",
            Self::Decode(_) => "decode",
            Self::Render(_) => "render",
            Self::Upload(_) => "upload",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

/// Object storage fault, distinguishable by kind.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("access denied: s3://{bucket}/{key}")]
    AccessDenied { bucket: String, key: String },

    #[error("{0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("{0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("raster has no cells ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("band 1 holds {actual} samples, expected {expected}")]
    SampleCount { expected: usize, actual: usize },

    #[error("invalid GDAL_NODATA value '{0}'")]
    InvalidNoData(String),

    #[error("unsupported sample type")]
    UnsupportedSampleType,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("figure of {size_inches} in at {dpi} dpi is outside the supported canvas size")]
    InvalidFigure { size_inches: f64, dpi: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

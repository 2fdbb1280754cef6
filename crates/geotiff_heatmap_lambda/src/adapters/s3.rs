use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use geotiff_heatmap_core::StorageError;
use tokio::sync::OnceCell;
use tracing::debug;

use super::object_store::ObjectStore;

static SHARED_CLIENT: OnceCell<aws_sdk_s3::Client> = OnceCell::const_new();

/// S3 client built from the ambient AWS configuration on first use and
/// reused by every later invocation in the process.
pub async fn shared_store() -> S3ObjectStore {
    let client = SHARED_CLIENT
        .get_or_init(|| async {
            let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
            debug!(region = ?aws_config.region(), "s3 client initialised");
            aws_sdk_s3::Client::new(&aws_config)
        })
        .await;
    S3ObjectStore::new(client.clone())
}

/// Blocking facade over the async S3 SDK.
///
/// Calls must run on a multi-threaded tokio runtime.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(&bucket)
                    .key(&key)
                    .send()
                    .await
                    .map_err(|error| {
                        let missing = error
                            .as_service_error()
                            .is_some_and(|service| service.is_no_such_key());
                        classify_sdk_error(&error, missing, &bucket, &key)
                    })?;

                let body = output.body.collect().await.map_err(|error| {
                    StorageError::Transport(format!("failed to read object body: {error}"))
                })?;
                Ok::<_, StorageError>(body.into_bytes().to_vec())
            })
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.to_string();
        let body = body.to_vec();
        let content_type = content_type.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .content_type(content_type)
                    .body(ByteStream::from(body))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| classify_sdk_error(&error, false, &bucket, &key))
            })
        })
    }
}

fn classify_sdk_error<E>(
    error: &SdkError<E, HttpResponse>,
    missing: bool,
    bucket: &str,
    key: &str,
) -> StorageError
where
    E: std::error::Error + 'static,
{
    let status = error
        .raw_response()
        .map(|response| response.status().as_u16());
    classify_status(status, missing, bucket, key)
        .unwrap_or_else(|| StorageError::Transport(DisplayErrorContext(error).to_string()))
}

fn classify_status(
    status: Option<u16>,
    missing: bool,
    bucket: &str,
    key: &str,
) -> Option<StorageError> {
    match (missing, status) {
        (true, _) | (false, Some(404)) => Some(StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }),
        (false, Some(403)) => Some(StorageError::AccessDenied {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }),
        _ => None,
    }
}

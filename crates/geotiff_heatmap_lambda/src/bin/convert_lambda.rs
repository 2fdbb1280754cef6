use geotiff_heatmap_core::{HandlerResponse, RenderOptions};
use geotiff_heatmap_lambda::adapters::s3::shared_store;
use geotiff_heatmap_lambda::handlers::convert::handle_conversion_event_in_place;
use geotiff_heatmap_lambda::telemetry::{init_tracing, LogFormat};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<HandlerResponse, Error> {
    let store = shared_store().await;
    Ok(handle_conversion_event_in_place(
        event.payload,
        &store,
        &RenderOptions::default(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing(LogFormat::Json);
    lambda_runtime::run(service_fn(handle_request)).await
}

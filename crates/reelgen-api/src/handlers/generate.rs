//! Image generation handler.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use validator::Validate;

use reelgen_models::{GenerateImagesResponse, GenerationRequest, StreamEvent};
use reelgen_orchestrator::{ImageOrchestrator, StreamEmitter};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `POST /generate-images`
///
/// Answers with one JSON body, or with a server-sent event stream when the
/// request sets `stream`.
pub async fn generate_images(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let services = state.generation()?;

    info!(
        prompts = request.prompts.len(),
        quality = %request.quality_tier(),
        stream = request.stream,
        "Image generation requested"
    );

    if request.stream {
        let orchestrator = services.orchestrator.clone();
        return Ok(stream_generation(orchestrator, request, state.config.sse_buffer_size));
    }

    let result = services.orchestrator.run(&request).await?;
    Ok(Json(GenerateImagesResponse::from(result)).into_response())
}

/// Run the orchestration in its own task and stream its events.
///
/// Dropping the response (client disconnect) closes the channel, which the
/// orchestration observes and stops polling.
fn stream_generation(orchestrator: ImageOrchestrator, request: GenerationRequest, buffer: usize) -> Response {
    let (emitter, rx) = StreamEmitter::channel(buffer);

    orchestrator.spawn_streaming(request, emitter);

    let events = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(sse_event(&event)));

    let mut response = Sse::new(events).into_response();
    // Keep reverse proxies from buffering the stream.
    response.headers_mut().insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}

fn sse_event(event: &StreamEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        warn!("Failed to serialize stream event: {}", e);
        Event::default().data(r#"{"type":"error","error":"Failed to serialize event"}"#)
    })
}

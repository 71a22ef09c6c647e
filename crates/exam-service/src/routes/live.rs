//! Live View Routes
//!
//! The latest annotated frame of a running session, either as one JPEG or
//! as an MJPEG stream that lasts as long as the session's frame work.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use proctoring::{LiveFrame, OutcomeHandle};
use uuid::Uuid;

use crate::{ServiceError, SharedState};

const BOUNDARY: &str = "frame";

async fn session(state: &SharedState, id: Uuid) -> Result<OutcomeHandle, ServiceError> {
    state
        .read()
        .await
        .sessions
        .get(&id)
        .cloned()
        .ok_or_else(|| ServiceError::NotFound(format!("No proctoring session for attempt {}", id)))
}

fn multipart_part(frame: &LiveFrame) -> Vec<u8> {
    let head = format!("--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n", BOUNDARY, frame.jpeg.len());
    let mut part = Vec::with_capacity(head.len() + frame.jpeg.len() + 2);
    part.extend_from_slice(head.as_bytes());
    part.extend_from_slice(&frame.jpeg);
    part.extend_from_slice(b"\r\n");
    part
}

/// Most recent annotated frame as `image/jpeg`
pub async fn live_frame(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let frame = session(&state, id)
        .await?
        .latest_frame()
        .ok_or_else(|| ServiceError::NotFound("No frame captured yet".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        frame.jpeg.to_vec(),
    )
        .into_response())
}

/// Annotated frames as `multipart/x-mixed-replace`, one part per frame
pub async fn live_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let handle = session(&state, id).await?;
    let frames = handle.frames();

    let parts = futures::stream::unfold((handle, frames), |(handle, mut frames)| async move {
        tokio::select! {
            biased;
            changed = frames.changed() => changed.ok()?,
            _ = handle.settled() => return None,
        }
        let part = (*frames.borrow_and_update()).as_ref().map(multipart_part)?;
        Some((Ok::<_, Infallible>(part), (handle, frames)))
    });

    let content_type = format!("multipart/x-mixed-replace; boundary={}", BOUNDARY);
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        Body::from_stream(parts),
    )
        .into_response())
}

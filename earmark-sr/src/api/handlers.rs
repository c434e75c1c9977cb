//! JSON API handlers: catalog management, file recognition, stats

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use earmark_common::messages::ServerMessage;
use earmark_common::Error;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task;
use tracing::warn;

use super::server::AppContext;
use crate::audio::{decode_bytes, decode_file, resample};
use crate::ingest::SongMeta;

/// Error wrapper mapping [`Error`] kinds onto HTTP statuses.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) | Error::Decode(_) | Error::Config(_) => StatusCode::BAD_REQUEST,
            Error::EmptyFingerprint => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct AddSongRequest {
    /// Audio file path; relative paths resolve under the songs directory
    pub path: String,
    #[serde(flatten)]
    pub meta: SongMeta,
}

/// Ingest a song file into the catalog.
pub async fn add_song(
    State(ctx): State<AppContext>,
    Json(request): Json<AddSongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let path = ctx.config.resolve_song_path(&request.path);
    let song = ctx.ingest.ingest_file(&path, request.meta).await?;
    Ok((StatusCode::CREATED, Json(song)))
}

pub async fn list_songs(State(ctx): State<AppContext>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ctx.catalog.list_songs().await?))
}

pub async fn get_song(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let song = ctx
        .catalog
        .get_song(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("song {id}")))?;
    Ok(Json(song))
}

pub async fn delete_song(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.catalog.delete_song(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace a song's opaque metadata blob.
pub async fn update_metadata(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    Json(metadata): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.catalog.update_metadata(id, &metadata).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(State(ctx): State<AppContext>) -> Result<impl IntoResponse, ApiError> {
    let stats = ctx.catalog.stats().await?;
    Ok(Json(json!({
        "songs": stats.songs,
        "fingerprints": stats.fingerprints,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RecognizeFileRequest {
    /// Audio file path; relative paths resolve under the songs directory
    pub path: String,
}

/// One-shot recognition of an audio file.
///
/// The body is either `{"path": ...}` JSON naming a decodable file, or the
/// raw bytes of an uploaded audio file. The response body always has the
/// terminal message shape: `match_found`, `no_match`, or `error`.
/// Undecodable input is a 400 with the `error` shape; a query with no
/// usable peaks is a `no_match`, never an `error`.
pub async fn recognize_file(State(ctx): State<AppContext>, body: Bytes) -> Response {
    let target_rate = ctx.engine.analysis_params().sample_rate;

    let decoded = if let Ok(request) = serde_json::from_slice::<RecognizeFileRequest>(&body) {
        let path = ctx.config.resolve_song_path(&request.path);
        task::spawn_blocking(move || -> earmark_common::Result<Vec<f32>> {
            let decoded = decode_file(&path)?;
            resample(&decoded.samples, decoded.sample_rate, target_rate)
        })
        .await
        .map_err(|e| Error::Internal(format!("decode task failed: {e}")))
    } else {
        task::spawn_blocking(move || -> earmark_common::Result<Vec<f32>> {
            let decoded = decode_bytes(body.to_vec())?;
            resample(&decoded.samples, decoded.sample_rate, target_rate)
        })
        .await
        .map_err(|e| Error::Internal(format!("decode task failed: {e}")))
    };

    let samples = match decoded {
        Ok(Ok(samples)) => samples,
        Ok(Err(e)) | Err(e) => {
            let status = match e {
                Error::Decode(_) | Error::Resample(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let message = ServerMessage::Error { message: e.to_string() };
            return (status, Json(message)).into_response();
        }
    };

    match ctx.engine.analyze(samples).await {
        Ok(outcome) => {
            let frame_duration = ctx.engine.analysis_params().frame_duration();
            Json(outcome.into_terminal_message(frame_duration)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "file recognition failed");
            let message = ServerMessage::Error { message: e.to_string() };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(message)).into_response()
        }
    }
}

use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    http::StatusCode,
    Extension, Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use graphlens_analyzer::AnalysisOutcome;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_analyze_error, ApiError, ApiResponse, AppState, ResponseMeta};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub(super) struct ScreencapRequest {
    pub image_data: String,
}

pub(super) async fn analyze_upload(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<AnalysisOutcome>>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("expected a multipart form upload: {e}"),
        )
    })?;

    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(req_id.0.clone(), &e))?
    {
        if field.name() != Some(UPLOAD_FIELD) && field.file_name().is_none() {
            continue;
        }

        if let Some(content_type) = field.content_type() {
            if !content_type.starts_with("image/") {
                return Err(ApiError::new(
                    req_id.0.clone(),
                    "validation_error",
                    format!("uploaded file must be an image, got {content_type}"),
                ));
            }
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(req_id.0.clone(), &e))?;
        image = Some(bytes);
        break;
    }

    let Some(bytes) = image else {
        return Err(ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("no file provided in the `{UPLOAD_FIELD}` field"),
        ));
    };

    let outcome = state
        .analyzer
        .analyze(&bytes)
        .await
        .map_err(|e| map_analyze_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn analyze_screencap(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<ScreencapRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AnalysisOutcome>>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        let code = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "validation_error"
        };
        ApiError::new(req_id.0.clone(), code, e.body_text())
    })?;

    let bytes = decode_image_data(&payload.image_data)
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    let outcome = state
        .analyzer
        .analyze(&bytes)
        .await
        .map_err(|e| map_analyze_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn multipart_error(request_id: String, error: &MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(request_id, "payload_too_large", "uploaded file is too large");
    }
    tracing::debug!(error = %error, "malformed multipart body");
    ApiError::new(
        request_id,
        "validation_error",
        "could not read the uploaded file",
    )
}

/// Decode a screen capture payload: bare base64 or a `data:` URL.
fn decode_image_data(raw: &str) -> Result<Vec<u8>, String> {
    let raw = raw.trim();
    let encoded = match raw.strip_prefix("data:") {
        Some(rest) => {
            let Some((header, data)) = rest.split_once(',') else {
                return Err("malformed data URL".to_string());
            };
            if !header.ends_with(";base64") {
                return Err("data URL must be base64 encoded".to_string());
            }
            data
        }
        None => raw,
    };

    if encoded.is_empty() {
        return Err("image_data is empty".to_string());
    }

    STANDARD
        .decode(encoded)
        .map_err(|e| format!("image_data is not valid base64: {e}"))
}

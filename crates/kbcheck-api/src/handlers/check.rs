//! Media compliance check handler.
//!
//! Accepts one video or image as multipart field `file` and returns the
//! model's judgment against the knowledge base.

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::debug;

use kbcheck_core::{AnalysisReport, MediaKind};

use crate::{ApiError, AppState, RequireAccess};

const FILE_FIELD: &str = "file";

/// Uploaded file pulled out of the multipart body.
#[derive(Debug)]
struct Upload {
    data: Vec<u8>,
    mime_type: String,
}

/// Check an uploaded video or image against the knowledge base.
///
/// # Returns
/// - 200 OK with the analysis report
/// - 400 Bad Request if the file is missing, empty, or not image/video
/// - 401 Unauthorized without a valid access passphrase
/// - 422 if the remote service failed to process the video
/// - 429 if the service is still rate limited after one retry
/// - 503 if the analysis service is not configured
/// - 504 if the video never became ready
pub async fn check_media(
    _access: RequireAccess,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, ApiError> {
    let services = state.services()?;
    let upload = read_upload(&mut multipart).await?;

    let report = services
        .lifecycle
        .run(&upload.data, &upload.mime_type, None)
        .await?;
    Ok(Json(report))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let declared = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
            .to_vec();

        let mime_type = resolve_mime_type(declared.as_deref(), &data);
        debug!(
            file_name = file_name.as_deref().unwrap_or("-"),
            declared = declared.as_deref().unwrap_or("-"),
            %mime_type,
            size = data.len(),
            "Received upload"
        );
        return Ok(Upload { data, mime_type });
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}

/// Use the declared content type when it names an image or video, otherwise
/// sniff the bytes.
fn resolve_mime_type(declared: Option<&str>, data: &[u8]) -> String {
    if let Some(mime) = declared.filter(|m| MediaKind::from_mime(m).is_some()) {
        return mime.to_string();
    }
    infer::get(data)
        .map(|kind| kind.mime_type().to_string())
        .or_else(|| declared.map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

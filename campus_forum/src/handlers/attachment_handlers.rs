use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mime::Mime;
use tracing::{error, warn};

use crate::{
    auth::AuthenticatedUser,
    constants::{MAX_ATTACHMENT_SIZE_BYTES, MAX_ATTACHMENT_SIZE_MB},
    error::ForumError,
    lifecycle::StoredFile,
    AppState,
};

struct UploadedField {
    filename: Option<String>,
    content_type: Option<Mime>,
    data: axum::body::Bytes,
}

/// Accepts a multipart upload with a `file` field and an optional
/// `content_id` naming the item the file belongs to.
pub async fn upload_attachment_handler(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Response, ForumError> {
    let mut upload: Option<UploadedField> = None;
    let mut content_id: Option<String> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => match field.name().map(str::to_string).as_deref() {
                Some("file") => {
                    let filename = field.file_name().map(|s| s.to_string());
                    let content_type = field.content_type().and_then(|s| s.parse::<Mime>().ok());
                    let data = match field.bytes().await {
                        Ok(data) => data,
                        Err(e) => {
                            return Ok((StatusCode::BAD_REQUEST, format!("Failed to read file data: {}", e))
                                .into_response())
                        }
                    };
                    if data.len() as u64 > MAX_ATTACHMENT_SIZE_BYTES {
                        return Ok((
                            StatusCode::PAYLOAD_TOO_LARGE,
                            format!("File size exceeds limit ({} MB)", MAX_ATTACHMENT_SIZE_MB),
                        )
                            .into_response());
                    }
                    upload = Some(UploadedField { filename, content_type, data });
                }
                Some("content_id") => match field.text().await {
                    Ok(text) if !text.trim().is_empty() => content_id = Some(text.trim().to_string()),
                    Ok(_) => {}
                    Err(e) => {
                        return Ok((StatusCode::BAD_REQUEST, format!("Failed to read content_id: {}", e))
                            .into_response())
                    }
                },
                _ => {}
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Multipart processing error");
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    return Ok((StatusCode::PAYLOAD_TOO_LARGE, "Total upload size limit exceeded").into_response());
                }
                return Ok((StatusCode::BAD_REQUEST, format!("Multipart processing error: {}", e)).into_response());
            }
        }
    }

    let Some(upload) = upload else {
        return Err(ForumError::validation("missing required field: file"));
    };
    if upload.data.is_empty() {
        return Err(ForumError::validation("uploaded file is empty"));
    }

    let size_bytes = upload.data.len() as i64;
    let url = match state
        .file_storage
        .save_file(upload.data, upload.filename.as_deref())
        .await
    {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, owner_id = %caller.id, "Failed to store uploaded file");
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, "Failed to store file").into_response());
        }
    };

    let stored = StoredFile {
        url,
        file_name: upload.filename,
        mime_type: upload.content_type.map(|m| m.essence_str().to_string()),
        size_bytes,
    };
    match state
        .lifecycle
        .record_attachment(&caller, content_id.as_deref(), &stored)
        .await
    {
        Ok(attachment) => Ok((StatusCode::CREATED, Json(attachment)).into_response()),
        Err(e) => {
            // The blob has no metadata row; remove it before reporting.
            if let Err(cleanup) = state.file_storage.delete_file(&stored.url).await {
                warn!(error = %cleanup, file_url = %stored.url, "Failed to remove orphaned upload");
            }
            Err(e)
        }
    }
}

pub async fn list_attachments_handler(
    State(state): State<AppState>,
    AuthenticatedUser(_viewer): AuthenticatedUser,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, ForumError> {
    let attachments = state.queries.list_attachments(&content_id).await?;
    Ok(Json(attachments))
}

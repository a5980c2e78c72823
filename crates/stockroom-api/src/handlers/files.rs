//! Upload lifecycle handlers: initiate, confirm, delete.
//!
//! Order of operations is load-bearing in all three: validation and
//! ownership checks run before any side effect, and delete touches storage
//! before the database.

use crate::auth::CallerIdentity;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use stockroom_core::models::{
    ConfirmUploadRequest, ConfirmUploadResponse, DeleteFileRequest, DeleteFileResponse,
    InitiateUploadRequest, InitiateUploadResponse, UploadRecord,
};
use stockroom_core::AppError;
use stockroom_storage::sanitize_filename;

/// Issue a presigned upload grant and create the PENDING record
#[utoipa::path(
    post,
    path = "/files/upload",
    tag = "files",
    request_body = InitiateUploadRequest,
    responses(
        (status = 200, description = "Upload grant issued", body = InitiateUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 403, description = "Product not owned by caller", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        user_id = %caller.user_id,
        filename = %request.filename,
        operation = "initiate_upload"
    )
)]
pub async fn initiate_upload(
    caller: CallerIdentity,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<InitiateUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    // Validation short-circuits before any side effect: no grant, no record.
    state.validator.validate(&request)?;

    if let Some(product_id) = request.product_id {
        state
            .ownership
            .verify_product_ownership(caller.user_id, product_id)
            .await?;
    }

    let grant = state
        .storage
        .issue_upload_grant(&request.filename, &request.content_type)
        .await?;

    let record = UploadRecord::new_pending(
        grant.key.clone(),
        sanitize_filename(&request.filename),
        request.content_type.to_lowercase(),
        request.file_size,
        caller.user_id,
        request.product_id,
    );
    state.uploads.create_upload(&record).await?;

    tracing::info!(
        upload_id = %record.id,
        key = %grant.key,
        "Issued upload grant"
    );

    Ok(Json(InitiateUploadResponse {
        upload_id: record.id,
        key: grant.key,
        upload_url: grant.upload_url,
    }))
}

/// Confirm a completed direct upload
#[utoipa::path(
    post,
    path = "/files/confirm",
    tag = "files",
    request_body = ConfirmUploadRequest,
    responses(
        (status = 200, description = "Upload confirmed", body = ConfirmUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 403, description = "Upload not owned by caller", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Object missing from storage", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        user_id = %caller.user_id,
        upload_id = %request.upload_id,
        operation = "confirm_upload"
    )
)]
pub async fn confirm_upload(
    caller: CallerIdentity,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ConfirmUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .ownership
        .verify_upload_ownership(caller.user_id, request.upload_id)
        .await?;

    if record.key != request.key {
        return Err(HttpAppError::from(AppError::Validation(
            "key does not match the upload record".to_string(),
        )));
    }

    let probe = state.storage.probe_object(&record.key).await?;
    if !probe.exists {
        // Best-effort compensating write; its own failure is swallowed so
        // the caller still sees the consistency error.
        if let Err(err) = state
            .uploads
            .mark_failed(record.id, "object missing at confirm")
            .await
        {
            tracing::warn!(
                upload_id = %record.id,
                error = %err,
                "Failed to mark upload as failed after missing object"
            );
        }
        return Err(HttpAppError::from(AppError::MissingObject(format!(
            "object for key {} was not found; the upload may have failed",
            record.key
        ))));
    }

    // The store-reported size is authoritative over the declared one.
    let file_size = probe.size.map(|s| s as i64).unwrap_or(record.file_size);
    let updated = state.uploads.mark_completed(record.id, file_size).await?;

    if let Some(product_id) = updated.product_id {
        state
            .catalog
            .insert_product_image(product_id, &updated.key)
            .await?;
    }

    let url = state.storage.public_url(&updated.key);

    tracing::info!(
        upload_id = %updated.id,
        key = %updated.key,
        file_size = updated.file_size,
        "Upload confirmed"
    );

    Ok(Json(ConfirmUploadResponse {
        success: true,
        url,
        file_upload: updated,
    }))
}

/// Delete a stored object and its records
#[utoipa::path(
    delete,
    path = "/files/delete",
    tag = "files",
    request_body = DeleteFileRequest,
    responses(
        (status = 200, description = "File deleted", body = DeleteFileResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 403, description = "Image not owned by caller", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        user_id = %caller.user_id,
        key = %request.key,
        operation = "delete_file"
    )
)]
pub async fn delete_file(
    caller: CallerIdentity,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DeleteFileRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .ownership
        .verify_image_ownership(caller.user_id, &request.key, request.product_id)
        .await?;

    // Storage first, then the record. A crash between the two can leave a
    // COMPLETED record pointing at a deleted object; accepted window.
    state.storage.delete_object(&request.key).await?;
    state.uploads.mark_deleted(&request.key).await?;
    state
        .catalog
        .delete_product_images(request.product_id, &request.key)
        .await?;

    tracing::info!(key = %request.key, "File deleted");

    Ok(Json(DeleteFileResponse {
        success: true,
        message: "File deleted successfully".to_string(),
        key: request.key,
    }))
}

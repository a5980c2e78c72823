//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use stockroom_core::models::{
    ConfirmUploadRequest, ConfirmUploadResponse, DeleteFileRequest, DeleteFileResponse,
    InitiateUploadRequest, InitiateUploadResponse, UploadRecord, UploadStatus,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        version = "0.1.0",
        description = "Presigned-upload file lifecycle service. Clients request a time-boxed upload grant, PUT the file directly to object storage, then confirm. Deletion and orphan reconciliation keep storage and metadata consistent."
    ),
    paths(
        handlers::files::initiate_upload,
        handlers::files::confirm_upload,
        handlers::files::delete_file,
        handlers::health::health_check,
    ),
    components(schemas(
        InitiateUploadRequest,
        InitiateUploadResponse,
        ConfirmUploadRequest,
        ConfirmUploadResponse,
        DeleteFileRequest,
        DeleteFileResponse,
        UploadRecord,
        UploadStatus,
        ErrorResponse,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "files", description = "Upload lifecycle operations"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::upload::UploadRecord;

/// Request to initiate an upload and receive a presigned PUT grant
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadRequest {
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub filename: String,
    /// Content type (MIME type)
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Declared file size in bytes. Replaced by the store-reported size at confirm.
    pub file_size: i64,
    /// Optional product to attach the upload to; ownership is verified when set
    #[serde(default)]
    pub product_id: Option<Uuid>,
}

/// Response containing the upload grant
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadResponse {
    /// Upload ID, used to confirm the upload
    pub upload_id: Uuid,
    /// Storage key where the object will live
    pub key: String,
    /// Time-boxed presigned PUT URL; the transfer happens directly against storage
    pub upload_url: String,
}

/// Request to confirm a completed transfer
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUploadRequest {
    pub upload_id: Uuid,
    #[validate(length(min = 1, message = "Key must not be empty"))]
    pub key: String,
}

/// Response after confirming an upload
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUploadResponse {
    pub success: bool,
    /// Public URL computed from bucket/region/key
    pub url: String,
    pub file_upload: UploadRecord,
}

/// Request to delete a stored object and its records
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    #[validate(length(min = 1, message = "Key must not be empty"))]
    pub key: String,
    pub product_id: Uuid,
}

/// Response after deleting a file
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileResponse {
    pub success: bool,
    pub message: String,
    pub key: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle state of an upload record.
///
/// Transitions are monotonic: `Pending -> Completed`, `Pending -> Failed`,
/// `{Pending, Completed} -> Deleted`. Stores enforce this with guarded
/// updates; a resurrection attempt surfaces as an invalid-state error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Completed,
    Failed,
    Deleted,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
            UploadStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown upload status: {0}")]
pub struct ParseUploadStatusError(String);

impl std::str::FromStr for UploadStatus {
    type Err = ParseUploadStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            "deleted" => Ok(UploadStatus::Deleted),
            other => Err(ParseUploadStatusError(other.to_string())),
        }
    }
}

/// One attempted file transfer.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: Uuid,
    /// Storage object path, server-generated at initiation and immutable.
    pub key: String,
    /// Original filename, sanitized.
    pub filename: String,
    pub content_type: String,
    /// Client-declared size until confirm, then the store-reported size.
    pub file_size: i64,
    /// Owner, set from the authenticated caller. Immutable.
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    pub status: UploadStatus,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Build a fresh PENDING record at initiation time.
    pub fn new_pending(
        key: String,
        filename: String,
        content_type: String,
        file_size: i64,
        user_id: Uuid,
        product_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        UploadRecord {
            id: Uuid::new_v4(),
            key,
            filename,
            content_type,
            file_size,
            user_id,
            product_id,
            status: UploadStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for UploadRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<UploadStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(UploadRecord {
            id: row.try_get("id")?,
            key: row.try_get("object_key")?,
            filename: row.try_get("filename")?,
            content_type: row.try_get("content_type")?,
            file_size: row.try_get("file_size")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            status,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Product row, as far as this service needs it: identity and owner.
/// The full product schema belongs to the catalog application.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Association between a product and a confirmed stored object.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImageRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub object_key: String,
    pub created_at: DateTime<Utc>,
}

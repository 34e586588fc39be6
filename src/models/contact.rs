//! Contact model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Value of the `object` field on every contact
pub const CONTACT_OBJECT: &str = "contact";

/// A contact synced from the user's mail account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    /// Public identifier, unique within the namespace
    pub id: String,
    /// Namespace the contact belongs to
    pub namespace_id: String,
    /// Display name (may be empty)
    pub name: String,
    /// Email address (may be empty)
    pub email: String,
    /// Always `"contact"`
    pub object: String,
}

impl Contact {
    /// Create a new contact
    pub fn new(id: String, namespace_id: String, name: String, email: String) -> Self {
        Self {
            id,
            namespace_id,
            name,
            email,
            object: CONTACT_OBJECT.to_string(),
        }
    }
}

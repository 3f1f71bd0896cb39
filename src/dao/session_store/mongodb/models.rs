use serde::{Deserialize, Serialize};

/// One key/value pair; the key doubles as the document `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoValueDocument {
    /// Store key.
    #[serde(rename = "_id")]
    pub key: String,
    /// Stored value.
    pub value: String,
}

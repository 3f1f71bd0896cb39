use serde::{Deserialize, Serialize};

/// Prefix of every value document id.
pub const VALUE_PREFIX: &str = "kv::";

/// Document wrapping one stored value; `_rev` is carried over on every update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchValueDocument {
    /// Document id, `kv::<key>`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Current revision, absent on first write.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Stored value.
    pub value: String,
}

/// Document id for a store key.
pub fn value_doc_id(key: &str) -> String {
    format!("{VALUE_PREFIX}{key}")
}

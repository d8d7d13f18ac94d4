use serde::{Deserialize, Serialize};

use super::null_as_empty;

/// An application/role pair the user may mint a token for.
/// `role_id` is unique within one catalog fetch and is the selection key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationOption {
    pub application_id: String,
    pub role_id: String,
    #[serde(rename = "component_id", deserialize_with = "null_as_empty", default)]
    pub component_id: String,
    #[serde(rename = "component_name", deserialize_with = "null_as_empty", default)]
    pub name: String,
    #[serde(rename = "component_desc", deserialize_with = "null_as_empty", default)]
    pub description: String,
}

impl ApplicationOption {
    /// Find the option for a role in a catalog snapshot
    pub fn find<'a>(options: &'a [ApplicationOption], role_id: &str) -> Option<&'a ApplicationOption> {
        options.iter().find(|o| o.role_id == role_id)
    }
}

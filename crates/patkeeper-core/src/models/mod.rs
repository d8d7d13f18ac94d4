//! Data models for the token manager.
//!
//! - `Identity`: the signed-in user and their credential
//! - `ApplicationOption`: one application/role pair a token can be minted for
//! - `Token`: a Personal Access Token as listed or generated by the backend

pub mod application;
pub mod identity;
pub mod token;

pub use application::ApplicationOption;
pub use identity::Identity;
pub use token::{parse_timestamp, GeneratedPat, Token};

use serde::{Deserialize, Deserializer};

/// Nullable text columns read as empty strings
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

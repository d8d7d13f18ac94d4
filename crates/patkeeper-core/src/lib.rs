//! patkeeper core - sign in, list, generate and safely display Personal
//! Access Tokens.
//!
//! Components, leaf to root:
//! - [`auth::SessionStore`]: the signed-in identity, persisted across restarts
//! - [`catalog::ApplicationCatalog`]: applications/roles a token can target
//! - [`registry::TokenRegistry`]: the user's token collection
//! - [`presenter`]: status, masking and date formatting for display
//! - [`controller::SessionController`]: gates everything on being signed in

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod notice;
pub mod presenter;
pub mod registry;
pub mod utils;

pub use api::{ApiClient, ApiError, Backend};
pub use config::Config;
pub use controller::{Clipboard, ClipboardError, SessionController, SessionState};
pub use error::{ControllerError, ErrorKind};
pub use models::{ApplicationOption, Identity, Token};
pub use notice::{Notice, Severity};

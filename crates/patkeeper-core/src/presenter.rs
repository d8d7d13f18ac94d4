//! Display derivations for tokens: expiry status, masking, expiry dates,
//! and the per-token reveal toggle.
//!
//! Nothing here is cached. Status is recomputed against the supplied `now`
//! on every call so it never drifts stale.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::Token;
use crate::utils::format_date;

/// Replacement character for the hidden middle of a secret
pub const MASK_CHAR: char = '*';

/// Fixed width of the masked run, regardless of secret length
pub const MASK_WIDTH: usize = 32;

/// Characters kept visible at each end of a masked secret
const VISIBLE_EDGE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Expired,
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenState::Active => write!(f, "active"),
            TokenState::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayStatus {
    pub state: TokenState,
    pub computed_at: DateTime<Utc>,
}

/// `Expired` iff the expiry is strictly before `now`
pub fn status(token: &Token, now: DateTime<Utc>) -> DisplayStatus {
    let state = if token.expires_at < now {
        TokenState::Expired
    } else {
        TokenState::Active
    };
    DisplayStatus {
        state,
        computed_at: now,
    }
}

/// First 8 characters, a fixed run of 32 mask characters, last 8 characters.
///
/// Secrets shorter than 16 characters still get both edges, so the edges
/// overlap and repeat characters; shorter than 8 shows the whole secret twice.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let head_end = chars.len().min(VISIBLE_EDGE);
    let tail_start = chars.len().saturating_sub(VISIBLE_EDGE);

    let mut masked = String::with_capacity(secret.len() * 2 + MASK_WIDTH);
    masked.extend(&chars[..head_end]);
    masked.extend(std::iter::repeat(MASK_CHAR).take(MASK_WIDTH));
    masked.extend(&chars[tail_start..]);
    masked
}

/// Calendar date of expiry, without time of day
pub fn format_expiry(expires_at: &DateTime<Utc>) -> String {
    format_date(expires_at)
}

/// Which tokens currently show their plain secret, keyed by owner
/// application id. Holds no secret material itself.
#[derive(Debug, Default, Clone)]
pub struct RevealState {
    visible: HashSet<String>,
}

impl RevealState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip visibility for a token; returns true if it is now revealed
    pub fn toggle(&mut self, owner_application_id: &str) -> bool {
        if self.visible.remove(owner_application_id) {
            false
        } else {
            self.visible.insert(owner_application_id.to_string());
            true
        }
    }

    pub fn reveal(&mut self, owner_application_id: &str) {
        self.visible.insert(owner_application_id.to_string());
    }

    pub fn is_revealed(&self, owner_application_id: &str) -> bool {
        self.visible.contains(owner_application_id)
    }

    /// The secret as it should be shown right now
    pub fn display(&self, token: &Token) -> String {
        if self.is_revealed(&token.owner_application_id) {
            token.secret.clone()
        } else {
            mask(&token.secret)
        }
    }

    pub fn clear(&mut self) {
        self.visible.clear();
    }
}

/// Everything a front end needs to render one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenView {
    pub owner_application_id: String,
    pub application_name: String,
    pub component_name: String,
    pub status: DisplayStatus,
    pub secret: String,
    pub revealed: bool,
    pub expires: String,
}

pub fn present(token: &Token, now: DateTime<Utc>, reveal: &RevealState) -> TokenView {
    TokenView {
        owner_application_id: token.owner_application_id.clone(),
        application_name: token.application_name.clone(),
        component_name: token.component_name.clone(),
        status: status(token, now),
        secret: reveal.display(token),
        revealed: reveal.is_revealed(&token.owner_application_id),
        expires: format_expiry(&token.expires_at),
    }
}

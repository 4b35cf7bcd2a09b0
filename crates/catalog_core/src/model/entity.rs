//! Base entity fields embedded by every catalog row.
//!
//! # Responsibility
//! - Provide the opaque `EntityId` key type.
//! - Provide `EntityMeta`, the id/timestamp block composed into entities.
//!
//! # Invariants
//! - `EntityId` is opaque: callers must not derive meaning from its text.
//! - `created_at <= updated_at` for every row read back from the store.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque, globally unique identifier of one catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps an identifier that already exists (storage or request input).
    ///
    /// New identifiers must come from an `IdentifierGenerator`.
    pub fn from_existing(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields shared by every entity level, embedded by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub id: EntityId,
    /// Unix epoch milliseconds, written by the store at insert.
    pub created_at: i64,
    /// Unix epoch milliseconds. Equals `created_at` until an update path exists.
    pub updated_at: i64,
}

/// Entity level tag used in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Singer,
    Album,
    Track,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Singer => "singers",
            Self::Album => "albums",
            Self::Track => "tracks",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Singer => "singer",
            Self::Album => "album",
            Self::Track => "track",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

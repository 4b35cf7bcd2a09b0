//! Supported query predicates over the catalog.
//!
//! # Responsibility
//! - Enumerate the predicate shapes the store knows how to execute.
//! - Reject unsupported shapes and malformed values at construction time.
//!
//! # Invariants
//! - A constructed predicate never fails for shape reasons at execution time.
//! - Release-date predicates imply ascending release-date ordering.

use crate::model::catalog::{parse_date, ValidationError};
use crate::model::entity::{EntityId, EntityKind};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Comparison operator of a raw `(field, op, value)` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Prefix,
    Before,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Prefix => "prefix",
            Self::Before => "before",
        }
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eq" | "=" => Ok(Self::Eq),
            "prefix" => Ok(Self::Prefix),
            "before" | "<" => Ok(Self::Before),
            other => Err(format!(
                "unknown operator `{other}`; expected eq|prefix|before"
            )),
        }
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters over singers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingerPredicate {
    IdEquals(EntityId),
    LastNameEquals(String),
    LastNamePrefix(String),
    /// Singers with at least one album released before the date, ordered by
    /// their earliest such release.
    ReleasedAlbumBefore(NaiveDate),
}

impl SingerPredicate {
    pub fn parse(field: &str, op: CompareOp, value: &str) -> Result<Self, PredicateError> {
        match (field.trim(), op) {
            ("id", CompareOp::Eq) => Ok(Self::IdEquals(EntityId::from_existing(
                required_value("id", value)?,
            ))),
            ("last_name", CompareOp::Eq) => {
                Ok(Self::LastNameEquals(required_value("last_name", value)?))
            }
            ("last_name", CompareOp::Prefix) => {
                Ok(Self::LastNamePrefix(required_value("last_name", value)?))
            }
            ("album.release_date", CompareOp::Before) => Ok(Self::ReleasedAlbumBefore(
                parse_date("album.release_date", value)?,
            )),
            (other, op) => Err(InvalidPredicateError {
                target: EntityKind::Singer,
                field: other.to_string(),
                op,
            }
            .into()),
        }
    }
}

/// Filters over albums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumPredicate {
    IdEquals(EntityId),
    SingerIdEquals(EntityId),
    TitlePrefix(String),
    /// Ordered ascending by release date; undated albums never match.
    ReleasedBefore(NaiveDate),
}

impl AlbumPredicate {
    pub fn parse(field: &str, op: CompareOp, value: &str) -> Result<Self, PredicateError> {
        match (field.trim(), op) {
            ("id", CompareOp::Eq) => Ok(Self::IdEquals(EntityId::from_existing(
                required_value("id", value)?,
            ))),
            ("singer_id", CompareOp::Eq) => Ok(Self::SingerIdEquals(EntityId::from_existing(
                required_value("singer_id", value)?,
            ))),
            ("title", CompareOp::Prefix) => Ok(Self::TitlePrefix(required_value("title", value)?)),
            ("release_date", CompareOp::Before) => {
                Ok(Self::ReleasedBefore(parse_date("release_date", value)?))
            }
            (other, op) => Err(InvalidPredicateError {
                target: EntityKind::Album,
                field: other.to_string(),
                op,
            }
            .into()),
        }
    }
}

/// Unsupported `(field, op)` combination for the target entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPredicateError {
    pub target: EntityKind,
    pub field: String,
    pub op: CompareOp,
}

impl Display for InvalidPredicateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported {} predicate: `{} {}`",
            self.target, self.field, self.op
        )
    }
}

impl Error for InvalidPredicateError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateError {
    Unsupported(InvalidPredicateError),
    Validation(ValidationError),
}

impl Display for PredicateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PredicateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unsupported(err) => Some(err),
            Self::Validation(err) => Some(err),
        }
    }
}

impl From<InvalidPredicateError> for PredicateError {
    fn from(value: InvalidPredicateError) -> Self {
        Self::Unsupported(value)
    }
}

impl From<ValidationError> for PredicateError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

fn required_value(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    Ok(trimmed.to_string())
}

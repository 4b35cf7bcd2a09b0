//! Singer/album/track entities and their creation inputs.
//!
//! # Responsibility
//! - Define hydrated read models (`Singer`, `Album`, `Track`).
//! - Define creation specs consumed by graph creation.
//! - Validate inputs before any store access.
//!
//! # Invariants
//! - Names and titles are non-blank after trim and bounded in length.
//! - Track numbers are 1-based and contiguous within one album.
//! - A `TrackCount::Between` range is non-empty and bounded by `MAX_TRACKS_PER_ALBUM`.

use crate::model::entity::{EntityId, EntityMeta};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_NAME_CHARS: usize = 128;
pub const MAX_TITLE_CHARS: usize = 256;
pub const MAX_TRACKS_PER_ALBUM: u32 = 99;

/// Storage and wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parent entity: a performer owning zero or more albums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Singer {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    /// Empty unless loaded with hydration.
    pub albums: Vec<Album>,
}

/// Child entity: owned by one singer, owns zero or more tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub singer_id: EntityId,
    pub title: String,
    pub release_date: Option<NaiveDate>,
    /// Empty unless loaded with hydration.
    pub tracks: Vec<Track>,
}

/// Grandchild entity: owned by one album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub album_id: EntityId,
    pub track_number: u32,
    pub title: String,
    pub duration_secs: u32,
}

/// Input for creating one singer row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingerSpec {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
}

impl SingerSpec {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("first_name", &self.first_name, MAX_NAME_CHARS)?;
        validate_text("last_name", &self.last_name, MAX_NAME_CHARS)?;
        Ok(())
    }
}

/// How many tracks graph creation generates under one album.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackCount {
    Exact(u32),
    /// Inclusive range; the count is drawn uniformly at creation time.
    Between { min: u32, max: u32 },
}

impl TrackCount {
    pub fn validate(self) -> Result<(), ValidationError> {
        match self {
            Self::Exact(count) if count > MAX_TRACKS_PER_ALBUM => {
                Err(ValidationError::TooManyTracks {
                    requested: count,
                    max: MAX_TRACKS_PER_ALBUM,
                })
            }
            Self::Exact(_) => Ok(()),
            Self::Between { min, max } if min > max => {
                Err(ValidationError::EmptyTrackRange { min, max })
            }
            Self::Between { max, .. } if max > MAX_TRACKS_PER_ALBUM => {
                Err(ValidationError::TooManyTracks {
                    requested: max,
                    max: MAX_TRACKS_PER_ALBUM,
                })
            }
            Self::Between { .. } => Ok(()),
        }
    }
}

/// Input for creating one album row plus its generated tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSpec {
    pub title: String,
    pub release_date: Option<NaiveDate>,
    pub tracks: TrackCount,
}

impl AlbumSpec {
    pub fn new(title: impl Into<String>, tracks: TrackCount) -> Self {
        Self {
            title: title.into(),
            release_date: None,
            tracks,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("title", &self.title, MAX_TITLE_CHARS)?;
        self.tracks.validate()
    }
}

/// Fully resolved track row input, synthesized during graph creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSpec {
    pub track_number: u32,
    pub title: String,
    pub duration_secs: u32,
}

impl TrackSpec {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.track_number == 0 {
            return Err(ValidationError::NotPositive("track_number"));
        }
        validate_text("title", &self.title, MAX_TITLE_CHARS)
    }
}

/// Malformed or out-of-range input to creation or predicate construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Blank(&'static str),
    TooLong { field: &'static str, max: usize },
    NotPositive(&'static str),
    InvalidDate { field: String, value: String },
    EmptyTrackRange { min: u32, max: u32 },
    TooManyTracks { requested: u32, max: u32 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max } => {
                write!(f, "{field} exceeds maximum length of {max} characters")
            }
            Self::NotPositive(field) => write!(f, "{field} must be positive"),
            Self::InvalidDate { field, value } => {
                write!(f, "{field} has invalid date `{value}`; expected YYYY-MM-DD")
            }
            Self::EmptyTrackRange { min, max } => {
                write!(f, "track count range {min}..={max} is empty")
            }
            Self::TooManyTracks { requested, max } => {
                write!(f, "track count {requested} exceeds maximum {max}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Parses a `YYYY-MM-DD` date, attributing failures to `field`.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ValidationError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        }
    })
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn validate_text(field: &'static str, value: &str, max_chars: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong {
            field,
            max: max_chars,
        });
    }
    Ok(())
}

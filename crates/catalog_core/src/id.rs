//! Opaque identifier generation.
//!
//! # Responsibility
//! - Produce one globally unique `EntityId` per entity instance.
//!
//! # Invariants
//! - Identifiers come from a high-entropy source, never a counter or content hash.
//! - Entropy failures propagate to the caller instead of falling back.

use crate::model::entity::EntityId;
use rand::rngs::OsRng;
use rand::RngCore;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Builder;

/// Source of fresh entity identifiers.
pub trait IdentifierGenerator {
    fn generate(&self) -> Result<EntityId, IdError>;
}

/// Random UUIDv4 identifiers drawn from the operating system entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdentifierGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<EntityId, IdError> {
        let mut bytes = [0_u8; 16];
        OsRng.try_fill_bytes(&mut bytes).map_err(IdError::Entropy)?;
        let uuid = Builder::from_random_bytes(bytes).into_uuid();
        Ok(EntityId::from_existing(uuid.to_string()))
    }
}

impl<G: IdentifierGenerator + ?Sized> IdentifierGenerator for &G {
    fn generate(&self) -> Result<EntityId, IdError> {
        (**self).generate()
    }
}

#[derive(Debug)]
pub enum IdError {
    Entropy(rand::Error),
}

impl Display for IdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entropy(err) => write!(f, "entropy source failed: {err}"),
        }
    }
}

impl Error for IdError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Entropy(err) => Some(err),
        }
    }
}

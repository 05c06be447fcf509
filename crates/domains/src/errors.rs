//! # DomainError
//!
//! Centralized error handling for the forum service.
//! Every port and service returns [`DomainResult`]; adapters translate their
//! driver errors into [`DomainError::Internal`] before crossing a port.

use std::fmt;

use thiserror::Error;

/// The aggregate a [`DomainError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Forum,
    Thread,
    Post,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "user",
            Entity::Forum => "forum",
            Entity::Thread => "thread",
            Entity::Post => "post",
        };
        f.write_str(name)
    }
}

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., User, Forum, Thread, Post)
    #[error("{0} not found: {1}")]
    NotFound(Entity, String),

    /// A post in a batch references a parent that is not in the same thread
    #[error("parent post {0} not found in thread")]
    ParentNotFound(i64),

    /// Resource already exists or a uniqueness rule was violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input rejected before touching storage
    #[error("validation error: {0}")]
    Validation(String),

    /// Infrastructure failure (e.g., DB down, pool exhausted)
    #[error("internal service error: {0}")]
    Internal(String),
}

/// Coarse classification used by transport adapters to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    Internal,
}

impl DomainError {
    pub fn user_not_found(nickname: impl Into<String>) -> Self {
        Self::NotFound(Entity::User, nickname.into())
    }

    pub fn forum_not_found(slug: impl Into<String>) -> Self {
        Self::NotFound(Entity::Forum, slug.into())
    }

    pub fn thread_not_found(slug_or_id: impl Into<String>) -> Self {
        Self::NotFound(Entity::Thread, slug_or_id.into())
    }

    pub fn post_not_found(id: i64) -> Self {
        Self::NotFound(Entity::Post, id.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound(..) => ErrorKind::NotFound,
            DomainError::ParentNotFound(_) | DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Validation(_) => ErrorKind::BadRequest,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self, entity: Entity) -> bool {
        matches!(self, DomainError::NotFound(e, _) if *e == entity)
    }
}

/// A specialized Result type for domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

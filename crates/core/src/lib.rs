//! Core domain types and shared logic for content revalidation.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Invalidation targets (paths and tags)
//! - Named scopes and content-entity changes
//! - Requests, per-target outcomes and aggregated results
//! - Target resolution
//! - Secret validation
//! - Configuration

pub mod config;
pub mod error;
pub mod outcome;
pub mod request;
pub mod resolver;
pub mod scope;
pub mod secret;
pub mod target;

pub use error::{Error, Result};
pub use outcome::{InvalidationOutcome, InvalidationResult, ResultStatus};
pub use request::{InvalidationRequest, Scope};
pub use resolver::resolve;
pub use scope::{ContentChange, ContentEntity, NamedScope};
pub use secret::SecretValidator;
pub use target::{InvalidationTarget, TargetKind};

//! Incoming revalidation requests.

use crate::scope::{ContentChange, NamedScope};
use serde::Serialize;
use std::fmt;

/// What a request asks to invalidate beyond a single path or tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Named(NamedScope),
    Content(ContentChange),
}

/// One revalidation call. Immutable once built; dropped after handling.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationRequest {
    #[serde(skip_serializing)]
    secret: String,
    pub path: Option<String>,
    pub tag: Option<String>,
    pub scope: Option<Scope>,
}

impl InvalidationRequest {
    /// Create a request that resolves to nothing until a path, tag or scope is set.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            path: None,
            tag: None,
            scope: None,
        }
    }

    pub fn for_path(secret: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(secret).with_path(path)
    }

    pub fn for_tag(secret: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(secret).with_tag(tag)
    }

    pub fn for_scope(secret: impl Into<String>, scope: NamedScope) -> Self {
        Self::new(secret).with_scope(Scope::Named(scope))
    }

    pub fn for_content(secret: impl Into<String>, change: ContentChange) -> Self {
        Self::new(secret).with_scope(Scope::Content(change))
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The caller-supplied secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The named scope, if this request carries one.
    pub fn named_scope(&self) -> Option<NamedScope> {
        match &self.scope {
            Some(Scope::Named(scope)) => Some(*scope),
            _ => None,
        }
    }
}

impl fmt::Debug for InvalidationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationRequest")
            .field("secret", &"<redacted>")
            .field("path", &self.path)
            .field("tag", &self.tag)
            .field("scope", &self.scope)
            .finish()
    }
}

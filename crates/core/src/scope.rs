//! Named scopes and content-entity changes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed set of targets triggered by a single logical event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedScope {
    /// Listing pages that can lose rows when content is deleted.
    Deletions,
    /// Every public page and every data tag.
    Nuclear,
    /// The root layout only.
    Rebuild,
}

impl NamedScope {
    pub const ALL: [NamedScope; 3] = [Self::Deletions, Self::Nuclear, Self::Rebuild];

    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "deletions" => Ok(Self::Deletions),
            "nuclear" => Ok(Self::Nuclear),
            "rebuild" => Ok(Self::Rebuild),
            _ => Err(crate::Error::UnknownScope(s.to_string())),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deletions => "deletions",
            Self::Nuclear => "nuclear",
            Self::Rebuild => "rebuild",
        }
    }
}

impl fmt::Display for NamedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of content managed from the admin dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEntity {
    Project,
    Service,
    Faq,
    ProcessStep,
    Testimonial,
    Page,
}

impl ContentEntity {
    /// Parse from string. Accepts the plural table names too.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "project" | "projects" => Ok(Self::Project),
            "service" | "services" => Ok(Self::Service),
            "faq" | "faqs" => Ok(Self::Faq),
            "process_step" | "process_steps" | "process-step" | "process-steps" => {
                Ok(Self::ProcessStep)
            }
            "testimonial" | "testimonials" => Ok(Self::Testimonial),
            "page" | "pages" => Ok(Self::Page),
            _ => Err(crate::Error::UnknownEntity(s.to_string())),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Service => "service",
            Self::Faq => "faq",
            Self::ProcessStep => "process_step",
            Self::Testimonial => "testimonial",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for ContentEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A create/update/delete of one piece of content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    pub entity: ContentEntity,
    /// Public slug of the changed row, when it has a detail page.
    #[serde(default)]
    pub slug: Option<String>,
}

impl ContentChange {
    pub fn new(entity: ContentEntity, slug: Option<String>) -> Self {
        Self { entity, slug }
    }
}

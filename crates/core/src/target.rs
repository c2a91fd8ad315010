//! Invalidation targets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of cache key a target names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A rendered route, e.g. `/work`.
    Path,
    /// A data tag shared by every rendering that read it, e.g. `projects`.
    Tag,
}

impl TargetKind {
    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "path" => Ok(Self::Path),
            "tag" => Ok(Self::Tag),
            _ => Err(crate::Error::InvalidTarget(format!("unknown target kind: {s}"))),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cache key whose cached rendering must be discarded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvalidationTarget {
    pub kind: TargetKind,
    pub value: String,
}

impl InvalidationTarget {
    /// Create a path target. The value always starts with exactly one `/`.
    pub fn path(value: impl Into<String>) -> Self {
        let value = value.into();
        let value = format!("/{}", value.trim_start_matches('/'));
        Self {
            kind: TargetKind::Path,
            value,
        }
    }

    /// Create a tag target.
    pub fn tag(value: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Tag,
            value: value.into(),
        }
    }

    pub fn is_path(&self) -> bool {
        self.kind == TargetKind::Path
    }

    pub fn is_tag(&self) -> bool {
        self.kind == TargetKind::Tag
    }
}

impl fmt::Display for InvalidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_adds_leading_slash() {
        assert_eq!(InvalidationTarget::path("work").value, "/work");
        assert_eq!(InvalidationTarget::path("/work").value, "/work");
    }

    #[test]
    fn path_collapses_leading_slashes() {
        assert_eq!(
            InvalidationTarget::path("//attacker.example/x").value,
            "/attacker.example/x"
        );
        assert_eq!(InvalidationTarget::path("///").value, "/");
    }

    #[test]
    fn tag_is_kept_verbatim() {
        let target = InvalidationTarget::tag("projects");
        assert!(target.is_tag());
        assert_eq!(target.value, "projects");
    }

    #[test]
    fn kind_parse_and_display() {
        assert_eq!(TargetKind::parse("path").unwrap(), TargetKind::Path);
        assert_eq!(TargetKind::parse("tag").unwrap(), TargetKind::Tag);
        assert!(TargetKind::parse("route").is_err());
        assert_eq!(InvalidationTarget::path("/").to_string(), "path:/");
    }

    #[test]
    fn paths_sort_before_tags() {
        assert!(TargetKind::Path < TargetKind::Tag);
    }

    #[test]
    fn serializes_kind_lowercase() {
        let json = serde_json::to_value(InvalidationTarget::tag("faqs")).unwrap();
        assert_eq!(json["kind"], "tag");
        assert_eq!(json["value"], "faqs");
    }
}

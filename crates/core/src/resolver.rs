//! Maps a request to the cache keys it must invalidate.
//!
//! Named scope expansions are fixed tables; changing what `nuclear` touches
//! is a code change. Resolution is pure: the same request always yields the
//! same list, with every path ahead of every tag and duplicates removed.

use crate::request::{InvalidationRequest, Scope};
use crate::scope::{ContentChange, ContentEntity, NamedScope};
use crate::target::InvalidationTarget;
use std::collections::HashSet;

/// Fixed expansion of a named scope.
struct ScopeTable {
    paths: &'static [&'static str],
    tags: &'static [&'static str],
}

const DELETIONS: ScopeTable = ScopeTable {
    paths: &["/testimonials", "/projects", "/services", "/process"],
    tags: &["testimonials", "projects", "services", "process"],
};

const NUCLEAR: ScopeTable = ScopeTable {
    paths: &[
        "/",
        "/testimonials",
        "/projects",
        "/services",
        "/process",
        "/about",
        "/contact",
    ],
    tags: &["testimonials", "projects", "services", "process", "faqs"],
};

const REBUILD: ScopeTable = ScopeTable {
    paths: &["/"],
    tags: &[],
};

fn scope_table(scope: NamedScope) -> &'static ScopeTable {
    match scope {
        NamedScope::Deletions => &DELETIONS,
        NamedScope::Nuclear => &NUCLEAR,
        NamedScope::Rebuild => &REBUILD,
    }
}

/// Resolve a request into invalidation targets.
///
/// A scope takes precedence over `path`/`tag`. Blank values count as absent.
/// An empty result means nothing was requested.
pub fn resolve(request: &InvalidationRequest) -> Vec<InvalidationTarget> {
    let mut targets = Vec::new();

    match &request.scope {
        Some(Scope::Named(scope)) => {
            let table = scope_table(*scope);
            targets.extend(table.paths.iter().map(|p| InvalidationTarget::path(*p)));
            targets.extend(table.tags.iter().map(|t| InvalidationTarget::tag(*t)));
        }
        Some(Scope::Content(change)) => targets.extend(content_targets(change)),
        None => {
            if let Some(path) = non_blank(request.path.as_deref()) {
                targets.push(InvalidationTarget::path(path));
            }
            if let Some(tag) = non_blank(request.tag.as_deref()) {
                targets.push(InvalidationTarget::tag(tag));
            }
        }
    }

    order_and_dedup(targets)
}

/// Expand a content change into the listing, detail and admin pages that render it.
fn content_targets(change: &ContentChange) -> Vec<InvalidationTarget> {
    let slug = non_blank(change.slug.as_deref());
    let mut targets = Vec::new();

    let tag = match change.entity {
        ContentEntity::Project => {
            push_paths(&mut targets, &["/", "/work", "/projects", "/admin/projects"]);
            if let Some(slug) = slug {
                targets.push(InvalidationTarget::path(format!("/work/{slug}")));
                targets.push(InvalidationTarget::path(format!("/projects/{slug}")));
            }
            "projects"
        }
        ContentEntity::Service => {
            push_paths(&mut targets, &["/", "/services", "/admin/services"]);
            if let Some(slug) = slug {
                targets.push(InvalidationTarget::path(format!("/services/{slug}")));
            }
            "services"
        }
        ContentEntity::Faq => {
            push_paths(&mut targets, &["/", "/services", "/faqs", "/admin/faqs"]);
            "faqs"
        }
        ContentEntity::ProcessStep => {
            push_paths(&mut targets, &["/process", "/admin/process-steps"]);
            "process"
        }
        ContentEntity::Testimonial => {
            push_paths(&mut targets, &["/", "/testimonials", "/admin/testimonials"]);
            "testimonials"
        }
        ContentEntity::Page => {
            push_paths(&mut targets, &["/admin/pages"]);
            match slug {
                Some("home") | None => targets.push(InvalidationTarget::path("/")),
                Some(slug) => targets.push(InvalidationTarget::path(format!("/{slug}"))),
            }
            "pages"
        }
    };

    targets.push(InvalidationTarget::tag(tag));
    targets
}

fn push_paths(targets: &mut Vec<InvalidationTarget>, paths: &[&str]) {
    targets.extend(paths.iter().map(|p| InvalidationTarget::path(*p)));
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Stable sort paths ahead of tags, then drop repeats keeping the first.
fn order_and_dedup(mut targets: Vec<InvalidationTarget>) -> Vec<InvalidationTarget> {
    targets.sort_by_key(|t| t.kind);
    let mut seen = HashSet::new();
    targets.retain(|t| seen.insert(t.clone()));
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetKind;

    fn count(targets: &[InvalidationTarget], kind: TargetKind) -> usize {
        targets.iter().filter(|t| t.kind == kind).count()
    }

    #[test]
    fn single_path_yields_one_path_target() {
        let targets = resolve(&InvalidationRequest::for_path("s", "/work"));
        assert_eq!(targets, vec![InvalidationTarget::path("/work")]);
    }

    #[test]
    fn single_tag_yields_one_tag_target() {
        let targets = resolve(&InvalidationRequest::for_tag("s", "projects"));
        assert_eq!(targets, vec![InvalidationTarget::tag("projects")]);
    }

    #[test]
    fn path_and_tag_together_put_path_first() {
        let req = InvalidationRequest::new("s")
            .with_tag("projects")
            .with_path("/work");
        let targets = resolve(&req);
        assert_eq!(
            targets,
            vec![
                InvalidationTarget::path("/work"),
                InvalidationTarget::tag("projects")
            ]
        );
    }

    #[test]
    fn nuclear_is_seven_paths_and_five_tags() {
        let req = InvalidationRequest::for_scope("s", NamedScope::Nuclear)
            .with_path("/ignored")
            .with_tag("ignored");
        let targets = resolve(&req);
        assert_eq!(count(&targets, TargetKind::Path), 7);
        assert_eq!(count(&targets, TargetKind::Tag), 5);
        assert_eq!(targets[0], InvalidationTarget::path("/"));
        assert!(!targets.iter().any(|t| t.value.contains("ignored")));
    }

    #[test]
    fn deletions_table() {
        let targets = resolve(&InvalidationRequest::for_scope("s", NamedScope::Deletions));
        let values: Vec<_> = targets.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            values,
            vec![
                "path:/testimonials",
                "path:/projects",
                "path:/services",
                "path:/process",
                "tag:testimonials",
                "tag:projects",
                "tag:services",
                "tag:process",
            ]
        );
    }

    #[test]
    fn rebuild_is_root_only() {
        let targets = resolve(&InvalidationRequest::for_scope("s", NamedScope::Rebuild));
        assert_eq!(targets, vec![InvalidationTarget::path("/")]);
    }

    #[test]
    fn nothing_requested_is_empty() {
        assert!(resolve(&InvalidationRequest::new("s")).is_empty());
        let blank = InvalidationRequest::new("s").with_path("  ").with_tag("");
        assert!(resolve(&blank).is_empty());
    }

    #[test]
    fn resolution_is_deterministic() {
        let req = InvalidationRequest::for_scope("s", NamedScope::Nuclear);
        assert_eq!(resolve(&req), resolve(&req));
    }

    #[test]
    fn project_change_with_slug() {
        let req = InvalidationRequest::for_content(
            "s",
            ContentChange::new(ContentEntity::Project, Some("brand-refresh".to_string())),
        );
        let targets = resolve(&req);
        assert!(targets.contains(&InvalidationTarget::path("/work/brand-refresh")));
        assert!(targets.contains(&InvalidationTarget::path("/projects/brand-refresh")));
        assert_eq!(targets.last(), Some(&InvalidationTarget::tag("projects")));
        assert_eq!(count(&targets, TargetKind::Tag), 1);
    }

    #[test]
    fn page_change_maps_home_to_root() {
        let home = resolve(&InvalidationRequest::for_content(
            "s",
            ContentChange::new(ContentEntity::Page, Some("home".to_string())),
        ));
        assert!(home.contains(&InvalidationTarget::path("/")));

        let about = resolve(&InvalidationRequest::for_content(
            "s",
            ContentChange::new(ContentEntity::Page, Some("about".to_string())),
        ));
        assert!(about.contains(&InvalidationTarget::path("/about")));
        assert!(!about.contains(&InvalidationTarget::path("/")));
    }

    #[test]
    fn faq_change_has_no_duplicates() {
        let targets = resolve(&InvalidationRequest::for_content(
            "s",
            ContentChange::new(ContentEntity::Faq, None),
        ));
        let unique: HashSet<_> = targets.iter().collect();
        assert_eq!(unique.len(), targets.len());
    }
}

//! Catalog vocabulary: component status, target frameworks, and slug rules.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum slug length accepted by the API.
pub const MAX_SLUG_LENGTH: usize = 120;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

// ---------------------------------------------------------------------------
// Component status
// ---------------------------------------------------------------------------

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_PUBLISHED: &str = "published";
pub const STATUS_ARCHIVED: &str = "archived";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Draft,
    Published,
    Archived,
}

impl ComponentStatus {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            STATUS_DRAFT => Ok(Self::Draft),
            STATUS_PUBLISHED => Ok(Self::Published),
            STATUS_ARCHIVED => Ok(Self::Archived),
            other => Err(CoreError::Validation(format!(
                "Unknown component status '{other}'. Must be one of: draft, published, archived"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => STATUS_DRAFT,
            Self::Published => STATUS_PUBLISHED,
            Self::Archived => STATUS_ARCHIVED,
        }
    }
}

// ---------------------------------------------------------------------------
// Frameworks
// ---------------------------------------------------------------------------

/// UI frameworks a component version can target.
pub const FRAMEWORKS: &[&str] = &["react", "vue", "svelte", "angular", "html"];

/// Styling approaches a component version can target.
pub const CSS_FRAMEWORKS: &[&str] = &["tailwind", "css", "scss", "styled_components"];

pub fn validate_framework(framework: &str) -> Result<(), CoreError> {
    if FRAMEWORKS.contains(&framework) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown framework '{framework}'. Must be one of: {FRAMEWORKS:?}"
        )))
    }
}

pub fn validate_css_framework(css_framework: &str) -> Result<(), CoreError> {
    if CSS_FRAMEWORKS.contains(&css_framework) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown CSS framework '{css_framework}'. Must be one of: {CSS_FRAMEWORKS:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Derive a URL slug from a display name.
///
/// Lower-cases ASCII alphanumerics and collapses every other run of
/// characters into a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(MAX_SLUG_LENGTH);
    slug.trim_end_matches('-').to_string()
}

/// Validate a client-supplied slug.
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH {
        return Err(CoreError::Validation(format!(
            "Slug must be between 1 and {MAX_SLUG_LENGTH} characters"
        )));
    }
    if !SLUG_RE.is_match(slug) {
        return Err(CoreError::Validation(format!(
            "Invalid slug '{slug}'. Use lowercase letters, digits and single dashes"
        )));
    }
    Ok(())
}

/// Use the explicit slug when given (validated), else derive one from `name`.
pub fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, CoreError> {
    let slug = match explicit {
        Some(s) => s.trim().to_string(),
        None => slugify(name),
    };
    validate_slug(&slug)?;
    Ok(slug)
}

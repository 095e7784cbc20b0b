//! Slug normalization for group and profile URLs.

use crate::domain::error::DomainError;

pub const MAX_SLUG_LEN: usize = 64;

/// True when `candidate` is already in canonical slug form: lowercase ASCII
/// alphanumerics separated by single hyphens.
pub fn is_valid_slug(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.len() > MAX_SLUG_LEN {
        return false;
    }
    if candidate.starts_with('-') || candidate.ends_with('-') || candidate.contains("--") {
        return false;
    }
    candidate
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

/// Derive a canonical slug from free-form text.
pub fn slugify(input: &str) -> Result<String, DomainError> {
    let candidate = slug::slugify(input);
    if candidate.is_empty() {
        return Err(DomainError::validation(
            "text does not reduce to a usable slug",
        ));
    }
    let mut truncated: String = candidate.chars().take(MAX_SLUG_LEN).collect();
    while truncated.ends_with('-') {
        truncated.pop();
    }
    Ok(truncated)
}

/// Accept an explicit slug as-is when canonical, otherwise derive one from
/// the fallback text (typically a title).
pub fn resolve_slug(explicit: Option<&str>, fallback: &str) -> Result<String, DomainError> {
    match explicit {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return slugify(fallback);
            }
            if is_valid_slug(trimmed) {
                Ok(trimmed.to_string())
            } else {
                Err(DomainError::validation(format!(
                    "`{trimmed}` is not a valid slug"
                )))
            }
        }
        None => slugify(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_slugs_are_accepted() {
        assert!(is_valid_slug("test-slug"));
        assert!(is_valid_slug("a1"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("double--dash"));
        assert!(!is_valid_slug("Mixed-Case"));
    }

    #[test]
    fn slugify_normalizes_titles() {
        assert_eq!(slugify("Test Group").unwrap(), "test-group");
        assert_eq!(slugify("  Rust & Friends!  ").unwrap(), "rust-friends");
    }

    #[test]
    fn slugify_rejects_unusable_input() {
        assert!(slugify("!!!").is_err());
    }

    #[test]
    fn resolve_prefers_explicit_slug() {
        assert_eq!(
            resolve_slug(Some("test-slug"), "Whatever Title").unwrap(),
            "test-slug"
        );
        assert_eq!(resolve_slug(None, "Test Group").unwrap(), "test-group");
        assert!(resolve_slug(Some("Bad Slug"), "fallback").is_err());
    }

    #[test]
    fn long_slugs_are_truncated() {
        let long = "word ".repeat(40);
        let slug = slugify(&long).unwrap();
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }
}

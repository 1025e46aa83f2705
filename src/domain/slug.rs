//! Identifier helpers built on the `slug` crate.
//!
//! Front ids, slot ids and region names travel through cache keys and markup
//! attributes, so they are restricted to lowercase kebab-case:
//! [`validate_identifier`] rejects any value that [`derive_slug`] would
//! rewrite, and names the rewrite in its error.

use slug::slugify;
use thiserror::Error;

use super::error::DomainError;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Reject identifiers that would not survive slugification unchanged.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), DomainError> {
    match derive_slug(value) {
        Ok(slug) if slug == value => Ok(()),
        Ok(slug) => Err(DomainError::validation(
            field,
            format!("`{value}` is not a kebab-case identifier (did you mean `{slug}`?)"),
        )),
        Err(err) => Err(DomainError::validation(field, err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_normalises_case_and_spacing() {
        assert_eq!(derive_slug("World News").expect("slug"), "world-news");
        assert_eq!(derive_slug("  Tech & Science ").expect("slug"), "tech-science");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn validate_identifier_accepts_kebab_case() {
        assert!(validate_identifier("slot.id", "hero-top").is_ok());
        assert!(validate_identifier("front.id", "home").is_ok());
    }

    #[test]
    fn validate_identifier_rejects_other_shapes() {
        let err = validate_identifier("front.id", "Home Page").expect_err("not kebab-case");
        assert!(matches!(err, DomainError::Validation { field: "front.id", .. }));
        assert!(validate_identifier("front.id", "home:2").is_err());
        assert!(validate_identifier("front.id", "").is_err());
    }

    #[test]
    fn validate_identifier_suggests_the_derived_slug_without_applying_it() {
        let err = validate_identifier("front.regions", "Top Stories").expect_err("rewritten");
        assert!(err.to_string().contains("did you mean `top-stories`"));
        assert!(validate_identifier("front.regions", "top-stories").is_ok());
    }
}

//! Stock-keeping unit, the business key of a product.

use serde::Serialize;

use super::text::validated_text;

/// Errors that can occur when parsing a [`Sku`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SkuError {
    #[error("sku cannot be blank")]
    Blank,
    #[error("sku must be at most {max} characters")]
    TooLong { max: usize },
    #[error("sku cannot contain '/' or control characters")]
    InvalidCharacter,
}

/// A product SKU.
///
/// SKUs are supplied by the caller, are unique across the catalog and are
/// used as the path segment of product URLs, so they are trimmed and may not
/// contain a slash.
///
/// ```
/// use zebrands_core::Sku;
///
/// let sku = Sku::parse(" A1 ").unwrap();
/// assert_eq!(sku.as_str(), "A1");
/// assert!(Sku::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Sku(String);

validated_text!(Sku, SkuError);

impl Sku {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 32;

    /// Parse a SKU from user input.
    ///
    /// # Errors
    ///
    /// Returns [`SkuError`] if the trimmed value is blank, too long, or
    /// contains a character that cannot appear in a URL path segment.
    pub fn parse(s: &str) -> Result<Self, SkuError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SkuError::Blank);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(SkuError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(|c| c == '/' || c.is_control()) {
            return Err(SkuError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        assert_eq!(Sku::parse("  WID-001 ").unwrap().as_str(), "WID-001");
    }

    #[test]
    fn test_blank_rejected() {
        assert_eq!(Sku::parse(""), Err(SkuError::Blank));
        assert_eq!(Sku::parse(" \t"), Err(SkuError::Blank));
    }

    #[test]
    fn test_length_limit_counts_characters() {
        assert!(Sku::parse(&"x".repeat(32)).is_ok());
        assert_eq!(
            Sku::parse(&"x".repeat(33)),
            Err(SkuError::TooLong { max: 32 })
        );
        // 32 multi-byte characters are still within the limit
        assert!(Sku::parse(&"ñ".repeat(32)).is_ok());
    }

    #[test]
    fn test_slash_rejected() {
        assert_eq!(Sku::parse("A/1"), Err(SkuError::InvalidCharacter));
    }
}

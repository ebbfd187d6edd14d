//! Account email addresses.

use serde::Serialize;

use super::text::validated_text;

/// Why a string is not an acceptable email address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("address is blank")]
    Empty,
    #[error("address is longer than {max} characters")]
    TooLong { max: usize },
    #[error("address needs a single '@' between mailbox and domain")]
    AtSymbol,
    #[error("address contains whitespace")]
    Whitespace,
    #[error("mailbox part is empty")]
    EmptyLocalPart,
    #[error("domain is not a dotted host name")]
    InvalidDomain,
}

/// A syntactically valid email address.
///
/// Surrounding whitespace is stripped and the domain is lower-cased, so two
/// spellings of the same mailbox compare equal. The mailbox keeps its case.
///
/// ```
/// use zebrands_core::Email;
///
/// let email = Email::parse(" Ana@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "Ana@example.com");
///
/// assert!(Email::parse("no-at-symbol").is_err());
/// assert!(Email::parse("user@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

validated_text!(Email, EmailError);

impl Email {
    /// Longest address accepted, per RFC 5321.
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns the first [`EmailError`] found.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let raw = raw.trim();
        match raw.len() {
            0 => return Err(EmailError::Empty),
            n if n > Self::MAX_LENGTH => {
                return Err(EmailError::TooLong {
                    max: Self::MAX_LENGTH,
                });
            }
            _ => {}
        }
        if raw.contains(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let Some((mailbox, domain)) = raw.rsplit_once('@') else {
            return Err(EmailError::AtSymbol);
        };
        if mailbox.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if mailbox.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if !is_host_name(domain) {
            return Err(EmailError::InvalidDomain);
        }

        let mut normalized = String::with_capacity(raw.len());
        normalized.push_str(mailbox);
        normalized.push('@');
        normalized.push_str(&domain.to_ascii_lowercase());
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// At least two non-empty labels of letters, digits and inner hyphens.
fn is_host_name(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_shapes() {
        for ok in ["user@example.com", "user.name+tag@example.co.uk", "a@b.mx"] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_normalizes_domain_and_whitespace() {
        let email = Email::parse("  Ana.Lopez@Zebrands.MX\n").unwrap();
        assert_eq!(email.as_str(), "Ana.Lopez@zebrands.mx");
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@example.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("user@localhost"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("user@example..com"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("user@-bad.com"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("us er@example.com"), Err(EmailError::Whitespace));

        let long = format!("{}@example.com", "x".repeat(Email::MAX_LENGTH));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_deserializing_validates() {
        let ok: Email = serde_json::from_str("\"user@Example.com\"").unwrap();
        assert_eq!(ok.as_str(), "user@example.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}

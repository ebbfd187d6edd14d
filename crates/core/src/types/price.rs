//! Fixed-point product price.
//!
//! Prices are stored as `NUMERIC(16, 2)`: at most 16 significant digits, two
//! of them after the decimal point. Input is checked against those limits
//! before it reaches the store, and output always carries exactly two decimal
//! places (`"10"` comes back as `"10.00"`).

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`Price`].
///
/// The messages are user-facing and surface verbatim in validation responses.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure that there are no more than {max} digits in total.")]
    TooManyDigits { max: u32 },
    #[error("Ensure that there are no more than {max} decimal places.")]
    TooManyDecimalPlaces { max: u32 },
    #[error("Ensure that there are no more than {max} digits before the decimal point.")]
    TooManyWholeDigits { max: u32 },
}

/// A product price with two decimal places.
///
/// Negative values are representable; the catalog does not forbid them.
///
/// ```
/// use zebrands_core::Price;
///
/// assert_eq!(Price::parse("9.99").unwrap().to_string(), "9.99");
/// assert_eq!(Price::parse("10").unwrap().to_string(), "10.00");
/// assert!(Price::parse("1.999").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Total significant digits allowed.
    pub const MAX_DIGITS: u32 = 16;
    /// Digits allowed after the decimal point.
    pub const DECIMAL_PLACES: u32 = 2;

    /// Parse a price from its textual form.
    ///
    /// Plain (`"12.50"`) and scientific (`"1.25e1"`) notation are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] if the text is not a number, or one of
    /// the precision errors if it does not fit `NUMERIC(16, 2)`.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let s = s.trim();
        let value = Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|_| PriceError::Invalid)?;
        Self::from_decimal(value)
    }

    /// Build a price from a decimal, enforcing the precision limits.
    ///
    /// Trailing zeros count as decimal places, so `1.500` is rejected.
    ///
    /// # Errors
    ///
    /// Returns one of the precision variants of [`PriceError`].
    pub fn from_decimal(value: Decimal) -> Result<Self, PriceError> {
        let scale = value.scale();
        let mantissa_digits = u32::try_from(value.mantissa().unsigned_abs().to_string().len())
            .map_err(|_| PriceError::Invalid)?;
        let digits = mantissa_digits.max(scale);
        let whole_digits = digits - scale;

        if digits > Self::MAX_DIGITS {
            return Err(PriceError::TooManyDigits {
                max: Self::MAX_DIGITS,
            });
        }
        if scale > Self::DECIMAL_PLACES {
            return Err(PriceError::TooManyDecimalPlaces {
                max: Self::DECIMAL_PLACES,
            });
        }
        let max_whole = Self::MAX_DIGITS - Self::DECIMAL_PLACES;
        if whole_digits > max_whole {
            return Err(PriceError::TooManyWholeDigits { max: max_whole });
        }

        let mut value = value;
        value.rescale(Self::DECIMAL_PLACES);
        Ok(Self(value))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

/// Accepts both `"9.99"` and `9.99` so JSON clients may send either.
struct PriceVisitor;

impl Visitor<'_> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or numeric string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
        Price::parse(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
        Price::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
        Price::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
        Price::parse(&v.to_string()).map_err(E::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_decimal(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

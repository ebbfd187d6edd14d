//! Core types for the catalog.
//!
//! This module provides type-safe wrappers for common domain concepts.

mod text;

pub mod email;
pub mod id;
pub mod price;
pub mod role;
pub mod sku;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use role::{Role, RoleSet};
pub use sku::{Sku, SkuError};

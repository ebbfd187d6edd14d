//! Request and domain models.

pub mod caller;
pub mod product;
pub mod user;
pub mod validation;

pub use caller::{Caller, CurrentUser};
pub use product::{NewProduct, Product, ProductChanges, ProductDetail, ProductStats, ProductSummary};
pub use user::{Credentials, NewUser, User, UserChanges, UserView};
pub use validation::{Payload, ValidationErrors};

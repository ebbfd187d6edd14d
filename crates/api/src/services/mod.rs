//! Business logic services.

pub mod access;
pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod email;
pub mod notifications;
pub mod tasks;
pub mod view_counter;

pub use accounts::AccountService;
pub use catalog::{CatalogService, UpdateMode};
pub use email::{Mailer, SendGridClient};
pub use tasks::{Task, TaskQueue, TaskRunner, WorkerHandle, WorkerQueue};

//! Authorization group maintenance.

use zebrands_api::db::{UserRepository, UserStore};

use super::{CommandError, connect};

/// Create the `ProductAdmin` and `UserAdmin` groups if either is missing.
///
/// Registration fails with "Not found." until the `UserAdmin` group exists,
/// so run this after restoring a database that lost its seed rows.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn sync() -> Result<(), CommandError> {
    let pool = connect().await?;
    let users = UserRepository::new(pool);

    let created = users.ensure_groups().await?;
    if created == 0 {
        tracing::info!("All groups already exist");
    } else {
        tracing::info!(created, "Missing groups created");
    }
    Ok(())
}

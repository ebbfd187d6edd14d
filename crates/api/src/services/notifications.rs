//! Product-change notification side effect.
//!
//! Every member of the `ProductAdmin` group gets one templated email per
//! change. Sends are independent: a failed recipient is logged and the
//! remaining ones are still attempted. Nothing is retried.

use tracing::{info, instrument, warn};

use zebrands_core::{Role, Sku};

use super::email::{Mailer, ProductChangeData};
use crate::db::{ProductStore, RepositoryError, UserStore};

/// Delivery outcome of one notification run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotificationReport {
    pub sent: usize,
    pub failed: usize,
}

/// Notify product admins that `sku` changed.
///
/// The product is read when the task runs, so the email reflects its state
/// at that moment rather than at the time of the change.
///
/// # Errors
///
/// Returns `RepositoryError` if the product or the recipients cannot be
/// loaded. Per-recipient send failures are counted, not returned.
#[instrument(skip(products, users, mailer), fields(sku = %sku))]
pub async fn notify_product_change(
    products: &dyn ProductStore,
    users: &dyn UserStore,
    mailer: &dyn Mailer,
    sku: &Sku,
) -> Result<NotificationReport, RepositoryError> {
    let Some(product) = products.get_by_sku(sku).await? else {
        info!("Product no longer exists, skipping notification");
        return Ok(NotificationReport::default());
    };

    let recipients = users.list_group_members(Role::ProductAdmin).await?;
    let mut report = NotificationReport::default();

    for recipient in &recipients {
        let data = ProductChangeData {
            username: recipient.display_name(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            sku: product.sku.to_string(),
        };
        match mailer.send_product_change(&recipient.email, &data).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                warn!(
                    recipient = %recipient.username,
                    error = %e,
                    "Failed to send product change email"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        sent = report.sent,
        failed = report.failed,
        "Product change notification finished"
    );
    Ok(report)
}

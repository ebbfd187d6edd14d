//! Transactional email delivery.
//!
//! Messages are rendered by the provider from a hosted dynamic template;
//! this side only supplies the recipient and the template variables.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use zebrands_core::Email;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be configured.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Variables bound into the product-change template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductChangeData {
    /// Recipient display name.
    pub username: String,
    pub name: String,
    pub brand: String,
    pub sku: String,
}

/// Outbound email seam.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the product-change template to a single recipient.
    async fn send_product_change(
        &self,
        to: &Email,
        data: &ProductChangeData,
    ) -> Result<(), EmailError>;
}

/// `SendGrid` v3 mail-send client.
#[derive(Clone)]
pub struct SendGridClient {
    client: reqwest::Client,
    endpoint: String,
    from: Email,
    product_change_template_id: String,
}

impl SendGridClient {
    /// Create a new `SendGrid` client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| EmailError::Config(format!("invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v3/mail/send", config.base_url.trim_end_matches('/')),
            from: config.from_address.clone(),
            product_change_template_id: config.product_change_template_id.clone(),
        })
    }

    fn body(&self, to: &Email, data: &ProductChangeData) -> serde_json::Value {
        serde_json::json!({
            "personalizations": [{
                "to": [{ "email": to.as_str() }],
                "dynamic_template_data": data,
            }],
            "from": { "email": self.from.as_str() },
            "template_id": self.product_change_template_id,
        })
    }
}

#[async_trait]
impl Mailer for SendGridClient {
    async fn send_product_change(
        &self,
        to: &Email,
        data: &ProductChangeData,
    ) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.body(to, data))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::{RecordingMailer, SentEmail};

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::collections::HashSet;
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;
    use zebrands_core::Email;

    use super::{EmailError, Mailer, ProductChangeData};

    /// A delivered (recorded) message.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentEmail {
        pub to: Email,
        pub data: ProductChangeData,
    }

    /// Mailer that records messages instead of sending them. Chosen
    /// recipients can be made to fail.
    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<SentEmail>>,
        failing: Mutex<HashSet<Email>>,
    }

    impl RecordingMailer {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject every future send to `to` with a 500 from the "provider".
        pub fn fail_for(&self, to: &Email) {
            self.failing
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(to.clone());
        }

        #[must_use]
        pub fn sent(&self) -> Vec<SentEmail> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_product_change(
            &self,
            to: &Email,
            data: &ProductChangeData,
        ) -> Result<(), EmailError> {
            if self
                .failing
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(to)
            {
                return Err(EmailError::Api {
                    status: 500,
                    message: "simulated failure".to_owned(),
                });
            }
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(SentEmail {
                    to: to.clone(),
                    data: data.clone(),
                });
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            api_key: SecretString::from("SG.k3yMaterial-9fQ2xZ7vLw"),
            from_address: Email::parse("catalog@zebrands.mx").unwrap(),
            product_change_template_id: "d-123".to_owned(),
            base_url: "https://api.sendgrid.test/".to_owned(),
        }
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = SendGridClient::new(&config()).unwrap();
        assert_eq!(client.endpoint, "https://api.sendgrid.test/v3/mail/send");
    }

    #[test]
    fn test_body_carries_template_and_variables() {
        let client = SendGridClient::new(&config()).unwrap();
        let data = ProductChangeData {
            username: "Jane Doe".to_owned(),
            name: "Widget".to_owned(),
            brand: "Acme".to_owned(),
            sku: "A1".to_owned(),
        };
        let body = client.body(&Email::parse("jane@example.com").unwrap(), &data);

        assert_eq!(body["template_id"], "d-123");
        assert_eq!(body["from"]["email"], "catalog@zebrands.mx");
        let personalization = &body["personalizations"][0];
        assert_eq!(personalization["to"][0]["email"], "jane@example.com");
        assert_eq!(
            personalization["dynamic_template_data"],
            serde_json::json!({
                "username": "Jane Doe",
                "name": "Widget",
                "brand": "Acme",
                "sku": "A1",
            })
        );
    }

    #[tokio::test]
    async fn test_recording_mailer_fails_for_chosen_recipient() {
        let mailer = RecordingMailer::new();
        let bad = Email::parse("bad@example.com").unwrap();
        mailer.fail_for(&bad);
        let data = ProductChangeData {
            username: "x".to_owned(),
            name: "n".to_owned(),
            brand: "b".to_owned(),
            sku: "s".to_owned(),
        };

        assert!(mailer.send_product_change(&bad, &data).await.is_err());
        let good = Email::parse("good@example.com").unwrap();
        mailer.send_product_change(&good, &data).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }
}

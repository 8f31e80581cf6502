//! "File ready" notifications.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

use crate::config::MailSettings;

/// Template sent when a requested report has been rendered.
pub const REPORT_READY_TEMPLATE: &str = "report_ready";

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail API request failed: {0}")]
    Transport(String),

    #[error("mail API rejected the message with status {0}")]
    Rejected(u16),
}

/// Outgoing notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        template_id: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct MailRequest<'a> {
    to: &'a str,
    template: &'a str,
    variables: &'a BTreeMap<String, String>,
}

/// Posts `{to, template, variables}` as JSON to a transactional mail API.
pub struct MailApiNotifier {
    client: reqwest::Client,
    api_url: String,
    api_token: Option<SecretString>,
}

impl MailApiNotifier {
    pub fn new(api_url: String, api_token: Option<SecretString>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_token,
        })
    }
}

#[async_trait]
impl Notifier for MailApiNotifier {
    async fn send(
        &self,
        recipient: &str,
        template_id: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.api_url).json(&MailRequest {
            to: recipient,
            template: template_id,
            variables,
        });

        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

/// Logs notifications instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        recipient: &str,
        template_id: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), NotifyError> {
        info!(
            recipient,
            template = template_id,
            "Notification (mail API not configured): {:?}",
            variables
        );
        Ok(())
    }
}

/// Pick the notifier for the configured mail settings.
pub fn from_settings(settings: &MailSettings) -> Result<Box<dyn Notifier>, NotifyError> {
    match settings.api_url {
        Some(ref url) => Ok(Box::new(MailApiNotifier::new(
            url.clone(),
            settings.api_token.clone(),
        )?)),
        None => Ok(Box::new(LogNotifier)),
    }
}

/// Variables of the [`REPORT_READY_TEMPLATE`].
pub fn report_ready_variables(
    report_type: &str,
    company: &str,
    download_url: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("report_type".to_string(), report_type.to_string()),
        ("company".to_string(), company.to_string()),
        ("download_url".to_string(), download_url.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_ready_variables() {
        let vars = report_ready_variables("captable", "Acme AG", "https://x/dl");
        assert_eq!(vars.len(), 3);
        assert_eq!(vars["download_url"], "https://x/dl");
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = from_settings(&MailSettings {
            api_url: None,
            api_token: None,
        })
        .unwrap();
        notifier
            .send("a@b.test", REPORT_READY_TEMPLATE, &BTreeMap::new())
            .await
            .unwrap();
    }
}

//! Alert transports: an HTTP mail relay and a log-only fallback.

use async_trait::async_trait;
use tracing::info;

use crate::common::config::MailCfg;
use crate::common::error::{MaintError, MaintResult};

use super::domain::{AlertMessage, AlertTransport};

/// Delivers alerts by POSTing them to a mail relay endpoint.
///
/// Body: `{"from": .., "to": .., "subject": .., "body": ..}`. Credentials, when
/// configured, go out as HTTP basic auth.
pub struct MailRelay {
    url: String,
    sender: String,
    user: Option<String>,
    password: Option<String>,
    client: reqwest::Client,
}

impl MailRelay {
    pub fn new(url: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sender: sender.into(),
            user: None,
            password: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = Some(user.into());
        self.password = password;
        self
    }

    /// Build from config; `None` when no relay URL is set.
    pub fn from_cfg(cfg: &MailCfg) -> Option<Self> {
        let relay = Self::new(cfg.relay_url.clone()?, cfg.sender.clone());
        Some(match &cfg.user {
            Some(user) => relay.with_credentials(user.clone(), cfg.password.clone()),
            None => relay,
        })
    }
}

#[derive(serde::Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    #[serde(flatten)]
    message: &'a AlertMessage,
}

#[async_trait]
impl AlertTransport for MailRelay {
    fn name(&self) -> &str {
        "mail_relay"
    }

    async fn send(&self, message: &AlertMessage) -> MaintResult<()> {
        let mut req = self.client.post(&self.url).json(&RelayPayload {
            from: &self.sender,
            message,
        });
        if let Some(user) = &self.user {
            req = req.basic_auth(user, self.password.as_deref());
        }

        let resp = req
            .send()
            .await
            .map_err(|err| MaintError::transient(format!("mail relay unreachable: {err}")))?;
        if !resp.status().is_success() {
            return Err(MaintError::transient(format!(
                "mail relay answered {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Transport used when no relay is configured: the alert only reaches the log.
#[derive(Default)]
pub struct LogTransport;

#[async_trait]
impl AlertTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &AlertMessage) -> MaintResult<()> {
        info!(
            ev = "alert_logged",
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
        );
        Ok(())
    }
}

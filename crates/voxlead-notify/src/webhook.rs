//! Generic CRM webhook.

use crate::error::{check_status, NotifyError};
use crate::ports::{CrmEvent, CrmNotifier};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Posts each [`CrmEvent`] as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookCrm {
    client: Client,
    url: Url,
}

impl WebhookCrm {
    pub fn new(client: Client, url: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            client,
            url: Url::parse(url)?,
        })
    }
}

#[async_trait]
impl CrmNotifier for WebhookCrm {
    async fn notify(&self, event: &CrmEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(event)
            .send()
            .await?;
        check_status("crm webhook", response).await?;
        tracing::info!(event = %event.event, lead_id = %event.lead_id, "crm webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_url() {
        assert!(matches!(
            WebhookCrm::new(Client::new(), "not a url"),
            Err(NotifyError::Url(_))
        ));
    }
}

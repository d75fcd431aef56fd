//! SendGrid v3 mail send.

use crate::config::SendGridConfig;
use crate::error::{check_status, NotifyError};
use crate::ports::{EmailMessage, EmailSender};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct SendGridEmail {
    client: Client,
    config: SendGridConfig,
}

impl SendGridEmail {
    pub fn new(client: Client, config: SendGridConfig) -> Self {
        Self { client, config }
    }
}

fn mail_body(config: &SendGridConfig, message: &EmailMessage) -> Value {
    let mut to = json!({ "email": message.to });
    if let Some(name) = &message.to_name {
        to["name"] = json!(name);
    }
    let mut from = json!({ "email": config.from_email });
    if let Some(name) = &config.from_name {
        from["name"] = json!(name);
    }
    json!({
        "personalizations": [{ "to": [to] }],
        "from": from,
        "subject": message.subject,
        "content": [{ "type": "text/html", "value": message.html_body }],
    })
}

#[async_trait]
impl EmailSender for SendGridEmail {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let url = format!("{}/v3/mail/send", self.config.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&mail_body(&self.config, message))
            .send()
            .await?;
        check_status("sendgrid", response).await?;
        tracing::info!(subject = %message.subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_shape() {
        let config = SendGridConfig {
            api_key: "key".into(),
            from_email: "agence@example.com".into(),
            from_name: Some("Agence du Centre".into()),
            ..SendGridConfig::default()
        };
        let body = mail_body(
            &config,
            &EmailMessage {
                to: "marie@example.com".into(),
                to_name: Some("Marie".into()),
                subject: "Your viewing".into(),
                html_body: "<p>See you soon</p>".into(),
            },
        );
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "marie@example.com");
        assert_eq!(body["personalizations"][0]["to"][0]["name"], "Marie");
        assert_eq!(body["from"]["name"], "Agence du Centre");
        assert_eq!(body["content"][0]["type"], "text/html");
    }
}

//! Twilio REST: SMS and outbound calls.

use crate::config::TwilioConfig;
use crate::error::{check_status, NotifyError};
use crate::ports::{OutboundCall, OutboundDialer, SmsSender};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const SERVICE: &str = "twilio";

#[derive(Debug, Deserialize)]
struct ResourceSid {
    sid: String,
}

fn resource_url(config: &TwilioConfig, resource: &str) -> String {
    format!(
        "{}/2010-04-01/Accounts/{}/{resource}.json",
        config.api_base.trim_end_matches('/'),
        config.account_sid
    )
}

async fn post_form(
    client: &Client,
    config: &TwilioConfig,
    resource: &str,
    form: &[(&str, &str)],
) -> Result<String, NotifyError> {
    let response = client
        .post(resource_url(config, resource))
        .basic_auth(&config.account_sid, Some(&config.auth_token))
        .form(form)
        .send()
        .await?;
    let created: ResourceSid = check_status(SERVICE, response).await?.json().await?;
    Ok(created.sid)
}

#[derive(Debug, Clone)]
pub struct TwilioSms {
    client: Client,
    config: TwilioConfig,
}

impl TwilioSms {
    pub fn new(client: Client, config: TwilioConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, NotifyError> {
        let sid = post_form(
            &self.client,
            &self.config,
            "Messages",
            &[("To", to), ("From", self.config.from_number.as_str()), ("Body", body)],
        )
        .await?;
        tracing::info!(message_sid = %sid, "sms sent");
        Ok(sid)
    }
}

/// Places outbound calls whose TwiML is served by our own voice webhook.
#[derive(Debug, Clone)]
pub struct TwilioDialer {
    client: Client,
    config: TwilioConfig,
    twiml_url: Url,
}

impl TwilioDialer {
    pub fn new(client: Client, config: TwilioConfig, twiml_url: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            client,
            config,
            twiml_url: Url::parse(twiml_url)?,
        })
    }

    /// The TwiML URL for one call, tagged with the lead it is for.
    pub fn twiml_url_for(&self, call: &OutboundCall) -> Url {
        let mut url = self.twiml_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("tenantId", &call.tenant_id)
                .append_pair("leadId", &call.lead_id);
            if let Some(agent_id) = &call.agent_id {
                query.append_pair("agentId", agent_id);
            }
        }
        url
    }
}

#[async_trait]
impl OutboundDialer for TwilioDialer {
    async fn place_call(&self, call: &OutboundCall) -> Result<String, NotifyError> {
        let twiml_url = self.twiml_url_for(call);
        let sid = post_form(
            &self.client,
            &self.config,
            "Calls",
            &[
                ("To", call.to.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Url", twiml_url.as_str()),
            ],
        )
        .await?;
        tracing::info!(call_sid = %sid, lead_id = %call.lead_id, "outbound call placed");
        Ok(sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            from_number: "+33100000000".into(),
            api_base: "https://api.twilio.com/".into(),
        }
    }

    #[test]
    fn resource_urls() {
        assert_eq!(
            resource_url(&config(), "Messages"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn dialer_tags_twiml_url() {
        let dialer = TwilioDialer::new(
            Client::new(),
            config(),
            "https://voice.example/webhooks/voice",
        )
        .expect("dialer");
        let url = dialer.twiml_url_for(&OutboundCall {
            tenant_id: "tenant 1".into(),
            lead_id: "lead-1".into(),
            agent_id: Some("agent-7".into()),
            to: "+33611111111".into(),
        });
        assert_eq!(
            url.as_str(),
            "https://voice.example/webhooks/voice?tenantId=tenant+1&leadId=lead-1&agentId=agent-7"
        );
    }
}

//! Cal.com v2 bookings.

use crate::config::CalComConfig;
use crate::error::{check_status, NotifyError};
use crate::ports::{CalendarEvent, CalendarScheduler};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Value};

const SERVICE: &str = "cal.com";
const API_VERSION: &str = "2024-08-13";

#[derive(Debug, Clone)]
pub struct CalComScheduler {
    client: Client,
    config: CalComConfig,
}

impl CalComScheduler {
    pub fn new(client: Client, config: CalComConfig) -> Self {
        Self { client, config }
    }
}

fn booking_body(config: &CalComConfig, event: &CalendarEvent) -> Value {
    let mut attendee = json!({
        "name": event.attendee_name,
        "timeZone": config.time_zone,
    });
    if let Some(email) = &event.attendee_email {
        attendee["email"] = json!(email);
    }
    if let Some(phone) = &event.attendee_phone {
        attendee["phoneNumber"] = json!(phone);
    }

    let mut body = json!({
        "start": event
            .start
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        "eventTypeId": config.event_type_id,
        "lengthInMinutes": event.duration_minutes,
        "attendee": attendee,
        "metadata": { "title": event.title },
    });
    if let Some(location) = &event.location {
        body["location"] = json!(location);
    }
    if let Some(organizer) = &event.organizer_id {
        body["metadata"]["organizerId"] = json!(organizer);
    }
    body
}

/// Pulls the booking id out of `{"status":"success","data":{"uid"|"id": ..}}`.
fn booking_id(response: &Value) -> Option<String> {
    let data = response.get("data")?;
    data.get("uid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| data.get("id").map(|id| id.to_string()))
}

#[async_trait]
impl CalendarScheduler for CalComScheduler {
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, NotifyError> {
        let url = format!("{}/v2/bookings", self.config.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("cal-api-version", API_VERSION)
            .json(&booking_body(&self.config, event))
            .send()
            .await?;
        let body: Value = check_status(SERVICE, response).await?.json().await?;
        let id = booking_id(&body).ok_or_else(|| NotifyError::InvalidResponse {
            service: SERVICE,
            message: "booking id missing".to_string(),
        })?;
        tracing::info!(booking_id = %id, "calendar booking created");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn body_converts_start_to_utc() {
        let config = CalComConfig {
            api_key: "key".into(),
            event_type_id: Some(42),
            ..CalComConfig::default()
        };
        let event = CalendarEvent {
            title: "Property viewing".into(),
            start: DateTime::parse_from_rfc3339("2024-09-02T15:30:00+02:00").expect("date"),
            duration_minutes: 30,
            location: None,
            description: None,
            attendee_name: "Marie Dupont".into(),
            attendee_email: None,
            attendee_phone: Some("+33611111111".into()),
            organizer_id: Some("agent-user-1".into()),
        };
        let body = booking_body(&config, &event);
        assert_eq!(body["start"], "2024-09-02T13:30:00Z");
        assert_eq!(body["eventTypeId"], 42);
        assert_eq!(body["attendee"]["phoneNumber"], "+33611111111");
        assert!(body["attendee"].get("email").is_none());
        assert!(body.get("location").is_none());
        assert_eq!(body["metadata"]["organizerId"], "agent-user-1");
    }

    #[test]
    fn booking_id_prefers_uid() {
        let response = json!({"status": "success", "data": {"id": 7, "uid": "bk_abc"}});
        assert_eq!(booking_id(&response).as_deref(), Some("bk_abc"));
        let response = json!({"status": "success", "data": {"id": 7}});
        assert_eq!(booking_id(&response).as_deref(), Some("7"));
        assert_eq!(booking_id(&json!({"status": "error"})), None);
    }
}

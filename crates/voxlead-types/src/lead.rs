//! Prospects identified through calls.

use serde::{Deserialize, Serialize};

/// Name recorded for a lead whose contact name never came up.
pub const UNKNOWN_PROSPECT: &str = "Unknown prospect";

string_enum! {
    /// Where a lead stands in the sales pipeline.
    LeadStatus, "lead status" {
        New => "new",
        ToContact => "to-contact",
        Warm => "warm",
        Hot => "hot",
        Cold => "cold",
        AppointmentScheduled => "appointment-scheduled",
        Won => "won",
    }
}

/// A prospect. Unique per `(tenant_id, phone_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub tenant_id: String,
    pub full_name: String,
    /// Identity key within a tenant.
    pub phone_number: String,
    pub email: Option<String>,
    pub status: LeadStatus,
    /// `0..=100`.
    pub score: u8,
    pub interest: Option<String>,
    pub last_call_id: Option<String>,
    pub preferred_appointment_time: Option<String>,
    pub calendar_event_id: Option<String>,
    pub last_follow_up_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields written by a create-or-update keyed on `(tenant_id, phone_number)`.
///
/// `None` optional fields leave any stored value untouched on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpsert {
    pub tenant_id: String,
    pub phone_number: String,
    /// `None` keeps the stored name, or uses [`UNKNOWN_PROSPECT`] on insert.
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub score: u8,
    pub interest: Option<String>,
    pub last_call_id: Option<String>,
    pub preferred_appointment_time: Option<String>,
}

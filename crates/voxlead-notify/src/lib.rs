//! Outbound messaging and scheduling.
//!
//! The post-call workflows reach prospects through the ports in [`ports`]:
//! SMS, email, calendar bookings, outbound AI calls and CRM webhooks. Each
//! port has one HTTP implementation (Twilio, SendGrid, Cal.com, generic
//! webhook). A port that is not configured is simply absent from
//! [`Channels`], and the workflows report that channel as skipped.

pub mod calcom;
pub mod config;
pub mod error;
pub mod ports;
pub mod sendgrid;
pub mod twilio;
pub mod webhook;

pub use calcom::CalComScheduler;
pub use config::{CalComConfig, NotifyConfig, SendGridConfig, TwilioConfig};
pub use error::NotifyError;
pub use ports::{
    CalendarEvent, CalendarScheduler, Channels, CrmEvent, CrmNotifier, EmailMessage, EmailSender,
    OutboundCall, OutboundDialer, SmsSender,
};
pub use sendgrid::SendGridEmail;
pub use twilio::{TwilioDialer, TwilioSms};
pub use webhook::WebhookCrm;

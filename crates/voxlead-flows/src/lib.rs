//! Call lifecycle and post-call workflows.
//!
//! Each telephony webhook is handled by a stateless function over a
//! [`FlowContext`]; all state lives behind the store ports. A call goes
//! through [`handle_call_start`], any number of [`handle_speech_segment`]
//! turns and one [`handle_call_end`]. [`confirm_appointment`] and
//! [`follow_up_lead`] act on the leads that calls produce.

pub mod appointment;
pub mod call_end;
pub mod call_start;
pub mod context;
pub mod follow_up;
pub mod settings;
pub mod speech_segment;
pub mod transcript;

pub use appointment::{confirm_appointment, AppointmentInput, AppointmentOutcome};
pub use call_end::{
    handle_call_end, CallEndInput, CallEndOutcome, CallUpdateStatus, LeadUpdateStatus,
};
pub use call_start::{handle_call_start, CallStartInput};
pub use context::FlowContext;
pub use follow_up::{follow_up_lead, FollowUpInput, FollowUpOutcome};
pub use settings::{FollowUpTemplates, TelephonyConfig};
pub use speech_segment::{handle_speech_segment, SpeechSegmentInput, SpeechSegmentOutcome};

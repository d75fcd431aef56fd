//! Outcome enums reported by post-call workflows.

string_enum! {
    /// Result of one notification or scheduling channel.
    ChannelOutcome, "channel outcome" {
        Sent => "sent",
        Failed => "failed",
        /// No contact detail, or the channel is not configured.
        Skipped => "skipped",
    }
}

string_enum! {
    /// Aggregate status of a multi-channel workflow.
    OverallStatus, "overall status" {
        Success => "success",
        PartialFailure => "partial_failure",
        Failure => "failure",
    }
}

impl OverallStatus {
    /// Combines notification outcomes with the calendar outcome.
    ///
    /// Any explicit failure makes it a partial failure. Without failures,
    /// success needs at least one notification sent and the calendar event
    /// created.
    pub fn from_outcomes(notifications: &[ChannelOutcome], calendar: ChannelOutcome) -> Self {
        let any_failed = notifications
            .iter()
            .chain(std::iter::once(&calendar))
            .any(|&o| o == ChannelOutcome::Failed);
        let notified = notifications.contains(&ChannelOutcome::Sent);

        if any_failed {
            Self::PartialFailure
        } else if notified && calendar == ChannelOutcome::Sent {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

string_enum! {
    /// How a lead is followed up.
    FollowUpStrategy, "follow-up strategy" {
        SmsReminder => "sms_reminder",
        EmailInfo => "email_info",
        /// Places an outbound AI call.
        ScheduleAiCall => "schedule_ai_call",
        WebhookCrm => "webhook_crm",
    }
}

string_enum! {
    FollowUpStatus, "follow-up status" {
        Success => "success",
        /// The outbound AI call was placed; the conversation is still ahead.
        PendingCall => "pending_call",
        Failed => "failed",
        Skipped => "skipped",
    }
}

impl FollowUpStatus {
    /// Whether the lead's `last_follow_up_at` should be stamped.
    pub fn counts_as_contact(self) -> bool {
        matches!(self, Self::Success | Self::PendingCall)
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification kinds fanned out to the hosting service's dispatcher.
/// Serialized as dotted wire tokens (`"deal.approved"`, ...).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum EventKind {
    #[serde(rename = "deal.approved")]
    DealApproved,
    #[serde(rename = "deal.rejected")]
    DealRejected,
    #[serde(rename = "deal.accepted")]
    DealAccepted,
    #[serde(rename = "deal.cancelled")]
    DealCancelled,
    #[serde(rename = "deal.completed")]
    DealCompleted,
    #[serde(rename = "order.locked")]
    OrderLocked,
    #[serde(rename = "payment.remaining_paid")]
    RemainingPaid,
    #[serde(rename = "otp.submitted")]
    OtpSubmitted,
    #[serde(rename = "otp.verified")]
    OtpVerified,
    #[serde(rename = "otp.rejected")]
    OtpRejected,
    #[serde(rename = "kyc.approved")]
    KycApproved,
    #[serde(rename = "kyc.rejected")]
    KycRejected,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DealApproved => "deal.approved",
            Self::DealRejected => "deal.rejected",
            Self::DealAccepted => "deal.accepted",
            Self::DealCancelled => "deal.cancelled",
            Self::DealCompleted => "deal.completed",
            Self::OrderLocked => "order.locked",
            Self::RemainingPaid => "payment.remaining_paid",
            Self::OtpSubmitted => "otp.submitted",
            Self::OtpVerified => "otp.verified",
            Self::OtpRejected => "otp.rejected",
            Self::KycApproved => "kyc.approved",
            Self::KycRejected => "kyc.rejected",
        }
    }
}

/// A single outbound notification. Delivery is fire-and-forget; the core
/// never depends on an acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketEvent {
    pub recipient: Uuid,
    pub kind: EventKind,
    pub deal_id: Option<Uuid>,
    pub message: String,
}

impl MarketEvent {
    pub fn new(
        recipient: Uuid,
        kind: EventKind,
        deal_id: Option<Uuid>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient,
            kind,
            deal_id,
            message: message.into(),
        }
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// External wallet top-up.
    Deposit,
    /// Merchant's advance reserved at acceptance.
    AdvanceLock,
    /// Merchant's post-lock balance reserved before OTP disclosure.
    RemainingLock,
    /// Customer's commission leg at settlement.
    CommissionRelease,
    /// Reimbursement of the card-offer price the customer paid online.
    PurchaseRelease,
    /// Residual spread returned to the merchant at settlement.
    SpreadRelease,
    /// Advance returned on cancellation.
    Refund,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Locked,
    Released,
    Refunded,
}

/// Immutable audit-trail entry, one row per money movement. Rows are never
/// updated; a lock and its later release are separate rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub deal_id: Option<Uuid>,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub from_user_id: Option<Uuid>,
    pub to_user_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        payment_type: PaymentType,
        status: PaymentStatus,
        amount: Decimal,
        from_user_id: Option<Uuid>,
        to_user_id: Option<Uuid>,
        deal_id: Option<Uuid>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            deal_id,
            amount,
            payment_type,
            status,
            from_user_id,
            to_user_id,
            description: Some(description.into()),
            created_at: Utc::now(),
        }
    }
}

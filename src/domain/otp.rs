use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MarketError, Result};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OtpStatus {
    Pending,
    Verified,
    Rejected,
}

/// A delivery-confirmation code submitted by the customer and adjudicated
/// by an admin. The code is an opaque string; the platform does not hold a
/// server-generated counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub otp_code: String,
    pub submitted_by: Uuid,
    pub status: OtpStatus,
    pub verified_by: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl OtpRecord {
    pub fn new(order_id: Uuid, otp_code: String, submitted_by: Uuid) -> Result<Self> {
        let code = otp_code.trim();
        if code.is_empty() {
            return Err(MarketError::validation("otp code is required"));
        }
        if code.len() > 16 {
            return Err(MarketError::validation("otp code is too long"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            otp_code: code.to_string(),
            submitted_by,
            status: OtpStatus::Pending,
            verified_by: None,
            submitted_at: Utc::now(),
            verified_at: None,
            notes: None,
        })
    }

    pub fn verify(&mut self, admin_id: Uuid) -> Result<()> {
        self.expect_pending("verify")?;
        self.status = OtpStatus::Verified;
        self.verified_by = Some(admin_id);
        self.verified_at = Some(Utc::now());
        Ok(())
    }

    pub fn reject(&mut self, admin_id: Uuid, notes: String) -> Result<()> {
        self.expect_pending("reject")?;
        self.status = OtpStatus::Rejected;
        self.verified_by = Some(admin_id);
        self.verified_at = Some(Utc::now());
        self.notes = Some(notes);
        Ok(())
    }

    fn expect_pending(&self, op: &str) -> Result<()> {
        if self.status == OtpStatus::Pending {
            Ok(())
        } else {
            Err(MarketError::invalid_state(format!(
                "cannot {op} otp {}: status is {:?}",
                self.id, self.status
            )))
        }
    }
}

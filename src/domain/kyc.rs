use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MarketError, Result};

static PAN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN pattern"));
static IFSC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").expect("valid IFSC pattern"));

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

/// Identity and bank details submitted for verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycSubmission {
    pub pan_number: String,
    pub bank_name: String,
    pub bank_account_number: String,
    pub ifsc_code: String,
    pub document_url: String,
    pub selfie_url: Option<String>,
}

impl KycSubmission {
    pub fn validate(&self) -> Result<()> {
        if !PAN_PATTERN.is_match(&self.pan_number) {
            return Err(MarketError::validation(format!(
                "'{}' is not a valid PAN number",
                self.pan_number
            )));
        }
        if !IFSC_PATTERN.is_match(&self.ifsc_code) {
            return Err(MarketError::validation(format!(
                "'{}' is not a valid IFSC code",
                self.ifsc_code
            )));
        }
        if self.bank_name.trim().is_empty() {
            return Err(MarketError::validation("bank name is required"));
        }
        if self.bank_account_number.trim().is_empty() {
            return Err(MarketError::validation("bank account number is required"));
        }
        if self.document_url.trim().is_empty() {
            return Err(MarketError::validation("identity document is required"));
        }
        Ok(())
    }
}

/// Per-user verification record. Only `approved` unlocks deal creation and
/// acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KycRecord {
    pub user_id: Uuid,
    pub status: KycStatus,
    pub pan_number: String,
    pub bank_name: String,
    pub bank_account_number: String,
    pub ifsc_code: String,
    pub document_url: String,
    pub selfie_url: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KycRecord {
    pub fn from_submission(user_id: Uuid, submission: KycSubmission) -> Result<Self> {
        submission.validate()?;
        let now = Utc::now();
        Ok(Self {
            user_id,
            status: KycStatus::Pending,
            pan_number: submission.pan_number,
            bank_name: submission.bank_name,
            bank_account_number: submission.bank_account_number,
            ifsc_code: submission.ifsc_code,
            document_url: submission.document_url,
            selfie_url: submission.selfie_url,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the record's fields after a rejection; re-enters `pending`
    /// and clears the prior rejection notes.
    pub fn resubmit(&mut self, submission: KycSubmission) -> Result<()> {
        submission.validate()?;
        self.pan_number = submission.pan_number;
        self.bank_name = submission.bank_name;
        self.bank_account_number = submission.bank_account_number;
        self.ifsc_code = submission.ifsc_code;
        self.document_url = submission.document_url;
        self.selfie_url = submission.selfie_url;
        self.admin_notes = None;
        self.status = KycStatus::Pending;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn approve(&mut self) {
        self.status = KycStatus::Approved;
        self.updated_at = Utc::now();
    }

    pub fn reject(&mut self, notes: String) {
        self.status = KycStatus::Rejected;
        self.admin_notes = Some(notes);
        self.updated_at = Utc::now();
    }
}

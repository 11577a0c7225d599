use uuid::Uuid;

use crate::domain::Actor;
use crate::domain::event::{EventKind, MarketEvent};
use crate::domain::kyc::{KycRecord, KycStatus, KycSubmission};
use crate::domain::ports::{MarketStoreHandle, NotifierHandle};
use crate::error::{MarketError, Result};

const DEFAULT_REJECTION_NOTES: &str = "Verification rejected; please resubmit your documents";

/// Verification gate consulted before deal creation and acceptance.
#[derive(Clone)]
pub struct KycGate {
    store: MarketStoreHandle,
    notifier: NotifierHandle,
}

impl KycGate {
    pub fn new(store: MarketStoreHandle, notifier: NotifierHandle) -> Self {
        Self { store, notifier }
    }

    pub async fn status(&self, user_id: Uuid) -> Result<KycStatus> {
        Ok(self
            .store
            .kyc(user_id)
            .await?
            .map(|r| r.status)
            .unwrap_or(KycStatus::NotSubmitted))
    }

    pub async fn record(&self, user_id: Uuid) -> Result<Option<KycRecord>> {
        self.store.kyc(user_id).await
    }

    pub async fn can_create_deal(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.status(user_id).await? == KycStatus::Approved)
    }

    pub async fn can_accept_deal(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.status(user_id).await? == KycStatus::Approved)
    }

    /// First submission creates a pending record; resubmission after a
    /// rejection re-enters pending and clears the prior notes. A record
    /// under review or already approved cannot be replaced.
    pub async fn submit(&self, actor: &Actor, submission: KycSubmission) -> Result<KycRecord> {
        let record = match self.store.kyc(actor.user_id).await? {
            None => KycRecord::from_submission(actor.user_id, submission)?,
            Some(mut existing) => match existing.status {
                KycStatus::Pending => {
                    return Err(MarketError::Conflict(
                        "a KYC submission is already under review".to_string(),
                    ));
                }
                KycStatus::Approved => {
                    return Err(MarketError::Conflict(
                        "KYC is already approved for this user".to_string(),
                    ));
                }
                KycStatus::Rejected | KycStatus::NotSubmitted => {
                    existing.resubmit(submission)?;
                    existing
                }
            },
        };
        self.store.upsert_kyc(record.clone()).await?;
        tracing::info!(user_id = %actor.user_id, "kyc submitted");
        Ok(record)
    }

    /// Admin adjudication. Repeating a decision that already stands is a
    /// no-op; reversing a terminal decision is not allowed here.
    pub async fn decide(
        &self,
        actor: &Actor,
        user_id: Uuid,
        approve: bool,
        notes: Option<String>,
    ) -> Result<KycRecord> {
        actor.require_admin()?;
        let mut record = self
            .store
            .kyc(user_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("kyc record for user {user_id}")))?;

        let target = if approve {
            KycStatus::Approved
        } else {
            KycStatus::Rejected
        };
        if record.status == target {
            return Ok(record);
        }
        if record.status != KycStatus::Pending {
            return Err(MarketError::invalid_state(format!(
                "kyc for user {user_id} is {:?}, not pending",
                record.status
            )));
        }

        if approve {
            record.approve();
        } else {
            record.reject(notes.unwrap_or_else(|| DEFAULT_REJECTION_NOTES.to_string()));
        }
        self.store.upsert_kyc(record.clone()).await?;

        let (kind, message) = if approve {
            (
                EventKind::KycApproved,
                "Your KYC was approved; you can now create and accept deals".to_string(),
            )
        } else {
            (
                EventKind::KycRejected,
                format!(
                    "Your KYC was rejected: {}",
                    record.admin_notes.as_deref().unwrap_or(DEFAULT_REJECTION_NOTES)
                ),
            )
        };
        tracing::info!(%user_id, approved = approve, "kyc decided");
        self.notifier
            .notify(MarketEvent::new(user_id, kind, None, message))
            .await;
        Ok(record)
    }

    /// Queue of submissions awaiting adjudication.
    pub async fn pending(&self, actor: &Actor) -> Result<Vec<KycRecord>> {
        actor.require_admin()?;
        self.store.pending_kycs().await
    }
}

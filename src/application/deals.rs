use uuid::Uuid;

use super::kyc_gate::KycGate;
use super::settlement::SettlementEngine;
use crate::config::FeeConfig;
use crate::domain::Actor;
use crate::domain::admin_number::AdminNumber;
use crate::domain::commit::{Guard, StateCommit};
use crate::domain::deal::{Deal, DealStatus, DealTerms};
use crate::domain::event::{EventKind, MarketEvent};
use crate::domain::ports::{MarketStoreHandle, NotifierHandle};
use crate::error::{MarketError, Result};

const DEFAULT_REJECTION_NOTES: &str = "Deal rejected by admin review";

/// Deal lifecycle: creation, admin adjudication, acceptance, cancellation
/// and the browse/query surface.
#[derive(Clone)]
pub struct DealService {
    store: MarketStoreHandle,
    notifier: NotifierHandle,
    kyc: KycGate,
    settlement: SettlementEngine,
    fees: FeeConfig,
}

impl DealService {
    pub fn new(
        store: MarketStoreHandle,
        notifier: NotifierHandle,
        kyc: KycGate,
        settlement: SettlementEngine,
        fees: FeeConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            kyc,
            settlement,
            fees,
        }
    }

    /// Posts a new deal request. Requires approved KYC; amounts are derived
    /// from the active fee configuration and immutable afterwards.
    pub async fn create(&self, actor: &Actor, terms: DealTerms) -> Result<Deal> {
        if !self.kyc.can_create_deal(actor.user_id).await? {
            return Err(MarketError::KycRequired(actor.user_id));
        }
        let deal = Deal::new(actor.user_id, terms, &self.fees)?;
        self.store.insert_deal(deal.clone()).await?;
        tracing::info!(deal_id = %deal.id, merchant_id = %actor.user_id, "deal created");
        Ok(deal)
    }

    /// Admin approval. Claims the least-loaded active contact number only
    /// after the deal is known to be pending; any error past the claim
    /// releases it before propagating.
    pub async fn approve(&self, actor: &Actor, deal_id: Uuid) -> Result<Deal> {
        actor.require_admin()?;
        let mut deal = self.require_deal(deal_id).await?;
        if deal.status != DealStatus::Pending {
            return Err(MarketError::invalid_state(format!(
                "cannot approve deal {deal_id}: status is {:?}, expected Pending",
                deal.status
            )));
        }
        let number = self.store.claim_admin_number().await?;
        if let Err(err) = deal.approve(number.phone_number.clone()) {
            self.store.release_admin_number(number.id).await?;
            return Err(err);
        }

        let commit = StateCommit::new()
            .guard(Guard::DealInStatus {
                deal_id,
                any_of: vec![DealStatus::Pending],
            })
            .deal(deal.clone());
        if let Err(err) = self.store.commit(commit).await {
            self.store.release_admin_number(number.id).await?;
            return Err(err);
        }

        tracing::info!(%deal_id, contact = %number.phone_number, "deal approved");
        self.notifier
            .notify(MarketEvent::new(
                deal.merchant_id,
                EventKind::DealApproved,
                Some(deal_id),
                format!(
                    "Your deal for {} was approved; contact {}",
                    deal.product_name, number.phone_number
                ),
            ))
            .await;
        Ok(deal)
    }

    /// Admin rejection; a reason is always persisted so the merchant has an
    /// actionable message.
    pub async fn reject(&self, actor: &Actor, deal_id: Uuid, notes: Option<String>) -> Result<Deal> {
        actor.require_admin()?;
        let mut deal = self.require_deal(deal_id).await?;
        let notes = notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_NOTES.to_string());
        deal.reject(notes.clone())?;

        let commit = StateCommit::new()
            .guard(Guard::DealInStatus {
                deal_id,
                any_of: vec![DealStatus::Pending],
            })
            .deal(deal.clone());
        self.store.commit(commit).await?;

        tracing::warn!(%deal_id, "deal rejected");
        self.notifier
            .notify(MarketEvent::new(
                deal.merchant_id,
                EventKind::DealRejected,
                Some(deal_id),
                format!("Your deal for {} was rejected: {notes}", deal.product_name),
            ))
            .await;
        Ok(deal)
    }

    /// Customer claims an approved deal. Exactly-once: the settlement
    /// commit re-checks approved-and-unclaimed under the store's writer, so
    /// of two simultaneous accepts one wins and the other sees
    /// `AlreadyAccepted`. The advance lock happens in the same commit; an
    /// underfunded merchant wallet fails the whole call with no state change.
    pub async fn accept(
        &self,
        actor: &Actor,
        deal_id: Uuid,
        delivery_address: String,
    ) -> Result<Deal> {
        if !self.kyc.can_accept_deal(actor.user_id).await? {
            return Err(MarketError::KycRequired(actor.user_id));
        }
        let mut deal = self.require_deal(deal_id).await?;
        if deal.merchant_id == actor.user_id {
            return Err(MarketError::validation(
                "a merchant cannot accept their own deal",
            ));
        }
        deal.claim(actor.user_id, delivery_address)?;
        self.settlement.lock_advance(&deal).await?;
        tracing::info!(%deal_id, customer_id = %actor.user_id, "deal accepted");
        Ok(deal)
    }

    /// Manual cancellation by a participant (or admin) while the deal is
    /// accepted but the order is not yet locked.
    pub async fn cancel(&self, actor: &Actor, deal_id: Uuid) -> Result<Deal> {
        let mut deal = self.require_deal(deal_id).await?;
        let is_party =
            deal.merchant_id == actor.user_id || deal.customer_id == Some(actor.user_id);
        if !is_party && !actor.is_admin {
            return Err(MarketError::Unauthorized(
                "only deal participants may cancel".to_string(),
            ));
        }
        deal.cancel()?;
        self.settlement.cancel(&deal).await?;
        tracing::info!(%deal_id, "deal cancelled");
        Ok(deal)
    }

    pub async fn deal(&self, deal_id: Uuid) -> Result<Option<Deal>> {
        self.store.deal(deal_id).await
    }

    pub async fn by_merchant(&self, merchant_id: Uuid) -> Result<Vec<Deal>> {
        self.store.deals_by_merchant(merchant_id).await
    }

    pub async fn by_customer(&self, customer_id: Uuid) -> Result<Vec<Deal>> {
        self.store.deals_by_customer(customer_id).await
    }

    /// Approved, unclaimed deals offered for browsing.
    pub async fn open(&self) -> Result<Vec<Deal>> {
        self.store.open_deals().await
    }

    pub async fn all(&self, actor: &Actor) -> Result<Vec<Deal>> {
        actor.require_admin()?;
        self.store.all_deals().await
    }

    // -- admin contact number registry ------------------------------------

    pub async fn add_admin_number(&self, actor: &Actor, phone_number: String) -> Result<AdminNumber> {
        actor.require_admin()?;
        if phone_number.trim().is_empty() {
            return Err(MarketError::validation("phone number is required"));
        }
        let number = AdminNumber::new(phone_number);
        self.store.upsert_admin_number(number.clone()).await?;
        Ok(number)
    }

    pub async fn admin_numbers(&self, actor: &Actor) -> Result<Vec<AdminNumber>> {
        actor.require_admin()?;
        self.store.admin_numbers().await
    }

    pub async fn set_admin_number_active(
        &self,
        actor: &Actor,
        number_id: Uuid,
        is_active: bool,
    ) -> Result<AdminNumber> {
        actor.require_admin()?;
        let mut number = self
            .store
            .admin_numbers()
            .await?
            .into_iter()
            .find(|n| n.id == number_id)
            .ok_or_else(|| MarketError::not_found(format!("admin number {number_id}")))?;
        number.is_active = is_active;
        self.store.upsert_admin_number(number.clone()).await?;
        Ok(number)
    }

    async fn require_deal(&self, deal_id: Uuid) -> Result<Deal> {
        self.store
            .deal(deal_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("deal {deal_id}")))
    }
}

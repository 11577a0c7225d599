use uuid::Uuid;

use super::settlement::SettlementEngine;
use crate::domain::Actor;
use crate::domain::commit::StateCommit;
use crate::domain::deal::DealStatus;
use crate::domain::event::{EventKind, MarketEvent};
use crate::domain::otp::{OtpRecord, OtpStatus};
use crate::domain::ports::{MarketStoreHandle, NotifierHandle};
use crate::error::{MarketError, Result};

const DEFAULT_REJECTION_NOTES: &str = "OTP rejected by admin review";

/// Delivery-confirmation queue: customers submit codes, admins adjudicate.
/// A verified code triggers final settlement.
#[derive(Clone)]
pub struct OtpService {
    store: MarketStoreHandle,
    notifier: NotifierHandle,
    settlement: SettlementEngine,
}

impl OtpService {
    pub fn new(
        store: MarketStoreHandle,
        notifier: NotifierHandle,
        settlement: SettlementEngine,
    ) -> Self {
        Self {
            store,
            notifier,
            settlement,
        }
    }

    /// Customer submits the code received at delivery. Blocked with
    /// `PaymentPending` until the merchant has funded the remaining
    /// balance, so an admin never acts on an OTP before the deal is fully
    /// escrowed.
    pub async fn submit(&self, actor: &Actor, order_id: Uuid, code: String) -> Result<OtpRecord> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("order {order_id}")))?;
        if order.customer_id != actor.user_id {
            return Err(MarketError::Unauthorized(
                "only the order's customer may submit the delivery OTP".to_string(),
            ));
        }
        if !order.awaits_delivery_otp() {
            return Err(MarketError::invalid_state(format!(
                "order {order_id} is {:?}; OTP is submitted after shipment",
                order.status
            )));
        }

        let deal = self
            .store
            .deal(order.deal_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("deal {}", order.deal_id)))?;
        match deal.status {
            DealStatus::InProgress => {}
            DealStatus::OrderPlaced => return Err(MarketError::PaymentPending(deal.id)),
            other => {
                return Err(MarketError::invalid_state(format!(
                    "deal {} is {other:?}; OTP needs an in-progress deal",
                    deal.id
                )));
            }
        }

        let record = OtpRecord::new(order_id, code, actor.user_id)?;
        self.store.insert_otp(record.clone()).await?;
        tracing::info!(otp_id = %record.id, %order_id, "delivery otp submitted");
        self.notifier
            .notify(MarketEvent::new(
                deal.merchant_id,
                EventKind::OtpSubmitted,
                Some(deal.id),
                format!("Delivery OTP submitted for {}", deal.product_name),
            ))
            .await;
        Ok(record)
    }

    /// Admin verifies the code: the OTP record, the confirmed order, the
    /// completed deal and the full settlement land in one atomic commit.
    /// Re-verifying an already-verified record is a no-op, never a double
    /// release.
    pub async fn verify(&self, actor: &Actor, otp_id: Uuid) -> Result<OtpRecord> {
        actor.require_admin()?;
        let mut otp = self.require_otp(otp_id).await?;
        if otp.status == OtpStatus::Verified {
            return Ok(otp);
        }
        otp.verify(actor.user_id)?;

        let mut order = self
            .store
            .order(otp.order_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("order {}", otp.order_id)))?;
        order.confirm()?;

        let deal_id = order.deal_id;
        self.settlement
            .complete_deal(deal_id, order, otp.clone())
            .await?;

        tracing::info!(%otp_id, %deal_id, "otp verified, deal settled");
        self.notifier
            .notify(MarketEvent::new(
                otp.submitted_by,
                EventKind::OtpVerified,
                Some(deal_id),
                "Delivery OTP verified; your commission has been released".to_string(),
            ))
            .await;
        Ok(otp)
    }

    /// Admin rejects the code; the order and deal are untouched and the
    /// customer may submit a fresh code. Repeated rejection is a no-op.
    pub async fn reject(
        &self,
        actor: &Actor,
        otp_id: Uuid,
        notes: Option<String>,
    ) -> Result<OtpRecord> {
        actor.require_admin()?;
        let mut otp = self.require_otp(otp_id).await?;
        if otp.status == OtpStatus::Rejected {
            return Ok(otp);
        }
        let notes = notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_NOTES.to_string());
        otp.reject(actor.user_id, notes.clone())?;
        self.store
            .commit(StateCommit::new().otp(otp.clone()))
            .await?;

        let deal_id = self
            .store
            .order(otp.order_id)
            .await?
            .map(|order| order.deal_id);
        tracing::warn!(%otp_id, "otp rejected");
        self.notifier
            .notify(MarketEvent::new(
                otp.submitted_by,
                EventKind::OtpRejected,
                deal_id,
                format!("Delivery OTP rejected: {notes}"),
            ))
            .await;
        Ok(otp)
    }

    /// Pending queue for the admin verification screen.
    pub async fn pending(&self, actor: &Actor) -> Result<Vec<OtpRecord>> {
        actor.require_admin()?;
        self.store.pending_otps().await
    }

    async fn require_otp(&self, otp_id: Uuid) -> Result<OtpRecord> {
        self.store
            .otp(otp_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("otp record {otp_id}")))
    }
}

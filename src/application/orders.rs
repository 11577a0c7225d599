use uuid::Uuid;

use super::settlement::SettlementEngine;
use crate::domain::Actor;
use crate::domain::commit::{Guard, StateCommit};
use crate::domain::deal::{Deal, DealStatus};
use crate::domain::event::{EventKind, MarketEvent};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::ports::{BlobStoreHandle, MarketStoreHandle, NotifierHandle};
use crate::error::{MarketError, Result};

/// Fulfilment workflow attached 1:1 to an accepted deal.
#[derive(Clone)]
pub struct OrderService {
    store: MarketStoreHandle,
    notifier: NotifierHandle,
    blobs: BlobStoreHandle,
    settlement: SettlementEngine,
}

impl OrderService {
    pub fn new(
        store: MarketStoreHandle,
        notifier: NotifierHandle,
        blobs: BlobStoreHandle,
        settlement: SettlementEngine,
    ) -> Self {
        Self {
            store,
            notifier,
            blobs,
            settlement,
        }
    }

    /// Opens the fulfilment record. One order per deal; the store's
    /// uniqueness index makes a concurrent duplicate a `Conflict` rather
    /// than a double insert.
    pub async fn create_order(&self, actor: &Actor, deal_id: Uuid) -> Result<Order> {
        let deal = self.require_deal(deal_id).await?;
        if deal.status != DealStatus::Accepted {
            return Err(MarketError::invalid_state(format!(
                "deal {deal_id} is {:?}; orders are created on accepted deals",
                deal.status
            )));
        }
        if deal.customer_id != Some(actor.user_id) {
            return Err(MarketError::Unauthorized(
                "only the accepting customer may open the order".to_string(),
            ));
        }
        let order = Order::new(deal_id, actor.user_id);
        self.store.insert_order(order.clone()).await?;
        tracing::info!(order_id = %order.id, %deal_id, "order created");
        Ok(order)
    }

    /// Records the purchase screenshot URL; the order moves to
    /// `otp_pending` until the fulfilment details are locked.
    pub async fn attach_screenshot(
        &self,
        actor: &Actor,
        order_id: Uuid,
        url: String,
    ) -> Result<Order> {
        let mut order = self.require_customer_order(actor, order_id).await?;
        order.attach_screenshot(url)?;
        // Guarded so a copy read before a concurrent lock cannot overwrite
        // the locked row.
        let commit = StateCommit::new()
            .guard(Guard::OrderInStatus {
                order_id,
                any_of: vec![OrderStatus::Placed, OrderStatus::OtpPending],
            })
            .order(order.clone());
        self.store.commit(commit).await?;
        Ok(order)
    }

    /// Uploads screenshot bytes through the blob boundary, then attaches
    /// the resulting URL. The core never reads the bytes back.
    pub async fn upload_screenshot(
        &self,
        actor: &Actor,
        order_id: Uuid,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Order> {
        let path = format!("order-screenshots/{order_id}/{filename}");
        let url = self.blobs.put(&path, bytes).await?;
        self.attach_screenshot(actor, order_id, url).await
    }

    /// Locks the e-commerce order id, tracking id and contact phone in one
    /// irreversible step and flips the owning deal to `order_placed`. Both
    /// rows land in a single commit guarded on the deal still being
    /// `accepted`.
    pub async fn lock_details(
        &self,
        actor: &Actor,
        order_id: Uuid,
        ecommerce_order_id: String,
        tracking_id: String,
        customer_phone: String,
    ) -> Result<Order> {
        let mut order = self.require_customer_order(actor, order_id).await?;
        let mut deal = self.require_deal(order.deal_id).await?;

        order.lock_details(ecommerce_order_id, tracking_id, customer_phone)?;
        deal.mark_order_placed()?;

        let commit = StateCommit::new()
            .guard(Guard::DealInStatus {
                deal_id: deal.id,
                any_of: vec![DealStatus::Accepted],
            })
            .order(order.clone())
            .deal(deal.clone());
        self.store.commit(commit).await?;

        tracing::info!(%order_id, deal_id = %deal.id, "order locked");
        self.notifier
            .notify(MarketEvent::new(
                deal.merchant_id,
                EventKind::OrderLocked,
                Some(deal.id),
                format!(
                    "Order for {} is placed and tracked; remaining payment of {} is due",
                    deal.product_name, deal.remaining_amount
                ),
            ))
            .await;
        Ok(order)
    }

    pub async fn mark_delivered(&self, actor: &Actor, order_id: Uuid) -> Result<Order> {
        let mut order = self.require_customer_order(actor, order_id).await?;
        order.mark_delivered()?;
        let commit = StateCommit::new()
            .guard(Guard::OrderInStatus {
                order_id,
                any_of: vec![OrderStatus::Shipped],
            })
            .order(order.clone());
        self.store.commit(commit).await?;
        Ok(order)
    }

    /// Merchant funds the remaining balance, unblocking OTP submission.
    pub async fn merchant_pay_remaining(&self, actor: &Actor, deal_id: Uuid) -> Result<Deal> {
        let mut deal = self.require_deal(deal_id).await?;
        if deal.merchant_id != actor.user_id {
            return Err(MarketError::Unauthorized(
                "only the deal's merchant may pay the remaining balance".to_string(),
            ));
        }
        deal.mark_in_progress()?;
        self.settlement.lock_remaining(&deal).await?;

        if let Some(customer_id) = deal.customer_id {
            self.notifier
                .notify(MarketEvent::new(
                    customer_id,
                    EventKind::RemainingPaid,
                    Some(deal_id),
                    format!(
                        "Remaining payment for {} is locked; submit the delivery OTP once received",
                        deal.product_name
                    ),
                ))
                .await;
        }
        Ok(deal)
    }

    pub async fn order(&self, order_id: Uuid) -> Result<Option<Order>> {
        self.store.order(order_id).await
    }

    pub async fn order_for_deal(&self, deal_id: Uuid) -> Result<Option<Order>> {
        self.store.order_for_deal(deal_id).await
    }

    async fn require_deal(&self, deal_id: Uuid) -> Result<Deal> {
        self.store
            .deal(deal_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("deal {deal_id}")))
    }

    async fn require_customer_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("order {order_id}")))?;
        if order.customer_id != actor.user_id {
            return Err(MarketError::Unauthorized(
                "only the order's customer may update it".to_string(),
            ));
        }
        Ok(order)
    }
}

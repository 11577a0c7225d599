use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MarketError, Result};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    OtpPending,
    Shipped,
    Delivered,
    Confirmed,
}

/// Fulfilment record for one accepted deal, 1:1 by `deal_id`.
///
/// The customer drives it forward: place, upload the order screenshot, then
/// lock the e-commerce order id, tracking id and contact phone in one step.
/// Locking is irreversible and flips the owning deal to `order_placed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub customer_id: Uuid,
    pub order_screenshot_url: Option<String>,
    pub ecommerce_order_id: Option<String>,
    pub tracking_id: Option<String>,
    pub customer_phone: Option<String>,
    pub otp_verified: bool,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(deal_id: Uuid, customer_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            deal_id,
            customer_id,
            order_screenshot_url: None,
            ecommerce_order_id: None,
            tracking_id: None,
            customer_phone: None,
            otp_verified: false,
            status: OrderStatus::Placed,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.tracking_id.is_some()
    }

    /// Screenshot may be re-uploaded until the order is locked.
    pub fn attach_screenshot(&mut self, url: String) -> Result<()> {
        if self.is_locked() {
            return Err(MarketError::IrreversibleState(format!(
                "order {} is locked; the screenshot can no longer change",
                self.id
            )));
        }
        if url.trim().is_empty() {
            return Err(MarketError::validation("screenshot url is required"));
        }
        self.order_screenshot_url = Some(url);
        self.set_status(OrderStatus::OtpPending);
        Ok(())
    }

    /// Locks the fulfilment details. All three fields are mandatory and the
    /// screenshot must already be attached. After this no operation may
    /// clear `tracking_id` or move the order backwards.
    pub fn lock_details(
        &mut self,
        ecommerce_order_id: String,
        tracking_id: String,
        customer_phone: String,
    ) -> Result<()> {
        if self.is_locked() {
            return Err(MarketError::IrreversibleState(format!(
                "order {} fulfilment details are already locked",
                self.id
            )));
        }
        if self.order_screenshot_url.is_none() {
            return Err(MarketError::invalid_state(format!(
                "order {} needs a screenshot before details can be locked",
                self.id
            )));
        }
        if ecommerce_order_id.trim().is_empty()
            || tracking_id.trim().is_empty()
            || customer_phone.trim().is_empty()
        {
            return Err(MarketError::validation(
                "ecommerce order id, tracking id and phone are all required",
            ));
        }
        self.ecommerce_order_id = Some(ecommerce_order_id);
        self.tracking_id = Some(tracking_id);
        self.customer_phone = Some(customer_phone);
        self.set_status(OrderStatus::Shipped);
        Ok(())
    }

    pub fn mark_delivered(&mut self) -> Result<()> {
        if self.status != OrderStatus::Shipped {
            return Err(MarketError::invalid_state(format!(
                "order {} cannot be marked delivered from {:?}",
                self.id, self.status
            )));
        }
        self.set_status(OrderStatus::Delivered);
        Ok(())
    }

    pub fn awaits_delivery_otp(&self) -> bool {
        matches!(self.status, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// Terminal transition taken when the admin verifies the delivery OTP.
    pub fn confirm(&mut self) -> Result<()> {
        if !self.awaits_delivery_otp() {
            return Err(MarketError::invalid_state(format!(
                "order {} cannot be confirmed from {:?}",
                self.id, self.status
            )));
        }
        self.otp_verified = true;
        self.set_status(OrderStatus::Confirmed);
        Ok(())
    }

    fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

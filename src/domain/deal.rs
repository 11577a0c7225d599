use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FeeConfig;
use crate::error::{MarketError, Result};

/// Single authoritative lifecycle status of a deal.
///
/// The literal snake_case tokens are part of the wire contract and must
/// round-trip exactly (`"order_placed"`, `"in_progress"`, ...).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Pending,
    Approved,
    Rejected,
    Accepted,
    OrderPlaced,
    InProgress,
    Completed,
    Cancelled,
}

impl DealStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Cancelled)
    }

    /// Statuses in which a customer is bound to the deal.
    pub fn is_claimed(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::OrderPlaced | Self::InProgress | Self::Completed
        )
    }
}

/// Commercial terms supplied by the merchant at creation. Immutable once
/// the deal exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealTerms {
    pub product_name: String,
    pub product_link: String,
    pub original_price: Decimal,
    pub card_offer_price: Decimal,
    pub expected_buy_price: Decimal,
    pub required_card: String,
}

impl DealTerms {
    pub fn validate(&self) -> Result<()> {
        if self.product_name.trim().is_empty() {
            return Err(MarketError::validation("product name is required"));
        }
        if self.product_link.trim().is_empty() {
            return Err(MarketError::validation("product link is required"));
        }
        if self.required_card.trim().is_empty() {
            return Err(MarketError::validation("required card is required"));
        }
        if self.card_offer_price <= Decimal::ZERO {
            return Err(MarketError::validation(
                "card offer price must be greater than zero",
            ));
        }
        if self.card_offer_price > self.original_price {
            return Err(MarketError::validation(
                "card offer price cannot exceed the original price",
            ));
        }
        if self.expected_buy_price < self.card_offer_price {
            return Err(MarketError::validation(
                "expected buy price cannot be below the card offer price",
            ));
        }
        Ok(())
    }
}

/// A proposed card-offer arbitrage transaction between a merchant and a
/// customer, mediated by escrow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deal {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub product_name: String,
    pub product_link: String,
    pub original_price: Decimal,
    pub card_offer_price: Decimal,
    pub expected_buy_price: Decimal,
    pub required_card: String,
    pub commission_amount: Decimal,
    pub advance_amount: Decimal,
    pub remaining_amount: Decimal,
    pub platform_fee: Option<Decimal>,
    pub delivery_address: Option<String>,
    pub status: DealStatus,
    pub admin_notes: Option<String>,
    pub admin_contact_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// Builds a pending deal from validated terms, deriving the financial
    /// split from the active fee configuration.
    pub fn new(merchant_id: Uuid, terms: DealTerms, fees: &FeeConfig) -> Result<Self> {
        terms.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            merchant_id,
            customer_id: None,
            commission_amount: fees.commission(terms.expected_buy_price, terms.card_offer_price),
            advance_amount: fees.advance(terms.expected_buy_price),
            remaining_amount: fees.remaining(terms.expected_buy_price),
            product_name: terms.product_name,
            product_link: terms.product_link,
            original_price: terms.original_price,
            card_offer_price: terms.card_offer_price,
            expected_buy_price: terms.expected_buy_price,
            required_card: terms.required_card,
            platform_fee: None,
            delivery_address: None,
            status: DealStatus::Pending,
            admin_notes: None,
            admin_contact_number: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// `customer_id` must be set exactly in the claimed statuses.
    pub fn claim_consistent(&self) -> bool {
        self.customer_id.is_some() == self.status.is_claimed()
    }

    pub fn approve(&mut self, contact_number: String) -> Result<()> {
        self.expect_status(DealStatus::Pending, "approve")?;
        self.admin_contact_number = Some(contact_number);
        self.set_status(DealStatus::Approved);
        Ok(())
    }

    pub fn reject(&mut self, notes: String) -> Result<()> {
        self.expect_status(DealStatus::Pending, "reject")?;
        self.admin_notes = Some(notes);
        self.set_status(DealStatus::Rejected);
        Ok(())
    }

    pub fn claim(&mut self, customer_id: Uuid, delivery_address: String) -> Result<()> {
        if self.customer_id.is_some() {
            return Err(MarketError::AlreadyAccepted(self.id));
        }
        self.expect_status(DealStatus::Approved, "accept")?;
        if delivery_address.trim().is_empty() {
            return Err(MarketError::validation("delivery address is required"));
        }
        self.customer_id = Some(customer_id);
        self.delivery_address = Some(delivery_address);
        self.set_status(DealStatus::Accepted);
        Ok(())
    }

    /// Flipped when the order's fulfilment details are locked. Irreversible.
    pub fn mark_order_placed(&mut self) -> Result<()> {
        self.expect_status(DealStatus::Accepted, "lock order")?;
        self.set_status(DealStatus::OrderPlaced);
        Ok(())
    }

    pub fn mark_in_progress(&mut self) -> Result<()> {
        self.expect_status(DealStatus::OrderPlaced, "pay remaining")?;
        self.set_status(DealStatus::InProgress);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.expect_status(DealStatus::InProgress, "complete")?;
        self.set_status(DealStatus::Completed);
        Ok(())
    }

    /// Cancellation is only permitted while the advance is locked but the
    /// order is not. Anything at or past `order_placed` is locked in. The
    /// claim is released so `customer_id` stays set exactly in the claimed
    /// statuses.
    pub fn cancel(&mut self) -> Result<()> {
        match self.status {
            DealStatus::Accepted => {
                self.customer_id = None;
                self.delivery_address = None;
                self.set_status(DealStatus::Cancelled);
                Ok(())
            }
            DealStatus::OrderPlaced | DealStatus::InProgress | DealStatus::Completed => {
                Err(MarketError::IrreversibleState(format!(
                    "deal {} cannot be cancelled once the order is placed",
                    self.id
                )))
            }
            other => Err(MarketError::invalid_state(format!(
                "deal {} cannot be cancelled from status {other:?}",
                self.id
            ))),
        }
    }

    fn expect_status(&self, expected: DealStatus, op: &str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(MarketError::invalid_state(format!(
                "cannot {op} deal {}: status is {:?}, expected {expected:?}",
                self.id, self.status
            )))
        }
    }

    fn set_status(&mut self, status: DealStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn terms() -> DealTerms {
        DealTerms {
            product_name: "iPhone 15 Pro Max".to_string(),
            product_link: "https://shop.example/iphone".to_string(),
            original_price: dec!(10000),
            card_offer_price: dec!(9000),
            expected_buy_price: dec!(9500),
            required_card: "HDFC Infinia".to_string(),
        }
    }

    #[test]
    fn test_new_deal_derives_amounts() {
        let deal = Deal::new(Uuid::new_v4(), terms(), &FeeConfig::default()).unwrap();
        assert_eq!(deal.status, DealStatus::Pending);
        assert_eq!(deal.commission_amount, dec!(350));
        assert_eq!(deal.advance_amount, dec!(2375));
        assert_eq!(deal.remaining_amount, dec!(7125));
        assert!(deal.claim_consistent());
    }

    #[test]
    fn test_terms_price_ordering() {
        let mut t = terms();
        t.card_offer_price = dec!(11000);
        assert!(matches!(t.validate(), Err(MarketError::Validation(_))));

        let mut t = terms();
        t.expected_buy_price = dec!(8000);
        assert!(matches!(t.validate(), Err(MarketError::Validation(_))));
    }

    #[test]
    fn test_full_lifecycle_transitions() {
        let mut deal = Deal::new(Uuid::new_v4(), terms(), &FeeConfig::default()).unwrap();
        deal.approve("+91-90000-00001".to_string()).unwrap();
        assert_eq!(deal.status, DealStatus::Approved);

        deal.claim(Uuid::new_v4(), "221B Baker Street".to_string())
            .unwrap();
        assert_eq!(deal.status, DealStatus::Accepted);
        assert!(deal.claim_consistent());

        deal.mark_order_placed().unwrap();
        deal.mark_in_progress().unwrap();
        deal.complete().unwrap();
        assert_eq!(deal.status, DealStatus::Completed);
        assert!(deal.claim_consistent());
    }

    #[test]
    fn test_claim_twice_is_already_accepted() {
        let mut deal = Deal::new(Uuid::new_v4(), terms(), &FeeConfig::default()).unwrap();
        deal.approve("+91-90000-00001".to_string()).unwrap();
        deal.claim(Uuid::new_v4(), "addr".to_string()).unwrap();
        assert!(matches!(
            deal.claim(Uuid::new_v4(), "addr".to_string()),
            Err(MarketError::AlreadyAccepted(_))
        ));
    }

    #[test]
    fn test_cancel_releases_claim() {
        let mut deal = Deal::new(Uuid::new_v4(), terms(), &FeeConfig::default()).unwrap();
        deal.approve("+91-90000-00001".to_string()).unwrap();
        deal.claim(Uuid::new_v4(), "221B Baker Street".to_string())
            .unwrap();
        deal.cancel().unwrap();
        assert_eq!(deal.status, DealStatus::Cancelled);
        assert!(deal.customer_id.is_none());
        assert!(deal.delivery_address.is_none());
        assert!(deal.claim_consistent());
    }

    #[test]
    fn test_cancel_window() {
        let mut deal = Deal::new(Uuid::new_v4(), terms(), &FeeConfig::default()).unwrap();
        assert!(matches!(deal.cancel(), Err(MarketError::InvalidState(_))));

        deal.approve("+91-90000-00001".to_string()).unwrap();
        deal.claim(Uuid::new_v4(), "addr".to_string()).unwrap();
        deal.mark_order_placed().unwrap();
        assert!(matches!(
            deal.cancel(),
            Err(MarketError::IrreversibleState(_))
        ));
    }

    #[test]
    fn test_status_wire_tokens_round_trip() {
        for (status, token) in [
            (DealStatus::Pending, "\"pending\""),
            (DealStatus::OrderPlaced, "\"order_placed\""),
            (DealStatus::InProgress, "\"in_progress\""),
            (DealStatus::Cancelled, "\"cancelled\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), token);
            let back: DealStatus = serde_json::from_str(token).unwrap();
            assert_eq!(back, status);
        }
        assert!(serde_json::from_str::<DealStatus>("\"paused\"").is_err());
    }
}

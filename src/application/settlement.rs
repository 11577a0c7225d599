use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::commit::{Guard, StateCommit, WalletDelta};
use crate::domain::deal::{Deal, DealStatus};
use crate::domain::event::{EventKind, MarketEvent};
use crate::domain::order::Order;
use crate::domain::otp::OtpRecord;
use crate::domain::payment::{Payment, PaymentStatus, PaymentType};
use crate::domain::ports::{MarketStoreHandle, NotifierHandle};
use crate::error::{MarketError, Result};

/// Owns all wallet and payment mutations.
///
/// Each public method folds the money movement, the audit rows and the
/// triggering entity's status change into one [`StateCommit`], so a failure
/// anywhere leaves no partial ledger effect behind.
#[derive(Clone)]
pub struct SettlementEngine {
    store: MarketStoreHandle,
    notifier: NotifierHandle,
}

impl SettlementEngine {
    pub fn new(store: MarketStoreHandle, notifier: NotifierHandle) -> Self {
        Self { store, notifier }
    }

    /// External wallet top-up.
    pub async fn deposit(&self, user_id: Uuid, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(MarketError::validation("deposit amount must be positive"));
        }
        let commit = StateCommit::new()
            .delta(WalletDelta::credit(user_id, amount))
            .payment(Payment::new(
                PaymentType::Deposit,
                PaymentStatus::Released,
                amount,
                None,
                Some(user_id),
                None,
                "wallet deposit",
            ));
        self.store.commit(commit).await?;
        tracing::info!(%user_id, %amount, "wallet deposit credited");
        Ok(())
    }

    /// Reserves the advance against the merchant's wallet while claiming
    /// the deal for the customer. `deal` carries the claimed state; the
    /// guards re-check that the stored deal is still approved and unclaimed
    /// so concurrent accepts produce exactly one winner.
    pub async fn lock_advance(&self, deal: &Deal) -> Result<()> {
        let wallet = self.store.wallet(deal.merchant_id).await?;
        if wallet.balance < deal.advance_amount {
            return Err(MarketError::InsufficientFunds {
                required: deal.advance_amount,
                available: wallet.balance,
            });
        }

        if deal.customer_id.is_none() {
            return Err(MarketError::invalid_state("advance lock needs a claimed deal"));
        }
        let commit = StateCommit::new()
            .guard(Guard::DealUnclaimed { deal_id: deal.id })
            .guard(Guard::DealInStatus {
                deal_id: deal.id,
                any_of: vec![DealStatus::Approved],
            })
            .delta(WalletDelta::lock(deal.merchant_id, deal.advance_amount))
            .payment(Payment::new(
                PaymentType::AdvanceLock,
                PaymentStatus::Locked,
                deal.advance_amount,
                Some(deal.merchant_id),
                None,
                Some(deal.id),
                format!("advance locked for {}", deal.product_name),
            ))
            .deal(deal.clone());
        self.store.commit(commit).await?;

        tracing::info!(deal_id = %deal.id, amount = %deal.advance_amount, "advance locked");
        self.notifier
            .notify(MarketEvent::new(
                deal.merchant_id,
                EventKind::DealAccepted,
                Some(deal.id),
                format!(
                    "Your deal for {} was accepted; advance of {} is locked",
                    deal.product_name, deal.advance_amount
                ),
            ))
            .await;
        Ok(())
    }

    /// Reserves the remaining balance once the order is locked, gating OTP
    /// disclosure. `deal` carries the `in_progress` state.
    pub async fn lock_remaining(&self, deal: &Deal) -> Result<()> {
        let wallet = self.store.wallet(deal.merchant_id).await?;
        if wallet.balance < deal.remaining_amount {
            return Err(MarketError::InsufficientFunds {
                required: deal.remaining_amount,
                available: wallet.balance,
            });
        }

        let commit = StateCommit::new()
            .guard(Guard::DealInStatus {
                deal_id: deal.id,
                any_of: vec![DealStatus::OrderPlaced],
            })
            .delta(WalletDelta::lock(deal.merchant_id, deal.remaining_amount))
            .payment(Payment::new(
                PaymentType::RemainingLock,
                PaymentStatus::Locked,
                deal.remaining_amount,
                Some(deal.merchant_id),
                None,
                Some(deal.id),
                format!("remaining locked for {}", deal.product_name),
            ))
            .deal(deal.clone());
        self.store.commit(commit).await?;

        tracing::info!(deal_id = %deal.id, amount = %deal.remaining_amount, "remaining locked");
        Ok(())
    }

    /// Final settlement on OTP verification, atomically with the verified
    /// OTP record and the confirmed order:
    /// the merchant's full lock (advance + remaining) is released, the
    /// customer receives the card-offer reimbursement plus commission, and
    /// the residual spread returns to the merchant's balance.
    ///
    /// Idempotent: a deal that is already completed is left untouched.
    pub async fn complete_deal(&self, deal_id: Uuid, order: Order, otp: OtpRecord) -> Result<()> {
        let mut deal = self
            .store
            .deal(deal_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("deal {deal_id}")))?;
        if deal.status == DealStatus::Completed {
            return Ok(());
        }
        let customer_id = deal
            .customer_id
            .ok_or_else(|| MarketError::invalid_state("settlement needs a claimed deal"))?;
        deal.complete()?;

        let total = deal.advance_amount + deal.remaining_amount;
        let customer_payout = deal.card_offer_price + deal.commission_amount;
        let residual = total - customer_payout;
        if residual < Decimal::ZERO {
            return Err(MarketError::invalid_state(format!(
                "deal {deal_id} would settle more than the locked total"
            )));
        }

        let mut commit = StateCommit::new()
            .guard(Guard::DealInStatus {
                deal_id,
                any_of: vec![DealStatus::InProgress],
            })
            .delta(WalletDelta::release_locked(deal.merchant_id, total))
            .delta(WalletDelta::credit(customer_id, customer_payout))
            .payment(Payment::new(
                PaymentType::PurchaseRelease,
                PaymentStatus::Released,
                deal.card_offer_price,
                Some(deal.merchant_id),
                Some(customer_id),
                Some(deal_id),
                format!("purchase reimbursement for {}", deal.product_name),
            ))
            .payment(Payment::new(
                PaymentType::CommissionRelease,
                PaymentStatus::Released,
                deal.commission_amount,
                Some(deal.merchant_id),
                Some(customer_id),
                Some(deal_id),
                format!("commission for {}", deal.product_name),
            ));
        if residual > Decimal::ZERO {
            commit = commit
                .delta(WalletDelta::credit(deal.merchant_id, residual))
                .payment(Payment::new(
                    PaymentType::SpreadRelease,
                    PaymentStatus::Released,
                    residual,
                    Some(deal.merchant_id),
                    Some(deal.merchant_id),
                    Some(deal_id),
                    "unspent spread returned",
                ));
        }
        let commit = commit.deal(deal.clone()).order(order).otp(otp);
        self.store.commit(commit).await?;

        tracing::info!(%deal_id, %total, "deal settled");
        self.notifier
            .notify(MarketEvent::new(
                customer_id,
                EventKind::DealCompleted,
                Some(deal_id),
                format!(
                    "Delivery confirmed; {} commission released to your wallet",
                    deal.commission_amount
                ),
            ))
            .await;
        self.notifier
            .notify(MarketEvent::new(
                deal.merchant_id,
                EventKind::DealCompleted,
                Some(deal_id),
                format!("Deal for {} completed", deal.product_name),
            ))
            .await;
        Ok(())
    }

    /// Compensating transition: unlocks the merchant's advance. Only legal
    /// before the order is locked; `deal` carries the cancelled state.
    pub async fn cancel(&self, deal: &Deal) -> Result<()> {
        let commit = StateCommit::new()
            .guard(Guard::DealInStatus {
                deal_id: deal.id,
                any_of: vec![DealStatus::Accepted],
            })
            .delta(WalletDelta::unlock(deal.merchant_id, deal.advance_amount))
            .payment(Payment::new(
                PaymentType::Refund,
                PaymentStatus::Refunded,
                deal.advance_amount,
                None,
                Some(deal.merchant_id),
                Some(deal.id),
                format!("advance refunded for {}", deal.product_name),
            ))
            .deal(deal.clone());
        self.store.commit(commit).await?;

        tracing::info!(deal_id = %deal.id, amount = %deal.advance_amount, "advance refunded");
        self.notifier
            .notify(MarketEvent::new(
                deal.merchant_id,
                EventKind::DealCancelled,
                Some(deal.id),
                format!("Deal for {} cancelled; advance unlocked", deal.product_name),
            ))
            .await;
        Ok(())
    }
}

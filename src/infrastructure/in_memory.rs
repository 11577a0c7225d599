use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::admin_number::AdminNumber;
use crate::domain::commit::{Guard, StateCommit};
use crate::domain::deal::{Deal, DealStatus};
use crate::domain::kyc::{KycRecord, KycStatus};
use crate::domain::order::Order;
use crate::domain::otp::{OtpRecord, OtpStatus};
use crate::domain::payment::Payment;
use crate::domain::ports::MarketStore;
use crate::domain::wallet::Wallet;
use crate::error::{MarketError, Result};

#[derive(Default)]
struct MarketState {
    deals: HashMap<Uuid, Deal>,
    orders: HashMap<Uuid, Order>,
    orders_by_deal: HashMap<Uuid, Uuid>,
    otps: HashMap<Uuid, OtpRecord>,
    wallets: HashMap<Uuid, Wallet>,
    payments: Vec<Payment>,
    kycs: HashMap<Uuid, KycRecord>,
    pan_index: HashMap<String, Uuid>,
    admin_numbers: HashMap<Uuid, AdminNumber>,
}

impl MarketState {
    fn check_guard(&self, guard: &Guard) -> Result<()> {
        match guard {
            Guard::DealInStatus { deal_id, any_of } => {
                let deal = self
                    .deals
                    .get(deal_id)
                    .ok_or_else(|| MarketError::not_found(format!("deal {deal_id}")))?;
                if any_of.contains(&deal.status) {
                    Ok(())
                } else {
                    Err(MarketError::invalid_state(format!(
                        "deal {deal_id} is {:?}, expected one of {any_of:?}",
                        deal.status
                    )))
                }
            }
            Guard::DealUnclaimed { deal_id } => {
                let deal = self
                    .deals
                    .get(deal_id)
                    .ok_or_else(|| MarketError::not_found(format!("deal {deal_id}")))?;
                if deal.customer_id.is_none() {
                    Ok(())
                } else {
                    Err(MarketError::AlreadyAccepted(*deal_id))
                }
            }
            Guard::OrderInStatus { order_id, any_of } => {
                let order = self
                    .orders
                    .get(order_id)
                    .ok_or_else(|| MarketError::not_found(format!("order {order_id}")))?;
                if any_of.contains(&order.status) {
                    Ok(())
                } else {
                    Err(MarketError::invalid_state(format!(
                        "order {order_id} is {:?}, expected one of {any_of:?}",
                        order.status
                    )))
                }
            }
        }
    }
}

/// A thread-safe in-memory store for the whole marketplace state.
///
/// One `RwLock` spans all tables, so a [`StateCommit`] is checked and
/// applied under a single writer: guards, wallet non-negativity and every
/// effect observe one consistent snapshot. Ideal for tests and embedding.
#[derive(Default, Clone)]
pub struct InMemoryMarketStore {
    state: Arc<RwLock<MarketState>>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn insert_deal(&self, deal: Deal) -> Result<()> {
        let mut state = self.state.write().await;
        state.deals.insert(deal.id, deal);
        Ok(())
    }

    async fn deal(&self, deal_id: Uuid) -> Result<Option<Deal>> {
        let state = self.state.read().await;
        Ok(state.deals.get(&deal_id).cloned())
    }

    async fn deals_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<Deal>> {
        let state = self.state.read().await;
        let mut deals: Vec<Deal> = state
            .deals
            .values()
            .filter(|d| d.merchant_id == merchant_id)
            .cloned()
            .collect();
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn deals_by_customer(&self, customer_id: Uuid) -> Result<Vec<Deal>> {
        let state = self.state.read().await;
        let mut deals: Vec<Deal> = state
            .deals
            .values()
            .filter(|d| d.customer_id == Some(customer_id))
            .cloned()
            .collect();
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn open_deals(&self) -> Result<Vec<Deal>> {
        let state = self.state.read().await;
        let mut deals: Vec<Deal> = state
            .deals
            .values()
            .filter(|d| d.status == DealStatus::Approved && d.customer_id.is_none())
            .cloned()
            .collect();
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn all_deals(&self) -> Result<Vec<Deal>> {
        let state = self.state.read().await;
        let mut deals: Vec<Deal> = state.deals.values().cloned().collect();
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn insert_order(&self, order: Order) -> Result<()> {
        let mut state = self.state.write().await;
        if state.orders_by_deal.contains_key(&order.deal_id) {
            return Err(MarketError::Conflict(format!(
                "deal {} already has an order",
                order.deal_id
            )));
        }
        state.orders_by_deal.insert(order.deal_id, order.id);
        state.orders.insert(order.id, order);
        Ok(())
    }

    async fn order(&self, order_id: Uuid) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn order_for_deal(&self, deal_id: Uuid) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders_by_deal
            .get(&deal_id)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn insert_otp(&self, otp: OtpRecord) -> Result<()> {
        let mut state = self.state.write().await;
        let pending_exists = state
            .otps
            .values()
            .any(|o| o.order_id == otp.order_id && o.status == OtpStatus::Pending);
        if pending_exists {
            return Err(MarketError::Conflict(format!(
                "order {} already has a pending OTP awaiting adjudication",
                otp.order_id
            )));
        }
        state.otps.insert(otp.id, otp);
        Ok(())
    }

    async fn otp(&self, otp_id: Uuid) -> Result<Option<OtpRecord>> {
        let state = self.state.read().await;
        Ok(state.otps.get(&otp_id).cloned())
    }

    async fn pending_otps(&self) -> Result<Vec<OtpRecord>> {
        let state = self.state.read().await;
        let mut otps: Vec<OtpRecord> = state
            .otps
            .values()
            .filter(|o| o.status == OtpStatus::Pending)
            .cloned()
            .collect();
        otps.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(otps)
    }

    async fn wallet(&self, user_id: Uuid) -> Result<Wallet> {
        let mut state = self.state.write().await;
        Ok(state
            .wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::new(user_id))
            .clone())
    }

    async fn payments_for_deal(&self, deal_id: Uuid) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .iter()
            .filter(|p| p.deal_id == Some(deal_id))
            .cloned()
            .collect())
    }

    async fn payments_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .iter()
            .filter(|p| p.from_user_id == Some(user_id) || p.to_user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn upsert_kyc(&self, record: KycRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(owner) = state.pan_index.get(&record.pan_number) {
            if *owner != record.user_id {
                return Err(MarketError::Conflict(format!(
                    "PAN {} is already bound to another user",
                    record.pan_number
                )));
            }
        }
        let stale_pan = state
            .kycs
            .get(&record.user_id)
            .filter(|previous| previous.pan_number != record.pan_number)
            .map(|previous| previous.pan_number.clone());
        if let Some(stale) = stale_pan {
            state.pan_index.remove(&stale);
        }
        state.pan_index.insert(record.pan_number.clone(), record.user_id);
        state.kycs.insert(record.user_id, record);
        Ok(())
    }

    async fn kyc(&self, user_id: Uuid) -> Result<Option<KycRecord>> {
        let state = self.state.read().await;
        Ok(state.kycs.get(&user_id).cloned())
    }

    async fn pending_kycs(&self) -> Result<Vec<KycRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<KycRecord> = state
            .kycs
            .values()
            .filter(|r| r.status == KycStatus::Pending)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(records)
    }

    async fn upsert_admin_number(&self, number: AdminNumber) -> Result<()> {
        let mut state = self.state.write().await;
        state.admin_numbers.insert(number.id, number);
        Ok(())
    }

    async fn admin_numbers(&self) -> Result<Vec<AdminNumber>> {
        let state = self.state.read().await;
        Ok(state.admin_numbers.values().cloned().collect())
    }

    async fn claim_admin_number(&self) -> Result<AdminNumber> {
        let mut state = self.state.write().await;
        let candidate = state
            .admin_numbers
            .values()
            .filter(|n| n.is_active)
            .min_by_key(|n| (n.assignment_count, n.created_at))
            .map(|n| n.id)
            .ok_or(MarketError::NoCapacity)?;
        let number = state
            .admin_numbers
            .get_mut(&candidate)
            .expect("candidate id was just read under the same lock");
        number.record_assignment();
        Ok(number.clone())
    }

    async fn release_admin_number(&self, number_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(number) = state.admin_numbers.get_mut(&number_id) {
            number.revert_assignment();
        }
        Ok(())
    }

    async fn commit(&self, commit: StateCommit) -> Result<()> {
        let mut state = self.state.write().await;

        for guard in &commit.guards {
            state.check_guard(guard)?;
        }

        // Stage wallet updates first so a failing delta aborts before any
        // effect is visible.
        let mut staged: HashMap<Uuid, Wallet> = HashMap::new();
        for delta in &commit.wallet_deltas {
            let wallet = staged.entry(delta.user_id).or_insert_with(|| {
                state
                    .wallets
                    .get(&delta.user_id)
                    .cloned()
                    .unwrap_or_else(|| Wallet::new(delta.user_id))
            });
            let new_balance = wallet.balance + delta.balance;
            let new_locked = wallet.locked_amount + delta.locked;
            if new_balance < Decimal::ZERO {
                return Err(MarketError::InsufficientFunds {
                    required: -delta.balance,
                    available: wallet.balance,
                });
            }
            if new_locked < Decimal::ZERO {
                return Err(MarketError::invalid_state(format!(
                    "wallet {} holds {} locked, cannot release {}",
                    delta.user_id, wallet.locked_amount, -delta.locked
                )));
            }
            wallet.balance = new_balance;
            wallet.locked_amount = new_locked;
            wallet.updated_at = chrono::Utc::now();
        }

        for (user_id, wallet) in staged {
            state.wallets.insert(user_id, wallet);
        }
        state.payments.extend(commit.payments);
        for deal in commit.deals {
            state.deals.insert(deal.id, deal);
        }
        for order in commit.orders {
            state.orders_by_deal.insert(order.deal_id, order.id);
            state.orders.insert(order.id, order);
        }
        for otp in commit.otps {
            state.otps.insert(otp.id, otp);
        }
        Ok(())
    }
}

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
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

/// Column Family for deal records.
pub const CF_DEALS: &str = "deals";
/// Column Family for order records.
pub const CF_ORDERS: &str = "orders";
/// Column Family for OTP records.
pub const CF_OTPS: &str = "otps";
/// Column Family for wallets, keyed by user id.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for the append-only payment ledger.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for KYC records, keyed by user id.
pub const CF_KYCS: &str = "kycs";
/// Column Family for admin contact numbers.
pub const CF_ADMIN_NUMBERS: &str = "admin_numbers";
/// Index: deal id -> order id.
pub const CF_ORDERS_BY_DEAL: &str = "orders_by_deal";
/// Index: PAN -> user id, enforcing PAN uniqueness across users.
pub const CF_PAN_INDEX: &str = "pan_index";

const ALL_CFS: [&str; 9] = [
    CF_DEALS,
    CF_ORDERS,
    CF_OTPS,
    CF_WALLETS,
    CF_PAYMENTS,
    CF_KYCS,
    CF_ADMIN_NUMBERS,
    CF_ORDERS_BY_DEAL,
    CF_PAN_INDEX,
];

/// A persistent store implementation using RocksDB.
///
/// Each entity lives in its own Column Family with JSON values. RocksDB has
/// no multi-key transactions in the mode used here, so all read-modify-write
/// paths and [`StateCommit`] application are serialized behind `write_gate`;
/// the effects of a commit land in one `WriteBatch`, which RocksDB applies
/// atomically.
#[derive(Clone)]
pub struct RocksDbMarketStore {
    db: Arc<DB>,
    write_gate: Arc<Mutex<()>>,
}

impl RocksDbMarketStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// every required column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| MarketError::Storage(format!("column family {name} not found")))
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    fn require_deal(&self, deal_id: Uuid) -> Result<Deal> {
        self.get_json::<Deal>(CF_DEALS, deal_id.as_bytes())?
            .ok_or_else(|| MarketError::not_found(format!("deal {deal_id}")))
    }

    fn check_guard(&self, guard: &Guard) -> Result<()> {
        match guard {
            Guard::DealInStatus { deal_id, any_of } => {
                let deal = self.require_deal(*deal_id)?;
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
                let deal = self.require_deal(*deal_id)?;
                if deal.customer_id.is_none() {
                    Ok(())
                } else {
                    Err(MarketError::AlreadyAccepted(*deal_id))
                }
            }
            Guard::OrderInStatus { order_id, any_of } => {
                let order = self
                    .get_json::<Order>(CF_ORDERS, order_id.as_bytes())?
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

#[async_trait]
impl MarketStore for RocksDbMarketStore {
    async fn insert_deal(&self, deal: Deal) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.put_json(CF_DEALS, deal.id.as_bytes(), &deal)
    }

    async fn deal(&self, deal_id: Uuid) -> Result<Option<Deal>> {
        self.get_json(CF_DEALS, deal_id.as_bytes())
    }

    async fn deals_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<Deal>> {
        let mut deals: Vec<Deal> = self.scan(CF_DEALS)?;
        deals.retain(|d| d.merchant_id == merchant_id);
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn deals_by_customer(&self, customer_id: Uuid) -> Result<Vec<Deal>> {
        let mut deals: Vec<Deal> = self.scan(CF_DEALS)?;
        deals.retain(|d| d.customer_id == Some(customer_id));
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn open_deals(&self) -> Result<Vec<Deal>> {
        let mut deals: Vec<Deal> = self.scan(CF_DEALS)?;
        deals.retain(|d| d.status == DealStatus::Approved && d.customer_id.is_none());
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn all_deals(&self) -> Result<Vec<Deal>> {
        let mut deals: Vec<Deal> = self.scan(CF_DEALS)?;
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    async fn insert_order(&self, order: Order) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let index = self.cf(CF_ORDERS_BY_DEAL)?;
        if self.db.get_pinned_cf(index, order.deal_id.as_bytes())?.is_some() {
            return Err(MarketError::Conflict(format!(
                "deal {} already has an order",
                order.deal_id
            )));
        }
        let mut batch = WriteBatch::default();
        batch.put_cf(index, order.deal_id.as_bytes(), order.id.as_bytes());
        batch.put_cf(
            self.cf(CF_ORDERS)?,
            order.id.as_bytes(),
            serde_json::to_vec(&order)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn order(&self, order_id: Uuid) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, order_id.as_bytes())
    }

    async fn order_for_deal(&self, deal_id: Uuid) -> Result<Option<Order>> {
        let index = self.cf(CF_ORDERS_BY_DEAL)?;
        match self.db.get_cf(index, deal_id.as_bytes())? {
            Some(order_key) => self.get_json(CF_ORDERS, &order_key),
            None => Ok(None),
        }
    }

    async fn insert_otp(&self, otp: OtpRecord) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let pending_exists = self
            .scan::<OtpRecord>(CF_OTPS)?
            .iter()
            .any(|o| o.order_id == otp.order_id && o.status == OtpStatus::Pending);
        if pending_exists {
            return Err(MarketError::Conflict(format!(
                "order {} already has a pending OTP awaiting adjudication",
                otp.order_id
            )));
        }
        self.put_json(CF_OTPS, otp.id.as_bytes(), &otp)
    }

    async fn otp(&self, otp_id: Uuid) -> Result<Option<OtpRecord>> {
        self.get_json(CF_OTPS, otp_id.as_bytes())
    }

    async fn pending_otps(&self) -> Result<Vec<OtpRecord>> {
        let mut otps: Vec<OtpRecord> = self.scan(CF_OTPS)?;
        otps.retain(|o| o.status == OtpStatus::Pending);
        otps.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(otps)
    }

    async fn wallet(&self, user_id: Uuid) -> Result<Wallet> {
        let _gate = self.write_gate.lock().await;
        if let Some(wallet) = self.get_json::<Wallet>(CF_WALLETS, user_id.as_bytes())? {
            return Ok(wallet);
        }
        let wallet = Wallet::new(user_id);
        self.put_json(CF_WALLETS, user_id.as_bytes(), &wallet)?;
        Ok(wallet)
    }

    async fn payments_for_deal(&self, deal_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        payments.retain(|p| p.deal_id == Some(deal_id));
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(payments)
    }

    async fn payments_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        payments.retain(|p| p.from_user_id == Some(user_id) || p.to_user_id == Some(user_id));
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(payments)
    }

    async fn upsert_kyc(&self, record: KycRecord) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let pan_index = self.cf(CF_PAN_INDEX)?;
        if let Some(owner) = self.db.get_cf(pan_index, record.pan_number.as_bytes())? {
            if owner != record.user_id.as_bytes() {
                return Err(MarketError::Conflict(format!(
                    "PAN {} is already bound to another user",
                    record.pan_number
                )));
            }
        }
        let mut batch = WriteBatch::default();
        if let Some(previous) = self.get_json::<KycRecord>(CF_KYCS, record.user_id.as_bytes())? {
            if previous.pan_number != record.pan_number {
                batch.delete_cf(pan_index, previous.pan_number.as_bytes());
            }
        }
        batch.put_cf(
            pan_index,
            record.pan_number.as_bytes(),
            record.user_id.as_bytes(),
        );
        batch.put_cf(
            self.cf(CF_KYCS)?,
            record.user_id.as_bytes(),
            serde_json::to_vec(&record)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn kyc(&self, user_id: Uuid) -> Result<Option<KycRecord>> {
        self.get_json(CF_KYCS, user_id.as_bytes())
    }

    async fn pending_kycs(&self) -> Result<Vec<KycRecord>> {
        let mut records: Vec<KycRecord> = self.scan(CF_KYCS)?;
        records.retain(|r| r.status == KycStatus::Pending);
        records.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(records)
    }

    async fn upsert_admin_number(&self, number: AdminNumber) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.put_json(CF_ADMIN_NUMBERS, number.id.as_bytes(), &number)
    }

    async fn admin_numbers(&self) -> Result<Vec<AdminNumber>> {
        self.scan(CF_ADMIN_NUMBERS)
    }

    async fn claim_admin_number(&self) -> Result<AdminNumber> {
        let _gate = self.write_gate.lock().await;
        let numbers: Vec<AdminNumber> = self.scan(CF_ADMIN_NUMBERS)?;
        let mut number = numbers
            .into_iter()
            .filter(|n| n.is_active)
            .min_by_key(|n| (n.assignment_count, n.created_at))
            .ok_or(MarketError::NoCapacity)?;
        number.record_assignment();
        self.put_json(CF_ADMIN_NUMBERS, number.id.as_bytes(), &number)?;
        Ok(number)
    }

    async fn release_admin_number(&self, number_id: Uuid) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        if let Some(mut number) =
            self.get_json::<AdminNumber>(CF_ADMIN_NUMBERS, number_id.as_bytes())?
        {
            number.revert_assignment();
            self.put_json(CF_ADMIN_NUMBERS, number_id.as_bytes(), &number)?;
        }
        Ok(())
    }

    async fn commit(&self, commit: StateCommit) -> Result<()> {
        let _gate = self.write_gate.lock().await;

        for guard in &commit.guards {
            self.check_guard(guard)?;
        }

        // Stage wallet updates before building the batch; a failing delta
        // must abort with nothing written.
        let mut staged: std::collections::HashMap<Uuid, Wallet> = std::collections::HashMap::new();
        for delta in &commit.wallet_deltas {
            let wallet = match staged.entry(delta.user_id) {
                std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    let loaded = self
                        .get_json::<Wallet>(CF_WALLETS, delta.user_id.as_bytes())?
                        .unwrap_or_else(|| Wallet::new(delta.user_id));
                    entry.insert(loaded)
                }
            };
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

        let mut batch = WriteBatch::default();
        for (user_id, wallet) in &staged {
            batch.put_cf(
                self.cf(CF_WALLETS)?,
                user_id.as_bytes(),
                serde_json::to_vec(wallet)?,
            );
        }
        for payment in &commit.payments {
            batch.put_cf(
                self.cf(CF_PAYMENTS)?,
                payment.id.as_bytes(),
                serde_json::to_vec(payment)?,
            );
        }
        for deal in &commit.deals {
            batch.put_cf(
                self.cf(CF_DEALS)?,
                deal.id.as_bytes(),
                serde_json::to_vec(deal)?,
            );
        }
        for order in &commit.orders {
            batch.put_cf(
                self.cf(CF_ORDERS_BY_DEAL)?,
                order.deal_id.as_bytes(),
                order.id.as_bytes(),
            );
            batch.put_cf(
                self.cf(CF_ORDERS)?,
                order.id.as_bytes(),
                serde_json::to_vec(order)?,
            );
        }
        for otp in &commit.otps {
            batch.put_cf(
                self.cf(CF_OTPS)?,
                otp.id.as_bytes(),
                serde_json::to_vec(otp)?,
            );
        }
        self.db.write(batch)?;
        Ok(())
    }
}

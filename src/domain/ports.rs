use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::admin_number::AdminNumber;
use super::commit::StateCommit;
use super::deal::Deal;
use super::event::MarketEvent;
use super::kyc::KycRecord;
use super::order::Order;
use super::otp::OtpRecord;
use super::payment::Payment;
use super::wallet::Wallet;
use crate::error::Result;

pub type MarketStoreHandle = Arc<dyn MarketStore>;
pub type NotifierHandle = Arc<dyn Notifier>;
pub type BlobStoreHandle = Arc<dyn BlobStore>;

/// Durable state behind the marketplace core.
///
/// Reads are plain lookups. Writes come in two shapes: single-entity
/// inserts/upserts with store-enforced uniqueness, and [`StateCommit`]
/// batches that the store must apply atomically — guards checked and all
/// effects applied under one writer, or nothing at all.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // -- deals ------------------------------------------------------------
    async fn insert_deal(&self, deal: Deal) -> Result<()>;
    async fn deal(&self, deal_id: Uuid) -> Result<Option<Deal>>;
    async fn deals_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<Deal>>;
    async fn deals_by_customer(&self, customer_id: Uuid) -> Result<Vec<Deal>>;
    /// Approved, unclaimed deals offered for browsing.
    async fn open_deals(&self) -> Result<Vec<Deal>>;
    async fn all_deals(&self) -> Result<Vec<Deal>>;

    // -- orders -----------------------------------------------------------
    /// Fails with `Conflict` if an order already exists for the deal.
    async fn insert_order(&self, order: Order) -> Result<()>;
    async fn order(&self, order_id: Uuid) -> Result<Option<Order>>;
    async fn order_for_deal(&self, deal_id: Uuid) -> Result<Option<Order>>;

    // -- otp records ------------------------------------------------------
    /// Fails with `Conflict` if the order already has a pending record.
    async fn insert_otp(&self, otp: OtpRecord) -> Result<()>;
    async fn otp(&self, otp_id: Uuid) -> Result<Option<OtpRecord>>;
    async fn pending_otps(&self) -> Result<Vec<OtpRecord>>;

    // -- wallets & payments ----------------------------------------------
    /// Returns the user's wallet, creating an empty one on first touch.
    async fn wallet(&self, user_id: Uuid) -> Result<Wallet>;
    async fn payments_for_deal(&self, deal_id: Uuid) -> Result<Vec<Payment>>;
    async fn payments_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>>;

    // -- kyc --------------------------------------------------------------
    /// Fails with `Conflict` if the PAN is bound to a different user.
    async fn upsert_kyc(&self, record: KycRecord) -> Result<()>;
    async fn kyc(&self, user_id: Uuid) -> Result<Option<KycRecord>>;
    async fn pending_kycs(&self) -> Result<Vec<KycRecord>>;

    // -- admin contact numbers -------------------------------------------
    async fn upsert_admin_number(&self, number: AdminNumber) -> Result<()>;
    async fn admin_numbers(&self) -> Result<Vec<AdminNumber>>;
    /// Atomically claims the active number with the fewest assignments and
    /// increments its counter. Fails with `NoCapacity` when none is active.
    async fn claim_admin_number(&self) -> Result<AdminNumber>;
    /// Compensates a claim whose surrounding operation lost its race.
    async fn release_admin_number(&self, number_id: Uuid) -> Result<()>;

    // -- atomic batches ---------------------------------------------------
    async fn commit(&self, commit: StateCommit) -> Result<()>;
}

/// Outbound notification dispatcher. Fire-and-forget: implementations must
/// not fail the triggering operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: MarketEvent);
}

/// Opaque blob storage. The core stores and reads back URLs only; it never
/// interprets file bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String>;
}

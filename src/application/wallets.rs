use rust_decimal::Decimal;
use uuid::Uuid;

use super::settlement::SettlementEngine;
use crate::domain::payment::Payment;
use crate::domain::ports::MarketStoreHandle;
use crate::domain::wallet::Wallet;
use crate::error::Result;

/// Read surface over the ledger plus external top-ups.
#[derive(Clone)]
pub struct WalletService {
    store: MarketStoreHandle,
    settlement: SettlementEngine,
}

impl WalletService {
    pub fn new(store: MarketStoreHandle, settlement: SettlementEngine) -> Self {
        Self { store, settlement }
    }

    pub async fn wallet(&self, user_id: Uuid) -> Result<Wallet> {
        self.store.wallet(user_id).await
    }

    pub async fn deposit(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet> {
        self.settlement.deposit(user_id, amount).await?;
        self.store.wallet(user_id).await
    }

    pub async fn history(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        self.store.payments_for_user(user_id).await
    }

    pub async fn deal_payments(&self, deal_id: Uuid) -> Result<Vec<Payment>> {
        self.store.payments_for_deal(deal_id).await
    }
}

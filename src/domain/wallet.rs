use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MarketError, Result};

/// Per-user ledger: spendable balance plus funds reserved for active deals.
///
/// Both figures are invariantly non-negative; every mutation goes through
/// the checked methods below so a commit can refuse a half-applied state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub locked_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance: Decimal::ZERO,
            locked_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds externally funded money to the spendable balance.
    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
        self.updated_at = Utc::now();
    }

    /// Reserves funds for a deal: balance -> locked.
    pub fn lock(&mut self, amount: Decimal) -> Result<()> {
        if self.balance < amount {
            return Err(MarketError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.locked_amount += amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns reserved funds to the spendable balance (cancellation path).
    pub fn unlock(&mut self, amount: Decimal) -> Result<()> {
        self.take_locked(amount)?;
        self.balance += amount;
        Ok(())
    }

    /// Removes reserved funds without returning them, as the settlement
    /// redistributes that money to other wallets.
    pub fn release_locked(&mut self, amount: Decimal) -> Result<()> {
        self.take_locked(amount)
    }

    fn take_locked(&mut self, amount: Decimal) -> Result<()> {
        if self.locked_amount < amount {
            return Err(MarketError::invalid_state(format!(
                "wallet {} holds {} locked, cannot release {amount}",
                self.user_id, self.locked_amount
            )));
        }
        self.locked_amount -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}

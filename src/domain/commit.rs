use rust_decimal::Decimal;
use uuid::Uuid;

use super::deal::{Deal, DealStatus};
use super::order::{Order, OrderStatus};
use super::otp::OtpRecord;
use super::payment::Payment;

/// Signed adjustment to one wallet, applied together with the rest of a
/// [`StateCommit`]. The store rejects the whole commit if any delta would
/// drive a balance or locked amount negative.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletDelta {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub locked: Decimal,
}

impl WalletDelta {
    /// balance -> locked reservation.
    pub fn lock(user_id: Uuid, amount: Decimal) -> Self {
        Self {
            user_id,
            balance: -amount,
            locked: amount,
        }
    }

    /// locked -> balance (cancellation).
    pub fn unlock(user_id: Uuid, amount: Decimal) -> Self {
        Self {
            user_id,
            balance: amount,
            locked: -amount,
        }
    }

    /// Removes locked funds that are being paid out elsewhere.
    pub fn release_locked(user_id: Uuid, amount: Decimal) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
            locked: -amount,
        }
    }

    /// Credits spendable balance.
    pub fn credit(user_id: Uuid, amount: Decimal) -> Self {
        Self {
            user_id,
            balance: amount,
            locked: Decimal::ZERO,
        }
    }
}

/// Optimistic precondition re-checked by the store at commit time, under
/// the same lock that applies the effects. Services validate eagerly for
/// precise errors; guards close the read-to-write race window.
#[derive(Debug, Clone)]
pub enum Guard {
    /// The deal must currently be in one of the listed statuses.
    DealInStatus {
        deal_id: Uuid,
        any_of: Vec<DealStatus>,
    },
    /// The deal must still be unclaimed (`customer_id` null). Failure maps
    /// to `AlreadyAccepted`.
    DealUnclaimed { deal_id: Uuid },
    /// The order must currently be in one of the listed statuses. Keeps a
    /// copy read before a concurrent `lock_details` from overwriting the
    /// locked row.
    OrderInStatus {
        order_id: Uuid,
        any_of: Vec<OrderStatus>,
    },
}

/// One atomic unit of marketplace state change: either every listed effect
/// is applied or none are. This is the only way wallets, payments and
/// entity statuses move together.
#[derive(Debug, Default)]
pub struct StateCommit {
    pub guards: Vec<Guard>,
    pub wallet_deltas: Vec<WalletDelta>,
    pub payments: Vec<Payment>,
    pub deals: Vec<Deal>,
    pub orders: Vec<Order>,
    pub otps: Vec<OtpRecord>,
}

impl StateCommit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn delta(mut self, delta: WalletDelta) -> Self {
        self.wallet_deltas.push(delta);
        self
    }

    pub fn payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }

    pub fn deal(mut self, deal: Deal) -> Self {
        self.deals.push(deal);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn otp(mut self, otp: OtpRecord) -> Self {
        self.otps.push(otp);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_delta_constructors_balance_out() {
        let user = Uuid::new_v4();
        let lock = WalletDelta::lock(user, dec!(100));
        assert_eq!(lock.balance + lock.locked, Decimal::ZERO);

        let unlock = WalletDelta::unlock(user, dec!(100));
        assert_eq!(unlock.balance, dec!(100));
        assert_eq!(unlock.locked, dec!(-100));
    }
}

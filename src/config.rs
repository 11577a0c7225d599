use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Customer commission as a share of the spread between the merchant's
/// expected buy price and the card offer price.
pub const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.70);

/// Merchant's upfront lock as a share of the expected buy price.
pub const DEFAULT_ADVANCE_RATE: Decimal = dec!(0.25);

/// Percentage configuration for deal amount derivation.
///
/// Rates are injected at construction so a hosting service can override
/// them without touching deal logic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeConfig {
    pub commission_rate: Decimal,
    pub advance_rate: Decimal,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            advance_rate: DEFAULT_ADVANCE_RATE,
        }
    }
}

impl FeeConfig {
    /// Commission earned by the customer: `rate * max(0, expected - card_offer)`,
    /// rounded to the nearest whole unit.
    pub fn commission(&self, expected_buy_price: Decimal, card_offer_price: Decimal) -> Decimal {
        let spread = (expected_buy_price - card_offer_price).max(Decimal::ZERO);
        round_money(self.commission_rate * spread)
    }

    /// Advance the merchant locks at acceptance time.
    pub fn advance(&self, expected_buy_price: Decimal) -> Decimal {
        round_money(self.advance_rate * expected_buy_price)
    }

    /// Balance the merchant pays after the order is locked.
    pub fn remaining(&self, expected_buy_price: Decimal) -> Decimal {
        expected_buy_price - self.advance(expected_buy_price)
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

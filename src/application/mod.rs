//! Application layer: the services orchestrating the deal lifecycle and the
//! escrow settlement engine that owns every wallet mutation.

pub mod deals;
pub mod kyc_gate;
pub mod marketplace;
pub mod orders;
pub mod otps;
pub mod settlement;
pub mod wallets;

use super::deals::DealService;
use super::kyc_gate::KycGate;
use super::orders::OrderService;
use super::otps::OtpService;
use super::settlement::SettlementEngine;
use super::wallets::WalletService;
use crate::config::FeeConfig;
use crate::domain::ports::{BlobStoreHandle, MarketStoreHandle, NotifierHandle};

/// Wires the marketplace services from injected collaborators.
///
/// The hosting service owns the store, notifier and blob handles and their
/// lifecycles; everything here just shares them.
#[derive(Clone)]
pub struct Marketplace {
    pub kyc: KycGate,
    pub deals: DealService,
    pub orders: OrderService,
    pub otps: OtpService,
    pub wallets: WalletService,
    pub settlement: SettlementEngine,
}

impl Marketplace {
    pub fn new(
        store: MarketStoreHandle,
        notifier: NotifierHandle,
        blobs: BlobStoreHandle,
        fees: FeeConfig,
    ) -> Self {
        let kyc = KycGate::new(store.clone(), notifier.clone());
        let settlement = SettlementEngine::new(store.clone(), notifier.clone());
        let deals = DealService::new(
            store.clone(),
            notifier.clone(),
            kyc.clone(),
            settlement.clone(),
            fees,
        );
        let orders = OrderService::new(
            store.clone(),
            notifier.clone(),
            blobs,
            settlement.clone(),
        );
        let otps = OtpService::new(store.clone(), notifier, settlement.clone());
        let wallets = WalletService::new(store, settlement.clone());
        Self {
            kyc,
            deals,
            orders,
            otps,
            wallets,
            settlement,
        }
    }
}

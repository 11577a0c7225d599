#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use dealbridge::domain::Actor;
use dealbridge::domain::deal::{Deal, DealTerms};
use dealbridge::domain::kyc::KycSubmission;
use dealbridge::infrastructure::blob::InMemoryBlobStore;
use dealbridge::infrastructure::in_memory::InMemoryMarketStore;
use dealbridge::infrastructure::notify::InMemoryNotifier;
use dealbridge::{FeeConfig, Marketplace};

static SEQ: AtomicU64 = AtomicU64::new(0);

pub struct Harness {
    pub market: Marketplace,
    pub notifier: Arc<InMemoryNotifier>,
    pub admin: Actor,
}

pub fn harness() -> Harness {
    let store = Arc::new(InMemoryMarketStore::new());
    let notifier = Arc::new(InMemoryNotifier::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let market = Marketplace::new(store, notifier.clone(), blobs, FeeConfig::default());
    Harness {
        market,
        notifier,
        admin: Actor::admin(Uuid::new_v4()),
    }
}

/// A structurally valid submission with a PAN unique to this call, so
/// several users can verify inside one test without tripping the PAN
/// uniqueness index.
pub fn submission() -> KycSubmission {
    let n = SEQ.fetch_add(1, Ordering::Relaxed) % 10_000;
    KycSubmission {
        pan_number: format!("ABCDE{n:04}F"),
        bank_name: "State Bank".to_string(),
        bank_account_number: format!("0011223{n:04}"),
        ifsc_code: "SBIN0001234".to_string(),
        document_url: "memory://kyc/doc.pdf".to_string(),
        selfie_url: None,
    }
}

/// Registers a user and walks their KYC to approved.
pub async fn verified_user(h: &Harness) -> Actor {
    let actor = Actor::user(Uuid::new_v4());
    h.market.kyc.submit(&actor, submission()).await.unwrap();
    h.market
        .kyc
        .decide(&h.admin, actor.user_id, true, None)
        .await
        .unwrap();
    actor
}

pub async fn fund(h: &Harness, user_id: Uuid, amount: Decimal) {
    h.market.wallets.deposit(user_id, amount).await.unwrap();
}

/// 10000 original, 9000 card offer, 9500 expected buy: commission 350,
/// advance 2375, remaining 7125.
pub fn terms() -> DealTerms {
    DealTerms {
        product_name: "iPhone 15 Pro Max".to_string(),
        product_link: "https://shop.example/iphone".to_string(),
        original_price: dec!(10000),
        card_offer_price: dec!(9000),
        expected_buy_price: dec!(9500),
        required_card: "HDFC Infinia".to_string(),
    }
}

/// Creates and admin-approves a deal for the merchant, registering a fresh
/// admin contact number so approval always has capacity.
pub async fn approved_deal(h: &Harness, merchant: &Actor) -> Deal {
    let n = SEQ.fetch_add(1, Ordering::Relaxed);
    h.market
        .deals
        .add_admin_number(&h.admin, format!("+91-90000-{n:05}"))
        .await
        .unwrap();
    let deal = h.market.deals.create(merchant, terms()).await.unwrap();
    h.market.deals.approve(&h.admin, deal.id).await.unwrap()
}

/// Walks a fresh deal from acceptance to the point where the delivery OTP
/// may be submitted: accepted, order opened, screenshot attached, details
/// locked, remaining paid, delivery marked. Returns (deal_id, order_id).
pub async fn deal_ready_for_otp(h: &Harness, merchant: &Actor, customer: &Actor) -> (Uuid, Uuid) {
    let deal = approved_deal(h, merchant).await;
    h.market
        .deals
        .accept(customer, deal.id, "221B Baker Street".to_string())
        .await
        .unwrap();
    let order = h.market.orders.create_order(customer, deal.id).await.unwrap();
    h.market
        .orders
        .upload_screenshot(customer, order.id, "proof.png", vec![1, 2, 3])
        .await
        .unwrap();
    h.market
        .orders
        .lock_details(
            customer,
            order.id,
            "AMZ-123".to_string(),
            "TRK-999".to_string(),
            "+91-98765-43210".to_string(),
        )
        .await
        .unwrap();
    h.market
        .orders
        .merchant_pay_remaining(merchant, deal.id)
        .await
        .unwrap();
    h.market.orders.mark_delivered(customer, order.id).await.unwrap();
    (deal.id, order.id)
}

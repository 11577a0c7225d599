mod common;

use common::{approved_deal, deal_ready_for_otp, fund, harness, terms, verified_user};
use dealbridge::MarketError;
use dealbridge::domain::Actor;
use dealbridge::domain::deal::DealStatus;
use dealbridge::domain::event::EventKind;
use dealbridge::domain::order::OrderStatus;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn test_happy_path_end_to_end() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let customer = verified_user(&h).await;
    fund(&h, merchant.user_id, dec!(10000)).await;

    let deal = approved_deal(&h, &merchant).await;
    assert_eq!(deal.status, DealStatus::Approved);
    assert!(deal.admin_contact_number.is_some());
    assert!(
        h.market
            .deals
            .open()
            .await
            .unwrap()
            .iter()
            .any(|d| d.id == deal.id)
    );

    h.market
        .deals
        .accept(&customer, deal.id, "221B Baker Street".to_string())
        .await
        .unwrap();
    let wallet = h.market.wallets.wallet(merchant.user_id).await.unwrap();
    assert_eq!(wallet.locked_amount, dec!(2375));
    assert_eq!(wallet.balance, dec!(7625));

    let order = h
        .market
        .orders
        .create_order(&customer, deal.id)
        .await
        .unwrap();
    let order = h
        .market
        .orders
        .upload_screenshot(&customer, order.id, "proof.png", vec![0xFF])
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::OtpPending);
    assert_eq!(
        order.order_screenshot_url.as_deref(),
        Some(format!("memory://order-screenshots/{}/proof.png", order.id).as_str())
    );

    h.market
        .orders
        .lock_details(
            &customer,
            order.id,
            "AMZ-123".to_string(),
            "TRK-999".to_string(),
            "+91-98765-43210".to_string(),
        )
        .await
        .unwrap();
    let deal_now = h.market.deals.deal(deal.id).await.unwrap().unwrap();
    assert_eq!(deal_now.status, DealStatus::OrderPlaced);

    h.market
        .orders
        .merchant_pay_remaining(&merchant, deal.id)
        .await
        .unwrap();
    let wallet = h.market.wallets.wallet(merchant.user_id).await.unwrap();
    assert_eq!(wallet.locked_amount, dec!(9500));
    assert_eq!(wallet.balance, dec!(500));

    h.market
        .orders
        .mark_delivered(&customer, order.id)
        .await
        .unwrap();
    let otp = h
        .market
        .otps
        .submit(&customer, order.id, "482913".to_string())
        .await
        .unwrap();
    h.market.otps.verify(&h.admin, otp.id).await.unwrap();

    let deal_now = h.market.deals.deal(deal.id).await.unwrap().unwrap();
    assert_eq!(deal_now.status, DealStatus::Completed);
    let order_now = h.market.orders.order(order.id).await.unwrap().unwrap();
    assert_eq!(order_now.status, OrderStatus::Confirmed);
    assert!(order_now.otp_verified);

    // 9500 locked splits into 9000 reimbursement + 350 commission to the
    // customer and a 150 residual back to the merchant.
    let merchant_wallet = h.market.wallets.wallet(merchant.user_id).await.unwrap();
    assert_eq!(merchant_wallet.locked_amount, dec!(0));
    assert_eq!(merchant_wallet.balance, dec!(650));
    let customer_wallet = h.market.wallets.wallet(customer.user_id).await.unwrap();
    assert_eq!(customer_wallet.balance, dec!(9350));
}

#[tokio::test]
async fn test_create_requires_approved_kyc() {
    let h = harness();
    let stranger = Actor::user(Uuid::new_v4());
    let err = h.market.deals.create(&stranger, terms()).await;
    assert!(matches!(err, Err(MarketError::KycRequired(_))));
}

#[tokio::test]
async fn test_merchant_cannot_accept_own_deal() {
    let h = harness();
    let merchant = verified_user(&h).await;
    fund(&h, merchant.user_id, dec!(10000)).await;
    let deal = approved_deal(&h, &merchant).await;

    let err = h
        .market
        .deals
        .accept(&merchant, deal.id, "addr".to_string())
        .await;
    assert!(matches!(err, Err(MarketError::Validation(_))));
}

#[tokio::test]
async fn test_approve_requires_admin_and_capacity() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let deal = h.market.deals.create(&merchant, terms()).await.unwrap();

    let err = h.market.deals.approve(&merchant, deal.id).await;
    assert!(matches!(err, Err(MarketError::Unauthorized(_))));

    // No admin numbers registered yet.
    let err = h.market.deals.approve(&h.admin, deal.id).await;
    assert!(matches!(err, Err(MarketError::NoCapacity)));
}

#[tokio::test]
async fn test_approve_non_pending_leaves_claims_untouched() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let number = h
        .market
        .deals
        .add_admin_number(&h.admin, "+91-90000-00001".to_string())
        .await
        .unwrap();

    // A rejected deal reports its state, not the number pool's.
    let rejected = h.market.deals.create(&merchant, terms()).await.unwrap();
    h.market
        .deals
        .reject(&h.admin, rejected.id, None)
        .await
        .unwrap();
    let err = h.market.deals.approve(&h.admin, rejected.id).await;
    assert!(matches!(err, Err(MarketError::InvalidState(_))));

    let deal = h.market.deals.create(&merchant, terms()).await.unwrap();
    h.market.deals.approve(&h.admin, deal.id).await.unwrap();
    let err = h.market.deals.approve(&h.admin, deal.id).await;
    assert!(matches!(err, Err(MarketError::InvalidState(_))));

    // Exactly one claim stuck: the one successful approval.
    let numbers = h.market.deals.admin_numbers(&h.admin).await.unwrap();
    let pool = numbers.iter().find(|n| n.id == number.id).unwrap();
    assert_eq!(pool.assignment_count, 1);
}

#[tokio::test]
async fn test_reject_records_notes() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let deal = h.market.deals.create(&merchant, terms()).await.unwrap();

    let rejected = h
        .market
        .deals
        .reject(&h.admin, deal.id, Some("pricing off market".to_string()))
        .await
        .unwrap();
    assert_eq!(rejected.status, DealStatus::Rejected);
    assert_eq!(rejected.admin_notes.as_deref(), Some("pricing off market"));

    // A rejected deal is out of the lifecycle for good.
    let err = h.market.deals.approve(&h.admin, deal.id).await;
    assert!(matches!(err, Err(MarketError::InvalidState(_))));
}

#[tokio::test]
async fn test_cancel_refunds_advance() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let customer = verified_user(&h).await;
    fund(&h, merchant.user_id, dec!(5000)).await;
    let deal = approved_deal(&h, &merchant).await;

    h.market
        .deals
        .accept(&customer, deal.id, "addr".to_string())
        .await
        .unwrap();
    h.market.deals.cancel(&customer, deal.id).await.unwrap();

    let deal_now = h.market.deals.deal(deal.id).await.unwrap().unwrap();
    assert_eq!(deal_now.status, DealStatus::Cancelled);
    assert!(deal_now.customer_id.is_none());
    assert!(deal_now.claim_consistent());
    let wallet = h.market.wallets.wallet(merchant.user_id).await.unwrap();
    assert_eq!(wallet.balance, dec!(5000));
    assert_eq!(wallet.locked_amount, dec!(0));
}

#[tokio::test]
async fn test_cancel_blocked_once_order_locked() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let customer = verified_user(&h).await;
    fund(&h, merchant.user_id, dec!(10000)).await;
    let deal = approved_deal(&h, &merchant).await;

    h.market
        .deals
        .accept(&customer, deal.id, "addr".to_string())
        .await
        .unwrap();
    let order = h
        .market
        .orders
        .create_order(&customer, deal.id)
        .await
        .unwrap();
    h.market
        .orders
        .attach_screenshot(&customer, order.id, "memory://shot.png".to_string())
        .await
        .unwrap();
    h.market
        .orders
        .lock_details(
            &customer,
            order.id,
            "AMZ-1".to_string(),
            "TRK-1".to_string(),
            "999".to_string(),
        )
        .await
        .unwrap();

    let err = h.market.deals.cancel(&customer, deal.id).await;
    assert!(matches!(err, Err(MarketError::IrreversibleState(_))));

    // An outsider never gets that far.
    let outsider = Actor::user(Uuid::new_v4());
    let err = h.market.deals.cancel(&outsider, deal.id).await;
    assert!(matches!(err, Err(MarketError::Unauthorized(_))));
}

#[tokio::test]
async fn test_otp_blocked_until_remaining_paid() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let customer = verified_user(&h).await;
    fund(&h, merchant.user_id, dec!(10000)).await;
    let deal = approved_deal(&h, &merchant).await;

    h.market
        .deals
        .accept(&customer, deal.id, "addr".to_string())
        .await
        .unwrap();
    let order = h
        .market
        .orders
        .create_order(&customer, deal.id)
        .await
        .unwrap();
    h.market
        .orders
        .attach_screenshot(&customer, order.id, "memory://shot.png".to_string())
        .await
        .unwrap();
    h.market
        .orders
        .lock_details(
            &customer,
            order.id,
            "AMZ-1".to_string(),
            "TRK-1".to_string(),
            "999".to_string(),
        )
        .await
        .unwrap();

    // Shipped but unfunded: the OTP must stay undisclosed.
    let err = h
        .market
        .otps
        .submit(&customer, order.id, "482913".to_string())
        .await;
    assert!(matches!(err, Err(MarketError::PaymentPending(id)) if id == deal.id));

    h.market
        .orders
        .merchant_pay_remaining(&merchant, deal.id)
        .await
        .unwrap();
    h.market
        .otps
        .submit(&customer, order.id, "482913".to_string())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_one_order_per_deal() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let customer = verified_user(&h).await;
    fund(&h, merchant.user_id, dec!(10000)).await;
    let deal = approved_deal(&h, &merchant).await;

    h.market
        .deals
        .accept(&customer, deal.id, "addr".to_string())
        .await
        .unwrap();
    h.market
        .orders
        .create_order(&customer, deal.id)
        .await
        .unwrap();
    let dup = h.market.orders.create_order(&customer, deal.id).await;
    assert!(matches!(dup, Err(MarketError::Conflict(_))));
}

#[tokio::test]
async fn test_rejected_otp_allows_resubmission() {
    let h = harness();
    let merchant = verified_user(&h).await;
    let customer = verified_user(&h).await;
    fund(&h, merchant.user_id, dec!(10000)).await;
    let (deal_id, order_id) = deal_ready_for_otp(&h, &merchant, &customer).await;

    let first = h
        .market
        .otps
        .submit(&customer, order_id, "111111".to_string())
        .await
        .unwrap();

    // A second code while one is pending is refused.
    let dup = h
        .market
        .otps
        .submit(&customer, order_id, "222222".to_string())
        .await;
    assert!(matches!(dup, Err(MarketError::Conflict(_))));

    h.market.otps.reject(&h.admin, first.id, None).await.unwrap();
    let rejection = h
        .notifier
        .events()
        .into_iter()
        .find(|e| e.kind == EventKind::OtpRejected)
        .unwrap();
    assert_eq!(rejection.recipient, customer.user_id);
    assert_eq!(rejection.deal_id, Some(deal_id));

    let second = h
        .market
        .otps
        .submit(&customer, order_id, "222222".to_string())
        .await
        .unwrap();
    h.market.otps.verify(&h.admin, second.id).await.unwrap();

    let deal_now = h.market.deals.deal(deal_id).await.unwrap().unwrap();
    assert_eq!(deal_now.status, DealStatus::Completed);
}

mod common;

use common::{harness, submission, terms, verified_user};
use dealbridge::MarketError;
use dealbridge::domain::Actor;
use dealbridge::domain::kyc::KycStatus;
use uuid::Uuid;

#[tokio::test]
async fn test_invalid_pan_is_rejected() {
    let h = harness();
    let actor = Actor::user(Uuid::new_v4());
    let mut bad = submission();
    bad.pan_number = "abc".to_string();
    let err = h.market.kyc.submit(&actor, bad).await;
    assert!(matches!(err, Err(MarketError::Validation(_))));
    assert_eq!(
        h.market.kyc.status(actor.user_id).await.unwrap(),
        KycStatus::NotSubmitted
    );
}

#[tokio::test]
async fn test_pending_submission_blocks_deals_and_duplicates() {
    let h = harness();
    let actor = Actor::user(Uuid::new_v4());
    h.market.kyc.submit(&actor, submission()).await.unwrap();
    assert_eq!(
        h.market.kyc.status(actor.user_id).await.unwrap(),
        KycStatus::Pending
    );

    // Still gated until an admin approves.
    let err = h.market.deals.create(&actor, terms()).await;
    assert!(matches!(err, Err(MarketError::KycRequired(_))));

    let err = h.market.kyc.submit(&actor, submission()).await;
    assert!(matches!(err, Err(MarketError::Conflict(_))));
}

#[tokio::test]
async fn test_approval_unlocks_deal_creation() {
    let h = harness();
    let actor = Actor::user(Uuid::new_v4());
    h.market.kyc.submit(&actor, submission()).await.unwrap();
    h.market
        .kyc
        .decide(&h.admin, actor.user_id, true, None)
        .await
        .unwrap();

    assert!(h.market.kyc.can_create_deal(actor.user_id).await.unwrap());
    h.market.deals.create(&actor, terms()).await.unwrap();
}

#[tokio::test]
async fn test_rejection_and_resubmission() {
    let h = harness();
    let actor = Actor::user(Uuid::new_v4());
    h.market.kyc.submit(&actor, submission()).await.unwrap();
    let rejected = h
        .market
        .kyc
        .decide(&h.admin, actor.user_id, false, Some("document unreadable".to_string()))
        .await
        .unwrap();
    assert_eq!(rejected.status, KycStatus::Rejected);
    assert_eq!(rejected.admin_notes.as_deref(), Some("document unreadable"));

    // Resubmission re-enters the queue with clean notes.
    let resubmitted = h.market.kyc.submit(&actor, submission()).await.unwrap();
    assert_eq!(resubmitted.status, KycStatus::Pending);
    assert!(resubmitted.admin_notes.is_none());

    let queue = h.market.kyc.pending(&h.admin).await.unwrap();
    assert!(queue.iter().any(|r| r.user_id == actor.user_id));
}

#[tokio::test]
async fn test_pan_bound_to_one_user() {
    let h = harness();
    let first = Actor::user(Uuid::new_v4());
    let second = Actor::user(Uuid::new_v4());
    let shared = submission();

    h.market.kyc.submit(&first, shared.clone()).await.unwrap();
    let err = h.market.kyc.submit(&second, shared).await;
    assert!(matches!(err, Err(MarketError::Conflict(_))));
}

#[tokio::test]
async fn test_decide_requires_admin_and_is_idempotent() {
    let h = harness();
    let actor = Actor::user(Uuid::new_v4());
    h.market.kyc.submit(&actor, submission()).await.unwrap();

    let err = h.market.kyc.decide(&actor, actor.user_id, true, None).await;
    assert!(matches!(err, Err(MarketError::Unauthorized(_))));

    h.market
        .kyc
        .decide(&h.admin, actor.user_id, true, None)
        .await
        .unwrap();
    // Repeating the standing decision is a no-op; reversing it is not
    // allowed through this path.
    let again = h
        .market
        .kyc
        .decide(&h.admin, actor.user_id, true, None)
        .await
        .unwrap();
    assert_eq!(again.status, KycStatus::Approved);
    let err = h
        .market
        .kyc
        .decide(&h.admin, actor.user_id, false, None)
        .await;
    assert!(matches!(err, Err(MarketError::InvalidState(_))));
}

#[tokio::test]
async fn test_verified_helper_round_trip() {
    let h = harness();
    let user = verified_user(&h).await;
    assert_eq!(
        h.market.kyc.status(user.user_id).await.unwrap(),
        KycStatus::Approved
    );
}

//! End-to-end token lifecycle against the in-memory store.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokenkit_auth::types::ACCOUNT_ID;
use tokenkit_auth::{
    ContextSelector, IssueOptions, StoredValue, TokenContext, TokenError, TokenService,
    TokenStorage, UserDirectory, UserRef,
};
use tokenkit_db_memory::MemoryTokenStore;
use tokenkit_secrets::Keyring;
use uuid::Uuid;

struct Harness {
    store: MemoryTokenStore,
    service: TokenService,
    keyring: Keyring,
    user: UserRef,
    t0: OffsetDateTime,
}

async fn harness() -> Harness {
    let store = MemoryTokenStore::new();
    let user = UserRef::new(Uuid::new_v4(), "alice@example.com");
    store.upsert_user(user.clone()).await;
    let keyring = Keyring::new(Keyring::generate_key(), "test");
    Harness {
        store,
        service: TokenService::new(Arc::new(keyring.clone())),
        keyring,
        user,
        t0: OffsetDateTime::now_utc(),
    }
}

#[tokio::test]
async fn confirm_token_valid_for_seven_days() {
    let h = harness().await;
    let issued = h
        .service
        .issue_at(TokenContext::Confirm, &h.user, IssueOptions::new(), h.t0)
        .unwrap();
    h.store.insert(&issued.record).await.unwrap();
    let presented = issued.secret.as_text().unwrap().to_string();

    for day in 0..=7 {
        let predicate = h
            .service
            .verify_at(
                presented.as_bytes(),
                &TokenContext::Confirm,
                h.t0 + Duration::days(day),
            )
            .unwrap();
        let found = h.store.find_one(&predicate).await.unwrap();
        assert_eq!(found.map(|m| m.owner.id), Some(h.user.id), "day {day}");
    }

    let predicate = h
        .service
        .verify_at(
            presented.as_bytes(),
            &TokenContext::Confirm,
            h.t0 + Duration::days(8),
        )
        .unwrap();
    assert!(h.store.find_one(&predicate).await.unwrap().is_none());
}

#[tokio::test]
async fn reset_password_expires_after_one_day() {
    let h = harness().await;
    let issued = h
        .service
        .issue_at(TokenContext::ResetPassword, &h.user, IssueOptions::new(), h.t0)
        .unwrap();
    h.store.insert(&issued.record).await.unwrap();

    let predicate = h
        .service
        .verify_at(
            issued.secret.as_bytes(),
            &TokenContext::ResetPassword,
            h.t0 + Duration::days(2),
        )
        .unwrap();
    assert!(h.store.find_one(&predicate).await.unwrap().is_none());
}

#[tokio::test]
async fn email_change_invalidates_confirm_token() {
    let h = harness().await;
    let issued = h
        .service
        .issue_at(TokenContext::Confirm, &h.user, IssueOptions::new(), h.t0)
        .unwrap();
    h.store.insert(&issued.record).await.unwrap();

    let predicate = h
        .service
        .verify_at(issued.secret.as_bytes(), &TokenContext::Confirm, h.t0)
        .unwrap();
    assert!(h.store.find_one(&predicate).await.unwrap().is_some());

    h.store
        .update_email(h.user.id, "alice@new.example.com")
        .await
        .unwrap();

    let predicate = h
        .service
        .verify_at(issued.secret.as_bytes(), &TokenContext::Confirm, h.t0)
        .unwrap();
    assert!(h.store.find_one(&predicate).await.unwrap().is_none());
}

#[tokio::test]
async fn change_email_flow() {
    let h = harness().await;
    let context = TokenContext::change_email(&h.user.email);
    let issued = h
        .service
        .issue_at(
            context.clone(),
            &h.user,
            IssueOptions::new().sent_to("alice@new.example.com"),
            h.t0,
        )
        .unwrap();
    h.store.insert(&issued.record).await.unwrap();

    let predicate = h
        .service
        .verify_at(issued.secret.as_bytes(), &context, h.t0 + Duration::days(1))
        .unwrap();
    let found = h.store.take_one(&predicate).await.unwrap().unwrap();
    assert_eq!(
        found.record.sent_to.as_deref(),
        Some("alice@new.example.com")
    );

    h.store
        .update_email(h.user.id, "alice@new.example.com")
        .await
        .unwrap();
    let remaining = h
        .service
        .records_for_user(&h.user, ContextSelector::Only(vec![context]));
    assert!(h.store.find_all(&remaining).await.unwrap().is_empty());
}

#[tokio::test]
async fn session_and_impersonation_tokens() {
    let h = harness().await;
    let target = UserRef::new(Uuid::new_v4(), "bob@example.com");
    h.store.upsert_user(target.clone()).await;

    let session = h
        .service
        .issue_at(TokenContext::Session, &h.user, IssueOptions::new(), h.t0)
        .unwrap();
    let impersonation = h
        .service
        .issue_at(
            TokenContext::Impersonate,
            &h.user,
            IssueOptions::new().impersonating(target.id),
            h.t0,
        )
        .unwrap();
    h.store.insert(&session.record).await.unwrap();
    h.store.insert(&impersonation.record).await.unwrap();

    let predicate = h
        .service
        .verify_at(
            impersonation.secret.as_bytes(),
            &TokenContext::Impersonate,
            h.t0 + Duration::hours(2),
        )
        .unwrap();
    let found = h.store.find_one(&predicate).await.unwrap().unwrap();
    assert_eq!(found.owner.id, h.user.id);
    let impersonated = found.record.impersonated_user_id().unwrap();
    assert_eq!(
        h.store.find_user(impersonated).await.unwrap(),
        Some(target)
    );

    let expired = h
        .service
        .verify_at(
            impersonation.secret.as_bytes(),
            &TokenContext::Impersonate,
            h.t0 + Duration::days(2),
        )
        .unwrap();
    assert!(h.store.find_one(&expired).await.unwrap().is_none());

    let predicate = h
        .service
        .verify_at(
            session.secret.as_bytes(),
            &TokenContext::Session,
            h.t0 + Duration::days(59),
        )
        .unwrap();
    assert!(h.store.find_one(&predicate).await.unwrap().is_some());
}

#[tokio::test]
async fn team_invite_validity_freshness_and_reveal() {
    let h = harness().await;
    let account = Uuid::new_v4();
    let issued = h
        .service
        .issue_at(
            TokenContext::AccountTeamInvite,
            &h.user,
            IssueOptions::new()
                .for_account(account)
                .sent_to("carol@example.com"),
            h.t0,
        )
        .unwrap();
    h.store.insert(&issued.record).await.unwrap();
    let presented = issued.secret.as_bytes();
    let context = TokenContext::AccountTeamInvite;

    let valid = h
        .service
        .verify_at(presented, &context, h.t0 + Duration::days(5))
        .unwrap()
        .with_annotation(ACCOUNT_ID, account.to_string());
    assert!(h.store.find_one(&valid).await.unwrap().is_some());

    let current = h
        .service
        .verify_current_at(presented, &context, h.t0 + Duration::days(5))
        .unwrap();
    assert!(h.store.find_one(&current).await.unwrap().is_none());

    let current = h
        .service
        .verify_current_at(presented, &context, h.t0 + Duration::hours(1))
        .unwrap();
    assert!(h.store.find_one(&current).await.unwrap().is_some());

    let listed = h
        .store
        .find_all(&h.service.invites_for_account_at(account, h.t0))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(
        h.service.reveal(&listed[0]).unwrap(),
        issued.secret.as_text().unwrap()
    );
}

#[tokio::test]
async fn reveal_after_key_removal_fails() {
    let h = harness().await;
    let issued = h
        .service
        .issue_at(
            TokenContext::AccountTeamInvite,
            &h.user,
            IssueOptions::new(),
            h.t0,
        )
        .unwrap();

    h.keyring.rotate(Keyring::generate_key(), "next");
    assert!(h.service.reveal(&issued.record).is_ok());

    h.keyring.remove_key("test").unwrap();
    let err = h.service.reveal(&issued.record).unwrap_err();
    assert!(matches!(err, TokenError::Decryption { .. }));
}

#[tokio::test]
async fn reveal_corrupted_ciphertext_fails() {
    let h = harness().await;
    let mut issued = h
        .service
        .issue_at(
            TokenContext::AccountTeamInvite,
            &h.user,
            IssueOptions::new(),
            h.t0,
        )
        .unwrap();
    if let StoredValue::Encrypted { ciphertext, .. } = &mut issued.record.stored {
        let last = ciphertext.data.len() - 1;
        ciphertext.data[last] ^= 0x80;
    }
    let err = h.service.reveal(&issued.record).unwrap_err();
    assert!(matches!(err, TokenError::Decryption { .. }));
    assert!(err.is_invalid_credential());
}

#[tokio::test]
async fn one_time_token_redeems_once() {
    let h = harness().await;
    let issued = h
        .service
        .issue_at(TokenContext::AccountInvite, &h.user, IssueOptions::new(), h.t0)
        .unwrap();
    h.store.insert(&issued.record).await.unwrap();

    let predicate = h
        .service
        .verify_at(issued.secret.as_bytes(), &TokenContext::AccountInvite, h.t0)
        .unwrap();

    let (a, b) = tokio::join!(h.store.take_one(&predicate), h.store.take_one(&predicate));
    let redeemed = [a.unwrap(), b.unwrap()]
        .into_iter()
        .filter(Option::is_some)
        .count();
    assert_eq!(redeemed, 1);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn malformed_and_unknown_inputs() {
    let h = harness().await;
    let err = h
        .service
        .verify_tagged(b"%%% not a token %%%", "confirm")
        .unwrap_err();
    assert!(matches!(err, TokenError::Decode { .. }));

    let err = h
        .service
        .verify_tagged(b"AAAA", "unknown-context")
        .unwrap_err();
    assert!(matches!(err, TokenError::UnknownContext { .. }));
}

#[tokio::test]
async fn stored_record_round_trips_through_json() {
    let h = harness().await;
    let issued = h
        .service
        .issue_at(
            TokenContext::AccountTeamInvite,
            &h.user,
            IssueOptions::new().for_account(Uuid::new_v4()),
            h.t0,
        )
        .unwrap();
    let json = serde_json::to_string(&issued.record).unwrap();
    assert!(!json.contains(issued.secret.as_text().unwrap()));

    let restored = serde_json::from_str(&json).unwrap();
    assert_eq!(
        h.service.reveal(&restored).unwrap(),
        issued.secret.as_text().unwrap()
    );
}

#[tokio::test]
async fn purge_change_email_tokens_across_addresses() {
    let h = harness().await;
    for current in ["alice@example.com", "alice@old.example.com"] {
        let issued = h
            .service
            .issue_at(
                TokenContext::change_email(current),
                &h.user,
                IssueOptions::new().sent_to("alice@new.example.com"),
                h.t0,
            )
            .unwrap();
        h.store.insert(&issued.record).await.unwrap();
    }
    let confirm = h
        .service
        .issue_at(TokenContext::Confirm, &h.user, IssueOptions::new(), h.t0)
        .unwrap();
    h.store.insert(&confirm.record).await.unwrap();

    let pending = h
        .service
        .records_for_user(&h.user, ContextSelector::Families(vec!["change:*"]));
    assert_eq!(h.store.delete_matching(&pending).await.unwrap(), 2);
    assert_eq!(h.store.len().await, 1);
}

use super::*;
use crate::state::test_helpers::FakeOnboardingStore;

fn meta(flag: Option<bool>) -> Result<Option<UserMetadata>, OnboardingStoreError> {
    Ok(Some(UserMetadata { onboarding_completed: flag }))
}

#[test]
fn missing_row_needs_onboarding() {
    assert!(needs_onboarding(&Ok(None)));
}

#[test]
fn lookup_error_needs_onboarding() {
    let lookup = Err(OnboardingStoreError::Db(sqlx::Error::RowNotFound));
    assert!(needs_onboarding(&lookup));
}

#[test]
fn explicit_false_needs_onboarding() {
    assert!(needs_onboarding(&meta(Some(false))));
}

#[test]
fn completed_does_not_need_onboarding() {
    assert!(!needs_onboarding(&meta(Some(true))));
}

#[test]
fn null_flag_does_not_need_onboarding() {
    assert!(!needs_onboarding(&meta(None)));
}

#[tokio::test]
async fn is_onboarding_reads_store() {
    let user_id = Uuid::new_v4();
    let store = FakeOnboardingStore::new().with(user_id, Some(true));
    assert!(!is_onboarding(&store, user_id).await);
    assert!(is_onboarding(&store, Uuid::new_v4()).await);
}

#[tokio::test]
async fn is_onboarding_on_failed_read_is_true() {
    let user_id = Uuid::new_v4();
    let store = FakeOnboardingStore::failing().with(user_id, Some(true));
    assert!(is_onboarding(&store, user_id).await);
}

mod common;

use anyhow::Result;
use common::test_service;
use freelance_ledger::application::{AppError, ErrorKind};

#[tokio::test]
async fn test_add_and_list_users() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = service.add_user("alice", 100000).await?;
    let bob = service.add_user("bob", 0).await?;

    assert!(alice.id < bob.id);
    assert_eq!(alice.balance, 100000);
    assert!(alice.skills.is_empty());

    let users = service.list_users().await?;
    assert_eq!(users.len(), 2);
    assert_eq!(users[0], alice);
    assert_eq!(users[1], bob);

    Ok(())
}

#[tokio::test]
async fn test_user_name_is_trimmed() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let user = service.add_user("  carol  ", 500).await?;
    assert_eq!(user.name, "carol");
    assert_eq!(service.get_user(user.id).await?.name, "carol");

    Ok(())
}

#[tokio::test]
async fn test_duplicate_name_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.add_user("alice", 100000).await?;
    let err = service.add_user("alice", 5).await.unwrap_err();

    assert!(matches!(err, AppError::DuplicateName(ref name) if name == "alice"));
    assert_eq!(err.kind(), ErrorKind::BusinessRule);

    // The first registration is untouched
    let users = service.list_users().await?;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].balance, 100000);

    Ok(())
}

#[tokio::test]
async fn test_empty_name_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.add_user("   ", 100).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyName));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(service.list_users().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_negative_opening_balance_is_accepted() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let user = service.add_user("in-debt", -2500).await?;
    assert_eq!(user.balance, -2500);
    assert_eq!(service.get_user(user.id).await?.balance, -2500);

    // ...but such a user cannot post orders
    let err = service.add_order(user.id, "Anything", 1).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds { balance: -2500, .. }));

    Ok(())
}

#[tokio::test]
async fn test_get_unknown_user() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.get_user(42).await.unwrap_err();
    assert!(matches!(err, AppError::UserNotFound(42)));

    Ok(())
}

#[tokio::test]
async fn test_skills() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = service.add_user("alice", 0).await?;
    let bob = service.add_user("bob", 0).await?;

    service.add_skill(alice.id, "rust").await?;
    service.add_skill(alice.id, "sql").await?;
    service.add_skill(bob.id, "design").await?;

    // Adding an existing skill again is a no-op
    let again = service.add_skill(alice.id, "rust").await?;

    let alice = service.get_user(alice.id).await?;
    assert_eq!(alice.skill_names(), vec!["rust", "sql"]);
    assert_eq!(alice.skills[0].id, again.id);

    let users = service.list_users().await?;
    assert_eq!(users[0].skill_names(), vec!["rust", "sql"]);
    assert_eq!(users[1].skill_names(), vec!["design"]);

    Ok(())
}

#[tokio::test]
async fn test_skill_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = service.add_user("alice", 0).await?;

    assert!(matches!(
        service.add_skill(alice.id, "").await,
        Err(AppError::EmptySkill)
    ));
    assert!(matches!(
        service.add_skill(999, "rust").await,
        Err(AppError::UserNotFound(999))
    ));

    Ok(())
}

#[tokio::test]
async fn test_close_is_idempotent() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.add_user("alice", 0).await?;

    service.close().await;
    assert!(service.is_closed());
    service.close().await;
    assert!(service.is_closed());

    // Operations after close surface as storage failures, not panics
    let err = service.list_users().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    Ok(())
}

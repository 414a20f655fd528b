// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use freelance_ledger::application::LedgerService;
use freelance_ledger::config::StoreConfig;
use freelance_ledger::domain::{Cents, User};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = StoreConfig::new(temp_dir.path().join("test.db"));
    let service = LedgerService::init(&config).await?;
    Ok((service, temp_dir))
}

/// Same as `test_service`, wrapped for sharing across spawned tasks
pub async fn shared_service() -> Result<(Arc<LedgerService>, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    Ok((Arc::new(service), temp_dir))
}

/// Test fixture: a requester with money and a worker without
pub struct Marketplace {
    pub alice: User,
    pub bob: User,
}

impl Marketplace {
    /// alice starts with 1000.00, bob with nothing
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let alice = service.add_user("alice", 100000).await?;
        let bob = service.add_user("bob", 0).await?;
        Ok(Self { alice, bob })
    }
}

/// Current balance of a user, read back from the store
pub async fn balance_of(service: &LedgerService, id: i64) -> Result<Cents> {
    Ok(service.get_user(id).await?.balance)
}

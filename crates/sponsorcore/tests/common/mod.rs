//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod mock_platform;

#[allow(unused_imports)]
pub use mock_platform::MockPlatform;

use std::sync::Arc;
use std::time::Duration;

use sponsorcore::{
    create_pool, ChannelRegistry, CheckMode, DbPool, MembershipVerifier, RewardLedger, VerificationOrchestrator,
};

/// A fresh database in a temporary directory plus all core components.
#[allow(dead_code)]
pub struct TestEnvironment {
    pub dir: tempfile::TempDir,
    pub pool: Arc<DbPool>,
    pub registry: ChannelRegistry,
    pub ledger: RewardLedger,
    pub platform: Arc<MockPlatform>,
    pub orchestrator: VerificationOrchestrator,
}

impl TestEnvironment {
    pub fn new(platform: MockPlatform) -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("sponsor_test.sqlite");
        let pool = Arc::new(create_pool(path.to_str().unwrap()).expect("failed to create pool"));
        let platform = Arc::new(platform);

        let registry = ChannelRegistry::new(pool.clone());
        let ledger = RewardLedger::new(pool.clone());
        let verifier = MembershipVerifier::new(platform.clone(), Duration::from_millis(500), CheckMode::Parallel);
        let orchestrator = VerificationOrchestrator::new(registry.clone(), ledger.clone(), verifier, platform.clone())
            .with_send_timeout(Duration::from_millis(500));

        Self {
            dir,
            pool,
            registry,
            ledger,
            platform,
            orchestrator,
        }
    }
}

//! Common test utilities for fprime-auth-core integration tests

pub mod jwks_mock;

#[allow(unused_imports)]
pub use jwks_mock::{
    MockIdentityProvider, TestEntraClaims, TestKeyPair, TEST_CLIENT_ID, TEST_GROUP, TEST_TENANT,
};

use fprime_auth_core::AuthConfig;
use std::time::Duration;

/// Config pointed at the mock identity provider, refetch throttle disabled
#[allow(dead_code)]
pub fn test_config(idp: &MockIdentityProvider) -> AuthConfig {
    AuthConfig::new(TEST_TENANT, TEST_CLIENT_ID, "test-secret", TEST_GROUP)
        .with_authority(idp.authority())
        .with_jwks_min_refetch_interval(Duration::ZERO)
}

//! Response-body builders shared by the integration tests.

pub mod mock_provider;

pub mod actions;
pub mod assertions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::status;
#[allow(unused_imports)]
pub use mocks::{FailingMembershipRoomRepository, FailingMessageRepository};
#[allow(unused_imports)]
pub use setup::{settle, TestClient, TestSetup, TestSetupBuilder};

pub mod mocks;
pub mod server;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::{EventRecorder, FlakyStorage};
#[allow(unused_imports)]
pub use server::{StubServer, ADMIN_CREDENTIALS};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};

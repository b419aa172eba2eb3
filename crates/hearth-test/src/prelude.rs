//! Common imports for tests.

pub use crate::fixtures::*;
pub use crate::harness::{init_test_tracing, within};
pub use crate::http::MockHttpServer;
pub use crate::mocks::{ClientFrame, MockConnector, MockPeer, MockServer};

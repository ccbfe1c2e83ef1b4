// Application layer - use cases and orchestration.
// Every client (HTTP API, CLI) goes through `LedgerService`.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;

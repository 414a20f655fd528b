// Application layer - ledger operations and the typed request contract
// that transports (the CLI today) speak to.

pub mod error;
pub mod request;
pub mod service;

pub use error::*;
pub use request::*;
pub use service::*;

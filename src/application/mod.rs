// Application layer - use cases and orchestration.
// Front ends (CLI, HTTP) talk to AccountService only; it owns validation,
// per-account serialisation and the calls into the repository.

pub mod error;
mod locks;
pub mod service;

pub use error::*;
pub use locks::AccountLocks;
pub use service::*;

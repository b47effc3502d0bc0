//! layerkv - An in-process transactional key-value store
//!
//! This library provides a layered key-value store driven by a line protocol:
//! - Nested transactions with BEGIN / ROLLBACK / COMMIT
//! - First-class tombstones so deletes shadow outer layers
//! - A nom-based command tokenizer and dispatcher
//! - An async line session for stdin, files or any tokio reader

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod store;

pub use config::{OutputFormat, SessionConfig};
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{LayerKvError, Result};
pub use protocol::{Command, Output};
pub use session::{Session, SessionStats, ShutdownHandle};
pub use store::{Store, TransactionalStore};

// Application layer: the ledger store, its error taxonomy and configuration

pub mod config;
pub mod error;
pub mod store;

pub use config::*;
pub use error::*;
pub use store::*;

//! In-memory probe history.
//!
//! Each target owns a `SampleStore`; nothing is persisted.

mod models;
mod store;

pub use models::*;
pub use store::*;

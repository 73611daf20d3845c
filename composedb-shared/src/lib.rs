//! Types shared between the ComposeDB library and its command-line front end.

pub mod errors;

pub use errors::{ComposeDbError, ComposeDbResult};

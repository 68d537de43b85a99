//! Types shared between the nosboot library and its launcher.

pub mod errors;

pub use errors::{NosbootError, NosbootResult};

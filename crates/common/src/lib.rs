//! Common types shared by the BookNet client crates

mod endpoint;
mod envelope;
mod error;
mod secret;

pub use endpoint::join_url;
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use secret::Secret;

//! DID document resolution with federated discovery on a miss.
//!
//! [`ResolveHandler`] wraps a [`DocumentResolver`]. When the wrapped resolver
//! reports a short-form DID as not found, the handler asks [`Discovery`] to
//! locate it among peers, unless the DID is an unpublished one. Discovery is
//! best effort and never changes the resolution outcome.

mod error;
mod handler;

pub use error::ResolveError;
pub use handler::{Discovery, DocumentResolver, ResolutionResult, ResolveHandler};

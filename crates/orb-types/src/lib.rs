//! Shared types for the Orb anchor-observation node.
//!
//! Holds the data model exchanged between the observer, the stores, the
//! anchor graph and the HTTP surface, plus [`OrbError`], whose transient
//! classification drives message redelivery.

pub mod activity;
pub mod anchor;
pub mod error;
pub mod hashlink;
pub mod operation;
pub mod status;
pub mod transaction;

pub use activity::{Activity, ActivityKind, AnchorReference, PUBLIC_IRI};
pub use anchor::{AnchorCredential, AnchorInfo, AnchorPayload};
pub use error::OrbError;
pub use operation::{AnchoredOperation, OperationType};
pub use status::VcStatus;
pub use transaction::SidetreeTransaction;

/// Separator between the parts of a DID and of an orb suffix.
pub const DID_DELIMITER: char = ':';

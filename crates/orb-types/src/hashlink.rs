//! Hashlink parsing.
//!
//! A hashlink has the form `hl:<resource-hash>[:<metadata>]`. The resource
//! hash is the content address of the anchor credential and serves as the
//! canonical reference of the anchored transaction.

use crate::error::OrbError;

const HASHLINK_PREFIX: &str = "hl";
const SEPARATOR: char = ':';

/// Extracts the resource hash (content address) from a hashlink.
///
/// # Errors
///
/// Returns [`OrbError::Invalid`] if the value is not a hashlink or carries an
/// empty resource hash.
pub fn resource_hash(hashlink: &str) -> Result<&str, OrbError> {
    let mut parts = hashlink.split(SEPARATOR);

    if parts.next() != Some(HASHLINK_PREFIX) {
        return Err(OrbError::Invalid(format!(
            "hashlink [{hashlink}] must start with '{HASHLINK_PREFIX}{SEPARATOR}'"
        )));
    }

    match parts.next() {
        Some(hash) if !hash.is_empty() => Ok(hash),
        _ => Err(OrbError::Invalid(format!(
            "hashlink [{hashlink}] has no resource hash"
        ))),
    }
}

/// Builds a hashlink for a bare resource hash.
pub fn from_resource_hash(hash: &str) -> String {
    format!("{HASHLINK_PREFIX}{SEPARATOR}{hash}")
}

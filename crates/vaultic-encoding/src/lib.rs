//! Shared encoding primitives for the vaultic crates.
//!
//! The remote authority encodes every opaque byte value (device tokens, login
//! tokens, clone codes, key material) as unpadded base64url. [`B64Url`] is the
//! typed wrapper used across the SDK for those values.

mod b64url;
mod serde_visitor;

pub use b64url::{B64Url, NotB64UrlEncoded};
pub use serde_visitor::FromStrVisitor;

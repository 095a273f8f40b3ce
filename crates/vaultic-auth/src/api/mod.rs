//! Wire models for the login protocol.
//!
//! The serialized form stands in for the authority's opaque marshaling
//! layer; field values that are opaque bytes travel as [`B64Url`] strings.
//!
//! [`B64Url`]: vaultic_encoding::B64Url

mod enums;
pub use enums::*;
mod request;
pub use request::*;
mod response;
pub use response::*;

use std::{fmt, str::FromStr};

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::FromStrVisitor;

/// The input was not valid base64url.
#[derive(Debug, Error)]
#[error("Input is not valid base64url")]
pub struct NotB64UrlEncoded;

/// Opaque bytes carried over the wire as unpadded base64url.
///
/// The server emits both padded and unpadded variants, so decoding accepts
/// either; encoding always produces the unpadded form.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct B64Url(Vec<u8>);

impl B64Url {
    /// Borrow the decoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the wrapper, returning the decoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// True when there are no bytes behind the encoding.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for B64Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl fmt::Debug for B64Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("B64Url").field(&self.to_string()).finish()
    }
}

impl From<Vec<u8>> for B64Url {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for B64Url {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for B64Url {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for B64Url {
    type Err = NotB64UrlEncoded;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let engine = if s.ends_with('=') {
            &URL_SAFE
        } else {
            &URL_SAFE_NO_PAD
        };
        engine
            .decode(s)
            .map(Self)
            .map_err(|_| NotB64UrlEncoded)
    }
}

impl Serialize for B64Url {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for B64Url {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(FromStrVisitor::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_unpadded() {
        let value = B64Url::from(vec![0xff, 0xee, 0x01]);
        assert_eq!(value.to_string(), "_-4B");
    }

    #[test]
    fn test_decode_accepts_padded_and_unpadded() {
        let unpadded: B64Url = "_-4B".parse().unwrap();
        let padded: B64Url = "_-4B".to_string().parse().unwrap();
        assert_eq!(unpadded, padded);
        assert_eq!(unpadded.as_bytes(), &[0xff, 0xee, 0x01]);

        let with_padding: B64Url = "aGVsbG8=".parse().unwrap();
        assert_eq!(with_padding.as_bytes(), b"hello");
    }

    #[test]
    fn test_decode_rejects_standard_alphabet() {
        assert!("/+4B".parse::<B64Url>().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let value = B64Url::from(b"token".as_slice());
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"dG9rZW4\"");
        let back: B64Url = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}

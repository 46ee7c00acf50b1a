//! Fixed-size binary values that cross the trust boundary as hex strings.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A fixed-size byte array that serializes as a hex string.
///
/// Public keys, signatures, and hashes all cross the boundary in this
/// text-safe form so that structured payloads stay reproducible
/// byte-for-byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HexBytes<const N: usize>(pub [u8; N]);

impl<const N: usize> HexBytes<N> {
    pub fn encode(&self) -> String {
        hex::encode(self.0)
    }

    pub fn decode(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr = <[u8; N]>::try_from(bytes).map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl<const N: usize> From<[u8; N]> for HexBytes<N> {
    fn from(value: [u8; N]) -> Self {
        Self(value)
    }
}

impl<const N: usize> AsRef<[u8]> for HexBytes<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

macro_rules! impl_serde {
    ($n:literal) => {
        impl Serialize for HexBytes<$n> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for HexBytes<$n> {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self(
                    hex::decode(s.as_bytes())
                        .map_err(|_| Error::custom("Invalid hex"))?
                        .try_into()
                        .map_err(|_| Error::custom("Bytes were of wrong size"))?,
                ))
            }
        }
    };
}

impl_serde!(32);
impl_serde!(64);

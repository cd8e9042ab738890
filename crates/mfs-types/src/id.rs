use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Version of the addressing scheme a node id was minted under.
///
/// `V0` is the legacy scheme and can only address structured nodes. `V1`
/// addresses both structured nodes and raw leaves, so files rooted at a `V1`
/// node store newly written data as raw leaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressVersion {
    #[default]
    V0,
    V1,
}

impl AddressVersion {
    /// Numeric form used in the textual id.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::V0 => 0,
            Self::V1 => 1,
        }
    }

    /// Parse the numeric form.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::V0),
            1 => Some(Self::V1),
            _ => None,
        }
    }

    /// Returns `true` when new data under this scheme is stored as raw leaves.
    pub fn uses_raw_leaves(self) -> bool {
        self > Self::V0
    }
}

impl fmt::Display for AddressVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u8())
    }
}

/// Content address of an immutable node.
///
/// The digest is the domain-separated BLAKE3 hash of the node's canonical
/// encoding. Identical content under the same version always produces the
/// same `NodeId`; editing a node always yields a new one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    version: AddressVersion,
    digest: [u8; 32],
}

impl NodeId {
    /// Create a `NodeId` from a version and a pre-computed digest.
    pub const fn new(version: AddressVersion, digest: [u8; 32]) -> Self {
        Self { version, digest }
    }

    /// The null node id (all-zero digest). Represents "no node".
    pub const fn null() -> Self {
        Self {
            version: AddressVersion::V0,
            digest: [0u8; 32],
        }
    }

    /// Returns `true` if this is the null node id.
    pub fn is_null(&self) -> bool {
        self.digest == [0u8; 32]
    }

    /// The addressing scheme version.
    pub fn version(&self) -> AddressVersion {
        self.version
    }

    /// The raw 32-byte digest.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Hex-encoded digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Short hex representation (first 8 characters of the digest).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..4])
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}-{})", self.version, self.short_hex())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.to_hex())
    }
}

impl FromStr for NodeId {
    type Err = TypeError;

    /// Parse the `v<N>-<hex>` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (version, hex_digest) = s
            .split_once('-')
            .ok_or_else(|| TypeError::Malformed(s.to_string()))?;
        let version = version
            .strip_prefix('v')
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(AddressVersion::from_u8)
            .ok_or_else(|| TypeError::UnknownVersion(version.to_string()))?;

        let bytes = hex::decode(hex_digest).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(Self::new(version, digest))
    }
}

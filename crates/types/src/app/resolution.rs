// Path: crates/types/src/app/resolution.rs
//! Resolutions: content-addressed claims that validators vote on.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Namespace for deriving resolution ids.
const RESOLUTION_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x1f, 0x2a, 0x7e, 0x53, 0x90, 0x4c, 0x0d, 0x9e, 0x61, 0x3f, 0x88, 0x12, 0xa4, 0xd7, 0x05,
]);

/// Resolution type tag for validator join requests.
pub const VALIDATOR_JOIN_EVENT_TYPE: &str = "validator_join";
/// Resolution type tag for validator removal requests.
pub const VALIDATOR_REMOVE_EVENT_TYPE: &str = "validator_remove";
/// Resolution type tag for cross-chain deposit attestations.
pub const DEPOSIT_EVENT_TYPE: &str = "deposit";

/// The content-derived identifier of a resolution.
///
/// A UUIDv5 over `type || body`, so every node derives the same id for the
/// same event without coordination.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResolutionId(pub [u8; 16]);

impl ResolutionId {
    /// Parses a hex-encoded id.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("resolution id must be 16 bytes, got {}", b.len()))?;
        Ok(Self(arr))
    }

    /// Returns the raw id bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ResolutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ResolutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolutionId({})", hex::encode(self.0))
    }
}

impl Serialize for ResolutionId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for ResolutionId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// An event that validators vote on: a type tag plus an opaque body.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VotableEvent {
    /// The resolution type that interprets the body.
    pub event_type: String,
    /// The opaque body.
    pub body: Vec<u8>,
}

impl VotableEvent {
    /// Derives the resolution id for this event.
    pub fn id(&self) -> ResolutionId {
        let mut data = Vec::with_capacity(self.event_type.len() + self.body.len());
        data.extend_from_slice(self.event_type.as_bytes());
        data.extend_from_slice(&self.body);
        ResolutionId(*Uuid::new_v5(&RESOLUTION_NAMESPACE, &data).as_bytes())
    }
}

/// Where a stored resolution is in its lifecycle.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Votes exist for the id but no body has been submitted yet.
    PendingIdOnly,
    /// The body is known; the resolution can confirm once enough power approves.
    HasBody,
}

/// A resolution as persisted in consensus state.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct ResolutionRecord {
    /// The content-derived id.
    pub id: ResolutionId,
    /// The event, once its body has been submitted.
    pub event: Option<VotableEvent>,
    /// The height at or after which the resolution expires.
    pub expiration: u64,
    /// The identity that submitted the body, empty while id-only.
    pub proposer: Vec<u8>,
    /// Identities that approved, kept sorted and unique.
    pub voters: Vec<Vec<u8>>,
}

impl ResolutionRecord {
    /// Returns the lifecycle state of the record.
    pub fn status(&self) -> ResolutionStatus {
        if self.event.is_some() {
            ResolutionStatus::HasBody
        } else {
            ResolutionStatus::PendingIdOnly
        }
    }

    /// Records an approval. Returns false if `voter` had already approved.
    pub fn add_voter(&mut self, voter: &[u8]) -> bool {
        match self.voters.binary_search_by(|v| v.as_slice().cmp(voter)) {
            Ok(_) => false,
            Err(pos) => {
                self.voters.insert(pos, voter.to_vec());
                true
            }
        }
    }

    /// Returns the type tag, if the body is known.
    pub fn event_type(&self) -> Option<&str> {
        self.event.as_ref().map(|e| e.event_type.as_str())
    }
}

/// An event this node observed on its own, kept outside consensus state.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct LocalEvent {
    /// The observed event.
    pub event: VotableEvent,
    /// Set once this node's vote for the id has been included in a block.
    pub received: bool,
}

/// A resolution with its approving power, as returned by queries and used for
/// end-of-block processing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResolutionInfo {
    /// The content-derived id.
    pub id: ResolutionId,
    /// Lifecycle state.
    pub status: ResolutionStatus,
    /// The type tag, when known.
    pub event_type: Option<String>,
    /// The hex-encoded body, when known.
    pub body: Option<String>,
    /// The expiration height.
    pub expiration: u64,
    /// Sum of the current power of the approving voters.
    pub approved_power: u64,
    /// Hex-encoded identities of the approving voters.
    pub voters: Vec<String>,
    /// Hex-encoded body proposer, when known.
    pub proposer: Option<String>,
}

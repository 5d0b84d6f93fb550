// Path: crates/types/src/vote_extension.rs

//! The versioned binary codec for vote extensions.
//!
//! Layout:
//!
//! ```text
//! extension := version:u8 segment*
//! segment   := varint(len) blob[len]
//! blob      := version:u16be type:u32be data
//! ```
//!
//! Segment payloads such as [`DepositAttestation`] reuse the convention one level
//! down: a version byte followed by varint-length-prefixed fields. Decoding is
//! strict and never panics on adversarial input.

use crate::error::VoteExtensionError;
use prost::encoding::{decode_varint, encode_varint, encoded_len_varint};

/// The top-level extension version.
pub const VOTE_EXTENSION_VERSION: u8 = 0;
/// The version carried by every segment blob.
pub const SEGMENT_VERSION: u16 = 0;
/// Segment type for cross-chain deposit attestations.
pub const SEGMENT_TYPE_DEPOSIT: u32 = 1;
/// The version of the deposit attestation payload.
pub const DEPOSIT_ATTESTATION_VERSION: u8 = 0;

const SEGMENT_HEADER_LEN: usize = 6;

/// One typed segment of a vote extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteExtensionSegment {
    /// The segment version.
    pub version: u16,
    /// The segment type.
    pub segment_type: u32,
    /// The raw segment data.
    pub data: Vec<u8>,
}

impl VoteExtensionSegment {
    /// A current-version segment.
    pub fn new(segment_type: u32, data: Vec<u8>) -> Self {
        Self {
            version: SEGMENT_VERSION,
            segment_type,
            data,
        }
    }
}

/// Appends a length as a protobuf varint.
pub fn put_len(out: &mut Vec<u8>, len: usize) {
    encode_varint(len as u64, out);
}

/// Reads a protobuf varint length from the front of `input`, advancing it.
///
/// Only the minimal encoding of a value is accepted, so a decoded extension
/// re-encodes to the same bytes.
pub fn read_len(input: &mut &[u8], what: &'static str) -> Result<u64, VoteExtensionError> {
    if input.is_empty() {
        return Err(VoteExtensionError::Truncated(what));
    }
    let before = input.len();
    let value = decode_varint(input).map_err(|e| VoteExtensionError::InvalidVarint {
        what,
        reason: e.to_string(),
    })?;
    if before - input.len() != encoded_len_varint(value) {
        return Err(VoteExtensionError::NonCanonicalVarint(what));
    }
    Ok(value)
}

fn take<'a>(
    input: &mut &'a [u8],
    len: u64,
    what: &'static str,
) -> Result<&'a [u8], VoteExtensionError> {
    let n = usize::try_from(len)
        .ok()
        .filter(|n| *n <= input.len())
        .ok_or(VoteExtensionError::InvalidLength { what, len })?;
    let (head, tail) = input.split_at(n);
    *input = tail;
    Ok(head)
}

fn take_array<const N: usize>(
    input: &mut &[u8],
    what: &'static str,
) -> Result<[u8; N], VoteExtensionError> {
    let (head, tail) = input
        .split_first_chunk::<N>()
        .ok_or(VoteExtensionError::Truncated(what))?;
    *input = tail;
    Ok(*head)
}

fn encode_segment(seg: &VoteExtensionSegment) -> Vec<u8> {
    let mut blob = Vec::with_capacity(SEGMENT_HEADER_LEN + seg.data.len());
    blob.extend_from_slice(&seg.version.to_be_bytes());
    blob.extend_from_slice(&seg.segment_type.to_be_bytes());
    blob.extend_from_slice(&seg.data);
    blob
}

fn decode_segment(mut blob: &[u8]) -> Result<VoteExtensionSegment, VoteExtensionError> {
    if blob.len() < SEGMENT_HEADER_LEN {
        return Err(VoteExtensionError::Truncated("segment header"));
    }
    let version = u16::from_be_bytes(take_array::<2>(&mut blob, "segment version")?);
    if version != SEGMENT_VERSION {
        return Err(VoteExtensionError::VersionMismatch {
            what: "segment",
            expected: u32::from(SEGMENT_VERSION),
            got: u32::from(version),
        });
    }
    let segment_type = u32::from_be_bytes(take_array::<4>(&mut blob, "segment type")?);
    Ok(VoteExtensionSegment {
        version,
        segment_type,
        data: blob.to_vec(),
    })
}

/// Encodes segments into vote-extension bytes.
pub fn encode_vote_extension(segments: &[VoteExtensionSegment]) -> Vec<u8> {
    let mut out = vec![VOTE_EXTENSION_VERSION];
    for seg in segments {
        let blob = encode_segment(seg);
        put_len(&mut out, blob.len());
        out.extend_from_slice(&blob);
    }
    out
}

/// Decodes vote-extension bytes into segments.
pub fn decode_vote_extension(bytes: &[u8]) -> Result<Vec<VoteExtensionSegment>, VoteExtensionError> {
    let (&version, mut rest) = bytes
        .split_first()
        .ok_or(VoteExtensionError::Truncated("extension version"))?;
    if version != VOTE_EXTENSION_VERSION {
        return Err(VoteExtensionError::VersionMismatch {
            what: "vote extension",
            expected: u32::from(VOTE_EXTENSION_VERSION),
            got: u32::from(version),
        });
    }
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let len = read_len(&mut rest, "segment length")?;
        let blob = take(&mut rest, len, "segment")?;
        segments.push(decode_segment(blob)?);
    }
    Ok(segments)
}

/// An attestation that a deposit happened on another chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositAttestation {
    /// The external event id.
    pub event_id: String,
    /// The hex identity to credit.
    pub account: String,
    /// The base-10 amount to credit.
    pub amount: String,
}

impl DepositAttestation {
    /// Encodes the attestation.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![DEPOSIT_ATTESTATION_VERSION];
        for field in [&self.event_id, &self.account, &self.amount] {
            put_len(&mut out, field.len());
            out.extend_from_slice(field.as_bytes());
        }
        out
    }

    /// Decodes an attestation, rejecting trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, VoteExtensionError> {
        let (&version, mut rest) = bytes
            .split_first()
            .ok_or(VoteExtensionError::Truncated("deposit version"))?;
        if version != DEPOSIT_ATTESTATION_VERSION {
            return Err(VoteExtensionError::VersionMismatch {
                what: "deposit attestation",
                expected: u32::from(DEPOSIT_ATTESTATION_VERSION),
                got: u32::from(version),
            });
        }
        let event_id = read_string(&mut rest, "deposit event id")?;
        let account = read_string(&mut rest, "deposit account")?;
        let amount = read_string(&mut rest, "deposit amount")?;
        if !rest.is_empty() {
            return Err(VoteExtensionError::TrailingBytes(rest.len()));
        }
        Ok(Self {
            event_id,
            account,
            amount,
        })
    }

    /// Wraps the attestation in a segment.
    pub fn to_segment(&self) -> VoteExtensionSegment {
        VoteExtensionSegment::new(SEGMENT_TYPE_DEPOSIT, self.encode())
    }
}

fn read_string(input: &mut &[u8], what: &'static str) -> Result<String, VoteExtensionError> {
    let len = read_len(input, what)?;
    let raw = take(input, len, what)?;
    String::from_utf8(raw.to_vec()).map_err(|_| VoteExtensionError::InvalidUtf8(what))
}

/// A decoded segment whose type this node understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypedSegment {
    /// A deposit attestation.
    Deposit(DepositAttestation),
}

/// Decodes each segment's payload by its type.
pub fn decode_typed_segments(
    segments: &[VoteExtensionSegment],
) -> Result<Vec<TypedSegment>, VoteExtensionError> {
    segments
        .iter()
        .map(|seg| match seg.segment_type {
            SEGMENT_TYPE_DEPOSIT => DepositAttestation::decode(&seg.data).map(TypedSegment::Deposit),
            other => Err(VoteExtensionError::UnknownSegmentType(other)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn deposit(n: u32) -> DepositAttestation {
        DepositAttestation {
            event_id: format!("evt-{}", n),
            account: "0a0b0c".into(),
            amount: "1000".into(),
        }
    }

    #[test]
    fn empty_extension_is_a_single_version_byte() {
        assert_eq!(encode_vote_extension(&[]), vec![VOTE_EXTENSION_VERSION]);
        assert!(decode_vote_extension(&[VOTE_EXTENSION_VERSION]).unwrap().is_empty());
        assert_eq!(
            decode_vote_extension(&[]).unwrap_err(),
            VoteExtensionError::Truncated("extension version")
        );
    }

    #[test]
    fn known_layout() {
        let ext = encode_vote_extension(&[VoteExtensionSegment::new(7, vec![0xaa])]);
        assert_eq!(ext, vec![0, 7, 0, 0, 0, 0, 0, 7, 0xaa]);
    }

    #[test]
    fn version_mismatches_are_rejected() {
        let mut ext = encode_vote_extension(&[deposit(1).to_segment()]);
        ext[0] = 1;
        assert!(matches!(
            decode_vote_extension(&ext),
            Err(VoteExtensionError::VersionMismatch { what: "vote extension", .. })
        ));

        let bad_seg = VoteExtensionSegment {
            version: 9,
            segment_type: SEGMENT_TYPE_DEPOSIT,
            data: vec![],
        };
        assert!(matches!(
            decode_vote_extension(&encode_vote_extension(&[bad_seg])),
            Err(VoteExtensionError::VersionMismatch { what: "segment", got: 9, .. })
        ));

        let mut body = deposit(1).encode();
        body[0] = 3;
        assert!(matches!(
            DepositAttestation::decode(&body),
            Err(VoteExtensionError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn oversized_and_overflowing_lengths_are_rejected() {
        // Declared segment length beyond the input.
        assert!(matches!(
            decode_vote_extension(&[0, 50, 0, 0]),
            Err(VoteExtensionError::InvalidLength { len: 50, .. })
        ));
        // Eleven continuation bytes overflow a u64.
        let mut ext = vec![0u8];
        ext.extend(std::iter::repeat(0xff).take(11));
        assert!(matches!(
            decode_vote_extension(&ext),
            Err(VoteExtensionError::InvalidVarint { what: "segment length", .. })
        ));
        // A length prefix cut off mid-varint.
        assert!(matches!(
            decode_vote_extension(&[0, 0x80]),
            Err(VoteExtensionError::InvalidVarint { .. })
        ));
        // Segment shorter than its header.
        assert_eq!(
            decode_vote_extension(&[0, 2, 0, 0]).unwrap_err(),
            VoteExtensionError::Truncated("segment header")
        );
    }

    #[test]
    fn padded_varints_are_rejected() {
        // 0x80 0x00 is a two-byte spelling of zero.
        assert_eq!(
            decode_vote_extension(&[0, 0x80, 0x00]).unwrap_err(),
            VoteExtensionError::NonCanonicalVarint("segment length")
        );
        let mut body = vec![DEPOSIT_ATTESTATION_VERSION, 0x81, 0x00, b'e'];
        body.extend_from_slice(&[0, 0]);
        assert_eq!(
            DepositAttestation::decode(&body).unwrap_err(),
            VoteExtensionError::NonCanonicalVarint("deposit event id")
        );
    }

    #[test]
    fn deposit_trailing_bytes_and_unknown_types_are_rejected() {
        let mut body = deposit(2).encode();
        body.push(0);
        assert_eq!(
            DepositAttestation::decode(&body).unwrap_err(),
            VoteExtensionError::TrailingBytes(1)
        );
        let unknown = VoteExtensionSegment::new(99, vec![]);
        assert_eq!(
            decode_typed_segments(&[unknown]).unwrap_err(),
            VoteExtensionError::UnknownSegmentType(99)
        );
    }

    #[test]
    fn typed_deposits_roundtrip() {
        let deposits = vec![deposit(1), deposit(2)];
        let segs: Vec<_> = deposits.iter().map(DepositAttestation::to_segment).collect();
        let decoded = decode_vote_extension(&encode_vote_extension(&segs)).unwrap();
        assert_eq!(
            decode_typed_segments(&decoded).unwrap(),
            deposits.into_iter().map(TypedSegment::Deposit).collect::<Vec<_>>()
        );
    }

    fn arb_segment() -> impl Strategy<Value = VoteExtensionSegment> {
        (any::<u32>(), proptest::collection::vec(any::<u8>(), 0..300))
            .prop_map(|(t, data)| VoteExtensionSegment::new(t, data))
    }

    proptest! {
        #[test]
        fn segments_roundtrip(segs in proptest::collection::vec(arb_segment(), 0..8)) {
            let bytes = encode_vote_extension(&segs);
            prop_assert_eq!(decode_vote_extension(&bytes).unwrap(), segs);
        }

        #[test]
        fn whatever_decodes_reencodes_identically(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            if let Ok(segs) = decode_vote_extension(&bytes) {
                prop_assert_eq!(encode_vote_extension(&segs), bytes);
            }
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = decode_vote_extension(&bytes);
            let _ = DepositAttestation::decode(&bytes);
        }

        #[test]
        fn truncation_inside_a_segment_is_an_error(
            segs in proptest::collection::vec(arb_segment(), 1..5),
            cut in any::<prop::sample::Index>(),
        ) {
            let bytes = encode_vote_extension(&segs);
            // Offsets where a complete prefix of segments ends.
            let mut boundaries = vec![1usize];
            let mut pos = 1usize;
            for seg in &segs {
                let blob_len = SEGMENT_HEADER_LEN + seg.data.len();
                pos += encoded_len_varint(blob_len as u64) + blob_len;
                boundaries.push(pos);
            }
            let at = 1 + cut.index(bytes.len() - 1);
            prop_assume!(!boundaries.contains(&at));
            prop_assert!(decode_vote_extension(&bytes[..at]).is_err());
        }
    }
}

// Path: crates/types/src/app/transaction.rs
//! The signed transaction envelope and its consensus-critical wire format.

use crate::app::payloads::{Payload, PayloadKind};
use crate::error::{CodecError, TransactionError};
use parity_scale_codec::{Decode, DecodeAll, Encode};
use serde::{Deserialize, Serialize};

/// Codec-type tag for the SCALE encoding of a transaction.
pub const CODEC_SCALE: u16 = 0;
/// The maximum number of characters in a transaction description.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// A signature together with the tag naming the scheme that produced it.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TxSignature {
    /// The raw signature bytes.
    pub signature: Vec<u8>,
    /// The signature-type tag used to select an authenticator.
    pub sig_type: String,
}

/// The signed portion of a transaction.
///
/// Field order is part of the signing digest and must not change without a
/// new codec-type tag.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionBody {
    /// A free-form description, at most [`MAX_DESCRIPTION_LEN`] characters.
    pub description: String,
    /// The encoded payload.
    pub payload: Vec<u8>,
    /// The payload-type tag selecting a route.
    pub payload_type: String,
    /// The declared fee.
    pub fee: u128,
    /// The sender's nonce for this transaction.
    pub nonce: u64,
    /// The chain this transaction is bound to. Empty means unbound.
    pub chain_id: String,
}

impl TransactionBody {
    /// Returns the canonical bytes that are signed.
    pub fn signing_bytes(&self) -> Vec<u8> {
        self.encode()
    }

    /// Resolves the payload-type tag, if it names a known payload.
    pub fn payload_kind(&self) -> Option<PayloadKind> {
        PayloadKind::parse(&self.payload_type)
    }
}

/// A transaction as carried on the wire and stored in blocks.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// The signature over [`TransactionBody::signing_bytes`].
    pub signature: TxSignature,
    /// The signed body.
    pub body: TransactionBody,
    /// The sender's identity (public key bytes for ed25519).
    pub sender: Vec<u8>,
}

impl Transaction {
    /// Builds an unsigned transaction carrying `payload`.
    pub fn new_unsigned<P: Payload>(
        payload: &P,
        fee: u128,
        nonce: u64,
        chain_id: impl Into<String>,
    ) -> Self {
        Self {
            signature: TxSignature::default(),
            body: TransactionBody {
                description: String::new(),
                payload: payload.encode(),
                payload_type: P::KIND.as_str().to_string(),
                fee,
                nonce,
                chain_id: chain_id.into(),
            },
            sender: Vec::new(),
        }
    }

    /// Returns true once a signature and sender have been attached.
    pub fn is_signed(&self) -> bool {
        !self.signature.signature.is_empty() && !self.sender.is_empty()
    }

    /// Decodes the payload as `P`, checking the payload-type tag first.
    pub fn decode_payload<P: Payload>(&self) -> Result<P, TransactionError> {
        if self.body.payload_type != P::KIND.as_str() {
            return Err(TransactionError::PayloadDecode(format!(
                "payload type '{}' is not '{}'",
                self.body.payload_type,
                P::KIND.as_str()
            )));
        }
        P::decode_all(&mut self.body.payload.as_slice())
            .map_err(|e| TransactionError::PayloadDecode(e.to_string()))
    }

    /// Encodes the transaction into its wire format: a big-endian codec-type
    /// prefix followed by the SCALE encoding of the envelope.
    pub fn to_wire(&self) -> Result<Vec<u8>, CodecError> {
        check_description(&self.body.description)?;
        let mut out = Vec::with_capacity(2 + self.size_hint());
        out.extend_from_slice(&CODEC_SCALE.to_be_bytes());
        self.encode_to(&mut out);
        Ok(out)
    }

    /// Decodes a transaction from its wire format.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, CodecError> {
        let (prefix, rest) = bytes
            .split_first_chunk::<2>()
            .ok_or(CodecError::TooShort(bytes.len()))?;
        let codec = u16::from_be_bytes(*prefix);
        if codec != CODEC_SCALE {
            return Err(CodecError::UnknownCodec(codec));
        }
        let tx = Self::decode_all(&mut &*rest).map_err(|e| CodecError::Decode(e.to_string()))?;
        check_description(&tx.body.description)?;
        Ok(tx)
    }
}

fn check_description(description: &str) -> Result<(), CodecError> {
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(CodecError::DescriptionTooLong {
            len,
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::payloads::{Transfer, ValidatorJoin};

    fn sample() -> Transaction {
        let mut tx = Transaction::new_unsigned(
            &Transfer {
                to: vec![9; 32],
                amount: "100".into(),
            },
            210_000,
            4,
            "strata-test",
        );
        tx.signature = TxSignature {
            signature: vec![1; 64],
            sig_type: "ed25519".into(),
        };
        tx.sender = vec![7; 32];
        tx
    }

    #[test]
    fn wire_format_has_big_endian_codec_prefix() {
        let bytes = sample().to_wire().unwrap();
        assert_eq!(&bytes[..2], &[0, 0]);
        assert_eq!(Transaction::from_wire(&bytes).unwrap(), sample());
    }

    #[test]
    fn unknown_codec_and_short_input_are_rejected() {
        let mut bytes = sample().to_wire().unwrap();
        bytes[1] = 3;
        assert_eq!(
            Transaction::from_wire(&bytes).unwrap_err(),
            CodecError::UnknownCodec(3)
        );
        assert_eq!(
            Transaction::from_wire(&[0]).unwrap_err(),
            CodecError::TooShort(1)
        );
        assert!(matches!(
            Transaction::from_wire(&[0, 0, 1, 2]).unwrap_err(),
            CodecError::Decode(_)
        ));
    }

    #[test]
    fn long_description_is_rejected_both_ways() {
        let mut tx = sample();
        tx.body.description = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(matches!(
            tx.to_wire(),
            Err(CodecError::DescriptionTooLong { .. })
        ));

        let mut raw = CODEC_SCALE.to_be_bytes().to_vec();
        tx.encode_to(&mut raw);
        assert!(matches!(
            Transaction::from_wire(&raw),
            Err(CodecError::DescriptionTooLong { .. })
        ));

        tx.body.description = "é".repeat(MAX_DESCRIPTION_LEN);
        assert!(tx.to_wire().is_ok());
    }

    #[test]
    fn signing_bytes_exclude_signature_and_sender() {
        let a = sample();
        let mut b = sample();
        b.signature.signature = vec![2; 64];
        b.sender = vec![8; 32];
        assert_eq!(a.body.signing_bytes(), b.body.signing_bytes());
        b.body.chain_id = "other".into();
        assert_ne!(a.body.signing_bytes(), b.body.signing_bytes());
    }

    #[test]
    fn payload_decoding_checks_the_type_tag() {
        let tx = sample();
        assert_eq!(tx.decode_payload::<Transfer>().unwrap().amount, "100");
        assert!(matches!(
            tx.decode_payload::<ValidatorJoin>(),
            Err(TransactionError::PayloadDecode(_))
        ));
    }
}

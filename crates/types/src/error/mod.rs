// Path: crates/types/src/error/mod.rs
//! Core error types for the Strata node.

use std::fmt;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// The consensus-visible result code of a transaction.
///
/// These values cross the consensus-engine boundary and are part of every
/// node's agreed-upon output, so the discriminants must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum TxCode {
    /// The transaction succeeded.
    Ok = 0,
    /// The transaction bytes or its payload could not be decoded.
    EncodingError = 1,
    /// The payload type is not registered.
    InvalidTxType = 2,
    /// The signature did not verify, or no authenticator handles its type.
    InvalidSignature = 3,
    /// The nonce is not exactly one past the account nonce.
    InvalidNonce = 4,
    /// The transaction targets a different chain.
    WrongChain = 5,
    /// The sender cannot pay the required amount.
    InsufficientBalance = 6,
    /// The declared fee is below the route's price.
    InsufficientFee = 7,
    /// A transfer amount is malformed, negative, or overflows.
    InvalidAmount = 8,
    /// The sender is not allowed to submit this transaction.
    InvalidSender = 9,
    /// Catch-all for collaborator and internal failures.
    UnknownError = 65535,
}

impl TxCode {
    /// Returns the numeric value reported to the consensus engine.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Parses a numeric code back into a `TxCode`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Ok,
            1 => Self::EncodingError,
            2 => Self::InvalidTxType,
            3 => Self::InvalidSignature,
            4 => Self::InvalidNonce,
            5 => Self::WrongChain,
            6 => Self::InsufficientBalance,
            7 => Self::InsufficientFee,
            8 => Self::InvalidAmount,
            9 => Self::InvalidSender,
            65535 => Self::UnknownError,
            _ => return None,
        })
    }

    /// Returns true for [`TxCode::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// A short snake_case label for logs and metric labels.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::EncodingError => "encoding_error",
            Self::InvalidTxType => "invalid_tx_type",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidNonce => "invalid_nonce",
            Self::WrongChain => "wrong_chain",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InsufficientFee => "insufficient_fee",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidSender => "invalid_sender",
            Self::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for TxCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::EncodingError => "encoding error",
            Self::InvalidTxType => "invalid transaction type",
            Self::InvalidSignature => "invalid signature",
            Self::InvalidNonce => "invalid nonce",
            Self::WrongChain => "wrong chain",
            Self::InsufficientBalance => "insufficient balance",
            Self::InsufficientFee => "insufficient fee",
            Self::InvalidAmount => "invalid amount",
            Self::InvalidSender => "invalid sender",
            Self::UnknownError => "unknown error",
        };
        f.write_str(s)
    }
}

/// Errors related to the state backend or a state overlay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The requested key was not found in the state.
    #[error("Key not found in state")]
    KeyNotFound,
    /// An error occurred in the state backend.
    #[error("State backend error: {0}")]
    Backend(String),
    /// An error occurred while writing to the state.
    #[error("State write error: {0}")]
    WriteError(String),
    /// The provided value was invalid.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// An error occurred during state deserialization.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "STATE_KEY_NOT_FOUND",
            Self::Backend(_) => "STATE_BACKEND_ERROR",
            Self::WriteError(_) => "STATE_WRITE_ERROR",
            Self::InvalidValue(_) => "STATE_INVALID_VALUE",
            Self::Decode(_) => "STATE_DECODE_ERROR",
        }
    }
}

/// Errors from the transaction wire codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input was shorter than the codec-type prefix.
    #[error("Transaction bytes too short: {0} bytes")]
    TooShort(usize),
    /// The codec-type prefix is not one this node understands.
    #[error("Unknown transaction codec type: {0}")]
    UnknownCodec(u16),
    /// The body was not a valid encoding.
    #[error("Decode failed: {0}")]
    Decode(String),
    /// The description exceeds the allowed length.
    #[error("Description too long: {len} > {max}")]
    DescriptionTooLong {
        /// The actual length in characters.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },
}

impl ErrorCode for CodecError {
    fn code(&self) -> &'static str {
        match self {
            Self::TooShort(_) => "CODEC_TOO_SHORT",
            Self::UnknownCodec(_) => "CODEC_UNKNOWN_TYPE",
            Self::Decode(_) => "CODEC_DECODE_FAILED",
            Self::DescriptionTooLong { .. } => "CODEC_DESCRIPTION_TOO_LONG",
        }
    }
}

/// Errors from the account ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The account does not exist (it has never held a balance).
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    /// The account cannot cover the requested amount.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// The amount that was requested.
        required: u128,
        /// The balance that was available.
        available: u128,
    },
    /// A credit would overflow the balance representation.
    #[error("Balance overflow")]
    Overflow,
    /// A spend's nonce is not exactly one past the account nonce.
    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce {
        /// The nonce that was expected.
        expected: u64,
        /// The nonce that was provided.
        got: u64,
    },
    /// An underlying state error.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl ErrorCode for LedgerError {
    fn code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "LEDGER_ACCOUNT_NOT_FOUND",
            Self::InsufficientFunds { .. } => "LEDGER_INSUFFICIENT_FUNDS",
            Self::Overflow => "LEDGER_OVERFLOW",
            Self::InvalidNonce { .. } => "LEDGER_INVALID_NONCE",
            Self::State(_) => "LEDGER_STATE_ERROR",
        }
    }
}

/// Errors from the resolution (voting) store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingError {
    /// No resolution exists for the id.
    #[error("Resolution not found: {0}")]
    ResolutionNotFound(String),
    /// A body was submitted for a resolution that already has one.
    #[error("Resolution already has a body: {0}")]
    AlreadyHasBody(String),
    /// The resolution type is not registered.
    #[error("Unknown resolution type: {0}")]
    UnknownResolutionType(String),
    /// A resolution body could not be interpreted by its type.
    #[error("Invalid resolution body: {0}")]
    InvalidBody(String),
    /// Applying a confirmed resolution failed.
    #[error("Resolve failed: {0}")]
    Resolve(String),
    /// An underlying state error.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl ErrorCode for VotingError {
    fn code(&self) -> &'static str {
        match self {
            Self::ResolutionNotFound(_) => "VOTING_RESOLUTION_NOT_FOUND",
            Self::AlreadyHasBody(_) => "VOTING_ALREADY_HAS_BODY",
            Self::UnknownResolutionType(_) => "VOTING_UNKNOWN_TYPE",
            Self::InvalidBody(_) => "VOTING_INVALID_BODY",
            Self::Resolve(_) => "VOTING_RESOLVE_FAILED",
            Self::State(_) => "VOTING_STATE_ERROR",
        }
    }
}

/// Errors from the authenticator registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authenticator is registered for the signature type.
    #[error("Authenticator not found for signature type '{0}'")]
    AuthenticatorNotFound(String),
    /// The sender bytes are not a valid identity for the authenticator.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),
    /// The signature bytes are malformed.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    /// The signature did not verify.
    #[error("Signature verification failed")]
    VerificationFailed,
}

impl ErrorCode for AuthError {
    fn code(&self) -> &'static str {
        match self {
            Self::AuthenticatorNotFound(_) => "AUTH_AUTHENTICATOR_NOT_FOUND",
            Self::InvalidIdentity(_) => "AUTH_INVALID_IDENTITY",
            Self::MalformedSignature(_) => "AUTH_MALFORMED_SIGNATURE",
            Self::VerificationFailed => "AUTH_VERIFICATION_FAILED",
        }
    }
}

/// Errors reported by the database engine collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A dataset with the same id already exists.
    #[error("Dataset already exists: {0}")]
    DatasetExists(String),
    /// The dataset does not exist.
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),
    /// The caller is not permitted to perform the operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The procedure failed.
    #[error("Execution failed: {0}")]
    Execution(String),
    /// An underlying state error.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::DatasetExists(_) => "ENGINE_DATASET_EXISTS",
            Self::DatasetNotFound(_) => "ENGINE_DATASET_NOT_FOUND",
            Self::Unauthorized(_) => "ENGINE_UNAUTHORIZED",
            Self::Execution(_) => "ENGINE_EXECUTION_FAILED",
            Self::State(_) => "ENGINE_STATE_ERROR",
        }
    }
}

/// Errors for a single transaction, during admission or execution.
///
/// Every variant maps onto exactly one [`TxCode`] via [`TransactionError::tx_code`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// The transaction or its payload could not be decoded.
    #[error("Encoding error: {0}")]
    Codec(#[from] CodecError),
    /// The payload bytes could not be decoded for the payload type.
    #[error("Payload decode error: {0}")]
    PayloadDecode(String),
    /// The payload type is not registered.
    #[error("Unknown payload type: {0}")]
    UnknownPayloadType(String),
    /// Authentication failed.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    /// The chain id does not match this chain.
    #[error("Wrong chain: expected '{expected}', got '{got}'")]
    WrongChain {
        /// This node's chain id.
        expected: String,
        /// The chain id in the transaction.
        got: String,
    },
    /// The nonce is not the next expected nonce.
    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce {
        /// The nonce that was expected.
        expected: u64,
        /// The nonce that was provided.
        got: u64,
    },
    /// The declared fee is lower than the price.
    #[error("Insufficient fee: price {price}, offered {offered}")]
    InsufficientFee {
        /// The route's price.
        price: u128,
        /// The fee declared on the transaction.
        offered: u128,
    },
    /// The sender cannot pay.
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    /// The sender has neither balance nor nonce while fees are enabled.
    #[error("Account is unfunded")]
    UnfundedAccount,
    /// A transfer amount is malformed or negative.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// The sender is not allowed to submit this transaction.
    #[error("Invalid sender: {0}")]
    InvalidSender(String),
    /// A ledger error.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// A voting store error.
    #[error("Voting error: {0}")]
    Voting(#[from] VotingError),
    /// A database engine error.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// A state error.
    #[error("State error: {0}")]
    State(#[from] StateError),
    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactionError {
    /// Maps the error onto the consensus-visible result code.
    pub fn tx_code(&self) -> TxCode {
        match self {
            Self::Codec(_) | Self::PayloadDecode(_) => TxCode::EncodingError,
            Self::UnknownPayloadType(_) => TxCode::InvalidTxType,
            Self::Auth(_) => TxCode::InvalidSignature,
            Self::WrongChain { .. } => TxCode::WrongChain,
            Self::InvalidNonce { .. } => TxCode::InvalidNonce,
            Self::InsufficientFee { .. } => TxCode::InsufficientFee,
            Self::InsufficientBalance(_) | Self::UnfundedAccount => TxCode::InsufficientBalance,
            Self::InvalidAmount(_) => TxCode::InvalidAmount,
            Self::InvalidSender(_) => TxCode::InvalidSender,
            Self::Ledger(LedgerError::InsufficientFunds { .. })
            | Self::Ledger(LedgerError::AccountNotFound(_)) => TxCode::InsufficientBalance,
            Self::Ledger(LedgerError::Overflow) => TxCode::InvalidAmount,
            Self::Ledger(LedgerError::InvalidNonce { .. }) => TxCode::InvalidNonce,
            Self::Ledger(LedgerError::State(_))
            | Self::Voting(_)
            | Self::Engine(_)
            | Self::State(_)
            | Self::Internal(_) => TxCode::UnknownError,
        }
    }
}

impl ErrorCode for TransactionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Codec(_) => "TX_CODEC_ERROR",
            Self::PayloadDecode(_) => "TX_PAYLOAD_DECODE",
            Self::UnknownPayloadType(_) => "TX_UNKNOWN_PAYLOAD_TYPE",
            Self::Auth(_) => "TX_AUTH_FAILED",
            Self::WrongChain { .. } => "TX_WRONG_CHAIN",
            Self::InvalidNonce { .. } => "TX_INVALID_NONCE",
            Self::InsufficientFee { .. } => "TX_INSUFFICIENT_FEE",
            Self::InsufficientBalance(_) => "TX_INSUFFICIENT_BALANCE",
            Self::UnfundedAccount => "TX_UNFUNDED_ACCOUNT",
            Self::InvalidAmount(_) => "TX_INVALID_AMOUNT",
            Self::InvalidSender(_) => "TX_INVALID_SENDER",
            Self::Ledger(_) => "TX_LEDGER_ERROR",
            Self::Voting(_) => "TX_VOTING_ERROR",
            Self::Engine(_) => "TX_ENGINE_ERROR",
            Self::State(_) => "TX_STATE_ERROR",
            Self::Internal(_) => "TX_INTERNAL_ERROR",
        }
    }
}

/// Errors from the vote-extension codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoteExtensionError {
    /// A version byte or field did not match the supported version.
    #[error("Unsupported {what} version: expected {expected}, got {got}")]
    VersionMismatch {
        /// Which layer carried the version.
        what: &'static str,
        /// The supported version.
        expected: u32,
        /// The version found in the input.
        got: u32,
    },
    /// The input ended before a complete field was read.
    #[error("Truncated input while reading {0}")]
    Truncated(&'static str),
    /// A declared length is malformed or exceeds the remaining input.
    #[error("Invalid length {len} while reading {what}")]
    InvalidLength {
        /// Which field carried the length.
        what: &'static str,
        /// The declared length.
        len: u64,
    },
    /// A length prefix is not a valid varint.
    #[error("Invalid varint while reading {what}: {reason}")]
    InvalidVarint {
        /// Which field carried the varint.
        what: &'static str,
        /// The decoder's message.
        reason: String,
    },
    /// A varint used more bytes than its value needs.
    #[error("Non-canonical varint while reading {0}")]
    NonCanonicalVarint(&'static str),
    /// Input remained after a complete value was decoded.
    #[error("{0} trailing bytes after decode")]
    TrailingBytes(usize),
    /// A string field was not valid UTF-8.
    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
    /// The segment type is not known to this node.
    #[error("Unknown segment type {0}")]
    UnknownSegmentType(u32),
}

impl ErrorCode for VoteExtensionError {
    fn code(&self) -> &'static str {
        match self {
            Self::VersionMismatch { .. } => "VOTE_EXT_VERSION_MISMATCH",
            Self::Truncated(_) => "VOTE_EXT_TRUNCATED",
            Self::InvalidLength { .. } => "VOTE_EXT_INVALID_LENGTH",
            Self::InvalidVarint { .. } => "VOTE_EXT_INVALID_VARINT",
            Self::NonCanonicalVarint(_) => "VOTE_EXT_NON_CANONICAL_VARINT",
            Self::TrailingBytes(_) => "VOTE_EXT_TRAILING_BYTES",
            Self::InvalidUtf8(_) => "VOTE_EXT_INVALID_UTF8",
            Self::UnknownSegmentType(_) => "VOTE_EXT_UNKNOWN_SEGMENT",
        }
    }
}

/// Errors from the snapshot store and state sync.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// No snapshot exists for the height and format.
    #[error("Snapshot not found at height {height} (format {format})")]
    NotFound {
        /// The requested height.
        height: u64,
        /// The requested format.
        format: u32,
    },
    /// The snapshot format is not supported.
    #[error("Unsupported snapshot format {0}")]
    UnsupportedFormat(u32),
    /// A chunk index is outside the snapshot.
    #[error("Chunk {index} out of range (snapshot has {count})")]
    ChunkOutOfRange {
        /// The requested index.
        index: u32,
        /// The number of chunks.
        count: u32,
    },
    /// A chunk arrived out of order.
    #[error("Out of order chunk: expected {expected}, got {got}")]
    OutOfOrderChunk {
        /// The next expected index.
        expected: u32,
        /// The received index.
        got: u32,
    },
    /// A chunk's hash does not match the manifest.
    #[error("Chunk {0} hash mismatch")]
    ChunkHashMismatch(u32),
    /// The snapshot metadata is malformed.
    #[error("Invalid snapshot metadata: {0}")]
    InvalidMetadata(String),
    /// No restore is in progress.
    #[error("No snapshot restore in progress")]
    NoRestoreInProgress,
    /// The underlying key-value store failed.
    #[error("Storage error: {0}")]
    Storage(String),
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A manifest or chunk could not be (de)serialized.
    #[error("Codec error: {0}")]
    Codec(String),
}

impl ErrorCode for SnapshotError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "SNAPSHOT_NOT_FOUND",
            Self::UnsupportedFormat(_) => "SNAPSHOT_UNSUPPORTED_FORMAT",
            Self::ChunkOutOfRange { .. } => "SNAPSHOT_CHUNK_OUT_OF_RANGE",
            Self::OutOfOrderChunk { .. } => "SNAPSHOT_OUT_OF_ORDER_CHUNK",
            Self::ChunkHashMismatch(_) => "SNAPSHOT_CHUNK_HASH_MISMATCH",
            Self::InvalidMetadata(_) => "SNAPSHOT_INVALID_METADATA",
            Self::NoRestoreInProgress => "SNAPSHOT_NO_RESTORE",
            Self::Storage(_) => "SNAPSHOT_STORAGE_ERROR",
            Self::Io(_) => "SNAPSHOT_IO_ERROR",
            Self::Codec(_) => "SNAPSHOT_CODEC_ERROR",
        }
    }
}

/// Fatal errors of the consensus application.
///
/// Anything surfaced as an `AppError` halts block processing; per-transaction
/// failures are reported as [`TxCode`]s instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// A state error during block execution or commit.
    #[error("State error: {0}")]
    State(#[from] StateError),
    /// The durable store failed.
    #[error("Storage error: {0}")]
    Storage(String),
    /// A voting store error outside per-transaction handling.
    #[error("Voting error: {0}")]
    Voting(#[from] VotingError),
    /// A ledger error outside per-transaction handling.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// A snapshot error.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    /// A consensus callback arrived in an unexpected order.
    #[error("Callback misuse: {0}")]
    Misuse(String),
    /// Block execution was cancelled before completion.
    #[error("Block execution cancelled")]
    Cancelled,
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A consensus record could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),
    /// A catch-all internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorCode for AppError {
    fn code(&self) -> &'static str {
        match self {
            Self::State(_) => "APP_STATE_ERROR",
            Self::Storage(_) => "APP_STORAGE_ERROR",
            Self::Voting(_) => "APP_VOTING_ERROR",
            Self::Ledger(_) => "APP_LEDGER_ERROR",
            Self::Snapshot(_) => "APP_SNAPSHOT_ERROR",
            Self::Misuse(_) => "APP_CALLBACK_MISUSE",
            Self::Cancelled => "APP_CANCELLED",
            Self::Config(_) => "APP_CONFIG_ERROR",
            Self::Codec(_) => "APP_CODEC_ERROR",
            Self::Internal(_) => "APP_INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_codes_are_stable() {
        assert_eq!(TxCode::Ok.as_u32(), 0);
        assert_eq!(TxCode::InvalidSender.as_u32(), 9);
        assert_eq!(TxCode::UnknownError.as_u32(), 65535);
        for v in [0u32, 1, 2, 3, 4, 5, 6, 7, 8, 9, 65535] {
            assert_eq!(TxCode::from_u32(v).map(TxCode::as_u32), Some(v));
        }
        assert_eq!(TxCode::from_u32(10), None);
    }

    #[test]
    fn transaction_errors_map_to_codes() {
        let insufficient = TransactionError::Ledger(LedgerError::InsufficientFunds {
            required: 10,
            available: 1,
        });
        assert_eq!(insufficient.tx_code(), TxCode::InsufficientBalance);
        assert_eq!(
            TransactionError::from(AuthError::AuthenticatorNotFound("x".into())).tx_code(),
            TxCode::InvalidSignature
        );
        assert_eq!(
            TransactionError::from(CodecError::UnknownCodec(7)).tx_code(),
            TxCode::EncodingError
        );
        assert_eq!(
            TransactionError::from(EngineError::Execution("boom".into())).tx_code(),
            TxCode::UnknownError
        );
        assert_eq!(TransactionError::UnfundedAccount.tx_code(), TxCode::InsufficientBalance);
    }

    #[test]
    fn error_codes_are_machine_readable() {
        assert_eq!(StateError::KeyNotFound.code(), "STATE_KEY_NOT_FOUND");
        assert_eq!(
            VoteExtensionError::Truncated("segment").code(),
            "VOTE_EXT_TRUNCATED"
        );
        assert_eq!(AppError::Cancelled.code(), "APP_CANCELLED");
    }
}

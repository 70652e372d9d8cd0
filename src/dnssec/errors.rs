use crate::dns::WireError;
use thiserror::Error;

/// Why a proof failed to verify.
///
/// The first unrecoverable problem on the required chain is reported; the
/// engine never degrades to a partial answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProofError {
    /// The record stream ended mid-field.
    #[error("proof stream is truncated")]
    Truncated,
    /// The record stream is structurally invalid (bad lengths, bad
    /// compression pointers, bad labels).
    #[error("proof stream is malformed")]
    MalformedWire,
    /// A signature or digest on the required chain uses an algorithm this
    /// verifier does not implement. Fails closed.
    #[error("unsupported DNSSEC algorithm or digest type {0}")]
    UnsupportedAlgorithm(u8),
    /// A signature did not verify against the matching key.
    #[error("signature verification failed")]
    SignatureInvalid,
    /// Every candidate signature expired before the resolution time.
    #[error("signature has expired")]
    SignatureExpired,
    /// Every candidate signature's inception is after the resolution time.
    #[error("signature is not yet valid")]
    SignatureNotYetValid,
    /// No DNSKEY matched a covering RRSIG's key tag and algorithm.
    #[error("no DNSKEY matches the signature's key tag and algorithm")]
    NoMatchingKey,
    /// A DS/DNSKEY link in the delegation chain could not be established.
    #[error("chain of trust could not be established")]
    ChainBroken,
    /// The chain reaches an authenticated but unsigned delegation and policy
    /// does not accept insecure subtrees.
    #[error("delegation to an unsigned zone")]
    UnsignedZone,
    /// The NSEC/NSEC3 records present do not prove the query's non-existence.
    #[error("denial-of-existence proof does not cover the query")]
    DenialProofInvalid,
    /// The proof required more chain steps than the verifier permits.
    #[error("proof exceeds the maximum number of chain steps")]
    ProofTooLong,
}

impl From<WireError> for ProofError {
    fn from(e: WireError) -> ProofError {
        match e {
            WireError::Truncated => ProofError::Truncated,
            _ => ProofError::MalformedWire,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProofError>;

//! Offline verification of DNSSEC chain-of-trust proofs.
//!
//! A proof is a self-contained stream of wire-format resource records, in
//! the RFC 9102 `AuthenticationChain` layout: everything needed to walk from
//! a root trust anchor through each zone's DNSKEY/DS links down to the
//! records a query is about. Given such a stream, a set of trust anchors and
//! a resolution time, [`ProofVerifier`] either returns the cryptographically
//! verified records with their validity window or says precisely why the
//! chain does not hold. No network access is ever performed; verification is
//! deterministic in its inputs.

pub mod dns;
pub mod dnssec;

pub use dns::enums::{RecordClass, RecordType};
pub use dns::name::Name;
pub use dns::resource::{RData, Record};
pub use dns::{WireError, parse_rr_stream, write_rr};
pub use dnssec::{
    Answer, DenialKind, ProofError, ProofVerifier, TrustAnchor, TrustAnchorSet, VerifiedRRStream,
    VerifierPolicy,
};

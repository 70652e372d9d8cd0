//! The proof verification engine: replays the delegation chain embedded in a
//! record stream from a trust anchor down to the queried name and type.

use tracing::{debug, trace, warn};

use crate::dns::enums::RecordType;
use crate::dns::name::Name;
use crate::dns::parse_rr_stream;
use crate::dns::resource::{DnsKey, Ds, Nsec, Nsec3, RData, Record, Rrsig};

use super::canonical;
use super::constants::{DNSSEC_PROTOCOL, MAX_NSEC3_ITERATIONS};
use super::crypto::{self, DigestType, SignatureError};
use super::denial::{self, DenialKind, Nsec3Denial};
use super::errors::{ProofError, Result};
use super::trust_anchor::{TrustAnchor, TrustAnchorSet};
use super::MAX_PROOF_STEPS;

/// Caller-controlled policy knobs. The defaults are the strict settings.
#[derive(Debug, Clone)]
pub struct VerifierPolicy {
    /// Accept chains that end at an authenticated unsigned delegation,
    /// classifying the result as [`Answer::InsecureDelegation`] instead of
    /// failing with [`ProofError::UnsignedZone`].
    pub allow_unsigned_delegation: bool,
    /// NSEC3 records with more iterations than this are ignored, bounding
    /// the hashing work an adversarial proof can demand.
    pub max_nsec3_iterations: u16,
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        VerifierPolicy {
            allow_unsigned_delegation: false,
            max_nsec3_iterations: MAX_NSEC3_ITERATIONS,
        }
    }
}

/// How the verified proof answers the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Records of the queried type exist at the queried name.
    Positive,
    /// The queried name was redirected (CNAME/DNAME) and records of the
    /// queried type were proven at the final target.
    Redirected { target: Name },
    /// Authenticated denial: the name or type does not exist.
    Denial(DenialKind),
    /// The chain ends at an authenticated unsigned delegation. Only
    /// returned when [`VerifierPolicy::allow_unsigned_delegation`] is set.
    InsecureDelegation,
}

/// The records a proof was able to establish, with the window in which they
/// are valid.
///
/// Owned by the caller; the verifier keeps no reference to it. The records
/// are only trustworthy while the resolution time used for verification lies
/// within `valid_from..=expires`, which holds by construction for the time
/// the caller passed in.
#[derive(Debug, Clone)]
pub struct VerifiedRRStream {
    /// The verified records relevant to the query: the answer RRset,
    /// followed records of a redirection chain, or the denial records.
    pub verified_rrs: Vec<Record>,
    /// The latest inception among all signatures the chain relied on.
    pub valid_from: u64,
    /// The earliest expiration among all signatures the chain relied on.
    pub expires: u64,
    /// The smallest original TTL among those signatures; a cache lifetime
    /// ceiling for the returned records.
    pub max_cache_ttl: u32,
    /// The query's outcome classification.
    pub answer: Answer,
}

/// An offline DNSSEC proof verifier.
///
/// Holds only immutable state (trust anchors and policy), so a single
/// instance can verify proofs from any number of threads concurrently.
#[derive(Debug, Clone)]
pub struct ProofVerifier {
    anchors: TrustAnchorSet,
    policy: VerifierPolicy,
}

enum Walk {
    Answered,
    Denied(DenialKind),
    Insecure,
    Redirect(Name),
}

/// Window and record bookkeeping threaded through the whole chain.
struct ChainState {
    verified: Vec<Record>,
    valid_from: u64,
    expires: u64,
    min_ttl: u32,
}

impl ChainState {
    fn new() -> Self {
        ChainState { verified: Vec::new(), valid_from: 0, expires: u64::MAX, min_ttl: u32::MAX }
    }

    fn absorb_sig(&mut self, sig: &Rrsig) {
        self.valid_from = self.valid_from.max(resolve_time(sig.inception));
        self.expires = self.expires.min(resolve_time(sig.expiration));
        self.min_ttl = self.min_ttl.min(sig.original_ttl);
    }

    fn keep(&mut self, record: &Record) {
        if !self.verified.contains(record) {
            self.verified.push(record.clone());
        }
    }

    fn finish(self, answer: Answer) -> VerifiedRRStream {
        VerifiedRRStream {
            verified_rrs: self.verified,
            valid_from: self.valid_from,
            expires: self.expires,
            max_cache_ttl: self.min_ttl,
            answer,
        }
    }
}

/// RRSIG timestamps are 32-bit and wrap in 2106. Timestamps that would
/// predate DNSSEC itself are interpreted as post-wrap values (RFC 1982
/// style), keeping proofs verifiable across the rollover.
fn resolve_time(time: u32) -> u64 {
    const CUTOFF: u32 = 60 * 60 * 24 * 365 * 27;
    if time < CUTOFF {
        u64::from(time) + u64::from(u32::MAX)
    } else {
        u64::from(time)
    }
}

/// Per-RRset-attempt failure notebook; turned into the most precise error
/// once every candidate signature has been tried.
#[derive(Default)]
struct SigFailures {
    expired: bool,
    not_yet_valid: bool,
    invalid: bool,
    unsupported: Option<u8>,
}

impl SigFailures {
    fn into_error(self) -> ProofError {
        if self.expired {
            ProofError::SignatureExpired
        } else if self.not_yet_valid {
            ProofError::SignatureNotYetValid
        } else if self.invalid {
            ProofError::SignatureInvalid
        } else if let Some(alg) = self.unsupported {
            ProofError::UnsupportedAlgorithm(alg)
        } else {
            ProofError::NoMatchingKey
        }
    }
}

/// The digest a DS record (or DS-form trust anchor) commits to: canonical
/// owner name followed by the DNSKEY RDATA.
pub(crate) fn dnskey_digest(zone: &Name, key: &DnsKey, digest_type: u8) -> Option<Vec<u8>> {
    let mut data = Vec::with_capacity(zone.wire_len() + 4 + key.public_key.len());
    zone.write_canonical(&mut data);
    data.extend_from_slice(&key.flags.to_be_bytes());
    data.push(key.protocol);
    data.push(key.algorithm);
    data.extend_from_slice(&key.public_key);
    crypto::digest(digest_type, &data)
}

fn ds_designates(
    zone: &Name,
    key: &DnsKey,
    key_tag: u16,
    algorithm: u8,
    digest_type: u8,
    digest: &[u8],
    trust_sha1: bool,
) -> bool {
    if algorithm != key.algorithm || key_tag != key.key_tag() {
        return false;
    }
    match DigestType::from_u8(digest_type) {
        None => return false,
        Some(DigestType::Sha1) if !trust_sha1 => return false,
        Some(_) => {}
    }
    dnskey_digest(zone, key, digest_type).as_deref() == Some(digest)
}

fn collect_rrsigs<'a>(
    records: &'a [Record],
    owner: &Name,
    covered: RecordType,
    signer: &Name,
) -> Vec<&'a Rrsig> {
    records
        .iter()
        .filter(|r| r.name == *owner)
        .filter_map(|r| match &r.data {
            RData::Rrsig(sig) if sig.type_covered == covered && sig.signer == *signer => Some(sig),
            _ => None,
        })
        .collect()
}

fn collect_rrset<'a>(records: &'a [Record], owner: &Name, rtype: RecordType) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| r.name == *owner && r.rtype() == rtype)
        .collect()
}

impl ProofVerifier {
    /// A verifier with the default (strict) policy.
    pub fn new(anchors: TrustAnchorSet) -> Self {
        Self::with_policy(anchors, VerifierPolicy::default())
    }

    pub fn with_policy(anchors: TrustAnchorSet, policy: VerifierPolicy) -> Self {
        ProofVerifier { anchors, policy }
    }

    /// Parses `proof` as a wire-format record stream and verifies it for the
    /// query, at the caller-supplied resolution time (seconds since epoch).
    pub fn verify(
        &self,
        proof: &[u8],
        query_name: &Name,
        query_type: RecordType,
        resolution_time: u64,
    ) -> Result<VerifiedRRStream> {
        let records = parse_rr_stream(proof)?;
        self.verify_records(&records, query_name, query_type, resolution_time)
    }

    /// Verifies an already-parsed record stream. See [`Self::verify`].
    pub fn verify_records(
        &self,
        records: &[Record],
        query_name: &Name,
        query_type: RecordType,
        resolution_time: u64,
    ) -> Result<VerifiedRRStream> {
        let mut steps = 0usize;
        let mut state = ChainState::new();
        let mut name = query_name.clone();
        let mut redirected = false;
        loop {
            let walk =
                self.walk_chain(records, &name, query_type, resolution_time, &mut steps, &mut state)?;
            let answer = match walk {
                Walk::Redirect(target) => {
                    debug!(from = %name, to = %target, "following redirection");
                    redirected = true;
                    name = target;
                    continue;
                }
                Walk::Answered if redirected => Answer::Redirected { target: name },
                Walk::Answered => Answer::Positive,
                Walk::Denied(kind) => Answer::Denial(kind),
                Walk::Insecure => {
                    if !self.policy.allow_unsigned_delegation {
                        return Err(ProofError::UnsignedZone);
                    }
                    Answer::InsecureDelegation
                }
            };
            return Ok(state.finish(answer));
        }
    }

    /// One full descent from the deepest applicable trust anchor to the
    /// query name's zone, ending in an answer, a denial, or a redirection.
    fn walk_chain(
        &self,
        records: &[Record],
        qname: &Name,
        qtype: RecordType,
        resolution_time: u64,
        steps: &mut usize,
        state: &mut ChainState,
    ) -> Result<Walk> {
        let mut zone = self.anchors.starting_zone(qname).ok_or(ProofError::ChainBroken)?.clone();
        let mut ds_set: Option<Vec<&Ds>> = None;
        loop {
            *steps += 1;
            if *steps > MAX_PROOF_STEPS {
                warn!(%zone, "proof exceeded step budget");
                return Err(ProofError::ProofTooLong);
            }
            trace!(%zone, step = *steps, "verifying zone key set");
            let keys =
                self.verify_zone_keys(records, &zone, ds_set.as_deref(), resolution_time, state)?;

            match next_ds_cut(records, &zone, qname, qtype) {
                Some(cut) => {
                    let ds_records = collect_rrset(records, &cut, RecordType::Ds);
                    let sigs = collect_rrsigs(records, &cut, RecordType::Ds, &zone);
                    self.verify_rrset(&cut, &ds_records, &sigs, &keys, resolution_time, state)?;
                    debug!(parent = %zone, child = %cut, "delegation verified");
                    ds_set = Some(
                        ds_records
                            .iter()
                            .filter_map(|r| match &r.data {
                                RData::Ds(ds) => Some(ds),
                                _ => None,
                            })
                            .collect(),
                    );
                    zone = cut;
                }
                None => {
                    return self.conclude(records, &zone, &keys, qname, qtype, resolution_time, state);
                }
            }
        }
    }

    /// Accepts a zone's DNSKEY RRset: at least one covering RRSIG must
    /// verify under a key that the current DS set (or, at the anchor, the
    /// trust-anchor set) designates. Returns the zone keys usable for
    /// signing RRsets in this zone.
    fn verify_zone_keys<'a>(
        &self,
        records: &'a [Record],
        zone: &Name,
        ds_set: Option<&[&Ds]>,
        resolution_time: u64,
        state: &mut ChainState,
    ) -> Result<Vec<&'a DnsKey>> {
        let key_records = collect_rrset(records, zone, RecordType::DnsKey);
        let keys: Vec<&DnsKey> = key_records
            .iter()
            .filter_map(|r| match &r.data {
                RData::DnsKey(k) => Some(k),
                _ => None,
            })
            .collect();
        if keys.is_empty() {
            debug!(%zone, "no DNSKEY records for zone");
            return Err(ProofError::ChainBroken);
        }

        let trusted: Vec<&DnsKey> = match ds_set {
            None => {
                let anchors: Vec<&TrustAnchor> = self.anchors.anchors_for(zone).collect();
                if anchors.is_empty() {
                    return Err(ProofError::ChainBroken);
                }
                let trust_sha1 = anchors.iter().all(|a| {
                    !matches!(a, TrustAnchor::Ds { digest_type, .. } if *digest_type == 2 || *digest_type == 4)
                });
                keys.iter()
                    .copied()
                    .filter(|key| {
                        anchors.iter().any(|anchor| match anchor {
                            TrustAnchor::Key { .. } => anchor.is_key(key),
                            TrustAnchor::Ds { key_tag, algorithm, digest_type, digest, .. } => {
                                ds_designates(zone, key, *key_tag, *algorithm, *digest_type, digest, trust_sha1)
                            }
                        })
                    })
                    .collect()
            }
            Some(dses) => {
                if dses.is_empty() {
                    return Err(ProofError::ChainBroken);
                }
                if !dses.iter().any(|ds| DigestType::from_u8(ds.digest_type).is_some()) {
                    // The zone only publishes digests we cannot compute.
                    return Err(ProofError::UnsupportedAlgorithm(dses[0].digest_type));
                }
                // SHA-1 digests only count when the zone offers nothing
                // stronger.
                let trust_sha1 = dses.iter().all(|ds| ds.digest_type != 2 && ds.digest_type != 4);
                keys.iter()
                    .copied()
                    .filter(|key| {
                        dses.iter().any(|ds| {
                            ds_designates(zone, key, ds.key_tag, ds.algorithm, ds.digest_type, &ds.digest, trust_sha1)
                        })
                    })
                    .collect()
            }
        };
        if trusted.is_empty() {
            debug!(%zone, "no DNSKEY matches the trusted DS set");
            return Err(ProofError::ChainBroken);
        }

        let sigs = collect_rrsigs(records, zone, RecordType::DnsKey, zone);
        self.verify_rrset(zone, &key_records, &sigs, &trusted, resolution_time, state)?;
        debug!(%zone, keys = keys.len(), "zone key set accepted");
        Ok(keys
            .into_iter()
            .filter(|key| key.protocol == DNSSEC_PROTOCOL && key.is_zone_key())
            .collect())
    }

    /// Verifies one RRset against its candidate signatures and a key set.
    /// The first signature that checks out wins; the failure modes of the
    /// others decide the error when none does.
    fn verify_rrset(
        &self,
        owner: &Name,
        set: &[&Record],
        sigs: &[&Rrsig],
        keys: &[&DnsKey],
        resolution_time: u64,
        state: &mut ChainState,
    ) -> Result<()> {
        if set.is_empty() {
            return Err(ProofError::ChainBroken);
        }
        let mut failures = SigFailures::default();
        for sig in sigs {
            let inception = resolve_time(sig.inception);
            let expiration = resolve_time(sig.expiration);
            if resolution_time < inception {
                failures.not_yet_valid = true;
                continue;
            }
            if resolution_time > expiration {
                failures.expired = true;
                continue;
            }

            let signed = match canonical::signed_data(owner, sig, set) {
                Ok(bytes) => bytes,
                Err(_) => {
                    failures.invalid = true;
                    continue;
                }
            };
            for key in keys {
                if key.key_tag() != sig.key_tag
                    || key.algorithm != sig.algorithm
                    || key.protocol != DNSSEC_PROTOCOL
                    || !key.is_zone_key()
                {
                    continue;
                }
                match crypto::verify_signature(key.algorithm, &key.public_key, &signed, &sig.signature) {
                    Ok(()) => {
                        trace!(%owner, key_tag = sig.key_tag, "signature verified");
                        state.absorb_sig(sig);
                        return Ok(());
                    }
                    Err(SignatureError::Unsupported) => {
                        failures.unsupported = Some(sig.algorithm);
                    }
                    Err(SignatureError::Invalid) => {
                        failures.invalid = true;
                    }
                }
            }
        }
        debug!(%owner, "no covering signature verified");
        Err(failures.into_error())
    }

    /// Handling at the query's own zone: answer, redirection, or denial.
    #[allow(clippy::too_many_arguments)]
    fn conclude(
        &self,
        records: &[Record],
        zone: &Name,
        keys: &[&DnsKey],
        qname: &Name,
        qtype: RecordType,
        resolution_time: u64,
        state: &mut ChainState,
    ) -> Result<Walk> {
        let answer = collect_rrset(records, qname, qtype);
        if !answer.is_empty() {
            let sigs = collect_rrsigs(records, qname, qtype, zone);
            self.verify_rrset(qname, &answer, &sigs, keys, resolution_time, state)?;
            for record in &answer {
                state.keep(record);
            }
            debug!(%qname, ?qtype, "answer RRset verified");
            return Ok(Walk::Answered);
        }

        if qtype != RecordType::CName {
            let cnames = collect_rrset(records, qname, RecordType::CName);
            if let Some(first) = cnames.first() {
                let sigs = collect_rrsigs(records, qname, RecordType::CName, zone);
                self.verify_rrset(qname, &cnames, &sigs, keys, resolution_time, state)?;
                state.keep(first);
                if let RData::CName { target } = &first.data {
                    return Ok(Walk::Redirect(target.clone()));
                }
                unreachable!("collect_rrset returned a non-CNAME record");
            }

            // A DNAME rewrites every name below its owner.
            let dname = records.iter().find(|r| {
                matches!(r.data, RData::DName { .. })
                    && r.name != *qname
                    && r.name.encloses(qname)
                    && zone.encloses(&r.name)
            });
            if let Some(record) = dname {
                let set = collect_rrset(records, &record.name, RecordType::DName);
                let sigs = collect_rrsigs(records, &record.name, RecordType::DName, zone);
                self.verify_rrset(&record.name, &set, &sigs, keys, resolution_time, state)?;
                state.keep(record);
                if let RData::DName { target } = &record.data {
                    let rewritten = qname
                        .replace_suffix(&record.name, target)
                        .map_err(|_| ProofError::ChainBroken)?;
                    return Ok(Walk::Redirect(rewritten));
                }
            }
        }

        self.prove_denial(records, zone, keys, qname, qtype, resolution_time, state)
    }

    /// Finds and validates an NSEC/NSEC3 record establishing that the query
    /// has no answer, or that the chain legitimately leaves signed space.
    #[allow(clippy::too_many_arguments)]
    fn prove_denial(
        &self,
        records: &[Record],
        zone: &Name,
        keys: &[&DnsKey],
        qname: &Name,
        qtype: RecordType,
        resolution_time: u64,
        state: &mut ChainState,
    ) -> Result<Walk> {
        for (record, nsec) in nsec_records(records, zone) {
            if let Some(kind) = denial::nsec_denies(&record.name, nsec, qname, qtype) {
                self.verify_negative(records, zone, keys, record, resolution_time, state)?;
                debug!(owner = %record.name, ?kind, "NSEC denial verified");
                return Ok(Walk::Denied(kind));
            }
        }

        for (record, n3) in nsec3_records(records, zone) {
            let denied =
                denial::nsec3_denies(&record.name, n3, qname, qtype, self.policy.max_nsec3_iterations);
            if let Some(denied) = denied {
                self.verify_negative(records, zone, keys, record, resolution_time, state)?;
                debug!(owner = %record.name, ?denied, "NSEC3 denial verified");
                return Ok(match denied {
                    Nsec3Denial::NameError => Walk::Denied(DenialKind::NameError),
                    Nsec3Denial::NoData => Walk::Denied(DenialKind::NoData),
                    Nsec3Denial::OptOutCover => Walk::Insecure,
                });
            }
        }

        // An unsigned delegation between this zone and the query name shows
        // up as an NS cut with a proven DS absence.
        for cut in ns_cuts(records, zone, qname) {
            for (record, nsec) in nsec_records(records, zone) {
                if denial::nsec_proves_unsigned_delegation(&record.name, nsec, &cut) {
                    self.verify_negative(records, zone, keys, record, resolution_time, state)?;
                    debug!(%cut, "unsigned delegation proven by NSEC");
                    return Ok(Walk::Insecure);
                }
            }
            for (record, n3) in nsec3_records(records, zone) {
                if denial::nsec3_proves_unsigned_delegation(
                    &record.name,
                    n3,
                    &cut,
                    self.policy.max_nsec3_iterations,
                ) {
                    self.verify_negative(records, zone, keys, record, resolution_time, state)?;
                    debug!(%cut, "unsigned delegation proven by NSEC3");
                    return Ok(Walk::Insecure);
                }
            }
        }

        debug!(%qname, "no denial record covers the query");
        Err(ProofError::DenialProofInvalid)
    }

    /// Verifies the RRset of a single negative record and retains it.
    fn verify_negative(
        &self,
        records: &[Record],
        zone: &Name,
        keys: &[&DnsKey],
        record: &Record,
        resolution_time: u64,
        state: &mut ChainState,
    ) -> Result<()> {
        let rtype = record.rtype();
        let set = collect_rrset(records, &record.name, rtype);
        let sigs = collect_rrsigs(records, &record.name, rtype, zone);
        self.verify_rrset(&record.name, &set, &sigs, keys, resolution_time, state)?;
        state.keep(record);
        Ok(())
    }
}

/// The shallowest DS RRset owner strictly below `zone` on the path to
/// `qname`, i.e. the next delegation the chain must cross. A DS RRset at the
/// query name itself is the answer when DS is what was asked for, not a cut.
fn next_ds_cut(records: &[Record], zone: &Name, qname: &Name, qtype: RecordType) -> Option<Name> {
    records
        .iter()
        .filter(|r| matches!(r.data, RData::Ds(_)))
        .map(|r| &r.name)
        .filter(|owner| {
            owner.label_count() > zone.label_count()
                && zone.encloses(owner)
                && owner.encloses(qname)
                && !(*owner == qname && qtype == RecordType::Ds)
        })
        .min_by_key(|owner| owner.label_count())
        .cloned()
}

/// Owners of NS RRsets strictly between `zone` and `qname`, shallowest
/// first: the candidate delegation points an unsigned-subtree proof must
/// speak to.
fn ns_cuts(records: &[Record], zone: &Name, qname: &Name) -> Vec<Name> {
    let mut cuts: Vec<Name> = records
        .iter()
        .filter(|r| matches!(r.data, RData::Ns { .. }))
        .map(|r| r.name.clone())
        .filter(|owner| {
            owner.label_count() > zone.label_count() && zone.encloses(owner) && owner.encloses(qname)
        })
        .collect();
    cuts.sort_by_key(|owner| owner.label_count());
    cuts.dedup();
    cuts
}

fn nsec_records<'a>(records: &'a [Record], zone: &Name) -> Vec<(&'a Record, &'a Nsec)> {
    records
        .iter()
        .filter(|r| zone.encloses(&r.name))
        .filter_map(|r| match &r.data {
            RData::Nsec(nsec) => Some((r, nsec)),
            _ => None,
        })
        .collect()
}

fn nsec3_records<'a>(records: &'a [Record], zone: &Name) -> Vec<(&'a Record, &'a Nsec3)> {
    records
        .iter()
        .filter(|r| r.name.label_count() == zone.label_count() + 1 && zone.encloses(&r.name))
        .filter_map(|r| match &r.data {
            RData::Nsec3(n3) => Some((r, n3)),
            _ => None,
        })
        .collect()
}

//! NSEC and NSEC3 denial-of-existence checks: deciding whether a validated
//! negative record actually proves the absence of the queried name or type.
//!
//! Nothing here verifies signatures; the verifier only consults these
//! predicates for records whose RRSIG it has already checked (or is about
//! to check).

use std::cmp::Ordering;

use tracing::trace;

use crate::dns::enums::RecordType;
use crate::dns::name::Name;
use crate::dns::resource::{Nsec, Nsec3, NsecTypeMask};

use super::crypto::{self, DigestType};

/// NSEC3 hash algorithm registry: SHA-1 is the only assigned value.
pub const NSEC3_HASH_SHA1: u8 = 1;

/// What a matching negative record proves about the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    /// The name does not exist at all.
    NameError,
    /// The name exists but has no records of the queried type.
    NoData,
}

/// What an NSEC3 record establishes for a query hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nsec3Denial {
    NameError,
    NoData,
    /// The hash falls in an opt-out range: nothing is proven about the name
    /// itself, but an unsigned delegation may exist inside the range.
    OptOutCover,
}

/// Whether `name` falls strictly between `owner` and `next_owner` in
/// canonical order. The last NSEC in a zone wraps around to the apex, so an
/// owner at or above `next_owner` covers everything after `owner`.
pub fn nsec_covers(owner: &Name, next_owner: &Name, name: &Name) -> bool {
    match owner.canonical_cmp(next_owner) {
        Ordering::Less => {
            owner.canonical_cmp(name) == Ordering::Less
                && name.canonical_cmp(next_owner) == Ordering::Less
        }
        // Wrap-around (or a single-record chain): covered unless it sorts
        // at or before the owner and at or after the next name.
        _ => {
            owner.canonical_cmp(name) == Ordering::Less
                || name.canonical_cmp(next_owner) == Ordering::Less
        }
    }
}

/// Whether the bitmap marks its owner as a delegation point (NS without
/// SOA). Such a record speaks for the parent side of a zone cut and cannot
/// prove anything about names in the child zone.
fn is_delegation_bitmap(nsec_types: &NsecTypeMask) -> bool {
    nsec_types.contains(RecordType::Ns) && !nsec_types.contains(RecordType::Soa)
}

/// What, if anything, this NSEC record proves about `(qname, qtype)`.
pub fn nsec_denies(owner: &Name, nsec: &Nsec, qname: &Name, qtype: RecordType) -> Option<DenialKind> {
    if owner == qname {
        // NODATA: the name exists, the type must be absent. A CNAME at the
        // name would answer the query too, so it must be absent as well. At
        // a delegation point only the DS type is answered from this side of
        // the cut.
        if is_delegation_bitmap(&nsec.types) && qtype != RecordType::Ds {
            return None;
        }
        if !nsec.types.contains(qtype) && !nsec.types.contains(RecordType::CName) {
            return Some(DenialKind::NoData);
        }
        return None;
    }
    if nsec_covers(owner, &nsec.next_owner, qname) {
        // A delegation NSEC covers every name in the child zone without
        // proving their absence.
        if owner.encloses(qname) && is_delegation_bitmap(&nsec.types) {
            return None;
        }
        trace!(%owner, next = %nsec.next_owner, %qname, "NSEC covers query name");
        return Some(DenialKind::NameError);
    }
    None
}

/// Whether this NSEC record proves that `cut` is a delegation without a DS
/// RRset, i.e. the top of an unsigned subtree.
pub fn nsec_proves_unsigned_delegation(owner: &Name, nsec: &Nsec, cut: &Name) -> bool {
    owner == cut
        && nsec.types.contains(RecordType::Ns)
        && !nsec.types.contains(RecordType::Ds)
        && !nsec.types.contains(RecordType::Soa)
}

/// The NSEC3 hash of `name`: iterated, salted SHA-1 over the canonical wire
/// form (RFC 5155 §5). `None` when the hash algorithm is unknown.
pub fn nsec3_hash(name: &Name, hash_algorithm: u8, salt: &[u8], iterations: u16) -> Option<Vec<u8>> {
    if hash_algorithm != NSEC3_HASH_SHA1 {
        return None;
    }
    let mut input = Vec::with_capacity(name.wire_len() + salt.len());
    name.write_canonical(&mut input);
    input.extend_from_slice(salt);
    let mut hash = crypto::digest(DigestType::Sha1.to_u8(), &input)?;
    for _ in 0..iterations {
        hash.extend_from_slice(salt);
        hash = crypto::digest(DigestType::Sha1.to_u8(), &hash)?;
    }
    Some(hash)
}

/// Decodes the hashed-owner label of an NSEC3 record's owner name
/// (base32hex, case-insensitive).
pub fn nsec3_owner_hash(owner: &Name) -> Option<Vec<u8>> {
    let label = owner.first_label()?;
    base32::decode(
        base32::Alphabet::Rfc4648Hex { padding: false },
        &label.to_ascii_uppercase(),
    )
}

/// Renders a raw NSEC3 hash as the lowercase base32hex label used as an
/// owner name.
pub fn nsec3_hash_label(hash: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648Hex { padding: false }, hash).to_ascii_lowercase()
}

/// Hashed-order interval check, with the same wrap-around rule as
/// [`nsec_covers`].
pub fn nsec3_covers(owner_hash: &[u8], next_hash: &[u8], hash: &[u8]) -> bool {
    if owner_hash < next_hash {
        owner_hash < hash && hash < next_hash
    } else {
        owner_hash < hash || hash < next_hash
    }
}

/// What, if anything, this NSEC3 record proves about `(qname, qtype)`.
///
/// Returns `None` for records that cannot be used at all: an unassigned hash
/// algorithm, an iteration count above `max_iterations` (a cost ceiling
/// against attacker-chosen work), or an owner label that is not a plausible
/// hash.
pub fn nsec3_denies(
    owner: &Name,
    n3: &Nsec3,
    qname: &Name,
    qtype: RecordType,
    max_iterations: u16,
) -> Option<Nsec3Denial> {
    if n3.iterations > max_iterations {
        trace!(%owner, iterations = n3.iterations, "NSEC3 iteration count above cap, ignoring record");
        return None;
    }
    let qhash = nsec3_hash(qname, n3.hash_algorithm, &n3.salt, n3.iterations)?;
    let owner_hash = nsec3_owner_hash(owner)?;
    if owner_hash.len() != qhash.len() || n3.next_hashed_owner.len() != qhash.len() {
        return None;
    }
    if owner_hash == qhash {
        if is_delegation_bitmap(&n3.types) && qtype != RecordType::Ds {
            return None;
        }
        if !n3.types.contains(qtype) && !n3.types.contains(RecordType::CName) {
            return Some(Nsec3Denial::NoData);
        }
        return None;
    }
    if nsec3_covers(&owner_hash, &n3.next_hashed_owner, &qhash) {
        if n3.opt_out() {
            return Some(Nsec3Denial::OptOutCover);
        }
        return Some(Nsec3Denial::NameError);
    }
    None
}

/// Whether this NSEC3 record proves that `cut` is a delegation without a DS
/// RRset: either an exact match whose bitmap has NS but no DS, or an
/// opt-out range covering the cut's hash.
pub fn nsec3_proves_unsigned_delegation(
    owner: &Name,
    n3: &Nsec3,
    cut: &Name,
    max_iterations: u16,
) -> bool {
    if n3.iterations > max_iterations {
        return false;
    }
    let Some(cut_hash) = nsec3_hash(cut, n3.hash_algorithm, &n3.salt, n3.iterations) else {
        return false;
    };
    let Some(owner_hash) = nsec3_owner_hash(owner) else {
        return false;
    };
    if owner_hash.len() != cut_hash.len() {
        return false;
    }
    if owner_hash == cut_hash {
        return n3.types.contains(RecordType::Ns)
            && !n3.types.contains(RecordType::Ds)
            && !n3.types.contains(RecordType::Soa);
    }
    n3.opt_out() && nsec3_covers(&owner_hash, &n3.next_hashed_owner, &cut_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resource::NsecTypeMask;

    fn name(s: &str) -> Name {
        Name::try_from(s).unwrap()
    }

    #[test]
    fn test_nsec_cover_interval() {
        let owner = name("alpha.example.");
        let next = name("delta.example.");
        assert!(nsec_covers(&owner, &next, &name("bravo.example.")));
        assert!(nsec_covers(&owner, &next, &name("BRAVO.example.")));
        assert!(!nsec_covers(&owner, &next, &name("alpha.example.")));
        assert!(!nsec_covers(&owner, &next, &name("delta.example.")));
        assert!(!nsec_covers(&owner, &next, &name("zulu.example.")));
    }

    #[test]
    fn test_nsec_cover_wraparound() {
        // Last NSEC in the zone points back at the apex.
        let owner = name("zulu.example.");
        let next = name("example.");
        assert!(nsec_covers(&owner, &next, &name("zz.example.")));
        assert!(nsec_covers(&owner, &next, &name("zzz.zulu.example.")));
        assert!(!nsec_covers(&owner, &next, &name("alpha.example.")));
    }

    #[test]
    fn test_nsec_nodata() {
        let nsec = Nsec {
            next_owner: name("beta.example."),
            types: NsecTypeMask::from_types(&[RecordType::A, RecordType::Rrsig]),
        };
        let owner = name("alpha.example.");
        assert_eq!(
            nsec_denies(&owner, &nsec, &owner, RecordType::Txt),
            Some(DenialKind::NoData)
        );
        assert_eq!(nsec_denies(&owner, &nsec, &owner, RecordType::A), None);

        // A CNAME bit defeats the NODATA proof even if the type is absent.
        let with_cname = Nsec {
            next_owner: name("beta.example."),
            types: NsecTypeMask::from_types(&[RecordType::CName]),
        };
        assert_eq!(nsec_denies(&owner, &with_cname, &owner, RecordType::Txt), None);
    }

    #[test]
    fn test_nsec_unsigned_delegation() {
        let delegation = Nsec {
            next_owner: name("beta.example."),
            types: NsecTypeMask::from_types(&[RecordType::Ns]),
        };
        let cut = name("sub.example.");
        assert!(nsec_proves_unsigned_delegation(&cut, &delegation, &cut));
        assert!(!nsec_proves_unsigned_delegation(&name("other.example."), &delegation, &cut));

        let signed_cut = Nsec {
            next_owner: name("beta.example."),
            types: NsecTypeMask::from_types(&[RecordType::Ns, RecordType::Ds]),
        };
        assert!(!nsec_proves_unsigned_delegation(&cut, &signed_cut, &cut));
    }

    #[test]
    fn test_nsec3_hash_rfc5155_vectors() {
        // RFC 5155 Appendix A: salt aabbccdd, 12 iterations.
        let salt = hex::decode("aabbccdd").unwrap();
        let hash = nsec3_hash(&name("example."), NSEC3_HASH_SHA1, &salt, 12).unwrap();
        assert_eq!(nsec3_hash_label(&hash), "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom");
        let hash = nsec3_hash(&name("a.example."), NSEC3_HASH_SHA1, &salt, 12).unwrap();
        assert_eq!(nsec3_hash_label(&hash), "35mthgpgcu1qg68fab165klnsnk3dpvl");
    }

    #[test]
    fn test_nsec3_hash_unknown_algorithm() {
        assert_eq!(nsec3_hash(&name("example."), 2, &[], 0), None);
    }

    #[test]
    fn test_nsec3_owner_label_round_trip() {
        let hash = hex::decode("1234567890abcdef1234567890abcdef12345678").unwrap();
        let label = nsec3_hash_label(&hash);
        let owner = Name::try_from(format!("{label}.example.").as_str()).unwrap();
        assert_eq!(nsec3_owner_hash(&owner).unwrap(), hash);
        // Case must not matter.
        let upper = Name::try_from(format!("{}.example.", label.to_ascii_uppercase()).as_str()).unwrap();
        assert_eq!(nsec3_owner_hash(&upper).unwrap(), hash);
    }

    #[test]
    fn test_nsec3_cover_interval() {
        assert!(nsec3_covers(&[0x10], &[0x30], &[0x20]));
        assert!(!nsec3_covers(&[0x10], &[0x30], &[0x10]));
        assert!(!nsec3_covers(&[0x10], &[0x30], &[0x40]));
        // Wrap-around.
        assert!(nsec3_covers(&[0x30], &[0x10], &[0x40]));
        assert!(nsec3_covers(&[0x30], &[0x10], &[0x05]));
        assert!(!nsec3_covers(&[0x30], &[0x10], &[0x20]));
    }

    #[test]
    fn test_nsec3_iteration_cap() {
        let n3 = Nsec3 {
            hash_algorithm: NSEC3_HASH_SHA1,
            flags: 0,
            iterations: 5000,
            salt: Vec::new(),
            next_hashed_owner: vec![0xff; 20],
            types: NsecTypeMask::from_types(&[]),
        };
        let owner = name("0p9mhaveqvm6t7vbl5lop2u3t2rp3tom.example.");
        assert_eq!(nsec3_denies(&owner, &n3, &name("a.example."), RecordType::A, 2500), None);
    }
}

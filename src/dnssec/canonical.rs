//! Reconstruction of the exact byte sequence an RRSIG was computed over
//! (RFC 4034 §3.1.8.1): the signature's RDATA up through the signer name,
//! followed by every record of the covered set in canonical form and
//! canonical order.

use crate::dns::name::Name;
use crate::dns::resource::{Record, Rrsig};

use super::errors::{ProofError, Result};

/// Builds the signed data for `sig` over the RRset `records` at `owner`.
///
/// All records must belong to one RRset matching the signature's coverage.
/// Owner names are lowercased and the record TTL is replaced by the
/// signature's original TTL. When the signature's label count is smaller
/// than the owner's, the owner is rewritten as the wildcard expansion
/// (`*.<suffix>`) it was synthesized from; a signature claiming more labels
/// than the owner has cannot cover the set at all.
pub fn signed_data(owner: &Name, sig: &Rrsig, records: &[&Record]) -> Result<Vec<u8>> {
    if records.is_empty() {
        return Err(ProofError::SignatureInvalid);
    }
    for record in records {
        if record.name != *owner || record.rtype() != sig.type_covered {
            return Err(ProofError::SignatureInvalid);
        }
    }

    let signed_labels = usize::from(sig.labels);
    if signed_labels > owner.label_count() {
        return Err(ProofError::SignatureInvalid);
    }
    let mut owner_canonical = Vec::with_capacity(owner.wire_len() + 2);
    if signed_labels < owner.label_count() {
        owner_canonical.extend_from_slice(b"\x01*");
        owner.suffix(signed_labels).write_canonical(&mut owner_canonical);
    } else {
        owner.write_canonical(&mut owner_canonical);
    }

    let mut out = Vec::with_capacity(2048);
    out.extend_from_slice(&sig.type_covered.to_u16().to_be_bytes());
    out.push(sig.algorithm);
    out.push(sig.labels);
    out.extend_from_slice(&sig.original_ttl.to_be_bytes());
    out.extend_from_slice(&sig.expiration.to_be_bytes());
    out.extend_from_slice(&sig.inception.to_be_bytes());
    out.extend_from_slice(&sig.key_tag.to_be_bytes());
    sig.signer.write_canonical(&mut out);

    // RFC 4034 §6.3: the set is ordered by the canonical (wire) encoding of
    // each record's RDATA, compared as left-justified octet strings.
    let mut encoded: Vec<(Vec<u8>, &Record)> =
        records.iter().map(|r| (r.data.canonical_bytes(), *r)).collect();
    encoded.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (rdata, record) in &encoded {
        out.extend_from_slice(&owner_canonical);
        out.extend_from_slice(&record.rtype().to_u16().to_be_bytes());
        out.extend_from_slice(&record.class.to_u16().to_be_bytes());
        out.extend_from_slice(&sig.original_ttl.to_be_bytes());
        out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(rdata);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::enums::{RecordClass, RecordType};
    use crate::dns::resource::RData;

    fn name(s: &str) -> Name {
        Name::try_from(s).unwrap()
    }

    fn opaque(owner: &str, type_code: u16, data: &[u8]) -> Record {
        Record {
            name: name(owner),
            class: RecordClass::In,
            ttl: 12345,
            data: RData::Opaque { type_code, data: data.to_vec() },
        }
    }

    fn txt_sig(owner_labels: u8) -> Rrsig {
        Rrsig {
            type_covered: RecordType::Txt,
            algorithm: 13,
            labels: owner_labels,
            original_ttl: 300,
            expiration: 1700000000,
            inception: 1690000000,
            key_tag: 4242,
            signer: name("example.com."),
            signature: vec![0xab; 16],
        }
    }

    #[test]
    fn test_ttl_substitution_and_owner_case() {
        let record = opaque("WWW.Example.COM.", 16, b"\x05hello");
        let sig = txt_sig(3);
        let data = signed_data(&record.name, &sig, &[&record]).unwrap();
        // The record portion starts after the 18-byte fixed prefix plus the
        // canonical signer name.
        let record_part = &data[18 + name("example.com.").wire_len()..];
        assert!(record_part.starts_with(b"\x03www\x07example\x03com\x00"));
        let after_name = &record_part[name("www.example.com.").wire_len()..];
        // type 16, class 1, original TTL 300, rdlength 6.
        assert_eq!(&after_name[..10], &[0, 16, 0, 1, 0, 0, 1, 44, 0, 6]);
    }

    #[test]
    fn test_rdata_sort_order_is_wire_form() {
        // In wire form the length octet leads, so the shorter string sorts
        // first even though raw lexicographic order says otherwise.
        let a = opaque("x.example.com.", 16, b"\x02ab");
        let b = opaque("x.example.com.", 16, b"\x01b");
        let sig = txt_sig(3);
        let forward = signed_data(&a.name, &sig, &[&a, &b]).unwrap();
        let reverse = signed_data(&a.name, &sig, &[&b, &a]).unwrap();
        assert_eq!(forward, reverse);
        let tail = &forward[forward.len() - 3..];
        assert_eq!(tail, b"\x02ab", "longer rdata must come last");
    }

    #[test]
    fn test_wildcard_owner_reduction() {
        let record = opaque("bar.sub.example.com.", 16, b"\x03abc");
        let sig = txt_sig(2); // signed as *.example.com.
        let data = signed_data(&record.name, &sig, &[&record]).unwrap();
        let record_part = &data[18 + name("example.com.").wire_len()..];
        assert!(record_part.starts_with(b"\x01*\x07example\x03com\x00"));
    }

    #[test]
    fn test_labels_exceeding_owner_rejected() {
        let record = opaque("example.com.", 16, b"\x01x");
        let sig = txt_sig(5);
        assert_eq!(signed_data(&record.name, &sig, &[&record]), Err(ProofError::SignatureInvalid));
    }

    #[test]
    fn test_mixed_rrset_rejected() {
        let a = opaque("a.example.com.", 16, b"\x01x");
        let b = opaque("b.example.com.", 16, b"\x01x");
        let sig = txt_sig(3);
        assert!(signed_data(&a.name, &sig, &[&a, &b]).is_err());
        assert!(signed_data(&a.name, &sig, &[]).is_err());
    }
}

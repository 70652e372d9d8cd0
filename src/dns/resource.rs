use super::WireError;
use super::common::WireCursor;
use super::enums::{RecordClass, RecordType};
use super::name::Name;
use crate::dnssec::key_tag::calculate_key_tag;

/// The set of record types present at an owner name, in NSEC/NSEC3
/// window-block wire form.
///
/// The blocks are kept exactly as received so canonical re-encoding is
/// byte-identical to what the zone signed; parsing enforces the wire-format
/// rules (strictly increasing block numbers, 1..=32 octets per block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsecTypeMask {
    blocks: Vec<(u8, Vec<u8>)>,
}

impl NsecTypeMask {
    /// Whether the given type code is present in the mask.
    pub fn contains(&self, rtype: RecordType) -> bool {
        let code = rtype.to_u16();
        let block = (code >> 8) as u8;
        let index = ((code & 0xff) >> 3) as usize;
        let bit = 0x80u8 >> (code & 0x07);
        self.blocks
            .iter()
            .find(|(b, _)| *b == block)
            .and_then(|(_, bitmap)| bitmap.get(index))
            .is_some_and(|byte| byte & bit != 0)
    }

    /// Builds a mask holding exactly the given types.
    pub fn from_types(types: &[RecordType]) -> Self {
        let mut blocks: Vec<(u8, Vec<u8>)> = Vec::new();
        let mut codes: Vec<u16> = types.iter().map(|t| t.to_u16()).collect();
        codes.sort_unstable();
        for code in codes {
            let block = (code >> 8) as u8;
            let index = ((code & 0xff) >> 3) as usize;
            let bit = 0x80u8 >> (code & 0x07);
            if blocks.last().map(|(b, _)| *b) != Some(block) {
                blocks.push((block, Vec::new()));
            }
            let bitmap = &mut blocks.last_mut().unwrap().1;
            if bitmap.len() <= index {
                bitmap.resize(index + 1, 0);
            }
            bitmap[index] |= bit;
        }
        NsecTypeMask { blocks }
    }

    fn parse(rd: &mut WireCursor<'_>) -> Result<Self, WireError> {
        let mut blocks = Vec::new();
        let mut prev_block: Option<u8> = None;
        while !rd.is_empty() {
            let block = rd.read_u8()?;
            let len = rd.read_u8()? as usize;
            if len == 0 || len > 32 {
                return Err(WireError::InvalidLength);
            }
            if prev_block.is_some_and(|prev| prev >= block) {
                return Err(WireError::InvalidLength);
            }
            prev_block = Some(block);
            blocks.push((block, rd.take(len)?.to_vec()));
        }
        Ok(NsecTypeMask { blocks })
    }

    fn write(&self, out: &mut Vec<u8>) {
        for (block, bitmap) in &self.blocks {
            out.push(*block);
            out.push(bitmap.len() as u8);
            out.extend_from_slice(bitmap);
        }
    }
}

/// DNSKEY RDATA: a public key that signs records in its zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsKey {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

impl DnsKey {
    /// The RFC 4034 Appendix B key tag for this key.
    pub fn key_tag(&self) -> u16 {
        calculate_key_tag(self.flags, self.protocol, self.algorithm, &self.public_key)
    }

    /// Whether the ZONE flag is set; only zone keys may sign RRsets.
    pub fn is_zone_key(&self) -> bool {
        self.flags & 0x0100 != 0
    }

    /// Whether the secure-entry-point flag is set (conventionally, a KSK).
    pub fn is_secure_entry_point(&self) -> bool {
        self.flags & 0x0001 != 0
    }
}

/// DS RDATA: a digest of a child zone's DNSKEY, held in the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ds {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

/// RRSIG RDATA: a signature over one RRset, with validity window and signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rrsig {
    pub type_covered: RecordType,
    pub algorithm: u8,
    /// Label count of the signed owner name; fewer labels than the owner
    /// actually has means the set was synthesized from a wildcard.
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer: Name,
    pub signature: Vec<u8>,
}

/// NSEC RDATA: proves the gap between two names in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nsec {
    pub next_owner: Name,
    pub types: NsecTypeMask,
}

/// NSEC3 RDATA: the hashed-name equivalent of NSEC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nsec3 {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
    /// The raw (not base32hex) hash of the next owner in hash order.
    pub next_hashed_owner: Vec<u8>,
    pub types: NsecTypeMask,
}

impl Nsec3 {
    /// The opt-out flag: ranges covered by this record may contain unsigned
    /// delegations.
    pub fn opt_out(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

/// RDATA, keyed by record type.
///
/// Types the verifier has no structural interest in are carried as `Opaque`
/// with their exact wire bytes; they still participate in signature
/// verification and may be the record a proof is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    Ns { host: Name },
    CName { target: Name },
    DName { target: Name },
    DnsKey(DnsKey),
    Ds(Ds),
    Rrsig(Rrsig),
    Nsec(Nsec),
    Nsec3(Nsec3),
    Opaque { type_code: u16, data: Vec<u8> },
}

impl RData {
    pub(crate) fn parse(type_code: u16, rd: &mut WireCursor<'_>) -> Result<Self, WireError> {
        let data = match RecordType::from_u16(type_code) {
            RecordType::Ns => RData::Ns { host: rd.read_name()? },
            RecordType::CName => RData::CName { target: rd.read_name()? },
            RecordType::DName => RData::DName { target: rd.read_name()? },
            RecordType::DnsKey => RData::DnsKey(DnsKey {
                flags: rd.read_u16()?,
                protocol: rd.read_u8()?,
                algorithm: rd.read_u8()?,
                public_key: rd.take_rest().to_vec(),
            }),
            RecordType::Ds => RData::Ds(Ds {
                key_tag: rd.read_u16()?,
                algorithm: rd.read_u8()?,
                digest_type: rd.read_u8()?,
                digest: rd.take_rest().to_vec(),
            }),
            RecordType::Rrsig => RData::Rrsig(Rrsig {
                type_covered: RecordType::from_u16(rd.read_u16()?),
                algorithm: rd.read_u8()?,
                labels: rd.read_u8()?,
                original_ttl: rd.read_u32()?,
                expiration: rd.read_u32()?,
                inception: rd.read_u32()?,
                key_tag: rd.read_u16()?,
                signer: rd.read_name()?,
                signature: rd.take_rest().to_vec(),
            }),
            RecordType::Nsec => RData::Nsec(Nsec {
                next_owner: rd.read_name()?,
                types: NsecTypeMask::parse(rd)?,
            }),
            RecordType::Nsec3 => {
                let hash_algorithm = rd.read_u8()?;
                let flags = rd.read_u8()?;
                let iterations = rd.read_u16()?;
                let salt_len = rd.read_u8()? as usize;
                let salt = rd.take(salt_len)?.to_vec();
                let hash_len = rd.read_u8()? as usize;
                if hash_len == 0 {
                    return Err(WireError::InvalidLength);
                }
                let next_hashed_owner = rd.take(hash_len)?.to_vec();
                RData::Nsec3(Nsec3 {
                    hash_algorithm,
                    flags,
                    iterations,
                    salt,
                    next_hashed_owner,
                    types: NsecTypeMask::parse(rd)?,
                })
            }
            _ => RData::Opaque { type_code, data: rd.take_rest().to_vec() },
        };
        if !rd.is_empty() {
            return Err(WireError::InvalidLength);
        }
        Ok(data)
    }

    /// The canonical RDATA encoding: uncompressed, with embedded names
    /// lowercased. This is the form signatures are computed over.
    pub(crate) fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        match self {
            RData::Ns { host } => host.write_canonical(&mut out),
            RData::CName { target } => target.write_canonical(&mut out),
            RData::DName { target } => target.write_canonical(&mut out),
            RData::DnsKey(key) => {
                out.extend_from_slice(&key.flags.to_be_bytes());
                out.push(key.protocol);
                out.push(key.algorithm);
                out.extend_from_slice(&key.public_key);
            }
            RData::Ds(ds) => {
                out.extend_from_slice(&ds.key_tag.to_be_bytes());
                out.push(ds.algorithm);
                out.push(ds.digest_type);
                out.extend_from_slice(&ds.digest);
            }
            RData::Rrsig(sig) => {
                out.extend_from_slice(&sig.type_covered.to_u16().to_be_bytes());
                out.push(sig.algorithm);
                out.push(sig.labels);
                out.extend_from_slice(&sig.original_ttl.to_be_bytes());
                out.extend_from_slice(&sig.expiration.to_be_bytes());
                out.extend_from_slice(&sig.inception.to_be_bytes());
                out.extend_from_slice(&sig.key_tag.to_be_bytes());
                sig.signer.write_canonical(&mut out);
                out.extend_from_slice(&sig.signature);
            }
            RData::Nsec(nsec) => {
                nsec.next_owner.write_canonical(&mut out);
                nsec.types.write(&mut out);
            }
            RData::Nsec3(n3) => {
                out.push(n3.hash_algorithm);
                out.push(n3.flags);
                out.extend_from_slice(&n3.iterations.to_be_bytes());
                out.push(n3.salt.len() as u8);
                out.extend_from_slice(&n3.salt);
                out.push(n3.next_hashed_owner.len() as u8);
                out.extend_from_slice(&n3.next_hashed_owner);
                n3.types.write(&mut out);
            }
            RData::Opaque { data, .. } => out.extend_from_slice(data),
        }
        out
    }
}

/// A single resource record: owner name, class, TTL and typed RDATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: Name,
    pub class: RecordClass,
    pub ttl: u32,
    pub data: RData,
}

impl Record {
    pub fn rtype(&self) -> RecordType {
        match &self.data {
            RData::Ns { .. } => RecordType::Ns,
            RData::CName { .. } => RecordType::CName,
            RData::DName { .. } => RecordType::DName,
            RData::DnsKey(_) => RecordType::DnsKey,
            RData::Ds(_) => RecordType::Ds,
            RData::Rrsig(_) => RecordType::Rrsig,
            RData::Nsec(_) => RecordType::Nsec,
            RData::Nsec3(_) => RecordType::Nsec3,
            RData::Opaque { type_code, .. } => RecordType::from_u16(*type_code),
        }
    }
}

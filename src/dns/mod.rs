//! The wire codec: decoding a stream of resource records from DNS wire
//! format and re-encoding records in their canonical form.

pub mod common;
pub mod enums;
pub mod name;
pub mod resource;

use common::WireCursor;
use enums::RecordClass;
use resource::{RData, Record};
use thiserror::Error;

/// Structural problems in the wire encoding of a record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("record stream ended mid-field")]
    Truncated,
    #[error("invalid label")]
    InvalidLabel,
    #[error("invalid domain name")]
    InvalidName,
    #[error("compression pointer is forward-referencing or chains too deep")]
    BadPointer,
    #[error("length field does not match the data present")]
    InvalidLength,
    #[error("unsupported record class {0}")]
    UnsupportedClass(u16),
}

/// Parses a stream of concatenated wire-format resource records, as carried
/// in an RFC 9102 `AuthenticationChain` (no message header, no padding).
///
/// Every record must parse; a stream that ends mid-record fails with
/// [`WireError::Truncated`]. Unknown record types are preserved as
/// [`RData::Opaque`].
pub fn parse_rr_stream(buf: &[u8]) -> Result<Vec<Record>, WireError> {
    let mut cursor = WireCursor::over(buf);
    let mut records = Vec::with_capacity(32);
    while !cursor.is_empty() {
        records.push(parse_rr(&mut cursor)?);
    }
    Ok(records)
}

fn parse_rr(cursor: &mut WireCursor<'_>) -> Result<Record, WireError> {
    let name = cursor.read_name()?;
    let type_code = cursor.read_u16()?;
    let class = RecordClass::from_u16(cursor.read_u16()?)?;
    let ttl = cursor.read_u32()?;
    let rdata_len = cursor.read_u16()? as usize;
    if cursor.remaining() < rdata_len {
        return Err(WireError::Truncated);
    }
    let mut rdata = WireCursor::window(cursor.buf, cursor.pos, cursor.pos + rdata_len);
    cursor.pos += rdata_len;
    let data = RData::parse(type_code, &mut rdata)?;
    Ok(Record { name, class, ttl, data })
}

/// Appends the record in canonical wire form: lowercase owner, no
/// compression, embedded names lowercased and expanded. This is the encoding
/// DNSSEC signatures are computed over, regardless of how a record was
/// encoded when received.
pub fn write_rr(record: &Record, out: &mut Vec<u8>) {
    record.name.write_canonical(out);
    out.extend_from_slice(&record.rtype().to_u16().to_be_bytes());
    out.extend_from_slice(&record.class.to_u16().to_be_bytes());
    out.extend_from_slice(&record.ttl.to_be_bytes());
    let rdata = record.data.canonical_bytes();
    out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    out.extend_from_slice(&rdata);
}

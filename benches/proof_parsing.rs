use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use gjallar::dns::resource::{DnsKey, Ds, Nsec, NsecTypeMask, Rrsig};
use gjallar::{Name, RData, Record, RecordClass, RecordType, parse_rr_stream, write_rr};

fn name(s: &str) -> Name {
    Name::try_from(s).unwrap()
}

/// A representative proof-sized stream: a few zones' worth of keys,
/// delegations, signatures and leaf records.
fn sample_stream() -> Vec<u8> {
    let mut records = Vec::new();
    for i in 0..8 {
        let zone = format!("zone{i}.example.");
        records.push(Record {
            name: name(&zone),
            class: RecordClass::In,
            ttl: 3600,
            data: RData::DnsKey(DnsKey {
                flags: 257,
                protocol: 3,
                algorithm: 13,
                public_key: vec![i as u8; 64],
            }),
        });
        records.push(Record {
            name: name(&zone),
            class: RecordClass::In,
            ttl: 3600,
            data: RData::Ds(Ds { key_tag: 1000 + i, algorithm: 13, digest_type: 2, digest: vec![0xcd; 32] }),
        });
        records.push(Record {
            name: name(&zone),
            class: RecordClass::In,
            ttl: 3600,
            data: RData::Rrsig(Rrsig {
                type_covered: RecordType::DnsKey,
                algorithm: 13,
                labels: 2,
                original_ttl: 3600,
                expiration: 1700000000,
                inception: 1690000000,
                key_tag: 1000 + i,
                signer: name(&zone),
                signature: vec![0xee; 64],
            }),
        });
        records.push(Record {
            name: name(&format!("a.{zone}")),
            class: RecordClass::In,
            ttl: 3600,
            data: RData::Nsec(Nsec {
                next_owner: name(&format!("b.{zone}")),
                types: NsecTypeMask::from_types(&[RecordType::A, RecordType::Rrsig, RecordType::Nsec]),
            }),
        });
        records.push(Record {
            name: name(&format!("txt.{zone}")),
            class: RecordClass::In,
            ttl: 30,
            data: RData::Opaque { type_code: 16, data: b"\x10benchmark record".to_vec() },
        });
    }
    let mut buf = Vec::new();
    for r in &records {
        write_rr(r, &mut buf);
    }
    buf
}

fn bench_parse_rr_stream(c: &mut Criterion) {
    let stream = sample_stream();
    c.bench_function("parse_rr_stream", |b| {
        b.iter(|| parse_rr_stream(black_box(&stream)).unwrap())
    });
}

fn bench_canonical_reencode(c: &mut Criterion) {
    let stream = sample_stream();
    let records = parse_rr_stream(&stream).unwrap();
    c.bench_function("write_rr_canonical", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(stream.len());
            for r in black_box(&records) {
                write_rr(r, &mut out);
            }
            out
        })
    });
}

criterion_group!(benches, bench_parse_rr_stream, bench_canonical_reencode);
criterion_main!(benches);

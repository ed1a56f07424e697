//! Benchmark for command rendering and reply decoding
//!
//! Every lifecycle operation renders at least two commands and decodes
//! as many replies, so both sit on the hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hedvig_adapter::cluster::{decode, Command, Operation, Params, SessionToken, Shape};

fn add_disk_command() -> Command {
    let params = Params::new()
        .string("name", "bench-disk-0001")
        .and_then(|p| p.symbol("diskType", "BLOCK"))
        .and_then(|p| p.symbol("residence", "HDD"))
        .map(|p| {
            p.object("size", Params::new().int("value", 512))
                .int("replicationFactor", 3)
                .boolean("deduplication", false)
                .boolean("compressed", true)
                .int("blockSize", 4096)
        })
        .unwrap();
    Command::new(Operation::AddVirtualDisk, params)
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));

    let session = SessionToken::new("0123456789abcdef0123456789abcdef");

    group.bench_function("encode_add_virtual_disk", |b| {
        b.iter(|| {
            let command = add_disk_command().with_session(&session);
            black_box(command.encode())
        });
    });

    group.bench_function("encode_acl_grant", |b| {
        b.iter(|| {
            let params = Params::new()
                .strings("virtualDisks", [black_box("d1")])
                .and_then(|p| p.string("host", "h1"))
                .and_then(|p| p.string("address", "10.0.0.5"))
                .and_then(|p| p.string("type", "host"))
                .unwrap();
            black_box(Command::new(Operation::PersistACLAccess, params).encode())
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");
    group.throughput(Throughput::Elements(1));

    let details = r#"{"status":"ok","requestId":"r-1","result":{"vDiskName":"d1","size":{"units":"GB","value":9},"diskType":"BLOCK","residence":"HDD","replicationFactor":3,"targetLocations":["ctrl-a:3260","ctrl-b:3260"]}}"#;
    group.bench_function("decode_details", |b| {
        b.iter(|| decode(Operation::VirtualDiskDetails, black_box(details), Shape::Object).unwrap());
    });

    let acl: String = {
        let records: Vec<String> = (0..64)
            .map(|i| format!(r#"{{"host":"h{}","initiator":[{{"ip":"10.0.0.{}","name":"h{}"}}]}}"#, i, i, i))
            .collect();
        format!(r#"{{"status":"ok","result":[{}]}}"#, records.join(","))
    };
    group.bench_function("decode_acl_listing_64", |b| {
        b.iter(|| decode(Operation::GetACLInformation, black_box(&acl), Shape::Records).unwrap());
    });

    let items = r#"{"status":"ok","result":[{"name":"ctrl-a","status":"ok"},{"name":"ctrl-b","status":"error","message":"target offline"}]}"#;
    group.bench_function("classify_items", |b| {
        b.iter(|| {
            let envelope = decode(Operation::AddLun, black_box(items), Shape::Items).unwrap();
            black_box(envelope.classify().is_err())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);

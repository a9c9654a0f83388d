#[macro_use]
extern crate criterion;
extern crate ned;

use criterion::{Criterion, Throughput};
use ned::{NeParser, decode_executable};
use std::io::Cursor;

/// An NE image with `types` integer resource types, one resource each.
fn synthetic_image(types: u16) -> Vec<u8> {
    let mut image = vec![0_u8; 0x80];
    image[0..2].copy_from_slice(b"MZ");
    image[0x3C..0x3E].copy_from_slice(&0x80_u16.to_le_bytes());

    let mut ne = [0_u8; 64];
    ne[0..2].copy_from_slice(b"NE");
    ne[0x24..0x26].copy_from_slice(&0xC0_u16.to_le_bytes());
    ne[0x34..0x36].copy_from_slice(&types.to_le_bytes());
    ne[0x36] = 2;
    image.extend_from_slice(&ne);

    image.extend_from_slice(&4_u16.to_le_bytes());
    for i in 0..types {
        image.extend_from_slice(&(0x8001 + i % 16).to_le_bytes());
        image.extend_from_slice(&1_u16.to_le_bytes());
        image.extend_from_slice(&0_u32.to_le_bytes());
    }
    image.extend_from_slice(&[0, 0]);
    image
}

fn criterion_benchmark(c: &mut Criterion) {
    let image = synthetic_image(256);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(image.len() as u64));
    group.bench_function("decode_executable 256 types", |b| {
        b.iter(|| {
            let exe = decode_executable(&mut Cursor::new(image.as_slice())).unwrap();
            assert_eq!(exe.resources().unwrap().len(), 256);
        })
    });
    group.bench_function("NeParser::parse 256 types", |b| {
        b.iter(|| {
            let exe = NeParser::from_buffer(image.clone()).parse();
            assert!(exe.is_ready());
        })
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

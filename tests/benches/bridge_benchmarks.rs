//! # Bridge Withdrawal Benchmarks
//!
//! | Path | Operation | Target |
//! |------|-----------|--------|
//! | BinaryCodec | `withdraw` calldata, 18-20 signatures | < 50µs |
//! | Units | decimal string to base units | < 5µs |
//! | SignatureFormatResolver | plain and wrapped signatures | < 10µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use primitive_types::U256;
use qc_18_bridge_withdrawal::algorithms::wrap_signature;
use qc_18_bridge_withdrawal::{
    encode_withdraw, resolve_signature, to_base_units, Address, WithdrawCall,
};

fn withdraw_call(signatures: usize) -> WithdrawCall {
    WithdrawCall {
        token: Address::from_bytes([0x70; 20]),
        user: Address::from_bytes([0x11; 20]),
        amount: U256::from(2_250_000u64),
        expiration: 1_900_000_000,
        code: "bridge-code-1".to_string(),
        recovery_ids: (0..signatures).map(|i| 27 + (i % 2) as u8).collect(),
        rs: (0..signatures * 2).map(|i| [i as u8; 32]).collect(),
    }
}

// ============================================================================
// BinaryCodec
// ============================================================================

fn bench_encode_withdraw(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18-encode-withdraw");

    for signatures in [18usize, 20] {
        let call = withdraw_call(signatures);
        group.throughput(Throughput::Elements(signatures as u64));
        group.bench_with_input(BenchmarkId::new("signatures", signatures), &call, |b, call| {
            b.iter(|| black_box(encode_withdraw(call).map(|encoded| encoded.to_hex())))
        });
    }

    group.finish();
}

// ============================================================================
// Units
// ============================================================================

fn bench_to_base_units(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18-units");

    for (label, amount, decimals) in [
        ("whole_6", "1500", 6u8),
        ("fraction_6", "2.25", 6),
        ("fraction_18", "0.000000000000000001", 18),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| black_box(to_base_units(black_box(amount), decimals)))
        });
    }

    group.finish();
}

// ============================================================================
// SignatureFormatResolver
// ============================================================================

fn bench_resolve_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18-signature-format");

    let mut inner = vec![0xab; 64];
    inner.push(28);
    let plain = format!("0x{}", hex::encode(&inner));
    let wrapped = format!(
        "0x{}",
        hex::encode(wrap_signature(
            &Address::from_bytes([0xfa; 20]),
            &[0x5a; 196],
            &inner
        ))
    );

    group.bench_function("plain", |b| {
        b.iter(|| black_box(resolve_signature(black_box(&plain))))
    });
    group.bench_function("wrapped", |b| {
        b.iter(|| black_box(resolve_signature(black_box(&wrapped))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_withdraw,
    bench_to_base_units,
    bench_resolve_signature
);
criterion_main!(benches);

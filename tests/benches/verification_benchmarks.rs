//! # Light Client Verification Benchmarks
//!
//! | Area | Operation | Expectation |
//! |------|-----------|-------------|
//! | Accumulator | Append to frozen subtrees | O(log n) per leaf |
//! | Accumulator | Leaf proof verify | O(log n) hashes |
//! | Sparse Merkle | Inclusion proof verify | <= 256 hashes |
//! | Signatures | Quorum verify | Parallel past 16 signatures |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use light_client_verify::algorithms::{MerkleAccumulator, SparseMerkleTree};
use light_client_verify::domain::{
    BlockInfo, InMemoryAccumulator, LedgerInfo, LedgerInfoWithSignatures, TransactionAccumulatorHasher,
};
use light_client_verify::test_utils::validator_set_for_epoch;
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared_crypto::{HashDomain, HashValue};
use std::time::Duration;

fn random_hashes(n: usize) -> Vec<HashValue> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|_| HashValue::new(rng.gen())).collect()
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

fn bench_accumulator_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator-append");

    for size in [1_000usize, 10_000, 100_000] {
        let base = InMemoryAccumulator::<TransactionAccumulatorHasher>::from_leaves(&random_hashes(size));
        let batch = random_hashes(100);

        group.throughput(Throughput::Elements(batch.len() as u64));
        group.bench_with_input(BenchmarkId::new("append_100", size), &batch, |b, batch| {
            b.iter(|| black_box(base.append(batch)))
        });
    }

    group.finish();
}

fn bench_accumulator_proofs(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator-proofs");

    let leaves = random_hashes(1 << 14);
    let tree = MerkleAccumulator::<TransactionAccumulatorHasher>::new(leaves.clone());
    let root = tree.root_hash();

    let index = 9_999u64;
    let proof = tree.get_proof(index).unwrap();
    group.bench_function("leaf_proof_verify", |b| {
        b.iter(|| black_box(proof.verify(root, leaves[index as usize], index).is_ok()))
    });

    let range = tree.get_range_proof(Some(1_000), 500).unwrap();
    group.bench_function("range_proof_verify_500", |b| {
        b.iter(|| black_box(range.verify(root, Some(1_000), &leaves[1_000..1_500]).is_ok()))
    });

    let client = InMemoryAccumulator::<TransactionAccumulatorHasher>::from_leaves(&leaves[..10_000]);
    let consistency = tree.get_consistency_proof(10_000).unwrap();
    group.bench_function("consistency_proof_verify", |b| {
        b.iter(|| black_box(consistency.verify(&client, tree.num_leaves(), root).is_ok()))
    });

    group.finish();
}

// ============================================================================
// SPARSE MERKLE
// ============================================================================

fn bench_sparse_merkle(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse-merkle");

    let mut tree = SparseMerkleTree::new();
    let keys = random_hashes(10_000);
    for key in &keys {
        tree.insert(*key, HashDomain::AccountStateBlob.hash(key.as_bytes()));
    }
    let root = tree.root_hash();

    let key = keys[1_234];
    let value_hash = HashDomain::AccountStateBlob.hash(key.as_bytes());
    let proof = tree.get_proof(&key);
    group.bench_function("inclusion_verify", |b| {
        b.iter(|| black_box(proof.verify_by_hash(root, key, Some(value_hash)).is_ok()))
    });

    let absent = HashDomain::TestOnly.hash(b"absent");
    let absent_proof = tree.get_proof(&absent);
    group.bench_function("non_inclusion_verify", |b| {
        b.iter(|| black_box(absent_proof.verify_by_hash(root, absent, None).is_ok()))
    });

    group.finish();
}

// ============================================================================
// SIGNATURES
// ============================================================================

fn bench_quorum_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("quorum-verification");
    group.measurement_time(Duration::from_secs(10));

    for size in [4usize, 15, 16] {
        let (signers, epoch_info) = validator_set_for_epoch(1, size);
        let ledger_info = LedgerInfo::new(
            BlockInfo {
                epoch: 1,
                round: 7,
                id: HashValue::new([7; 32]),
                executed_state_id: HashValue::new([9; 32]),
                version: 1_000,
                timestamp_usecs: 1_000_000,
                next_epoch_info: None,
            },
            HashValue::zero(),
        );
        let signed = LedgerInfoWithSignatures::sign_with(ledger_info, &signers).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("verify_signatures", size), &signed, |b, signed| {
            b.iter(|| black_box(signed.verify_signatures(&epoch_info.verifier).is_ok()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_accumulator_append,
    bench_accumulator_proofs,
    bench_sparse_merkle,
    bench_quorum_verification,
);
criterion_main!(benches);

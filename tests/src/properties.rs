//! # Properties
//!
//! Randomized agreement between the proof builders and the verifiers.

#[cfg(test)]
mod tests {
    use light_client_verify::algorithms::{MerkleAccumulator, SparseMerkleProof, SparseMerkleTree};
    use light_client_verify::application::expected_event_sequence_numbers;
    use light_client_verify::domain::{InMemoryAccumulator, TestOnlyHasher, VerifyError};
    use proptest::collection::btree_set;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use shared_crypto::{HashDomain, HashValue};

    fn leaves(seed: u64, n: usize) -> Vec<HashValue> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| HashValue::new(rng.gen())).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_leaf_proof_verifies(seed in any::<u64>(), n in 1usize..300, pick in any::<prop::sample::Index>()) {
            let all = leaves(seed, n);
            let tree = MerkleAccumulator::<TestOnlyHasher>::new(all.clone());
            let client = InMemoryAccumulator::<TestOnlyHasher>::from_leaves(&all);
            prop_assert_eq!(tree.root_hash(), client.root_hash());

            let index = pick.index(n);
            let proof = tree.get_proof(index as u64).unwrap();
            prop_assert!(proof.verify(client.root_hash(), all[index], index as u64).is_ok());
        }

        #[test]
        fn prop_range_proof_verifies(
            seed in any::<u64>(),
            n in 1usize..200,
            a in any::<prop::sample::Index>(),
            b in any::<prop::sample::Index>(),
        ) {
            let all = leaves(seed, n);
            let tree = MerkleAccumulator::<TestOnlyHasher>::new(all.clone());
            let (x, y) = (a.index(n), b.index(n));
            let (first, last) = (x.min(y), x.max(y));

            let proof = tree.get_range_proof(Some(first as u64), (last - first + 1) as u64).unwrap();
            prop_assert!(proof.verify(tree.root_hash(), Some(first as u64), &all[first..=last]).is_ok());
        }

        #[test]
        fn prop_consistency_proof_extends_client(seed in any::<u64>(), old in 0usize..150, grow in 0usize..150) {
            let all = leaves(seed, old + grow);
            let server = MerkleAccumulator::<TestOnlyHasher>::new(all.clone());
            let client = InMemoryAccumulator::<TestOnlyHasher>::from_leaves(&all[..old]);

            let proof = server.get_consistency_proof(old as u64).unwrap();
            let extended = proof.verify(&client, (old + grow) as u64, server.root_hash()).unwrap();
            let server_summary = server.to_in_memory();
            prop_assert_eq!(extended.root_hash(), server.root_hash());
            prop_assert_eq!(extended.frozen_subtree_roots(), server_summary.frozen_subtree_roots());
        }

        #[test]
        fn prop_sparse_inclusion_and_non_inclusion(keys in btree_set(any::<[u8; 8]>(), 1..64), probe in any::<[u8; 8]>()) {
            let mut tree = SparseMerkleTree::new();
            for key in &keys {
                tree.insert(HashDomain::TestOnly.hash(key), HashDomain::AccountStateBlob.hash(key));
            }
            let root = tree.root_hash();

            for key in &keys {
                let key_hash = HashDomain::TestOnly.hash(key);
                let proof = tree.get_proof(&key_hash);
                prop_assert!(proof.verify_by_hash(root, key_hash, Some(HashDomain::AccountStateBlob.hash(key))).is_ok());
            }

            let probe_hash = HashDomain::TestOnly.hash(&probe);
            let proof = tree.get_proof(&probe_hash);
            if keys.contains(&probe) {
                prop_assert!(proof.verify_by_hash(root, probe_hash, None).is_err());
            } else {
                prop_assert!(proof.verify_by_hash(root, probe_hash, None).is_ok());
            }
        }

        #[test]
        fn prop_non_inclusion_with_missing_siblings_rejected(
            keys in btree_set(any::<[u8; 8]>(), 2..64),
            probe in any::<[u8; 8]>(),
            keep in any::<prop::sample::Index>(),
            from_top in any::<bool>(),
        ) {
            prop_assume!(!keys.contains(&probe));
            let mut tree = SparseMerkleTree::new();
            for key in &keys {
                tree.insert(HashDomain::TestOnly.hash(key), HashDomain::AccountStateBlob.hash(key));
            }
            let root = tree.root_hash();

            let probe_hash = HashDomain::TestOnly.hash(&probe);
            let proof = tree.get_proof(&probe_hash);
            let siblings = proof.siblings();
            prop_assume!(!siblings.is_empty());

            let kept = keep.index(siblings.len());
            let truncated = if from_top {
                siblings[..kept].to_vec()
            } else {
                siblings[siblings.len() - kept..].to_vec()
            };
            let result = SparseMerkleProof::new(proof.leaf(), truncated).verify_by_hash(root, probe_hash, None);
            let rejected = matches!(
                result,
                Err(VerifyError::InvalidNonInclusion(_)) | Err(VerifyError::RootMismatch { .. })
            );
            prop_assert!(rejected);
        }

        #[test]
        fn prop_event_window_is_contiguous(upper in 0u64..1_000, start in any::<u64>(), ascending in any::<bool>(), limit in 0u64..50) {
            let start = if ascending || start % 4 == 0 { start % (upper + 2) } else { u64::MAX };
            let window = expected_event_sequence_numbers(upper, start, ascending, limit);

            prop_assert!(window.len() as u64 <= limit);
            prop_assert!(window.iter().all(|seq| *seq < upper));
            let step_ok = window.windows(2).all(|pair| {
                if ascending { pair[1] == pair[0] + 1 } else { pair[1] + 1 == pair[0] }
            });
            prop_assert!(step_ok);
        }
    }

    #[test]
    fn test_changing_one_leaf_changes_root() {
        let first = leaves(1, 33);
        let mut second = first.clone();
        second[17] = HashDomain::TestOnly.hash(b"replaced");
        assert_ne!(
            InMemoryAccumulator::<TestOnlyHasher>::from_leaves(&first).root_hash(),
            InMemoryAccumulator::<TestOnlyHasher>::from_leaves(&second).root_hash()
        );
    }
}

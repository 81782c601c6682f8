//! # Accumulator and Sparse Merkle Flows
//!
//! A server-side tree produces proofs; a client holding only roots or
//! frozen subtrees checks them.

#[cfg(test)]
mod tests {
    use light_client_verify::algorithms::{MerkleAccumulator, SparseMerkleLeafNode, SparseMerkleTree};
    use light_client_verify::domain::{
        AccountStateBlob, AccumulatorHasher, InMemoryAccumulator, TransactionAccumulatorHasher,
        VerifyError,
    };
    use shared_crypto::{CryptoHash, HashDomain, HashValue};

    type Accumulator = InMemoryAccumulator<TransactionAccumulatorHasher>;
    type ServerAccumulator = MerkleAccumulator<TransactionAccumulatorHasher>;

    fn leaf(i: u64) -> HashValue {
        HashDomain::TestOnly.hash(&i.to_le_bytes())
    }

    fn leaves(range: std::ops::Range<u64>) -> Vec<HashValue> {
        range.map(leaf).collect()
    }

    // =========================================================================
    // TRANSACTION ACCUMULATOR
    // =========================================================================

    #[test]
    fn test_five_leaves_then_append_one() {
        crate::init_tracing();

        let five = Accumulator::from_leaves(&leaves(0..5));
        assert_eq!(five.num_leaves(), 5);
        assert_eq!(five.frozen_subtree_roots().len(), 2);

        // 5 = 0b101 has one trailing one: h4 and h5 merge, the 4-leaf root stays
        let six = five.append(&[leaf(5)]);
        assert_eq!(six.num_leaves(), 6);
        assert_eq!(six.frozen_subtree_roots().len(), 2);
        assert_eq!(six.frozen_subtree_roots()[0], five.frozen_subtree_roots()[0]);
        assert_eq!(
            six.frozen_subtree_roots()[1],
            TransactionAccumulatorHasher::hash_internal(&leaf(4), &leaf(5))
        );

        let server = ServerAccumulator::new(leaves(0..6));
        assert_eq!(server.root_hash(), six.root_hash());

        let proof = server.get_proof(2).unwrap();
        assert!(proof.verify(six.root_hash(), leaf(2), 2).is_ok());
        assert!(matches!(
            proof.verify(five.root_hash(), leaf(2), 2),
            Err(VerifyError::RootMismatch { .. })
        ));
    }

    #[test]
    fn test_client_follows_server_with_consistency_proofs() {
        crate::init_tracing();

        let mut server = ServerAccumulator::new(leaves(0..3));
        let mut client = Accumulator::from_leaves(&leaves(0..3));

        for (start, end) in [(3, 4), (4, 9), (9, 16), (16, 17), (17, 40)] {
            server.append(&leaves(start..end));
            let proof = server.get_consistency_proof(client.num_leaves()).unwrap();
            client = proof.verify(&client, server.num_leaves(), server.root_hash()).unwrap();
            assert_eq!(client.root_hash(), server.root_hash());
            assert_eq!(client.num_leaves(), end);
        }
    }

    #[test]
    fn test_consistency_proof_from_forked_history_rejected() {
        let server = ServerAccumulator::new(leaves(0..10));
        let proof = server.get_consistency_proof(6).unwrap();

        let mut forked = leaves(0..6);
        forked[3] = leaf(1_000);
        let client = Accumulator::from_leaves(&forked);

        assert!(matches!(
            proof.verify(&client, 10, server.root_hash()),
            Err(VerifyError::RootMismatch { .. })
        ));
    }

    #[test]
    fn test_range_proofs_across_the_tree() {
        let all = leaves(0..13);
        let server = ServerAccumulator::new(all.clone());
        let root = server.root_hash();

        for (first, count) in [(0, 13), (0, 1), (12, 1), (3, 5), (4, 8), (7, 2)] {
            let proof = server.get_range_proof(Some(first), count).unwrap();
            let range = &all[first as usize..(first + count) as usize];
            assert!(
                proof.verify(root, Some(first), range).is_ok(),
                "range {}..{} should verify",
                first,
                first + count
            );
        }

        let proof = server.get_range_proof(Some(3), 5).unwrap();
        assert!(proof.verify(root, Some(4), &all[4..9]).is_err());
        assert!(proof.verify(root, Some(3), &all[3..7]).is_err());
    }

    #[test]
    fn test_empty_range_proof() {
        let server = ServerAccumulator::new(leaves(0..4));
        let proof = server.get_range_proof(None, 0).unwrap();
        assert!(proof.verify(server.root_hash(), None, &[]).is_ok());
    }

    // =========================================================================
    // SPARSE MERKLE TREE
    // =========================================================================

    fn account_tree(n: u8) -> (SparseMerkleTree, Vec<(HashValue, AccountStateBlob)>) {
        let mut tree = SparseMerkleTree::new();
        let accounts: Vec<_> = (0..n)
            .map(|i| {
                let key = HashDomain::TestOnly.hash(&[i]);
                let blob = AccountStateBlob::new(vec![i; 8]);
                (key, blob)
            })
            .collect();
        for (key, blob) in &accounts {
            tree.insert(*key, blob.hash().unwrap());
        }
        (tree, accounts)
    }

    #[test]
    fn test_account_inclusion_and_non_inclusion() {
        let (tree, accounts) = account_tree(20);
        let root = tree.root_hash();

        for (key, blob) in &accounts {
            let proof = tree.get_proof(key);
            assert!(proof.verify(root, *key, Some(blob)).is_ok());
            assert!(proof.verify(root, *key, None).is_err());
        }

        let absent = HashDomain::TestOnly.hash(b"absent");
        let proof = tree.get_proof(&absent);
        assert!(proof.verify(root, absent, None).is_ok());
        assert!(proof
            .verify(root, absent, Some(&AccountStateBlob::new(vec![1])))
            .is_err());
    }

    #[test]
    fn test_removed_account_proves_absent() {
        let (mut tree, accounts) = account_tree(6);
        let (key, blob) = accounts[2].clone();
        tree.remove(&key);

        let proof = tree.get_proof(&key);
        assert!(proof.verify(tree.root_hash(), key, None).is_ok());
        assert!(proof.verify(tree.root_hash(), key, Some(&blob)).is_err());
    }

    #[test]
    fn test_sparse_range_proof_for_rightmost_leaf() {
        let (tree, accounts) = account_tree(9);
        let root = tree.root_hash();

        let (key, blob) = &accounts[4];
        let (proof, left_siblings) = tree.get_range_proof(key).unwrap();
        let leaf = SparseMerkleLeafNode::new(*key, blob.hash().unwrap());
        assert!(proof.verify(root, leaf, &left_siblings).is_ok());

        let wrong = SparseMerkleLeafNode::new(*key, HashValue::zero());
        assert!(proof.verify(root, wrong, &left_siblings).is_err());
    }
}

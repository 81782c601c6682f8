//! # Accumulator Positions
//!
//! A [`Position`] names a node of the accumulator's binary tree by its
//! in-order traversal index, so every navigation step is a handful of bit
//! operations.
//!
//! ```text
//!      3
//!     /  \
//!    /    \
//!   1      5   <- positions (in-order index)
//!  / \    / \
//! 0   2  4   6
//!
//! 0   1  2   3 <- leaf indices
//! ```
//!
//! Leaves sit at even positions and level 0. A node at level `l` has its
//! `l` lowest bits set and bit `l` clear.

use super::errors::{VerifyError, VerifyResult};
use super::invariants::{MAX_ACCUMULATOR_LEAVES, MAX_ACCUMULATOR_PROOF_DEPTH};
use std::fmt;

/// Which child of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeDirection {
    /// Left child
    Left,
    /// Right child
    Right,
}

/// Node position in an accumulator tree (in-order index).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u64);

impl Position {
    /// Position with the given in-order index.
    pub const fn from_inorder_index(index: u64) -> Self {
        Self(index)
    }

    /// In-order index of this node.
    pub const fn to_inorder_index(self) -> u64 {
        self.0
    }

    /// Position visited `index`-th in a post-order traversal.
    pub fn from_postorder_index(index: u64) -> Self {
        Self(postorder_to_inorder(index))
    }

    /// Post-order index of this node.
    pub fn to_postorder_index(self) -> u64 {
        inorder_to_postorder(self.0)
    }

    /// Position of the `leaf_index`-th leaf.
    pub fn from_leaf_index(leaf_index: u64) -> Self {
        Self::from_level_and_pos(0, leaf_index)
    }

    /// Position of the `pos`-th node (counting from 0 on the left) at `level`.
    pub fn from_level_and_pos(level: u32, pos: u64) -> Self {
        debug_assert!(level < u64::BITS);
        let level_one_bits = (1u64 << level) - 1;
        let shifted_pos = pos.checked_shl(level + 1).unwrap_or(0);
        Self(shifted_pos | level_one_bits)
    }

    /// Height above the leaves; 0 for a leaf.
    pub fn level(self) -> u32 {
        (!self.0).trailing_zeros()
    }

    /// Whether the node is a leaf.
    pub fn is_leaf(self) -> bool {
        self.0 & 1 == 0
    }

    /// Whether parent, child and sibling arithmetic stays inside `u64`.
    /// Only the last two in-order indices fail this.
    pub fn is_navigable(self) -> bool {
        self.0 < u64::MAX - 1
    }

    /// Number of nodes to the left of this one on the same level.
    pub fn pos_counting_from_left(self) -> u64 {
        self.0.checked_shr(self.level() + 1).unwrap_or(0)
    }

    /// Parent node.
    ///
    /// # Panics
    ///
    /// If the position is not [navigable](Self::is_navigable).
    pub fn parent(self) -> Self {
        assert!(self.is_navigable(), "no parent for {:?}", self);
        let rightmost_zero = isolate_rightmost_zero_bit(self.0);
        Self((self.0 | rightmost_zero) & !(rightmost_zero << 1))
    }

    /// Left child. Panics on a leaf.
    pub fn left_child(self) -> Self {
        self.child(NodeDirection::Left)
    }

    /// Right child. Panics on a leaf.
    pub fn right_child(self) -> Self {
        self.child(NodeDirection::Right)
    }

    /// Child in the given direction.
    ///
    /// # Panics
    ///
    /// On a leaf, or if the position is not [navigable](Self::is_navigable).
    pub fn child(self, direction: NodeDirection) -> Self {
        assert!(!self.is_leaf(), "leaf {:?} has no children", self);
        assert!(self.is_navigable(), "no children for {:?}", self);
        let rightmost_zero = isolate_rightmost_zero_bit(self.0);
        let direction_bit = match direction {
            NodeDirection::Left => 0,
            NodeDirection::Right => rightmost_zero,
        };
        Self((self.0 | direction_bit) & !(rightmost_zero >> 1))
    }

    /// The other child of this node's parent. Panics like [`parent`](Self::parent).
    pub fn sibling(self) -> Self {
        assert!(self.is_navigable(), "no sibling for {:?}", self);
        Self(self.0 ^ (isolate_rightmost_zero_bit(self.0) << 1))
    }

    /// Whether this node is the left child of its parent.
    ///
    /// Once the level's trailing ones are stripped, a left child reads
    /// `..00(11..)` and a right child `..10(11..)`. Panics like
    /// [`parent`](Self::parent).
    pub fn is_left_child(self) -> bool {
        assert!(self.is_navigable(), "no parent for {:?}", self);
        self.0 & (isolate_rightmost_zero_bit(self.0) << 1) == 0
    }

    /// Whether this node is the right child of its parent.
    pub fn is_right_child(self) -> bool {
        !self.is_left_child()
    }

    /// Root of the smallest perfect tree containing the given leaf.
    pub fn root_from_leaf_index(leaf_index: u64) -> Self {
        let leaf = Self::from_leaf_index(leaf_index);
        Self(smear_ones_for_u64(leaf.0) >> 1)
    }

    /// Root of an accumulator with `leaf_count` leaves (at least one).
    pub fn root_from_leaf_count(leaf_count: u64) -> Self {
        debug_assert!(leaf_count > 0);
        Self::root_from_leaf_index(leaf_count.saturating_sub(1))
    }

    /// Level of the root of an accumulator with `leaf_count` leaves (at least one).
    pub fn root_level_from_leaf_count(leaf_count: u64) -> u32 {
        debug_assert!(leaf_count > 0);
        let index = leaf_count.saturating_sub(1);
        MAX_ACCUMULATOR_PROOF_DEPTH as u32 + 1 - index.leading_zeros()
    }

    /// Rightmost leaf of this node's subtree (itself for a leaf).
    pub fn right_most_child(self) -> Self {
        let level = self.level();
        Self(self.0 + ((1u64 << level) - 1))
    }

    /// Leftmost leaf of this node's subtree (itself for a leaf).
    pub fn left_most_child(self) -> Self {
        Self(turn_off_right_most_n_bits(self.0, self.level()))
    }

    /// Whether the subtree under this node is complete once leaf
    /// `leaf_index` exists, i.e. contains no placeholder.
    pub fn is_freezable(self, leaf_index: u64) -> bool {
        let leaf = Self::from_leaf_index(leaf_index);
        self.right_most_child().0 <= leaf.0
    }

    /// Whether this node is a placeholder when `leaf_index` is the last leaf:
    /// it lies to the right of that leaf and has no real leaf under it.
    pub fn is_placeholder(self, leaf_index: u64) -> bool {
        let leaf = Self::from_leaf_index(leaf_index);
        self.0 > leaf.0 && self.left_most_child().0 > leaf.0
    }

    /// This node followed by every ancestor up to the root of the full tree.
    pub fn iter_ancestor(self) -> AncestorIterator {
        AncestorIterator {
            position: Some(self),
        }
    }

    /// Siblings of this node and of each ancestor, bottom up.
    pub fn iter_ancestor_sibling(self) -> AncestorSiblingIterator {
        AncestorSiblingIterator {
            position: Some(self),
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({})", self.0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Walks from a position up through its ancestors.
///
/// Stops after the root of the largest possible accumulator.
#[derive(Clone, Debug)]
pub struct AncestorIterator {
    position: Option<Position>,
}

impl Iterator for AncestorIterator {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        let current = self.position?;
        self.position = next_ancestor(current);
        Some(current)
    }
}

/// Yields the sibling of a position, then of each of its ancestors.
#[derive(Clone, Debug)]
pub struct AncestorSiblingIterator {
    position: Option<Position>,
}

impl Iterator for AncestorSiblingIterator {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        let current = self.position?;
        if current.level() as usize >= MAX_ACCUMULATOR_PROOF_DEPTH {
            self.position = None;
            return None;
        }
        self.position = next_ancestor(current);
        Some(current.sibling())
    }
}

fn next_ancestor(position: Position) -> Option<Position> {
    if position.level() as usize >= MAX_ACCUMULATOR_PROOF_DEPTH {
        None
    } else {
        Some(position.parent())
    }
}

/// Roots of the frozen (perfect) subtrees of an accumulator, left to right.
///
/// Each set bit of the leaf count is one frozen subtree. With 5 = 0b101
/// leaves the roots cover leaves 0..=3 and leaf 4:
///
/// ```text
///          Non-fzn
///         /       \
///       Fzn2     Non-fzn
///      /   \      /    \
///    Fzn1  Fzn3  L4   [Placeholder]
///    /  \  /  \
///   L0 L1 L2  L3
/// ```
#[derive(Clone, Debug)]
pub struct FrozenSubTreeIterator {
    bitmap: u64,
    seen_leaves: u64,
}

impl FrozenSubTreeIterator {
    /// Iterate the frozen subtree roots of an accumulator with `num_leaves` leaves.
    pub fn new(num_leaves: u64) -> Self {
        Self {
            bitmap: num_leaves,
            seen_leaves: 0,
        }
    }
}

impl Iterator for FrozenSubTreeIterator {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.bitmap == 0 {
            return None;
        }

        // The biggest remaining subtree is the bitmap's MSB. Its root sits
        // `num_leaves - 1` positions right of its leftmost leaf.
        let root_offset = smear_ones_for_u64(self.bitmap) >> 1;
        let num_leaves = root_offset + 1;
        let leftmost_leaf = Position::from_leaf_index(self.seen_leaves);
        let root = Position::from_inorder_index(leftmost_leaf.to_inorder_index() + root_offset);

        self.bitmap &= !num_leaves;
        self.seen_leaves += num_leaves;
        Some(root)
    }
}

/// Roots of the subtrees that must be appended to an accumulator of
/// `current_num_leaves` leaves to grow it to `new_num_leaves` leaves.
#[derive(Clone, Debug)]
pub struct FrozenSubtreeSiblingIterator {
    current_num_leaves: u64,
    remaining_new_leaves: u64,
}

impl FrozenSubtreeSiblingIterator {
    /// Fails if the sizes shrink or exceed the accumulator capacity.
    pub fn new(current_num_leaves: u64, new_num_leaves: u64) -> VerifyResult<Self> {
        if new_num_leaves > MAX_ACCUMULATOR_LEAVES {
            return Err(VerifyError::InvalidInput(format!(
                "An accumulator can have at most 2^{} leaves. Provided num_leaves: {}",
                MAX_ACCUMULATOR_PROOF_DEPTH, new_num_leaves
            )));
        }
        if current_num_leaves > new_num_leaves {
            return Err(VerifyError::InvalidInput(format!(
                "Number of leaves needs to be increasing: current_num_leaves: {}, new_num_leaves: {}",
                current_num_leaves, new_num_leaves
            )));
        }
        Ok(Self {
            current_num_leaves,
            remaining_new_leaves: new_num_leaves - current_num_leaves,
        })
    }

    /// Largest perfect batch that fits in the remaining leaves.
    fn next_new_leaf_batch(&self) -> u64 {
        let zeros = self.remaining_new_leaves.leading_zeros();
        1 << (MAX_ACCUMULATOR_PROOF_DEPTH as u32 - zeros)
    }
}

impl Iterator for FrozenSubtreeSiblingIterator {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.remaining_new_leaves == 0 {
            return None;
        }

        // Pair up with the rightmost frozen subtree when possible, otherwise
        // take the largest batch the remainder allows.
        let next_subtree_leaves = if self.current_num_leaves > 0 {
            let rightmost_frozen_subtree_leaves = 1u64 << self.current_num_leaves.trailing_zeros();
            if self.remaining_new_leaves >= rightmost_frozen_subtree_leaves {
                rightmost_frozen_subtree_leaves
            } else {
                self.next_new_leaf_batch()
            }
        } else {
            self.next_new_leaf_batch()
        };

        let first_leaf_index = self.current_num_leaves;
        let last_leaf_index = first_leaf_index + next_subtree_leaves - 1;
        self.current_num_leaves += next_subtree_leaves;
        self.remaining_new_leaves -= next_subtree_leaves;

        Some(Position::from_inorder_index(first_leaf_index + last_leaf_index))
    }
}

/// Number of descendants of a node.
fn children_of_node(node: u64) -> u64 {
    (isolate_rightmost_zero_bit(node) << 1).wrapping_sub(2)
}

/// Nodes visited before `node` in post-order, excluding its own descendants.
fn nodes_to_left_of(node: u64) -> u64 {
    // node = 0b0100111 gives ones_up_to_level = 0b111
    let ones_up_to_level = isolate_rightmost_zero_bit(node).wrapping_sub(1);
    // Each remaining set bit is a right turn; a right turn at level n skips
    // a left sibling subtree of 2^n - 1 nodes.
    let unset_level_zeros = node ^ ones_up_to_level;
    unset_level_zeros - u64::from(unset_level_zeros.count_ones())
}

/// Post-order index of the node with in-order index `node`.
pub fn inorder_to_postorder(node: u64) -> u64 {
    children_of_node(node) + nodes_to_left_of(node)
}

/// In-order index of the node with post-order index `node`.
pub fn postorder_to_inorder(mut node: u64) -> u64 {
    // A perfect tree of height n has 2^n - 1 nodes.
    let mut full_binary_size = u64::MAX;
    let mut bitmap = 0u64;
    for i in (0..u64::BITS).rev() {
        if node >= full_binary_size {
            node -= full_binary_size;
            bitmap |= 1 << i;
        }
        full_binary_size >>= 1;
    }
    let level = node as u32;
    let pos = bitmap >> level;
    Position::from_level_and_pos(level, pos).to_inorder_index()
}

/// Every bit at or below the MSB set to one.
fn smear_ones_for_u64(v: u64) -> u64 {
    let mut n = v;
    n |= n >> 1;
    n |= n >> 2;
    n |= n >> 4;
    n |= n >> 8;
    n |= n >> 16;
    n |= n >> 32;
    n
}

/// Only the lowest zero bit of `v`, set.
fn isolate_rightmost_zero_bit(v: u64) -> u64 {
    !v & v.wrapping_add(1)
}

fn turn_off_right_most_n_bits(v: u64, n: u32) -> u64 {
    v.checked_shr(n)
        .and_then(|shifted| shifted.checked_shl(n))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_leaf_and_level() {
        assert_eq!(Position::from_leaf_index(0).to_inorder_index(), 0);
        assert_eq!(Position::from_leaf_index(3).to_inorder_index(), 6);
        assert!(Position::from_inorder_index(4).is_leaf());
        assert_eq!(Position::from_inorder_index(3).level(), 2);
        assert_eq!(Position::from_inorder_index(5).level(), 1);
        assert_eq!(Position::from_inorder_index(5).pos_counting_from_left(), 1);
        assert_eq!(Position::from_level_and_pos(2, 1).to_inorder_index(), 11);
    }

    #[test]
    fn test_parent_children_sibling() {
        let root = Position::from_inorder_index(3);
        assert_eq!(root.left_child(), Position::from_inorder_index(1));
        assert_eq!(root.right_child(), Position::from_inorder_index(5));
        assert_eq!(Position::from_inorder_index(4).parent(), Position::from_inorder_index(5));
        assert_eq!(Position::from_inorder_index(1).sibling(), Position::from_inorder_index(5));
        assert_eq!(Position::from_inorder_index(2).sibling(), Position::from_inorder_index(0));
        assert!(Position::from_inorder_index(1).is_left_child());
        assert!(Position::from_inorder_index(6).is_right_child());
    }

    #[test]
    fn test_navigable_boundary() {
        assert!(Position::from_inorder_index(u64::MAX - 2).is_navigable());
        assert!(!Position::from_inorder_index(u64::MAX - 1).is_navigable());
        assert!(!Position::from_inorder_index(u64::MAX).is_navigable());
        // Last leaf of a full accumulator
        assert!(!Position::from_leaf_index(MAX_ACCUMULATOR_LEAVES - 1).is_navigable());
    }

    #[test]
    #[should_panic(expected = "no parent")]
    fn test_parent_of_last_positions_panics() {
        let _ = Position::from_inorder_index(u64::MAX - 1).parent();
    }

    #[test]
    #[should_panic(expected = "no parent")]
    fn test_parent_of_max_panics() {
        let _ = Position::from_inorder_index(u64::MAX).parent();
    }

    #[test]
    #[should_panic(expected = "no sibling")]
    fn test_sibling_of_last_positions_panics() {
        let _ = Position::from_inorder_index(u64::MAX - 1).sibling();
    }

    #[test]
    #[should_panic(expected = "no parent")]
    fn test_is_left_child_of_last_positions_panics() {
        let _ = Position::from_inorder_index(u64::MAX - 1).is_right_child();
    }

    #[test]
    #[should_panic(expected = "has no children")]
    fn test_child_of_leaf_panics() {
        let _ = Position::from_leaf_index(3).left_child();
    }

    #[test]
    fn test_root_from_leaf_count() {
        assert_eq!(Position::root_from_leaf_count(1), Position::from_inorder_index(0));
        assert_eq!(Position::root_from_leaf_count(2), Position::from_inorder_index(1));
        assert_eq!(Position::root_from_leaf_count(3), Position::from_inorder_index(3));
        assert_eq!(Position::root_from_leaf_count(5), Position::from_inorder_index(7));
        assert_eq!(Position::root_level_from_leaf_count(1), 0);
        assert_eq!(Position::root_level_from_leaf_count(4), 2);
        assert_eq!(Position::root_level_from_leaf_count(5), 3);
    }

    #[test]
    fn test_subtree_extremes() {
        let root = Position::from_inorder_index(3);
        assert_eq!(root.left_most_child(), Position::from_inorder_index(0));
        assert_eq!(root.right_most_child(), Position::from_inorder_index(6));
        let leaf = Position::from_inorder_index(4);
        assert_eq!(leaf.left_most_child(), leaf);
        assert_eq!(leaf.right_most_child(), leaf);
    }

    #[test]
    fn test_freezable_and_placeholder() {
        // Last leaf is leaf 2 (position 4).
        assert!(Position::from_inorder_index(1).is_freezable(2));
        assert!(!Position::from_inorder_index(5).is_freezable(2));
        assert!(Position::from_inorder_index(6).is_placeholder(2));
        assert!(!Position::from_inorder_index(5).is_placeholder(2));
        assert!(!Position::from_inorder_index(4).is_placeholder(2));
    }

    #[test]
    fn test_postorder_examples() {
        let inorder = [0u64, 2, 1, 4, 6, 5, 3];
        for (postorder, inorder) in inorder.iter().enumerate() {
            assert_eq!(inorder_to_postorder(*inorder), postorder as u64);
            assert_eq!(postorder_to_inorder(postorder as u64), *inorder);
        }
    }

    #[test]
    fn test_ancestor_iterators() {
        let ancestors: Vec<u64> = Position::from_leaf_index(2)
            .iter_ancestor()
            .take(3)
            .map(Position::to_inorder_index)
            .collect();
        assert_eq!(ancestors, vec![4, 5, 3]);

        let siblings: Vec<u64> = Position::from_leaf_index(2)
            .iter_ancestor_sibling()
            .take(3)
            .map(Position::to_inorder_index)
            .collect();
        assert_eq!(siblings, vec![6, 1, 11]);

        assert_eq!(Position::from_leaf_index(0).iter_ancestor().count(), 64);
    }

    #[test]
    fn test_frozen_subtree_iterator() {
        let roots: Vec<u64> = FrozenSubTreeIterator::new(5)
            .map(Position::to_inorder_index)
            .collect();
        assert_eq!(roots, vec![3, 8]);
        assert_eq!(FrozenSubTreeIterator::new(0).count(), 0);
        assert_eq!(FrozenSubTreeIterator::new(u64::MAX >> 1).count(), 63);
    }

    #[test]
    fn test_frozen_subtree_sibling_iterator() {
        // 5 leaves grown to 8: leaf 5 pairs with leaf 4, then leaves 6..=7.
        let siblings: Vec<u64> = FrozenSubtreeSiblingIterator::new(5, 8)
            .unwrap()
            .map(Position::to_inorder_index)
            .collect();
        assert_eq!(siblings, vec![10, 13]);

        // From empty, the largest perfect batches first.
        let siblings: Vec<u64> = FrozenSubtreeSiblingIterator::new(0, 5)
            .unwrap()
            .map(Position::to_inorder_index)
            .collect();
        assert_eq!(siblings, vec![3, 8]);
    }

    #[test]
    fn test_frozen_subtree_sibling_iterator_rejects_bad_sizes() {
        assert!(FrozenSubtreeSiblingIterator::new(5, 4).is_err());
        assert!(FrozenSubtreeSiblingIterator::new(0, MAX_ACCUMULATOR_LEAVES + 1).is_err());
        assert!(FrozenSubtreeSiblingIterator::new(0, MAX_ACCUMULATOR_LEAVES).is_ok());
    }

    proptest! {
        #[test]
        fn prop_postorder_bijection(inorder in 0u64..(1 << 40)) {
            let postorder = inorder_to_postorder(inorder);
            prop_assert_eq!(postorder_to_inorder(postorder), inorder);
        }

        #[test]
        fn prop_children_round_trip(level in 1u32..40, pos in 0u64..(1 << 20)) {
            let node = Position::from_level_and_pos(level, pos);
            prop_assert_eq!(node.level(), level);
            prop_assert_eq!(node.left_child().parent(), node);
            prop_assert_eq!(node.right_child().parent(), node);
            prop_assert_eq!(node.left_child().sibling(), node.right_child());
            prop_assert!(node.left_child().is_left_child());
            prop_assert!(node.right_child().is_right_child());
        }

        #[test]
        fn prop_frozen_subtrees_cover_leaves(num_leaves in 0u64..(1 << 40)) {
            let roots: Vec<Position> = FrozenSubTreeIterator::new(num_leaves).collect();
            prop_assert_eq!(roots.len() as u32, num_leaves.count_ones());
            let covered: u64 = roots.iter().map(|root| 1u64 << root.level()).sum();
            prop_assert_eq!(covered, num_leaves);
        }

        #[test]
        fn prop_sibling_iterator_fills_gap(current in 0u64..(1 << 30), extra in 0u64..(1 << 30)) {
            let new = current + extra;
            let covered: u64 = FrozenSubtreeSiblingIterator::new(current, new)
                .unwrap()
                .map(|root| 1u64 << root.level())
                .sum();
            prop_assert_eq!(covered, extra);
        }
    }
}

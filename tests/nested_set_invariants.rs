//! Structural invariant tests under random operation sequences
//!
//! Tests for:
//! - right > left for every node
//! - ranges disjoint or nested, never partially overlapping
//! - right - left - 1 == 2 * descendants
//! - depth equals ancestor count, single root at left 1
//!
//! Sequences are generated from fixed seeds so failures reproduce.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use nestedset::observability::NoopObserver;
use nestedset::{InvariantChecker, MemoryRowStore, NestedSet, NodeId, TreeNode};

// =============================================================================
// Test Utilities
// =============================================================================

fn new_set() -> NestedSet<MemoryRowStore> {
    NestedSet::new(Arc::new(MemoryRowStore::new()), "fuzz").with_observer(Arc::new(NoopObserver))
}

/// Check every invariant the checker knows plus the pairwise ones directly.
fn assert_invariants(nodes: &[TreeNode]) {
    InvariantChecker::check(nodes).unwrap();

    for a in nodes {
        assert!(a.right() > a.left(), "{} has empty range", a.id);

        let descendants = nodes
            .iter()
            .filter(|b| b.left() > a.left() && b.right() < a.right())
            .count() as u64;
        assert_eq!(a.right() - a.left() - 1, 2 * descendants, "width of {}", a.id);

        let ancestors = nodes
            .iter()
            .filter(|b| b.left() < a.left() && b.right() > a.right())
            .count() as u32;
        assert_eq!(a.depth(), ancestors, "depth of {}", a.id);

        for b in nodes {
            let disjoint = a.right() < b.left() || b.right() < a.left();
            let nested = (a.left() <= b.left() && b.right() <= a.right())
                || (b.left() <= a.left() && a.right() <= b.right());
            assert!(disjoint || nested, "{} and {} overlap", a.id, b.id);
        }
    }
}

fn pick(rng: &mut StdRng, nodes: &[TreeNode]) -> NodeId {
    nodes.choose(rng).map(|n| n.id.clone()).unwrap()
}

/// Run `steps` random mutations; returns how many committed.
fn run_sequence(seed: u64, steps: usize) -> usize {
    let mut rng = StdRng::seed_from_u64(seed);
    let set = new_set();
    set.create_root(NodeId::from("root")).unwrap();

    let mut committed = 1;
    for step in 0..steps {
        let nodes = set.nodes().unwrap();
        let fresh = NodeId::from(format!("n{}", step));

        let result = match rng.gen_range(0..10) {
            0..=3 => set.insert_last_child_of(fresh, &pick(&mut rng, &nodes)),
            4..=5 => set.insert_next_sibling_of(fresh, &pick(&mut rng, &nodes)),
            6 => set.insert_prev_sibling_of(fresh, &pick(&mut rng, &nodes)),
            7..=8 => {
                let node = pick(&mut rng, &nodes);
                let parent = pick(&mut rng, &nodes);
                set.move_as_child_of(&node, &parent)
            }
            _ => {
                if nodes.len() < 4 {
                    continue;
                }
                set.remove_subtree(&pick(&mut rng, &nodes))
            }
        };

        match result {
            Ok(_) => committed += 1,
            // Root siblings, cycles and root moves are expected rejections
            Err(e) => assert!(e.is_invalid_state(), "step {}: unexpected {}", step, e),
        }

        let after = set.nodes().unwrap();
        if after.is_empty() {
            set.create_root(NodeId::from(format!("root{}", step))).unwrap();
            continue;
        }
        assert_invariants(&after);
    }
    committed
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_random_sequences_preserve_invariants() {
    for seed in 0..20 {
        let committed = run_sequence(seed, 120);
        assert!(committed > 1, "seed {} never committed", seed);
    }
}

#[test]
fn test_long_sequence_preserves_invariants() {
    run_sequence(0xC0FFEE, 600);
}

#[test]
fn test_rejection_leaves_scope_untouched() {
    let mut rng = StdRng::seed_from_u64(7);
    let set = new_set();
    set.create_root(NodeId::from("root")).unwrap();
    for i in 0..30 {
        let nodes = set.nodes().unwrap();
        let parent = pick(&mut rng, &nodes);
        set.insert_last_child_of(NodeId::from(format!("n{}", i)), &parent)
            .unwrap();
    }

    let nodes = set.nodes().unwrap();
    for node in &nodes {
        for descendant in set.descendants_of(&node.id).unwrap() {
            let before = set.revision().unwrap();
            let err = set.move_as_child_of(&node.id, &descendant.id).unwrap_err();
            assert!(err.is_invalid_state());
            assert_eq!(set.revision().unwrap(), before);
        }
    }
    assert_eq!(set.nodes().unwrap(), nodes);
}

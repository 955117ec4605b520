//! Subtree move tests
//!
//! Tests for:
//! - Moving left and right, up and down in depth
//! - Internal shape preserved, depth shifted uniformly
//! - Cycles and root moves rejected before any write
//! - Moving to the current parent is a no-op on positions

use std::sync::Arc;

use nestedset::observability::NoopObserver;
use nestedset::{MemoryRowStore, NestedSet, NodeId, TreeNode};

// =============================================================================
// Test Utilities
// =============================================================================

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

/// R > { A > { A1 > A11, A2 }, B > B1, C }
fn build() -> NestedSet<MemoryRowStore> {
    let set = NestedSet::new(Arc::new(MemoryRowStore::new()), "menu")
        .with_observer(Arc::new(NoopObserver));
    set.create_root(id("R")).unwrap();
    for (child, parent) in [
        ("A", "R"),
        ("A1", "A"),
        ("A11", "A1"),
        ("A2", "A"),
        ("B", "R"),
        ("B1", "B"),
        ("C", "R"),
    ] {
        set.insert_last_child_of(id(child), &id(parent)).unwrap();
    }
    set
}

fn shape(set: &NestedSet<MemoryRowStore>) -> Vec<(String, Option<String>, u32)> {
    set.describe_all()
        .unwrap()
        .into_iter()
        .map(|v| {
            (
                v.id.as_str().to_string(),
                v.parent.map(|p| p.as_str().to_string()),
                v.depth,
            )
        })
        .collect()
}

fn entry(node: &str, parent: &str, depth: u32) -> (String, Option<String>, u32) {
    (node.to_string(), Some(parent.to_string()), depth)
}

/// Offsets of every subtree member relative to the subtree root
fn relative(set: &NestedSet<MemoryRowStore>, root: &str) -> Vec<(String, u64, u64, u32)> {
    let top = set.node(&id(root)).unwrap();
    let mut rows: Vec<TreeNode> = set.descendants_of(&id(root)).unwrap();
    rows.insert(0, top.clone());
    rows.into_iter()
        .map(|n| {
            (
                n.id.as_str().to_string(),
                n.left() - top.left(),
                n.right() - top.left(),
                n.depth() - top.depth(),
            )
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_move_right_and_deeper() {
    let set = build();
    let before = relative(&set, "A");

    set.move_as_child_of(&id("A"), &id("B1")).unwrap();

    assert_eq!(relative(&set, "A"), before);
    assert_eq!(set.node(&id("A")).unwrap().depth(), 3);
    assert_eq!(set.node(&id("A11")).unwrap().depth(), 5);
    assert_eq!(set.parent_id_of(&id("A")).unwrap(), Some(id("B1")));
    assert_eq!(
        shape(&set),
        vec![
            ("R".to_string(), None, 0),
            entry("B", "R", 1),
            entry("B1", "B", 2),
            entry("A", "B1", 3),
            entry("A1", "A", 4),
            entry("A11", "A1", 5),
            entry("A2", "A", 4),
            entry("C", "R", 1),
        ]
    );
    set.verify().unwrap();
}

#[test]
fn test_move_up_to_root() {
    let set = build();
    let before = relative(&set, "A1");

    set.move_as_child_of(&id("A1"), &id("R")).unwrap();

    assert_eq!(relative(&set, "A1"), before);
    assert_eq!(set.children_count_of(&id("R")).unwrap(), 4);
    let children: Vec<NodeId> = set
        .children_of(&id("R"))
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(children, vec![id("A"), id("B"), id("C"), id("A1")]);
    assert_eq!(set.node(&id("A11")).unwrap().depth(), 2);
    set.verify().unwrap();
}

#[test]
fn test_move_left_and_deeper() {
    let set = build();
    set.move_as_child_of(&id("C"), &id("A11")).unwrap();

    assert_eq!(set.parent_id_of(&id("C")).unwrap(), Some(id("A11")));
    assert_eq!(set.node(&id("C")).unwrap().depth(), 4);
    assert!(!set.is_leaf_of(&id("A11")).unwrap());
    set.verify().unwrap();
}

#[test]
fn test_move_to_current_parent_keeps_positions() {
    let set = build();
    let before = set.nodes().unwrap();

    // C is already the last child of R
    set.move_as_child_of(&id("C"), &id("R")).unwrap();
    assert_eq!(set.nodes().unwrap(), before);

    // A becomes the last child of R
    set.move_as_child_of(&id("A"), &id("R")).unwrap();
    let children: Vec<NodeId> = set
        .children_of(&id("R"))
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(children, vec![id("B"), id("C"), id("A")]);
    set.verify().unwrap();
}

#[test]
fn test_cycles_rejected() {
    let set = build();
    let before = set.nodes().unwrap();

    for (node, parent) in [("A", "A"), ("A", "A1"), ("A", "A11"), ("A1", "A11")] {
        let err = set.move_as_child_of(&id(node), &id(parent)).unwrap_err();
        assert!(err.is_invalid_state(), "{} under {}", node, parent);
    }
    assert_eq!(set.nodes().unwrap(), before);
}

#[test]
fn test_root_cannot_move() {
    let set = build();
    let err = set.move_as_child_of(&id("R"), &id("C")).unwrap_err();
    assert!(err.is_invalid_state());
}

#[test]
fn test_unknown_ids_not_found() {
    let set = build();
    assert!(set.move_as_child_of(&id("ghost"), &id("R")).unwrap_err().is_not_found());
    assert!(set.move_as_child_of(&id("A"), &id("ghost")).unwrap_err().is_not_found());
}

#[test]
fn test_move_then_remove() {
    let set = build();
    set.move_as_child_of(&id("B"), &id("A2")).unwrap();
    set.remove_subtree(&id("A")).unwrap();

    assert_eq!(shape(&set), vec![("R".to_string(), None, 0), entry("C", "R", 1)]);
    assert_eq!(set.node(&id("C")).unwrap().bounds.left, 2);
    set.verify().unwrap();
}

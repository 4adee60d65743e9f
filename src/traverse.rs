//! Structural inspection of a [`Tree`]: classifies every node as leaf or
//! internal and rejects node arrays that do not form a single-rooted,
//! acyclic binary tree.

use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::error::{Error, Result};
use crate::tree::{NodeId, Tree, CHILD_LEAF_SENTINEL};

/// Returns one flag per node id, `true` for leaves.
///
/// A node is a leaf iff its two child references are equal. Each id in
/// `0..node_count` is inspected exactly once; the visiting order is irrelevant.
///
/// # Errors
/// `MalformedTree` if the array lengths disagree, a child id is out of range,
/// an internal node has only one child or two identical children, a node has
/// more than one parent, the root is referenced as a child, or a node cannot
/// be reached from the root.
pub fn leaf_flags(tree: &Tree) -> Result<Vec<bool>> {
    let n_nodes = tree.node_count();
    check_lengths(tree)?;

    let mut is_leaves = vec![false; n_nodes];
    // child id -> parent id, used to reject shared children and back edges to the root
    let mut parents: FxHashMap<NodeId, NodeId> =
        FxHashMap::with_capacity_and_hasher(n_nodes, FxBuildHasher);

    for node_id in 0..n_nodes {
        let left = tree.children_left()[node_id];
        let right = tree.children_right()[node_id];

        if left == right {
            if left != CHILD_LEAF_SENTINEL {
                return Err(malformed(format!(
                    "node {node_id} has identical children ({left})"
                )));
            }
            is_leaves[node_id] = true;
            continue;
        }

        for child in [left, right] {
            let child_id = checked_child(node_id, child, n_nodes)?;
            if child_id == 0 {
                return Err(malformed(format!("node {node_id} points back to the root")));
            }
            if let Some(previous) = parents.insert(child_id, node_id) {
                return Err(malformed(format!(
                    "node {child_id} has two parents ({previous} and {node_id})"
                )));
            }
        }
    }

    check_reachable(tree, &is_leaves)?;
    Ok(is_leaves)
}

/// Height of a validated tree (a lone root leaf has height 0).
pub fn tree_height(tree: &Tree, is_leaves: &[bool]) -> usize {
    let mut max_depth = 0;
    let mut stack: Vec<(NodeId, usize)> = vec![(0, 0)];
    while let Some((node_id, depth)) = stack.pop() {
        max_depth = max_depth.max(depth);
        if !is_leaves[node_id] {
            stack.push((tree.left(node_id), depth + 1));
            stack.push((tree.right(node_id), depth + 1));
        }
    }
    max_depth
}

fn check_lengths(tree: &Tree) -> Result<()> {
    let n_nodes = tree.node_count();
    if n_nodes == 0 {
        return Err(malformed("tree has no nodes".to_string()));
    }
    let lengths = [
        ("children_right", tree.children_right().len()),
        ("feature", tree.features().len()),
        ("threshold", tree.thresholds().len()),
        ("value", tree.values().len()),
    ];
    for (array, len) in lengths {
        if len != n_nodes {
            return Err(malformed(format!(
                "{array} has {len} entries but the tree declares {n_nodes} nodes"
            )));
        }
    }
    Ok(())
}

fn checked_child(node_id: NodeId, child: i64, n_nodes: usize) -> Result<NodeId> {
    if child == CHILD_LEAF_SENTINEL {
        return Err(malformed(format!("internal node {node_id} is missing a child")));
    }
    if child < 0 || child as usize >= n_nodes {
        return Err(malformed(format!(
            "node {node_id} references child {child}, outside 0..{n_nodes}"
        )));
    }
    Ok(child as NodeId)
}

/// With at most one parent per node and none for the root, every node being
/// reachable from the root is enough to rule out cycles.
fn check_reachable(tree: &Tree, is_leaves: &[bool]) -> Result<()> {
    let mut seen = vec![false; is_leaves.len()];
    let mut stack = vec![0];
    while let Some(node_id) = stack.pop() {
        seen[node_id] = true;
        if !is_leaves[node_id] {
            stack.push(tree.left(node_id));
            stack.push(tree.right(node_id));
        }
    }
    match seen.iter().position(|&visited| !visited) {
        Some(orphan) => Err(malformed(format!("node {orphan} is not reachable from the root"))),
        None => Ok(()),
    }
}

fn malformed(message: String) -> Error {
    Error::MalformedTree(message)
}

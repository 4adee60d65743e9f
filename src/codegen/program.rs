//! Flat, label-addressed form of a compiled tree.
//!
//! A `Program` is exactly what the generated C encodes: a scaling prologue
//! followed by one block per node, where control only moves by explicit jumps
//! to a node id. `Program::evaluate` runs it as a dispatch loop so the
//! emitted control flow can be checked without a C toolchain.

use crate::tree::NodeId;

/// `feature = (feature - mean) / scale`, applied in place before any test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleStep {
    pub feature: usize,
    pub mean: f64,
    pub scale: f64,
}

/// One labeled block of the generated routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Block {
    /// `NODE_<id>: return <class>;`
    Leaf { id: NodeId, class: i64 },
    /// `NODE_<id>: if (f <= t) goto NODE_<on_true>; else goto NODE_<on_false>;`
    Branch {
        id: NodeId,
        feature: usize,
        threshold: f64,
        on_true: NodeId,
        on_false: NodeId,
    },
}

impl Block {
    pub fn id(&self) -> NodeId {
        match *self {
            Block::Leaf { id, .. } | Block::Branch { id, .. } => id,
        }
    }

    /// Labels this block can transfer control to.
    pub fn targets(&self) -> Option<(NodeId, NodeId)> {
        match *self {
            Block::Leaf { .. } => None,
            Block::Branch { on_true, on_false, .. } => Some((on_true, on_false)),
        }
    }
}

/// Prologue plus blocks in ascending id order (`blocks[i].id() == i`).
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    prologue: Vec<ScaleStep>,
    blocks: Vec<Block>,
}

impl Program {
    pub(crate) fn new(prologue: Vec<ScaleStep>, blocks: Vec<Block>) -> Self {
        debug_assert!(blocks.iter().enumerate().all(|(i, b)| b.id() == i));
        Self { prologue, blocks }
    }

    pub fn prologue(&self) -> &[ScaleStep] {
        &self.prologue
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Runs the program on raw (unscaled) feature values.
    ///
    /// Mirrors the generated routine: the prologue overwrites each slot with
    /// its scaled value, then a current-node variable is dispatched on until
    /// a leaf returns.
    ///
    /// # Panics
    /// Panics if `raw` has fewer values than the prologue scales.
    pub fn evaluate(&self, raw: &[f64]) -> i64 {
        let mut slots = raw.to_vec();
        for step in &self.prologue {
            slots[step.feature] = (slots[step.feature] - step.mean) / step.scale;
        }

        let mut current: NodeId = 0;
        loop {
            match self.blocks[current] {
                Block::Leaf { class, .. } => return class,
                Block::Branch { feature, threshold, on_true, on_false, .. } => {
                    current = if slots[feature] <= threshold { on_true } else { on_false };
                }
            }
        }
    }
}

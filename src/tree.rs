//! Defines the read-only inputs of the converter: the decision tree stored as
//! scikit-learn style parallel arrays, the ordered feature list, and the
//! per-feature standardization parameters. Also provides the in-memory
//! reference prediction used to check generated code against.

use crate::codegen::syntax;
use crate::error::{Error, Result};

/// Type alias for a node identifier (index into the node arrays).
pub type NodeId = usize;

// --- Sklearn-Style Sentinels ---
/// Sentinel stored in both child arrays of a leaf node.
pub const CHILD_LEAF_SENTINEL: i64 = -1;
/// Sentinel stored in the feature array of a leaf node.
pub const FEATURE_LEAF_SENTINEL: i64 = -2;
/// Sentinel threshold of a leaf node.
pub const THRESHOLD_LEAF_SENTINEL: f64 = -2.0;
// --- End Sentinels ---

/// A trained binary classification tree in structure-of-arrays form.
///
/// Node `0` is the root. A node is a leaf iff its two child references are
/// equal (both `CHILD_LEAF_SENTINEL`); nothing else is used to tell leaves
/// from internal nodes. Structural consistency is checked by
/// [`crate::traverse::leaf_flags`], not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    features: Vec<i64>,
    thresholds: Vec<f64>,
    /// `values[node][class]` = class count (or weighted count) at the node.
    values: Vec<Vec<f64>>,
    /// Integer label emitted for each class index; identity when `None`.
    classes: Option<Vec<i64>>,
}

impl Tree {
    /// Wraps already-materialized node arrays. No validation is performed.
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        features: Vec<i64>,
        thresholds: Vec<f64>,
        values: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            children_left,
            children_right,
            features,
            thresholds,
            values,
            classes: None,
        }
    }

    /// Maps class indices to the integer labels returned by the generated code.
    pub fn with_classes(mut self, classes: Vec<i64>) -> Self {
        self.classes = Some(classes);
        self
    }

    /// Declared number of nodes (length of the left-children array).
    #[inline]
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    pub fn children_left(&self) -> &[i64] {
        &self.children_left
    }

    pub fn children_right(&self) -> &[i64] {
        &self.children_right
    }

    pub fn features(&self) -> &[i64] {
        &self.features
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn classes(&self) -> Option<&[i64]> {
        self.classes.as_deref()
    }

    // --- Node Accessors ---

    /// Checks if the node with the given ID is a leaf (child-equality rule).
    /// # Panics
    /// Panics if the `id` is out of bounds.
    #[inline]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children_left[id] == self.children_right[id]
    }

    /// Gets the feature index used by an internal node.
    /// # Panics
    /// Panics if the `id` is out of bounds.
    #[inline]
    pub fn feature(&self, id: NodeId) -> usize {
        let raw = self.features[id];
        debug_assert!(raw >= 0, "Called feature() on a leaf node");
        raw as usize
    }

    #[inline]
    pub fn threshold(&self, id: NodeId) -> f64 {
        self.thresholds[id]
    }

    /// Child taken when `feature <= threshold`.
    #[inline]
    pub fn left(&self, id: NodeId) -> NodeId {
        let child = self.children_left[id];
        debug_assert!(child != CHILD_LEAF_SENTINEL, "Called left() on a leaf node");
        child as NodeId
    }

    /// Child taken when `feature > threshold`.
    #[inline]
    pub fn right(&self, id: NodeId) -> NodeId {
        let child = self.children_right[id];
        debug_assert!(child != CHILD_LEAF_SENTINEL, "Called right() on a leaf node");
        child as NodeId
    }

    /// Index of the majority class at a node (stable argmax of its counts).
    pub fn majority_index(&self, id: NodeId) -> usize {
        stable_argmax(&self.values[id])
    }

    /// Integer label predicted by a leaf: `classes[argmax(values[id])]`.
    pub fn leaf_class(&self, id: NodeId) -> i64 {
        let index = self.majority_index(id);
        match &self.classes {
            Some(classes) => classes[index],
            None => index as i64,
        }
    }
}

/// Returns the index of the largest value. Ties go to the lower index,
/// matching numpy's `argmax`. Returns 0 for an empty slice.
pub fn stable_argmax(values: &[f64]) -> usize {
    let mut best_index = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (index, &value) in values.iter().enumerate() {
        if index == 0 || value > best_value {
            best_value = value;
            best_index = index;
        }
        // equal values keep the earlier index
    }
    best_index
}

/// Ordered list of feature names.
///
/// The order fixes the parameter order of the emitted function, the index
/// into the scaling arrays, and the column order of evaluation datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    names: Vec<String>,
}

impl FeatureSpec {
    /// Validates that names are non-empty, distinct C identifiers that no
    /// standard header macro can shadow.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::InvalidArgument("feature list must not be empty".into()));
        }
        let mut validated: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !syntax::is_identifier(name) {
                return Err(Error::InvalidArgument(format!(
                    "feature name {name:?} is not a usable C identifier"
                )));
            }
            if validated.iter().any(|existing| existing == name) {
                return Err(Error::InvalidArgument(format!("duplicate feature name {name:?}")));
            }
            validated.push(name.to_string());
        }
        Ok(Self { names: validated })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }
}

/// Per-feature standardization parameters (`(raw - mean) / scale`).
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl ScalingParams {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(Error::InvalidModel(format!(
                "scaler has {} means but {} scales",
                mean.len(),
                scale.len()
            )));
        }
        Ok(Self { mean, scale })
    }

    /// Parameters that leave every feature unchanged.
    pub fn identity(n_features: usize) -> Self {
        Self {
            mean: vec![0.0; n_features],
            scale: vec![1.0; n_features],
        }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardizes one feature value. A zero scale yields inf/NaN, unguarded.
    #[inline]
    pub fn apply(&self, index: usize, raw: f64) -> f64 {
        (raw - self.mean[index]) / self.scale[index]
    }

    pub fn apply_all(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter()
            .enumerate()
            .map(|(index, &value)| self.apply(index, value))
            .collect()
    }
}

/// Predicts the class of an already standardized instance by walking the tree.
///
/// Starts at the root and follows `<=` to the left child and `>` to the
/// right child until a leaf is reached.
///
/// # Panics
/// Panics on a tree that did not pass [`crate::traverse::leaf_flags`] or when
/// `scaled` is shorter than the largest feature index.
pub fn predict_scaled(tree: &Tree, scaled: &[f64]) -> i64 {
    let mut current_node_id: NodeId = 0;

    loop {
        if tree.is_leaf(current_node_id) {
            return tree.leaf_class(current_node_id);
        }

        let feature_value = scaled[tree.feature(current_node_id)];
        current_node_id = if feature_value <= tree.threshold(current_node_id) {
            tree.left(current_node_id)
        } else {
            tree.right(current_node_id)
        };
    }
}

/// Standardizes `raw` with `scaling` and predicts its class.
pub fn predict_raw(tree: &Tree, scaling: &ScalingParams, raw: &[f64]) -> i64 {
    predict_scaled(tree, &scaling.apply_all(raw))
}

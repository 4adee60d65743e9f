//! Loading of persisted models and scalers.
//!
//! Models are JSON documents mirroring scikit-learn's `tree_` arrays, as
//! produced by dumping `clf.tree_` (plus `clf.classes_`) from Python:
//!
//! ```json
//! {
//!   "node_count": 3,
//!   "children_left": [1, -1, -1],
//!   "children_right": [2, -1, -1],
//!   "feature": [0, -2, -2],
//!   "threshold": [0.5, -2.0, -2.0],
//!   "value": [[[4.0, 4.0]], [[4.0, 0.0]], [[0.0, 4.0]]],
//!   "classes": [0, 1]
//! }
//! ```
//!
//! `value` may be given per node as `[counts]` or as scikit-learn's
//! `[[counts]]` (one output). Scalers carry `mean_` and `scale_`.
//!
//! This module does not have performance critical code.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::codegen::{self, ModelArtifacts};
use crate::config::GenerationOptions;
use crate::error::{Error, Result};
use crate::tree::{FeatureSpec, ScalingParams, Tree};

/// Serialized decision tree classifier.
#[derive(Deserialize, Debug, Clone)]
pub struct TreeData {
    /// Declared number of nodes; every array must have this length.
    pub node_count: usize,
    /// `children_left[node]` = child taken when `feature <= threshold`, -1 for leaves.
    pub children_left: Vec<i64>,
    /// `children_right[node]` = child taken when `feature > threshold`, -1 for leaves.
    pub children_right: Vec<i64>,
    /// `feature[node]` = split feature index, -2 for leaves.
    pub feature: Vec<i64>,
    /// `threshold[node]` = split threshold, -2.0 for leaves.
    pub threshold: Vec<f64>,
    pub value: NodeValues,
    /// Integer class labels in class-index order (`classes_`).
    #[serde(default, alias = "classes_")]
    pub classes: Option<Vec<i64>>,
}

/// Class counts per node, with or without scikit-learn's output axis.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum NodeValues {
    Flat(Vec<Vec<f64>>),
    PerOutput(Vec<Vec<Vec<f64>>>),
}

/// Serialized standardization parameters.
#[derive(Deserialize, Debug, Clone)]
pub struct ScalerData {
    #[serde(alias = "mean_")]
    pub mean: Vec<f64>,
    #[serde(alias = "scale_")]
    pub scale: Vec<f64>,
}

impl TreeData {
    /// Converts the arrays into a [`Tree`]. Only the node count and the
    /// output axis are checked here; structure is checked at conversion.
    pub fn into_tree(self) -> Result<Tree> {
        if self.children_left.len() != self.node_count {
            return Err(Error::MalformedTree(format!(
                "children_left has {} entries but node_count is {}",
                self.children_left.len(),
                self.node_count
            )));
        }
        let values = match self.value {
            NodeValues::Flat(values) => values,
            NodeValues::PerOutput(values) => values
                .into_iter()
                .enumerate()
                .map(|(node, mut outputs)| match outputs.len() {
                    1 => Ok(outputs.remove(0)),
                    n => Err(Error::InvalidModel(format!(
                        "node {node} has {n} outputs; only single-output classifiers are supported"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let tree = Tree::new(
            self.children_left,
            self.children_right,
            self.feature,
            self.threshold,
            values,
        );
        Ok(match self.classes {
            Some(classes) => tree.with_classes(classes),
            None => tree,
        })
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> Result<T> {
    if !path.exists() {
        return Err(Error::MissingInputFile { path: path.to_path_buf() });
    }
    let content = fs::read_to_string(path).map_err(|e| Error::file_system(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        Error::InvalidModel(format!("failed to parse {what} from {}: {e}", path.display()))
    })
}

/// Loads a serialized tree from a JSON file.
pub fn load_tree<P: AsRef<Path>>(path: P) -> Result<Tree> {
    read_json::<TreeData>(path.as_ref(), "tree")?.into_tree()
}

/// Loads a serialized scaler from a JSON file.
pub fn load_scaler<P: AsRef<Path>>(path: P) -> Result<ScalingParams> {
    let data: ScalerData = read_json(path.as_ref(), "scaler")?;
    ScalingParams::new(data.mean, data.scale)
}

/// Same as [`codegen::convert`], with the model and scaler read from files.
///
/// # Errors
/// `MissingInputFile` if either path does not exist (checked before
/// anything is parsed or written), then the errors of `convert`.
pub fn convert_from_files<P: AsRef<Path>, Q: AsRef<Path>>(
    model_path: P,
    scaler_path: Q,
    features: &FeatureSpec,
    options: &GenerationOptions,
) -> Result<ModelArtifacts> {
    for path in [model_path.as_ref(), scaler_path.as_ref()] {
        if !path.exists() {
            return Err(Error::MissingInputFile { path: path.to_path_buf() });
        }
    }
    let tree = load_tree(model_path)?;
    let scaling = load_scaler(scaler_path)?;
    codegen::convert(&tree, &scaling, features, options)
}

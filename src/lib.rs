//! Compiles a trained decision tree classifier into a standalone C
//! prediction routine and emits a C harness that measures its accuracy.
//!
//! ```no_run
//! use dtc2c::{convert, make_test, FeatureSpec, GenerationOptions, ScalingParams, Tree};
//!
//! # fn main() -> dtc2c::Result<()> {
//! let tree = Tree::new(
//!     vec![1, -1, -1],
//!     vec![2, -1, -1],
//!     vec![0, -2, -2],
//!     vec![5.0, -2.0, -2.0],
//!     vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
//! );
//! let features = FeatureSpec::new(&["x"])?;
//! let scaling = ScalingParams::new(vec![0.0], vec![1.0])?;
//! let options = GenerationOptions::new("Model", "code");
//! convert(&tree, &scaling, &features, &options)?;
//! make_test(&features, false, &options)?;
//! # Ok(())
//! # }
//! ```

pub mod codegen;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod external;
pub mod harness;
pub mod results;
pub mod traverse;
pub mod tree;

pub use codegen::{convert, generate, ModelArtifacts, ModelSources};
pub use config::GenerationOptions;
pub use data::{convert_from_files, load_scaler, load_tree};
pub use error::{Error, Result};
pub use external::BuildOutcome;
pub use harness::{evaluate_dataset, make_test, Evaluation, HarnessArtifact};
pub use traverse::leaf_flags;
pub use tree::{predict_raw, FeatureSpec, NodeId, ScalingParams, Tree};

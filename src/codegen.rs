//! Converts a decision tree plus standardization parameters into a
//! dependency-free C prediction routine.
//!
//! The conversion happens in three steps:
//! 1. `build_program` validates the inputs and lowers the tree into a
//!    [`Program`]: a scaling prologue and one block per node id.
//! 2. `render_header` / `render_source` print the program as a header with a
//!    single prototype and a source file made of `NODE_<id>:` labels joined
//!    by `goto`s. Every transfer of control is an explicit jump, so the
//!    emission order of the blocks does not matter.
//! 3. `convert` writes both texts to the destination directory.

pub mod program;
pub mod syntax;

use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::{GenerationOptions, NODE_LABEL_PREFIX};
use crate::error::{Error, Result};
use crate::export;
use crate::traverse;
use crate::tree::{FeatureSpec, ScalingParams, Tree};

pub use program::{Block, Program, ScaleStep};

/// Header and source text of a converted model, before or after writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSources {
    pub header: String,
    pub source: String,
}

/// Paths of the artifacts written by [`convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub header_path: PathBuf,
    pub source_path: PathBuf,
    pub sources: ModelSources,
}

/// Validates the inputs and writes `<name>.h` and `<name>.c` into
/// `options.out_dir`, creating the directory if needed and overwriting
/// existing files.
///
/// # Errors
/// * `InvalidArgument` for an unusable artifact or function name.
/// * `MalformedTree` / `InvalidModel` if the tree cannot be emitted.
/// * `FileSystem` if the directory or a file cannot be created.
pub fn convert(
    tree: &Tree,
    scaling: &ScalingParams,
    features: &FeatureSpec,
    options: &GenerationOptions,
) -> Result<ModelArtifacts> {
    let sources = generate(tree, scaling, features, options)?;

    export::ensure_dir(options.out_dir())?;
    let header_path = options.header_path();
    let source_path = options.source_path();
    export::write_artifact(&header_path, &sources.header)?;
    export::write_artifact(&source_path, &sources.source)?;

    Ok(ModelArtifacts {
        header_path,
        source_path,
        sources,
    })
}

/// Produces the header and source text without touching the filesystem.
pub fn generate(
    tree: &Tree,
    scaling: &ScalingParams,
    features: &FeatureSpec,
    options: &GenerationOptions,
) -> Result<ModelSources> {
    validate_options(options)?;
    let program = build_program(tree, scaling, features)?;
    Ok(ModelSources {
        header: render_header(features, options),
        source: render_source(&program, features, options)?,
    })
}

/// Checks the artifact base name and function name.
pub fn validate_options(options: &GenerationOptions) -> Result<()> {
    let name = options.name.as_str();
    if !syntax::is_artifact_name(name) {
        return Err(Error::InvalidArgument(format!(
            "artifact name {name:?} must be a plain file name made of letters, digits, '_', '-' and '.'"
        )));
    }
    if !syntax::is_function_name(&options.function_name) {
        return Err(Error::InvalidArgument(format!(
            "function name {:?} is not a usable C function name",
            options.function_name
        )));
    }
    Ok(())
}

/// Lowers a validated tree into its flat block form.
///
/// # Errors
/// `MalformedTree` from the structural check, `InvalidModel` when the scaler
/// does not match the feature list, a split uses an unknown feature, a leaf
/// has no class counts or an unmapped class, or a literal is not finite.
pub fn build_program(tree: &Tree, scaling: &ScalingParams, features: &FeatureSpec) -> Result<Program> {
    if scaling.len() != features.len() {
        return Err(Error::InvalidModel(format!(
            "scaler covers {} features but {} feature names were given",
            scaling.len(),
            features.len()
        )));
    }

    let is_leaves = traverse::leaf_flags(tree)?;

    let mut prologue = Vec::with_capacity(features.len());
    for (feature, (&mean, &scale)) in scaling.mean().iter().zip(scaling.scale()).enumerate() {
        if !mean.is_finite() || !scale.is_finite() {
            return Err(Error::InvalidModel(format!(
                "scaler for feature {:?} has a non-finite mean or scale",
                features.name(feature)
            )));
        }
        if scale == 0.0 {
            warn!(
                feature = features.name(feature),
                "Scale is zero; the generated code divides by zero for this feature"
            );
        }
        prologue.push(ScaleStep { feature, mean, scale });
    }

    let mut blocks = Vec::with_capacity(tree.node_count());
    for (id, &is_leaf) in is_leaves.iter().enumerate() {
        let block = if is_leaf {
            leaf_block(tree, id)?
        } else {
            let feature_raw = tree.features()[id];
            if feature_raw < 0 || feature_raw as usize >= features.len() {
                return Err(Error::InvalidModel(format!(
                    "node {id} splits on feature {feature_raw}, but only {} features are named",
                    features.len()
                )));
            }
            let threshold = tree.threshold(id);
            if !threshold.is_finite() {
                return Err(Error::InvalidModel(format!("node {id} has a non-finite threshold")));
            }
            Block::Branch {
                id,
                feature: feature_raw as usize,
                threshold,
                on_true: tree.left(id),
                on_false: tree.right(id),
            }
        };
        blocks.push(block);
    }

    debug!(
        nodes = blocks.len(),
        leaves = is_leaves.iter().filter(|&&leaf| leaf).count(),
        height = traverse::tree_height(tree, &is_leaves),
        "Lowered tree"
    );
    Ok(Program::new(prologue, blocks))
}

fn leaf_block(tree: &Tree, id: usize) -> Result<Block> {
    let counts = &tree.values()[id];
    if counts.is_empty() {
        return Err(Error::InvalidModel(format!("leaf {id} has no class counts")));
    }
    let index = tree.majority_index(id);
    let class = match tree.classes() {
        Some(classes) => *classes.get(index).ok_or_else(|| {
            Error::InvalidModel(format!(
                "leaf {id} predicts class index {index}, but only {} class labels exist",
                classes.len()
            ))
        })?,
        None => index as i64,
    };
    // the generated function returns a C `int`
    if i32::try_from(class).is_err() {
        return Err(Error::InvalidModel(format!(
            "leaf {id} predicts class {class}, which does not fit in a C int"
        )));
    }
    Ok(Block::Leaf { id, class })
}

/// `double a, double b, ...` in feature order.
fn parameter_list(features: &FeatureSpec) -> String {
    features
        .names()
        .iter()
        .map(|name| format!("double {name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn label(id: usize) -> String {
    format!("{NODE_LABEL_PREFIX}{id}")
}

/// Header: include guard around the single prediction prototype.
pub fn render_header(features: &FeatureSpec, options: &GenerationOptions) -> String {
    let guard = syntax::include_guard(&options.name);
    format!(
        "#ifndef {guard}\n\
         #define {guard}\n\
         \n\
         // Scales the arguments and predicts a class with a decision tree compiled to labels and gotos.\n\
         int {function}({params});\n\
         \n\
         #endif\n",
        function = options.function_name,
        params = parameter_list(features),
    )
}

/// Source: scaling prologue followed by one labeled block per node.
pub fn render_source(program: &Program, features: &FeatureSpec, options: &GenerationOptions) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "#include \"{}.h\"", options.name)?;
    writeln!(out)?;
    writeln!(
        out,
        "// Scales the arguments and predicts a class with a decision tree compiled to labels and gotos."
    )?;
    writeln!(out, "int {}({}) {{", options.function_name, parameter_list(features))?;
    writeln!(out, "    // Standardize each argument in place with the training mean and scale.")?;
    for step in program.prologue() {
        let name = features.name(step.feature);
        writeln!(
            out,
            "    {name} = ({name} - {}) / {};",
            literal(step.mean)?,
            literal(step.scale)?
        )?;
    }
    writeln!(out)?;
    writeln!(out, "    // One block per tree node; every transfer is an explicit jump.")?;
    for block in program.blocks() {
        match *block {
            Block::Leaf { id, class } => {
                writeln!(out, "{}:", label(id))?;
                writeln!(out, "    return {class};")?;
            }
            Block::Branch { id, feature, threshold, on_true, on_false } => {
                writeln!(out, "{}:", label(id))?;
                writeln!(
                    out,
                    "    if ({} <= {}) {{",
                    features.name(feature),
                    literal(threshold)?
                )?;
                writeln!(out, "        goto {};", label(on_true))?;
                writeln!(out, "    }} else {{")?;
                writeln!(out, "        goto {};", label(on_false))?;
                writeln!(out, "    }}")?;
            }
        }
    }
    writeln!(out, "}}")?;
    Ok(out)
}

fn literal(value: f64) -> Result<String> {
    syntax::double_literal(value)
        .ok_or_else(|| Error::InvalidModel(format!("{value} has no C literal form")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{stump, two_level};
    use crate::tree::predict_raw;
    use proptest::prelude::*;

    fn options() -> GenerationOptions {
        GenerationOptions::new("Model", ".")
    }

    fn block_labels(source: &str) -> Vec<usize> {
        source
            .lines()
            .filter_map(|line| line.strip_prefix(NODE_LABEL_PREFIX)?.strip_suffix(':'))
            .map(|id| id.parse().unwrap())
            .collect()
    }

    fn jump_targets(source: &str) -> Vec<usize> {
        source
            .lines()
            .filter_map(|line| line.trim().strip_prefix("goto NODE_")?.strip_suffix(';'))
            .map(|id| id.parse().unwrap())
            .collect()
    }

    /// Grows a tree breadth-first; node `i` splits when `decisions[i].0` is set.
    fn grow_tree(decisions: &[(bool, usize, f64)], n_features: usize, n_classes: usize) -> Tree {
        let mut left = vec![-1i64];
        let mut right = vec![-1i64];
        let mut feature = vec![-2i64];
        let mut threshold = vec![-2.0];
        let mut next = 0;
        while next < left.len() {
            if let Some(&(true, f, t)) = decisions.get(next) {
                let first = left.len() as i64;
                left[next] = first;
                right[next] = first + 1;
                feature[next] = (f % n_features) as i64;
                threshold[next] = t;
                for _ in 0..2 {
                    left.push(-1);
                    right.push(-1);
                    feature.push(-2);
                    threshold.push(-2.0);
                }
            }
            next += 1;
        }
        let values = (0..left.len())
            .map(|id| (0..n_classes).map(|c| ((id * 7 + c * 3) % 5) as f64).collect())
            .collect();
        Tree::new(left, right, feature, threshold, values)
    }

    #[test]
    fn concrete_stump_scenario() {
        let tree = stump(5.0);
        let features = FeatureSpec::new(&["x"]).unwrap();
        let scaling = ScalingParams::new(vec![0.0], vec![1.0]).unwrap();
        let program = build_program(&tree, &scaling, &features).unwrap();
        assert_eq!(program.evaluate(&[5.0]), 0);
        assert_eq!(program.evaluate(&[5.0001]), 1);

        let sources = generate(&tree, &scaling, &features, &options()).unwrap();
        let expected = "\
#include \"Model.h\"

// Scales the arguments and predicts a class with a decision tree compiled to labels and gotos.
int DTC_Predict(double x) {
    // Standardize each argument in place with the training mean and scale.
    x = (x - 0.0) / 1.0;

    // One block per tree node; every transfer is an explicit jump.
NODE_0:
    if (x <= 5.0) {
        goto NODE_1;
    } else {
        goto NODE_2;
    }
NODE_1:
    return 0;
NODE_2:
    return 1;
}
";
        assert_eq!(sources.source, expected);
    }

    #[test]
    fn header_declares_single_prototype() {
        let features = FeatureSpec::new(&["cycles", "instr", "llc_misses"]).unwrap();
        let header = render_header(&features, &GenerationOptions::new("DTCTC_Demo_1", "."));
        assert!(header.starts_with("#ifndef DTCTC_DEMO_1_H\n#define DTCTC_DEMO_1_H\n"));
        assert!(header.contains("int DTC_Predict(double cycles, double instr, double llc_misses);\n"));
        assert!(header.trim_end().ends_with("#endif"));
        assert_eq!(header.matches("DTC_Predict").count(), 1);
    }

    #[test]
    fn one_block_per_node_and_all_jumps_valid() {
        let tree = two_level();
        let features = FeatureSpec::new(&["a", "b"]).unwrap();
        let scaling = ScalingParams::identity(2);
        let source = generate(&tree, &scaling, &features, &options()).unwrap().source;

        assert_eq!(block_labels(&source), vec![0, 1, 2, 3, 4]);
        let mut targets = jump_targets(&source);
        assert_eq!(targets.len(), 4); // two per internal node
        targets.sort_unstable();
        assert_eq!(targets, vec![1, 2, 3, 4]);
        assert_eq!(source.matches("return ").count(), 3); // one per leaf
        assert_eq!(source.matches("if (").count(), 2);
    }

    #[test]
    fn leaves_return_mapped_class_labels() {
        let tree = two_level().with_classes(vec![-1, 7, 42]);
        let features = FeatureSpec::new(&["a", "b"]).unwrap();
        let source = generate(&tree, &ScalingParams::identity(2), &features, &options()).unwrap().source;
        assert!(source.contains("NODE_2:\n    return 42;"));
        assert!(source.contains("NODE_3:\n    return -1;"));
        assert!(source.contains("NODE_4:\n    return 7;"));
    }

    #[test]
    fn prologue_uses_full_precision_literals() {
        let tree = stump(0.1 + 0.2);
        let features = FeatureSpec::new(&["x"]).unwrap();
        let scaling = ScalingParams::new(vec![1.0 / 3.0], vec![2.5e-9]).unwrap();
        let source = generate(&tree, &scaling, &features, &options()).unwrap().source;
        assert!(source.contains("x = (x - 0.3333333333333333) / 2.5e-9;"));
        assert!(source.contains("if (x <= 0.30000000000000004) {"));
    }

    #[test]
    fn zero_scale_is_emitted_unguarded() {
        let tree = stump(0.0);
        let features = FeatureSpec::new(&["x"]).unwrap();
        let scaling = ScalingParams::new(vec![0.0], vec![0.0]).unwrap();
        let source = generate(&tree, &scaling, &features, &options()).unwrap().source;
        assert!(source.contains("x = (x - 0.0) / 0.0;"));
    }

    #[test]
    fn generation_is_deterministic() {
        let tree = two_level();
        let features = FeatureSpec::new(&["a", "b"]).unwrap();
        let scaling = ScalingParams::new(vec![0.25, -3.0], vec![1.5, 0.75]).unwrap();
        let first = generate(&tree, &scaling, &features, &options()).unwrap();
        let second = generate(&tree, &scaling, &features, &options()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_mismatched_scaler() {
        let features = FeatureSpec::new(&["a", "b"]).unwrap();
        let result = build_program(&two_level(), &ScalingParams::identity(3), &features);
        assert!(matches!(result, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn rejects_unknown_split_feature() {
        let features = FeatureSpec::new(&["a"]).unwrap();
        let result = build_program(&two_level(), &ScalingParams::identity(1), &features);
        assert!(matches!(result, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn rejects_non_finite_literals() {
        let features = FeatureSpec::new(&["x"]).unwrap();
        let result = build_program(&stump(f64::NAN), &ScalingParams::identity(1), &features);
        assert!(matches!(result, Err(Error::InvalidModel(_))));

        let scaling = ScalingParams::new(vec![f64::INFINITY], vec![1.0]).unwrap();
        let result = build_program(&stump(1.0), &scaling, &features);
        assert!(matches!(result, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn rejects_unmapped_or_empty_leaves() {
        let features = FeatureSpec::new(&["a", "b"]).unwrap();
        let tree = two_level().with_classes(vec![0, 1]);
        assert!(matches!(
            build_program(&tree, &ScalingParams::identity(2), &features),
            Err(Error::InvalidModel(_))
        ));

        let tree = Tree::new(vec![-1], vec![-1], vec![-2], vec![-2.0], vec![vec![]]);
        let features = FeatureSpec::new(&["x"]).unwrap();
        assert!(matches!(
            build_program(&tree, &ScalingParams::identity(1), &features),
            Err(Error::InvalidModel(_))
        ));
    }

    #[test]
    fn rejects_classes_outside_c_int() {
        let features = FeatureSpec::new(&["x"]).unwrap();
        let scaling = ScalingParams::identity(1);
        for classes in [vec![0, 5_000_000_000], vec![i64::from(i32::MIN) - 1, 1]] {
            let tree = stump(5.0).with_classes(classes);
            assert!(matches!(
                build_program(&tree, &scaling, &features),
                Err(Error::InvalidModel(_))
            ));
        }

        let tree = stump(5.0).with_classes(vec![i64::from(i32::MIN), i64::from(i32::MAX)]);
        let program = build_program(&tree, &scaling, &features).unwrap();
        assert_eq!(program.evaluate(&[9.0]), i64::from(i32::MAX));
        assert_eq!(program.evaluate(&[1.0]), i64::from(i32::MIN));
    }

    #[test]
    fn rejects_bad_names() {
        let features = FeatureSpec::new(&["x"]).unwrap();
        let scaling = ScalingParams::identity(1);
        for name in ["", ".", "..", "dir/model", "dir\\model", "a\"b", "two\nlines", "with space", "modèle"] {
            let options = GenerationOptions::new(name, ".");
            assert!(matches!(
                generate(&stump(1.0), &scaling, &features, &options),
                Err(Error::InvalidArgument(_))
            ));
        }
        for function_name in ["predict-class", "main", "printf", "EOF"] {
            let mut options = options();
            options.function_name = function_name.into();
            assert!(matches!(
                generate(&stump(1.0), &scaling, &features, &options),
                Err(Error::InvalidArgument(_))
            ));
        }

        let options = GenerationOptions::new("tree-v1.2_final", ".");
        let sources = generate(&stump(1.0), &scaling, &features, &options).unwrap();
        assert!(sources.source.starts_with("#include \"tree-v1.2_final.h\"\n"));
        assert!(sources.header.starts_with("#ifndef TREE_V1_2_FINAL_H\n"));
    }

    #[test]
    fn single_leaf_tree_returns_constant() {
        let tree = Tree::new(vec![-1], vec![-1], vec![-2], vec![-2.0], vec![vec![1.0, 3.0]]);
        let features = FeatureSpec::new(&["x"]).unwrap();
        let source = generate(&tree, &ScalingParams::identity(1), &features, &options()).unwrap().source;
        assert_eq!(block_labels(&source), vec![0]);
        assert!(source.contains("NODE_0:\n    return 1;"));
        assert!(jump_targets(&source).is_empty());
    }

    proptest! {
        #[test]
        fn program_matches_in_memory_tree(
            decisions in prop::collection::vec((any::<bool>(), 0usize..3, -10.0f64..10.0), 0..24),
            mean in prop::collection::vec(-5.0f64..5.0, 3),
            scale in prop::collection::vec(0.1f64..4.0, 3),
            raw in prop::collection::vec(-30.0f64..30.0, 3),
        ) {
            let tree = grow_tree(&decisions, 3, 4);
            let features = FeatureSpec::new(&["f0", "f1", "f2"]).unwrap();
            let scaling = ScalingParams::new(mean, scale).unwrap();
            let program = build_program(&tree, &scaling, &features).unwrap();
            prop_assert_eq!(program.evaluate(&raw), predict_raw(&tree, &scaling, &raw));

            let source = render_source(&program, &features, &options()).unwrap();
            let labels = block_labels(&source);
            prop_assert_eq!(labels, (0..tree.node_count()).collect::<Vec<_>>());
            let mut targets = jump_targets(&source);
            targets.sort_unstable();
            prop_assert_eq!(targets, (1..tree.node_count()).collect::<Vec<_>>());
        }

        #[test]
        fn thresholds_route_left_on_equality(
            decisions in prop::collection::vec((any::<bool>(), 0usize..2, -10.0f64..10.0), 1..16),
        ) {
            let tree = grow_tree(&decisions, 2, 2);
            let features = FeatureSpec::new(&["f0", "f1"]).unwrap();
            let scaling = ScalingParams::identity(2);
            let program = build_program(&tree, &scaling, &features).unwrap();
            if !tree.is_leaf(0) {
                let mut raw = vec![0.0, 0.0];
                raw[tree.feature(0)] = tree.threshold(0);
                prop_assert_eq!(program.evaluate(&raw), predict_raw(&tree, &scaling, &raw));
                let mut node = tree.left(0);
                while !tree.is_leaf(node) {
                    node = if raw[tree.feature(node)] <= tree.threshold(node) { tree.left(node) } else { tree.right(node) };
                }
                prop_assert_eq!(program.evaluate(&raw), tree.leaf_class(node));
            }
        }
    }
}

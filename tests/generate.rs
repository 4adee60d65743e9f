use std::fs;
use std::io::Cursor;
use std::process::Command;

use dtc2c::codegen::build_program;
use dtc2c::{
    convert, evaluate_dataset, make_test, BuildOutcome, Error, FeatureSpec, GenerationOptions,
    ScalingParams, Tree,
};
use tempfile::TempDir;

// The header scans as the sample (9, 0), which the stump misclassifies, so
// any run that scored it would report a different accuracy.
const DATASET: &str = "9,0\n5.0,0\n5.0001,1\n-3,0\n7,0\n";

fn stump() -> Tree {
    Tree::new(
        vec![1, -1, -1],
        vec![2, -1, -1],
        vec![0, -2, -2],
        vec![5.0, -2.0, -2.0],
        vec![vec![3.0, 3.0], vec![3.0, 0.0], vec![0.0, 3.0]],
    )
}

fn setup() -> (TempDir, GenerationOptions, FeatureSpec, ScalingParams) {
    let temp = tempfile::tempdir().expect("create tempdir");
    let options = GenerationOptions::new("Stump", temp.path().join("code").join("nested"));
    let features = FeatureSpec::new(&["x"]).unwrap();
    let scaling = ScalingParams::new(vec![0.0], vec![1.0]).unwrap();
    (temp, options, features, scaling)
}

#[test]
fn convert_then_make_test_writes_three_artifacts() {
    let (_temp, options, features, scaling) = setup();

    let artifacts = convert(&stump(), &scaling, &features, &options).unwrap();
    assert!(artifacts.header_path.is_file());
    assert!(artifacts.source_path.is_file());
    let header = fs::read_to_string(&artifacts.header_path).unwrap();
    assert!(header.contains("int DTC_Predict(double x);"));

    let harness = make_test(&features, false, &options).unwrap();
    assert!(harness.build.is_none());
    let text = fs::read_to_string(&harness.path).unwrap();
    assert!(text.contains("#include \"Stump.h\""));
    assert!(text.contains("DTC_Predict(row[0])"));
}

#[test]
fn repeated_generation_is_byte_identical() {
    let (_temp, options, features, scaling) = setup();

    convert(&stump(), &scaling, &features, &options).unwrap();
    make_test(&features, false, &options).unwrap();
    let first: Vec<Vec<u8>> = [options.header_path(), options.source_path(), options.tester_source_path()]
        .iter()
        .map(|p| fs::read(p).unwrap())
        .collect();

    convert(&stump(), &scaling, &features, &options).unwrap();
    make_test(&features, false, &options).unwrap();
    let second: Vec<Vec<u8>> = [options.header_path(), options.source_path(), options.tester_source_path()]
        .iter()
        .map(|p| fs::read(p).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[test]
fn invalid_model_writes_nothing() {
    let (_temp, options, features, scaling) = setup();
    let broken = Tree::new(vec![1, -1], vec![5, -1], vec![0, -2], vec![1.0, -2.0], vec![vec![1.0]; 2]);

    let err = convert(&broken, &scaling, &features, &options).unwrap_err();
    assert!(matches!(err, Error::MalformedTree(_)));
    assert!(!options.out_dir.exists());

    let err = make_test(&features, false, &options).unwrap_err();
    assert!(matches!(err, Error::MissingArtifact { .. }));
}

#[test]
fn reference_evaluation_reports_three_of_four() {
    let (_temp, _options, features, scaling) = setup();
    let program = build_program(&stump(), &scaling, &features).unwrap();
    let evaluation = evaluate_dataset(Cursor::new(DATASET), 1, None, |raw| program.evaluate(raw)).unwrap();
    assert_eq!(evaluation.accuracy(), 0.75);

    let limited = evaluate_dataset(Cursor::new(DATASET), 1, Some(2), |raw| program.evaluate(raw)).unwrap();
    assert_eq!(limited.total, 2);
    assert_eq!(limited.accuracy(), 1.0);
}

/// Builds and runs the harness when a C compiler is available; otherwise
/// only checks that the failed build was swallowed.
#[test]
fn compiled_harness_matches_reference_accuracy() {
    let (temp, options, features, scaling) = setup();
    convert(&stump(), &scaling, &features, &options).unwrap();
    let harness = make_test(&features, true, &options).unwrap();
    assert!(harness.path.is_file());

    let Some(BuildOutcome::Built(executable)) = harness.build else {
        return;
    };

    let dataset = temp.path().join("data.csv");
    fs::write(&dataset, DATASET).unwrap();

    let output = Command::new(&executable).arg(&dataset).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Total accuracy:  0.750000"));

    let output = Command::new(&executable).arg(&dataset).arg("2").output().unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("Total accuracy:  1.000000"));

    let output = Command::new(&executable).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let output = Command::new(&executable).arg(temp.path().join("missing.csv")).output().unwrap();
    assert_ne!(output.status.code(), Some(0));
}

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use dtc2c::config::{GenerationOptions, DEFAULT_ARTIFACT_NAME, DEFAULT_FUNCTION_NAME};
use dtc2c::{data, harness, results, BuildOutcome, Error, FeatureSpec, Result};

/// Compile a decision tree classifier into C and generate an accuracy harness.
#[derive(Parser, Debug)]
#[command(name = "dtc2c", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write `<name>.h` and `<name>.c` implementing the tree.
    Convert(ConvertArgs),
    /// Write `<name>_Tester.c` and optionally compile it.
    MakeTest(MakeTestArgs),
    /// Measure the accuracy of the model on a dataset without generating code.
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct ModelInputs {
    /// JSON dump of the tree arrays.
    #[arg(long)]
    model: PathBuf,
    /// JSON dump of the scaler (`mean_`, `scale_`).
    #[arg(long)]
    scaler: PathBuf,
}

#[derive(Args, Debug)]
struct Output {
    /// Base name of the generated files.
    #[arg(long, default_value = DEFAULT_ARTIFACT_NAME)]
    name: String,
    /// Destination directory (created if absent).
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Name of the generated prediction function.
    #[arg(long, default_value = DEFAULT_FUNCTION_NAME)]
    function_name: String,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    #[command(flatten)]
    inputs: ModelInputs,
    /// Feature names in training column order.
    #[arg(long, value_delimiter = ',', required = true)]
    features: Vec<String>,
    #[command(flatten)]
    output: Output,
}

#[derive(Args, Debug)]
struct MakeTestArgs {
    /// Feature names in training column order.
    #[arg(long, value_delimiter = ',', required = true)]
    features: Vec<String>,
    /// Try to build the harness with the C compiler afterwards.
    #[arg(long)]
    compile: bool,
    /// C compiler for `--compile` (defaults to $CC, then gcc).
    #[arg(long)]
    compiler: Option<String>,
    #[command(flatten)]
    output: Output,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    #[command(flatten)]
    inputs: ModelInputs,
    /// Feature names in training column order.
    #[arg(long, value_delimiter = ',', required = true)]
    features: Vec<String>,
    /// Dataset with a header line, feature columns, then the label column.
    #[arg(long)]
    dataset: PathBuf,
    /// Evaluate at most this many data rows.
    #[arg(long)]
    limit: Option<usize>,
    /// Write per-row predictions to this CSV file.
    #[arg(long)]
    predictions_out: Option<PathBuf>,
}

impl Output {
    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            function_name: self.function_name.clone(),
            ..GenerationOptions::new(self.name.clone(), self.out_dir.clone())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Convert(args) => {
            let features = FeatureSpec::new(&args.features)?;
            let options = args.output.options();
            let artifacts =
                data::convert_from_files(&args.inputs.model, &args.inputs.scaler, &features, &options)?;
            println!("{}", artifacts.header_path.display());
            println!("{}", artifacts.source_path.display());
        }
        Command::MakeTest(args) => {
            let features = FeatureSpec::new(&args.features)?;
            let mut options = args.output.options();
            if let Some(compiler) = args.compiler {
                options.compiler = compiler;
            }
            let artifact = harness::make_test(&features, args.compile, &options)?;
            println!("{}", artifact.path.display());
            if let Some(BuildOutcome::Built(executable)) = &artifact.build {
                println!("{}", executable.display());
            }
        }
        Command::Evaluate(args) => {
            let features = FeatureSpec::new(&args.features)?;
            let tree = data::load_tree(&args.inputs.model)?;
            let scaling = data::load_scaler(&args.inputs.scaler)?;
            // evaluate through the same block program the C source is printed from
            let program = dtc2c::codegen::build_program(&tree, &scaling, &features)?;

            let file = File::open(&args.dataset).map_err(|e| Error::FileSystem {
                path: args.dataset.clone(),
                source: e,
            })?;
            let evaluation = harness::evaluate_dataset(BufReader::new(file), features.len(), args.limit, |raw| {
                program.evaluate(raw)
            })?;
            results::print_summary(&args.dataset, &evaluation);
            if let Some(path) = args.predictions_out {
                results::write_predictions_csv(&path, &evaluation)?;
            }
        }
    }
    Ok(())
}

use std::fs::File;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::{Error, Result};
use crate::harness::Evaluation;

/// Prints a short accuracy summary to the console.
pub fn print_summary(dataset: &Path, evaluation: &Evaluation) {
    println!("\n======== EVALUATION SUMMARY ({}) ========", dataset.display());
    println!("Rows     | Correct  | Wrong    | Accuracy");
    println!("---------|----------|----------|---------");
    println!(
        "{:>8} | {:>8} | {:>8} | {:>8.6}",
        evaluation.total,
        evaluation.correct,
        evaluation.total - evaluation.correct,
        evaluation.accuracy()
    );
    println!("==========================================");
}

/// Writes one CSV row per evaluated data row: `Row,Actual,Predicted,Correct`.
pub fn write_predictions_csv(path: &Path, evaluation: &Evaluation) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::file_system(path, e))?; // Create or truncate
    let mut wtr = WriterBuilder::new().from_writer(file);

    wtr.write_record(["Row", "Actual", "Predicted", "Correct"])
        .map_err(csv_error)?;
    for outcome in &evaluation.rows {
        wtr.write_record([
            outcome.row.to_string(),
            outcome.actual.to_string(),
            outcome.predicted.to_string(),
            outcome.is_correct().to_string(),
        ])
        .map_err(csv_error)?;
    }

    wtr.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> Error {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => Error::Io(io),
        other => Error::Io(std::io::Error::other(format!("{other:?}"))),
    }
}

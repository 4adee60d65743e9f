//! Emits a standalone C program that measures the accuracy of a converted
//! model on a delimited dataset, and evaluates the same dataset in Rust with
//! the same row and field rules for decimal data.
//!
//! Dataset format: one header line, then one row per sample holding the
//! feature values in feature order followed by the integer ground-truth
//! label. Fields are read with a "scan a number, skip one delimiter" rule;
//! there is no quoting or escaping.

use std::io::BufRead;
use std::path::PathBuf;

use tracing::info;

use crate::codegen::{self, syntax};
use crate::config::{GenerationOptions, HARNESS_LINE_BUFFER};
use crate::error::{Error, Result};
use crate::export;
use crate::external::{self, BuildOutcome};
use crate::tree::FeatureSpec;

/// The written harness and, when requested, the outcome of building it.
#[derive(Debug)]
pub struct HarnessArtifact {
    pub path: PathBuf,
    pub source: String,
    pub build: Option<BuildOutcome>,
}

/// Writes `<name>_Tester.c` next to the converted model and optionally compiles it.
///
/// # Errors
/// * `InvalidArgument` for an unusable artifact or function name.
/// * `MissingArtifact` if `<name>.c` or `<name>.h` does not exist yet.
/// * `FileSystem` if the harness cannot be written.
///
/// Build failures are never returned; see [`external::compile_tester`].
pub fn make_test(features: &FeatureSpec, compile: bool, options: &GenerationOptions) -> Result<HarnessArtifact> {
    codegen::validate_options(options)?;
    for path in [options.source_path(), options.header_path()] {
        if !path.is_file() {
            return Err(Error::MissingArtifact { path });
        }
    }

    let source = render_harness(features, options);
    export::ensure_dir(options.out_dir())?;
    let path = options.tester_source_path();
    export::write_artifact(&path, &source)?;

    let build = compile.then(|| external::compile_tester(options));
    Ok(HarnessArtifact { path, source, build })
}

/// Renders the complete harness program.
///
/// Usage: `<program> dataset [num_lines]`. Exit code 1 on bad usage, -1 when
/// the dataset cannot be opened, 0 after printing `Total accuracy:  <acc>`.
pub fn render_harness(features: &FeatureSpec, options: &GenerationOptions) -> String {
    let n_features = features.len();
    let call_args = (0..n_features)
        .map(|i| format!("row[{i}]"))
        .collect::<Vec<_>>()
        .join(", ");
    let column_help = features
        .names()
        .iter()
        .map(|name| format!("[{}] ", syntax::escape_format(name)))
        .collect::<String>();

    format!(
        r#"#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include "{name}.h"

#define FEATURE_COUNT {n_features}
#define FIELD_COUNT {n_fields}
#define LINE_BUFFER {line_buffer}

static void print_usage(const char *program) {{
    printf("Usage: %s [dataset] (num_lines)\n[] - mandatory () - optional\n", program);
    printf("* dataset    - delimited file with one header line followed by one sample per line.\n");
    printf("* num_lines  - Number of data lines to evaluate. Stops at end of file if larger.\n");
    printf("Expected columns, in order:\n\t{column_help}[actual_value]\n");
}}

static int is_blank(const char *line) {{
    while (*line == ' ' || *line == '\t' || *line == '\r' || *line == '\n') {{
        line++;
    }}
    return *line == '\0';
}}

/* Scans FIELD_COUNT numbers from line, skipping exactly one delimiter after each. */
static void parse_row(const char *line, double *row) {{
    const char *cursor = line;
    int i;
    for (i = 0; i < FIELD_COUNT; i++) {{
        char *end;
        row[i] = strtod(cursor, &end);
        cursor = end;
        if (*cursor != '\0') {{
            cursor++;
        }}
    }}
}}

/* Accuracy over the data rows after the header; a negative limit reads every row. */
static double evaluate(FILE *dataset, long limit) {{
    char line[LINE_BUFFER];
    double row[FIELD_COUNT];
    long correct = 0;
    long total = 0;

    if (fgets(line, sizeof(line), dataset) == NULL) {{
        return 0.0;
    }}

    while ((limit < 0 || total < limit) && fgets(line, sizeof(line), dataset) != NULL) {{
        int actual;
        int predicted;
        if (is_blank(line)) {{
            continue;
        }}
        parse_row(line, row);
        actual = (int)row[FEATURE_COUNT];
        predicted = {function}({call_args});
        if (predicted == actual) {{
            correct++;
        }}
        total++;
    }}

    if (total == 0) {{
        return 0.0;
    }}
    return (double)correct / (double)total;
}}

int main(int argc, char *argv[]) {{
    long limit = -1;
    FILE *dataset;
    double accuracy;

    if (argc < 2 || argc > 3) {{
        print_usage(argv[0]);
        return 1;
    }}
    if (argc == 3) {{
        char *end;
        limit = strtol(argv[2], &end, 10);
        if (end == argv[2] || *end != '\0' || limit < 0) {{
            print_usage(argv[0]);
            return 1;
        }}
    }}

    dataset = fopen(argv[1], "r");
    if (dataset == NULL) {{
        printf("ERROR: FILE CAN NOT BE ACCESSED!\n");
        return -1;
    }}

    accuracy = evaluate(dataset, limit);
    fclose(dataset);

    printf("Total accuracy:  %lf\n", accuracy);
    return 0;
}}
"#,
        name = options.name,
        n_fields = n_features + 1,
        line_buffer = HARNESS_LINE_BUFFER,
        function = options.function_name,
    )
}

// --- Reference evaluation (the harness rules, decimal fields only) ---

/// Scans the longest leading decimal number after optional whitespace,
/// like `strtod`. Returns the value and the number of bytes consumed, or
/// `(0.0, 0)` when no number starts here.
///
/// Only decimal notation is recognized. `strtod` also accepts hexadecimal
/// floats and `inf`/`nan`; such fields read as `0.0` here.
fn scan_number(bytes: &[u8]) -> (f64, usize) {
    let mut pos = 0;
    // C `isspace`: ASCII whitespace plus vertical tab
    while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'\x0b') {
        pos += 1;
    }
    let start = pos;
    if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
        pos += 1;
    }
    let int_digits = count_digits(&bytes[pos..]);
    pos += int_digits;
    let mut frac_digits = 0;
    if pos < bytes.len() && bytes[pos] == b'.' {
        frac_digits = count_digits(&bytes[pos + 1..]);
        if int_digits + frac_digits > 0 {
            pos += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return (0.0, 0);
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_digits = count_digits(&bytes[exp..]);
        if exp_digits > 0 {
            pos = exp + exp_digits;
        }
    }
    // the slice is ASCII sign, digits, '.' and exponent only; it always parses
    let value = std::str::from_utf8(&bytes[start..pos])
        .ok()
        .and_then(|number| number.parse().ok())
        .unwrap_or(0.0);
    (value, pos)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Splits a data line into exactly `count` numbers.
///
/// Repeatedly scans a number and skips one delimiter byte, so a multi-byte
/// UTF-8 delimiter leaves its trailing bytes to be read as an empty field.
/// A field that does not start with a number reads as `0.0`; missing
/// trailing fields read as `0.0`.
pub fn scan_fields(line: &str, count: usize) -> Vec<f64> {
    let mut fields = Vec::with_capacity(count);
    let mut rest = line.as_bytes();
    for _ in 0..count {
        let (value, consumed) = scan_number(rest);
        fields.push(value);
        rest = &rest[consumed..];
        if let Some((_, tail)) = rest.split_first() {
            rest = tail;
        }
    }
    fields
}

/// Outcome of one evaluated data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutcome {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    pub actual: i64,
    pub predicted: i64,
}

impl RowOutcome {
    pub fn is_correct(&self) -> bool {
        self.actual == self.predicted
    }
}

/// Correct/total counts over the evaluated rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
    pub rows: Vec<RowOutcome>,
}

impl Evaluation {
    /// `correct / total`, or 0.0 when no row was evaluated.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Evaluates `predict` on a dataset the way the generated harness does.
///
/// Skips the header, ignores blank lines, and stops after `limit` data rows
/// when given. `predict` receives the raw feature values in feature order.
pub fn evaluate_dataset<R, F>(reader: R, n_features: usize, limit: Option<usize>, mut predict: F) -> Result<Evaluation>
where
    R: BufRead,
    F: FnMut(&[f64]) -> i64,
{
    let mut evaluation = Evaluation::default();
    let mut lines = reader.lines();
    if lines.next().transpose()?.is_none() {
        return Ok(evaluation);
    }

    for line in lines {
        if limit.is_some_and(|limit| evaluation.total >= limit) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = scan_fields(&line, n_features + 1);
        let outcome = RowOutcome {
            row: evaluation.total + 1,
            actual: fields[n_features] as i64,
            predicted: predict(&fields[..n_features]),
        };
        if outcome.is_correct() {
            evaluation.correct += 1;
        }
        evaluation.total += 1;
        evaluation.rows.push(outcome);
    }

    info!(
        correct = evaluation.correct,
        total = evaluation.total,
        accuracy = evaluation.accuracy(),
        "Evaluated dataset"
    );
    Ok(evaluation)
}

//! Small helpers for producing valid C tokens.

/// Reserved words of C99 (plus `_Bool`-style keywords) that cannot name a parameter.
const C_KEYWORDS: [&str; 37] = [
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch",
    "typedef", "union", "unsigned", "void", "volatile", "while", "_Bool", "_Complex",
    "_Imaginary",
];

/// Macros and type names from `<stdio.h>`, `<stdlib.h>` and `<string.h>`.
/// The harness includes these before the model header, so a parameter or
/// function with one of these names would be expanded or misparsed.
const LIBRARY_NAMES: [&str; 27] = [
    "EOF", "NULL", "BUFSIZ", "FILENAME_MAX", "FOPEN_MAX", "L_tmpnam", "L_ctermid", "P_tmpdir",
    "TMP_MAX", "SEEK_SET", "SEEK_CUR", "SEEK_END", "stdin", "stdout", "stderr", "EXIT_SUCCESS",
    "EXIT_FAILURE", "RAND_MAX", "MB_CUR_MAX", "FILE", "fpos_t", "size_t", "wchar_t", "div_t",
    "ldiv_t", "lldiv_t", "va_list",
];

/// Functions the harness defines or calls; the prediction function cannot reuse them.
const HARNESS_SYMBOLS: [&str; 11] = [
    "main", "print_usage", "is_blank", "parse_row", "evaluate", "printf", "fopen", "fclose",
    "fgets", "strtod", "strtol",
];

/// True for a C identifier (`[A-Za-z_][A-Za-z0-9_]*`) that is usable as a
/// parameter next to the standard headers.
///
/// Rejects keywords, standard header macros and types (`EOF`, `size_t`),
/// and identifiers C reserves for the implementation (`__x`, `_X`).
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let reserved_prefix = name.starts_with("__")
        || (name.starts_with('_') && name[1..].starts_with(|c: char| c.is_ascii_uppercase()));
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !reserved_prefix
        && !C_KEYWORDS.contains(&name)
        && !LIBRARY_NAMES.contains(&name)
}

/// An identifier that does not collide with anything the harness links against.
pub fn is_function_name(name: &str) -> bool {
    is_identifier(name) && !HARNESS_SYMBOLS.contains(&name)
}

/// A file base name usable both on disk and inside `#include "..."`:
/// letters, digits, `_`, `-` and `.`, other than `.` and `..`.
pub fn is_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Formats a double so that a C compiler parses back the exact same value.
///
/// Uses the shortest decimal representation that round-trips (`{:?}`), which
/// always carries a `.` or an exponent and is therefore a `double` literal.
/// Returns `None` for infinities and NaN, which have no C literal form.
pub fn double_literal(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    Some(format!("{value:?}"))
}

/// Include guard macro for an artifact name: `my-model` -> `MY_MODEL_H`.
pub fn include_guard(name: &str) -> String {
    let mut guard: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if guard.starts_with(|c: char| c.is_ascii_digit()) {
        guard.insert(0, '_');
    }
    guard.push_str("_H");
    guard
}

/// Escapes text for use inside a C string literal passed to `printf` as the format.
pub fn escape_format(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '%' => escaped.push_str("%%"),
            other => escaped.push(other),
        }
    }
    escaped
}

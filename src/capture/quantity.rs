//! Kubernetes quantity string parsing
//!
//! Quantities appear in node status as strings like `3500m`, `16419036Ki`,
//! or bare numbers. Parsing is a typed fallible operation; the caller
//! decides how loudly a failure is logged.

use thiserror::Error;

/// A quantity string that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized quantity {0:?}")]
pub struct QuantityError(pub String);

/// Binary suffixes, powers of 1024.
const BINARY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1048576.0),
    ("Gi", 1073741824.0),
    ("Ti", 1099511627776.0),
    ("Pi", 1125899906842624.0),
    ("Ei", 1152921504606846976.0),
];

/// Decimal suffixes, powers of 1000, plus milli.
const DECIMAL_SUFFIXES: &[(char, f64)] = &[
    ('m', 1e-3),
    ('k', 1e3),
    ('M', 1e6),
    ('G', 1e9),
    ('T', 1e12),
    ('P', 1e15),
    ('E', 1e18),
];

/// Parse a quantity string into a plain number in base units.
///
/// CPU quantities come back in cores (`500m` → 0.5) and memory quantities
/// in bytes (`1Ki` → 1024). Exponent forms like `12e6` are accepted via the
/// ordinary float syntax.
pub fn parse_quantity(input: &str) -> Result<f64, QuantityError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(QuantityError(input.to_string()));
    }

    for (suffix, multiplier) in BINARY_SUFFIXES {
        if let Some(number) = text.strip_suffix(suffix) {
            return parse_number(number, input).map(|n| n * multiplier);
        }
    }

    // A decimal suffix only counts when digits precede it, so `1E` is one
    // exa-unit while `1E3` stays ordinary exponent notation.
    if let Some(last) = text.chars().last() {
        if let Some((_, multiplier)) = DECIMAL_SUFFIXES.iter().find(|(c, _)| *c == last) {
            let number = &text[..text.len() - last.len_utf8()];
            return parse_number(number, input).map(|n| n * multiplier);
        }
    }

    parse_number(text, input)
}

fn parse_number(number: &str, original: &str) -> Result<f64, QuantityError> {
    if number.is_empty() {
        return Err(QuantityError(original.to_string()));
    }
    number
        .parse::<f64>()
        .map_err(|_| QuantityError(original.to_string()))
}

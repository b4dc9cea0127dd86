//! Value codec for case-table cells.
//!
//! Cells carry either a literal value or a compact repetition such as
//! `"A" x 201`, which expands to 201 `A`s. Boundary-length cases use the
//! repetition form so the table never stores huge literals.
//!
//! Decoding is total: a cell that does not parse as a repetition is returned
//! verbatim (minus surrounding quotes). So is a repetition whose expansion
//! would exceed [`MAX_EXPANDED_LEN`] bytes.

/// Separator between fragment and count in a repetition cell.
const REPEAT_SEPARATOR: &str = " x ";

const QUOTE: char = '"';

/// Largest expansion, in bytes, a repetition cell may produce.
pub const MAX_EXPANDED_LEN: usize = 1 << 20;

/// Decode a raw cell into the literal value to type into the form.
///
/// An empty result means "leave the field untouched".
#[must_use]
pub fn decode(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "\"\"" {
        return String::new();
    }

    let value = trimmed.trim_matches(QUOTE);

    if let Some(expanded) = expand_repetition(value) {
        return expanded;
    }

    value.to_string()
}

/// Expand `<fragment> x <count>`; `None` if the cell is not exactly that shape.
fn expand_repetition(value: &str) -> Option<String> {
    let mut parts = value.split(REPEAT_SEPARATOR);
    let fragment = parts.next()?;
    let count = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let count: usize = count.trim().parse().ok()?;
    let fragment = fragment.trim().trim_matches(QUOTE);
    let len = fragment.len().checked_mul(count)?;
    if len > MAX_EXPANDED_LEN {
        return None;
    }
    Some(fragment.repeat(count))
}

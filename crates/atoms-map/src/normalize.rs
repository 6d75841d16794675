//! Header normalization.

use atoms_model::fold_accents;

/// Normalize a raw header for comparison.
///
/// Strips a BOM, drops parenthesised digit groups such as `(12)`, folds
/// accented letters to ASCII and replaces anything outside `[A-Za-z0-9_]`
/// with `_`. Repeated underscores collapse and leading or trailing ones are
/// trimmed. Case is preserved.
pub fn normalize_header(raw: &str) -> String {
    let without_groups = strip_digit_groups(raw.trim_start_matches('\u{feff}'));
    let folded = fold_accents(without_groups.trim());

    let mut out = String::with_capacity(folded.len());
    let mut pending_sep = false;
    for ch in folded.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Uppercased [`normalize_header`]; the exact-pass comparison key.
pub fn header_key(raw: &str) -> String {
    normalize_header(raw).to_ascii_uppercase()
}

/// [`header_key`] without separators, used for fuzzy scoring.
pub fn compact_key(raw: &str) -> String {
    header_key(raw).replace('_', "")
}

fn strip_digit_groups(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        match after.find(')') {
            Some(close)
                if close > 0 && after[..close].chars().all(|ch| ch.is_ascii_digit()) =>
            {
                out.push_str(&rest[..open]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

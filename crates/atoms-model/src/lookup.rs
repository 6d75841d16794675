use std::collections::HashMap;

/// Replace accented Latin letters with their ASCII base letter.
///
/// Covers the Latin-1 Supplement and the handful of Latin Extended-A letters
/// that show up in Spanish and Portuguese headers. The replacement character
/// produced by a mis-decoded file (`\u{fffd}`) is dropped so that
/// `C\u{fffd}digo` still lands near `Codigo` for fuzzy matching.
pub fn fold_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' => out.push('a'),
            'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' => out.push('A'),
            'é' | 'è' | 'ê' | 'ë' | 'ē' => out.push('e'),
            'É' | 'È' | 'Ê' | 'Ë' | 'Ē' => out.push('E'),
            'í' | 'ì' | 'î' | 'ï' | 'ī' => out.push('i'),
            'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' => out.push('I'),
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ō' | 'ø' => out.push('o'),
            'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ō' | 'Ø' => out.push('O'),
            'ú' | 'ù' | 'û' | 'ü' | 'ū' => out.push('u'),
            'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ū' => out.push('U'),
            'ñ' => out.push('n'),
            'Ñ' => out.push('N'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'ý' | 'ÿ' => out.push('y'),
            'Ý' => out.push('Y'),
            '\u{fffd}' | '\u{feff}' => {}
            // Combining diacritical marks left over from decomposed input.
            '\u{0300}'..='\u{036f}' => {}
            other => out.push(other),
        }
    }
    out
}

/// Comparison key for a column name: accents folded, every run of
/// non-alphanumeric characters collapsed to one `_`, uppercased.
///
/// `"Número_Préstamo"`, `"numero prestamo"` and `"NUMERO-PRESTAMO"` share a key.
pub fn column_key(name: &str) -> String {
    let folded = fold_accents(name);
    let mut key = String::with_capacity(folded.len());
    let mut pending_sep = false;
    for ch in folded.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.push(ch.to_ascii_uppercase());
        } else {
            pending_sep = true;
        }
    }
    key
}

/// Accent- and case-insensitive index over a set of column names.
///
/// The first name registered under a key wins.
#[derive(Debug, Clone, Default)]
pub struct ColumnLookup {
    map: HashMap<String, usize>,
}

impl ColumnLookup {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = HashMap::new();
        for (idx, name) in names.into_iter().enumerate() {
            map.entry(column_key(name.as_ref())).or_insert(idx);
        }
        Self { map }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.map.get(&column_key(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&column_key(name))
    }
}

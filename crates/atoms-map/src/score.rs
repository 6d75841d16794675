//! Fuzzy header similarity.
//!
//! Uses the normalized Indel similarity (`1 - indel_distance / (len_a + len_b)`),
//! the same ratio classic fuzzy-matching libraries report, on separator-free
//! header keys.

use rapidfuzz::distance::indel;

use crate::normalize::compact_key;

/// Similarity of two headers in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = compact_key(a);
    let b = compact_key(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    indel::normalized_similarity(a.chars(), b.chars())
}

/// Best-scoring candidate for `target`, if any reaches `threshold`.
///
/// Ties keep the earliest candidate so results follow input order.
pub fn best_match<'a, I>(target: &str, candidates: I, threshold: f64) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates {
        let score = similarity(target, candidate);
        if best.is_none_or(|(_, current)| score > current) {
            best = Some((idx, score));
        }
    }
    best.filter(|(_, score)| *score >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_keys_score_one() {
        assert_eq!(similarity("Número_Préstamo", "numero prestamo"), 1.0);
    }

    #[test]
    fn near_misses_score_high() {
        let score = similarity("Numero_Prestamo", "Numero_Prestmo");
        assert!(score > 0.95, "{score}");
        assert!(similarity("Valor_Ponderado", "Columna_Extra") < 0.75);
    }

    #[test]
    fn ties_prefer_first_candidate() {
        let candidates = [(0, "Fecha_Inicio"), (1, "Fecha_Inicio")];
        assert_eq!(
            best_match("Fecha_Inicio", candidates, 0.75).map(|(idx, _)| idx),
            Some(0)
        );
        assert_eq!(best_match("Fecha_Inicio", [(0, "Monto")], 0.75), None);
    }
}

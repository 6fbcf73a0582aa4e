//! String similarity used by the fuzzy, wiki, and lookup generators.
//!
//! [`token_set_ratio`] compares the *sets* of whitespace tokens of two
//! strings, so word order and repeated words do not matter, and a string
//! whose tokens are a subset of the other's scores 100.

use std::collections::BTreeSet;

use rapidfuzz::distance::indel;

/// Lowercase and turn `-`, `_`, `.` into spaces.
pub fn normalize(text: &str) -> String {
    text.replace(['-', '_', '.'], " ").to_lowercase()
}

/// Token-set similarity in `[0, 100]`.
///
/// Splits both inputs on whitespace into token sets. If they share a token
/// and one set contains the other, the score is 100. Otherwise the sorted
/// intersection `I` and the sorted differences `A`, `B` are joined with
/// spaces and the best normalized Indel similarity among `I+A` vs `I+B`,
/// `I` vs `I+A` and `I` vs `I+B` is returned. Either side empty scores 0.
pub fn token_set_ratio(left: &str, right: &str) -> f64 {
    let a: BTreeSet<&str> = left.split_whitespace().collect();
    let b: BTreeSet<&str> = right.split_whitespace().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = a.intersection(&b).copied().collect();
    let only_a: Vec<&str> = a.difference(&b).copied().collect();
    let only_b: Vec<&str> = b.difference(&a).copied().collect();

    if !sect.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let diff_a = only_a.join(" ");
    let diff_b = only_b.join(" ");
    let a_len = diff_a.chars().count();
    let b_len = diff_b.chars().count();
    let sect_len = sect.join(" ").chars().count();
    let sep = usize::from(sect_len != 0);

    let sect_a_len = sect_len + sep + a_len;
    let sect_b_len = sect_len + sep + b_len;

    // The shared prefix contributes nothing to the distance.
    let diffs = normalized(indel_distance(&diff_a, &diff_b), sect_a_len + sect_b_len);
    if sect_len == 0 {
        return diffs;
    }

    let sect_vs_a = normalized(sep + a_len, sect_len + sect_a_len);
    let sect_vs_b = normalized(sep + b_len, sect_len + sect_b_len);

    diffs.max(sect_vs_a).max(sect_vs_b)
}

fn normalized(distance: usize, total_len: usize) -> f64 {
    if total_len == 0 {
        return 100.0;
    }
    100.0 - 100.0 * distance as f64 / total_len as f64
}

/// Insertions plus deletions needed to turn one string into the other,
/// counted in chars.
fn indel_distance(left: &str, right: &str) -> usize {
    indel::distance(left.chars(), right.chars())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn normalize_separators() {
        assert_eq!(normalize("Roof-Coating_v2.final"), "roof coating v2 final");
    }

    #[test]
    fn identical_and_subset_are_perfect() {
        assert_eq!(token_set_ratio("jon smith", "jon smith"), 100.0);
        assert_eq!(token_set_ratio("smith jon", "jon smith"), 100.0);
        assert_eq!(token_set_ratio("roof coating", "roof coating upgrade"), 100.0);
        assert_eq!(token_set_ratio("luca", "luca conti"), 100.0);
    }

    #[test]
    fn partial_token_overlap() {
        // diffs "jon" vs "jonathan": indel 5 over 9 + 14
        approx(token_set_ratio("jon smith", "jonathan smith"), 100.0 - 500.0 / 23.0);
    }

    #[test]
    fn disjoint_tokens_use_plain_indel() {
        assert_eq!(token_set_ratio("abc", "xyz"), 0.0);
        // "marta" vs "martha": indel 1 over 11
        approx(token_set_ratio("marta", "martha"), 100.0 - 100.0 / 11.0);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(token_set_ratio("", "anything"), 0.0);
        assert_eq!(token_set_ratio("   ", "anything"), 0.0);
    }

    #[test]
    fn case_is_not_folded() {
        assert!(token_set_ratio("Roof", "roof") < 100.0);
    }

    #[test]
    fn indel_counts_insertions_and_deletions() {
        assert_eq!(indel_distance("jon", "jonathan"), 5);
        assert_eq!(indel_distance("abc", "xyz"), 6);
        assert_eq!(indel_distance("", ""), 0);
    }

    #[test]
    fn indel_counts_chars_not_bytes() {
        assert_eq!(indel_distance("città", "citta"), 2);
    }
}

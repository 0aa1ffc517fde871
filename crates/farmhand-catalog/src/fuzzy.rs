//! Approximate item-name matching.
//!
//! Names are normalized (lower-case, alphanumerics only, single spaces) and
//! compared with a similarity ratio of `2 * LCS / (len_a + len_b)` over
//! characters, the same measure classic sequence matchers report. A ratio
//! of 1.0 means identical; unrelated strings fall towards 0.

/// Minimum similarity for a name to count as a match.
pub const MATCH_THRESHOLD: f64 = 0.7;

/// Normalize a name for comparison.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Length of the longest common subsequence of two character slices.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0_usize; b.len().saturating_add(1)];
    let mut curr = vec![0_usize; b.len().saturating_add(1)];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            let next = j.saturating_add(1);
            let value = if ca == cb {
                prev.get(j).copied().unwrap_or(0).saturating_add(1)
            } else {
                let up = prev.get(next).copied().unwrap_or(0);
                let left = curr.get(j).copied().unwrap_or(0);
                up.max(left)
            };
            if let Some(slot) = curr.get_mut(next) {
                *slot = value;
            }
        }
        core::mem::swap(&mut prev, &mut curr);
    }
    prev.last().copied().unwrap_or(0)
}

/// Similarity ratio of two already-normalized strings, in `[0.0, 1.0]`.
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len().saturating_add(b.len());
    if total == 0 {
        return 1.0;
    }
    let matches = lcs_len(&a, &b).saturating_mul(2);
    matches as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_noise() {
        assert_eq!(normalize("  Apple   Tree! "), "apple tree");
        assert_eq!(normalize("apple-pie"), "apple pie");
        assert_eq!(normalize("***"), "");
    }

    #[test]
    fn identical_is_one() {
        assert!((similarity("wheat", "wheat") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn typo_still_matches() {
        assert!(similarity("leture", "lettuce") >= MATCH_THRESHOLD);
        assert!(similarity("aple tree", "apple tree") >= MATCH_THRESHOLD);
    }

    #[test]
    fn unrelated_does_not_match() {
        assert!(similarity("cow", "pumpkin seeds") < MATCH_THRESHOLD);
        assert!(similarity("", "milk") < MATCH_THRESHOLD);
    }
}

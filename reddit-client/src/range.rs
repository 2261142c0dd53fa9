//! Candidate-id generation over the sequential id space.
//!
//! Reddit's search API is unreliable for automated bulk polling, so the
//! crawl instead guesses the next block of ids and lets the bulk lookup
//! confirm which ones exist.

use crate::ordinal::{from_ordinal, to_ordinal};
use num_bigint::BigUint;
use prospect_core::OrdinalError;

/// Up to `max_count` ids strictly between `start` and `end`, newest first.
/// Used when a known upper bound exists and the crawl is catching up to it.
pub fn range_between(
    start: &str,
    end: &str,
    max_count: usize,
) -> Result<Vec<String>, OrdinalError> {
    let start_ordinal = to_ordinal(start)?;
    let end_ordinal = to_ordinal(end)?;

    let mut ids = Vec::new();
    if max_count == 0 || end_ordinal <= start_ordinal {
        return Ok(ids);
    }

    let mut current = end_ordinal - 1u32;
    while current > start_ordinal && ids.len() < max_count {
        ids.push(from_ordinal(&current));
        current -= 1u32;
    }
    Ok(ids)
}

/// Exactly `count` ascending ids immediately following `last_id`.
pub fn next_sequential(last_id: &str, count: usize) -> Result<Vec<String>, OrdinalError> {
    let mut current = to_ordinal(last_id)?;
    let one = BigUint::from(1u32);

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        current += &one;
        ids.push(from_ordinal(&current));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_sequential_counts_forward() {
        let ids = next_sequential("zy", 4).unwrap();
        assert_eq!(ids, vec!["zz", "100", "101", "102"]);
    }

    #[test]
    fn test_next_sequential_exact_count_and_strictly_increasing() {
        let ids = next_sequential("1abcz", 250).unwrap();
        assert_eq!(ids.len(), 250);
        for pair in ids.windows(2) {
            assert!(to_ordinal(&pair[0]).unwrap() < to_ordinal(&pair[1]).unwrap());
        }
        assert!(to_ordinal("1abcz").unwrap() < to_ordinal(&ids[0]).unwrap());
    }

    #[test]
    fn test_range_between_is_exclusive_and_descending() {
        let ids = range_between("100", "105", 10).unwrap();
        assert_eq!(ids, vec!["104", "103", "102", "101"]);
    }

    #[test]
    fn test_range_between_honors_max_count() {
        let ids = range_between("100", "200", 5).unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(ids[0], "1zz");
        let start = to_ordinal("100").unwrap();
        let end = to_ordinal("200").unwrap();
        for id in &ids {
            let ordinal = to_ordinal(id).unwrap();
            assert!(ordinal > start && ordinal < end);
        }
    }

    #[test]
    fn test_range_between_empty_cases() {
        assert!(range_between("105", "100", 10).unwrap().is_empty());
        assert!(range_between("100", "100", 10).unwrap().is_empty());
        assert!(range_between("100", "101", 10).unwrap().is_empty());
        assert!(range_between("100", "105", 0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_ids_propagate() {
        assert!(next_sequential("T3_abc", 1).is_err());
        assert!(range_between("abc", "ab!", 1).is_err());
    }
}

//! Set algebra over identifier lists.
//!
//! Rosters are small, order matters for display, and inputs may contain
//! duplicates, so these operate on slices and return deduplicated vectors
//! preserving first-seen order of the left operand.

use std::collections::HashSet;
use std::hash::Hash;

/// Elements of `a` that are not in `b`.
pub fn difference<T: Eq + Hash + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let exclude: HashSet<&T> = b.iter().collect();
    let mut seen = HashSet::new();
    a.iter()
        .filter(|item| !exclude.contains(item) && seen.insert((*item).clone()))
        .cloned()
        .collect()
}

/// Elements of `a` that are also in `b`.
pub fn intersection<T: Eq + Hash + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let keep: HashSet<&T> = b.iter().collect();
    let mut seen = HashSet::new();
    a.iter()
        .filter(|item| keep.contains(item) && seen.insert((*item).clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference_preserves_order_and_dedupes() {
        let a = vec!["c", "a", "b", "a"];
        let b = vec!["b"];
        assert_eq!(difference(&a, &b), vec!["c", "a"]);
    }

    #[test]
    fn test_intersection_preserves_left_order() {
        let a = vec!["c", "a", "b"];
        let b = vec!["b", "c"];
        assert_eq!(intersection(&a, &b), vec!["c", "b"]);
    }

    #[test]
    fn test_empty_operands() {
        let empty: Vec<&str> = vec![];
        assert_eq!(difference(&empty, &["a"]), Vec::<&str>::new());
        assert_eq!(intersection(&["a"], &empty), Vec::<&str>::new());
    }
}

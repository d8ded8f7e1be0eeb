//! Pure string analysis primitives used by the detectors.
//!
//! Both functions are side-effect free and bounded by input length; they
//! carry no reference data and no settings.

use std::collections::HashMap;

/// Classic dynamic-programming Levenshtein distance over `char`s, with
/// unit cost for insert, delete and substitute.
///
/// Symmetric, zero on identical inputs, and satisfies the triangle
/// inequality.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Shannon entropy of a string in bits per character:
/// `-sum(p(c) * log2(p(c)))` over character frequencies.
///
/// Defined as 0.0 for empty input. High entropy in a hostname is a signal
/// of machine-generated (DGA-style) domains.
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_zero_on_identical_strings() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("paypal", "paypal"), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            ("paypal", "paypai"),
            ("google", "g00gle"),
            ("kitten", "sitting"),
            ("", "abc"),
        ];
        for (a, b) in pairs {
            assert_eq!(levenshtein(a, b), levenshtein(b, a), "{} vs {}", a, b);
        }
    }

    #[test]
    fn distance_known_values() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("paypal", "paypai"), 1);
        assert_eq!(levenshtein("amazon", "amaz0n"), 1);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn distance_triangle_inequality_spot_check() {
        let (a, b, c) = ("secure", "secusa", "sicuro");
        assert!(levenshtein(a, c) <= levenshtein(a, b) + levenshtein(b, c));
    }

    #[test]
    fn entropy_of_empty_is_zero() {
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn entropy_of_uniform_string_is_zero() {
        assert_eq!(shannon_entropy("aaaa"), 0.0);
    }

    #[test]
    fn entropy_of_two_symbols_is_one_bit() {
        let e = shannon_entropy("abab");
        assert!((e - 1.0).abs() < 1e-9);
    }

    #[test]
    fn entropy_grows_with_alphabet() {
        let low = shannon_entropy("aaabbb");
        let high = shannon_entropy("abcdef");
        assert!(high > low);
        // 6 distinct symbols over 6 chars: log2(6) bits.
        assert!((high - 6f64.log2()).abs() < 1e-9);
    }
}

//! Space-efficient probabilistic set membership.
//!
//! The tracker classifier holds tens of thousands of domains; probing a
//! Bloom filter first lets the hot path skip the exact per-category scan
//! for the overwhelming majority of domains. The contract consumers rely
//! on: `contains` never returns `false` for an item that was added (no
//! false negatives), so a negative probe safely short-circuits.

use serde::{Deserialize, Serialize};

/// Hard cap on the number of hash functions, matching the point past which
/// extra hashes stop improving the false-positive rate in practice.
const MAX_HASHES: u32 = 20;

/// A fixed-size Bloom filter over string items, using double hashing to
/// derive `hash_count` bit positions from one blake3 hash per item.
///
/// Serialization round-trips losslessly: a deserialized filter reproduces
/// identical `contains` behavior for every previously added item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u64>,
    /// Size of the bit array in bits.
    size: u64,
    hash_count: u32,
    items: u64,
}

impl BloomFilter {
    /// Creates a filter with an explicit bit-array size and hash count.
    pub fn new(size: u64, hash_count: u32) -> Self {
        let size = size.max(1);
        let words = size.div_ceil(64) as usize;
        Self {
            bits: vec![0u64; words],
            size,
            hash_count: hash_count.clamp(1, MAX_HASHES),
            items: 0,
        }
    }

    /// Creates a filter sized for `expected_items` at the target
    /// false-positive rate: `size = ceil(-n * ln(p) / ln(2)^2)`,
    /// `hash_count = min(ceil((size / n) * ln(2)), 20)`.
    pub fn optimal(expected_items: u64, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = false_positive_rate.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let size = (-n * p.ln() / (ln2 * ln2)).ceil() as u64;
        let hash_count = ((size as f64 / n) * ln2).ceil() as u32;
        Self::new(size, hash_count)
    }

    /// Sets the `hash_count` derived bit positions for `item`.
    pub fn add(&mut self, item: &str) {
        let (h1, h2) = Self::base_hashes(item);
        for i in 0..self.hash_count as u64 {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % self.size;
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
        self.items += 1;
    }

    /// Membership probe. `false` is definitive; `true` may be a false
    /// positive and must be confirmed by exact lookup when it matters.
    pub fn contains(&self, item: &str) -> bool {
        let (h1, h2) = Self::base_hashes(item);
        (0..self.hash_count as u64).all(|i| {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % self.size;
            self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0
        })
    }

    /// Estimated false-positive rate given the current fill:
    /// `(bits_set / size)^hash_count`. Diagnostic only.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let set: u64 = self.bits.iter().map(|w| w.count_ones() as u64).sum();
        (set as f64 / self.size as f64).powi(self.hash_count as i32)
    }

    /// Number of items added via `add`.
    pub fn len(&self) -> u64 {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Two independent 64-bit hashes taken from the halves of a single
    /// blake3 digest, combined downstream as `h1 + i * h2`.
    fn base_hashes(item: &str) -> (u64, u64) {
        let digest = blake3::hash(item.as_bytes());
        let bytes = digest.as_bytes();
        let h1 = u64::from_le_bytes(bytes[0..8].try_into().expect("8-byte slice"));
        let h2 = u64::from_le_bytes(bytes[8..16].try_into().expect("8-byte slice"));
        // An even h2 could degenerate the probe sequence; force it odd.
        (h1, h2 | 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_false_negatives_for_added_items() {
        let mut filter = BloomFilter::optimal(1_000, 0.01);
        let items: Vec<String> = (0..1_000).map(|i| format!("tracker-{i}.example")).collect();
        for item in &items {
            filter.add(item);
        }
        for item in &items {
            assert!(filter.contains(item), "false negative for {item}");
        }
    }

    #[test]
    fn definite_negatives_dominate_for_absent_items() {
        let mut filter = BloomFilter::optimal(500, 0.01);
        for i in 0..500 {
            filter.add(&format!("member-{i}"));
        }
        let false_positives = (0..10_000)
            .filter(|i| filter.contains(&format!("absent-{i}")))
            .count();
        // 1% target rate; allow generous slack for hash variance.
        assert!(
            false_positives < 500,
            "false positive count too high: {false_positives}"
        );
    }

    #[test]
    fn optimal_sizing_matches_formula() {
        let filter = BloomFilter::optimal(1_000, 0.01);
        // -1000 * ln(0.01) / ln(2)^2 = 9585.06 -> 9586 bits
        assert_eq!(filter.size, 9586);
        assert_eq!(filter.hash_count, 7);
    }

    #[test]
    fn hash_count_is_capped() {
        let filter = BloomFilter::optimal(10, 1e-9);
        assert!(filter.hash_count <= MAX_HASHES);
    }

    #[test]
    fn false_positive_estimate_tracks_fill() {
        let mut filter = BloomFilter::new(1024, 4);
        assert_eq!(filter.estimated_false_positive_rate(), 0.0);
        for i in 0..200 {
            filter.add(&format!("item-{i}"));
        }
        let estimate = filter.estimated_false_positive_rate();
        assert!(estimate > 0.0 && estimate < 1.0);
    }

    #[test]
    fn serialization_round_trips_contains_behavior() {
        let mut filter = BloomFilter::optimal(100, 0.01);
        for i in 0..100 {
            filter.add(&format!("domain-{i}.net"));
        }
        let encoded = serde_json::to_string(&filter).unwrap();
        let decoded: BloomFilter = serde_json::from_str(&encoded).unwrap();
        assert_eq!(filter, decoded);
        for i in 0..100 {
            assert!(decoded.contains(&format!("domain-{i}.net")));
        }
        assert_eq!(decoded.len(), 100);
    }

    #[test]
    fn empty_filter_contains_nothing() {
        let filter = BloomFilter::new(256, 3);
        assert!(!filter.contains("anything"));
        assert!(filter.is_empty());
    }
}

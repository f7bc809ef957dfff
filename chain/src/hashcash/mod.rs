//! Hashcash-style proof-of-work.
//!
//! `mint` searches for a suffix such that `SHA256(s || suffix)` has at least
//! `n` leading zero bits; `check` verifies the same predicate. The search is
//! a plain incrementing counter, matching the brute-force reference
//! implementation rather than any vectorised or GPU-friendly variant.

use sha2::{Digest, Sha256};

/// Counts the number of leading zero bits in a hash digest.
fn leading_zero_bits(digest: &[u8]) -> u32 {
    let mut count = 0;
    for byte in digest {
        if *byte == 0 {
            count += 8;
            continue;
        }
        count += byte.leading_zeros();
        break;
    }
    count
}

/// Returns `true` if `SHA256(s || suffix)` has at least `difficulty`
/// leading zero bits.
pub fn check(s: &[u8], suffix: &str, difficulty: u32) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(s);
    hasher.update(suffix.as_bytes());
    let digest = hasher.finalize();
    leading_zero_bits(&digest) >= difficulty
}

/// Finds a suffix satisfying [`check`] for the given string and difficulty.
///
/// The suffix is the decimal rendering of an incrementing counter starting
/// at 0. This is the performance-critical inner loop of block minting.
pub fn mint(s: &[u8], difficulty: u32) -> String {
    let mut counter: u64 = 0;
    loop {
        let suffix = counter.to_string();
        if check(s, &suffix, difficulty) {
            return suffix;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_output_always_checks_out() {
        let suffix = mint(b"some block header bytes", 8);
        assert!(check(b"some block header bytes", &suffix, 8));
    }

    #[test]
    fn zero_difficulty_is_satisfied_by_any_suffix() {
        assert!(check(b"anything", "0", 0));
    }

    #[test]
    fn check_fails_for_a_suffix_that_does_not_meet_difficulty() {
        // A suffix minted for a different input is exceedingly unlikely to
        // satisfy a second, unrelated input at a non-trivial difficulty.
        let suffix = mint(b"input-a", 8);
        assert!(!check(b"input-b-entirely-different", &suffix, 24));
    }

    #[test]
    fn leading_zero_bits_counts_across_byte_boundaries() {
        assert_eq!(leading_zero_bits(&[0x00, 0x0f]), 12);
        assert_eq!(leading_zero_bits(&[0xff]), 0);
        assert_eq!(leading_zero_bits(&[0x00, 0x00]), 16);
    }
}

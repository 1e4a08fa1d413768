//! BCH(31,21,5) property sweeps
//!
//! Heavier quantified checks than the codec's unit tests: encode/correct
//! round trips over sampled data words, exhaustive single-error positions,
//! and all double-error pairs for a set of codewords.

use rustyflex::bch::{Bch3121, MESSAGE_BITS_MASK};

fn sample_words(count: usize) -> Vec<u32> {
    let mut words = vec![0, 1, MESSAGE_BITS_MASK, 0x15_5555, 0x0A_AAAA, 0x10_0000];
    let mut lcg = 0xF1E8u32;
    while words.len() < count {
        lcg = lcg.wrapping_mul(1103515245).wrapping_add(12345);
        words.push(lcg & MESSAGE_BITS_MASK);
    }
    words
}

#[test]
fn test_roundtrip_sweep() {
    let bch = Bch3121::flex().unwrap();
    for data in sample_words(2000) {
        let cw = bch.encode(data);
        assert_eq!(cw & MESSAGE_BITS_MASK, data, "encode must be systematic");
        let (fixed, errors) = bch.correct(cw).expect("clean codeword");
        assert_eq!(fixed, cw);
        assert_eq!(errors, 0);
    }
}

#[test]
fn test_single_error_sweep() {
    let bch = Bch3121::flex().unwrap();
    for data in sample_words(200) {
        let cw = bch.encode(data);
        for p in 0..31 {
            let (fixed, errors) = bch
                .correct(cw ^ (1 << p))
                .unwrap_or_else(|| panic!("single error at bit {} of {:08X}", p, cw));
            assert_eq!(fixed, cw);
            assert_eq!(errors, 1);
        }
    }
}

#[test]
fn test_double_error_sweep() {
    let bch = Bch3121::flex().unwrap();
    for data in sample_words(40) {
        let cw = bch.encode(data);
        for p in 0..31 {
            for q in (p + 1)..31 {
                let (fixed, errors) = bch
                    .correct(cw ^ (1 << p) ^ (1 << q))
                    .unwrap_or_else(|| panic!("errors at {}/{} of {:08X}", p, q, cw));
                assert_eq!(fixed, cw, "bits {}/{} of {:08X}", p, q, cw);
                assert_eq!(errors, 2);
            }
        }
    }
}

#[test]
fn test_uncorrectable_pattern_per_codeword() {
    let bch = Bch3121::flex().unwrap();
    // The primitive polynomial itself as an error pattern (codeword bits
    // 30, 28, 25) zeroes S1 and is always detected, for every codeword.
    let poison = (1u32 << 30) | (1 << 28) | (1 << 25);
    for data in sample_words(500) {
        let cw = bch.encode(data);
        assert!(
            bch.correct(cw ^ poison).is_none(),
            "triple error on {:08X} slipped through",
            cw
        );
    }
}

#[test]
fn test_distinct_data_distinct_codewords() {
    let bch = Bch3121::flex().unwrap();
    // Systematic encoding is injective; codewords differ in >= 5 bits
    let words = sample_words(300);
    for (i, &a) in words.iter().enumerate() {
        for &b in &words[i + 1..] {
            if a == b {
                continue;
            }
            let distance = (bch.encode(a) ^ bch.encode(b)).count_ones();
            assert!(distance >= 5, "{:08X}/{:08X} at distance {}", a, b, distance);
        }
    }
}

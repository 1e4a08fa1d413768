//! Binary payload dump
//!
//! Binary pages (and pages of types without a dedicated parser) are emitted
//! as uppercase 8-hex-digit groups, one per payload word, space separated.

use std::fmt::Write;

use super::ParseInput;

pub fn parse(input: &ParseInput) -> String {
    let mut content = String::new();
    for i in 0..input.message_length {
        if i > 0 {
            content.push(' ');
        }
        let _ = write!(content, "{:08X}", input.phase_words[input.message_start + i]);
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::PHASE_WORDS;
    use crate::message::MessageType;

    fn run(words: [u32; PHASE_WORDS], start: usize, len: usize) -> String {
        parse(&ParseInput {
            phase_words: &words,
            message_type: MessageType::Binary,
            long_address: false,
            viw_index: 3,
            message_start: start,
            message_length: len,
            fragment_number: 0,
            continuation: false,
        })
    }

    #[test]
    fn test_hex_dump() {
        let mut words = [0u32; PHASE_WORDS];
        words[5] = 0x0123_4567;
        words[6] = 0x0089_ABCD;
        assert_eq!(run(words, 5, 2), "01234567 0089ABCD");
    }

    #[test]
    fn test_single_word_no_trailing_space() {
        let mut words = [0u32; PHASE_WORDS];
        words[5] = 0x1F_FFFF;
        assert_eq!(run(words, 5, 1), "001FFFFF");
    }

    #[test]
    fn test_empty_payload() {
        let words = [0u32; PHASE_WORDS];
        assert_eq!(run(words, 5, 0), "");
    }
}

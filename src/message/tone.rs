//! Tone-only and short-numeric pages
//!
//! Bits 8..7 of the vector word distinguish a pure tone page (no content)
//! from a short numeric, whose digits ride inside the vector word itself:
//! nibbles at bits 9, 13 and 17, extended by five more nibbles from the
//! second vector word when the address is long.

use super::{ParseInput, FLEX_BCD};
use crate::collector::PHASE_WORDS;

pub fn parse(input: &ParseInput) -> String {
    let viw = input.phase_words[input.viw_index];
    let mut content = String::new();

    if (viw >> 7) & 0x3 == 0 {
        for bit_pos in (9..=17).step_by(4) {
            content.push(FLEX_BCD[((viw >> bit_pos) & 0xF) as usize]);
        }
        if input.long_address && input.viw_index + 1 < PHASE_WORDS {
            let next = input.phase_words[input.viw_index + 1];
            for bit_pos in (0..=16).step_by(4) {
                content.push(FLEX_BCD[((next >> bit_pos) & 0xF) as usize]);
            }
        }
    }

    content
}

//! Shared utilities for integration tests
//!
//! Builders for FLEX symbol streams: the scenarios drive the decoder's
//! symbol entry directly (bypassing the PLL) and these helpers assemble
//! the sync word, FIW, SYNC2 filler, and BCH-encoded frame body.

use std::cell::RefCell;
use std::rc::Rc;

use rustyflex::bch::Bch3121;
use rustyflex::collector::PHASE_WORDS;
use rustyflex::sync::sync_word;
use rustyflex::Decoder;

/// Symbols for the 64-bit sync word of `code`, normal polarity.
///
/// A `1` bit is carried by a low symbol (0), a `0` bit by a high one (3).
pub fn sync_symbols(code: u16) -> Vec<u8> {
    let word = sync_word(code);
    (0..64)
        .rev()
        .map(|i| if (word >> i) & 1 == 1 { 0 } else { 3 })
        .collect()
}

/// FIW symbol sequence: 16 dotting bits then the 32-bit codeword, bit 0
/// first. Bit `1` rides on a high symbol.
pub fn fiw_symbols(bch: &Bch3121, fiw_data: u32) -> Vec<u8> {
    let codeword = bch.encode(fiw_data);
    let mut symbols = vec![0u8; 16];
    symbols.extend((0..32).map(|k| if (codeword >> k) & 1 == 1 { 3 } else { 0 }));
    symbols
}

/// A 21-bit FIW body for the given cycle and frame with a valid nibble-sum
/// checksum.
pub fn fiw_word(cycle: u32, frame: u32) -> u32 {
    let body = (cycle << 4) | (frame << 8);
    let sum = ((body >> 4) & 0xF)
        + ((body >> 8) & 0xF)
        + ((body >> 12) & 0xF)
        + ((body >> 16) & 0xF)
        + ((body >> 20) & 0x1);
    body | (0xF - (sum & 0xF))
}

/// SYNC2 filler at 1600 bps: 25 ms of idle symbols.
pub fn sync2_symbols() -> Vec<u8> {
    vec![0u8; 40]
}

/// Data-section symbols for a 1600/2 frame carrying the given phase A
/// words (32 bits each, already BCH-encoded).
pub fn data_symbols(words: &[u32; PHASE_WORDS]) -> Vec<u8> {
    (0..(PHASE_WORDS as u32 * 32))
        .map(|c| {
            let w = (((c >> 8) << 3) | (c & 7)) as usize;
            let b = (c >> 3) & 0x1F;
            if (words[w] >> b) & 1 == 1 {
                3
            } else {
                0
            }
        })
        .collect()
}

/// Full symbol stream for one 1600/2 frame: sync, FIW for (cycle, frame),
/// SYNC2, and a data section whose phase A carries the given 21-bit
/// message words wrapped in BCH codewords.
pub fn frame_1600_2(bch: &Bch3121, cycle: u32, frame: u32, messages: &[(usize, u32)]) -> Vec<u8> {
    let mut words = [0u32; PHASE_WORDS];
    for &(idx, msg) in messages {
        words[idx] = bch.encode(msg);
    }

    let mut symbols = sync_symbols(0x870C);
    symbols.extend(fiw_symbols(bch, fiw_word(cycle, frame)));
    symbols.extend(sync2_symbols());
    symbols.extend(data_symbols(&words));
    symbols
}

/// Flip every symbol, as an inverted-polarity channel would.
pub fn invert(symbols: &[u8]) -> Vec<u8> {
    symbols.iter().map(|&s| 3 - s).collect()
}

/// Attach a collecting sink; the returned handle accumulates the rendered
/// output line of every emitted message.
pub fn capture_lines(decoder: &mut Decoder) -> Rc<RefCell<Vec<String>>> {
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink_lines = Rc::clone(&lines);
    decoder.set_sink(move |msg| sink_lines.borrow_mut().push(msg.to_string()));
    lines
}

/// Feed a symbol stream straight into the state machine.
pub fn feed_symbols(decoder: &mut Decoder, symbols: &[u8]) {
    for &s in symbols {
        decoder.process_symbol(s);
    }
}

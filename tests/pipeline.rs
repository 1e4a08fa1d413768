//! Sample-level pipeline tests
//!
//! Synthesize clean 2-level FSK baseband audio (square wave, 10 samples
//! per symbol at 16 kHz) and run the full chain: PLL lock, sync search,
//! FIW, data collection, frame decode.

#[path = "test_utils.rs"]
mod test_utils;

use rustyflex::bch::Bch3121;
use rustyflex::collector::PHASE_WORDS;
use rustyflex::{Decoder, State};
use test_utils::*;

const SAMPLE_RATE: u32 = 16000;
const SAMPLES_PER_SYMBOL: usize = 10; // 1600 bps at 16 kHz

/// Render 2-level symbols as a baseband square wave.
fn symbols_to_samples(symbols: &[u8], amplitude: f32) -> Vec<f32> {
    let mut samples = Vec::with_capacity(symbols.len() * SAMPLES_PER_SYMBOL);
    for &sym in symbols {
        let level = if sym > 1 { amplitude } else { -amplitude };
        samples.extend(std::iter::repeat(level).take(SAMPLES_PER_SYMBOL));
    }
    samples
}

/// Bit-sync preamble: alternating extreme levels.
fn preamble(symbols: usize) -> Vec<u8> {
    (0..symbols).map(|i| if i % 2 == 0 { 3 } else { 0 }).collect()
}

/// The S1 scenario as a symbol stream: tone page to capcode 100 in cycle
/// 2, frame 3. Word 1 carries a dense non-codeword filler so the baseband
/// waveform keeps producing zero crossings for the PLL.
fn tone_frame_symbols(bch: &Bch3121) -> Vec<u8> {
    let mut words = [0u32; PHASE_WORDS];
    words[0] = bch.encode((1 << 8) | (3 << 10));
    words[1] = 0x5555_5555;
    words[2] = bch.encode(0x8064);
    words[3] = bch.encode((2 << 4) | (1 << 7));

    let mut symbols = sync_symbols(0x870C);
    symbols.extend(fiw_symbols(bch, fiw_word(2, 3)));
    symbols.extend(sync2_symbols());
    // 256 data symbols complete words 0..7; the idle word at 7 ends the frame
    symbols.extend(data_symbols(&words).into_iter().take(256));
    // The PLL delivers a symbol on the first sample of the next period, so
    // pad the tail to flush the last data symbol through
    symbols.extend(vec![0u8; 4]);
    symbols
}

#[test]
fn test_lock_sync_and_fiw_from_samples() {
    let mut decoder = Decoder::new(SAMPLE_RATE).unwrap();
    let bch = Bch3121::flex().unwrap();

    let mut symbols = preamble(60);
    symbols.extend(sync_symbols(0x870C));
    symbols.extend(fiw_symbols(&bch, fiw_word(2, 3)));
    symbols.extend(sync2_symbols());
    symbols.extend(vec![0u8; 8]);

    decoder.process_samples(&symbols_to_samples(&symbols, 0.6));

    assert!(decoder.locked());
    assert_eq!(decoder.state(), State::Data);
    assert_eq!(decoder.frame_info().cycle, 2);
    assert_eq!(decoder.frame_info().frame, 3);
    assert_eq!(decoder.sync_info().baud, 1600);
    assert_eq!(decoder.sync_info().levels, 2);
}

#[test]
fn test_full_decode_from_samples() {
    let mut decoder = Decoder::new(SAMPLE_RATE).unwrap();
    let bch = Bch3121::flex().unwrap();
    let lines = capture_lines(&mut decoder);

    let mut symbols = preamble(60);
    symbols.extend(tone_frame_symbols(&bch));
    decoder.process_samples(&symbols_to_samples(&symbols, 0.6));

    assert_eq!(
        *lines.borrow(),
        vec!["FLEX_NEXT|1600/2|02.003.A|0000000100|SS|2|TON|".to_string()]
    );
}

#[test]
fn test_full_decode_from_inverted_samples() {
    let mut decoder = Decoder::new(SAMPLE_RATE).unwrap();
    let bch = Bch3121::flex().unwrap();
    let lines = capture_lines(&mut decoder);

    let mut symbols = preamble(60);
    symbols.extend(tone_frame_symbols(&bch));
    // An upside-down channel: the lock pattern matches either way, the
    // sync word reports inverted polarity, and rectification undoes the
    // rest.
    decoder.process_samples(&symbols_to_samples(&invert(&symbols), 0.6));

    assert_eq!(
        *lines.borrow(),
        vec!["FLEX_NEXT|1600/2|02.003.A|0000000100|SS|2|TON|".to_string()]
    );
}

#[test]
fn test_silence_produces_nothing() {
    let mut decoder = Decoder::new(SAMPLE_RATE).unwrap();
    let lines = capture_lines(&mut decoder);

    decoder.process_samples(&vec![0.0f32; 32000]);
    assert!(!decoder.locked());
    assert!(lines.borrow().is_empty());
}

#[test]
fn test_decoder_recovers_after_reset() {
    let mut decoder = Decoder::new(SAMPLE_RATE).unwrap();
    let bch = Bch3121::flex().unwrap();
    let lines = capture_lines(&mut decoder);

    let mut symbols = preamble(60);
    symbols.extend(tone_frame_symbols(&bch));
    let samples = symbols_to_samples(&symbols, 0.6);

    decoder.process_samples(&samples);
    decoder.reset();
    decoder.process_samples(&samples);

    assert_eq!(lines.borrow().len(), 2);
    assert!(lines
        .borrow()
        .iter()
        .all(|l| l == "FLEX_NEXT|1600/2|02.003.A|0000000100|SS|2|TON|"));
}

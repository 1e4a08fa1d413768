//! FLEX Message Parsers
//!
//! Every page carries a 3-bit message type in its vector word; each type has
//! a payload format of its own:
//!
//! - **Alphanumeric / Secure**: three 7-bit characters per data word
//! - **Numeric family**: 4-bit BCD digits shifted LSB-first out of the words
//! - **Tone**: no payload, or a short numeric embedded in the vector word
//! - **Binary**: raw words, rendered as hex
//!
//! Parsers receive the phase words post-BCH (masked to 21 bits) plus the
//! vector word metadata, and return the message content as a string.
//! Short Instructions never reach a parser; they are consumed by the group
//! registry during frame processing.

mod alphanumeric;
mod binary;
mod numeric;
mod tone;

use crate::collector::PHASE_WORDS;

/// BCD digit set used by the numeric formats. Value 0xC is filler and is
/// skipped by the numeric parsers.
pub const FLEX_BCD: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ' ', 'U', ' ', '-', ']', '[',
];

/// Hard cap on emitted alphanumeric content
pub const MAX_ALN: usize = 512;

/// Page type from bits 6..4 of the vector word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Secure,
    ShortInstruction,
    Tone,
    StandardNumeric,
    SpecialNumeric,
    Alphanumeric,
    Binary,
    NumberedNumeric,
}

impl MessageType {
    /// Decode the 3-bit type field.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0x7 {
            0 => Self::Secure,
            1 => Self::ShortInstruction,
            2 => Self::Tone,
            3 => Self::StandardNumeric,
            4 => Self::SpecialNumeric,
            5 => Self::Alphanumeric,
            6 => Self::Binary,
            _ => Self::NumberedNumeric,
        }
    }

    /// The wire digit of this type.
    pub fn digit(&self) -> u8 {
        match self {
            Self::Secure => 0,
            Self::ShortInstruction => 1,
            Self::Tone => 2,
            Self::StandardNumeric => 3,
            Self::SpecialNumeric => 4,
            Self::Alphanumeric => 5,
            Self::Binary => 6,
            Self::NumberedNumeric => 7,
        }
    }

    /// Three-letter mnemonic used in the output line.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Secure => "SEC",
            Self::ShortInstruction => "SIN",
            Self::Tone => "TON",
            Self::StandardNumeric => "NUM",
            Self::SpecialNumeric => "SNM",
            Self::Alphanumeric => "ALN",
            Self::Binary => "BIN",
            Self::NumberedNumeric => "NNU",
        }
    }

    /// Alphanumeric content fragments across frames; everything else is
    /// self-contained.
    pub fn is_alphanumeric(&self) -> bool {
        matches!(self, Self::Alphanumeric | Self::Secure)
    }
}

/// Assembly state of a (possibly fragmented) message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentFlag {
    /// 'K' - complete, ready to display
    Complete,
    /// 'F' - fragment, needs a continuation
    Fragment,
    /// 'C' - continuation completing earlier fragments
    Continuation,
    /// '?' - no header information available
    Unknown,
}

impl FragmentFlag {
    /// Derive the flag from the header word's fragment/continuation bits.
    pub fn from_bits(fragment_number: u32, continuation: bool) -> Self {
        match (continuation, fragment_number) {
            (false, 3) => Self::Complete,
            (false, _) => Self::Continuation,
            (true, _) => Self::Fragment,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Complete => 'K',
            Self::Fragment => 'F',
            Self::Continuation => 'C',
            Self::Unknown => '?',
        }
    }
}

/// Everything a parser needs: the corrected phase words and the page
/// geometry extracted from the address/vector words.
pub struct ParseInput<'a> {
    pub phase_words: &'a [u32; PHASE_WORDS],
    pub message_type: MessageType,
    pub long_address: bool,
    /// Index of the vector word for this page
    pub viw_index: usize,
    /// First payload word (mw1, after the short-address adjustment)
    pub message_start: usize,
    /// Payload length in words (after the empirical adjustments)
    pub message_length: usize,
    pub fragment_number: u32,
    pub continuation: bool,
}

/// Parse the payload for the page's type.
///
/// Unknown-type pages and anything without a dedicated parser fall through
/// to the binary hex dump.
pub fn parse(input: &ParseInput) -> String {
    match input.message_type {
        MessageType::Alphanumeric | MessageType::Secure => alphanumeric::parse(input),
        MessageType::StandardNumeric | MessageType::SpecialNumeric | MessageType::NumberedNumeric => {
            numeric::parse(input)
        }
        MessageType::Tone => tone::parse(input),
        MessageType::Binary | MessageType::ShortInstruction => binary::parse(input),
    }
}

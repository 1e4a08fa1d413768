//! FLEX Sync Word Detection
//!
//! The frame header carries a 64-bit sync word structured `AAAA:BBBBBBBB:CCCC`
//! where the middle 32 bits are always the FLEX marker `0xA6C6AAAA` and the
//! outer 16-bit halves satisfy `AAAA ^ CCCC == 0xFFFF`. The value of `AAAA`
//! selects the baud rate and FSK level count for the rest of the frame.
//!
//! Detection is a rolling match: every symbol shifts one bit into a 64-bit
//! buffer which is tested against the structure with a Hamming distance
//! tolerance of up to 3 bits on both the marker and the outer code. If only
//! the bitwise-inverted buffer matches, the signal polarity is inverted and
//! all subsequent symbols must be rectified.

use tracing::debug;

/// Middle 32 bits of every FLEX sync word
pub const FLEX_SYNC_MARKER: u32 = 0xA6C6_AAAA;

/// Bit errors tolerated when matching sync fields
const HAMMING_THRESHOLD: u32 = 4;

/// One entry of the sync-code to transmission-mode table.
#[derive(Debug, Clone, Copy)]
pub struct FlexMode {
    pub sync_code: u32,
    pub baud: u32,
    pub levels: u32,
}

/// Sync codes and the modes they select. Two codes map to 3200/4; the
/// original multimon-ng table carries the same oddity.
pub const FLEX_MODES: [FlexMode; 5] = [
    FlexMode { sync_code: 0x870C, baud: 1600, levels: 2 },
    FlexMode { sync_code: 0xB068, baud: 1600, levels: 4 },
    FlexMode { sync_code: 0x7B18, baud: 3200, levels: 2 },
    FlexMode { sync_code: 0xDEA0, baud: 3200, levels: 4 },
    FlexMode { sync_code: 0x4C7C, baud: 3200, levels: 4 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    Normal,
    Inverted,
}

/// Decoded transmission parameters for the current frame.
#[derive(Debug, Clone, Copy)]
pub struct SyncInfo {
    pub sync_code: u32,
    pub baud: u32,
    pub levels: u32,
    pub polarity: Polarity,
}

impl Default for SyncInfo {
    fn default() -> Self {
        Self {
            sync_code: 0,
            baud: 1600,
            levels: 2,
            polarity: Polarity::Normal,
        }
    }
}

/// Rolling sync word matcher.
#[derive(Default)]
pub struct Synchronizer {
    sync_buf: u64,
    polarity: Polarity,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift one symbol into the buffer and test for a sync word.
    ///
    /// Symbols 0 and 1 shift in a `1` bit, 2 and 3 a `0`. Returns the sync
    /// code (the high 16 bits) when either the buffer or its inverse
    /// matches, recording which polarity did.
    pub fn process_symbol(&mut self, symbol: u8) -> Option<u32> {
        self.sync_buf = (self.sync_buf << 1) | u64::from(symbol < 2);

        if let Some(code) = check_sync_word(self.sync_buf) {
            self.polarity = Polarity::Normal;
            return Some(code);
        }
        if let Some(code) = check_sync_word(!self.sync_buf) {
            self.polarity = Polarity::Inverted;
            return Some(code);
        }
        None
    }

    /// Look the observed code up in the mode table.
    ///
    /// A Hamming distance of up to 3 bits to any entry selects it. Unknown
    /// codes fall back to 1600 bps 2-level FSK and decoding proceeds.
    pub fn decode_mode(&self, sync_code: u32) -> SyncInfo {
        for mode in &FLEX_MODES {
            if (mode.sync_code ^ sync_code).count_ones() < HAMMING_THRESHOLD {
                return SyncInfo {
                    sync_code,
                    baud: mode.baud,
                    levels: mode.levels,
                    polarity: self.polarity,
                };
            }
        }
        debug!("unknown sync code 0x{:04X}, defaulting to 1600bps 2FSK", sync_code);
        SyncInfo {
            sync_code,
            polarity: self.polarity,
            ..SyncInfo::default()
        }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn reset(&mut self) {
        self.sync_buf = 0;
        self.polarity = Polarity::Normal;
    }
}

/// Test one buffer orientation against the sync word structure.
fn check_sync_word(buf: u64) -> Option<u32> {
    let marker = ((buf >> 16) & 0xFFFF_FFFF) as u32;
    let codehigh = (buf >> 48) as u32;
    let codelow = u32::from(!(buf as u16));

    if (marker ^ FLEX_SYNC_MARKER).count_ones() < HAMMING_THRESHOLD
        && (codehigh ^ codelow).count_ones() < HAMMING_THRESHOLD
    {
        Some(codehigh)
    } else {
        None
    }
}

/// Assemble the 64-bit sync word for a given code.
pub fn sync_word(code: u16) -> u64 {
    (u64::from(code) << 48) | (u64::from(FLEX_SYNC_MARKER) << 16) | u64::from(!code)
}

//! Frame Processing
//!
//! Runs once per frame over every phase active in the current mode:
//!
//! 1. **BCH sweep** - every collected word is error-corrected. Words that
//!    fail are replaced by the idle pattern; a phase where more than half
//!    the words fail is abandoned.
//! 2. **Block Information Word** - word 0 locates the address and vector
//!    word regions.
//! 3. **AIW/VIW iteration** - each address word pairs with a vector word.
//!    Long addresses span two slots and derive the capcode from both words;
//!    Short Instructions register group capcodes instead of carrying
//!    content; everything else dispatches to the matching payload parser
//!    and is emitted through the sink in protocol order.
//!
//! Structural problems (bad offsets, out-of-range capcodes, invalid vector
//! words) skip the affected page and keep going; nothing here can fail the
//! caller.

use tracing::{debug, trace};

use crate::bch::{Bch3121, BchError, MESSAGE_BITS_MASK};
use crate::collector::{DataCollector, PhaseBuffer, PHASE_WORDS};
use crate::groups::GroupRegistry;
use crate::message::{self, FragmentFlag, MessageType, ParseInput};
use crate::output::FlexMessage;
use crate::sync::SyncInfo;

/// Maximum valid capcode
pub const MAX_CAPCODE: i64 = 4_297_068_542;

/// Additive constant of the long-address capcode formula (per PDW; not the
/// value given in the FLEX patent)
pub const LONG_ADDRESS_CONSTANT: i64 = 2_068_480;

/// Decoded Frame Information Word fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInfo {
    pub raw: u32,
    pub checksum: u32,
    pub cycle: u32,
    pub frame: u32,
    pub reserved: u32,
}

impl FrameInfo {
    /// Split a corrected FIW into its fields.
    pub fn from_word(fiw: u32) -> Self {
        Self {
            raw: fiw,
            checksum: fiw & 0xF,
            cycle: (fiw >> 4) & 0xF,
            frame: (fiw >> 8) & 0x7F,
            reserved: (fiw >> 15) & 0x3F,
        }
    }

    /// Nibble-sum check over the 21 used bits; a valid FIW sums to 0xF.
    pub fn checksum_valid(fiw: u32) -> bool {
        let sum = (fiw & 0xF)
            + ((fiw >> 4) & 0xF)
            + ((fiw >> 8) & 0xF)
            + ((fiw >> 12) & 0xF)
            + ((fiw >> 16) & 0xF)
            + ((fiw >> 20) & 0x1);
        sum & 0xF == 0xF
    }
}

/// Per-frame decode driver owning the BCH codec.
pub struct FrameProcessor {
    bch: Bch3121,
}

impl FrameProcessor {
    pub fn new() -> Result<Self, BchError> {
        Ok(Self { bch: Bch3121::flex()? })
    }

    pub fn bch(&self) -> &Bch3121 {
        &self.bch
    }

    /// Decode every active phase of a completed frame, emitting messages
    /// through `sink` in protocol order (pages within a phase, phases in
    /// the order A, B, C, D).
    pub fn process_frame(
        &self,
        collector: &DataCollector,
        groups: &mut GroupRegistry,
        sync: &SyncInfo,
        fiw: &FrameInfo,
        sink: &mut dyn FnMut(FlexMessage),
    ) {
        debug!(baud = sync.baud, levels = sync.levels, "decoding frame data");
        for (name, buffer) in collector.active_phases() {
            self.process_phase(buffer, name, groups, sync, fiw, sink);
        }
    }

    fn process_phase(
        &self,
        buffer: &PhaseBuffer,
        phase: char,
        groups: &mut GroupRegistry,
        sync: &SyncInfo,
        fiw: &FrameInfo,
        sink: &mut dyn FnMut(FlexMessage),
    ) {
        let mut words = buffer.words;

        // BCH sweep: correct in place, stub out hopeless words
        let mut failed = 0usize;
        for word in words.iter_mut() {
            if self.bch.fix_errors(word, phase) {
                *word &= MESSAGE_BITS_MASK;
            } else {
                failed += 1;
                *word = MESSAGE_BITS_MASK;
            }
        }
        if failed > PHASE_WORDS / 2 {
            debug!(
                phase = %phase,
                failed,
                total = PHASE_WORDS,
                "phase abandoned, too many uncorrectable words"
            );
            return;
        }

        // Block Information Word
        let biw = words[0];
        if biw == 0 || biw & MESSAGE_BITS_MASK == MESSAGE_BITS_MASK {
            trace!(phase = %phase, "empty frame");
            return;
        }
        let address_offset = (((biw >> 8) & 0x3) + 1) as usize;
        let vector_offset = ((biw >> 10) & 0x3F) as usize;
        if vector_offset <= address_offset {
            debug!(phase = %phase, biw = %format_args!("{:08X}", biw), "invalid BIW structure");
            return;
        }
        debug!(
            phase = %phase,
            biw = %format_args!("{:08X}", biw),
            address_offset,
            vector_offset,
            pages = vector_offset - address_offset,
            "BlockInfoWord"
        );

        let mut i = address_offset;
        while i < vector_offset {
            i += self.decode_page(&words, i, address_offset, vector_offset, phase, groups, sync, fiw, sink);
        }
    }

    /// Decode the page whose address word sits at `i`.
    ///
    /// Returns how many AIW/VIW slots the page consumed (two for long
    /// addresses), which is also the answer for rejected pages so the
    /// iteration stays aligned.
    #[allow(clippy::too_many_arguments)]
    fn decode_page(
        &self,
        words: &[u32; PHASE_WORDS],
        i: usize,
        address_offset: usize,
        vector_offset: usize,
        phase: char,
        groups: &mut GroupRegistry,
        sync: &SyncInfo,
        fiw: &FrameInfo,
        sink: &mut dyn FnMut(FlexMessage),
    ) -> usize {
        let aiw = words[i];
        if aiw == 0 || aiw & MESSAGE_BITS_MASK == MESSAGE_BITS_MASK {
            return 1; // idle slot
        }

        let long_address = is_long_address(aiw);
        let slots = if long_address { 2 } else { 1 };
        let next_word = if i + 1 < PHASE_WORDS { words[i + 1] } else { 0 };
        let capcode = compute_capcode(aiw, next_word, long_address);
        if !(0..=MAX_CAPCODE).contains(&capcode) {
            debug!(phase = %phase, capcode, "capcode out of range");
            return slots;
        }

        let group_bit = GroupRegistry::group_bit(capcode);
        if group_bit.is_some() && long_address {
            debug!(phase = %phase, capcode, "group delivery cannot use a long address");
            return slots;
        }

        let j = vector_offset + i - address_offset;
        if j >= PHASE_WORDS {
            debug!(phase = %phase, vector_index = j, "vector word out of bounds");
            return slots;
        }
        let viw = words[j];
        let message_type = MessageType::from_bits((viw >> 4) & 0x7);
        let mut message_start = ((viw >> 7) & 0x7F) as usize;
        let mut message_length = ((viw >> 14) & 0x7F) as usize;

        let header_index;
        if long_address {
            // The header rides in the second vector word
            header_index = j + 1;
            if message_length >= 1 {
                message_length -= 1; // per PDW
            }
        } else {
            // The header is the first message word
            header_index = message_start;
            message_start += 1;
            if group_bit.is_none() && message_length >= 1 {
                // Undocumented in FLEX, fixes repeatedly observed length issues
                message_length -= 1;
            }
        }

        let (fragment_number, continuation) = if header_index < PHASE_WORDS {
            let header = words[header_index];
            ((header >> 11) & 0x3, (header >> 10) & 0x1 != 0)
        } else {
            (0, false)
        };

        if message_type == MessageType::ShortInstruction {
            // Registers a capcode for a later group delivery; no emission
            groups.register(capcode, viw, fiw.cycle, fiw.frame);
            return slots;
        }

        if message_type == MessageType::Tone {
            // Tone pages carry no payload words
            message_start = 0;
            message_length = 0;
        } else {
            let min_start = vector_offset + (vector_offset - address_offset);
            if message_length == 0 || message_start < min_start || message_start >= PHASE_WORDS {
                debug!(
                    phase = %phase,
                    viw = %format_args!("{:08X}", viw),
                    message_start,
                    message_length,
                    "invalid VIW"
                );
                return slots;
            }
            if message_start + message_length > PHASE_WORDS {
                message_length = PHASE_WORDS - message_start;
            }
        }

        trace!(
            phase = %phase,
            vector_index = j,
            ?message_type,
            message_start,
            message_length,
            fragment_number,
            "VIW"
        );

        let content = message::parse(&ParseInput {
            phase_words: words,
            message_type,
            long_address,
            viw_index: j,
            message_start,
            message_length,
            fragment_number,
            continuation,
        });

        // A message addressed to a group capcode delivers to every
        // registered capcode; consume the entry.
        let group_capcodes = group_bit
            .and_then(|bit| groups.deliver(bit))
            .unwrap_or_default();

        sink(FlexMessage {
            baud: sync.baud,
            levels: sync.levels,
            polarity: sync.polarity,
            cycle: fiw.cycle,
            frame: fiw.frame,
            phase,
            capcode,
            long_address,
            group_message: group_bit.is_some(),
            message_type,
            fragment_number,
            continuation,
            fragment_flag: FragmentFlag::from_bits(fragment_number, continuation),
            group_capcodes,
            content,
        });

        slots
    }
}

/// Long addresses live outside the single-word capcode ranges.
pub fn is_long_address(aiw: u32) -> bool {
    aiw < 0x8001 || (aiw > 0x1E_0000 && aiw < 0x1F_0001) || aiw > 0x1F_7FFE
}

/// Capcode from the address word(s). The long-address formula could not be
/// traced to the patent; it follows PDW.
pub fn compute_capcode(aiw: u32, next_word: u32, long_address: bool) -> i64 {
    if long_address {
        ((i64::from(next_word ^ MESSAGE_BITS_MASK)) << 15) + LONG_ADDRESS_CONSTANT + i64::from(aiw)
    } else {
        i64::from(aiw) - 0x8000
    }
}

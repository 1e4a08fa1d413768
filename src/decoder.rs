//! FLEX Decoder Facade
//!
//! Owns every pipeline component and drives the four-state frame automaton:
//!
//! - **SYNC1**: hunt for a sync word in the symbol stream. The demodulator
//!   tracks DC offset and envelope only here, where the channel idles.
//! - **FIW**: skip 16 dotting bits, accumulate the 32-bit Frame Information
//!   Word, BCH-correct it and verify the nibble-sum checksum. Success also
//!   runs the group registry cleanup and switches the symbol clock to the
//!   frame baud rate.
//! - **SYNC2**: 25 ms of idle bits at the frame rate; cleared phase buffers
//!   wait on the other side.
//! - **DATA**: 1760 ms of frame body (or less when every active phase goes
//!   idle), collected into the phase buffers and then handed to the frame
//!   processor. The baud rate drops back to 1600 for the next hunt.
//!
//! Polarity rectification (`3 - symbol` for inverted signals) applies to
//! FIW and DATA symbols; sync matching sees the raw stream and determines
//! the polarity itself.

use snafu::Snafu;
use tracing::{debug, info};

use crate::bch::BchError;
use crate::collector::DataCollector;
use crate::demod::Demodulator;
use crate::frame::{FrameInfo, FrameProcessor};
use crate::groups::GroupRegistry;
use crate::output::FlexMessage;
use crate::sync::{SyncInfo, Synchronizer, Polarity};

/// Dotting bits preceding the FIW
pub const FIW_DOTTING_BITS: u32 = 16;

/// Total FIW symbols: dotting plus 32 data bits
pub const FIW_TOTAL_BITS: u32 = 48;

/// Duration of the second sync header in milliseconds
pub const SYNC2_DURATION_MS: u32 = 25;

/// Duration of the frame body in milliseconds
pub const DATA_DURATION_MS: u32 = 1760;

#[derive(Debug, Snafu)]
pub enum DecoderError {
    /// The sample rate must be positive
    #[snafu(display("sample rate must be non-zero"))]
    InvalidSampleRate,

    /// BCH codec construction failed
    #[snafu(context(false))]
    #[snafu(display("BCH codec initialization failed: {source}"))]
    Codec { source: BchError },
}

/// Frame automaton states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Sync1,
    Fiw,
    Sync2,
    Data,
}

/// Signal-quality snapshot for host monitoring.
#[derive(Debug, Clone, Copy)]
pub struct SignalQuality {
    pub envelope: f64,
    pub symbol_rate: f64,
    pub dc_offset: f64,
    pub locked: bool,
    pub state: State,
}

type MessageSink = Box<dyn FnMut(&FlexMessage)>;

/// The complete receiver: feed samples in, get messages out.
pub struct Decoder {
    demod: Demodulator,
    synchronizer: Synchronizer,
    collector: DataCollector,
    frame: FrameProcessor,
    groups: GroupRegistry,
    state: State,
    sync_info: SyncInfo,
    fiw: FrameInfo,
    fiw_count: u32,
    fiw_raw: u32,
    sync2_count: u32,
    data_count: u32,
    sink: Option<MessageSink>,
}

impl Decoder {
    /// Build a decoder for a fixed input sample rate.
    pub fn new(sample_freq: u32) -> Result<Self, DecoderError> {
        if sample_freq == 0 {
            return Err(DecoderError::InvalidSampleRate);
        }
        let decoder = Self {
            demod: Demodulator::new(sample_freq),
            synchronizer: Synchronizer::new(),
            collector: DataCollector::new(),
            frame: FrameProcessor::new()?,
            groups: GroupRegistry::new(),
            state: State::Sync1,
            sync_info: SyncInfo::default(),
            fiw: FrameInfo::default(),
            fiw_count: 0,
            fiw_raw: 0,
            sync2_count: 0,
            data_count: 0,
            sink: None,
        };
        debug!(sample_freq, "decoder initialized");
        Ok(decoder)
    }

    /// Register the message sink. Invoked synchronously from the sample
    /// driver, once per completed message, in protocol order.
    pub fn set_sink(&mut self, sink: impl FnMut(&FlexMessage) + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Consume a batch of baseband samples.
    pub fn process_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.process_sample(sample);
        }
    }

    /// Consume one baseband sample.
    pub fn process_sample(&mut self, sample: f32) {
        let in_sync1 = self.state == State::Sync1;
        if let Some(symbol) = self.demod.build_symbol(sample, in_sync1) {
            self.process_symbol(symbol);
        }
        if !self.demod.locked() {
            // The demodulator holds the automaton in SYNC1 until it locks
            self.state = State::Sync1;
        }
    }

    /// Route one recovered symbol through the current state.
    ///
    /// This is the entry the demodulator feeds; tests inject symbol streams
    /// here directly, bypassing the PLL.
    pub fn process_symbol(&mut self, symbol: u8) {
        // Negative-polarity signals arrive with the levels mirrored
        let rectified = if self.sync_info.polarity == Polarity::Inverted {
            3 - symbol
        } else {
            symbol
        };

        match self.state {
            State::Sync1 => self.handle_sync1(symbol),
            State::Fiw => self.handle_fiw(rectified),
            State::Sync2 => self.handle_sync2(),
            State::Data => self.handle_data(rectified),
        }
    }

    /// Compare the raw symbol stream against the known sync words.
    fn handle_sync1(&mut self, symbol: u8) {
        let Some(sync_code) = self.synchronizer.process_symbol(symbol) else {
            return;
        };

        self.sync_info = self.synchronizer.decode_mode(sync_code);
        self.collector.set_mode(self.sync_info.baud, self.sync_info.levels);
        info!(
            sync_code = %format_args!("0x{:04X}", sync_code),
            baud = self.sync_info.baud,
            levels = self.sync_info.levels,
            polarity = ?self.sync_info.polarity,
            "SyncInfoWord"
        );

        self.change_state(State::Fiw);
        self.fiw_count = 0;
        self.fiw_raw = 0;
    }

    /// Accumulate and validate the Frame Information Word.
    fn handle_fiw(&mut self, symbol: u8) {
        self.fiw_count += 1;

        // 2FSK data after the dotting sequence, shifted in at the MSB
        if self.fiw_count > FIW_DOTTING_BITS {
            self.fiw_raw = (self.fiw_raw >> 1) | if symbol > 1 { 0x8000_0000 } else { 0 };
        }

        if self.fiw_count < FIW_TOTAL_BITS {
            return;
        }

        let mut fiw = self.fiw_raw;
        if !self.frame.bch().fix_errors(&mut fiw, 'F') {
            debug!("unable to decode FIW, too much data corruption");
            self.change_state(State::Sync1);
            return;
        }
        if !FrameInfo::checksum_valid(fiw) {
            debug!(fiw = %format_args!("0x{:08X}", fiw), "bad FIW checksum");
            self.change_state(State::Sync1);
            return;
        }

        self.fiw = FrameInfo::from_word(fiw);
        info!(
            cycle = self.fiw.cycle,
            frame = self.fiw.frame,
            "FrameInfoWord"
        );

        let missed = self.groups.cleanup(self.fiw.cycle, self.fiw.frame);
        for bit in missed {
            debug!(group_bit = bit, "group message missed");
        }

        self.demod.set_baud(self.sync_info.baud);
        self.sync2_count = 0;
        self.change_state(State::Sync2);
    }

    /// The second sync header: idle bits for 25 ms at the frame rate.
    fn handle_sync2(&mut self) {
        self.sync2_count += 1;
        if self.sync2_count >= self.sync_info.baud * SYNC2_DURATION_MS / 1000 {
            self.collector.clear();
            self.data_count = 0;
            self.change_state(State::Data);
        }
    }

    /// Frame body: collect until the duration elapses or everything idles.
    fn handle_data(&mut self, symbol: u8) {
        let all_idle = self.collector.process_symbol(symbol);
        self.data_count += 1;

        if self.data_count >= self.sync_info.baud * DATA_DURATION_MS / 1000 || all_idle {
            debug!(
                symbols = self.data_count,
                idle = all_idle,
                "data collection complete"
            );
            let Self {
                frame,
                collector,
                groups,
                sync_info,
                fiw,
                sink,
                ..
            } = self;
            frame.process_frame(collector, groups, sync_info, fiw, &mut |msg| {
                if let Some(sink) = sink.as_mut() {
                    sink(&msg);
                }
            });

            self.demod.set_baud(1600);
            self.data_count = 0;
            self.change_state(State::Sync1);
        }
    }

    fn change_state(&mut self, state: State) {
        if self.state != state {
            debug!(?state, "state");
            self.state = state;
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn locked(&self) -> bool {
        self.demod.locked()
    }

    /// Sync parameters of the frame currently being decoded.
    pub fn sync_info(&self) -> &SyncInfo {
        &self.sync_info
    }

    /// Cycle/frame of the last accepted FIW.
    pub fn frame_info(&self) -> &FrameInfo {
        &self.fiw
    }

    pub fn signal_quality(&self) -> SignalQuality {
        SignalQuality {
            envelope: self.demod.envelope(),
            symbol_rate: self.demod.symbol_rate(),
            dc_offset: self.demod.zero_offset(),
            locked: self.demod.locked(),
            state: self.state,
        }
    }

    /// Back to initial state: SYNC1, 1600 bps, cleared buffers and groups.
    /// The registered sink survives.
    pub fn reset(&mut self) {
        self.demod.reset();
        self.synchronizer.reset();
        self.collector.clear();
        self.groups.reset();
        self.state = State::Sync1;
        self.sync_info = SyncInfo::default();
        self.fiw = FrameInfo::default();
        self.fiw_count = 0;
        self.fiw_raw = 0;
        self.sync2_count = 0;
        self.data_count = 0;
        info!("decoder reset");
    }
}

//! FSK Symbol Recovery
//!
//! A phase-locked loop that clocks 2/4-level FSK symbols out of the baseband
//! audio stream, one sample at a time.
//!
//! **Per-sample work**:
//! - DC offset removal through a one-pole IIR filter (tracked only while the
//!   state machine is in SYNC1, where the channel idles)
//! - signal envelope estimation while locked in SYNC1, feeding the slicer
//! - level counting during the middle 80% of each symbol period
//! - zero-crossing phase correction (gentler gain once locked)
//!
//! **Per-symbol work**: the modal level of the period becomes the symbol.
//! While unlocked, symbols are shifted into a 64-bit buffer and compared
//! against the FLEX idle/lock pattern; a match (either polarity) acquires
//! lock. A hundred symbol periods without a zero crossing, or more than 20
//! consecutive crossings inside the decision window, drop it again.
//!
//! Loss of lock is a state, not an error: sample processing cannot fail.

use tracing::{debug, info};

/// Slicer decision threshold as a fraction of the tracked envelope
pub const SLICE_THRESHOLD: f64 = 0.667;

/// DC offset IIR time constant in seconds
pub const DC_OFFSET_FILTER: f64 = 0.010;

/// PLL correction gain while locked
pub const PHASE_LOCKED_RATE: f64 = 0.045;

/// PLL correction gain while hunting
pub const PHASE_UNLOCKED_RATE: f64 = 0.050;

/// Symbols matched against the lock pattern (two bits per symbol)
pub const LOCK_LEN: u32 = 24;

/// Symbol periods without a zero crossing before lock is dropped
pub const DEMOD_TIMEOUT: u32 = 100;

/// Alternating bit-pair pattern the unlocked symbol stream is matched against
const LOCK_PATTERN: u64 = 0x6666_6666_6666_6666;

/// PLL-based symbol timing recovery.
pub struct Demodulator {
    sample_freq: u32,
    baud: u32,
    last_sample: f64,
    locked: bool,
    phase: i64,
    sample_count: u32,
    symbol_count: u32,
    zero_offset: f64,
    envelope: f64,
    envelope_sum: f64,
    envelope_count: u32,
    symbol_rate: f64,
    sym_counts: [u32; 4],
    lock_buffer: u64,
    timeout: u32,
    nonconsec: u32,
}

impl Demodulator {
    /// The first sync word and FIW are always 1600 bps, so that is the
    /// starting rate regardless of what the frame later switches to.
    pub fn new(sample_freq: u32) -> Self {
        Self {
            sample_freq,
            baud: 1600,
            last_sample: 0.0,
            locked: false,
            phase: 0,
            sample_count: 0,
            symbol_count: 0,
            zero_offset: 0.0,
            envelope: 0.0,
            envelope_sum: 0.0,
            envelope_count: 0,
            symbol_rate: 0.0,
            sym_counts: [0; 4],
            lock_buffer: 0,
            timeout: 0,
            nonconsec: 0,
        }
    }

    /// Process one audio sample.
    ///
    /// Returns `Some(symbol)` when a symbol period completed while the loop
    /// held lock; the caller feeds that symbol to the state machine. Lock
    /// acquisition, loss, and timeouts are handled internally.
    ///
    /// `in_sync1` tells the loop whether the state machine is hunting for a
    /// frame, which gates the DC and envelope estimators.
    pub fn build_symbol(&mut self, sample: f32, in_sync1: bool) -> Option<u8> {
        let phase_max = 100 * self.sample_freq as i64;
        let phase_rate = phase_max * self.baud as i64 / self.sample_freq as i64;
        let phase_percent = 100.0 * self.phase as f64 / phase_max as f64;

        self.sample_count += 1;

        let mut sample = sample as f64;
        if in_sync1 {
            let filter = self.sample_freq as f64 * DC_OFFSET_FILTER;
            self.zero_offset = (self.zero_offset * filter + sample) / (filter + 1.0);
        }
        sample -= self.zero_offset;

        if self.locked {
            // During synchronization, establish the signal envelope
            if in_sync1 {
                self.envelope_sum += sample.abs();
                self.envelope_count += 1;
                self.envelope = self.envelope_sum / self.envelope_count as f64;
            }
        } else {
            // Hold everything in the initial state until lock
            self.envelope = 0.0;
            self.envelope_sum = 0.0;
            self.envelope_count = 0;
            self.baud = 1600;
            self.timeout = 0;
            self.nonconsec = 0;
        }

        // Count levels during the mid 80% of the symbol period
        if phase_percent > 10.0 && phase_percent < 90.0 {
            if sample > 0.0 {
                if sample > self.envelope * SLICE_THRESHOLD {
                    self.sym_counts[3] += 1;
                } else {
                    self.sym_counts[2] += 1;
                }
            } else if sample < -self.envelope * SLICE_THRESHOLD {
                self.sym_counts[0] += 1;
            } else {
                self.sym_counts[1] += 1;
            }
        }

        // Zero crossings steer the PLL towards the closest symbol boundary
        let crossing = (self.last_sample < 0.0 && sample >= 0.0)
            || (self.last_sample >= 0.0 && sample < 0.0);
        if crossing {
            let phase_error = if phase_percent < 50.0 {
                self.phase as f64
            } else {
                (self.phase - phase_max) as f64
            };
            let rate = if self.locked {
                PHASE_LOCKED_RATE
            } else {
                PHASE_UNLOCKED_RATE
            };
            self.phase -= (phase_error * rate) as i64;

            // Too many crossings inside the decision window means noise
            if phase_percent > 10.0 && phase_percent < 90.0 {
                self.nonconsec += 1;
                if self.nonconsec > 20 && self.locked {
                    info!("synchronisation lost");
                    self.locked = false;
                }
            } else {
                self.nonconsec = 0;
            }

            self.timeout = 0;
        }
        self.last_sample = sample;

        self.phase += phase_rate;
        if self.phase > phase_max {
            self.phase -= phase_max;
            return self.finish_symbol();
        }
        None
    }

    /// End-of-symbol-period bookkeeping: pick the modal level, update the
    /// measured symbol rate, and run lock detection or timeout as needed.
    fn finish_symbol(&mut self) -> Option<u8> {
        let was_locked = self.locked;

        let mut modal_symbol = 0u8;
        let mut max_count = 0;
        for (level, &count) in self.sym_counts.iter().enumerate() {
            if count > max_count {
                modal_symbol = level as u8;
                max_count = count;
            }
        }
        self.sym_counts = [0; 4];

        self.nonconsec = 0;
        self.symbol_count += 1;
        self.symbol_rate =
            self.symbol_count as f64 * self.sample_freq as f64 / self.sample_count as f64;

        if !was_locked {
            self.check_lock_pattern(modal_symbol);
        }

        self.timeout += 1;
        if self.timeout > DEMOD_TIMEOUT {
            debug!("timeout, dropping lock");
            self.locked = false;
        }

        was_locked.then_some(modal_symbol)
    }

    /// Match the unlocked symbol stream against the FLEX preamble.
    ///
    /// Symbols are mapped so the extreme levels carry a single set bit, then
    /// the last `2 * LOCK_LEN` bits must equal the alternating pattern in
    /// either polarity.
    fn check_lock_pattern(&mut self, modal_symbol: u8) {
        self.lock_buffer = (self.lock_buffer << 2) | u64::from(modal_symbol ^ 0x1);

        let pattern = self.lock_buffer ^ LOCK_PATTERN;
        let mask = (1u64 << (2 * LOCK_LEN)) - 1;
        if pattern & mask == 0 || !pattern & mask == 0 {
            info!("locked");
            self.locked = true;
            self.lock_buffer = 0;
            self.symbol_count = 0;
            self.sample_count = 0;
        }
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Switch the symbol clock; the frame body may run at 3200 bps.
    pub fn set_baud(&mut self, baud: u32) {
        self.baud = baud;
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Current signal amplitude estimate
    pub fn envelope(&self) -> f64 {
        self.envelope
    }

    /// Measured symbol rate in Hz
    pub fn symbol_rate(&self) -> f64 {
        self.symbol_rate
    }

    /// Current DC bias estimate
    pub fn zero_offset(&self) -> f64 {
        self.zero_offset
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.sample_freq);
    }
}

//! FLEX paging protocol receiver
//!
//! Turns a stream of FM-demodulated baseband audio samples into structured
//! paging messages with addresses, message types, and content.
//!
//! **Pipeline** (one sample at a time):
//! 1. `demod` - phase-locked loop clocks 2/4-level FSK symbols out of the
//!    audio stream, tracking DC bias and envelope, acquiring and losing lock.
//! 2. `sync` - rolling 64-bit match against the FLEX sync word decides baud
//!    rate (1600/3200), FSK level count (2/4), and signal polarity.
//! 3. `decoder` - four-state automaton (SYNC1 -> FIW -> SYNC2 -> DATA) routes
//!    each recovered symbol.
//! 4. `collector` - deinterleaves the symbol stream into four phase buffers
//!    (A-D) of 88 32-bit words each.
//! 5. `bch` - BCH(31,21,5) error correction over every collected word.
//! 6. `frame` - parses the Block Information Word, iterates address/vector
//!    word pairs, and dispatches the per-type `message` parsers.
//!
//! Group messages (Short Instructions registering capcodes for a later
//! multi-recipient delivery) are tracked by `groups`.
//!
//! The entry point is [`Decoder`]: construct with the sample rate, register a
//! sink, and feed samples. Every completed message arrives at the sink as a
//! [`FlexMessage`] whose `Display` impl is the pipe-delimited `FLEX_NEXT` line.

pub mod bch;
pub mod collector;
pub mod decoder;
pub mod demod;
pub mod frame;
pub mod groups;
pub mod message;
pub mod output;
pub mod sync;
pub mod tracing_init;

pub use decoder::{Decoder, DecoderError, State};
pub use message::{FragmentFlag, MessageType};
pub use output::FlexMessage;
pub use sync::{Polarity, SyncInfo};

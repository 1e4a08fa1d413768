//! Message records and their textual serialization
//!
//! Host logs and integration tests rely on the byte-exact line format:
//!
//! ```text
//! FLEX_NEXT|<baud>/<levels>|<cycle:02>.<frame:03>.<phase>|<capcode:010>|<LS><GS>|<type>|<tag>|[<frag>.<cont>.<flag>|][<groupcap>|...]<content>
//! ```
//!
//! The `<frag>.<cont>.<flag>` triple appears only for alphanumeric and
//! secure pages; group deliveries list the registered capcodes, pipe
//! delimited, ahead of the content.

use std::fmt;

use crate::message::{FragmentFlag, MessageType};
use crate::sync::Polarity;

/// One decoded page with everything the host needs to render or route it.
#[derive(Debug, Clone)]
pub struct FlexMessage {
    /// Frame baud rate (1600 or 3200)
    pub baud: u32,
    /// FSK levels (2 or 4)
    pub levels: u32,
    pub polarity: Polarity,
    /// FIW cycle number, 0..15
    pub cycle: u32,
    /// FIW frame number, 0..127
    pub frame: u32,
    /// Phase the page arrived on: 'A'..'D'
    pub phase: char,
    pub capcode: i64,
    pub long_address: bool,
    /// Addressed to a group-delivery capcode
    pub group_message: bool,
    pub message_type: MessageType,
    pub fragment_number: u32,
    pub continuation: bool,
    pub fragment_flag: FragmentFlag,
    /// Capcodes registered for this group delivery, registration order
    pub group_capcodes: Vec<i64>,
    pub content: String,
}

impl fmt::Display for FlexMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FLEX_NEXT|{}/{}|{:02}.{:03}.{}|{:010}|{}{}|{}|{}|",
            self.baud,
            self.levels,
            self.cycle,
            self.frame,
            self.phase,
            self.capcode,
            if self.long_address { 'L' } else { 'S' },
            if self.group_message { 'G' } else { 'S' },
            self.message_type.digit(),
            self.message_type.tag(),
        )?;

        if self.message_type.is_alphanumeric() {
            write!(
                f,
                "{}.{}.{}|",
                self.fragment_number,
                u8::from(self.continuation),
                self.fragment_flag.symbol()
            )?;
        }

        for capcode in &self.group_capcodes {
            write!(f, "{:010}|", capcode)?;
        }

        write!(f, "{}", self.content)
    }
}

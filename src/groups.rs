//! Group Message Registry
//!
//! A Short Instruction page registers its capcode under one of 16 group
//! bits together with the frame (and derived cycle) in which the group
//! message will arrive. When a later page addresses the group's own capcode
//! (2029568 + bit), every registered capcode receives that one message and
//! the entry is cleared.
//!
//! The FIW handler runs `cleanup` at the start of every frame to expire
//! groups whose target frame has passed without a delivery, including
//! across the cycle 15 -> 0 rollover.

use tracing::{debug, info};

/// Group bits: 16 usable plus a sentinel slot
pub const GROUP_BITS: usize = 17;

/// Registered capcodes per group
pub const MAX_GROUP_CAPCODES: usize = 1000;

/// Capcode range reserved for group deliveries
pub const GROUP_CAPCODE_MIN: i64 = 2_029_568;
pub const GROUP_CAPCODE_MAX: i64 = 2_029_583;

/// One group's pending delivery state.
#[derive(Debug, Clone, Default)]
pub struct GroupEntry {
    pub capcodes: Vec<i64>,
    pub target_frame: i16,
    pub target_cycle: i16,
}

impl GroupEntry {
    fn clear(&mut self) {
        self.capcodes.clear();
        self.target_frame = -1;
        self.target_cycle = -1;
    }

    pub fn has_pending(&self) -> bool {
        !self.capcodes.is_empty()
    }
}

/// Registry of the sixteen group bits.
pub struct GroupRegistry {
    groups: [GroupEntry; GROUP_BITS],
}

impl Default for GroupRegistry {
    fn default() -> Self {
        let mut groups: [GroupEntry; GROUP_BITS] = Default::default();
        for g in groups.iter_mut() {
            g.target_frame = -1;
            g.target_cycle = -1;
        }
        Self { groups }
    }
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_group_capcode(capcode: i64) -> bool {
        (GROUP_CAPCODE_MIN..=GROUP_CAPCODE_MAX).contains(&capcode)
    }

    /// Group bit addressed by a delivery capcode, if it is one.
    pub fn group_bit(capcode: i64) -> Option<usize> {
        Self::is_group_capcode(capcode).then(|| (capcode - GROUP_CAPCODE_MIN) as usize)
    }

    /// Register a capcode from a Short Instruction vector word.
    ///
    /// The VIW carries the frame that will hold the group message in bits
    /// 16..10 and the group bit in bits 23..17. The target cycle is the
    /// current one when the assigned frame is still ahead, otherwise the
    /// next (wrapping 15 to 0).
    ///
    /// Returns false when the group bit is out of range or the list is full.
    pub fn register(&mut self, capcode: i64, viw: u32, current_cycle: u32, current_frame: u32) -> bool {
        let assigned_frame = (viw >> 10) & 0x7F;
        let group_bit = ((viw >> 17) & 0x7F) as usize;

        if group_bit >= GROUP_BITS {
            return false;
        }
        let group = &mut self.groups[group_bit];
        if group.capcodes.len() >= MAX_GROUP_CAPCODES {
            return false;
        }

        group.capcodes.push(capcode);
        group.target_frame = assigned_frame as i16;
        group.target_cycle = if assigned_frame > current_frame {
            current_cycle as i16
        } else if current_cycle == 15 {
            0
        } else {
            current_cycle as i16 + 1
        };

        info!(
            group_bit,
            capcodes = group.capcodes.len(),
            target_frame = group.target_frame,
            target_cycle = group.target_cycle,
            "short instruction registered capcode {:010}",
            capcode
        );
        true
    }

    /// Consume the pending entry for a group delivery.
    ///
    /// Returns the registered capcodes in registration order and clears the
    /// entry; None when the group has nothing pending.
    pub fn deliver(&mut self, group_bit: usize) -> Option<Vec<i64>> {
        let group = self.groups.get_mut(group_bit)?;
        if !group.has_pending() {
            return None;
        }
        let capcodes = std::mem::take(&mut group.capcodes);
        group.clear();
        Some(capcodes)
    }

    /// Expire groups whose delivery window has passed.
    ///
    /// Called on every accepted FIW. Returns the bits that were reset.
    pub fn cleanup(&mut self, current_cycle: u32, current_frame: u32) -> Vec<usize> {
        let mut missed = Vec::new();
        for (bit, group) in self.groups.iter_mut().enumerate() {
            if !group.has_pending() {
                continue;
            }

            let reset = if current_cycle as i16 == group.target_cycle {
                // Expected in this cycle: expired once its frame has passed
                group.target_frame < current_frame as i16
            } else if current_cycle == 0 {
                // The delivery should have happened at the end of the last cycle
                group.target_cycle == 15
            } else if current_cycle == 15 && group.target_cycle == 0 {
                // Waiting for the cycle counter to roll over
                false
            } else {
                group.target_cycle < current_cycle as i16
            };

            if reset {
                debug!(
                    group_bit = bit,
                    capcodes = ?group.capcodes,
                    "group message missed, clearing"
                );
                group.clear();
                missed.push(bit);
            }
        }
        missed
    }

    pub fn entry(&self, group_bit: usize) -> &GroupEntry {
        &self.groups[group_bit]
    }

    pub fn reset(&mut self) {
        for group in self.groups.iter_mut() {
            group.clear();
        }
    }
}

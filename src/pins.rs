//! Channel allocation bookkeeping for the 16 PWM outputs.
//!
//! A [`PinAllocator`] tracks which channels are claimed by configured
//! entities so no two entities drive the same physical output. The
//! configuration layer asks for the next free pin when an entity is
//! added, shows only free pins in its UI, and releases the pin when the
//! entity is removed.
//!
//! # Example
//!
//! ```rust
//! use rs_pca9685::pins::PinAllocator;
//!
//! let mut pins = PinAllocator::new();
//!
//! // First entity takes the lowest free channel
//! assert_eq!(pins.allocate(None).unwrap(), 0);
//!
//! // A preferred channel is honored when free
//! assert_eq!(pins.allocate(Some(5)).unwrap(), 5);
//!
//! // ...and falls back to the lowest free one when taken
//! assert_eq!(pins.allocate(Some(5)).unwrap(), 1);
//!
//! pins.release(5);
//! assert!(pins.is_free(5));
//! ```

use heapless::Vec;

use crate::registers::CHANNEL_COUNT;

/// Channel allocation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AllocError {
    /// All 16 channels are already claimed.
    NoChannelsAvailable,
    /// Requested channel is outside 0..=15.
    InvalidChannel(u8),
    /// Exact-claim request for a channel another entity already owns.
    ChannelInUse(u8),
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AllocError::NoChannelsAvailable => write!(f, "all 16 channels are allocated"),
            AllocError::InvalidChannel(ch) => {
                write!(f, "channel {ch} is outside the valid range 0-15")
            }
            AllocError::ChannelInUse(ch) => write!(f, "channel {ch} is already allocated"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}

/// Tracks channel ownership across the device's 16 outputs.
///
/// Internally a 16-bit occupancy mask, so the occupied set structurally
/// cannot hold duplicates or out-of-range channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PinAllocator {
    occupied: u16,
}

impl PinAllocator {
    /// Creates an allocator with all channels free.
    pub const fn new() -> Self {
        Self { occupied: 0 }
    }

    /// Claims a channel.
    ///
    /// Returns `preferred` when given and free; otherwise the
    /// lowest-numbered free channel.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidChannel`] for a preferred channel outside
    /// 0..=15 (checked before any allocation), and
    /// [`AllocError::NoChannelsAvailable`] when every channel is taken.
    pub fn allocate(&mut self, preferred: Option<u8>) -> Result<u8, AllocError> {
        if let Some(channel) = preferred {
            if channel >= CHANNEL_COUNT {
                return Err(AllocError::InvalidChannel(channel));
            }
            if self.is_free(channel) {
                self.occupied |= 1 << channel;
                return Ok(channel);
            }
        }
        let channel = self.next_free().ok_or(AllocError::NoChannelsAvailable)?;
        self.occupied |= 1 << channel;
        Ok(channel)
    }

    /// Claims exactly `channel`, for re-loading stored assignments.
    ///
    /// Unlike [`allocate`](Self::allocate) this never falls back to
    /// another channel: a stored assignment that collides with a live one
    /// is a configuration conflict the caller must surface.
    pub fn claim(&mut self, channel: u8) -> Result<(), AllocError> {
        if channel >= CHANNEL_COUNT {
            return Err(AllocError::InvalidChannel(channel));
        }
        if !self.is_free(channel) {
            return Err(AllocError::ChannelInUse(channel));
        }
        self.occupied |= 1 << channel;
        Ok(())
    }

    /// Frees a channel.
    ///
    /// Idempotent: releasing an already-free channel is a no-op, and
    /// out-of-range channels are ignored the same way.
    pub fn release(&mut self, channel: u8) {
        if channel < CHANNEL_COUNT {
            self.occupied &= !(1 << channel);
        }
    }

    /// Whether a channel is unclaimed. Out-of-range channels are never
    /// free.
    pub fn is_free(&self, channel: u8) -> bool {
        channel < CHANNEL_COUNT && self.occupied & (1 << channel) == 0
    }

    /// Lowest-numbered free channel, if any.
    ///
    /// The configuration UI uses this as the default suggestion for a
    /// newly added entity.
    pub fn next_free(&self) -> Option<u8> {
        let free = !self.occupied;
        if free == 0 {
            None
        } else {
            Some(free.trailing_zeros() as u8)
        }
    }

    /// Snapshot of all claimed channels, in ascending order.
    pub fn occupied(&self) -> Vec<u8, 16> {
        (0..CHANNEL_COUNT)
            .filter(|ch| !self.is_free(*ch))
            .collect()
    }

    /// Snapshot of all unclaimed channels, in ascending order.
    ///
    /// Drives the "only show free pins" behavior in the configuration
    /// flow.
    pub fn free(&self) -> Vec<u8, 16> {
        (0..CHANNEL_COUNT).filter(|ch| self.is_free(*ch)).collect()
    }

    /// Number of claimed channels.
    pub fn len(&self) -> usize {
        self.occupied.count_ones() as usize
    }

    /// Whether no channel is claimed.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

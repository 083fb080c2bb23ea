//! Controller save-state record.
//!
//! The wire layout is fixed so save states interchange with other
//! implementations. All words are little-endian:
//!
//! | Offset | Size | Field |
//! |-------:|-----:|-------|
//! | 0      | 1    | version (current: 7) |
//! | 1      | 2    | port 1 read indices (byte 0 live, byte 1 reserved) |
//! | 3      | 4    | reserved |
//! | 7      | 2    | port 2 read indices (byte 0 live, byte 1 reserved) |
//! | 9      | 4    | reserved |
//! | 13     | 8    | reserved |
//! | 21     | 1    | pad_read |
//! | 22     | 1    | pad_read_last |
//! | 23     | 16   | buttons for joypads 0-7, 8 x u16 |
//!
//! Versions 6 and 7 use the layout verbatim. Older versions are a
//! legacy multi-device format whose internal area also carried mouse,
//! SuperScope and multitap state; only its first 16 bytes (the joypad
//! button masks) are honoured on restore, and only for version 2 and
//! up. Versions up to 2 predate the pad-read telemetry, so those flags
//! are left untouched.

use crate::controller::{ControllerPorts, NUM_JOYPADS, NUM_PORTS};

/// Record version written by this implementation.
pub const CONTROL_RECORD_VERSION: u8 = 7;

/// Serialised record size in bytes.
pub const CONTROL_RECORD_SIZE: usize = 39;

/// Offset of the joypad button masks within the record.
const BUTTONS_OFFSET: usize = 23;

/// Versioned controller state record embedded in save states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSnapshot {
    pub version: u8,
    /// Serial read indices per port. The second byte per port is kept
    /// for layout compatibility (older formats stored a second index
    /// there for multi-pad adapters) and written as zero.
    pub read_idx: [[u8; 2]; NUM_PORTS],
    pub pad_read: bool,
    pub pad_read_last: bool,
    /// Button masks for the eight joypad slots.
    pub buttons: [u16; NUM_JOYPADS],
}

impl ControlSnapshot {
    /// Serialise into the fixed wire layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; CONTROL_RECORD_SIZE] {
        let mut bytes = [0u8; CONTROL_RECORD_SIZE];
        bytes[0] = self.version;
        bytes[1] = self.read_idx[0][0];
        bytes[2] = self.read_idx[0][1];
        bytes[7] = self.read_idx[1][0];
        bytes[8] = self.read_idx[1][1];
        bytes[21] = u8::from(self.pad_read);
        bytes[22] = u8::from(self.pad_read_last);
        for (pad, &mask) in self.buttons.iter().enumerate() {
            let at = BUTTONS_OFFSET + 2 * pad;
            bytes[at..at + 2].copy_from_slice(&mask.to_le_bytes());
        }
        bytes
    }

    /// Parse a record. Trailing bytes beyond the fixed layout are
    /// ignored (legacy records carried extra device state there).
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is shorter than the fixed layout.
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        if data.len() < CONTROL_RECORD_SIZE {
            return Err(format!(
                "controller record must be at least {CONTROL_RECORD_SIZE} bytes, got {}",
                data.len()
            ));
        }

        let mut buttons = [0u16; NUM_JOYPADS];
        for (pad, mask) in buttons.iter_mut().enumerate() {
            let at = BUTTONS_OFFSET + 2 * pad;
            *mask = u16::from_le_bytes([data[at], data[at + 1]]);
        }

        Ok(Self {
            version: data[0],
            read_idx: [[data[1], data[2]], [data[7], data[8]]],
            pad_read: data[21] != 0,
            pad_read_last: data[22] != 0,
            buttons,
        })
    }
}

impl ControllerPorts {
    /// Serialise the controller state into a current-version record.
    #[must_use]
    pub fn snapshot(&self) -> ControlSnapshot {
        let mut buttons = [0u16; NUM_JOYPADS];
        for (pad, mask) in buttons.iter_mut().enumerate() {
            *mask = self.joypad_buttons(pad);
        }

        ControlSnapshot {
            version: CONTROL_RECORD_VERSION,
            read_idx: [[self.read_idx[0], 0], [self.read_idx[1], 0]],
            pad_read: self.pad_read,
            pad_read_last: self.pad_read_last,
            buttons,
        }
    }

    /// Apply a record to the controller state, honouring its version.
    ///
    /// The latch level is not stored in the record; it is re-derived
    /// from bit 0 of `$4016` in the caller's MMIO image.
    pub fn restore(&mut self, snap: &ControlSnapshot, mmio: &[u8]) {
        self.read_idx = [snap.read_idx[0][0], snap.read_idx[1][0]];
        self.latch = mmio.get(0x4016).is_some_and(|byte| byte & 1 == 1);

        if snap.version >= 2 {
            for (pad, &mask) in snap.buttons.iter().enumerate() {
                self.set_joypad_buttons(pad, mask);
            }
        }

        if snap.version >= 3 {
            self.pad_read = snap.pad_read;
            self.pad_read_last = snap.pad_read_last;
        }
    }
}

//! SNES controller ports.
//!
//! The console has two controller sockets read through `$4016`/`$4017`.
//! Each read shifts one bit out of the connected pad, MSB first: B, Y,
//! Select, Start, Up, Down, Left, Right, A, X, L, R, then four zero
//! bits, then 1s forever (the hardware pull-up). Writing bit 0 of
//! `$4016` drives the latch line shared by both ports: while it is high
//! the pads continuously reload, so reads return the first bit (B)
//! every time.
//!
//! Hot-swapping works the way the hardware behaves: a newly assigned
//! controller is staged as pending and only plugs in on the next latch
//! high-to-low edge (or a reset).

use emu_core::JoypadBus;

/// Number of logical joypad slots a frontend may populate.
pub const NUM_JOYPADS: usize = 8;

/// Number of physical controller ports.
pub const NUM_PORTS: usize = 2;

/// Serial read index value after a full 16-bit shift-out.
const STREAM_DONE: u8 = 16;

/// What is plugged into a controller port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Controller {
    /// Empty socket.
    #[default]
    None,
    /// Standard joypad, referencing one of the eight joypad slots.
    Joypad(u8),
}

/// One of the eight logical joypads.
#[derive(Debug, Clone, Copy, Default)]
struct Joypad {
    /// Current button mask (see [`crate::input::button`]).
    buttons: u16,
    /// Buttons in turbo mode, toggled automatically at frame end.
    turbos: u16,
    /// Frames since the last turbo toggle.
    turbo_ct: u8,
}

/// The two controller ports and the eight joypad slots behind them.
pub struct ControllerPorts {
    joypads: [Joypad; NUM_JOYPADS],
    /// Committed port assignments, as seen by the console.
    current: [Controller; NUM_PORTS],
    /// Staged assignments, committed on the next latch falling edge.
    pending: [Controller; NUM_PORTS],
    /// Bits shifted out per port since the last latch rising edge.
    /// Saturates at 255 so a runaway reader keeps seeing 1s instead of
    /// wrapping back into the button stream.
    pub(crate) read_idx: [u8; NUM_PORTS],
    /// Level of the shared latch line (`$4016` bit 0).
    pub(crate) latch: bool,
    /// Set whenever the program reads a serial port; rolled over at
    /// frame end so the frontend can tell whether input was polled.
    pub(crate) pad_read: bool,
    /// Value of `pad_read` for the previous frame.
    pub(crate) pad_read_last: bool,
    /// Frames between automatic turbo toggles.
    turbo_time: u8,
}

impl ControllerPorts {
    /// Create the ports in their power-on arrangement: a joypad in port
    /// 1, nothing in port 2.
    #[must_use]
    pub fn new() -> Self {
        let assignments = [Controller::Joypad(0), Controller::None];
        Self {
            joypads: [Joypad::default(); NUM_JOYPADS],
            current: assignments,
            pending: assignments,
            read_idx: [0; NUM_PORTS],
            latch: false,
            pad_read: false,
            pad_read_last: false,
            turbo_time: 1,
        }
    }

    /// Hard reset. Controller-side it behaves like a soft reset.
    pub fn reset_hard(&mut self) {
        self.reset_soft();
    }

    /// Soft reset: clear the latch, zero the serial read indices, and
    /// plug in any pending controllers.
    pub fn reset_soft(&mut self) {
        self.read_idx = [0; NUM_PORTS];
        self.latch = false;
        self.current = self.pending;
    }

    /// Stage a controller for a port. Takes effect on the next latch
    /// falling edge or reset. An out-of-range joypad id stages an empty
    /// socket; an out-of-range port is ignored.
    pub fn set_controller(&mut self, port: usize, controller: Controller) {
        let Some(slot) = self.pending.get_mut(port) else {
            return;
        };
        *slot = match controller {
            Controller::Joypad(id) if id as usize >= NUM_JOYPADS => Controller::None,
            other => other,
        };
    }

    /// Stage the two ports' current controllers swapped. Commits like
    /// any other pending assignment.
    pub fn swap_ports(&mut self) {
        self.pending[0] = self.current[1];
        self.pending[1] = self.current[0];
    }

    /// Check staged assignments for joypads claimed by more than one
    /// port. The lower-numbered port keeps the pad; later claims are
    /// replaced with an empty socket. Returns true if anything was
    /// disabled.
    pub fn verify_controllers(&mut self) -> bool {
        let mut used = [false; NUM_JOYPADS];
        let mut changed = false;

        for slot in &mut self.pending {
            if let Controller::Joypad(id) = *slot {
                let id = id as usize;
                if used[id] {
                    eprintln!(
                        "Joypad{} used more than once! Disabling extra instances",
                        id + 1
                    );
                    *slot = Controller::None;
                    changed = true;
                } else {
                    used[id] = true;
                }
            }
        }

        changed
    }

    /// Overwrite a joypad slot's button mask. Out-of-range pads are
    /// ignored.
    pub fn set_joypad_buttons(&mut self, pad: usize, buttons: u16) {
        if let Some(joypad) = self.joypads.get_mut(pad) {
            joypad.buttons = buttons;
        }
    }

    /// Set or clear the buttons in `mask` on a joypad slot.
    pub fn set_button(&mut self, pad: usize, mask: u16, pressed: bool) {
        if let Some(joypad) = self.joypads.get_mut(pad) {
            if pressed {
                joypad.buttons |= mask;
            } else {
                joypad.buttons &= !mask;
            }
        }
    }

    /// Current button mask of a joypad slot (0 for out-of-range pads).
    #[must_use]
    pub fn joypad_buttons(&self, pad: usize) -> u16 {
        self.joypads.get(pad).map_or(0, |joypad| joypad.buttons)
    }

    /// Mark the buttons in `mask` as turbo: toggled on and off
    /// automatically every `turbo_time` frames while selected.
    pub fn set_joypad_turbo(&mut self, pad: usize, mask: u16) {
        if let Some(joypad) = self.joypads.get_mut(pad) {
            joypad.turbos = mask;
        }
    }

    /// Frames between turbo toggles (1..=120).
    pub fn set_turbo_time(&mut self, frames: u8) {
        self.turbo_time = frames.clamp(1, 120);
    }

    /// Drive the latch line (bit 0 of a `$4016` write).
    ///
    /// A falling edge plugs in pending controllers; a rising edge resets
    /// the serial read indices.
    pub fn set_latch(&mut self, high: bool) {
        if !high && self.latch {
            self.current = self.pending;
        }
        if high && !self.latch {
            self.read_idx = [0; NUM_PORTS];
        }
        self.latch = high;
    }

    /// Read one bit from a controller port (0 = `$4016`, 1 = `$4017`).
    ///
    /// The high six bits come from `open_bus` (lowest two cleared); port
    /// 2 additionally carries the hard-wired `0x1c` pattern on its IO
    /// bits. The low bit is the serial data: bit 15 of the pad while the
    /// latch is high, the button stream followed by 1s while it is low.
    pub fn read_serial(&mut self, port: usize, open_bus: u8) -> u8 {
        if port >= NUM_PORTS {
            return open_bus;
        }

        self.pad_read = true;

        let bits = (open_bus & !0x03) | if port == 1 { 0x1c } else { 0 };

        if self.latch {
            return match self.current[port] {
                Controller::Joypad(id) => {
                    bits | ((self.joypads[id as usize].buttons >> 15) as u8 & 1)
                }
                Controller::None => bits,
            };
        }

        match self.current[port] {
            Controller::Joypad(id) => {
                let idx = self.bump_read_idx(port);
                if idx >= STREAM_DONE {
                    bits | 1
                } else {
                    bits | ((self.joypads[id as usize].buttons >> (15 - idx)) as u8 & 1)
                }
            }
            Controller::None => {
                self.bump_read_idx(port);
                bits
            }
        }
    }

    /// Auto-read sequence run by the hardware at the start of VBlank:
    /// strobe the latch, then store every connected pad's sixteen bits
    /// into the `$4218`-`$421f` words of `mmio`.
    pub fn auto_read(&mut self, mmio: &mut [u8]) {
        self.set_latch(true);
        self.set_latch(false);

        for port in 0..NUM_PORTS {
            match self.current[port] {
                Controller::Joypad(id) => {
                    // The hardware has shifted all 16 bits; manual reads
                    // from here on see the pull-up.
                    self.read_idx[port] = STREAM_DONE;
                    write_word(mmio, 0x4218 + 2 * port, self.joypads[id as usize].buttons);
                    write_word(mmio, 0x421c + 2 * port, 0);
                }
                Controller::None => {
                    write_word(mmio, 0x4218 + 2 * port, 0);
                    write_word(mmio, 0x421c + 2 * port, 0);
                }
            }
        }
    }

    /// Frame-end bookkeeping: toggle turbo buttons on connected pads
    /// and roll the pad-read telemetry over.
    pub fn end_of_frame(&mut self) {
        for port in 0..NUM_PORTS {
            if let Controller::Joypad(id) = self.current[port] {
                let joypad = &mut self.joypads[id as usize];
                joypad.turbo_ct += 1;
                if joypad.turbo_ct >= self.turbo_time {
                    joypad.turbo_ct = 0;
                    joypad.buttons ^= joypad.turbos;
                }
            }
        }

        self.pad_read_last = self.pad_read;
        self.pad_read = false;
    }

    /// Committed controller in a port (`None` for out-of-range ports).
    #[must_use]
    pub fn controller(&self, port: usize) -> Controller {
        self.current.get(port).copied().unwrap_or(Controller::None)
    }

    /// Staged controller for a port.
    #[must_use]
    pub fn pending_controller(&self, port: usize) -> Controller {
        self.pending.get(port).copied().unwrap_or(Controller::None)
    }

    /// Current level of the latch line.
    #[must_use]
    pub fn latch(&self) -> bool {
        self.latch
    }

    /// Serial read index of a port.
    #[must_use]
    pub fn read_index(&self, port: usize) -> u8 {
        self.read_idx.get(port).copied().unwrap_or(0)
    }

    /// Whether a serial port has been read this frame.
    #[must_use]
    pub fn pad_read(&self) -> bool {
        self.pad_read
    }

    /// Whether a serial port was read during the previous frame.
    #[must_use]
    pub fn pad_read_last(&self) -> bool {
        self.pad_read_last
    }

    /// Post-increment the read index, saturating at 255.
    fn bump_read_idx(&mut self, port: usize) -> u8 {
        let old = self.read_idx[port];
        if old < u8::MAX {
            self.read_idx[port] = old + 1;
        }
        old
    }
}

impl Default for ControllerPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl JoypadBus for ControllerPorts {
    fn read_serial(&mut self, port: usize, open_bus: u8) -> u8 {
        ControllerPorts::read_serial(self, port, open_bus)
    }

    fn set_latch(&mut self, high: bool) {
        ControllerPorts::set_latch(self, high);
    }

    fn auto_read(&mut self, mmio: &mut [u8]) {
        ControllerPorts::auto_read(self, mmio);
    }
}

/// Write a 16-bit little-endian word into an MMIO buffer, ignoring
/// out-of-range addresses.
fn write_word(mmio: &mut [u8], addr: usize, value: u16) {
    if let Some(bytes) = mmio.get_mut(addr..addr + 2) {
        bytes.copy_from_slice(&value.to_le_bytes());
    }
}

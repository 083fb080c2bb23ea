//! Input handling for the SNES.
//!
//! Three layers:
//! 1. [`button`]: `u16` mask constants matching the order the hardware
//!    shifts buttons out of the pad.
//! 2. [`SnesButton`] / [`InputQueue`]: logical button names and timed
//!    button events for scripted sequences.
//! 3. [`SharedPads`]: whole-mask atomics a frontend thread may write;
//!    the emulator thread drains them at a frame boundary.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, Ordering};

use crate::controller::{ControllerPorts, NUM_JOYPADS};

/// SNES joypad button masks, MSB first in shift-out order. The low four
/// bits of a mask are always zero.
pub mod button {
    pub const B: u16 = 0x8000;
    pub const Y: u16 = 0x4000;
    pub const SELECT: u16 = 0x2000;
    pub const START: u16 = 0x1000;
    pub const UP: u16 = 0x0800;
    pub const DOWN: u16 = 0x0400;
    pub const LEFT: u16 = 0x0200;
    pub const RIGHT: u16 = 0x0100;
    pub const A: u16 = 0x0080;
    pub const X: u16 = 0x0040;
    pub const L: u16 = 0x0020;
    pub const R: u16 = 0x0010;

    /// Every button bit.
    pub const ALL: u16 = 0xfff0;
}

/// Logical button on the SNES joypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnesButton {
    B,
    Y,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
    A,
    X,
    L,
    R,
}

impl SnesButton {
    /// Return the mask bit for this button.
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            Self::B => button::B,
            Self::Y => button::Y,
            Self::Select => button::SELECT,
            Self::Start => button::START,
            Self::Up => button::UP,
            Self::Down => button::DOWN,
            Self::Left => button::LEFT,
            Self::Right => button::RIGHT,
            Self::A => button::A,
            Self::X => button::X,
            Self::L => button::L,
            Self::R => button::R,
        }
    }
}

/// A timed button event.
#[derive(Debug, Clone)]
pub struct InputEvent {
    /// Frame number at which this event fires.
    pub frame: u64,
    /// Target joypad slot.
    pub pad: usize,
    /// Which button.
    pub button: SnesButton,
    /// True = press, false = release.
    pub pressed: bool,
}

/// Timed input queue for scripted button sequences.
///
/// Events are sorted by frame number and processed at the start of each
/// frame.
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Enqueue a raw input event.
    pub fn push(&mut self, event: InputEvent) {
        let pos = self
            .events
            .iter()
            .position(|e| e.frame > event.frame)
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
    }

    /// Enqueue a button press and matching release.
    pub fn enqueue_button(&mut self, pad: usize, button: SnesButton, at_frame: u64, hold_frames: u64) {
        self.push(InputEvent {
            frame: at_frame,
            pad,
            button,
            pressed: true,
        });
        self.push(InputEvent {
            frame: at_frame + hold_frames,
            pad,
            button,
            pressed: false,
        });
    }

    /// Apply all events due at the given frame to the controller ports.
    pub fn process(&mut self, frame: u64, controls: &mut ControllerPorts) {
        while let Some(event) = self.events.front() {
            if event.frame > frame {
                break;
            }
            let event = self.events.pop_front().expect("front was Some");
            controls.set_button(event.pad, event.button.mask(), event.pressed);
        }
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Pad button masks shared with a frontend thread.
///
/// Storing a whole 16-bit mask is the only mutation permitted off the
/// emulator thread; everything else happens between frames on the
/// emulator thread, which drains the masks with [`SharedPads::apply`].
pub struct SharedPads {
    masks: [AtomicU16; NUM_JOYPADS],
}

impl SharedPads {
    #[must_use]
    pub fn new() -> Self {
        Self {
            masks: std::array::from_fn(|_| AtomicU16::new(0)),
        }
    }

    /// Store a pad's button mask. Out-of-range pads are ignored.
    pub fn set(&self, pad: usize, buttons: u16) {
        if let Some(mask) = self.masks.get(pad) {
            mask.store(buttons, Ordering::Relaxed);
        }
    }

    /// Read back a pad's button mask (0 for out-of-range pads).
    #[must_use]
    pub fn get(&self, pad: usize) -> u16 {
        self.masks
            .get(pad)
            .map_or(0, |mask| mask.load(Ordering::Relaxed))
    }

    /// Copy every mask into the controller state. Call this on the
    /// emulator thread at a frame boundary.
    pub fn apply(&self, controls: &mut ControllerPorts) {
        for pad in 0..NUM_JOYPADS {
            controls.set_joypad_buttons(pad, self.get(pad));
        }
    }
}

impl Default for SharedPads {
    fn default() -> Self {
        Self::new()
    }
}

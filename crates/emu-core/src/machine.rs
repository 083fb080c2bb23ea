//! Machine abstraction for the frame loop.

use crate::JoypadBus;

/// An emulated machine the host can drive one frame at a time.
///
/// The host owns the controller ports and hands them to the machine for
/// the duration of each frame; the emulated CPU reads and latches them
/// through the [`JoypadBus`] contract.
pub trait Machine {
    /// Execute one complete frame of emulation.
    fn run_frame(&mut self, joypads: &mut dyn JoypadBus);

    /// Current output resolution as (width, height) in pixels.
    ///
    /// May change between frames when the emulated software switches
    /// video modes (interlace, overscan). The host samples this after
    /// every frame and records it for the frontend.
    fn frame_size(&self) -> (u32, u32);
}

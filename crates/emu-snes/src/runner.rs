//! Frame-loop coordination.
//!
//! [`Runner`] owns the machine and the host-side state around it: the
//! controller ports, the rewind ring, and a timed input queue. One call
//! to [`Runner::run_frame`] is one emulated frame, forward or backward.

use emu_core::{Freezable, Machine};

use crate::config::RewindConfig;
use crate::controller::ControllerPorts;
use crate::input::InputQueue;
use crate::rewind::RewindRing;

/// Drives a machine one frame at a time with rewind support.
pub struct Runner<M> {
    machine: M,
    controls: ControllerPorts,
    rewind: RewindRing,
    input_queue: InputQueue,
    /// Completed frame counter (forward and rewind frames alike).
    frame_count: u64,
    /// Last resolution reported by the machine.
    frame_size: (u32, u32),
}

impl<M: Machine + Freezable> Runner<M> {
    /// Create a runner with the default rewind tuning.
    #[must_use]
    pub fn new(machine: M) -> Self {
        Self::with_config(machine, RewindConfig::default())
    }

    /// Create a runner with explicit rewind tuning.
    ///
    /// # Panics
    ///
    /// Panics if the configuration violates its contract or the machine
    /// reports a zero freeze size.
    #[must_use]
    pub fn with_config(machine: M, config: RewindConfig) -> Self {
        let state_size = machine.freeze_size();
        let frame_size = machine.frame_size();
        Self {
            rewind: RewindRing::new(config, state_size),
            controls: ControllerPorts::new(),
            input_queue: InputQueue::new(),
            frame_count: 0,
            frame_size,
            machine,
        }
    }

    /// Run one frame.
    ///
    /// Forward: drain due input events, run the machine, do frame-end
    /// controller bookkeeping, then capture a rewind snapshot. While
    /// rewinding: step one snapshot back, then re-run the frame so the
    /// machine repaints its framebuffer (snapshots hold no pixels).
    pub fn run_frame(&mut self) {
        if self.rewind.is_active() {
            self.rewind.step_back(&mut self.machine);
            self.machine.run_frame(&mut self.controls);
            self.controls.end_of_frame();
        } else {
            self.input_queue.process(self.frame_count, &mut self.controls);
            self.machine.run_frame(&mut self.controls);
            self.controls.end_of_frame();
            self.rewind.capture(&mut self.machine);
        }

        self.frame_count += 1;
        self.frame_size = self.machine.frame_size();
    }

    /// Begin the rewind gesture.
    ///
    /// The newest snapshot is shown immediately so the user gets instant
    /// feedback. No-op if already rewinding or if there is no history.
    pub fn start_rewind(&mut self) {
        if self.rewind.is_active() {
            return;
        }
        self.rewind.step_back(&mut self.machine);
    }

    /// End the rewind gesture and resume forward emulation from the
    /// currently shown snapshot. No-op if not rewinding.
    pub fn stop_rewind(&mut self) {
        self.rewind.release();
    }

    /// Whether the rewind gesture is active.
    #[must_use]
    pub fn is_rewinding(&self) -> bool {
        self.rewind.is_active()
    }

    /// Snapshots currently held in the rewind ring.
    #[must_use]
    pub fn buffer_depth(&self) -> usize {
        self.rewind.count()
    }

    /// Rewind cursor offset from the oldest snapshot, while rewinding.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.rewind.position()
    }

    /// Completed frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Most recently reported machine resolution.
    #[must_use]
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    /// Reference to the machine.
    #[must_use]
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Mutable reference to the machine.
    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// Reference to the controller ports.
    #[must_use]
    pub fn controls(&self) -> &ControllerPorts {
        &self.controls
    }

    /// Mutable reference to the controller ports.
    pub fn controls_mut(&mut self) -> &mut ControllerPorts {
        &mut self.controls
    }

    /// Reference to the rewind ring.
    #[must_use]
    pub fn rewind(&self) -> &RewindRing {
        &self.rewind
    }

    /// Mutable reference to the timed input queue.
    pub fn input_queue(&mut self) -> &mut InputQueue {
        &mut self.input_queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::JoypadBus;

    /// Machine whose state is a counter bumped once per frame.
    struct CounterMachine {
        counter: u32,
        frames_run: u32,
    }

    impl CounterMachine {
        fn new() -> Self {
            Self {
                counter: 0,
                frames_run: 0,
            }
        }
    }

    impl Machine for CounterMachine {
        fn run_frame(&mut self, joypads: &mut dyn JoypadBus) {
            // Poll input the way a game does, then advance.
            let mut mmio = [0u8; 0x4220];
            joypads.auto_read(&mut mmio);
            self.counter += 1;
            self.frames_run += 1;
        }

        fn frame_size(&self) -> (u32, u32) {
            (256, 224)
        }
    }

    impl Freezable for CounterMachine {
        fn freeze_size(&self) -> usize {
            4
        }

        fn freeze(&mut self, buf: &mut [u8]) -> bool {
            buf.copy_from_slice(&self.counter.to_le_bytes());
            true
        }

        fn unfreeze(&mut self, buf: &[u8]) {
            self.counter = u32::from_le_bytes(buf.try_into().expect("4-byte state"));
        }
    }

    fn make_runner(capture_interval: u32) -> Runner<CounterMachine> {
        Runner::with_config(
            CounterMachine::new(),
            RewindConfig {
                capacity: 16,
                capture_interval,
                keyframe_interval: 4,
            },
        )
    }

    #[test]
    fn captures_on_the_configured_cadence() {
        let mut runner = make_runner(3);
        for _ in 0..9 {
            runner.run_frame();
        }
        assert_eq!(runner.buffer_depth(), 3);
        assert_eq!(runner.frame_count(), 9);
    }

    #[test]
    fn rewind_steps_and_reruns_each_frame() {
        let mut runner = make_runner(1);
        for _ in 0..5 {
            runner.run_frame();
        }

        runner.start_rewind();
        assert!(runner.is_rewinding());
        assert_eq!(runner.position(), Some(4));
        // The machine was thawed to the newest snapshot, then nothing
        // has re-run yet.
        assert_eq!(runner.machine().counter, 5);

        runner.run_frame();
        assert_eq!(runner.position(), Some(3));
        // Thawed to 4, then one repaint frame ran on top.
        assert_eq!(runner.machine().counter, 5);
    }

    #[test]
    fn gesture_calls_are_idempotent() {
        let mut runner = make_runner(1);
        runner.stop_rewind(); // not rewinding: no-op
        assert!(!runner.is_rewinding());

        for _ in 0..3 {
            runner.run_frame();
        }
        runner.start_rewind();
        let position = runner.position();
        runner.start_rewind(); // already rewinding: no-op
        assert_eq!(runner.position(), position);
    }

    #[test]
    fn start_rewind_without_history_stays_normal() {
        let mut runner = make_runner(3);
        runner.start_rewind();
        assert!(!runner.is_rewinding());
    }

    #[test]
    fn frame_size_is_recorded() {
        let mut runner = make_runner(1);
        assert_eq!(runner.frame_size(), (256, 224));
        runner.run_frame();
        assert_eq!(runner.frame_size(), (256, 224));
    }

    #[test]
    fn input_queue_feeds_the_controls() {
        use crate::input::{button, SnesButton};

        let mut runner = make_runner(1);
        runner
            .input_queue()
            .enqueue_button(0, SnesButton::Start, 1, 2);

        runner.run_frame(); // frame 0: nothing due
        assert_eq!(runner.controls().joypad_buttons(0), 0);

        runner.run_frame(); // frame 1: press applied before the frame
        assert_eq!(runner.controls().joypad_buttons(0), button::START);

        runner.run_frame();
        runner.run_frame(); // frame 3: release applied
        assert_eq!(runner.controls().joypad_buttons(0), 0);
    }
}

//! End-to-end rewind engine tests.
//!
//! Drives the ring (and the runner around it) with a mock machine whose
//! freeze state is a small byte buffer, checking capture cadence,
//! keyframe placement, reconstruction round trips, and the user-facing
//! rewind gesture.

use emu_core::{Freezable, JoypadBus, Machine};
use emu_snes::{RewindConfig, RewindRing, Runner, SnapshotKind};

/// Machine whose whole state is a byte buffer settable from the test.
struct BufferMachine {
    state: Vec<u8>,
}

impl BufferMachine {
    fn new(size: usize) -> Self {
        Self {
            state: vec![0; size],
        }
    }
}

impl Freezable for BufferMachine {
    fn freeze_size(&self) -> usize {
        self.state.len()
    }

    fn freeze(&mut self, buf: &mut [u8]) -> bool {
        buf.copy_from_slice(&self.state);
        true
    }

    fn unfreeze(&mut self, buf: &[u8]) {
        self.state.copy_from_slice(buf);
    }
}

impl Machine for BufferMachine {
    fn run_frame(&mut self, _joypads: &mut dyn JoypadBus) {
        // Something visible happens each frame: bump the first byte.
        self.state[0] = self.state[0].wrapping_add(1);
    }

    fn frame_size(&self) -> (u32, u32) {
        (256, 224)
    }
}

fn config(capacity: usize, capture_interval: u32, keyframe_interval: u32) -> RewindConfig {
    RewindConfig {
        capacity,
        capture_interval,
        keyframe_interval,
    }
}

// ---------------------------------------------------------------------------
// Capture / reconstruct round trip
// ---------------------------------------------------------------------------

#[test]
fn capture_reconstruct_round_trip() {
    let states: [[u8; 8]; 4] = [
        [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        [0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        [0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00],
        [0xff, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00],
    ];

    let mut emu = BufferMachine::new(8);
    let mut ring = RewindRing::new(config(4, 1, 3), 8);

    for state in &states {
        emu.state = state.to_vec();
        ring.capture(&mut emu);
    }
    assert_eq!(ring.count(), 4);

    // A keyframe anchors the ring, deltas follow, and a fresh keyframe
    // lands every third capture.
    assert_eq!(ring.kind_at(0), Some(SnapshotKind::Keyframe));
    assert_eq!(ring.kind_at(1), Some(SnapshotKind::Delta));
    assert_eq!(ring.kind_at(2), Some(SnapshotKind::Delta));
    assert_eq!(ring.kind_at(3), Some(SnapshotKind::Keyframe));

    // Stepping back replays the four states in reverse, bit-exact.
    for expected in states.iter().rev() {
        assert!(ring.step_back(&mut emu));
        assert_eq!(emu.state, expected.to_vec());
    }
    assert!(!ring.step_back(&mut emu));
}

// ---------------------------------------------------------------------------
// Keyframe cadence
// ---------------------------------------------------------------------------

#[test]
fn keyframe_cadence_over_ten_captures() {
    let mut emu = BufferMachine::new(8);
    let mut ring = RewindRing::new(config(16, 1, 3), 8);

    for i in 0..10u8 {
        emu.state = vec![i; 8];
        ring.capture(&mut emu);
    }

    for offset in 0..10 {
        let expected = if offset % 3 == 0 {
            SnapshotKind::Keyframe
        } else {
            SnapshotKind::Delta
        };
        assert_eq!(ring.kind_at(offset), Some(expected), "capture {offset}");
    }
}

// ---------------------------------------------------------------------------
// Round trip across every reachable cursor position
// ---------------------------------------------------------------------------

#[test]
fn every_position_reconstructs_the_frozen_bytes() {
    let mut emu = BufferMachine::new(32);
    let mut ring = RewindRing::new(config(16, 1, 4), 32);

    // Pseudo-random but deterministic states.
    let mut seed = 0x2545_f491u32;
    let mut frozen = Vec::new();
    for _ in 0..12 {
        for byte in emu.state.iter_mut() {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            *byte = (seed >> 24) as u8;
        }
        frozen.push(emu.state.clone());
        ring.capture(&mut emu);
    }

    for expected in frozen.iter().rev() {
        assert!(ring.step_back(&mut emu));
        assert_eq!(&emu.state, expected);
    }
    assert_eq!(ring.position(), Some(0));
}

// ---------------------------------------------------------------------------
// Rewind gesture through the runner
// ---------------------------------------------------------------------------

#[test]
fn rewind_gesture_end_to_end() {
    let mut runner = Runner::with_config(BufferMachine::new(8), config(40, 1, 30));

    for _ in 0..30 {
        runner.run_frame();
    }
    assert_eq!(runner.buffer_depth(), 30);

    runner.start_rewind();
    assert!(runner.is_rewinding());
    assert_eq!(runner.position(), Some(29));

    for _ in 0..28 {
        runner.run_frame();
    }
    assert_eq!(runner.position(), Some(1));

    runner.stop_rewind();
    assert!(!runner.is_rewinding());
    // Tail plus the released cursor remain.
    assert_eq!(runner.buffer_depth(), 2);

    // Forward again: the next capture is a delta against the
    // reconstructed state at the former cursor.
    runner.run_frame();
    assert_eq!(runner.buffer_depth(), 3);
    assert_eq!(runner.rewind().kind_at(2), Some(SnapshotKind::Delta));

    // And that delta reconstructs what was actually frozen.
    let frozen = runner.machine().state.clone();
    runner.start_rewind();
    assert_eq!(runner.machine().state, frozen);
}

#[test]
fn release_discards_newer_snapshots() {
    let mut runner = Runner::with_config(BufferMachine::new(8), config(16, 1, 4));

    for _ in 0..10 {
        runner.run_frame();
    }
    assert_eq!(runner.buffer_depth(), 10);

    runner.start_rewind();
    for _ in 0..6 {
        runner.run_frame();
    }
    assert_eq!(runner.position(), Some(3));

    runner.stop_rewind();
    assert_eq!(runner.buffer_depth(), 4);
    assert_eq!(runner.position(), None);
}

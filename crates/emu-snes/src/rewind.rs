//! Rewind engine: ring buffer of XOR-delta compressed state snapshots.
//!
//! Every `capture_interval` frames the live machine state is frozen and
//! stored in a ring. Most slots hold an XOR delta against the previous
//! capture; every `keyframe_interval` captures a full keyframe is stored
//! instead, so reconstructing any slot replays at most
//! `keyframe_interval - 1` deltas on top of a keyframe. With the default
//! tuning (200 slots, one capture per 3 frames) the ring holds roughly
//! ten seconds of 60 Hz history.

use emu_core::Freezable;

use crate::config::RewindConfig;

/// How a slot's payload encodes the machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Full freeze; an independent reconstruction anchor.
    Keyframe,
    /// XOR of this capture's state against the previous capture's.
    Delta,
}

/// One captured snapshot.
struct Slot {
    kind: SnapshotKind,
    data: Box<[u8]>,
}

/// Ring buffer of state snapshots with a rewind cursor.
pub struct RewindRing {
    config: RewindConfig,
    slots: Vec<Option<Slot>>,
    /// Index of the most recent capture. Meaningful only when `count > 0`.
    head: usize,
    /// Number of occupied slots.
    count: usize,
    /// Slot currently shown to the user; `Some` exactly while rewinding.
    cursor: Option<usize>,
    /// Frames since the last successful capture.
    frame_ctr: u32,
    /// Deltas stored since the last keyframe.
    key_ctr: u32,
    /// Bytes per freeze.
    state_size: usize,
    /// Scratch: freeze target and reconstruction target.
    cur_state: Box<[u8]>,
    /// Full state of the previous capture, for delta computation.
    prev_state: Box<[u8]>,
    have_prev: bool,
    /// Walk-back scratch, allocated once; holds at most
    /// `keyframe_interval - 1` delta indices.
    chain: Vec<usize>,
}

impl RewindRing {
    /// Create a ring for machine states of `state_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if the configuration violates its contract (see
    /// [`RewindConfig::validate`]) or `state_size` is zero.
    #[must_use]
    pub fn new(config: RewindConfig, state_size: usize) -> Self {
        if let Err(msg) = config.validate() {
            panic!("invalid rewind config: {msg}");
        }
        assert!(state_size > 0, "state size must be non-zero");

        let mut slots = Vec::with_capacity(config.capacity);
        slots.resize_with(config.capacity, || None);

        Self {
            slots,
            head: 0,
            count: 0,
            cursor: None,
            frame_ctr: 0,
            key_ctr: 0,
            state_size,
            cur_state: vec![0; state_size].into_boxed_slice(),
            prev_state: vec![0; state_size].into_boxed_slice(),
            have_prev: false,
            chain: Vec::with_capacity(config.keyframe_interval as usize),
            config,
        }
    }

    /// Per-frame tick: every `capture_interval` frames, freeze the
    /// machine and store a snapshot. Does nothing while rewinding.
    pub fn capture(&mut self, emu: &mut impl Freezable) {
        if self.is_active() {
            return;
        }

        self.frame_ctr = self.frame_ctr.saturating_add(1);
        if self.frame_ctr < self.config.capture_interval {
            return;
        }

        // On refusal the counter stays primed, so the next frame retries
        // instead of waiting out a whole interval.
        if !emu.freeze(&mut self.cur_state) {
            return;
        }
        self.frame_ctr = 0;

        let new_head = if self.count == 0 {
            0
        } else {
            self.next(self.head)
        };

        // The first capture is always a keyframe, and a new one is due
        // whenever the delta chain would otherwise grow past
        // keyframe_interval - 1. Periodic keyframes guarantee that when
        // the ring wraps, reconstruction still finds an anchor within a
        // bounded number of steps.
        let make_key = !self.have_prev || self.key_ctr >= self.config.keyframe_interval - 1;

        let mut payload = self.cur_state.clone();
        let kind = if make_key {
            self.key_ctr = 0;
            SnapshotKind::Keyframe
        } else {
            xor_apply(&mut payload, &self.prev_state);
            self.key_ctr += 1;
            SnapshotKind::Delta
        };

        self.slots[new_head] = Some(Slot { kind, data: payload });
        self.head = new_head;
        if self.count < self.config.capacity {
            self.count += 1;
        }

        self.prev_state.copy_from_slice(&self.cur_state);
        self.have_prev = true;
    }

    /// Step one snapshot back and thaw it into the machine.
    ///
    /// The first call enters rewind at the newest snapshot; later calls
    /// walk toward the oldest. Returns false when there is no more
    /// history to show (which leaves the machine untouched).
    pub fn step_back(&mut self, emu: &mut impl Freezable) -> bool {
        if self.count == 0 {
            return false;
        }

        let target = match self.cursor {
            None => self.head,
            Some(cursor) => {
                if cursor == self.tail() {
                    return false;
                }
                self.prev(cursor)
            }
        };

        if !self.reconstruct(target) {
            return false;
        }

        self.cursor = Some(target);
        emu.unfreeze(&self.cur_state);
        true
    }

    /// Leave rewind: discard every snapshot strictly newer than the
    /// cursor and make the cursor the new head.
    ///
    /// The machine already holds the cursor's state from the last
    /// `step_back`, so nothing is thawed; `prev_state` is re-primed from
    /// the new head so the next capture deltas against it.
    pub fn release(&mut self) {
        let Some(cursor) = self.cursor.take() else {
            return;
        };

        let tail = self.tail();
        let mut new_count = 1;
        let mut i = tail;
        while i != cursor {
            new_count += 1;
            i = self.next(i);
        }

        let old_head = self.head;
        let mut i = self.next(cursor);
        while i != self.next(old_head) {
            self.slots[i] = None;
            i = self.next(i);
        }

        self.head = cursor;
        self.count = new_count;

        if self.reconstruct(self.head) {
            self.prev_state.copy_from_slice(&self.cur_state);
            self.have_prev = true;
            // The walk-back scratch now holds exactly the deltas between
            // the new head and its anchor keyframe; sync the counter so
            // the next keyframe lands on cadence and no chain ever grows
            // past keyframe_interval - 1.
            self.key_ctr = self.chain.len() as u32;
        } else {
            self.have_prev = false;
            self.key_ctr = 0;
        }

        self.frame_ctr = 0;
    }

    /// Whether a rewind is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cursor.is_some()
    }

    /// Number of snapshots currently held.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Cursor offset from the oldest snapshot (0 = oldest,
    /// `count - 1` = newest). `None` while not rewinding.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        let cursor = self.cursor?;
        Some((cursor + self.config.capacity - self.tail()) % self.config.capacity)
    }

    /// Kind of the snapshot at `offset` slots from the tail (0 =
    /// oldest), or `None` past the head.
    #[must_use]
    pub fn kind_at(&self, offset: usize) -> Option<SnapshotKind> {
        if offset >= self.count {
            return None;
        }
        let idx = (self.tail() + offset) % self.config.capacity;
        self.slots[idx].as_ref().map(|slot| slot.kind)
    }

    /// Bytes per snapshot payload.
    #[must_use]
    pub fn state_size(&self) -> usize {
        self.state_size
    }

    /// The tuning this ring was built with.
    #[must_use]
    pub fn config(&self) -> &RewindConfig {
        &self.config
    }

    fn next(&self, i: usize) -> usize {
        (i + 1) % self.config.capacity
    }

    fn prev(&self, i: usize) -> usize {
        (i + self.config.capacity - 1) % self.config.capacity
    }

    /// Index of the oldest occupied slot. Valid only when `count > 0`.
    fn tail(&self) -> usize {
        debug_assert!(self.count > 0);
        (self.head + self.config.capacity - (self.count - 1)) % self.config.capacity
    }

    /// Rebuild the full state at `idx` into `cur_state`: walk back to
    /// the nearest keyframe, then replay the deltas forward.
    ///
    /// Returns false if the walk runs off the tail before finding a
    /// keyframe. That can only happen for tail-region slots whose
    /// anchor was overwritten by ring wrap; callers treat it as
    /// exhausted history.
    fn reconstruct(&mut self, idx: usize) -> bool {
        self.chain.clear();
        let tail = self.tail();
        let mut cur = idx;

        loop {
            let Some(slot) = self.slots[cur].as_ref() else {
                return false;
            };
            if slot.kind == SnapshotKind::Keyframe {
                self.cur_state.copy_from_slice(&slot.data);
                break;
            }
            self.chain.push(cur);
            if cur == tail {
                return false;
            }
            cur = self.prev(cur);
        }

        // chain holds delta indices newest-first; replay them oldest-first.
        for n in (0..self.chain.len()).rev() {
            let i = self.chain[n];
            let Some(slot) = self.slots[i].as_ref() else {
                return false;
            };
            xor_apply(&mut self.cur_state, &slot.data);
        }

        true
    }
}

/// XOR `src` into `dst`: `dst[i] ^= src[i]`.
///
/// Works in u64 lanes with a byte-wise tail; the result is identical to
/// a plain byte loop for any length.
fn xor_apply(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());

    let split = dst.len() - dst.len() % 8;
    for (d, s) in dst[..split]
        .chunks_exact_mut(8)
        .zip(src[..split].chunks_exact(8))
    {
        let lane = u64::from_ne_bytes((&*d).try_into().expect("8-byte chunk"))
            ^ u64::from_ne_bytes(s.try_into().expect("8-byte chunk"));
        d.copy_from_slice(&lane.to_ne_bytes());
    }
    for (d, s) in dst[split..].iter_mut().zip(&src[split..]) {
        *d ^= *s;
    }
}

//! Per frame-in-flight resource rotation
//!
//! While the GPU consumes frame `n`, the CPU is already preparing frame
//! `n + 1`. Anything written every frame therefore needs one copy per frame
//! in flight. [`FrameRotator`] holds those copies and maps a frame number to
//! its slot with `frame_number % K`.
//!
//! The rotator only provides the indexing. Waiting on the fence of a slot's
//! previous use before writing it again is the caller's job.

use std::ops::{Index, IndexMut};

/// Default number of frames in flight
pub const INFLIGHT_FRAME_COUNT: usize = 2;

/// `K` copies of a per-frame resource, selected by frame number
#[derive(Debug)]
pub struct FrameRotator<T, const K: usize = INFLIGHT_FRAME_COUNT> {
    slots: Option<[T; K]>,
}

impl<T, const K: usize> Default for FrameRotator<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const K: usize> FrameRotator<T, K> {
    /// Rotator without slots; [`init`](Self::init) must run before any access
    pub const fn new() -> Self {
        Self { slots: None }
    }

    /// Create all `K` slots at once; `make` receives the slot index
    ///
    /// Replaces any previous slots.
    pub fn init(&mut self, make: impl FnMut(usize) -> T) {
        assert!(K > 0, "FrameRotator needs at least one slot");
        self.slots = Some(std::array::from_fn(make));
    }

    /// Whether [`init`](Self::init) has run
    pub fn is_initialized(&self) -> bool {
        self.slots.is_some()
    }

    /// Number of slots
    pub const fn frame_count() -> usize {
        K
    }

    /// Slot used by `frame_number`
    pub const fn slot_index(frame_number: u64) -> usize {
        (frame_number % K as u64) as usize
    }

    /// Slot used by the frame before `frame_number`
    pub const fn previous_slot_index(frame_number: u64) -> usize {
        (Self::slot_index(frame_number) + K - 1) % K
    }

    /// Slot for `frame_number`
    ///
    /// # Panics
    /// If the rotator has not been initialized.
    pub fn get(&self, frame_number: u64) -> &T {
        &self.slots()[Self::slot_index(frame_number)]
    }

    /// Mutable slot for `frame_number`
    ///
    /// # Panics
    /// If the rotator has not been initialized.
    pub fn get_mut(&mut self, frame_number: u64) -> &mut T {
        &mut self.slots_mut()[Self::slot_index(frame_number)]
    }

    /// All slots in index order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flat_map(|slots| slots.iter())
    }

    /// All slots in index order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().flat_map(|slots| slots.iter_mut())
    }

    /// Drop all slots, returning the rotator to its uninitialized state
    pub fn reset(&mut self) -> Option<[T; K]> {
        self.slots.take()
    }

    fn slots(&self) -> &[T; K] {
        match &self.slots {
            Some(slots) => slots,
            None => panic!("FrameRotator accessed before init"),
        }
    }

    fn slots_mut(&mut self) -> &mut [T; K] {
        match &mut self.slots {
            Some(slots) => slots,
            None => panic!("FrameRotator accessed before init"),
        }
    }
}

impl<T, const K: usize> Index<u64> for FrameRotator<T, K> {
    type Output = T;

    fn index(&self, frame_number: u64) -> &T {
        self.get(frame_number)
    }
}

impl<T, const K: usize> IndexMut<u64> for FrameRotator<T, K> {
    fn index_mut(&mut self, frame_number: u64) -> &mut T {
        self.get_mut(frame_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_slot_every_k_frames() {
        let mut rotator: FrameRotator<usize, 3> = FrameRotator::new();
        rotator.init(|index| index);

        for frame in 0..20u64 {
            assert_eq!(rotator[frame], rotator[frame + 3]);
            assert!(std::ptr::eq(rotator.get(frame), rotator.get(frame + 3)));
        }
    }

    #[test]
    fn test_wraparound_with_two_frames() {
        let mut rotator: FrameRotator<Vec<&str>> = FrameRotator::new();
        rotator.init(|_| Vec::new());

        rotator[0].push("frame 0");
        rotator[1].push("frame 1");

        // Frame 2 lands on the slot frame 0 used and sees what it left behind
        assert_eq!(rotator[2], vec!["frame 0"]);
        assert!(std::ptr::eq(&rotator[2], &rotator[0]));
        assert!(!std::ptr::eq(&rotator[2], &rotator[1]));

        rotator[2].clear();
        rotator[2].push("frame 2");
        assert_eq!(rotator[0], vec!["frame 2"]);
        assert_eq!(rotator[1], vec!["frame 1"]);
    }

    #[test]
    fn test_previous_slot_index() {
        assert_eq!(FrameRotator::<u8, 2>::previous_slot_index(0), 1);
        assert_eq!(FrameRotator::<u8, 2>::previous_slot_index(5), 0);
        assert_eq!(FrameRotator::<u8, 3>::previous_slot_index(0), 2);
        assert_eq!(FrameRotator::<u8, 3>::previous_slot_index(4), 0);
    }

    #[test]
    fn test_init_gives_every_slot_same_configuration() {
        let mut rotator: FrameRotator<(usize, &str), 3> = FrameRotator::new();
        rotator.init(|index| (index, "storage"));

        let slots: Vec<_> = rotator.iter().collect();
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|(_, usage)| *usage == "storage"));
        assert_eq!(FrameRotator::<u8, 3>::frame_count(), 3);
    }

    #[test]
    #[should_panic(expected = "accessed before init")]
    fn test_access_before_init_panics() {
        let rotator: FrameRotator<u32> = FrameRotator::new();
        let value: u32 = rotator[0];
        assert_eq!(value, 0);
    }

    #[test]
    fn test_reset_uninitializes() {
        let mut rotator: FrameRotator<u32> = FrameRotator::new();
        rotator.init(|_| 1);
        assert!(rotator.is_initialized());
        assert!(rotator.reset().is_some());
        assert!(!rotator.is_initialized());
        assert_eq!(rotator.iter().count(), 0);
    }
}

//! Allocation tracking
//!
//! Each [`RenderContext`](super::RenderContext) owns one tracker. Resource
//! handles register when they allocate and release when they free, so
//! anything still listed when the context goes away is a leak.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Identifier handed out by [`AllocationTracker::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AllocationId(u64);

/// Kind of GPU object behind an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    /// `vk::Buffer`
    Buffer,
    /// `vk::Image`
    Image,
}

/// Snapshot of one live allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    /// Debug name of the owning handle
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer or image
    pub kind: AllocationKind,
}

/// Registry of live allocations scoped to one render context
#[derive(Debug, Default)]
pub struct AllocationTracker {
    next_id: AtomicU64,
    live: Mutex<BTreeMap<AllocationId, AllocationRecord>>,
}

impl AllocationTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new allocation
    pub fn register(&self, name: &str, size: u64, kind: AllocationKind) -> AllocationId {
        let id = AllocationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = AllocationRecord {
            name: name.to_string(),
            size,
            kind,
        };
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, record);
        id
    }

    /// Forget an allocation, returning its record if it was live
    pub fn release(&self, id: AllocationId) -> Option<AllocationRecord> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).remove(&id)
    }

    /// Number of live allocations
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Total bytes held by live allocations
    pub fn live_bytes(&self) -> u64 {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|record| record.size)
            .sum()
    }

    /// Records of every live allocation in creation order
    pub fn live_allocations(&self) -> Vec<AllocationRecord> {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Log every live allocation as a leak and return how many there were
    pub fn report_leaks(&self) -> usize {
        let leaks = self.live_allocations();
        for record in &leaks {
            log::warn!("Leaked {:?} '{}' ({} bytes)", record.kind, record.name, record.size);
        }
        leaks.len()
    }
}

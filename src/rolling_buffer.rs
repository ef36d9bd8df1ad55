//! Fixed-capacity ring buffer keyed by monotonic sequence number.
//!
//! Used by the upper RTCP layer to cache recently-sent packets for NACK
//! retransmission; this crate only provides the generic container, grounded
//! in `original_source/src/source/Rtcp/RollingBuffer.h`'s bounded, FIFO
//! eviction semantics.

/// A ring buffer of fixed capacity `N`. Every `append` assigns the next
/// sequence number; once the buffer is full, the oldest entry is evicted
/// and `free_hook` is invoked on it exactly once.
pub struct RollingBuffer<T> {
    capacity: usize,
    slots: Vec<Option<T>>,
    next_seq: u64,
    oldest_seq: u64,
    free_hook: Box<dyn FnMut(T) + Send>,
}

impl<T> RollingBuffer<T> {
    pub fn new(capacity: usize, free_hook: Box<dyn FnMut(T) + Send>) -> Self {
        assert!(capacity > 0, "RollingBuffer capacity must be non-zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        RollingBuffer {
            capacity,
            slots,
            next_seq: 0,
            oldest_seq: 0,
            free_hook,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.next_seq == self.oldest_seq
    }

    pub fn size(&self) -> usize {
        (self.next_seq - self.oldest_seq) as usize
    }

    /// Appends `payload`, returning its assigned sequence number. If the
    /// buffer was already at capacity, the oldest entry is evicted first
    /// and passed to the free hook.
    pub fn append(&mut self, payload: T) -> u64 {
        if self.size() == self.capacity {
            let idx = (self.oldest_seq as usize) % self.capacity;
            if let Some(evicted) = self.slots[idx].take() {
                (self.free_hook)(evicted);
            }
            self.oldest_seq += 1;
        }
        let seq = self.next_seq;
        let idx = (seq as usize) % self.capacity;
        self.slots[idx] = Some(payload);
        self.next_seq += 1;
        seq
    }

    /// Looks up the payload for `seq`, if it hasn't been evicted.
    pub fn get(&self, seq: u64) -> Option<&T>
    where
        T: Clone,
    {
        if seq < self.oldest_seq || seq >= self.next_seq {
            return None;
        }
        let idx = (seq as usize) % self.capacity;
        self.slots[idx].as_ref()
    }
}

impl<T> Drop for RollingBuffer<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(payload) = slot.take() {
                (self.free_hook)(payload);
            }
        }
    }
}

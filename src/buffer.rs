use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Slot storage and cursors, guarded together by one lock
#[derive(Debug)]
struct Slots<T> {
    data: Vec<Option<T>>,
    head: usize,
    tail: usize,
}

impl<T> Slots<T> {
    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.data.len()
    }
}

/// A fixed-capacity circular buffer that overwrites its oldest element on overflow.
///
/// The buffer keeps one spare slot so that `head == tail` always means empty
/// while a full buffer still holds `capacity` elements.
#[derive(Debug)]
pub struct RingBuffer<T> {
    slots: Mutex<Slots<T>>,
    capacity: usize,
    evicted_count: AtomicU64,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer holding at most `capacity` elements.
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut data = Vec::with_capacity(capacity + 1);
        data.resize_with(capacity + 1, || None);
        Self {
            slots: Mutex::new(Slots {
                data,
                head: 0,
                tail: 0,
            }),
            capacity,
            evicted_count: AtomicU64::new(0),
        }
    }

    /// Insert a value at the tail.
    ///
    /// When the buffer was already full the oldest element is discarded and
    /// returned.
    pub fn push(&self, value: T) -> Option<T> {
        let mut slots = self.slots.lock();
        let tail = slots.tail;
        slots.data[tail] = Some(value);
        slots.tail = slots.advance(tail);

        if slots.tail == slots.head {
            let head = slots.head;
            let evicted = slots.data[head].take();
            slots.head = slots.advance(head);
            self.evicted_count.fetch_add(1, Ordering::Relaxed);
            return evicted;
        }
        None
    }

    /// Drain every held element, oldest first, leaving the buffer empty
    pub fn flush(&self) -> Vec<T> {
        let mut slots = self.slots.lock();
        if slots.head == slots.tail {
            return Vec::new();
        }

        let mut drained = Vec::with_capacity(self.capacity);
        while slots.head != slots.tail {
            let head = slots.head;
            if let Some(value) = slots.data[head].take() {
                drained.push(value);
            }
            slots.head = slots.advance(head);
        }
        drained
    }

    /// Get the number of held elements
    pub fn len(&self) -> usize {
        let slots = self.slots.lock();
        let slot_count = slots.data.len();
        (slots.tail + slot_count - slots.head) % slot_count
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        let slots = self.slots.lock();
        slots.head == slots.tail
    }

    /// Get the capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of elements discarded by overflow
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count.load(Ordering::Relaxed)
    }
}

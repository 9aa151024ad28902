//! Single-frame hand-off between the worker thread and the main loop
//!
//! Decoded inbound frames cross threads through a one-deep buffer: the
//! worker fills it and the main loop drains it while delivering the frame to
//! the stack. A worker with a second indication blocks on the condition
//! variable until the slot is free again, which is exactly the backpressure
//! the serialized co-processor transport expects.

use std::sync::{Condvar, Mutex};

use crate::radio::RadioPacket;

/// One-deep receive buffer with blocking writes
pub struct RxSlot {
    cell: Mutex<Option<RadioPacket>>,
    drained: Condvar,
}

impl RxSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(None),
            drained: Condvar::new(),
        }
    }

    /// Store a decoded frame, blocking until the slot is empty
    ///
    /// Called by the worker thread only.
    pub fn put(&self, packet: RadioPacket) {
        let mut cell = self.cell.lock().unwrap();
        while cell.is_some() {
            cell = self.drained.wait(cell).unwrap();
        }
        *cell = Some(packet);
    }

    /// Hand the held frame to `consume`, then free the slot
    ///
    /// Called by the main thread only. Frees the slot and wakes any blocked
    /// writer after `consume` returns, so the consumer observes the frame
    /// strictly before the worker can overwrite it. Returns `None` without
    /// calling `consume` when the slot is empty.
    pub fn consume<R>(&self, consume: impl FnOnce(&mut RadioPacket) -> R) -> Option<R> {
        let mut cell = self.cell.lock().unwrap();
        let result = cell.as_mut().map(consume);

        if result.is_some() {
            *cell = None;
            self.drained.notify_all();
        }

        result
    }

    /// True when no frame is waiting to be drained
    pub fn is_empty(&self) -> bool {
        self.cell.lock().unwrap().is_none()
    }
}

impl Default for RxSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn packet_with_lqi(lqi: u8) -> RadioPacket {
        let mut packet = RadioPacket::new();
        packet.lqi = lqi;
        packet
    }

    #[test]
    fn test_consume_on_empty_slot_does_nothing() {
        let slot = RxSlot::new();
        assert_eq!(slot.consume(|_| 1), None);
    }

    #[test]
    fn test_put_then_consume() {
        let slot = RxSlot::new();
        slot.put(packet_with_lqi(0xC8));

        assert!(!slot.is_empty());
        assert_eq!(slot.consume(|packet| packet.lqi), Some(0xC8));
        assert!(slot.is_empty());
    }

    #[test]
    fn test_second_put_blocks_until_drained() {
        let slot = Arc::new(RxSlot::new());
        let second_stored = Arc::new(AtomicBool::new(false));

        slot.put(packet_with_lqi(1));

        let writer = {
            let slot = Arc::clone(&slot);
            let second_stored = Arc::clone(&second_stored);
            thread::spawn(move || {
                slot.put(packet_with_lqi(2));
                second_stored.store(true, Ordering::SeqCst);
            })
        };

        // The writer must be parked on the full slot
        thread::sleep(Duration::from_millis(50));
        assert!(!second_stored.load(Ordering::SeqCst));

        // Draining the first frame unblocks the writer; nothing is dropped
        assert_eq!(slot.consume(|packet| packet.lqi), Some(1));
        writer.join().unwrap();
        assert!(second_stored.load(Ordering::SeqCst));
        assert_eq!(slot.consume(|packet| packet.lqi), Some(2));
    }
}

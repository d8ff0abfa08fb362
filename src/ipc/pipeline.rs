//! # **Pipeline Module** - *Ordered Message Emission*
//!
//! The writer's concurrency core: record batches may encode in parallel,
//! but bytes must land in strictly increasing partition order. Three small
//! primitives make that true:
//!
//! - [`OrderedGate`] — a watermark (`Mutex` + `Condvar`). The producer for
//!   partition *i* blocks until the watermark reaches *i*, enqueues its
//!   frames, then advances the watermark to `i + 1`.
//! - A bounded MPSC queue (`std::sync::mpsc::sync_channel`) drained by a
//!   single writer task that performs the actual byte writes.
//! - [`AbortFlag`] — first failure wins: the offending partition index and
//!   error are recorded once, the flag flips, and every other task bails at
//!   its next check. The caller observes `WriteAborted` on close.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use crate::enums::error::MinstreamError;

/// The kind of IPC frame an encoded message carries.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FrameKind {
    Schema,
    Dictionary,
    Record,
}

/// One encoded, ready-to-write message: the metadata flatbuffer and the
/// (padded) body bytes.
pub struct EncodedFrame {
    pub kind: FrameKind,
    pub metadata: Vec<u8>,
    pub body: Vec<u8>,
}

/// # OrderedGate
///
/// Watermark synchronizer keyed by partition index.
pub struct OrderedGate {
    watermark: Mutex<usize>,
    cv: Condvar,
}

impl OrderedGate {
    /// Gate opening at `start`.
    pub fn new(start: usize) -> Self {
        Self {
            watermark: Mutex::new(start),
            cv: Condvar::new(),
        }
    }

    /// Blocks until the watermark reaches `turn`.
    pub fn wait_turn(&self, turn: usize) {
        let mut mark = self.watermark.lock().expect("gate poisoned");
        while *mark < turn {
            mark = self.cv.wait(mark).expect("gate poisoned");
        }
    }

    /// Advances the watermark by one and wakes all waiters.
    pub fn advance(&self) {
        let mut mark = self.watermark.lock().expect("gate poisoned");
        *mark += 1;
        self.cv.notify_all();
    }
}

/// # AbortFlag
///
/// First-failure latch shared by encoding tasks and the drain task.
#[derive(Default)]
pub struct AbortFlag {
    aborted: AtomicBool,
    slot: Mutex<Option<(usize, String)>>,
}

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first failure; later calls are ignored.
    pub fn abort(&self, partition: usize, error: &MinstreamError) {
        let mut slot = self.slot.lock().expect("abort slot poisoned");
        if slot.is_none() {
            *slot = Some((partition, error.to_string()));
        }
        self.aborted.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// The fatal error to surface on close, when a task failed.
    pub fn take_error(&self) -> Option<MinstreamError> {
        self.slot
            .lock()
            .expect("abort slot poisoned")
            .take()
            .map(|(partition, message)| MinstreamError::WriteAborted { partition, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn test_gate_orders_producers() {
        let gate = Arc::new(OrderedGate::new(1));
        let (tx, rx) = sync_channel::<usize>(2);

        std::thread::scope(|scope| {
            // spawn out of order on purpose
            for turn in [3usize, 1, 2] {
                let gate = gate.clone();
                let tx = tx.clone();
                scope.spawn(move || {
                    gate.wait_turn(turn);
                    tx.send(turn).unwrap();
                    gate.advance();
                });
            }
            drop(tx);
            let order: Vec<usize> = rx.iter().collect();
            assert_eq!(order, vec![1, 2, 3]);
        });
    }

    #[test]
    fn test_abort_flag_first_failure_wins() {
        let flag = AbortFlag::new();
        assert!(!flag.is_aborted());
        flag.abort(4, &crate::enums::error::malformed("boom"));
        flag.abort(2, &crate::enums::error::malformed("later"));
        assert!(flag.is_aborted());
        match flag.take_error().unwrap() {
            MinstreamError::WriteAborted { partition, message } => {
                assert_eq!(partition, 4);
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

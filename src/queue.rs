//! Bounded packet queue between the receiver and the processor
//!
//! One producer, one consumer: the halves are not `Clone`. Enqueue never
//! blocks; a full queue hands the datagram back to the caller.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::time::Instant;

/// An owned copy of one received datagram. The receiver's read buffer is never enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Box<[u8]>,
    pub received_at: Instant,
}

impl Datagram {
    pub fn copy_from(bytes: &[u8]) -> Self {
        Datagram {
            payload: bytes.into(),
            received_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum EnqueueError {
    Full(Datagram),
    /// Consumer is gone
    Closed(Datagram),
}

impl EnqueueError {
    pub fn into_inner(self) -> Datagram {
        match self {
            EnqueueError::Full(d) | EnqueueError::Closed(d) => d,
        }
    }
}

pub fn packet_queue(capacity: usize) -> (PacketSender, PacketReceiver) {
    let (tx, rx) = bounded(capacity);
    (PacketSender { tx, capacity }, PacketReceiver { rx })
}

#[derive(Debug)]
pub struct PacketSender {
    tx: Sender<Datagram>,
    capacity: usize,
}

impl PacketSender {
    pub fn try_enqueue(&self, datagram: Datagram) -> Result<(), EnqueueError> {
        self.tx.try_send(datagram).map_err(|e| match e {
            TrySendError::Full(d) => EnqueueError::Full(d),
            TrySendError::Disconnected(d) => EnqueueError::Closed(d),
        })
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug)]
pub struct PacketReceiver {
    rx: Receiver<Datagram>,
}

impl PacketReceiver {
    pub fn try_dequeue(&self) -> Option<Datagram> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub(crate) fn channel(&self) -> &Receiver<Datagram> {
        &self.rx
    }
}

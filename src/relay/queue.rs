//! Delivery Queue
//!
//! FIFO hand-off of completed lines from the relay thread to the display
//! consumer. The producer side never blocks; the consumer pulls with a
//! short timeout so it can notice when the relay is gone.

use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Outcome of a pull from the delivery queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The next line, in emission order
    Line(String),
    /// Nothing yet; the relay is still alive
    Empty,
    /// The relay has finished and everything has been delivered
    Closed,
}

/// Create a connected sender/queue pair
pub fn delivery_queue() -> (DeliverySender, DeliveryQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DeliverySender { tx }, DeliveryQueue { rx })
}

/// Producer half, owned by the relay
#[derive(Debug, Clone)]
pub struct DeliverySender {
    tx: UnboundedSender<String>,
}

impl DeliverySender {
    /// Publish a line; returns false once the consumer has gone away
    pub fn push(&self, line: String) -> bool {
        self.tx.send(line).is_ok()
    }
}

/// Consumer half, read by the display layer
#[derive(Debug)]
pub struct DeliveryQueue {
    rx: UnboundedReceiver<String>,
}

impl DeliveryQueue {
    /// Wait up to `timeout` for the next line
    pub async fn next_chunk(&mut self, timeout: Duration) -> Delivery {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(line)) => Delivery::Line(line),
            Ok(None) => Delivery::Closed,
            Err(_) => Delivery::Empty,
        }
    }

    /// Take the next line without waiting
    pub fn try_next(&mut self) -> Delivery {
        match self.rx.try_recv() {
            Ok(line) => Delivery::Line(line),
            Err(TryRecvError::Empty) => Delivery::Empty,
            Err(TryRecvError::Disconnected) => Delivery::Closed,
        }
    }

    /// Take every line that is ready right now
    pub fn drain_available(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Delivery::Line(line) = self.try_next() {
            lines.push(line);
        }
        lines
    }

    /// Whether the producer is gone and nothing is left to deliver
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }
}

//! Event feed - the producer/consumer seam
//!
//! Producers append from any thread or task. The reconciler drains without
//! blocking at the start of every tick. Items are never reordered or
//! mutated once enqueued.

use std::collections::VecDeque;

use roadplay_core::{Event, RoadplayError, RoadplayResult};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Producer half
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

/// Consumer half, owned by the reconciler
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
    closed: bool,
}

/// Create a connected feed
pub fn event_feed() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx, closed: false })
}

impl EventSender {
    /// Append one event
    pub fn send(&self, event: Event) -> RoadplayResult<()> {
        self.tx.send(event).map_err(|_| RoadplayError::FeedClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventReceiver {
    /// Move everything currently queued onto the back of `pending`
    pub fn drain_into(&mut self, pending: &mut VecDeque<Event>) -> usize {
        let mut moved = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    pending.push_back(event);
                    moved += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        moved
    }

    /// True once every sender is gone and the queue is empty
    pub fn is_exhausted(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadplay_core::SimTime;

    #[test]
    fn test_feed_is_fifo() {
        let (tx, mut rx) = event_feed();
        for i in 0..5 {
            tx.send(Event::accel(SimTime::from_millis(i), "A", i as f64)).unwrap();
        }

        let mut pending = VecDeque::new();
        assert_eq!(rx.drain_into(&mut pending), 5);
        let times: Vec<i64> = pending.iter().map(|e| e.time.as_millis()).collect();
        assert_eq!(times, vec![0, 1, 2, 3, 4]);
        assert!(!rx.is_exhausted());
    }

    #[test]
    fn test_feed_reports_exhaustion() {
        let (tx, mut rx) = event_feed();
        tx.send(Event::accel(SimTime::ZERO, "A", 1.0)).unwrap();
        drop(tx);

        let mut pending = VecDeque::new();
        assert_eq!(rx.drain_into(&mut pending), 1);
        assert!(rx.is_exhausted());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = event_feed();
        drop(rx);
        assert!(matches!(
            tx.send(Event::accel(SimTime::ZERO, "A", 1.0)),
            Err(RoadplayError::FeedClosed)
        ));
    }

    #[test]
    fn test_producer_thread_appends_while_draining() {
        let (tx, mut rx) = event_feed();
        let producer = std::thread::spawn(move || {
            for i in 0..1000 {
                tx.send(Event::accel(SimTime::from_millis(i), "A", 0.0)).unwrap();
            }
        });

        let mut pending = VecDeque::new();
        while !rx.is_exhausted() {
            rx.drain_into(&mut pending);
            std::thread::yield_now();
        }
        producer.join().unwrap();

        assert_eq!(pending.len(), 1000);
        assert!(pending
            .iter()
            .zip(pending.iter().skip(1))
            .all(|(a, b)| a.time < b.time));
    }
}

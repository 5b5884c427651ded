//! Load completion notifications.

use cartograph_common::ChunkCoord;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// Emitted once per finished load task, whatever its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkLoaded {
    /// Coordinate the task was submitted for
    pub coord: ChunkCoord,
}

/// Fan-out bus delivering completions to every subscriber.
///
/// Channels are unbounded so no notification is ever dropped. Ordering across
/// coordinates is whatever order tasks happen to finish in.
#[derive(Debug, Default)]
pub struct LoadEvents {
    subscribers: Mutex<Vec<Sender<ChunkLoaded>>>,
}

impl LoadEvents {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to all future notifications.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ChunkLoaded> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Delivers a notification, pruning subscribers that hung up.
    pub fn publish(&self, event: ChunkLoaded) {
        self.subscribers
            .lock()
            .retain(|sender| sender.send(event).is_ok());
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_receives() {
        let events = LoadEvents::new();
        let a = events.subscribe();
        let b = events.subscribe();

        let event = ChunkLoaded {
            coord: ChunkCoord::new(4, -2),
        };
        events.publish(event);

        assert_eq!(a.try_recv().ok(), Some(event));
        assert_eq!(b.try_recv().ok(), Some(event));
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let events = LoadEvents::new();
        let kept = events.subscribe();
        drop(events.subscribe());
        assert_eq!(events.subscriber_count(), 2);

        events.publish(ChunkLoaded {
            coord: ChunkCoord::new(0, 0),
        });
        assert_eq!(events.subscriber_count(), 1);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let events = LoadEvents::new();
        events.publish(ChunkLoaded {
            coord: ChunkCoord::new(0, 0),
        });
        assert_eq!(events.subscriber_count(), 0);
    }
}

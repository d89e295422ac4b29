//! Observable state cells
//!
//! A `StateCell` holds one value with a single writer. Readers either take
//! the latest value or subscribe for change notifications; a slow reader
//! only ever sees the newest value, never a backlog.

use tokio::sync::watch;

/// Single-value observable state backed by a `watch` channel
#[derive(Debug)]
pub struct StateCell<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Clone of the current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value and notify subscribers, even if nobody listens
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_latest() {
        let cell = StateCell::new(1);
        cell.set(2);
        cell.set(3);
        assert_eq!(cell.get(), 3);
    }

    #[tokio::test]
    async fn test_subscriber_sees_only_latest_value() {
        let cell = StateCell::new("a".to_string());
        let mut rx = cell.subscribe();

        cell.set("b".to_string());
        cell.set("c".to_string());

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "c");
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_default_uses_type_default() {
        let cell: StateCell<Vec<u8>> = StateCell::default();
        assert!(cell.get().is_empty());
    }
}

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Wire frame for every realtime push: the event name plus its payload.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Registry of live viewer connections. Each connection owns an unbounded
/// channel, so broadcasting never blocks a request handler; a closed peer
/// is pruned on the next send.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

#[derive(Default)]
struct NotifierInner {
    next_id: AtomicU64,
    senders: Mutex<HashMap<u64, mpsc::UnboundedSender<String>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, returning its id and the receiving half.
    pub fn connect(&self) -> (u64, mpsc::UnboundedReceiver<String>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut senders = self.inner.senders.lock();
        senders.insert(id, tx);
        info!(conn_id = id, subscribers = senders.len(), "viewer connected");
        (id, rx)
    }

    pub fn disconnect(&self, conn_id: u64) {
        let mut senders = self.inner.senders.lock();
        if senders.remove(&conn_id).is_some() {
            info!(conn_id, subscribers = senders.len(), "viewer disconnected");
        }
    }

    /// Push one event to every connected viewer. Encoding failures and closed
    /// channels are logged and swallowed; a status write must never fail
    /// because a viewer hung up.
    pub fn broadcast<T: Serialize>(&self, event: &str, data: &T) {
        let frame = match serde_json::to_string(&Envelope { event, data }) {
            Ok(f) => f,
            Err(e) => {
                warn!(event, error = %e, "failed to encode event");
                return;
            }
        };
        let mut senders = self.inner.senders.lock();
        senders.retain(|conn_id, tx| {
            let alive = tx.send(frame.clone()).is_ok();
            if !alive {
                debug!(conn_id = *conn_id, "dropping closed connection");
            }
            alive
        });
        debug!(event, subscribers = senders.len(), "event broadcast");
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.senders.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_subscriber_receives_exactly_one_copy() {
        let notifier = Notifier::new();
        let (_a, mut rx_a) = notifier.connect();
        let (_b, mut rx_b) = notifier.connect();

        notifier.broadcast("statusUpdated", &json!({ "id": 1 }));

        for rx in [&mut rx_a, &mut rx_b] {
            rx.try_recv().expect("one frame");
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn subscriber_joining_after_the_event_receives_nothing() {
        let notifier = Notifier::new();
        notifier.broadcast("statusUpdated", &json!({ "id": 1 }));

        let (_id, mut rx) = notifier.connect();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_stops_delivery() {
        let notifier = Notifier::new();
        let (id, mut rx) = notifier.connect();
        assert_eq!(notifier.subscriber_count(), 1);

        notifier.disconnect(id);
        assert_eq!(notifier.subscriber_count(), 0);

        notifier.broadcast("statusUpdated", &json!({ "id": 1 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_pruned_on_the_next_broadcast() {
        let notifier = Notifier::new();
        let (_gone, rx_gone) = notifier.connect();
        let (_kept, mut rx_kept) = notifier.connect();
        drop(rx_gone);

        notifier.broadcast("statusUpdated", &json!({ "id": 1 }));

        assert_eq!(notifier.subscriber_count(), 1);
        rx_kept.try_recv().expect("surviving subscriber still served");
    }

    #[test]
    fn frames_arrive_in_send_order() {
        let notifier = Notifier::new();
        let (_id, mut rx) = notifier.connect();

        notifier.broadcast("statusUpdated", &json!({ "seq": 1 }));
        notifier.broadcast("statusUpdated", &json!({ "seq": 2 }));

        let first: serde_json::Value =
            serde_json::from_str(&rx.try_recv().expect("first")).expect("json");
        let second: serde_json::Value =
            serde_json::from_str(&rx.try_recv().expect("second")).expect("json");
        assert_eq!(first["data"]["seq"], 1);
        assert_eq!(second["data"]["seq"], 2);
    }

    #[test]
    fn frames_carry_the_event_name_and_payload() {
        let notifier = Notifier::new();
        let (_id, mut rx) = notifier.connect();

        notifier.broadcast("statusUpdated", &json!({ "status": "busy" }));

        let frame: serde_json::Value =
            serde_json::from_str(&rx.try_recv().expect("frame")).expect("json");
        assert_eq!(frame["event"], "statusUpdated");
        assert_eq!(frame["data"]["status"], "busy");
    }
}

//! # Pub/Sub Matrix
//!
//! Channel → subscriber mapping. SUBSCRIBE registers a connection's write
//! sink under a channel, PUBLISH pushes a `message` frame to every sink and
//! reports how many subscribers were addressed. Delivery failures are the
//! subscriber's problem; its connection driver notices on its own socket.


use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::resp::ReplyWriter;

/// A shareable handle to a connection's write side.
pub type Sink = Arc<Mutex<dyn Write + Send>>;

struct Subscriber {
  client_id: u64,
  sink: Sink,
}

#[derive(Default)]
pub struct PubSub {
  channels: Mutex<HashMap<Vec<u8>, Vec<Subscriber>>>,
}

impl PubSub {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `client_id` on `channel`; re-subscribing is a no-op.
  /// Returns the client's resulting subscription count across channels.
  pub fn subscribe(&self, channel: &[u8], client_id: u64, sink: Sink) -> usize {
    let mut channels = self.channels.lock().unwrap();
    let subs = channels.entry(channel.to_vec()).or_default();
    if !subs.iter().any(|s| s.client_id == client_id) {
      subs.push(Subscriber { client_id, sink });
    }
    channels
      .values()
      .filter(|subs| subs.iter().any(|s| s.client_id == client_id))
      .count()
  }

  /// Returns the client's remaining subscription count.
  pub fn unsubscribe(&self, channel: &[u8], client_id: u64) -> usize {
    let mut channels = self.channels.lock().unwrap();
    if let Some(subs) = channels.get_mut(channel) {
      subs.retain(|s| s.client_id != client_id);
      if subs.is_empty() {
        channels.remove(channel);
      }
    }
    channels
      .values()
      .filter(|subs| subs.iter().any(|s| s.client_id == client_id))
      .count()
  }

  /// Drop a disconnected client from every channel.
  pub fn unsubscribe_all(&self, client_id: u64) {
    let mut channels = self.channels.lock().unwrap();
    channels.retain(|_, subs| {
      subs.retain(|s| s.client_id != client_id);
      !subs.is_empty()
    });
  }

  /// Push a `message` frame to every subscriber of `channel`. Returns the
  /// number of subscribers addressed, whether or not each write succeeded.
  pub fn publish(&self, channel: &[u8], payload: &[u8]) -> usize {
    let mut frame = Vec::with_capacity(32 + channel.len() + payload.len());
    {
      let mut w = ReplyWriter::new(&mut frame);
      // Frame shape is infallible against a Vec sink
      let _ = w.array_header(3);
      let _ = w.bulk(b"message");
      let _ = w.bulk(channel);
      let _ = w.bulk(payload);
    }

    let channels = self.channels.lock().unwrap();
    let subs = match channels.get(channel) {
      Some(subs) => subs,
      None => return 0,
    };
    for sub in subs {
      let mut sink = sub.sink.lock().unwrap();
      if let Err(e) = sink.write_all(&frame).and_then(|_| sink.flush()) {
        tracing::debug!(client = sub.client_id, error = %e, "pubsub delivery failed");
      }
    }
    subs.len()
  }

  pub fn channel_count(&self) -> usize {
    self.channels.lock().unwrap().len()
  }
}

#[cfg(test)]
mod __test__ {

  use crate::conn::Client;
  use crate::pubsub::Sink;
  use std::sync::{Arc, Mutex};

  fn sink() -> Sink {
    Arc::new(Mutex::new(Vec::<u8>::new()))
  }

  #[test]
  fn test_client_initial_state() {
    let client = Client::new(7, sink());
    assert_eq!(client.id, 7);
    assert_eq!(client.db, 0);
    assert!(!client.authenticated);
    assert!(!client.should_close);
    assert!(client.subscriptions.is_empty());
  }
}

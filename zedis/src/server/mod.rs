//! # Server
//!
//! Owns the shared state every connection sees (the store, the
//! collaborators, the monotonic client-id and request counters) plus the
//! accept loop that gives each connection its own thread.


use std::net::TcpListener;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::aof::AofWriter;
use crate::config::Config;
use crate::conn;
use crate::error::ZedisError;
use crate::pubsub::PubSub;
use crate::snapshot::SnapshotWriter;
use crate::store::Store;

pub struct ServerState {
  pub store: Store,
  pub config: Config,
  pub aof: AofWriter,
  pub pubsub: PubSub,
  pub snapshots: SnapshotWriter,
  client_ids: AtomicU64,
  requests: AtomicU64,
}

impl ServerState {
  pub fn new(config: Config) -> Result<Self, ZedisError> {
    let store = Store::new(
      config.databases,
      config.initial_capacity,
      config.max_memory,
      config.eviction_policy,
    );
    let aof = if config.appendonly {
      AofWriter::open(&config.appendfilename)?
    } else {
      AofWriter::disabled()
    };
    let snapshots = SnapshotWriter::new("zedis", config.snapshot_dir.clone());

    Ok(Self {
      store,
      config,
      aof,
      pubsub: PubSub::new(),
      snapshots,
      client_ids: AtomicU64::new(0),
      requests: AtomicU64::new(0),
    })
  }

  pub fn next_client_id(&self) -> u64 {
    self.client_ids.fetch_add(1, Ordering::Relaxed) + 1
  }

  pub fn count_request(&self) -> u64 {
    self.requests.fetch_add(1, Ordering::Relaxed) + 1
  }

  pub fn requests_served(&self) -> u64 {
    self.requests.load(Ordering::Relaxed)
  }
}

pub struct Server {
  state: Arc<ServerState>,
}

impl Server {
  pub fn new(config: Config) -> Result<Self, ZedisError> {
    Ok(Self {
      state: Arc::new(ServerState::new(config)?),
    })
  }

  pub fn state(&self) -> Arc<ServerState> {
    Arc::clone(&self.state)
  }

  /// Bind the configured address and serve until the process dies.
  pub fn run(&self) -> Result<(), ZedisError> {
    let addr = format!("{}:{}", self.state.config.bind, self.state.config.port);
    let listener = TcpListener::bind(&addr)?;
    tracing::info!(%addr, databases = self.state.config.databases, "zedis listening");
    self.serve(listener)
  }

  /// Accept loop over an already-bound listener; one thread per connection.
  pub fn serve(&self, listener: TcpListener) -> Result<(), ZedisError> {
    for incoming in listener.incoming() {
      match incoming {
        Ok(stream) => {
          let state = Arc::clone(&self.state);
          let id = state.next_client_id();
          let spawned = thread::Builder::new()
            .name(format!("zedis-conn-{}", id))
            .spawn(move || conn::serve_connection(state, stream, id));
          if let Err(e) = spawned {
            tracing::warn!(error = %e, "failed to spawn connection thread");
          }
        },
        Err(e) => tracing::warn!(error = %e, "accept failed"),
      }
    }
    Ok(())
  }
}

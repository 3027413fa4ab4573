//! Server-level handlers: sizing, flushing, snapshots.

use crate::conn::Client;
use crate::error::ZedisError;
use crate::resp::ReplyWriter;
use crate::server::ServerState;
use crate::store::Store;

pub fn dbsize(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let _ = args;
  let db = store.db(db);
  w.int(db.len() as i64)
}

pub fn flushdb(store: &Store, db: usize, args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let _ = args;
  store.db(db).clear();
  w.simple("OK")
}

pub fn flushall(
  state: &ServerState,
  _client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let _ = args;
  state.store.flush_all();
  w.simple("OK")
}

/// SAVE snapshots the client's selected database synchronously.
pub fn save(
  state: &ServerState,
  client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let _ = args;
  let db = state.store.db(client.db);
  state.snapshots.save(&db, client.db)?;
  w.simple("OK")
}

//! # Command Registry and Dispatch
//!
//! One table from command name to handler, argument bounds (inclusive,
//! counting the command name itself), and a persistence flag. Dispatch is
//! staged exactly once per command: empty check, uppercase into a fixed
//! stack buffer, auth gate, lookup, arity, invoke, translate errors to
//! their stable RESP lines, and finally replay the argument vector to the
//! persistence log when a flagged command succeeded.

mod __test__;

pub mod admin;
pub mod connection;
pub mod keys;
pub mod lists;
pub mod series;
pub mod strings;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::conn::Client;
use crate::error::ZedisError;
use crate::resp::ReplyWriter;
use crate::server::ServerState;
use crate::store::Store;

/// Commands longer than this cannot exist; the uppercase buffer is fixed.
pub const MAX_COMMAND_NAME: usize = 32;

type StoreProc = fn(&Store, usize, &[Vec<u8>], &mut ReplyWriter) -> Result<(), ZedisError>;
type ClientProc =
  fn(&ServerState, &mut Client, &[Vec<u8>], &mut ReplyWriter) -> Result<(), ZedisError>;
type StatelessProc = fn(&[Vec<u8>], &mut ReplyWriter) -> Result<(), ZedisError>;

#[derive(Clone, Copy)]
pub enum Handler {
  /// Runs against the client's selected database only.
  Store(StoreProc),
  /// Needs connection state or server-wide collaborators.
  Client(ClientProc),
  /// Touches neither.
  Stateless(StatelessProc),
}

#[derive(Clone, Copy)]
pub struct CommandSpec {
  pub handler: Handler,
  pub min_args: usize,
  pub max_args: Option<usize>,
  pub write_to_aof: bool,
}

const fn read(handler: Handler, min: usize, max: Option<usize>) -> CommandSpec {
  CommandSpec {
    handler,
    min_args: min,
    max_args: max,
    write_to_aof: false,
  }
}

const fn write(handler: Handler, min: usize, max: Option<usize>) -> CommandSpec {
  CommandSpec {
    handler,
    min_args: min,
    max_args: max,
    write_to_aof: true,
  }
}

pub static REGISTRY: Lazy<HashMap<&'static str, CommandSpec>> = Lazy::new(|| {
  use Handler::{Client, Stateless, Store};
  HashMap::from([
    // Connection
    ("PING", read(Stateless(connection::ping), 1, Some(2))),
    ("ECHO", read(Stateless(connection::echo), 2, Some(2))),
    ("HELP", read(Stateless(connection::help), 1, Some(1))),
    ("AUTH", read(Client(connection::auth), 2, Some(2))),
    ("SELECT", read(Client(connection::select), 2, Some(2))),
    ("QUIT", read(Client(connection::quit), 1, Some(1))),
    ("SUBSCRIBE", read(Client(connection::subscribe), 2, None)),
    ("UNSUBSCRIBE", read(Client(connection::unsubscribe), 1, None)),
    ("PUBLISH", read(Client(connection::publish), 3, Some(3))),
    // Strings
    ("SET", write(Store(strings::set), 3, Some(3))),
    ("GET", read(Store(strings::get), 2, Some(2))),
    ("DEL", write(Store(strings::del), 2, None)),
    ("INCR", write(Store(strings::incr), 2, Some(2))),
    ("DECR", write(Store(strings::decr), 2, Some(2))),
    ("INCRBY", write(Store(strings::incrby), 3, Some(3))),
    ("DECRBY", write(Store(strings::decrby), 3, Some(3))),
    ("INCRBYFLOAT", write(Store(strings::incrbyfloat), 3, Some(3))),
    ("APPEND", write(Store(strings::append), 3, Some(3))),
    ("STRLEN", read(Store(strings::strlen), 2, Some(2))),
    ("GETSET", write(Store(strings::getset), 3, Some(3))),
    ("MGET", read(Store(strings::mget), 2, None)),
    ("MSET", write(Store(strings::mset), 3, None)),
    ("SETEX", write(Store(strings::setex), 4, Some(4))),
    ("SETNX", write(Store(strings::setnx), 3, Some(3))),
    ("EXPIRE", write(Store(strings::expire), 3, Some(3))),
    ("EXPIREAT", write(Store(strings::expireat), 3, Some(3))),
    // Keys
    ("EXISTS", read(Store(keys::exists), 2, None)),
    ("KEYS", read(Store(keys::keys), 2, Some(2))),
    ("TTL", read(Store(keys::ttl), 2, Some(2))),
    ("PERSIST", write(Store(keys::persist), 2, Some(2))),
    ("TYPE", read(Store(keys::type_of), 2, Some(2))),
    ("RENAME", write(Store(keys::rename), 3, Some(3))),
    ("RANDOMKEY", read(Store(keys::randomkey), 1, Some(1))),
    // Lists
    ("LPUSH", write(Store(lists::lpush), 3, None)),
    ("RPUSH", write(Store(lists::rpush), 3, None)),
    ("LPOP", write(Store(lists::lpop), 2, Some(3))),
    ("RPOP", write(Store(lists::rpop), 2, Some(3))),
    ("LLEN", read(Store(lists::llen), 2, Some(2))),
    ("LINDEX", read(Store(lists::lindex), 3, Some(3))),
    ("LSET", write(Store(lists::lset), 4, Some(4))),
    ("LRANGE", read(Store(lists::lrange), 4, Some(4))),
    // Time series
    ("TS.CREATE", write(Store(series::create), 2, Some(13))),
    ("TS.ADD", write(Store(series::add), 4, Some(4))),
    ("TS.GET", read(Store(series::get), 2, Some(2))),
    ("TS.INCRBY", write(Store(series::incrby), 3, Some(5))),
    ("TS.DECRBY", write(Store(series::decrby), 3, Some(5))),
    ("TS.ALTER", write(Store(series::alter), 2, Some(11))),
    ("TS.RANGE", read(Store(series::range), 4, Some(9))),
    // Server
    ("DBSIZE", read(Store(admin::dbsize), 1, Some(1))),
    ("FLUSHDB", write(Store(admin::flushdb), 1, Some(1))),
    ("FLUSHALL", write(Client(admin::flushall), 1, Some(1))),
    ("SAVE", read(Client(admin::save), 1, Some(1))),
  ])
});

/// Execute one parsed command against the shared state. Non-fatal errors
/// are reported on the wire here and do not propagate; only failures that
/// must close the connection bubble up.
pub fn dispatch(
  state: &ServerState,
  client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  state.count_request();

  if args.is_empty() {
    return report(w, ZedisError::EmptyCommand);
  }

  let raw_name = &args[0];
  if raw_name.len() > MAX_COMMAND_NAME {
    return report(w, ZedisError::CommandTooLong);
  }
  let mut upper = [0u8; MAX_COMMAND_NAME];
  for (i, b) in raw_name.iter().enumerate() {
    upper[i] = b.to_ascii_uppercase();
  }
  let name = match std::str::from_utf8(&upper[..raw_name.len()]) {
    Ok(name) => name,
    Err(_) => return report(w, ZedisError::UnknownCommand),
  };

  if state.config.requirepass.is_some()
    && !client.authenticated
    && name != "AUTH"
    && name != "PING"
  {
    return report(w, ZedisError::NoAuth);
  }

  let spec = match REGISTRY.get(name) {
    Some(spec) => spec,
    None => return report(w, ZedisError::UnknownCommand),
  };

  if args.len() < spec.min_args || spec.max_args.is_some_and(|max| args.len() > max) {
    return report(w, ZedisError::WrongArgCount);
  }

  let result = match spec.handler {
    Handler::Store(proc) => proc(&state.store, client.db, args, w),
    Handler::Client(proc) => proc(state, client, args, w),
    Handler::Stateless(proc) => proc(args, w),
  };

  match result {
    Ok(()) => {
      if spec.write_to_aof && state.aof.enabled() {
        state.aof.append(args);
      }
      Ok(())
    },
    Err(e) if e.is_fatal() => Err(e),
    Err(e) => report(w, e),
  }
}

fn report(w: &mut ReplyWriter, e: ZedisError) -> Result<(), ZedisError> {
  w.error(e.reply())
}

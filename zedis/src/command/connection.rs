//! Connection-level handlers: liveness, authentication, database
//! selection, pub/sub membership and the command listing.

use crate::conn::Client;
use crate::error::ZedisError;
use crate::resp::ReplyWriter;
use crate::server::ServerState;
use crate::util::arg_i64;

const HELP_TEXT: &str = "zedis commands:\n\
  connection: PING ECHO AUTH SELECT QUIT HELP\n\
  strings: SET GET DEL INCR DECR INCRBY DECRBY INCRBYFLOAT APPEND STRLEN GETSET MGET MSET SETEX SETNX EXPIRE EXPIREAT\n\
  keys: EXISTS KEYS TTL PERSIST TYPE RENAME RANDOMKEY\n\
  lists: LPUSH RPUSH LPOP RPOP LLEN LINDEX LSET LRANGE\n\
  timeseries: TS.CREATE TS.ADD TS.GET TS.INCRBY TS.DECRBY TS.ALTER TS.RANGE\n\
  pubsub: SUBSCRIBE UNSUBSCRIBE PUBLISH\n\
  server: DBSIZE FLUSHDB FLUSHALL SAVE";

pub fn ping(args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  match args.get(1) {
    Some(payload) => w.bulk(payload),
    None => w.simple("PONG"),
  }
}

pub fn echo(args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  w.bulk(&args[1])
}

pub fn help(args: &[Vec<u8>], w: &mut ReplyWriter) -> Result<(), ZedisError> {
  let _ = args;
  w.bulk_str(HELP_TEXT)
}

pub fn auth(
  state: &ServerState,
  client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let expected = match &state.config.requirepass {
    Some(password) => password,
    None => return Err(ZedisError::NoPasswordSet),
  };
  if expected.as_bytes() != args[1].as_slice() {
    client.authenticated = false;
    return Err(ZedisError::InvalidPassword);
  }
  client.authenticated = true;
  w.simple("OK")
}

pub fn select(
  state: &ServerState,
  client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let index = arg_i64(&args[1]).map_err(|_| ZedisError::InvalidDbIndex)?;
  if index < 0 || index as usize >= state.store.database_count() {
    return Err(ZedisError::InvalidDbIndex);
  }
  client.db = index as usize;
  w.simple("OK")
}

pub fn quit(
  _state: &ServerState,
  client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let _ = args;
  client.should_close = true;
  w.simple("OK")
}

pub fn subscribe(
  state: &ServerState,
  client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  for channel in &args[1..] {
    let count = state
      .pubsub
      .subscribe(channel, client.id, client.sink.clone());
    if !client.subscriptions.iter().any(|c| c == channel) {
      client.subscriptions.push(channel.clone());
    }
    w.array_header(3)?;
    w.bulk(b"subscribe")?;
    w.bulk(channel)?;
    w.int(count as i64)?;
  }
  Ok(())
}

pub fn unsubscribe(
  state: &ServerState,
  client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let channels: Vec<Vec<u8>> = if args.len() > 1 {
    args[1..].to_vec()
  } else {
    client.subscriptions.clone()
  };
  for channel in &channels {
    let count = state.pubsub.unsubscribe(channel, client.id);
    client.subscriptions.retain(|c| c != channel);
    w.array_header(3)?;
    w.bulk(b"unsubscribe")?;
    w.bulk(channel)?;
    w.int(count as i64)?;
  }
  Ok(())
}

pub fn publish(
  state: &ServerState,
  _client: &mut Client,
  args: &[Vec<u8>],
  w: &mut ReplyWriter,
) -> Result<(), ZedisError> {
  let receivers = state.pubsub.publish(&args[1], &args[2]);
  w.int(receivers as i64)
}

//! # Connection Driver
//!
//! One OS thread per accepted connection: read one command, dispatch, write
//! the reply, repeat. The parser's recycled buffers and the reply buffer
//! are the per-command arena; both are cleared with capacity retained
//! after every command.
//!
//! The write side of the socket is shared behind a mutex so PUBLISH on
//! other connections can push `message` frames at a subscriber; a
//! subscribe-mode client simply stays parked in its blocking read.

mod __test__;

use std::io::{BufReader, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use crate::command::dispatch;
use crate::error::ZedisError;
use crate::pubsub::Sink;
use crate::resp::{ReplyWriter, RequestParser};
use crate::server::ServerState;

#[derive(Clone)]
pub struct Client {
  pub id: u64,
  pub db: usize,
  pub authenticated: bool,
  pub subscriptions: Vec<Vec<u8>>,
  pub should_close: bool,
  pub sink: Sink,
}

impl Client {
  pub fn new(id: u64, sink: Sink) -> Self {
    Self {
      id,
      db: 0,
      authenticated: false,
      subscriptions: Vec::new(),
      should_close: false,
      sink,
    }
  }
}

pub fn serve_connection(state: Arc<ServerState>, stream: TcpStream, client_id: u64) {
  let peer = stream.peer_addr().ok();
  let _ = stream.set_nodelay(true);

  let read_half = match stream.try_clone() {
    Ok(clone) => clone,
    Err(e) => {
      tracing::warn!(error = %e, "failed to clone connection stream");
      return;
    },
  };

  let sink: Arc<Mutex<TcpStream>> = Arc::new(Mutex::new(stream));
  let shared_sink: Sink = sink.clone();
  let mut client = Client::new(client_id, shared_sink);
  let mut reader = BufReader::new(read_half);
  let mut parser = RequestParser::new();
  let mut reply: Vec<u8> = Vec::with_capacity(4096);

  tracing::debug!(client = client.id, ?peer, "connection accepted");

  loop {
    match parser.read_command(&mut reader) {
      Ok(true) => {
        reply.clear();
        let outcome = {
          let mut w = ReplyWriter::new(&mut reply);
          dispatch(&state, &mut client, parser.args(), &mut w)
        };
        {
          let mut sock = sink.lock().unwrap();
          if sock.write_all(&reply).and_then(|_| sock.flush()).is_err() {
            break;
          }
        }
        if outcome.is_err() || client.should_close {
          break;
        }
      },
      Ok(false) => break,
      Err(e) => {
        if matches!(e, ZedisError::Protocol) {
          let mut sock = sink.lock().unwrap();
          let _ = sock.write_all(b"-ERR protocol error\r\n");
          let _ = sock.flush();
        }
        break;
      },
    }
  }

  state.pubsub.unsubscribe_all(client.id);
  tracing::debug!(client = client.id, "connection closed");
}

//! # Persistence Log Writer
//!
//! The command-replay collaborator: every successful command whose registry
//! entry is flagged for persistence is re-serialised as a RESP array and
//! handed to a dedicated writer thread over a bounded channel, so the
//! execution path never blocks on disk.

mod __test__;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::ZedisError;
use crate::resp::encode_command;

const CHANNEL_CAPACITY: usize = 1024;
const FLUSH_EVERY: u64 = 64;
const FLUSH_INTERVAL_MS: u128 = 1000;

/// Messages sent from command execution to the log writer thread.
#[derive(Debug)]
pub enum Message {
  Append(Vec<u8>),
  Flush,
  Exit,
}

#[derive(Debug, Clone)]
pub struct AofWriter {
  sender: Option<Sender<Message>>,
}

impl AofWriter {
  /// A writer that drops everything; the `enabled` flag of the contract.
  pub fn disabled() -> Self {
    Self { sender: None }
  }

  /// Open (or create) the log and spawn the owning writer thread.
  pub fn open(path: &str) -> Result<Self, ZedisError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let (sender, receiver) = bounded::<Message>(CHANNEL_CAPACITY);
    std::thread::spawn(move || Self::writer_loop(receiver, file));
    tracing::info!(path, "append-only log enabled");
    Ok(Self {
      sender: Some(sender),
    })
  }

  pub fn enabled(&self) -> bool {
    self.sender.is_some()
  }

  /// Serialise the original argument vector and queue it for the log.
  pub fn append(&self, args: &[Vec<u8>]) {
    if let Some(sender) = &self.sender {
      let mut buf = Vec::with_capacity(64);
      encode_command(args, &mut buf);
      if sender.send(Message::Append(buf)).is_err() {
        tracing::warn!("append-only log writer is gone, dropping record");
      }
    }
  }

  pub fn flush(&self) {
    if let Some(sender) = &self.sender {
      let _ = sender.send(Message::Flush);
    }
  }

  pub fn shutdown(&self) {
    if let Some(sender) = &self.sender {
      let _ = sender.send(Message::Exit);
    }
  }

  fn writer_loop(receiver: Receiver<Message>, file: File) {
    let mut out = BufWriter::new(file);
    let mut pending: u64 = 0;
    let mut last_flush = Instant::now();

    while let Ok(msg) = receiver.recv() {
      match msg {
        Message::Append(bytes) => {
          if let Err(e) = out.write_all(&bytes) {
            tracing::error!(error = %e, "append-only log write failed");
            continue;
          }
          pending += 1;
          if pending >= FLUSH_EVERY
            || last_flush.elapsed().as_millis() >= FLUSH_INTERVAL_MS
          {
            let _ = out.flush();
            pending = 0;
            last_flush = Instant::now();
          }
        },
        Message::Flush => {
          let _ = out.flush();
          pending = 0;
          last_flush = Instant::now();
        },
        Message::Exit => {
          let _ = out.flush();
          break;
        },
      }
    }
  }
}

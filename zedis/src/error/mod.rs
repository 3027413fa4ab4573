//! # Error Module
//!
//! One error type for the whole engine. Every recoverable failure maps to a
//! stable RESP error line via [`ZedisError::reply`]; I/O and protocol
//! failures are fatal for the connection that produced them.


use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZedisError {
  #[error("operation against a key holding the wrong kind of value")]
  WrongType,
  #[error("value is not an integer or out of range")]
  NotAnInteger,
  #[error("value is not a valid float")]
  NotAFloat,
  #[error("increment or decrement would overflow")]
  Overflow,
  #[error("no such key")]
  NoSuchKey,
  #[error("index out of range")]
  IndexOutOfRange,
  #[error("wrong number of arguments")]
  WrongArgCount,
  #[error("unknown command")]
  UnknownCommand,
  #[error("empty command")]
  EmptyCommand,
  #[error("command name too long")]
  CommandTooLong,
  #[error("authentication required")]
  NoAuth,
  #[error("client sent AUTH, but no password is set")]
  NoPasswordSet,
  #[error("invalid password")]
  InvalidPassword,
  #[error("invalid database index")]
  InvalidDbIndex,
  #[error("duplicate timestamp")]
  DuplicateTimestamp,
  #[error("key already exists")]
  KeyExists,
  #[error("out of memory")]
  OutOfMemory,
  #[error("sample is older than the series tail")]
  SampleTooOld,
  #[error("invalid argument")]
  InvalidArgument,
  #[error("corrupted chunk data")]
  CorruptChunk,
  #[error("protocol error")]
  Protocol,
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ZedisError {
  /// The stable RESP error line for this failure, without the leading `-`
  /// or trailing CRLF. Fatal kinds return the protocol error line; the
  /// connection driver closes after reporting them.
  pub fn reply(&self) -> &'static str {
    match self {
      ZedisError::WrongType => {
        "WRONGTYPE Operation against a key holding the wrong kind of value"
      },
      ZedisError::NotAnInteger => "ERR value is not an integer or out of range",
      ZedisError::NotAFloat => "ERR value is not a valid float",
      ZedisError::Overflow => "ERR increment or decrement would overflow",
      ZedisError::NoSuchKey => "ERR no such key",
      ZedisError::IndexOutOfRange => "ERR index out of range",
      ZedisError::WrongArgCount => "ERR wrong number of arguments",
      ZedisError::UnknownCommand => "ERR unknown command",
      ZedisError::EmptyCommand => "ERR empty command",
      ZedisError::NoAuth => "NOAUTH Authentication required",
      ZedisError::NoPasswordSet => "ERR Client sent AUTH, but no password is set",
      ZedisError::InvalidPassword => "ERR invalid password",
      ZedisError::InvalidDbIndex => "ERR invalid database index (must be 0-15)",
      ZedisError::DuplicateTimestamp => "ERR duplicate timestamp",
      ZedisError::KeyExists => "ERR key already exists",
      ZedisError::Protocol | ZedisError::Io(_) => "ERR protocol error",
      ZedisError::CommandTooLong
      | ZedisError::OutOfMemory
      | ZedisError::SampleTooOld
      | ZedisError::InvalidArgument
      | ZedisError::CorruptChunk => "ERR while processing command",
    }
  }

  /// Whether the connection must be closed after reporting this error.
  pub fn is_fatal(&self) -> bool {
    matches!(self, ZedisError::Protocol | ZedisError::Io(_))
  }
}

#[cfg(test)]
mod __test__ {

  use crate::command::dispatch;
  use crate::config::Config;
  use crate::conn::Client;
  use crate::resp::ReplyWriter;
  use crate::server::ServerState;
  use std::sync::{Arc, Mutex};

  fn state() -> ServerState {
    ServerState::new(Config::default()).unwrap()
  }

  fn state_with(config: Config) -> ServerState {
    ServerState::new(config).unwrap()
  }

  fn client() -> Client {
    Client::new(1, Arc::new(Mutex::new(Vec::<u8>::new())))
  }

  fn run(state: &ServerState, client: &mut Client, parts: &[&[u8]]) -> Vec<u8> {
    let args: Vec<Vec<u8>> = parts.iter().map(|p| p.to_vec()).collect();
    let mut reply = Vec::new();
    {
      let mut w = ReplyWriter::new(&mut reply);
      dispatch(state, client, &args, &mut w).unwrap();
    }
    reply
  }

  #[test]
  fn test_set_get_roundtrip() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"SET", b"mykey", b"hello"]), b"+OK\r\n");
    assert_eq!(run(&state, &mut client, &[b"GET", b"mykey"]), b"$5\r\nhello\r\n");
  }

  #[test]
  fn test_incr_replies_bulk_string() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"SET", b"cnt", b"41"]), b"+OK\r\n");
    assert_eq!(run(&state, &mut client, &[b"INCR", b"cnt"]), b"$2\r\n42\r\n");
    assert_eq!(run(&state, &mut client, &[b"GET", b"cnt"]), b"$2\r\n42\r\n");
  }

  #[test]
  fn test_get_missing_and_del_missing() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"GET", b"miss"]), b"$-1\r\n");
    assert_eq!(run(&state, &mut client, &[b"DEL", b"miss"]), b":0\r\n");
  }

  #[test]
  fn test_del_counts_and_removes() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"SET", b"a", b"1"]);
    run(&state, &mut client, &[b"SET", b"b", b"2"]);
    assert_eq!(run(&state, &mut client, &[b"DEL", b"a", b"b", b"c"]), b":2\r\n");
    assert_eq!(run(&state, &mut client, &[b"EXISTS", b"a"]), b":0\r\n");
  }

  #[test]
  fn test_command_name_case_insensitive() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"set", b"k", b"v"]), b"+OK\r\n");
    assert_eq!(run(&state, &mut client, &[b"gEt", b"k"]), b"$1\r\nv\r\n");
  }

  #[test]
  fn test_unknown_and_malformed_commands() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"NOSUCH"]),
      b"-ERR unknown command\r\n"
    );
    assert_eq!(run(&state, &mut client, &[]), b"-ERR empty command\r\n");
    let long = vec![b'X'; 64];
    assert_eq!(
      run(&state, &mut client, &[long.as_slice()]),
      b"-ERR while processing command\r\n"
    );
  }

  #[test]
  fn test_arity_validation() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"SET", b"k"]),
      b"-ERR wrong number of arguments\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"GET", b"k", b"extra"]),
      b"-ERR wrong number of arguments\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"MSET", b"k", b"v", b"dangling"]),
      b"-ERR wrong number of arguments\r\n"
    );
  }

  #[test]
  fn test_auth_gate() {
    let state = state_with(Config {
      requirepass: Some("pwd".to_string()),
      ..Config::default()
    });
    let mut client = client();

    // PING passes unauthenticated, data commands do not
    assert_eq!(run(&state, &mut client, &[b"PING"]), b"+PONG\r\n");
    assert_eq!(
      run(&state, &mut client, &[b"GET", b"k"]),
      b"-NOAUTH Authentication required\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"AUTH", b"wrong"]),
      b"-ERR invalid password\r\n"
    );
    assert!(!client.authenticated);

    assert_eq!(run(&state, &mut client, &[b"AUTH", b"pwd"]), b"+OK\r\n");
    assert!(client.authenticated);
    assert_eq!(run(&state, &mut client, &[b"GET", b"k"]), b"$-1\r\n");
  }

  #[test]
  fn test_auth_without_password_configured() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"AUTH", b"whatever"]),
      b"-ERR Client sent AUTH, but no password is set\r\n"
    );
  }

  #[test]
  fn test_select_bounds_and_isolation() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"SELECT", b"16"]),
      b"-ERR invalid database index (must be 0-15)\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"SELECT", b"-1"]),
      b"-ERR invalid database index (must be 0-15)\r\n"
    );

    run(&state, &mut client, &[b"SET", b"k", b"zero"]);
    assert_eq!(run(&state, &mut client, &[b"SELECT", b"1"]), b"+OK\r\n");
    assert_eq!(run(&state, &mut client, &[b"GET", b"k"]), b"$-1\r\n");
    assert_eq!(run(&state, &mut client, &[b"SELECT", b"0"]), b"+OK\r\n");
    assert_eq!(run(&state, &mut client, &[b"GET", b"k"]), b"$4\r\nzero\r\n");
  }

  #[test]
  fn test_incr_error_paths() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"SET", b"s", b"notanumber"]);
    assert_eq!(
      run(&state, &mut client, &[b"INCR", b"s"]),
      b"-ERR value is not an integer or out of range\r\n"
    );

    run(&state, &mut client, &[b"SET", b"big", b"9223372036854775807"]);
    assert_eq!(
      run(&state, &mut client, &[b"INCR", b"big"]),
      b"-ERR increment or decrement would overflow\r\n"
    );

    // Missing keys start from zero
    assert_eq!(run(&state, &mut client, &[b"INCR", b"fresh"]), b"$1\r\n1\r\n");
    assert_eq!(run(&state, &mut client, &[b"DECR", b"fresh2"]), b"$2\r\n-1\r\n");
    assert_eq!(
      run(&state, &mut client, &[b"INCRBY", b"fresh", b"9"]),
      b"$2\r\n10\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"DECRBY", b"fresh", b"3"]),
      b"$1\r\n7\r\n"
    );
  }

  #[test]
  fn test_incrbyfloat() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"SET", b"f", b"10.5"]);
    assert_eq!(
      run(&state, &mut client, &[b"INCRBYFLOAT", b"f", b"0.25"]),
      b"$5\r\n10.75\r\n"
    );
    // Integral results print without a fraction
    assert_eq!(
      run(&state, &mut client, &[b"INCRBYFLOAT", b"f", b"0.25"]),
      b"$2\r\n11\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"INCRBYFLOAT", b"f", b"abc"]),
      b"-ERR value is not a valid float\r\n"
    );
  }

  #[test]
  fn test_append_and_strlen() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"APPEND", b"a", b"Hello"]), b":5\r\n");
    assert_eq!(
      run(&state, &mut client, &[b"APPEND", b"a", b" World"]),
      b":11\r\n"
    );
    assert_eq!(run(&state, &mut client, &[b"STRLEN", b"a"]), b":11\r\n");
    assert_eq!(run(&state, &mut client, &[b"STRLEN", b"nope"]), b":0\r\n");
    assert_eq!(
      run(&state, &mut client, &[b"GET", b"a"]),
      b"$11\r\nHello World\r\n"
    );
    // Integer values are converted through scratch for length purposes
    run(&state, &mut client, &[b"SET", b"n", b"1234"]);
    assert_eq!(run(&state, &mut client, &[b"STRLEN", b"n"]), b":4\r\n");
  }

  #[test]
  fn test_getset_mset_mget() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"GETSET", b"g", b"new"]),
      b"$-1\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"GETSET", b"g", b"newer"]),
      b"$3\r\nnew\r\n"
    );

    assert_eq!(
      run(&state, &mut client, &[b"MSET", b"m1", b"a", b"m2", b"b"]),
      b"+OK\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"MGET", b"m1", b"missing", b"m2"]),
      b"*3\r\n$1\r\na\r\n$-1\r\n$1\r\nb\r\n"
    );
  }

  #[test]
  fn test_setnx() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"SETNX", b"u", b"one"]), b":1\r\n");
    assert_eq!(run(&state, &mut client, &[b"SETNX", b"u", b"two"]), b":0\r\n");
    assert_eq!(run(&state, &mut client, &[b"GET", b"u"]), b"$3\r\none\r\n");
  }

  #[test]
  fn test_expire_ttl_persist() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"SET", b"k", b"v"]);

    // TTL reports -1 for persistent, -2 for missing
    assert_eq!(run(&state, &mut client, &[b"TTL", b"k"]), b":-1\r\n");
    assert_eq!(run(&state, &mut client, &[b"TTL", b"nope"]), b":-2\r\n");

    assert_eq!(run(&state, &mut client, &[b"EXPIRE", b"k", b"100"]), b":1\r\n");
    // TTL replies the stored absolute deadline, not remaining seconds
    let reply = run(&state, &mut client, &[b"TTL", b"k"]);
    let text = String::from_utf8(reply).unwrap();
    let at: i64 = text
      .trim_start_matches(':')
      .trim_end()
      .parse()
      .unwrap();
    assert!(at > crate::util::now_ms() + 90_000);

    assert_eq!(run(&state, &mut client, &[b"PERSIST", b"k"]), b":1\r\n");
    assert_eq!(run(&state, &mut client, &[b"TTL", b"k"]), b":-1\r\n");
    assert_eq!(run(&state, &mut client, &[b"PERSIST", b"k"]), b":0\r\n");

    // Non-positive TTL deletes immediately and reports the deletion
    assert_eq!(run(&state, &mut client, &[b"EXPIRE", b"k", b"0"]), b":1\r\n");
    assert_eq!(run(&state, &mut client, &[b"EXISTS", b"k"]), b":0\r\n");
    assert_eq!(run(&state, &mut client, &[b"EXPIRE", b"k", b"0"]), b":0\r\n");
    // EXPIRE on a missing key reports 0
    assert_eq!(run(&state, &mut client, &[b"EXPIRE", b"k", b"10"]), b":0\r\n");
  }

  #[test]
  fn test_setex() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"SETEX", b"tmp", b"100", b"v"]),
      b"+OK\r\n"
    );
    assert_eq!(run(&state, &mut client, &[b"GET", b"tmp"]), b"$1\r\nv\r\n");
    // An expiry was installed
    let ttl = run(&state, &mut client, &[b"TTL", b"tmp"]);
    assert!(ttl.starts_with(b":1"));
    assert_eq!(
      run(&state, &mut client, &[b"SETEX", b"tmp", b"0", b"v"]),
      b"-ERR value is not an integer or out of range\r\n"
    );
  }

  #[test]
  fn test_expireat_past_deletes() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"SET", b"k", b"v"]);
    assert_eq!(run(&state, &mut client, &[b"EXPIREAT", b"k", b"1"]), b":1\r\n");
    assert_eq!(run(&state, &mut client, &[b"GET", b"k"]), b"$-1\r\n");
  }

  #[test]
  fn test_type_and_rename() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"SET", b"s", b"v"]);
    run(&state, &mut client, &[b"RPUSH", b"l", b"x"]);
    assert_eq!(run(&state, &mut client, &[b"TYPE", b"s"]), b"+string\r\n");
    assert_eq!(run(&state, &mut client, &[b"TYPE", b"l"]), b"+list\r\n");
    assert_eq!(run(&state, &mut client, &[b"TYPE", b"none"]), b"+none\r\n");

    assert_eq!(
      run(&state, &mut client, &[b"RENAME", b"missing", b"dst"]),
      b"-ERR no such key\r\n"
    );
    assert_eq!(run(&state, &mut client, &[b"RENAME", b"s", b"s2"]), b"+OK\r\n");
    assert_eq!(run(&state, &mut client, &[b"GET", b"s"]), b"$-1\r\n");
    assert_eq!(run(&state, &mut client, &[b"GET", b"s2"]), b"$1\r\nv\r\n");
  }

  #[test]
  fn test_keys_glob() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"SET", b"user:1", b"a"]);
    run(&state, &mut client, &[b"SET", b"user:2", b"b"]);
    run(&state, &mut client, &[b"SET", b"other", b"c"]);

    let reply = run(&state, &mut client, &[b"KEYS", b"user:?"]);
    let text = String::from_utf8(reply).unwrap();
    assert!(text.starts_with("*2\r\n"));
    assert!(text.contains("user:1"));
    assert!(text.contains("user:2"));
    assert!(!text.contains("other"));

    let all = run(&state, &mut client, &[b"KEYS", b"*"]);
    assert!(String::from_utf8(all).unwrap().starts_with("*3\r\n"));
  }

  #[test]
  fn test_randomkey() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"RANDOMKEY"]), b"$-1\r\n");
    run(&state, &mut client, &[b"SET", b"only", b"v"]);
    assert_eq!(
      run(&state, &mut client, &[b"RANDOMKEY"]),
      b"$4\r\nonly\r\n"
    );
  }

  #[test]
  fn test_list_flow() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"RPUSH", b"L", b"a", b"b", b"c"]),
      b":3\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"LRANGE", b"L", b"0", b"-1"]),
      b"*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"LINDEX", b"L", b"-1"]),
      b"$1\r\nc\r\n"
    );
    assert_eq!(run(&state, &mut client, &[b"LLEN", b"L"]), b":3\r\n");
    assert_eq!(run(&state, &mut client, &[b"LPUSH", b"L", b"z"]), b":4\r\n");
    assert_eq!(run(&state, &mut client, &[b"LPOP", b"L"]), b"$1\r\nz\r\n");
    assert_eq!(run(&state, &mut client, &[b"RPOP", b"L"]), b"$1\r\nc\r\n");

    assert_eq!(run(&state, &mut client, &[b"LSET", b"L", b"0", b"A"]), b"+OK\r\n");
    assert_eq!(
      run(&state, &mut client, &[b"LSET", b"L", b"9", b"x"]),
      b"-ERR index out of range\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"LSET", b"noexist", b"0", b"x"]),
      b"-ERR no such key\r\n"
    );

    // LRANGE clamps rather than errors
    assert_eq!(
      run(&state, &mut client, &[b"LRANGE", b"L", b"-100", b"100"]),
      b"*2\r\n$1\r\nA\r\n$1\r\nb\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"LRANGE", b"L", b"5", b"9"]),
      b"*0\r\n"
    );
  }

  #[test]
  fn test_list_pop_counts() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"RPUSH", b"L", b"a", b"b", b"c"]);
    assert_eq!(
      run(&state, &mut client, &[b"LPOP", b"L", b"2"]),
      b"*2\r\n$1\r\na\r\n$1\r\nb\r\n"
    );
    // Asking for more than remain returns what exists
    assert_eq!(
      run(&state, &mut client, &[b"RPOP", b"L", b"5"]),
      b"*1\r\n$1\r\nc\r\n"
    );
    // Drained lists disappear
    assert_eq!(run(&state, &mut client, &[b"EXISTS", b"L"]), b":0\r\n");
    assert_eq!(run(&state, &mut client, &[b"LPOP", b"L"]), b"$-1\r\n");
    assert_eq!(run(&state, &mut client, &[b"LPOP", b"L", b"2"]), b"*-1\r\n");
  }

  #[test]
  fn test_wrongtype_errors() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"RPUSH", b"L", b"a"]);
    assert_eq!(
      run(&state, &mut client, &[b"GET", b"L"]),
      b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"INCR", b"L"]),
      b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n"
    );

    run(&state, &mut client, &[b"SET", b"s", b"v"]);
    assert_eq!(
      run(&state, &mut client, &[b"RPUSH", b"s", b"x"]),
      b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"LLEN", b"s"]),
      b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n"
    );
  }

  #[test]
  fn test_timeseries_flow() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"TS.CREATE", b"ts", b"RETENTION", b"0"]),
      b"+OK\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"TS.CREATE", b"ts"]),
      b"-ERR key already exists\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"TS.ADD", b"ts", b"1000", b"10.0"]),
      b":1000\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"TS.ADD", b"ts", b"2000", b"20.0"]),
      b":2000\r\n"
    );
    // The verbatim wire shape: values print with the trailing .0 trimmed
    assert_eq!(
      run(&state, &mut client, &[b"TS.RANGE", b"ts", b"-", b"+"]),
      b"*2\r\n*2\r\n:1000\r\n$2\r\n10\r\n*2\r\n:2000\r\n$2\r\n20\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"TS.GET", b"ts"]),
      b"*2\r\n:2000\r\n$2\r\n20\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"TS.ADD", b"ts", b"2000", b"30.0"]),
      b"-ERR duplicate timestamp\r\n"
    );
  }

  #[test]
  fn test_timeseries_incr_decr() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"TS.ADD", b"c", b"1000", b"5"]);
    assert_eq!(
      run(
        &state,
        &mut client,
        &[b"TS.INCRBY", b"c", b"2.5", b"TIMESTAMP", b"2000"]
      ),
      b":2000\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"TS.GET", b"c"]),
      b"*2\r\n:2000\r\n$3\r\n7.5\r\n"
    );
    assert_eq!(
      run(
        &state,
        &mut client,
        &[b"TS.DECRBY", b"c", b"7.5", b"TIMESTAMP", b"3000"]
      ),
      b":3000\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"TS.GET", b"c"]),
      b"*2\r\n:3000\r\n$1\r\n0\r\n"
    );
  }

  #[test]
  fn test_timeseries_range_options() {
    let state = state();
    let mut client = client();
    for i in 0..10i64 {
      let ts = (i * 500).to_string();
      let v = (i as f64).to_string();
      run(&state, &mut client, &[b"TS.ADD", b"m", ts.as_bytes(), v.as_bytes()]);
    }

    // COUNT is a hard cutoff
    let reply = run(
      &state,
      &mut client,
      &[b"TS.RANGE", b"m", b"-", b"+", b"COUNT", b"3"],
    );
    assert!(String::from_utf8(reply).unwrap().starts_with("*3\r\n"));

    // AVG over 1000ms buckets: pairs (0,1), (2,3), ...
    assert_eq!(
      run(
        &state,
        &mut client,
        &[b"TS.RANGE", b"m", b"0", b"1999", b"AGGREGATION", b"AVG", b"1000"]
      ),
      b"*2\r\n*2\r\n:0\r\n$3\r\n0.5\r\n*2\r\n:1000\r\n$3\r\n2.5\r\n"
    );

    assert_eq!(
      run(&state, &mut client, &[b"TS.RANGE", b"m", b"-", b"+", b"BOGUS"]),
      b"-ERR while processing command\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"TS.RANGE", b"nosuch", b"-", b"+"]),
      b"-ERR no such key\r\n"
    );
  }

  #[test]
  fn test_timeseries_alter() {
    let state = state();
    let mut client = client();
    run(&state, &mut client, &[b"TS.CREATE", b"a"]);
    assert_eq!(
      run(
        &state,
        &mut client,
        &[b"TS.ALTER", b"a", b"DUPLICATE_POLICY", b"SUM", b"RETENTION", b"5000"]
      ),
      b"+OK\r\n"
    );
    run(&state, &mut client, &[b"TS.ADD", b"a", b"100", b"1.5"]);
    run(&state, &mut client, &[b"TS.ADD", b"a", b"100", b"2.5"]);
    assert_eq!(
      run(&state, &mut client, &[b"TS.GET", b"a"]),
      b"*2\r\n:100\r\n$1\r\n4\r\n"
    );
    // Encoding cannot be altered after creation
    assert_eq!(
      run(
        &state,
        &mut client,
        &[b"TS.ALTER", b"a", b"ENCODING", b"UNCOMPRESSED"]
      ),
      b"-ERR while processing command\r\n"
    );
  }

  #[test]
  fn test_server_commands() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"DBSIZE"]), b":0\r\n");
    run(&state, &mut client, &[b"SET", b"a", b"1"]);
    run(&state, &mut client, &[b"SET", b"b", b"2"]);
    assert_eq!(run(&state, &mut client, &[b"DBSIZE"]), b":2\r\n");
    assert_eq!(run(&state, &mut client, &[b"FLUSHDB"]), b"+OK\r\n");
    assert_eq!(run(&state, &mut client, &[b"DBSIZE"]), b":0\r\n");

    run(&state, &mut client, &[b"SET", b"x", b"1"]);
    run(&state, &mut client, &[b"SELECT", b"2"]);
    run(&state, &mut client, &[b"SET", b"y", b"2"]);
    assert_eq!(run(&state, &mut client, &[b"FLUSHALL"]), b"+OK\r\n");
    assert_eq!(run(&state, &mut client, &[b"DBSIZE"]), b":0\r\n");
    run(&state, &mut client, &[b"SELECT", b"0"]);
    assert_eq!(run(&state, &mut client, &[b"DBSIZE"]), b":0\r\n");
  }

  #[test]
  fn test_save_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(Config {
      snapshot_dir: dir.path().to_str().unwrap().to_string(),
      ..Config::default()
    });
    let mut client = client();
    run(&state, &mut client, &[b"SET", b"k", b"v"]);
    assert_eq!(run(&state, &mut client, &[b"SAVE"]), b"+OK\r\n");

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
  }

  #[test]
  fn test_ping_echo_quit_help() {
    let state = state();
    let mut client = client();
    assert_eq!(run(&state, &mut client, &[b"PING"]), b"+PONG\r\n");
    assert_eq!(
      run(&state, &mut client, &[b"PING", b"hello"]),
      b"$5\r\nhello\r\n"
    );
    assert_eq!(run(&state, &mut client, &[b"ECHO", b"hey"]), b"$3\r\nhey\r\n");

    let help = run(&state, &mut client, &[b"HELP"]);
    assert!(String::from_utf8(help).unwrap().contains("TS.RANGE"));

    assert!(!client.should_close);
    assert_eq!(run(&state, &mut client, &[b"QUIT"]), b"+OK\r\n");
    assert!(client.should_close);
  }

  #[test]
  fn test_pubsub_commands() {
    let state = state();
    let mut client = client();
    assert_eq!(
      run(&state, &mut client, &[b"PUBLISH", b"news", b"x"]),
      b":0\r\n"
    );
    assert_eq!(
      run(&state, &mut client, &[b"SUBSCRIBE", b"news"]),
      b"*3\r\n$9\r\nsubscribe\r\n$4\r\nnews\r\n:1\r\n"
    );
    assert_eq!(client.subscriptions.len(), 1);
    assert_eq!(
      run(&state, &mut client, &[b"UNSUBSCRIBE", b"news"]),
      b"*3\r\n$11\r\nunsubscribe\r\n$4\r\nnews\r\n:0\r\n"
    );
    assert!(client.subscriptions.is_empty());
  }

  #[test]
  fn test_aof_receives_flagged_commands() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cmds.aof");
    let state = state_with(Config {
      appendonly: true,
      appendfilename: path.to_str().unwrap().to_string(),
      ..Config::default()
    });
    let mut client = client();

    run(&state, &mut client, &[b"SET", b"k", b"v"]);
    run(&state, &mut client, &[b"GET", b"k"]); // read: not logged
    run(&state, &mut client, &[b"SET", b"s", b"text"]);
    run(&state, &mut client, &[b"INCR", b"s"]); // failed: not logged
    run(&state, &mut client, &[b"INCR", b"n"]);
    state.aof.flush();
    std::thread::sleep(std::time::Duration::from_millis(100));

    let contents = std::fs::read(&path).unwrap();
    let text = String::from_utf8_lossy(&contents);
    assert_eq!(text.matches("SET").count(), 2);
    // Only the successful INCR is replayed
    assert_eq!(text.matches("INCR").count(), 1);
    assert!(text.contains("$1\r\nn\r\n"));
    assert!(!text.contains("GET"));
  }
}

#[cfg(test)]
mod __test__ {

  use crate::list::{ListCell, ListValue};
  use crate::lru::EvictionPolicy;
  use crate::series::{SeriesConfig, TimeSeries};
  use crate::snapshot::{read_snapshot, restore_series, SnapshotValue, SnapshotWriter};
  use crate::store::Store;
  use crate::value::Value;

  fn store_with_data() -> Store {
    let store = Store::new(1, 16, 0, EvictionPolicy::NoEviction);
    {
      let mut db = store.db(0);
      let pool = db.pool();

      db.put(b"greeting", Value::encode_string(&pool, b"hello")).unwrap();
      db.put(b"counter", Value::encode_string(&pool, b"42")).unwrap();

      let mut list = ListValue::new();
      list.push_back(ListCell::encode(&pool, b"a"));
      list.push_back(ListCell::encode(&pool, b"17"));
      db.put(b"mylist", Value::List(list)).unwrap();

      let mut series = TimeSeries::new(SeriesConfig::default());
      series.add_sample(1000, 10.0).unwrap();
      series.add_sample(2000, 20.5).unwrap();
      db.put(b"myts", Value::Series(series)).unwrap();

      db.set_expire(b"greeting", 99_999_999_999);
    }
    store
  }

  #[test]
  fn test_capture_contents() {
    let store = store_with_data();
    let db = store.db(0);
    let writer = SnapshotWriter::new("zedis", ".");
    let snapshot = writer.capture(&db, 0).unwrap();

    assert_eq!(snapshot.db_index, 0);
    assert_eq!(snapshot.entries.len(), 4);
    assert_eq!(snapshot.pid, std::process::id());

    let greeting = snapshot
      .entries
      .iter()
      .find(|e| e.key == b"greeting")
      .unwrap();
    assert_eq!(greeting.expire_at_ms, Some(99_999_999_999));
    match &greeting.value {
      SnapshotValue::Str(b) => assert_eq!(b, b"hello"),
      other => panic!("expected Str, got {:?}", other),
    }

    // Integer-encoded strings snapshot in canonical decimal form
    let counter = snapshot.entries.iter().find(|e| e.key == b"counter").unwrap();
    match &counter.value {
      SnapshotValue::Str(b) => assert_eq!(b, b"42"),
      other => panic!("expected Str, got {:?}", other),
    }

    let ts = snapshot.entries.iter().find(|e| e.key == b"myts").unwrap();
    match &ts.value {
      SnapshotValue::Series { samples, .. } => {
        assert_eq!(samples, &vec![(1000, 10.0), (2000, 20.5)]);
      },
      other => panic!("expected Series, got {:?}", other),
    }
  }

  #[test]
  fn test_write_and_read_roundtrip() {
    let store = store_with_data();
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new("zedis", dir.path().to_str().unwrap());

    let path = {
      let db = store.db(0);
      writer.save(&db, 0).unwrap()
    };
    assert!(path.exists());

    let restored = read_snapshot(&path).unwrap();
    assert_eq!(restored.entries.len(), 4);
    assert_eq!(restored.service, "zedis");
    let list = restored.entries.iter().find(|e| e.key == b"mylist").unwrap();
    match &list.value {
      SnapshotValue::List(cells) => assert_eq!(cells.len(), 2),
      other => panic!("expected List, got {:?}", other),
    }
  }

  #[test]
  fn test_restore_series_replays_samples() {
    let samples = vec![(100, 1.5), (200, 2.5), (300, 3.5)];
    let series = restore_series(SeriesConfig::default(), &samples);
    assert_eq!(series.total_samples(), 3);
    let replayed = series.range(i64::MIN, i64::MAX).unwrap();
    let got: Vec<(i64, f64)> = replayed.iter().map(|s| (s.ts, s.value)).collect();
    assert_eq!(got, samples);
  }
}

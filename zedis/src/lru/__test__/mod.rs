#[cfg(test)]
mod __test__ {

  use crate::lru::{sample_lru_key, EvictionPolicy};
  use crate::store::Store;
  use crate::value::Value;

  fn populated_store() -> Store {
    let store = Store::new(1, 16, 0, EvictionPolicy::NoEviction);
    {
      let mut db = store.db(0);
      for i in 0..10 {
        let value = Value::encode_string(&db.pool(), b"v");
        db.put(format!("k{}", i).as_bytes(), value).unwrap();
      }
    }
    store
  }

  #[test]
  fn test_policy_parse() {
    assert_eq!(
      EvictionPolicy::parse("noeviction"),
      Some(EvictionPolicy::NoEviction)
    );
    assert_eq!(
      EvictionPolicy::parse("allkeys-lru"),
      Some(EvictionPolicy::AllKeysLru)
    );
    assert_eq!(
      EvictionPolicy::parse("volatile-lru"),
      Some(EvictionPolicy::VolatileLru)
    );
    assert_eq!(EvictionPolicy::parse("allkeys-random"), None);
  }

  #[test]
  fn test_sample_empty_db() {
    let store = Store::new(1, 16, 0, EvictionPolicy::NoEviction);
    let db = store.db(0);
    let mut rng = rand::thread_rng();
    assert!(sample_lru_key(&db, 5, false, &mut rng).is_none());
    assert!(sample_lru_key(&db, 5, true, &mut rng).is_none());
  }

  #[test]
  fn test_sample_prefers_smaller_stamp() {
    let store = populated_store();
    let mut db = store.db(0);
    // Touch everything except k3, making it the unique coldest key
    for i in 0..10 {
      if i != 3 {
        db.access(format!("k{}", i).as_bytes(), 0);
      }
    }
    let mut rng = rand::thread_rng();
    // A full-population sample must land on the coldest key
    let victim = sample_lru_key(&db, 1000, false, &mut rng).unwrap();
    assert_eq!(victim.as_ref(), b"k3");
  }

  #[test]
  fn test_volatile_sampling_draws_from_ttl_index() {
    let store = populated_store();
    let mut db = store.db(0);
    db.set_expire(b"k7", i64::MAX);
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
      let victim = sample_lru_key(&db, 5, true, &mut rng).unwrap();
      assert_eq!(victim.as_ref(), b"k7", "only the volatile key may be drawn");
    }
  }
}

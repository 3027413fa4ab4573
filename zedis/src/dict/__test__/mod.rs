#[cfg(test)]
mod __test__ {

  use crate::dict::{bytes_equal, fast_hash, Dict};
  use crate::intern::Key;
  use std::sync::Arc;

  fn key(s: &str) -> Key {
    Arc::from(s.as_bytes())
  }

  #[test]
  fn test_put_get_roundtrip() {
    let mut dict: Dict<u64> = Dict::new();
    assert!(dict.is_empty());

    assert_eq!(dict.put(key("a"), 1), None);
    assert_eq!(dict.put(key("b"), 2), None);
    assert_eq!(dict.get(b"a"), Some(&1));
    assert_eq!(dict.get(b"b"), Some(&2));
    assert_eq!(dict.get(b"c"), None);
    assert_eq!(dict.len(), 2);
  }

  #[test]
  fn test_put_replaces_existing() {
    let mut dict: Dict<u64> = Dict::new();
    assert_eq!(dict.put(key("k"), 1), None);
    assert_eq!(dict.put(key("k"), 2), Some(1));
    assert_eq!(dict.len(), 1);
    assert_eq!(dict.get(b"k"), Some(&2));
  }

  #[test]
  fn test_remove() {
    let mut dict: Dict<u64> = Dict::new();
    for i in 0..32u64 {
      dict.put(key(&format!("key-{}", i)), i);
    }
    assert_eq!(dict.remove(b"key-7"), Some(7));
    assert_eq!(dict.remove(b"key-7"), None);
    assert_eq!(dict.len(), 31);
    assert_eq!(dict.get(b"key-7"), None);

    // Every surviving key is still reachable after the swap-remove patch
    for i in 0..32u64 {
      if i != 7 {
        assert_eq!(dict.get(format!("key-{}", i).as_bytes()), Some(&i));
      }
    }
  }

  #[test]
  fn test_load_factor_after_put() {
    let mut dict: Dict<usize> = Dict::new();
    for i in 0..1000 {
      dict.put(key(&format!("key-{:04}", i)), i);
      assert!(
        dict.len() * 4 <= dict.table_len() * 3,
        "load factor above 75% after put {}: {}/{}",
        i,
        dict.len(),
        dict.table_len()
      );
    }
    for i in 0..1000 {
      assert_eq!(dict.get(format!("key-{:04}", i).as_bytes()), Some(&i));
    }
  }

  #[test]
  fn test_churn_with_tombstones() {
    let mut dict: Dict<usize> = Dict::new();
    for round in 0..10 {
      for i in 0..100 {
        dict.put(key(&format!("r{}-{}", round, i)), i);
      }
      for i in 0..100 {
        if i % 2 == 0 {
          assert!(dict.remove(format!("r{}-{}", round, i).as_bytes()).is_some());
        }
      }
    }
    // 10 rounds x 50 survivors
    assert_eq!(dict.len(), 500);
    assert_eq!(dict.get(b"r3-41"), Some(&41));
    assert_eq!(dict.get(b"r3-40"), None);
  }

  #[test]
  fn test_interned_pointer_fast_path() {
    let mut dict: Dict<u64> = Dict::new();
    let canonical = key("shared");
    dict.put(Arc::clone(&canonical), 9);
    // Lookup through the very same allocation hits the pointer compare
    assert_eq!(dict.get(&canonical), Some(&9));
    // Lookup through different bytes with equal content still matches
    assert_eq!(dict.get(b"shared"), Some(&9));
  }

  #[test]
  fn test_random_entry() {
    let mut dict: Dict<u64> = Dict::new();
    let mut rng = rand::thread_rng();
    assert!(dict.random_entry(&mut rng).is_none());

    for i in 0..10u64 {
      dict.put(key(&format!("k{}", i)), i);
    }
    for _ in 0..50 {
      let (k, v) = dict.random_entry(&mut rng).unwrap();
      assert_eq!(dict.get(k), Some(v));
    }
  }

  #[test]
  fn test_clear() {
    let mut dict: Dict<u64> = Dict::new();
    for i in 0..20u64 {
      dict.put(key(&format!("k{}", i)), i);
    }
    dict.clear();
    assert!(dict.is_empty());
    assert_eq!(dict.get(b"k3"), None);
    dict.put(key("fresh"), 1);
    assert_eq!(dict.get(b"fresh"), Some(&1));
  }

  #[test]
  fn test_bytes_equal_stages() {
    assert!(bytes_equal(b"", b""));
    assert!(bytes_equal(b"short", b"short"));
    assert!(!bytes_equal(b"short", b"shore"));
    assert!(!bytes_equal(b"short", b"shorter"));

    // Above one lane
    let a = vec![0xABu8; 33];
    let mut b = a.clone();
    assert!(bytes_equal(&a, &b));
    b[32] = 0xAC; // differ only in the byte tail
    assert!(!bytes_equal(&a, &b));
    let mut c = a.clone();
    c[0] = 0; // differ in the first lane
    assert!(!bytes_equal(&a, &c));
  }

  #[test]
  fn test_fast_hash_consistency() {
    assert_eq!(fast_hash(b"abc"), fast_hash(b"abc"));
    assert_ne!(fast_hash(b"abc"), fast_hash(b"abd"));
    assert_ne!(fast_hash(b"abcdefgh"), fast_hash(b"abcdefgi"));
    // Longer than one 8-byte chunk
    assert_eq!(
      fast_hash(b"0123456789abcdef"),
      fast_hash(b"0123456789abcdef")
    );
  }

  #[test]
  fn test_iteration_order_is_insertion_order_without_removals() {
    let mut dict: Dict<u64> = Dict::new();
    for i in 0..16u64 {
      dict.put(key(&format!("k{:02}", i)), i);
    }
    let values: Vec<u64> = dict.iter().map(|(_, v)| *v).collect();
    assert_eq!(values, (0..16).collect::<Vec<_>>());
  }
}

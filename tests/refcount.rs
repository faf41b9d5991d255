mod common;

use common::{TestEnv, distinct_keys, random_key};
use refdb::Error;
use std::collections::HashSet;

#[test]
fn test_add_delete_same() {
  let env = TestEnv::with_default();
  let key = random_key(64);

  for _ in 0..2048 {
    env.manager.add(&key).unwrap();
  }
  for _ in 0..2047 {
    env.manager.delete(&key).unwrap();
  }
  assert!(env.manager.get_trash().is_empty());
  assert_eq!(env.manager.get_ref(&key).unwrap(), 1);

  env.manager.delete(&key).unwrap();
  assert_eq!(env.manager.get_trash(), vec![key.clone()]);
  assert!(matches!(env.manager.get_ref(&key), Err(Error::NotFound(_))));
}

#[test]
fn test_add_delete_diff() {
  let env = TestEnv::with_default();
  let keys = distinct_keys(2048, 64);

  for key in &keys {
    env.manager.add(key).unwrap();
  }
  assert_eq!(env.manager.len(), 2048);

  for key in &keys {
    env.manager.delete(key).unwrap();
  }

  let trash = env.manager.get_trash();
  assert_eq!(trash.len(), 2048);

  let trash_set: HashSet<&String> = trash.iter().collect();
  let key_set: HashSet<&String> = keys.iter().collect();
  assert_eq!(trash_set.len(), 2048, "trash holds duplicates");
  assert_eq!(trash_set, key_set);
  assert!(env.manager.is_empty());
}

#[test]
fn test_delete_order_is_irrelevant() {
  let env = TestEnv::with_default();
  let keys = distinct_keys(512, 16);

  for key in &keys {
    env.manager.add(key).unwrap();
  }
  for key in keys.iter().rev() {
    env.manager.delete(key).unwrap();
  }

  let mut trash = env.manager.get_trash();
  let mut expected = keys.clone();
  trash.sort();
  expected.sort();
  assert_eq!(trash, expected);
}

#[test]
fn test_trash_order_within_shard() {
  let env = TestEnv::with_default();
  let keys = ["AB03", "AB01", "AB02"];

  for key in keys {
    env.manager.add(key).unwrap();
  }
  for key in keys {
    env.manager.delete(key).unwrap();
  }

  assert_eq!(env.manager.get_trash(), vec!["AB03", "AB01", "AB02"]);
  assert_eq!(env.manager.shard(0xAB).get_trash().len(), 3);
}

#[test]
fn test_trash_is_not_drained_by_reads() {
  let env = TestEnv::with_default();
  env.manager.add("0001").unwrap();
  env.manager.delete("0001").unwrap();

  assert_eq!(env.manager.get_trash().len(), 1);
  assert_eq!(env.manager.get_trash().len(), 1);
}

#[test]
fn test_delete_absent_key_is_noop() {
  let env = TestEnv::with_default();
  env.manager.delete("DEADBEEF").unwrap();
  assert!(env.manager.get_trash().is_empty());
}

#[test]
fn test_readd_after_retirement() {
  let env = TestEnv::with_default();
  env.manager.add("1234").unwrap();
  env.manager.delete("1234").unwrap();
  env.manager.add("1234").unwrap();
  env.manager.delete("1234").unwrap();

  // Retired twice, reported twice
  assert_eq!(env.manager.get_trash(), vec!["1234", "1234"]);
}

#[test]
fn test_prefix_keys_are_independent() {
  let env = TestEnv::with_default();
  env.manager.add("ABCD").unwrap();
  env.manager.add("ABCDEF").unwrap();
  env.manager.add("AB").unwrap();

  env.manager.delete("ABCD").unwrap();
  assert_eq!(env.manager.get_ref("ABCDEF").unwrap(), 1);
  assert_eq!(env.manager.get_ref("AB").unwrap(), 1);
  assert!(env.manager.get_ref("ABCD").is_err());
}

#[test]
fn test_unroutable_keys() {
  let env = TestEnv::with_default();

  for key in ["", "1", "g0", "deadbeef"] {
    let err = env.manager.add(key).unwrap_err();
    assert!(matches!(err, Error::ShardNotFound { .. }), "{:?}: {}", key, err);
  }

  // Routable, but the tail is outside the alphabet
  let err = env.manager.add("00xyz").unwrap_err();
  assert!(matches!(err, Error::InvalidKey { .. }));
  assert!(env.manager.is_empty());
}

#[test]
fn test_update_then_delete() {
  let env = TestEnv::with_default();
  env.manager.update("C0DE", 3).unwrap();
  env.manager.add("C0DE").unwrap();
  assert_eq!(env.manager.get_ref("C0DE").unwrap(), 4);

  for _ in 0..3 {
    env.manager.delete("C0DE").unwrap();
  }
  assert!(env.manager.get_trash().is_empty());
  env.manager.delete("C0DE").unwrap();
  assert_eq!(env.manager.get_trash(), vec!["C0DE"]);
}

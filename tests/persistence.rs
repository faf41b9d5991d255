mod common;

use common::{TestEnv, distinct_keys, random_key};
use refdb::{Error, IndexOptions, ReadStrategy, SaveMode, ShardManager};
use std::collections::{HashMap, HashSet};
use std::fs;

#[test]
fn test_save_load_one() {
  let mut env = TestEnv::with_default();
  let key = random_key(64);

  env.manager.add(&key).unwrap();
  assert_eq!(env.manager.save().unwrap(), 1);

  env.restart();
  env.manager.delete(&key).unwrap();
  assert_eq!(env.manager.get_trash(), vec![key]);
}

#[test]
fn test_save_load_many() {
  let mut env = TestEnv::with_default();
  let keys = distinct_keys(2048, 64);

  for key in &keys {
    env.manager.add(key).unwrap();
  }
  assert_eq!(env.manager.save().unwrap(), 2048);

  env.restart();
  assert_eq!(env.manager.len(), 2048);

  for key in &keys {
    env.manager.delete(key).unwrap();
  }

  let trash: HashSet<String> = env.manager.get_trash().into_iter().collect();
  let expected: HashSet<String> = keys.into_iter().collect();
  assert_eq!(trash.len(), 2048);
  assert_eq!(trash, expected);
}

#[test]
fn test_save_load_preserves_counts() {
  let mut env = TestEnv::with_default();
  let mut counts: HashMap<String, usize> = HashMap::new();

  // Short keys collide often enough to produce counts above one
  for _ in 0..4000 {
    let key = random_key(3);
    env.manager.add(&key).unwrap();
    *counts.entry(key).or_default() += 1;
  }
  env.manager.save().unwrap();
  env.restart();

  for (key, count) in &counts {
    assert_eq!(env.manager.get_ref(key).unwrap(), *count as i64, "key {}", key);
  }

  for (key, count) in &counts {
    for _ in 0..*count {
      env.manager.delete(key).unwrap();
    }
  }
  assert_eq!(env.manager.get_trash().len(), counts.len());
}

#[test]
fn test_load_fresh_store_is_empty() {
  let env = TestEnv::with_default();
  assert_eq!(env.manager.load().unwrap(), 0);
  assert!(env.manager.is_empty());
}

#[test]
fn test_routing_survives_restart() {
  let mut env = TestEnv::with_default();
  let key = "5A5A5A";
  env.manager.add(key).unwrap();
  let before = env.manager.shard_for(key).unwrap().id().to_string();
  env.manager.save().unwrap();

  env.restart();
  let after = env.manager.shard_for(key).unwrap();
  assert_eq!(after.id(), before);
  assert_eq!(after.get_ref(key).unwrap(), 1);
}

#[test]
fn test_corrupt_shard_file_names_shard() {
  let env = TestEnv::with_default();
  env.manager.add("1F00").unwrap();
  env.manager.add("1F01").unwrap();
  env.manager.add("2000").unwrap();
  env.manager.save().unwrap();

  let path = env.root.join("sha256").join("1F").join("db");
  let mut bytes = fs::read(&path).unwrap();
  let last = bytes.len() - 1;
  bytes[last] ^= 0xFF;
  fs::write(&path, bytes).unwrap();

  let fresh = ShardManager::new(env.options.clone()).unwrap();
  let err = fresh.load().unwrap_err();
  match &err {
    Error::Shard { shard, source } => {
      assert_eq!(shard, "1F");
      assert!(matches!(**source, Error::CorruptRecord { .. }));
    }
    other => panic!("unexpected error: {}", other),
  }
  assert!(matches!(err.root_cause(), Error::CorruptRecord { .. }));

  // Shards before 1F were loaded, the failing one was released
  assert_eq!(fresh.shard(0x1F).len(), 0);
  assert_eq!(fresh.shard(0x20).len(), 0);
}

#[test]
fn test_garbage_shard_file() {
  let env = TestEnv::with_default();
  env.manager.save().unwrap();

  let path = env.root.join("sha256").join("00").join("db");
  fs::write(&path, b"not a record stream").unwrap();

  let fresh = ShardManager::new(env.options.clone()).unwrap();
  let err = fresh.load().unwrap_err();
  assert!(matches!(err, Error::Shard { ref shard, .. } if shard == "00"));
}

#[test]
fn test_truncate_mode_forgets_retired_keys() {
  let mut env = TestEnv::with_default();
  env.manager.add("AA00").unwrap();
  env.manager.add("AA01").unwrap();
  env.manager.save().unwrap();

  env.manager.delete("AA00").unwrap();
  env.manager.save().unwrap();

  env.restart();
  assert!(env.manager.get_ref("AA00").is_err());
  assert_eq!(env.manager.get_ref("AA01").unwrap(), 1);
}

#[test]
fn test_append_mode_last_record_wins() {
  let mut options = IndexOptions::default();
  options.save_mode = SaveMode::Append;
  let mut env = TestEnv::new(options);

  env.manager.add("BB00").unwrap();
  env.manager.save().unwrap();
  env.manager.add("BB00").unwrap();
  env.manager.save().unwrap();

  env.restart();
  assert_eq!(env.manager.get_ref("BB00").unwrap(), 2);
}

#[test]
fn test_mmap_read_strategy() {
  let mut options = IndexOptions::default();
  options.read_strategy = ReadStrategy::Mmap;
  let mut env = TestEnv::new(options);
  let keys = distinct_keys(300, 40);

  for key in &keys {
    env.manager.add(key).unwrap();
  }
  env.manager.save().unwrap();

  env.restart();
  for key in &keys {
    assert_eq!(env.manager.get_ref(key).unwrap(), 1);
  }
}

#[test]
fn test_custom_namespace_and_file_name() {
  let mut options = IndexOptions::default().with_file_name("refs.db");
  options.namespace = "blake3".into();
  let mut env = TestEnv::new(options);

  env.manager.add("E1E1").unwrap();
  env.manager.save().unwrap();
  assert!(env.root.join("blake3").join("E1").join("refs.db").exists());

  env.restart();
  assert_eq!(env.manager.get_ref("E1E1").unwrap(), 1);
}

#[test]
fn test_cleanup_then_save_writes_empty_snapshot() {
  let mut env = TestEnv::with_default();
  env.manager.add("0102").unwrap();
  env.manager.save().unwrap();

  assert_eq!(env.manager.cleanup(), 1);
  assert_eq!(env.manager.save().unwrap(), 0);

  env.restart();
  assert!(env.manager.is_empty());
}

#[test]
fn test_long_keys_save_and_load() {
  let mut env = TestEnv::with_default();
  // Longer than a u16 length prefix could describe
  let long = format!("AB{}", "0".repeat(70_000));
  let deep = "C".repeat(100_000);

  env.manager.add(&long).unwrap();
  env.manager.add(&long).unwrap();
  env.manager.add(&deep).unwrap();
  assert_eq!(env.manager.zero_refs().unwrap().len(), 0);
  assert_eq!(env.manager.save().unwrap(), 2);

  env.restart();
  assert_eq!(env.manager.get_ref(&long).unwrap(), 2);
  assert_eq!(env.manager.get_ref(&deep).unwrap(), 1);

  env.manager.delete(&deep).unwrap();
  assert_eq!(env.manager.get_trash(), vec![deep]);
}

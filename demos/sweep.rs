//! Example: Reference counting for a deduplicating blob store
//!
//! This example demonstrates:
//! - Taking references on content digests as blobs are stored
//! - Dropping references as owners go away
//! - Sweeping the trash to find blobs that can be reclaimed
//! - Persisting the counts and restoring them after a restart

use refdb::{IndexOptions, ShardManager};

/// A short stand-in for a content digest.
fn digest(content: &str) -> String {
  format!("{:08X}", crc32fast::hash(content.as_bytes()))
}

fn main() -> refdb::Result<()> {
  println!("=== refdb Sweep Example ===\n");

  // 1. Open the store
  let opts = IndexOptions::new("./example_refdb");
  let manager = ShardManager::new(opts.clone())?;
  let restored = manager.load()?;
  println!("✓ Opened store at {}, restored {} keys", manager.root().display(), restored);

  // 2. Store some blobs, several owners sharing the same content
  println!("\n--- Storing Blobs ---");
  let owners = ["alice", "bob", "carol"];
  for owner in owners {
    for i in 0..10 {
      // Every owner stores the shared licence file, plus private notes
      manager.add(&digest("LICENSE"))?;
      manager.add(&digest(&format!("{}/notes_{}", owner, i)))?;
    }
  }
  println!("  {} distinct digests tracked", manager.len());
  println!("  LICENSE has {} references", manager.get_ref(&digest("LICENSE"))?);

  // 3. One owner leaves
  println!("\n--- Removing 'bob' ---");
  for i in 0..10 {
    manager.delete(&digest("LICENSE"))?;
    manager.delete(&digest(&format!("bob/notes_{}", i)))?;
  }

  // 4. Sweep
  println!("\n--- Sweeping ---");
  let trash = manager.get_trash();
  for key in trash.iter().take(3) {
    println!("  reclaim {}", key);
  }
  println!("  {} blobs can be reclaimed", trash.len());
  println!("  LICENSE still has {} references", manager.get_ref(&digest("LICENSE"))?);

  // 5. Persist and restart
  println!("\n--- Restart ---");
  let saved = manager.save()?;
  println!("✓ Saved {} records", saved);
  drop(manager);

  let manager = ShardManager::new(opts)?;
  manager.load()?;
  println!("✓ Reloaded {} keys", manager.len());

  // Cleanup example data
  std::fs::remove_dir_all("./example_refdb").ok();

  println!("\n=== Example Complete ===");
  Ok(())
}

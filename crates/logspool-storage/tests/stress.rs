//! Stress tests for logspool-storage
//!
//! These tests verify the backlog under concurrent writers and readers, at
//! volume, and across quota eviction.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};

use logspool_core::{Level, LogEvent};
use logspool_storage::{
    BacklogIndex, DurableWriter, EventCodec, JsonCodec, PostcardCodec, QuotaEvictor, TEMP_MARKER,
};
use tempfile::TempDir;

fn event(i: usize) -> LogEvent {
    LogEvent::new(Level::Info, "stress", format!("event {i}")).with_field("seq", i)
}

// ============================================================================
// Atomicity Tests
// ============================================================================

/// Every file a concurrent reader lists must decode completely
///
/// Writers publish with rename, so the reader never sees a half-written file
/// under a listed name.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_listing_never_sees_partial_files() {
    let temp = TempDir::new().unwrap();
    let codec: Arc<dyn EventCodec> = Arc::new(PostcardCodec);
    let writer = DurableWriter::new(temp.path(), ".ser", codec.clone());
    let index = BacklogIndex::new(temp.path(), ".ser");
    let done = Arc::new(AtomicBool::new(false));

    let mut writers = Vec::new();
    for w in 0..4 {
        let writer = writer.clone();
        writers.push(tokio::spawn(async move {
            for i in 0..100 {
                writer
                    .persist(&event(w * 1_000 + i))
                    .await
                    .expect("Failed to persist event");
            }
        }));
    }

    let reader = {
        let done = done.clone();
        let codec = codec.clone();
        tokio::spawn(async move {
            let mut checked = 0usize;
            while !done.load(Ordering::SeqCst) {
                for pending in index.list().await {
                    let name = pending.file_name().unwrap_or_default().to_string();
                    assert!(!name.ends_with(TEMP_MARKER), "listed temp file {name}");
                    let bytes = pending.read().await.expect("listed file vanished");
                    codec
                        .decode(&bytes)
                        .unwrap_or_else(|e| panic!("listed file {name} is partial: {e}"));
                    checked += 1;
                }
                tokio::task::yield_now().await;
            }
            checked
        })
    };

    for handle in writers {
        handle.await.unwrap();
    }
    done.store(true, Ordering::SeqCst);
    let checked = reader.await.unwrap();
    println!("Reader decoded {checked} listed files while writers ran");

    let listed = BacklogIndex::new(temp.path(), ".ser").list().await;
    assert_eq!(listed.len(), 400);
}

// ============================================================================
// Throughput Tests
// ============================================================================

/// Persist and list 2,000 events
#[tokio::test]
async fn test_persist_throughput() {
    let temp = TempDir::new().unwrap();
    let writer = DurableWriter::new(temp.path(), ".json", Arc::new(JsonCodec));
    let event_count = 2_000;

    let start = Instant::now();
    let mut paths = HashSet::new();
    for i in 0..event_count {
        let path = writer.persist(&event(i)).await.expect("Failed to persist event");
        paths.insert(path);
    }
    let duration = start.elapsed();
    println!(
        "Persisted {} events in {:?} ({:.2} events/sec)",
        event_count,
        duration,
        event_count as f64 / duration.as_secs_f64()
    );

    // Unique names, nothing left behind under a temp name
    assert_eq!(paths.len(), event_count);
    let listed = BacklogIndex::new(temp.path(), ".json").list().await;
    assert_eq!(listed.len(), event_count);
    assert_eq!(writer.remove_stale_temp_files().await, 0);
}

// ============================================================================
// Ordering and Quota Tests
// ============================================================================

fn backdate(path: &Path, age_secs: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(age_secs))
        .unwrap();
}

/// Listing order follows modification time, not write or name order
#[tokio::test]
async fn test_listing_follows_mtime() {
    let temp = TempDir::new().unwrap();
    let writer = DurableWriter::new(temp.path(), ".ser", Arc::new(PostcardCodec));

    let mut written = Vec::new();
    for i in 0..10 {
        let path = writer.persist(&event(i)).await.unwrap();
        // Earlier writes are older
        backdate(&path, 1_000 - i as u64 * 10);
        written.push(path);
    }

    let listed: Vec<_> = BacklogIndex::new(temp.path(), ".ser")
        .list()
        .await
        .into_iter()
        .map(|p| p.path().to_path_buf())
        .collect();
    assert_eq!(listed, written);
}

/// The quota evicts the oldest files of a large backlog
#[tokio::test]
async fn test_quota_over_large_backlog() {
    let temp = TempDir::new().unwrap();
    let codec: Arc<dyn EventCodec> = Arc::new(PostcardCodec);
    let writer = DurableWriter::new(temp.path(), ".ser", codec.clone());

    for i in 0..600 {
        let path = writer.persist(&event(i)).await.unwrap();
        backdate(&path, 10_000 - i as u64);
    }

    let index = BacklogIndex::new(temp.path(), ".ser");
    let plan = QuotaEvictor::new(500).plan(index.list().await, 50);
    assert_eq!(plan.evict.len(), 100);
    assert_eq!(plan.send.len(), 50);

    let first_kept = codec.decode(&plan.send[0].read().await.unwrap()).unwrap();
    assert_eq!(first_kept.message, "event 100");

    for pending in &plan.evict {
        tokio::fs::remove_file(pending.path()).await.unwrap();
    }
    assert_eq!(index.list().await.len(), 500);
}

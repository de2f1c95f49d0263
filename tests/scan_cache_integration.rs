use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use notevault::{
    CacheState, Clock, InferenceRules, NotePath, NoteStore, ScanCache, Vault,
};

#[derive(Clone)]
struct ManualClock {
    start: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }
}

fn manual_store(root: &std::path::Path, ttl: Duration) -> (ManualClock, NoteStore<ManualClock>) {
    let vault = Vault::open(root).expect("open vault");
    let clock = ManualClock::new();
    let cache = ScanCache::with_clock(ttl, clock.clone());
    let store = NoteStore::with_parts(vault, cache, InferenceRules::default());
    (clock, store)
}

#[test]
fn queries_within_ttl_are_identical_and_walk_free() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    std::fs::create_dir_all(root.join("Projects"))?;
    std::fs::write(
        root.join("Projects/a.md"),
        "---\ntags:\n- alpha\n---\n\nbody\n",
    )?;

    let (clock, mut store) = manual_store(&root, Duration::from_secs(30));
    assert_eq!(store.cache_state(), CacheState::Empty);

    let first = store.stats()?;
    assert_eq!(first.total_documents, 1);
    assert_eq!(store.cache_state(), CacheState::Fresh);

    // A write that does not go through the store stays invisible while fresh.
    std::fs::write(root.join("Projects/b.md"), "body\n")?;
    clock.advance(Duration::from_secs(10));
    let second = store.stats()?;
    assert_eq!(first, second);

    clock.advance(Duration::from_secs(30));
    assert_eq!(store.cache_state(), CacheState::Stale);
    let third = store.stats()?;
    assert_eq!(third.total_documents, 2);
    Ok(())
}

#[test]
fn every_mutation_invalidates_the_cache() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    std::fs::create_dir_all(&root)?;

    let (_clock, mut store) = manual_store(&root, Duration::from_secs(3600));

    assert_eq!(store.stats()?.total_documents, 0);

    let a = NotePath::try_from("Projects/a.md")?;
    store.create_note(&a, "body\n")?;
    assert_eq!(store.cache_state(), CacheState::Empty);
    assert_eq!(store.stats()?.total_documents, 1);

    let b = NotePath::try_from("Projects/b.md")?;
    store.create_note(&b, "body\n")?;
    assert_eq!(store.stats()?.total_documents, 2);

    store.delete_note(&a)?;
    assert_eq!(store.cache_state(), CacheState::Empty);
    assert_eq!(store.stats()?.total_documents, 1);

    let c = NotePath::try_from("Areas/c.md")?;
    store.move_note(&b, &c)?;
    let stats = store.stats()?;
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.folder_counts.get("Areas"), Some(&1));
    assert_eq!(stats.folder_counts.get("Projects"), None);

    store.enrich_note(&c)?;
    let stats = store.stats()?;
    assert!(stats.field_names.contains("title"));
    Ok(())
}

#[test]
fn hidden_directories_are_skipped_entirely() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    std::fs::create_dir_all(root.join(".trash/nested"))?;
    std::fs::create_dir_all(root.join("Notes"))?;
    std::fs::write(root.join(".trash/nested/a.md"), "---\ntags:\n- x\n---\n\n\n")?;
    std::fs::write(root.join("Notes/b.md"), "body\n")?;

    let (_clock, mut store) = manual_store(&root, Duration::from_secs(30));
    let stats = store.stats()?;
    assert_eq!(stats.total_documents, 1);
    assert!(stats.tag_counts.is_empty());
    Ok(())
}

#[test]
fn unreadable_documents_are_recorded_and_the_walk_completes() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    std::fs::create_dir_all(root.join("Notes"))?;
    std::fs::write(
        root.join("Notes/good.md"),
        "---\ntags:\n- kept\n---\n\nbody\n",
    )?;
    // Not valid UTF-8: reading this document fails on any platform and user.
    std::fs::write(root.join("Notes/bad.md"), [0xff, 0xfe, 0x00, 0x9f])?;

    let (_clock, mut store) = manual_store(&root, Duration::from_secs(30));
    let stats = store.stats()?;

    // The broken file still counts; only its contents are lost.
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.folder_counts["Notes"], 2);
    assert_eq!(stats.errors.len(), 1);
    assert!(stats.errors[0].path.ends_with("bad.md"));
    assert!(!stats.errors[0].message.is_empty());
    assert_eq!(stats.tag_counts["kept"], 1);
    Ok(())
}

#[test]
fn total_matches_folder_sum() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    std::fs::create_dir_all(root.join("A/deep/deeper"))?;
    std::fs::create_dir_all(root.join("B"))?;
    std::fs::write(root.join("root.md"), "x\n")?;
    std::fs::write(root.join("A/one.md"), "x\n")?;
    std::fs::write(root.join("A/deep/two.md"), "x\n")?;
    std::fs::write(root.join("A/deep/deeper/three.md"), "x\n")?;
    std::fs::write(root.join("B/four.md"), "x\n")?;

    let (_clock, mut store) = manual_store(&root, Duration::from_secs(30));
    let stats = store.stats()?;
    assert_eq!(stats.total_documents, 5);
    assert_eq!(
        stats.total_documents,
        stats.folder_counts.values().sum::<usize>()
    );
    assert_eq!(stats.folder_counts["A"], 3);
    assert_eq!(stats.folder_counts["B"], 1);
    assert_eq!(stats.folder_counts["."], 1);
    Ok(())
}

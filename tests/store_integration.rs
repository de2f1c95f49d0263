use notevault::{Error, NotePath, NoteStore};

fn scratch_store() -> (tempfile::TempDir, NoteStore) {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("vault");
    std::fs::create_dir_all(&root).expect("create vault root");
    let store = NoteStore::open(&root).expect("open store");
    (temp, store)
}

#[test]
fn create_read_delete_lifecycle() -> anyhow::Result<()> {
    let (_temp, mut store) = scratch_store();
    let rel = NotePath::try_from("Projects/plan.md")?;

    store.create_note(&rel, "the plan\n")?;
    assert_eq!(store.read_note(&rel)?, "the plan\n");
    assert!(matches!(
        store.create_note(&rel, "again"),
        Err(Error::AlreadyExists(_))
    ));

    store.delete_note(&rel)?;
    assert!(matches!(store.read_note(&rel), Err(Error::NotFound(_))));
    assert!(matches!(
        store.delete_note(&rel),
        Err(Error::NotFound(_))
    ));
    Ok(())
}

#[test]
fn traversal_paths_never_reach_the_filesystem() {
    let (_temp, _store) = scratch_store();

    // The relative-path type itself refuses traversal and absolute paths, so
    // no operation can be handed an escaping path.
    assert!(NotePath::try_from("../outside.md").is_err());
    assert!(NotePath::try_from("a/../../outside.md").is_err());
    assert!(NotePath::try_from(std::path::Path::new("/etc/passwd")).is_err());
}

#[test]
fn move_rewrites_wikilinks_in_other_documents() -> anyhow::Result<()> {
    let (_temp, mut store) = scratch_store();
    let target = NotePath::try_from("Notes/Old Name.md")?;
    let referrer = NotePath::try_from("Notes/referrer.md")?;
    let unrelated = NotePath::try_from("Notes/unrelated.md")?;

    store.create_note(&target, "content\n")?;
    store.create_note(
        &referrer,
        "See [[Old Name]] and [[Old Name|an alias]] and [[Old Name#Section]].\n",
    )?;
    store.create_note(&unrelated, "Mentions [[Old Namesake]] only.\n")?;

    let moved_to = NotePath::try_from("Archive/New Name.md")?;
    let rewritten = store.move_note(&target, &moved_to)?;
    assert_eq!(rewritten, 1);

    assert!(matches!(store.read_note(&target), Err(Error::NotFound(_))));
    assert_eq!(store.read_note(&moved_to)?, "content\n");
    assert_eq!(
        store.read_note(&referrer)?,
        "See [[New Name]] and [[New Name|an alias]] and [[New Name#Section]].\n"
    );
    // A stem that merely extends the old name is left alone.
    assert_eq!(
        store.read_note(&unrelated)?,
        "Mentions [[Old Namesake]] only.\n"
    );
    Ok(())
}

#[test]
fn move_refuses_to_clobber() -> anyhow::Result<()> {
    let (_temp, mut store) = scratch_store();
    let a = NotePath::try_from("a.md")?;
    let b = NotePath::try_from("b.md")?;
    store.create_note(&a, "a\n")?;
    store.create_note(&b, "b\n")?;

    assert!(matches!(
        store.move_note(&a, &b),
        Err(Error::AlreadyExists(_))
    ));
    assert_eq!(store.read_note(&b)?, "b\n");
    Ok(())
}

#[test]
fn daily_note_is_created_once() -> anyhow::Result<()> {
    let (_temp, mut store) = scratch_store();

    let rel = store.daily_note("2026-08-30")?;
    assert_eq!(rel.as_str_lossy(), "Daily/2026-08-30.md");
    let text = store.read_note(&rel)?;
    assert!(text.starts_with("---\n"));
    assert!(text.contains("date: 2026-08-30"));
    assert!(text.contains("docType: daily-note"));

    // Second call is a no-op on the file.
    store.write_note(&rel, "edited by hand\n")?;
    let again = store.daily_note("2026-08-30")?;
    assert_eq!(again, rel);
    assert_eq!(store.read_note(&rel)?, "edited by hand\n");
    Ok(())
}

use assert_cmd::Command;
use predicates::prelude::*;

fn nv(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("nv").expect("binary");
    cmd.env("NOTEVAULT_ROOT", root);
    cmd
}

#[test]
fn create_then_report_stats() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    std::fs::create_dir_all(&root)?;

    nv(&root)
        .args(["note", "create", "Projects/plan.md", "--content", "the plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created Projects/plan.md"));

    nv(&root)
        .args(["report", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("documents: 1"))
        .stdout(predicate::str::contains("Projects: 1"));
    Ok(())
}

#[test]
fn checklist_round_trip() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    std::fs::create_dir_all(&root)?;

    nv(&root)
        .args(["check", "add", "Buy milk", "--tag", "errand"])
        .assert()
        .success();

    nv(&root)
        .args(["check", "done", "--text", "milk"])
        .assert()
        .success();

    nv(&root)
        .args(["check", "list", "--pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Buy milk").not());

    let checklist = std::fs::read_to_string(root.join("Checklist.md"))?;
    assert!(checklist.contains("- [x] Buy milk #errand"));
    Ok(())
}

#[test]
fn escaping_paths_are_rejected_before_io() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let root = temp.path().join("vault");
    std::fs::create_dir_all(&root)?;

    nv(&root)
        .args(["note", "create", "../escape.md", "--content", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("traversal"));

    assert!(!temp.path().join("escape.md").exists());
    Ok(())
}

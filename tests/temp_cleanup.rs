//! Ingestion materializes uploads into the system temp directory; nothing
//! may be left there afterwards. This lives in its own test binary so no
//! other test in the process is creating temp files while we scan.

use std::collections::BTreeSet;
use std::path::PathBuf;

use quackpad::ingest::{self, IngestOutcome, UploadedFile};
use quackpad::session::Session;

fn staged_temp_entries() -> BTreeSet<PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with("quackpad-"))
        })
        .collect()
}

#[test]
fn ingestion_removes_its_temp_files_on_every_path() {
    let before = staged_temp_entries();

    let mut session = Session::new();
    let conn = session.connection().unwrap();

    // Success path.
    let json = r#"[{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]"#;
    let outcomes = ingest::ingest(
        conn,
        &[UploadedFile::new("records.json", json.as_bytes().to_vec())],
    );
    assert!(matches!(
        outcomes[0],
        IngestOutcome::Registered { rows: 2, .. }
    ));

    // Failure path: the engine rejects the content after the file is staged.
    let outcomes = ingest::ingest(
        conn,
        &[UploadedFile::new(
            "broken.json",
            b"{{{{not json".to_vec(),
        )],
    );
    assert!(matches!(outcomes[0], IngestOutcome::Failed { .. }));

    let leaked: Vec<_> = staged_temp_entries().difference(&before).cloned().collect();
    assert!(leaked.is_empty(), "temp files left behind: {leaked:?}");
}

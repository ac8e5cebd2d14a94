//! CRUD, sequences, and validation against a real store file.

use folio::{Error, Folio, Options};
use tempfile::TempDir;

const NAME: &str = "docs.folio";

fn open(dir: &TempDir) -> Folio {
    Folio::open(dir.path(), NAME, Options::default()).unwrap()
}

fn history_of(db: &Folio, label: &str) -> Vec<(String, u64)> {
    let mut out = Vec::new();
    db.history(label, |content, ts| {
        out.push((content, ts));
        true
    })
    .unwrap();
    out
}

#[test]
fn round_trip_and_reopen() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    db.set("readme", "hi").unwrap();
    assert_eq!(db.get("readme").unwrap(), "hi");
    db.close().unwrap();

    let db = open(&dir);
    assert_eq!(db.get("readme").unwrap(), "hi");
}

#[test]
fn update_keeps_every_version_in_order() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    db.set("d", "v1").unwrap();
    db.set("d", "v2").unwrap();
    db.set("d", "v3").unwrap();

    assert_eq!(db.get("d").unwrap(), "v3");
    let h = history_of(&db, "d");
    assert_eq!(
        h.iter().map(|(c, _)| c.as_str()).collect::<Vec<_>>(),
        ["v1", "v2", "v3"]
    );
    assert!(h.windows(2).all(|w| w[0].1 <= w[1].1));
}

#[test]
fn delete_preserves_history() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    for v in ["v1", "v2", "v3"] {
        db.set("d", v).unwrap();
    }
    db.delete("d").unwrap();

    assert!(matches!(db.get("d"), Err(Error::NotFound)));
    assert!(!db.exists("d").unwrap());
    assert_eq!(history_of(&db, "d").len(), 3);
}

#[test]
fn missing_labels() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    db.set("present", "x").unwrap();

    assert!(matches!(db.get("absent"), Err(Error::NotFound)));
    assert!(matches!(db.delete("absent"), Err(Error::NotFound)));
    assert!(!db.exists("absent").unwrap());
    assert!(db.exists("present").unwrap());
    assert!(history_of(&db, "absent").is_empty());
}

#[test]
fn label_and_content_validation() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);

    assert!(matches!(db.set("", "x"), Err(Error::InvalidLabel(_))));
    assert!(matches!(db.set("has\"quote", "x"), Err(Error::InvalidLabel(_))));
    assert!(matches!(db.set("has\ncontrol", "x"), Err(Error::InvalidLabel(_))));
    assert!(matches!(db.set(&"x".repeat(257), "x"), Err(Error::LabelTooLong)));
    assert!(matches!(db.set("ok", ""), Err(Error::EmptyContent)));

    // 256 bytes is still legal.
    db.set(&"x".repeat(256), "x").unwrap();
}

#[test]
fn awkward_labels_and_content_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);

    let label = "notes\\2026/α β";
    let content = "line1\nline2\ttabbed \"quoted\" \\escaped\\ αβγ";
    db.set(label, content).unwrap();
    assert_eq!(db.get(label).unwrap(), content);

    db.close().unwrap();
    let db = open(&dir);
    assert_eq!(db.get(label).unwrap(), content);
    assert_eq!(history_of(&db, label)[0].0, content);
}

#[test]
fn rename_moves_content_not_history() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    db.set("old", "v1").unwrap();
    db.set("old", "v2").unwrap();
    db.set("other", "x").unwrap();

    assert!(matches!(db.rename("missing", "new"), Err(Error::NotFound)));
    assert!(matches!(db.rename("old", "other"), Err(Error::Exists)));

    db.rename("old", "new").unwrap();
    assert_eq!(db.get("new").unwrap(), "v2");
    assert!(matches!(db.get("old"), Err(Error::NotFound)));

    // Preserved behaviour: history stays under the old label.
    assert_eq!(history_of(&db, "old").len(), 2);
    assert_eq!(history_of(&db, "new").len(), 1);
}

#[test]
fn list_yields_each_label_once() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    for label in ["a", "b", "c"] {
        db.set(label, "1").unwrap();
    }
    db.set("a", "2").unwrap();
    db.delete("c").unwrap();

    let mut labels = Vec::new();
    db.list(|l| {
        labels.push(l.to_owned());
        true
    })
    .unwrap();
    labels.sort();
    assert_eq!(labels, ["a", "b"]);
}

#[test]
fn all_yields_live_pairs() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    db.set("a", "1").unwrap();
    db.set("b", "2").unwrap();
    db.set("a", "1-updated").unwrap();

    let mut pairs = Vec::new();
    db.all(|l, c| {
        pairs.push((l.to_owned(), c.to_owned()));
        true
    })
    .unwrap();
    pairs.sort();
    assert_eq!(
        pairs,
        [
            ("a".to_owned(), "1-updated".to_owned()),
            ("b".to_owned(), "2".to_owned())
        ]
    );
}

#[test]
fn sequences_honour_early_break() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    for i in 0..10 {
        db.set(&format!("doc-{i}"), "x").unwrap();
        db.set("multi", &format!("v{i}")).unwrap();
    }

    let mut seen = 0;
    db.list(|_| {
        seen += 1;
        false
    })
    .unwrap();
    assert_eq!(seen, 1);

    let mut versions = 0;
    db.history("multi", |_, _| {
        versions += 1;
        versions < 3
    })
    .unwrap();
    assert_eq!(versions, 3);
}

#[test]
fn search_and_match() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    db.set("notes/today", "remember the milk").unwrap();
    db.set("notes/tomorrow", "remember the eggs").unwrap();
    db.set("journal", "Milk was remembered.").unwrap();

    let opts = folio::SearchOptions::default();
    let mut hits = Vec::new();
    db.search("milk", &opts, |l, _| {
        hits.push(l.to_owned());
        true
    })
    .unwrap();
    assert_eq!(hits, ["notes/today"]);

    let ci = folio::SearchOptions { case_insensitive: true };
    let mut hits = Vec::new();
    db.search("milk", &ci, |l, _| {
        hits.push(l.to_owned());
        true
    })
    .unwrap();
    hits.sort();
    assert_eq!(hits, ["journal", "notes/today"]);

    let mut labels = Vec::new();
    db.match_labels("^notes/", &opts, |l| {
        labels.push(l.to_owned());
        true
    })
    .unwrap();
    labels.sort();
    assert_eq!(labels, ["notes/today", "notes/tomorrow"]);

    assert!(matches!(
        db.search("(unclosed", &opts, |_, _| true),
        Err(Error::InvalidPattern(_))
    ));
}

#[test]
fn closed_store_rejects_everything() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    db.set("a", "1").unwrap();
    db.close().unwrap();

    assert!(matches!(db.get("a"), Err(Error::Closed)));
    assert!(matches!(db.set("a", "2"), Err(Error::Closed)));
    assert!(matches!(db.delete("a"), Err(Error::Closed)));
    assert!(matches!(db.compact(), Err(Error::Closed)));
    assert!(matches!(db.list(|_| true), Err(Error::Closed)));
    assert!(matches!(db.close(), Err(Error::Closed)));
}

#[test]
fn bloom_filter_store_behaves_identically() {
    let dir = TempDir::new().unwrap();
    let db = Folio::open(
        dir.path(),
        NAME,
        Options {
            bloom_filter: true,
            ..Options::default()
        },
    )
    .unwrap();

    for i in 0..50 {
        db.set(&format!("doc-{i}"), &format!("content {i}")).unwrap();
    }
    for i in 0..50 {
        assert_eq!(db.get(&format!("doc-{i}")).unwrap(), format!("content {i}"));
    }
    assert!(matches!(db.get("never-set"), Err(Error::NotFound)));
    db.delete("doc-7").unwrap();
    assert!(matches!(db.get("doc-7"), Err(Error::NotFound)));
}

#[test]
fn many_labels_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    for i in 0..200 {
        db.set(&format!("doc-{i:03}"), &format!("payload {i}")).unwrap();
    }
    db.close().unwrap();

    let db = open(&dir);
    for i in 0..200 {
        assert_eq!(db.get(&format!("doc-{i:03}")).unwrap(), format!("payload {i}"));
    }
    let info = db.info().unwrap();
    assert_eq!(info.live_count, 200);
}

#[test]
fn last_write_wins_per_label() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let labels = ["a", "b", "c", "a", "b", "a"];
    for (i, label) in labels.iter().enumerate() {
        db.set(label, &format!("v{i}")).unwrap();
    }
    assert_eq!(db.get("a").unwrap(), "v5");
    assert_eq!(db.get("b").unwrap(), "v4");
    assert_eq!(db.get("c").unwrap(), "v2");
}

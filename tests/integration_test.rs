use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use compact_str::CompactString;

use folder_import::config::settings::Settings;
use folder_import::core::events::{create_event_channel, Event};
use folder_import::core::extension::{extension_of, is_pdf, normalize};
use folder_import::core::progress::{ProgressSink, ProgressTracker};
use folder_import::core::scanner::Scanner;
use folder_import::error::ScanError;
use folder_import::export::json::export_json;
use folder_import::models::node::ScanNode;
use folder_import::models::params::ExtensionFilter;
use folder_import::ui::prompt::{parse_selection, read_selection};
use folder_import::ui::widgets::progress_bar::truncate_label;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a unique temporary directory for a test.
fn make_test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("folder_import_test_{}", name));
    let _ = std::fs::remove_dir_all(&dir); // clean up from previous runs
    std::fs::create_dir_all(&dir).expect("create test dir");
    dir
}

/// Remove a temporary test directory.
fn cleanup(dir: &PathBuf) {
    let _ = std::fs::remove_dir_all(dir);
}

fn touch(dir: &Path, rel: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, rel).expect("write file");
}

fn test_settings() -> Settings {
    Settings {
        max_concurrent_io: 4,
        follow_symlinks: false,
        file_delay_ms: 0,
        settle_delay_ms: 0,
        shortcut_extensions: vec!["lnk".into()],
        library_dir: std::env::temp_dir().join("folder_import_library_test"),
    }
}

async fn scan(dir: &Path) -> Result<ScanNode, ScanError> {
    let (event_tx, _rx) = create_event_channel();
    Scanner::new(test_settings(), event_tx)
        .scan(dir.to_path_buf())
        .await
}

fn exts(list: &[&str]) -> BTreeSet<CompactString> {
    list.iter().map(|e| CompactString::from(*e)).collect()
}

fn child<'a>(node: &'a ScanNode, name: &str) -> &'a ScanNode {
    node.children
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no child {name} under {}", node.path.display()))
}

/// Checks that every node's set is its own files' extensions plus the
/// children's sets.
fn assert_aggregated(node: &ScanNode) {
    let mut expected: BTreeSet<CompactString> =
        node.files.iter().filter_map(|f| extension_of(f)).collect();
    for c in &node.children {
        assert_aggregated(c);
        expected.extend(c.extensions.iter().cloned());
    }
    assert_eq!(node.extensions, expected, "at {}", node.path.display());
}

/// root/{a.pdf, b.txt, c.lnk, sub/{d.pdf, e.md}, empty/}, built in memory.
fn sample_tree() -> ScanNode {
    let sub = ScanNode::from_directory(
        PathBuf::from("/test/sub"),
        "sub".into(),
        vec![PathBuf::from("/test/sub/d.pdf"), PathBuf::from("/test/sub/e.md")],
        vec![],
    );
    let empty = ScanNode::from_directory(
        PathBuf::from("/test/empty"),
        "empty".into(),
        vec![],
        vec![],
    );
    ScanNode::from_directory(
        PathBuf::from("/test"),
        CompactString::default(),
        vec![
            PathBuf::from("/test/a.pdf"),
            PathBuf::from("/test/b.txt"),
            PathBuf::from("/test/c.lnk"),
        ],
        vec![sub, empty],
    )
}

// ---------------------------------------------------------------------------
// 1. Scanner builds the tree and aggregates extensions bottom-up
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_scan_aggregates_extensions() {
    let dir = make_test_dir("scan_aggregate");
    touch(&dir, "a.pdf");
    touch(&dir, "notes.TXT");
    touch(&dir, ".gitignore");
    touch(&dir, "README");
    touch(&dir, "sub/b.txt");
    touch(&dir, "sub/deep/c.Md");
    touch(&dir, "sub/deep/deeper/d.tar.gz");
    std::fs::create_dir_all(dir.join("hollow")).unwrap();

    let root = scan(&dir).await.expect("scan should succeed");

    assert!(root.is_root());
    assert_eq!(root.name, "");
    assert_eq!(root.path, dir);
    assert_eq!(root.files.len(), 4);
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.extensions, exts(&["gz", "md", "pdf", "txt"]));

    let sub = child(&root, "sub");
    assert_eq!(sub.files, vec![dir.join("sub/b.txt")]);
    assert_eq!(sub.extensions, exts(&["gz", "md", "txt"]));

    let deep = child(sub, "deep");
    assert_eq!(deep.extensions, exts(&["gz", "md"]));
    let deeper = child(deep, "deeper");
    assert_eq!(deeper.extensions, exts(&["gz"]));

    let hollow = child(&root, "hollow");
    assert!(hollow.files.is_empty());
    assert!(hollow.extensions.is_empty());

    assert_aggregated(&root);
    assert_eq!(root.file_count(), 7);
    assert_eq!(root.dir_count(), 5);

    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// 2. Scanner failures are fatal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_scan_missing_dir_fails() {
    let dir = make_test_dir("scan_missing");
    let missing = dir.join("does-not-exist");

    let err = scan(&missing).await.expect_err("scan must fail");
    assert!(matches!(err, ScanError::ReadDir { .. }), "got {err:?}");

    cleanup(&dir);
}

#[tokio::test]
async fn test_scan_rejects_file_root() {
    let dir = make_test_dir("scan_file_root");
    touch(&dir, "plain.txt");

    let err = scan(&dir.join("plain.txt")).await.expect_err("scan must fail");
    assert!(matches!(err, ScanError::NotADirectory(_)), "got {err:?}");

    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// 3. Scanner emits lifecycle events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_scan_events() {
    let dir = make_test_dir("scan_events");
    touch(&dir, "a.pdf");
    touch(&dir, "sub/b.pdf");

    let (event_tx, mut rx) = create_event_channel();
    let scanner = Scanner::new(test_settings(), event_tx);
    scanner.scan(dir.clone()).await.expect("scan should succeed");
    assert_eq!(scanner.dirs_scanned(), 2);
    drop(scanner);

    let mut scanned_dirs = 0;
    let mut completed = None;
    while let Some(event) = rx.recv().await {
        match event {
            Event::DirectoryScanned { .. } => scanned_dirs += 1,
            Event::ScanCompleted { total_files, total_dirs, .. } => {
                completed = Some((total_files, total_dirs))
            }
            _ => {}
        }
    }
    assert_eq!(scanned_dirs, 2);
    assert_eq!(completed, Some((2, 2)));

    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// 4. Directory links are skipped unless followed
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[tokio::test]
async fn test_scan_symlinks() {
    let dir = make_test_dir("scan_symlinks");
    touch(&dir, "real/a.pdf");
    touch(&dir, "outside.md");
    std::os::unix::fs::symlink(dir.join("real"), dir.join("alias")).unwrap();
    std::os::unix::fs::symlink(dir.join("outside.md"), dir.join("real/linked.md")).unwrap();

    let root = scan(&dir).await.expect("scan should succeed");
    assert_eq!(root.children.len(), 1, "directory link is not followed");
    assert_eq!(child(&root, "real").extensions, exts(&["md", "pdf"]));

    let mut settings = test_settings();
    settings.follow_symlinks = true;
    let (event_tx, _rx) = create_event_channel();
    let followed = Scanner::new(settings, event_tx)
        .scan(dir.clone())
        .await
        .expect("scan should succeed");
    // `real` and `alias` resolve to the same directory; only one is kept.
    assert_eq!(followed.children.len(), 1);

    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// 5. Extension rules
// ---------------------------------------------------------------------------

#[test]
fn test_extension_edge_cases() {
    assert_eq!(extension_of(Path::new("/x/.gitignore")), None);
    assert_eq!(extension_of(Path::new("/x/.config.json")), None);
    assert_eq!(extension_of(Path::new("/x/report")), None);
    assert_eq!(extension_of(Path::new("/x/trailing.")), None);
    assert_eq!(extension_of(Path::new("/x/Report.PDF")).as_deref(), Some("pdf"));
    assert_eq!(extension_of(Path::new("/x/archive.tar.gz")).as_deref(), Some("gz"));
    assert_eq!(extension_of(Path::new("/dotted.dir/plain")), None);

    assert!(is_pdf(Path::new("/x/c.PDF")));
    assert!(!is_pdf(Path::new("/x/pdf")));

    assert_eq!(normalize(".PDF").as_deref(), Some("pdf"));
    assert_eq!(normalize("  txt ").as_deref(), Some("txt"));
    assert_eq!(normalize("."), None);
}

#[test]
fn test_extension_filter() {
    let filter = ExtensionFilter::new([".PDF", " txt ", ""]);
    assert_eq!(filter.len(), 2);
    assert!(filter.contains("pdf"));
    assert!(filter.accepts(Path::new("/a/Paper.Pdf")));
    assert!(!filter.accepts(Path::new("/a/pdf")));
    assert!(!filter.accepts(Path::new("/a/.pdf")));
    assert_eq!(filter.to_string(), "pdf, txt");
}

// ---------------------------------------------------------------------------
// 6. selected / matches
// ---------------------------------------------------------------------------

#[test]
fn test_selected_counts() {
    let root = sample_tree();
    assert_aggregated(&root);

    assert_eq!(root.selected(&ExtensionFilter::new(["pdf"])), 2);
    assert_eq!(root.selected(&ExtensionFilter::new(["pdf", "md"])), 3);
    assert_eq!(root.selected(&ExtensionFilter::new(["zip"])), 0);
    assert_eq!(root.selected(&ExtensionFilter::default()), 0);
    // Pure: same answer twice.
    assert_eq!(root.selected(&ExtensionFilter::new(["pdf"])), 2);

    assert!(root.matches(&ExtensionFilter::new(["md"])));
    assert!(!child(&root, "sub").matches(&ExtensionFilter::new(["txt"])));
    assert!(!child(&root, "empty").matches(&ExtensionFilter::new(["pdf"])));

    assert_eq!(root.count_extension("lnk"), 1);
    assert_eq!(root.count_extension("pdf"), 2);
}

// ---------------------------------------------------------------------------
// 7. Progress tracking
// ---------------------------------------------------------------------------

#[test]
fn test_progress_label_and_clamp() {
    let tracker = ProgressTracker::new(10);
    assert_eq!(tracker.percent(), 0.0);
    for _ in 0..3 {
        tracker.file_processed();
    }
    assert_eq!(tracker.done(), 3);
    assert_eq!(tracker.label(), "Imported  3/10...");
    assert!((tracker.percent() - 30.0).abs() < f64::EPSILON);

    let over = ProgressTracker::new(1);
    over.file_processed();
    over.file_processed();
    assert_eq!(over.done(), 2);
    assert_eq!(over.percent(), 100.0);

    assert_eq!(ProgressTracker::new(0).percent(), 100.0);
}

// ---------------------------------------------------------------------------
// 8. Selection prompt parsing
// ---------------------------------------------------------------------------

#[test]
fn test_parse_selection() {
    let root = sample_tree();

    let all = parse_selection("\n", &root).expect("enter keeps all");
    assert_eq!(all.len(), root.extensions.len());

    assert!(parse_selection("q\n", &root).is_none());
    assert!(parse_selection("Q", &root).is_none());

    let some = parse_selection(".PDF, md zip", &root).expect("selection");
    assert_eq!(some, ExtensionFilter::new(["pdf", "md"]));

    assert!(parse_selection("zip", &root).is_none(), "nothing known selected");
}

#[test]
fn test_read_selection_end_of_input_cancels() {
    let root = sample_tree();

    assert!(read_selection(std::io::Cursor::new(""), &root).is_none());

    let all = read_selection(std::io::Cursor::new("\n"), &root).expect("enter keeps all");
    assert_eq!(all.len(), root.extensions.len());

    let pdf = read_selection(std::io::Cursor::new("pdf\nmd\n"), &root).expect("first line");
    assert_eq!(pdf, ExtensionFilter::new(["pdf"]));
}

#[test]
fn test_truncate_label() {
    assert_eq!(truncate_label("Importing", 20), "Importing");
    assert_eq!(truncate_label("Importing attachments...", 10), "Importi...");
    assert_eq!(truncate_label("abcdef", 2), "..");
}

// ---------------------------------------------------------------------------
// 9. JSON export
// ---------------------------------------------------------------------------

#[test]
fn test_export_json() {
    let root = sample_tree();

    let dir = make_test_dir("export_json");
    let out_path = dir.join("scan.json");

    export_json(&root, &out_path).expect("export should succeed");

    let json_bytes = std::fs::read(&out_path).expect("read exported file");
    let restored: ScanNode = serde_json::from_slice(&json_bytes).expect("deserialize");

    assert_eq!(restored.extensions, root.extensions);
    assert_eq!(restored.children.len(), 2);
    assert_eq!(restored.file_count(), 5);

    cleanup(&dir);
}

// ---------------------------------------------------------------------------
// 10. Settings
// ---------------------------------------------------------------------------

#[test]
fn test_settings_default() {
    let s = Settings::default();

    assert!(!s.follow_symlinks);
    assert!(s.max_concurrent_io > 0);
    assert_eq!(s.file_delay_ms, 10);
    assert_eq!(s.settle_delay_ms, 10);
    assert_eq!(s.shortcut_extensions, vec![CompactString::from("lnk")]);
    assert!(s.file_delay().is_some());

    let quiet = Settings {
        file_delay_ms: 0,
        ..Settings::default()
    };
    assert!(quiet.file_delay().is_none());
}

//! Integration tests for pdf-fmt.
//!
//! These drive the public API end to end with `.txt` inputs (pages separated
//! by form feeds), so they need no pdfium library and run everywhere.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use pdf_fmt::{
    convert, convert_sync, convert_to_file, format_text, load_config, process_images, FmtError,
    PageSeparator, PipelineConfig, RawText, RunProgressCallback, SpellingLocale,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

// ── Test helpers ─────────────────────────────────────────────────────────────

const FOOTER_YAML: &str = r#"
filters:
  footer_regexes:
    - '^\s*\d+\s*$'
    - '^.*\s*[A-Za-z]+\d+\s.*$'
    - '^.*Copyright.*$'
    - '^Page\s\d.*$'
formatting:
  page_separator: '___'
"#;

fn write_input(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn write_config(dir: &Path, yaml: &str) -> PipelineConfig {
    let path = dir.join("pdf-fmt.yaml");
    std::fs::write(&path, yaml).unwrap();
    load_config(&path).unwrap()
}

#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    pages: AtomicUsize,
    completed: AtomicUsize,
}

impl RunProgressCallback for Counting {
    fn on_run_start(&self, total_pages: usize) {
        self.started.store(total_pages, Ordering::SeqCst);
    }
    fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _lines: usize) {
        self.pages.fetch_add(1, Ordering::SeqCst);
    }
    fn on_run_complete(&self, _total_pages: usize, output_lines: usize) {
        self.completed.store(output_lines, Ordering::SeqCst);
    }
}

// ── Text pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_footer_scenario_from_yaml_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), FOOTER_YAML);
    let input = write_input(
        dir.path(),
        "doc.txt",
        "Normal line.\nPage 5 out of 10.\nIT1234 - Module Code\n\n25\n\nCopyright 2024",
    );

    let out = convert(&input, &config).await.unwrap();
    assert_eq!(out.text, "Normal line.");
    assert_eq!(out.pages[0].lines, vec!["Normal line."]);
    assert_eq!(out.stats.dropped_footers, 4);
}

#[tokio::test]
async fn test_blank_page_keeps_its_separator() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "doc.txt", "first\u{000C}  \n\u{000C}third\u{000C}\n");
    let out = convert(&input, &PipelineConfig::default()).await.unwrap();
    assert_eq!(out.text, "first\n--- Page 2 ---\n--- Page 3 ---\nthird");
    assert_eq!(out.stats.total_pages, 3);
    assert_eq!(out.stats.formatted_pages, 2);
}

#[tokio::test]
async fn test_parallel_output_matches_single_worker() {
    let pages: Vec<String> = (0..24)
        .map(|i| format!("Heading {i}\nsome body text on page {i} that continues\nand ends here."))
        .collect();
    let raw = RawText::new(pages.join("\u{000C}"));

    let one = PipelineConfig::builder().workers(1).min_chars_per_line(30).build();
    let many = PipelineConfig::builder().workers(8).min_chars_per_line(30).build();
    let a = format_text(&raw, &one).await.unwrap();
    let b = format_text(&raw, &many).await.unwrap();
    assert_eq!(a.text, b.text);
    assert!(a.text.contains("--- Page 24 ---"));
}

#[tokio::test]
async fn test_british_spelling_with_ignore_list() {
    let raw = RawText::new("The Color of the center.\ncolor stays here");
    let config = PipelineConfig::builder()
        .spelling_locale(SpellingLocale::EnUk)
        .page_separator(PageSeparator::None)
        .build();
    let out = format_text(&raw, &config).await.unwrap();
    assert!(out.text.starts_with("The Colour of the centre."), "got {:?}", out.text);

    let config = PipelineConfig::builder()
        .spelling_locale(SpellingLocale::EnUk)
        .ignore_locale_strings(vec!["Color".into()])
        .build();
    let out = format_text(&raw, &config).await.unwrap();
    assert!(out.text.contains("Color of the centre."), "got {:?}", out.text);
}

#[tokio::test]
async fn test_progress_callback_sees_every_page() {
    let cb = Arc::new(Counting::default());
    let config = PipelineConfig::builder().progress_callback(cb.clone()).build();
    let raw = RawText::new("a\u{000C}b\u{000C}c\u{000C}d");
    let out = format_text(&raw, &config).await.unwrap();

    assert_eq!(cb.started.load(Ordering::SeqCst), 4);
    assert_eq!(cb.pages.load(Ordering::SeqCst), 4);
    assert_eq!(cb.completed.load(Ordering::SeqCst), out.stats.output_lines);
}

#[derive(Default)]
struct ThreadLog {
    threads: Mutex<Vec<ThreadId>>,
}

impl RunProgressCallback for ThreadLog {
    fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _lines: usize) {
        self.threads.lock().unwrap().push(std::thread::current().id());
    }
}

#[tokio::test]
async fn test_page_events_fire_from_workers() {
    let cb = Arc::new(ThreadLog::default());
    let config = PipelineConfig::builder()
        .workers(4)
        .progress_callback(cb.clone())
        .build();
    let raw = RawText::new("a\u{000C}b\u{000C}c\u{000C}d\u{000C}e\u{000C}f");
    format_text(&raw, &config).await.unwrap();

    let caller = std::thread::current().id();
    let threads = cb.threads.lock().unwrap();
    assert_eq!(threads.len(), 6);
    assert!(threads.iter().all(|t| *t != caller));
}

#[tokio::test]
async fn test_json_serialisable() {
    let out = format_text(&RawText::new("one\u{000C}two"), &PipelineConfig::default())
        .await
        .unwrap();
    let json = serde_json::to_string(&out).unwrap();
    assert!(json.contains("\"text\""));
    assert!(json.contains("\"total_pages\":2"));
    assert!(!json.contains("\"images\""));
}

// ── Files ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_to_file_writes_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "doc.txt", "hello\u{000C}world");
    let output = dir.path().join("out/nested/doc.txt");

    let stats = convert_to_file(&input, &output, &PipelineConfig::default())
        .await
        .unwrap();
    assert_eq!(stats.total_pages, 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "hello\n--- Page 2 ---\nworld"
    );
    assert!(!output.with_extension("txt.tmp").exists());
}

#[test]
fn test_convert_sync_matches_async() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "doc.txt", "sync run");
    let out = convert_sync(&input, &PipelineConfig::default()).unwrap();
    assert_eq!(out.text, "sync run");
}

#[tokio::test]
async fn test_unsupported_and_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let docx = write_input(dir.path(), "slides.pptx", "PK");
    let err = convert(&docx, &PipelineConfig::default()).await.unwrap_err();
    assert!(matches!(err, FmtError::UnsupportedFormat { .. }));

    let err = convert(dir.path().join("absent.txt"), &PipelineConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FmtError::FileNotFound { .. }));
}

// ── Images ───────────────────────────────────────────────────────────────────

fn checkerboard(cell: u32) -> image::RgbImage {
    image::RgbImage::from_fn(64, 64, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            image::Rgb([240, 240, 240])
        } else {
            image::Rgb([15, 15, 15])
        }
    })
}

fn gradient() -> image::RgbImage {
    image::RgbImage::from_fn(64, 64, |x, _| image::Rgb([(x * 4) as u8, 0, 255 - (x * 4) as u8]))
}

#[tokio::test]
async fn test_process_images_dedups_and_renames() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    checkerboard(8).save(d.join("img-p001-1.png")).unwrap();
    checkerboard(8).save(d.join("img-p001-2.png")).unwrap();
    gradient().save(d.join("img-p003-1.png")).unwrap();
    std::fs::write(d.join("scan.bmp"), b"BM").unwrap();
    std::fs::write(d.join("notes.png"), b"untouched").unwrap();

    let config = PipelineConfig::builder().workers(2).build();
    let stats = process_images(d, "My Report.pdf", &config).await;

    assert_eq!(stats.discovered, 3);
    assert_eq!(stats.bmp_discarded, 1);
    assert_eq!(stats.duplicates_discarded, 1);
    assert_eq!(stats.written, 2);
    assert_eq!(stats.skipped, 0);

    let mut names: Vec<String> = std::fs::read_dir(d)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert!(names.contains(&"notes.png".to_string()));
    assert!(!names.iter().any(|n| n.ends_with(".bmp")));
    let renamed: Vec<&String> = names.iter().filter(|n| n.starts_with("My_Report_")).collect();
    assert_eq!(renamed.len(), 2, "got {names:?}");
    // Sequence ids follow directory order, so only the page part is fixed.
    assert!(renamed.iter().any(|n| n.contains("_1.")));
    assert!(renamed.iter().any(|n| n.contains("_3.")));
    assert!(renamed.iter().all(|n| n.ends_with(".png")));
}

#[tokio::test]
async fn test_process_images_on_missing_dir_is_empty() {
    let stats = process_images(
        Path::new("/nonexistent/images"),
        "doc.pdf",
        &PipelineConfig::default(),
    )
    .await;
    assert_eq!(stats.discovered, 0);
    assert_eq!(stats.written, 0);
}

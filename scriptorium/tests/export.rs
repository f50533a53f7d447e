use tempfile::tempdir;

use scriptorium::state::{ChapterExercises, CodeExample};
use scriptorium::ExportManager;

#[test]
fn exports_chapter_with_frontmatter_and_sections() {
    let dir = tempdir().unwrap();
    let manager = ExportManager::new(dir.path()).unwrap();

    let path = manager
        .export_chapter(
            3,
            "Ownership & Borrowing",
            "# Ownership\n\nBody text.",
            &[CodeExample {
                description: "move semantics".to_string(),
                code: "let a = b;".to_string(),
            }],
            &ChapterExercises::default(),
        )
        .unwrap();

    assert!(path
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("chapter-03-ownership-borrowing"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("---\nchapter: 3\ntitle: \"Ownership & Borrowing\""));
    assert!(content.contains("# Ownership"));
    assert!(content.contains("## Code Examples"));
    assert!(content.contains("let a = b;"));
    // No exercises were supplied, so no exercises section is rendered.
    assert!(!content.contains("## Exercises"));
}

#[test]
fn lists_chapters_in_order_and_finds_by_number() {
    let dir = tempdir().unwrap();
    let manager = ExportManager::new(dir.path()).unwrap();
    let empty = ChapterExercises::default();

    manager
        .export_chapter(2, "Second", "b", &[], &empty)
        .unwrap();
    manager
        .export_chapter(1, "First", "a", &[], &empty)
        .unwrap();

    let chapters = manager.list_exported_chapters().unwrap();
    assert_eq!(chapters.len(), 2);
    assert!(chapters[0].to_str().unwrap().contains("chapter-01"));
    assert!(chapters[1].to_str().unwrap().contains("chapter-02"));

    let second = manager.chapter_path(2).unwrap().unwrap();
    assert!(second.to_str().unwrap().contains("second"));
    assert!(manager.chapter_path(9).unwrap().is_none());
}

#[test]
fn exports_article_with_topic_slug() {
    let dir = tempdir().unwrap();
    let manager = ExportManager::new(dir.path()).unwrap();

    let path = manager
        .export_article("AI in Healthcare", "The draft body.")
        .unwrap();
    assert!(path.to_str().unwrap().ends_with("ai-in-healthcare.md"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("title: \"AI in Healthcare\""));
    assert!(content.contains("The draft body."));
}

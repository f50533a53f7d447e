//! Markdown export of finished articles and chapters.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::state::{ChapterExercises, CodeExample};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes markdown files with YAML frontmatter into one output directory.
#[derive(Debug, Clone)]
pub struct ExportManager {
    output_dir: PathBuf,
}

impl ExportManager {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self, ExportError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `chapter-NN-slug.md` with frontmatter, content, and optional code
    /// example / exercise sections.
    pub fn export_chapter(
        &self,
        chapter_number: u32,
        chapter_title: &str,
        content: &str,
        code_examples: &[CodeExample],
        exercises: &ChapterExercises,
    ) -> Result<PathBuf, ExportError> {
        let slug = slugify(chapter_title);
        let filename = format!("chapter-{chapter_number:02}-{slug}.md");
        let path = self.output_dir.join(filename);

        let mut parts = vec![frontmatter(chapter_number, chapter_title), content.to_string()];
        if !code_examples.is_empty() {
            parts.push("\n---\n".to_string());
            parts.push(code_examples_section(code_examples));
        }
        if !exercises.is_empty() {
            parts.push("\n---\n".to_string());
            parts.push(exercises_section(exercises));
        }

        fs::write(&path, parts.join("\n\n"))?;
        Ok(path)
    }

    /// Exports a standalone article as `slug.md`.
    pub fn export_article(&self, topic: &str, draft: &str) -> Result<PathBuf, ExportError> {
        let slug = slugify(topic);
        let path = self.output_dir.join(format!("{slug}.md"));
        let body = format!(
            "---\ntitle: \"{topic}\"\ndate: {date}\n---\n\n{draft}\n",
            date = chrono::Utc::now().format("%Y-%m-%d"),
        );
        fs::write(&path, body)?;
        Ok(path)
    }

    pub fn list_exported_chapters(&self) -> Result<Vec<PathBuf>, ExportError> {
        let mut chapters: Vec<PathBuf> = fs::read_dir(&self.output_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with("chapter-") && name.ends_with(".md"))
                    .unwrap_or(false)
            })
            .collect();
        chapters.sort();
        Ok(chapters)
    }

    pub fn chapter_path(&self, chapter_number: u32) -> Result<Option<PathBuf>, ExportError> {
        let prefix = format!("chapter-{chapter_number:02}-");
        Ok(self
            .list_exported_chapters()?
            .into_iter()
            .find(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(&prefix))
                    .unwrap_or(false)
            }))
    }
}

fn frontmatter(chapter_number: u32, chapter_title: &str) -> String {
    format!(
        "---\nchapter: {chapter_number}\ntitle: \"{chapter_title}\"\ndate: {date}\n---",
        date = chrono::Utc::now().format("%Y-%m-%d"),
    )
}

fn code_examples_section(examples: &[CodeExample]) -> String {
    let mut out = String::from("## Code Examples\n");
    for (index, example) in examples.iter().enumerate() {
        out.push_str(&format!("\n**Example {}:**", index + 1));
        if !example.description.is_empty() {
            out.push_str(&format!(" {}", example.description));
        }
        out.push_str(&format!("\n\n```\n{}\n```\n", example.code));
    }
    out
}

fn exercises_section(exercises: &ChapterExercises) -> String {
    let mut out = String::from("## Exercises\n");
    if !exercises.multiple_choice.is_empty() {
        out.push_str("\n### Multiple Choice\n");
        for (index, exercise) in exercises.multiple_choice.iter().enumerate() {
            out.push_str(&format!("\n{}. {}\n", index + 1, exercise.question));
            for (option_index, option) in exercise.options.iter().enumerate() {
                let letter = (b'a' + option_index as u8) as char;
                out.push_str(&format!("   {letter}) {option}\n"));
            }
        }
    }
    if !exercises.fill_in_blank.is_empty() {
        out.push_str("\n### Fill in the Blank\n");
        for (index, exercise) in exercises.fill_in_blank.iter().enumerate() {
            out.push_str(&format!("\n{}. {}\n", index + 1, exercise.prompt));
        }
    }
    if !exercises.coding_challenges.is_empty() {
        out.push_str("\n### Coding Challenges\n");
        for (index, challenge) in exercises.coding_challenges.iter().enumerate() {
            out.push_str(&format!("\n{}. {}\n", index + 1, challenge.prompt));
        }
    }
    out
}

/// Lowercased, punctuation stripped, spaces and underscores collapsed to
/// single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for ch in title.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_hyphen = false;
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_punctuation_and_collapses_spaces() {
        assert_eq!(slugify("Variables & Data Types"), "variables-data-types");
        assert_eq!(slugify("  Hello   World  "), "hello-world");
        assert_eq!(slugify("snake_case_title"), "snake-case-title");
    }
}

//! Journal documents as seen by the assistant.
//!
//! The host owns the real documents. The assistant needs two things from it:
//! look up a journal's content by name ([`JournalSource`]) and rewrite a
//! placeholder span while a streamed generation is in progress
//! ([`PlaceholderSink`]). [`Journal`] is an in-memory implementation of both.

use std::path::Path;

use regex::{NoExpand, Regex};
use uuid::Uuid;

/// CSS class of the span a streamed generation writes into.
pub const PLACEHOLDER_CLASS: &str = "assistant-wrapper";

/// Looks up journal content by name.
pub trait JournalSource {
    fn journal_content(&self, name: &str) -> Option<&str>;
}

/// Receives placeholder updates during a streamed generation.
pub trait PlaceholderSink {
    /// Replace the content of placeholder `placeholder_id`. Returns `false`
    /// when no document holds that placeholder.
    fn update_placeholder(&mut self, placeholder_id: &str, content: &str) -> bool;
}

/// A fresh placeholder id.
pub fn new_placeholder_id() -> String {
    format!("assistant-{}", Uuid::new_v4())
}

/// Markup for a placeholder span holding `content` (already HTML).
pub fn placeholder_span(placeholder_id: &str, content: &str) -> String {
    format!(r#"<span id="{placeholder_id}" class="{PLACEHOLDER_CLASS}">{content}</span>"#)
}

/// Whether `document` holds an element with id `placeholder_id`.
///
/// Matches the whole attribute, so `assistant-1` never matches `assistant-10`.
pub fn holds_placeholder(document: &str, placeholder_id: &str) -> bool {
    document.contains(&format!(r#"id="{placeholder_id}""#))
}

/// Replace the first span with id `placeholder_id` in `document`.
///
/// Returns `None` if the document holds no such span.
pub fn replace_placeholder(document: &str, placeholder_id: &str, content: &str) -> Option<String> {
    let pattern = format!(
        r#"(?s)<span id="{}"[^>]*>.*?</span>"#,
        regex::escape(placeholder_id)
    );
    let re = Regex::new(&pattern).ok()?;
    if !re.is_match(document) {
        return None;
    }
    let span = placeholder_span(placeholder_id, content);
    Some(re.replacen(document, 1, NoExpand(&span)).into_owned())
}

// ─── In-memory journal ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub name: String,
    pub content: String,
}

/// Named journal entries, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing the content of an existing one with the
    /// same name.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        let name = name.into();
        let content = content.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.content = content,
            None => self.entries.push(JournalEntry { name, content }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// The first entry whose content holds `placeholder_id`.
    pub fn find_by_placeholder(&self, placeholder_id: &str) -> Option<&JournalEntry> {
        self.entries
            .iter()
            .find(|e| holds_placeholder(&e.content, placeholder_id))
    }

    /// Load every `.html`, `.md`, and `.txt` file in `dir` as an entry named
    /// after the file stem. Sorted by name for a stable order.
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("html" | "md" | "txt")
                    )
            })
            .collect();
        files.sort();

        let mut journal = Self::new();
        for path in files {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            journal.insert(name, content);
        }

        tracing::debug!(dir = %dir.display(), entries = journal.entries.len(), "loaded journal");
        Ok(journal)
    }
}

impl JournalSource for Journal {
    fn journal_content(&self, name: &str) -> Option<&str> {
        self.get(name).map(|e| e.content.as_str())
    }
}

impl PlaceholderSink for Journal {
    fn update_placeholder(&mut self, placeholder_id: &str, content: &str) -> bool {
        for entry in &mut self.entries {
            if let Some(updated) = replace_placeholder(&entry.content, placeholder_id, content) {
                entry.content = updated;
                return true;
            }
        }
        false
    }
}

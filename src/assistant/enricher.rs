//! Inline prompt markup inside journal documents.
//!
//! `@assistant[Describe the tavern]` asks for generated text in place.
//! `@assistant[Describe the tavern#Town Notes#]` additionally appends the
//! content of the journal named `Town Notes` to the prompt.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// Separator placed between the prompt and folded-in journal content.
pub const JOURNAL_CONTEXT_HEADER: &str = "\n\nJournal Content:\n";

/// One markup occurrence found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePrompt {
    /// Byte range of the whole `@assistant[...]` markup.
    pub range: Range<usize>,
    pub prompt: String,
    pub journal: Option<String>,
}

fn inline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"@assistant\[([^\]]+?)(?:#([^#\]]+)#)?\]").expect("valid regex")
    })
}

/// Find every markup occurrence, in document order.
pub fn find_inline_prompts(document: &str) -> Vec<InlinePrompt> {
    inline_pattern()
        .captures_iter(document)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let prompt = caps.get(1)?.as_str().trim();
            if prompt.is_empty() {
                return None;
            }
            let journal = caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|name| !name.is_empty());
            Some(InlinePrompt {
                range: whole.range(),
                prompt: prompt.to_string(),
                journal,
            })
        })
        .collect()
}

/// Build the prompt sent to the model, folding in journal context if any.
pub fn compose_prompt(prompt: &str, journal_content: Option<&str>) -> String {
    match journal_content {
        Some(content) => format!("{prompt}{JOURNAL_CONTEXT_HEADER}{content}"),
        None => prompt.to_string(),
    }
}

/// Render generated text for insertion into an HTML journal.
pub fn render_generated(text: &str) -> String {
    format!(
        r#"<span class="assistant-generated-text">{}</span>"#,
        escape_with_breaks(text)
    )
}

/// Render a failure in place of the markup.
pub fn render_error(message: &str) -> String {
    format!(
        r#"<span class="assistant-error">Error: {}</span>"#,
        escape_html(message)
    )
}

/// HTML-escape `text` and turn newlines into `<br>`.
pub fn escape_with_breaks(text: &str) -> String {
    escape_html(text).replace("\r\n", "\n").replace('\n', "<br>")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_prompt_with_journal() {
        let doc = "Intro. @assistant[Describe a tavern#Town Notes#] Outro.";
        let found = find_inline_prompts(doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].prompt, "Describe a tavern");
        assert_eq!(found[0].journal.as_deref(), Some("Town Notes"));
        assert_eq!(&doc[found[0].range.clone()], "@assistant[Describe a tavern#Town Notes#]");
    }

    #[test]
    fn test_find_prompt_with_hash_inside() {
        let found = find_inline_prompts("@assistant[Describe room #3 in detail]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].prompt, "Describe room #3 in detail");
        assert!(found[0].journal.is_none());

        let found = find_inline_prompts("@assistant[Describe room #3#Dungeon Key#]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].prompt, "Describe room #3");
        assert_eq!(found[0].journal.as_deref(), Some("Dungeon Key"));
    }

    #[test]
    fn test_find_multiple_prompts_in_order() {
        let doc = "@assistant[first] and @assistant[ second #Log#]";
        let found = find_inline_prompts(doc);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].prompt, "first");
        assert!(found[0].journal.is_none());
        assert_eq!(found[1].prompt, "second");
        assert_eq!(found[1].journal.as_deref(), Some("Log"));
        assert!(found[0].range.end <= found[1].range.start);
    }

    #[test]
    fn test_malformed_markup_ignored() {
        assert!(find_inline_prompts("@assistant[]").is_empty());
        assert!(find_inline_prompts("@assistant[unterminated").is_empty());
        assert!(find_inline_prompts("@assistant[   ]").is_empty());
    }

    #[test]
    fn test_compose_prompt() {
        assert_eq!(compose_prompt("Hi", None), "Hi");
        assert_eq!(
            compose_prompt("Hi", Some("The tavern is loud.")),
            "Hi\n\nJournal Content:\nThe tavern is loud."
        );
    }

    #[test]
    fn test_render_generated_escapes_and_breaks_lines() {
        assert_eq!(
            render_generated("A <b>bold</b>\nline"),
            r#"<span class="assistant-generated-text">A &lt;b&gt;bold&lt;/b&gt;<br>line</span>"#
        );
    }

    #[test]
    fn test_render_error() {
        assert_eq!(
            render_error("HTTP 500: boom"),
            r#"<span class="assistant-error">Error: HTTP 500: boom</span>"#
        );
    }
}

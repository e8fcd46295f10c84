
use pulldown_cmark::{Event, Parser, TagEnd};
use std::path::Path;
use tracing::debug;

use crate::ChatError;

/// One top-level section of the knowledge-base document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbSection {
    pub title: String,
    pub content: String,
}

/// Load and split the knowledge-base markdown file into sections.
#[inline]
pub fn load(path: &Path) -> crate::Result<Vec<KbSection>> {
    if !path.exists() {
        return Err(ChatError::Config(format!(
            "knowledge base file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let sections = parse_sections(&content);
    debug!(
        "Parsed {} knowledge base sections from {}",
        sections.len(),
        path.display()
    );
    Ok(sections)
}

/// Split markdown into sections on H1 headers.
///
/// Content before the first header lands in an implicit "Introduction"
/// section; sections with no content are dropped.
#[inline]
pub fn parse_sections(content: &str) -> Vec<KbSection> {
    let mut sections = Vec::new();
    let mut current = KbSection {
        title: "Introduction".to_string(),
        content: String::new(),
    };

    for line in content.lines() {
        if let Some(title) = line.strip_prefix("# ") {
            if !current.content.trim().is_empty() {
                sections.push(current);
            }
            current = KbSection {
                title: title.trim().to_string(),
                content: String::new(),
            };
        } else {
            current.content.push_str(line);
            current.content.push('\n');
        }
    }

    if !current.content.trim().is_empty() {
        sections.push(current);
    }

    sections
}

/// Flatten section markdown to plain text for terminal display.
#[inline]
pub fn section_text(markdown: &str) -> String {
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Text(chunk) | Event::Code(chunk) => text.push_str(&chunk),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item)
            | Event::End(TagEnd::CodeBlock) => text.push('\n'),
            _ => {}
        }
    }

    text.trim_end().to_string()
}

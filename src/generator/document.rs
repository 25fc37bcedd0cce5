//! Block-structured view of generated text.
//!
//! Callers may render this structure directly; it is a stable contract
//! alongside the plain-text form.

use serde::{Deserialize, Serialize};

const FALLBACK_TEXT: &str = "Failed to generate content. Please try again with a different prompt.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    fn from_text(text: &str) -> Self {
        Self {
            runs: vec![TextRun {
                text: text.to_string(),
            }],
        }
    }

    fn empty() -> Self {
        Self { runs: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Paragraph>,
}

impl Document {
    /// Split on blank lines into non-empty paragraphs. Empty input yields a
    /// single fixed fallback paragraph so callers always have something to
    /// render.
    pub fn from_plain_text(text: &str) -> Self {
        let mut blocks = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                flush_paragraph(&mut blocks, &mut current);
            } else {
                current.push(line);
            }
        }
        flush_paragraph(&mut blocks, &mut current);

        if blocks.is_empty() {
            blocks.push(Paragraph::from_text(FALLBACK_TEXT));
        }
        Self { blocks }
    }

    /// One paragraph per line, preserving empty lines as empty paragraphs.
    /// Used by the reply flow, where line structure is meaningful.
    pub fn from_lines(text: &str) -> Self {
        let blocks = text
            .lines()
            .map(|line| {
                if line.is_empty() {
                    Paragraph::empty()
                } else {
                    Paragraph::from_text(line)
                }
            })
            .collect();
        Self { blocks }
    }

    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| {
                block
                    .runs
                    .iter()
                    .map(|run| run.text.as_str())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn flush_paragraph(blocks: &mut Vec<Paragraph>, current: &mut Vec<&str>) {
    if current.is_empty() {
        return;
    }
    let text = current.join("\n").trim().to_string();
    if !text.is_empty() {
        blocks.push(Paragraph::from_text(&text));
    }
    current.clear();
}

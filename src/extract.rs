//! Markup reduction for generated responses.
//!
//! Completion backends occasionally wrap email bodies in stray HTML. This
//! module reduces such output to plain text while leaving ordinary prose
//! untouched.

use scraper::ego_tree::NodeRef;
use scraper::{Html, Node};

/// True when the input plausibly contains HTML tags (a `<` immediately
/// followed by a letter or `/`). Plain prose like `a < b` does not qualify.
fn looks_like_markup(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.windows(2).any(|pair| {
        pair[0] == b'<' && (pair[1].is_ascii_alphabetic() || pair[1] == b'/')
    })
}

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "li"
            | "ul"
            | "ol"
            | "blockquote"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "tr"
            | "table"
            | "section"
            | "article"
    )
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if matches!(name, "script" | "style") {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                collect_text(child, out);
                if is_block_element(name) && !out.ends_with("\n\n") {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
}

/// Reduce HTML to plain text. Input without markup is returned unchanged.
///
/// Block-level elements become paragraph breaks and `<br>` becomes a line
/// break; scripts and styles are dropped. Whitespace is not otherwise
/// normalized here; response post-processing owns that.
pub fn html_to_plain_text(input: &str) -> String {
    if !looks_like_markup(input) {
        return input.to_string();
    }

    let fragment = Html::parse_fragment(input);
    let mut out = String::new();
    collect_text(*fragment.root_element(), &mut out);
    out.trim().to_string()
}

//! Plain-text extraction from loosely namespaced article markup.
//!
//! Full-text and abstract documents carry inconsistent (or absent) namespaces, so elements are
//! matched on their unqualified tag name against a small allow-set. For every matching element
//! the leading text (everything before its first child element) is collected in document order;
//! tail text after a child and text nested only inside unlisted elements are ignored.

use quick_xml::Reader;
use quick_xml::events::Event;

/// Body sections of a PMC full-text article: paragraphs, titles and section containers.
pub const PMC_SECTION_TAGS: &[&str] = &["p", "title", "sec"];

/// Abstract-bearing elements of a PubMed efetch document.
pub const ABSTRACT_TAGS: &[&str] = &["AbstractText"];

/// Extract full-text body sections from a PMC article.
pub fn extract(markup: &str) -> Option<String> {
    extract_text(markup, PMC_SECTION_TAGS)
}

/// Extract the abstract paragraphs from a PubMed efetch document.
pub fn extract_abstract(markup: &str) -> Option<String> {
    extract_text(markup, ABSTRACT_TAGS)
}

struct Frame {
    /// Index into the fragment list when this element is in the allow-set.
    slot: Option<usize>,
    /// Cleared once the first child element opens.
    leading: bool,
}

impl Frame {
    fn collecting(&self) -> Option<usize> {
        self.slot.filter(|_| self.leading)
    }
}

/// Concatenate the leading text of every element whose local name is in `tags`.
///
/// Fragments are trimmed, empty ones skipped, and the rest joined with a single space. Returns
/// `None` when the markup is not a single well-formed element tree; a well-formed document
/// without matching text yields `Some("")`.
pub fn extract_text(markup: &str, tags: &[&str]) -> Option<String> {
    let mut reader = Reader::from_str(markup);
    let mut stack: Vec<Frame> = Vec::new();
    let mut fragments: Vec<String> = Vec::new();
    let mut root_closed = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(error) => {
                tracing::debug!(
                    position = reader.buffer_position(),
                    error = %error,
                    "Markup is not well-formed"
                );
                return None;
            }
        };

        match event {
            Event::Start(element) => {
                if root_closed {
                    return None;
                }
                if let Some(parent) = stack.last_mut() {
                    parent.leading = false;
                }
                let slot = allowed(element.local_name().as_ref(), tags).then(|| {
                    fragments.push(String::new());
                    fragments.len() - 1
                });
                stack.push(Frame {
                    slot,
                    leading: true,
                });
            }
            Event::Empty(_) => {
                if root_closed {
                    return None;
                }
                if let Some(parent) = stack.last_mut() {
                    parent.leading = false;
                }
                // A self-closing root is a complete, empty document.
                if stack.is_empty() {
                    root_closed = true;
                }
            }
            Event::End(_) => {
                stack.pop()?;
                if stack.is_empty() {
                    root_closed = true;
                }
            }
            Event::Text(text) => {
                let text = text.unescape().ok()?;
                match stack.last() {
                    Some(frame) => append(&mut fragments, frame.collecting(), &text),
                    None if text.trim().is_empty() => {}
                    None => return None,
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data);
                match stack.last() {
                    Some(frame) => append(&mut fragments, frame.collecting(), &text),
                    None => return None,
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() || !root_closed {
        return None;
    }

    let joined = fragments
        .iter()
        .map(|fragment| fragment.trim())
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(joined)
}

fn allowed(local_name: &[u8], tags: &[&str]) -> bool {
    tags.iter().any(|tag| tag.as_bytes() == local_name)
}

fn append(fragments: &mut [String], slot: Option<usize>, text: &str) {
    let Some(index) = slot else {
        return;
    };
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let fragment = &mut fragments[index];
    if !fragment.is_empty() {
        fragment.push(' ');
    }
    fragment.push_str(text);
}

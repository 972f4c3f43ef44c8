use super::{Document, Item, NodeKind};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Build a linear document from markdown.
///
/// Headings and paragraphs become content regions; lists, list items and
/// block quotes become structural wrappers. Code blocks are skipped and
/// inline code is kept as plain text.
pub fn load(content: &str) -> Document {
    Document::new(parse(content))
}

pub fn parse(content: &str) -> Vec<Item> {
    let mut builder = Builder::default();
    let mut in_code_block = false;

    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                builder.close_implicit();
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
            }
            _ if in_code_block => {}
            Event::Start(Tag::Paragraph) => builder.open(NodeKind::Paragraph),
            Event::Start(Tag::Heading { level, .. }) => {
                builder.open(NodeKind::Heading(level as u8))
            }
            Event::Start(Tag::List(_)) => builder.open(NodeKind::List),
            Event::Start(Tag::Item) => builder.open(NodeKind::ListItem),
            Event::Start(Tag::BlockQuote { .. }) => builder.open(NodeKind::BlockQuote),
            Event::End(TagEnd::Paragraph) => builder.close(NodeKind::Paragraph),
            Event::End(TagEnd::Heading(level)) => builder.close(NodeKind::Heading(level as u8)),
            Event::End(TagEnd::List(_)) => builder.close(NodeKind::List),
            Event::End(TagEnd::Item) => builder.close(NodeKind::ListItem),
            Event::End(TagEnd::BlockQuote { .. }) => builder.close(NodeKind::BlockQuote),
            Event::Text(text) | Event::Code(text) => builder.text(&text),
            Event::SoftBreak | Event::HardBreak => builder.text(" "),
            _ => {}
        }
    }

    builder.close_implicit();
    builder.items
}

#[derive(Default)]
struct Builder {
    items: Vec<Item>,
    /// Content node currently receiving text, and whether it was opened
    /// implicitly (tight list items carry text without a paragraph).
    content: Option<(NodeKind, bool)>,
}

impl Builder {
    fn open(&mut self, kind: NodeKind) {
        self.close_implicit();
        if kind.is_content() {
            self.content = Some((kind, false));
        }
        self.items.push(Item::Open(kind));
    }

    fn close(&mut self, kind: NodeKind) {
        self.close_implicit();
        if kind.is_content() {
            self.content = None;
        }
        self.items.push(Item::Close(kind));
    }

    fn close_implicit(&mut self) {
        if let Some((kind, true)) = self.content {
            self.items.push(Item::Close(kind));
            self.content = None;
        }
    }

    fn text(&mut self, text: &str) {
        if self.content.is_none() {
            self.content = Some((NodeKind::Paragraph, true));
            self.items.push(Item::Open(NodeKind::Paragraph));
        }
        self.items.extend(text.chars().map(|ch| Item::Char {
            ch,
            annotation: None,
        }));
    }
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Structured rich-text document backing an entity's `details`.
///
/// The original markdown source is kept verbatim for persistence; the parsed
/// block list is what editing and rendering collaborators consume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichTextDoc {
    source: String,
    blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    CodeBlock(String),
    BulletList(Vec<Vec<Inline>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Code(String),
    Link { url: String, content: Vec<Inline> },
}

impl RichTextDoc {
    /// Parses a markdown (or plain text) `details` string.
    ///
    /// Empty or whitespace-only input yields the default empty document,
    /// which is the defaulting contract of the migration chain.
    pub fn from_markdown(source: &str) -> Self {
        if source.trim().is_empty() {
            return Self::default();
        }

        let mut builder = DocBuilder::default();
        for event in Parser::new(source) {
            builder.handle(event);
        }

        Self {
            source: source.to_owned(),
            blocks: builder.finish(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Concatenated text content of every block, for search collaborators.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(spans) | Block::Heading { content: spans, .. } => {
                    push_spans(&mut out, spans);
                }
                Block::CodeBlock(code) => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(code);
                }
                Block::BulletList(items) => {
                    for spans in items {
                        push_spans(&mut out, spans);
                    }
                }
            }
        }
        out
    }
}

fn push_spans(out: &mut String, spans: &[Inline]) {
    for span in spans {
        match span {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Strong(inner) | Inline::Emphasis(inner) => push_spans(out, inner),
            Inline::Link { content, .. } => push_spans(out, content),
        }
    }
    out.push('\n');
}

enum FrameKind {
    Root,
    Strong,
    Emphasis,
    Link(String),
}

struct Frame {
    kind: FrameKind,
    spans: Vec<Inline>,
}

#[derive(Default)]
struct DocBuilder {
    blocks: Vec<Block>,
    frames: Vec<Frame>,
    code_block: Option<String>,
    lists: Vec<Vec<Vec<Inline>>>,
    items: Vec<Vec<Inline>>,
}

impl DocBuilder {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) | Event::Start(Tag::Heading { .. }) => {
                self.push_frame(FrameKind::Root);
            }
            Event::End(TagEnd::Paragraph) => {
                let spans = self.pop_root();
                if let Some(item) = self.items.last_mut() {
                    item.extend(spans);
                } else if !spans.is_empty() {
                    self.blocks.push(Block::Paragraph(spans));
                }
            }
            Event::End(TagEnd::Heading(level)) => {
                let spans = self.pop_root();
                self.blocks.push(Block::Heading { level: level as u8, content: spans });
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.code_block = Some(String::new());
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(code) = self.code_block.take() {
                    self.blocks.push(Block::CodeBlock(code));
                }
            }
            Event::Start(Tag::List(_)) => {
                self.lists.push(Vec::new());
            }
            Event::End(TagEnd::List(_)) => {
                let Some(items) = self.lists.pop() else {
                    return;
                };
                match self.lists.last_mut() {
                    // Nested lists are flattened into the parent list.
                    Some(parent) => parent.extend(items),
                    None => self.blocks.push(Block::BulletList(items)),
                }
            }
            Event::Start(Tag::Item) => {
                self.items.push(Vec::new());
                self.push_frame(FrameKind::Root);
            }
            Event::End(TagEnd::Item) => {
                let spans = self.pop_root();
                let Some(mut item) = self.items.pop() else {
                    return;
                };
                item.extend(spans);
                if let Some(list) = self.lists.last_mut() {
                    list.push(item);
                }
            }
            Event::Start(Tag::Strong) => self.push_frame(FrameKind::Strong),
            Event::Start(Tag::Emphasis) => self.push_frame(FrameKind::Emphasis),
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.push_frame(FrameKind::Link(dest_url.into_string()));
            }
            Event::End(TagEnd::Strong) | Event::End(TagEnd::Emphasis) | Event::End(TagEnd::Link) => {
                self.pop_wrapping_frame();
            }
            Event::Text(text) => {
                if let Some(code) = self.code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.into_string()));
                }
            }
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::SoftBreak => self.push_inline(Inline::Text(" ".to_owned())),
            Event::HardBreak => self.push_inline(Inline::Text("\n".to_owned())),
            _ => {}
        }
    }

    fn push_frame(&mut self, kind: FrameKind) {
        self.frames.push(Frame { kind, spans: Vec::new() });
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.frames.last_mut() {
            Some(frame) => frame.spans.push(inline),
            // Stray inline outside any block; give it a paragraph of its own.
            None => self.blocks.push(Block::Paragraph(vec![inline])),
        }
    }

    fn pop_root(&mut self) -> Vec<Inline> {
        match self.frames.pop() {
            Some(frame) => frame.spans,
            None => Vec::new(),
        }
    }

    fn pop_wrapping_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let wrapped = match frame.kind {
            FrameKind::Root => {
                // Unbalanced end tag; treat the collected spans as a paragraph.
                if !frame.spans.is_empty() {
                    self.blocks.push(Block::Paragraph(frame.spans));
                }
                return;
            }
            FrameKind::Strong => Inline::Strong(frame.spans),
            FrameKind::Emphasis => Inline::Emphasis(frame.spans),
            FrameKind::Link(url) => Inline::Link { url, content: frame.spans },
        };
        self.push_inline(wrapped);
    }

    fn finish(mut self) -> Vec<Block> {
        while let Some(frame) = self.frames.pop() {
            if !frame.spans.is_empty() {
                self.blocks.push(Block::Paragraph(frame.spans));
            }
        }
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::{Block, Inline, RichTextDoc};

    #[test]
    fn empty_input_yields_empty_doc() {
        assert_eq!(RichTextDoc::from_markdown(""), RichTextDoc::default());
        assert_eq!(RichTextDoc::from_markdown("  \n "), RichTextDoc::default());
        assert!(RichTextDoc::from_markdown("").is_empty());
    }

    #[test]
    fn plain_text_becomes_a_paragraph() {
        let doc = RichTextDoc::from_markdown("hello world");
        assert_eq!(
            doc.blocks(),
            &[Block::Paragraph(vec![Inline::Text("hello world".to_owned())])]
        );
        assert_eq!(doc.source(), "hello world");
    }

    #[test]
    fn heading_and_emphasis_are_structured() {
        let doc = RichTextDoc::from_markdown("# Title\n\nsome *emphasis* here");
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(
            doc.blocks()[0],
            Block::Heading { level: 1, content: vec![Inline::Text("Title".to_owned())] }
        );
        let Block::Paragraph(spans) = &doc.blocks()[1] else {
            panic!("expected paragraph, got {:?}", doc.blocks()[1]);
        };
        assert!(spans.contains(&Inline::Emphasis(vec![Inline::Text("emphasis".to_owned())])));
    }

    #[test]
    fn bullet_list_collects_items() {
        let doc = RichTextDoc::from_markdown("- one\n- two\n");
        assert_eq!(
            doc.blocks(),
            &[Block::BulletList(vec![
                vec![Inline::Text("one".to_owned())],
                vec![Inline::Text("two".to_owned())],
            ])]
        );
    }

    #[test]
    fn code_block_keeps_raw_contents() {
        let doc = RichTextDoc::from_markdown("```\nlet x = 1;\n```\n");
        assert_eq!(doc.blocks(), &[Block::CodeBlock("let x = 1;\n".to_owned())]);
    }

    #[test]
    fn link_keeps_destination() {
        let doc = RichTextDoc::from_markdown("[docs](https://example.com)");
        let Block::Paragraph(spans) = &doc.blocks()[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            spans,
            &[Inline::Link {
                url: "https://example.com".to_owned(),
                content: vec![Inline::Text("docs".to_owned())],
            }]
        );
    }

    #[test]
    fn plain_text_flattens_structure() {
        let doc = RichTextDoc::from_markdown("# Title\n\nbody **bold**");
        let text = doc.plain_text();
        assert!(text.contains("Title"));
        assert!(text.contains("body"));
        assert!(text.contains("bold"));
    }
}

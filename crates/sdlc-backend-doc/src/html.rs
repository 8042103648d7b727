//! HTML rendering.
//!
//! The page is the Markdown rendering converted with `pulldown-cmark`.
//! Headings get ids matching the table of contents links.

use pulldown_cmark::{html, CowStr, Event, Parser, Tag, TagEnd};
use sdlc_schema::Document;

use crate::markdown::{anchor, render_markdown};
use crate::options::DocOptions;

/// Renders `doc` as an HTML fragment.
pub fn render_html(doc: &Document, options: &DocOptions) -> String {
    let markdown = render_markdown(doc, options);
    let mut events: Vec<Event<'_>> = Parser::new(&markdown).collect();

    for i in 0..events.len() {
        if !matches!(events[i], Event::Start(Tag::Heading { .. })) {
            continue;
        }
        let text = heading_text(&events[i + 1..]);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            if id.is_none() {
                *id = Some(CowStr::from(anchor(&text)));
            }
        }
    }

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}

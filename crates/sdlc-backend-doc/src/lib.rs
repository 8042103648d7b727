//! sdlc Documentation Backend
//!
//! Renders a checked schema [`Document`](sdlc_schema::Document) as a
//! Markdown (or HTML) reference page: a table of contents followed by one section per
//! declaration kind.
//!
//! # Example
//!
//! ```
//! use sdlc_backend_doc::{render_markdown, DocOptions};
//! use sdlc_schema::DocSet;
//!
//! let doc = DocSet::new().parse("api.gql", "type Query { hello: String }").unwrap();
//! let page = render_markdown(&doc, &DocOptions::default());
//! assert!(page.contains("- hello **(String)**"));
//! ```

pub mod error;
pub mod html;
pub mod markdown;
pub mod options;

pub use error::DocError;
pub use html::render_html;
pub use markdown::{render_markdown, type_link, SECTIONS};
pub use options::DocOptions;

/// File name the page for `doc_name` is written to.
pub fn output_file_name(doc_name: &str, options: &DocOptions) -> String {
    let ext = if options.html { "html" } else { "md" };
    format!("{}.{}", doc_name, ext)
}

/// Renders the page for `doc` in the format `options` selects.
pub fn render_page(doc: &sdlc_schema::Document, options: &DocOptions) -> String {
    if options.html {
        render_html(doc, options)
    } else {
        render_markdown(doc, options)
    }
}

//! Built-in documentation generator.

use sdlc_backend_doc::{output_file_name, render_page, DocOptions};
use sdlc_schema::Document;

use crate::error::{GenerateError, GeneratorError};
use crate::generator::{GenContext, Generator, GeneratorOptions};

/// Writes one Markdown or HTML page per document.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocGenerator;

impl DocGenerator {
    /// Name the generator reports errors under.
    pub const NAME: &'static str = "doc";

    fn run(
        &self,
        ctx: &GenContext<'_>,
        doc: &Document,
        options: &GeneratorOptions,
    ) -> Result<(), GenerateError> {
        let options =
            DocOptions::from_map(options).map_err(|e| GenerateError::InvalidOptions(e.to_string()))?;
        if ctx.cancel.is_done() {
            return Err(GenerateError::Cancelled);
        }

        let page = render_page(doc, &options);
        let name = output_file_name(&doc.name, &options);
        tracing::debug!(document = %doc.name, file = %name, bytes = page.len(), "writing doc page");
        ctx.output.write_file(&name, page.as_bytes())?;
        Ok(())
    }
}

impl Generator for DocGenerator {
    fn generate(
        &self,
        ctx: &GenContext<'_>,
        doc: &Document,
        options: &GeneratorOptions,
    ) -> Result<(), GeneratorError> {
        ctx.logger
            .in_scope(|| self.run(ctx, doc, options))
            .map_err(|e| e.attribute(Self::NAME, &doc.name))
    }
}

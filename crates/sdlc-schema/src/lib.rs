//! sdlc schema library
//!
//! Parses GraphQL SDL source files into [`Document`]s, checks a set of
//! documents as one schema, and defines the wire protocol spoken with
//! out-of-process generator plugins.
//!
//! # Example
//!
//! ```
//! use sdlc_schema::{check_documents, DocSet};
//!
//! let mut docs = DocSet::new();
//! let doc = docs.parse("api.gql", "type Query { hello: String }").unwrap();
//! assert_eq!(doc.name, "api");
//! assert!(check_documents(&[doc]).is_ok());
//! ```
//!
//! # Modules
//!
//! - [`ast`]: Document model shared by the parser, checker and generators
//! - [`lexer`]: Tokenizer
//! - [`parser`]: Parser and the per-run document naming context
//! - [`check`]: Cross-document semantic checks
//! - [`protocol`]: Plugin request/response messages and framing
//! - [`error`]: Parse, check and protocol errors

pub mod ast;
pub mod check;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod protocol;

pub use ast::{
    is_builtin_scalar, Argument, Definition, DirectiveDef, DirectiveUse, Document, EnumValue,
    Field, InputValue, Operation, OperationTypeDef, Position, SchemaDef, TypeDef, TypeKind,
    TypeRef, Value, BUILTIN_DIRECTIVES, BUILTIN_SCALARS,
};
pub use check::check_documents;
pub use error::{Diagnostic, ParseError, ProtocolError};
pub use parser::{document_name, parse_document, DocSet};
pub use protocol::{
    decode_request, decode_response, encode_request, encode_response, validate_file_name,
    Request, Response, ResponseFile, MAX_FRAME_LEN,
};

/// File extensions recognised as schema sources.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["gql", "graphql"];

/// Returns true if `path` ends in a recognised schema source extension.
pub fn has_source_extension(path: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_source_extension() {
        assert!(has_source_extension("a.gql"));
        assert!(has_source_extension("dir/b.graphql"));
        assert!(!has_source_extension("c.proto"));
        assert!(!has_source_extension("gql"));
        assert!(!has_source_extension("d.GQL"));
    }
}

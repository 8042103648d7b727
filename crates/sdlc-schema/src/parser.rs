//! Recursive-descent parser for schema documents.
//!
//! Documents that belong to one compiler run are parsed through a shared
//! [`DocSet`], which hands out document names and guarantees they are unique
//! across the run so cross-document references resolve against one namespace.

use std::collections::HashMap;
use std::path::Path;

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Valid `directive ... on` locations.
pub const DIRECTIVE_LOCATIONS: [&str; 19] = [
    "QUERY",
    "MUTATION",
    "SUBSCRIPTION",
    "FIELD",
    "FRAGMENT_DEFINITION",
    "FRAGMENT_SPREAD",
    "INLINE_FRAGMENT",
    "VARIABLE_DEFINITION",
    "SCHEMA",
    "SCALAR",
    "OBJECT",
    "FIELD_DEFINITION",
    "ARGUMENT_DEFINITION",
    "INTERFACE",
    "UNION",
    "ENUM",
    "ENUM_VALUE",
    "INPUT_OBJECT",
    "INPUT_FIELD_DEFINITION",
];

const DEFINITION_KEYWORDS: [&str; 9] = [
    "schema",
    "scalar",
    "type",
    "interface",
    "union",
    "enum",
    "input",
    "directive",
    "extend",
];

/// Naming context shared by every document parsed in one run.
#[derive(Debug, Default)]
pub struct DocSet {
    /// Document name to the path that claimed it.
    names: HashMap<String, String>,
}

impl DocSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `source` read from `path` into a uniquely named document.
    pub fn parse(&mut self, path: &str, source: &str) -> Result<Document, ParseError> {
        let name = document_name(path)
            .ok_or_else(|| ParseError::file(path, "cannot derive a document name from path"))?;

        if let Some(existing) = self.names.get(&name) {
            return Err(ParseError::file(
                path,
                format!("document name '{}' is already used by {}", name, existing),
            ));
        }

        let doc = parse_document(&name, path, source)?;
        self.names.insert(name, path.to_string());
        Ok(doc)
    }

    /// Returns true if a document with this name has been parsed.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Derives a document name from a source path: its file stem.
pub fn document_name(path: &str) -> Option<String> {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// Parses one document without registering its name anywhere.
pub fn parse_document(name: &str, path: &str, source: &str) -> Result<Document, ParseError> {
    let tokens = tokenize(path, source)?;
    let mut parser = Parser {
        file: path,
        tokens,
        pos: 0,
    };

    let mut doc = Document::new(name, path);
    while !parser.at_eof() {
        doc.definitions.push(parser.definition()?);
    }
    Ok(doc)
}

struct Parser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // tokenize always ends the stream with Eof, and pos never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, c: char) -> bool {
        self.peek().kind == TokenKind::Punct(c)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Name(name) if name == keyword)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.is_punct(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::at(
            self.file,
            token.position,
            format!("expected {}, found {}", expected, token.kind.describe()),
        )
    }

    fn expect_punct(&mut self, c: char) -> Result<Position, ParseError> {
        if self.is_punct(c) {
            Ok(self.advance().position)
        } else {
            Err(self.unexpected(&format!("'{}'", c)))
        }
    }

    fn expect_name(&mut self) -> Result<(String, Position), ParseError> {
        match &self.peek().kind {
            TokenKind::Name(name) => {
                let name = name.clone();
                let position = self.advance().position;
                Ok((name, position))
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Position, ParseError> {
        if self.is_keyword(keyword) {
            Ok(self.advance().position)
        } else {
            Err(self.unexpected(&format!("'{}'", keyword)))
        }
    }

    fn description(&mut self) -> Option<String> {
        if let TokenKind::String(text) = &self.peek().kind {
            let text = text.clone();
            self.advance();
            Some(text)
        } else {
            None
        }
    }

    fn definition(&mut self) -> Result<Definition, ParseError> {
        let description = self.description();
        let keyword = match &self.peek().kind {
            TokenKind::Name(name) => name.clone(),
            _ => return Err(self.unexpected("a definition")),
        };

        match keyword.as_str() {
            "schema" => Ok(Definition::Schema(self.schema_def(description, false)?)),
            "scalar" | "type" | "interface" | "union" | "enum" | "input" => {
                Ok(Definition::Type(self.type_def(description)?))
            }
            "directive" => Ok(Definition::Directive(self.directive_def(description)?)),
            "extend" => {
                if description.is_some() {
                    return Err(ParseError::at(
                        self.file,
                        self.peek().position,
                        "extensions cannot have a description",
                    ));
                }
                self.advance();
                if self.is_keyword("schema") {
                    Ok(Definition::Schema(self.schema_def(None, true)?))
                } else {
                    Ok(Definition::Extend(self.type_def(None)?))
                }
            }
            _ => Err(self.unexpected("a definition")),
        }
    }

    fn schema_def(
        &mut self,
        description: Option<String>,
        extension: bool,
    ) -> Result<SchemaDef, ParseError> {
        let position = self.expect_keyword("schema")?;
        let directives = self.directives()?;
        let mut operations = Vec::new();

        if self.is_punct('{') || !extension {
            self.expect_punct('{')?;
            while !self.eat_punct('}') {
                let (op_name, op_pos) = self.expect_name()?;
                let operation = match op_name.as_str() {
                    "query" => Operation::Query,
                    "mutation" => Operation::Mutation,
                    "subscription" => Operation::Subscription,
                    other => {
                        return Err(ParseError::at(
                            self.file,
                            op_pos,
                            format!("unknown operation type '{}'", other),
                        ));
                    }
                };
                self.expect_punct(':')?;
                let (type_name, _) = self.expect_name()?;
                operations.push(OperationTypeDef {
                    operation,
                    type_name,
                    position: op_pos,
                });
            }
        }

        Ok(SchemaDef {
            description,
            extension,
            directives,
            operations,
            position,
        })
    }

    fn type_def(&mut self, description: Option<String>) -> Result<TypeDef, ParseError> {
        let (keyword, position) = self.expect_name()?;
        let (name, _) = self.expect_name()?;

        let kind = match keyword.as_str() {
            "scalar" => TypeKind::Scalar,
            "type" | "interface" => {
                let interfaces = self.implements()?;
                let directives = self.directives()?;
                let fields = if self.is_punct('{') {
                    self.fields_def()?
                } else {
                    Vec::new()
                };
                let kind = if keyword == "type" {
                    TypeKind::Object { interfaces, fields }
                } else {
                    TypeKind::Interface { interfaces, fields }
                };
                return Ok(TypeDef {
                    name,
                    description,
                    directives,
                    kind,
                    position,
                });
            }
            "union" => {
                let directives = self.directives()?;
                let mut members = Vec::new();
                if self.eat_punct('=') {
                    self.eat_punct('|');
                    members.push(self.expect_name()?.0);
                    while self.eat_punct('|') {
                        members.push(self.expect_name()?.0);
                    }
                }
                return Ok(TypeDef {
                    name,
                    description,
                    directives,
                    kind: TypeKind::Union { members },
                    position,
                });
            }
            "enum" => {
                let directives = self.directives()?;
                let mut values = Vec::new();
                if self.eat_punct('{') {
                    while !self.eat_punct('}') {
                        values.push(self.enum_value()?);
                    }
                }
                return Ok(TypeDef {
                    name,
                    description,
                    directives,
                    kind: TypeKind::Enum { values },
                    position,
                });
            }
            "input" => {
                let directives = self.directives()?;
                let mut fields = Vec::new();
                if self.eat_punct('{') {
                    while !self.eat_punct('}') {
                        fields.push(self.input_value()?);
                    }
                }
                return Ok(TypeDef {
                    name,
                    description,
                    directives,
                    kind: TypeKind::InputObject { fields },
                    position,
                });
            }
            _ => {
                return Err(ParseError::at(
                    self.file,
                    position,
                    format!("expected a type keyword, found '{}'", keyword),
                ));
            }
        };

        let directives = self.directives()?;
        Ok(TypeDef {
            name,
            description,
            directives,
            kind,
            position,
        })
    }

    /// `implements A & B`, also accepting the older `implements A, B` form.
    fn implements(&mut self) -> Result<Vec<String>, ParseError> {
        let mut interfaces = Vec::new();
        if !self.is_keyword("implements") {
            return Ok(interfaces);
        }
        self.advance();
        self.eat_punct('&');
        interfaces.push(self.expect_name()?.0);

        loop {
            if self.eat_punct('&') {
                interfaces.push(self.expect_name()?.0);
                continue;
            }
            let bare_name = match &self.peek().kind {
                TokenKind::Name(name) => {
                    !DEFINITION_KEYWORDS.contains(&name.as_str())
                        && !matches!(self.peek_nth(1), TokenKind::Punct(':'))
                }
                _ => false,
            };
            if !bare_name {
                break;
            }
            interfaces.push(self.expect_name()?.0);
        }
        Ok(interfaces)
    }

    fn fields_def(&mut self) -> Result<Vec<Field>, ParseError> {
        self.expect_punct('{')?;
        let mut fields = Vec::new();
        while !self.eat_punct('}') {
            let description = self.description();
            let (name, position) = self.expect_name()?;
            let args = if self.is_punct('(') {
                self.args_def()?
            } else {
                Vec::new()
            };
            self.expect_punct(':')?;
            let ty = self.type_ref()?;
            let directives = self.directives()?;
            fields.push(Field {
                name,
                description,
                args,
                ty,
                directives,
                position,
            });
        }
        Ok(fields)
    }

    fn args_def(&mut self) -> Result<Vec<InputValue>, ParseError> {
        self.expect_punct('(')?;
        let mut args = Vec::new();
        while !self.eat_punct(')') {
            args.push(self.input_value()?);
        }
        Ok(args)
    }

    fn input_value(&mut self) -> Result<InputValue, ParseError> {
        let description = self.description();
        let (name, position) = self.expect_name()?;
        self.expect_punct(':')?;
        let ty = self.type_ref()?;
        let default = if self.eat_punct('=') {
            Some(self.value()?)
        } else {
            None
        };
        let directives = self.directives()?;
        Ok(InputValue {
            name,
            description,
            ty,
            default,
            directives,
            position,
        })
    }

    fn enum_value(&mut self) -> Result<EnumValue, ParseError> {
        let description = self.description();
        let (name, position) = self.expect_name()?;
        if matches!(name.as_str(), "true" | "false" | "null") {
            return Err(ParseError::at(
                self.file,
                position,
                format!("'{}' cannot be used as an enum value", name),
            ));
        }
        let directives = self.directives()?;
        Ok(EnumValue {
            name,
            description,
            directives,
            position,
        })
    }

    fn type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let base = if self.eat_punct('[') {
            let inner = self.type_ref()?;
            self.expect_punct(']')?;
            TypeRef::list(inner)
        } else {
            TypeRef::Named(self.expect_name()?.0)
        };

        if self.eat_punct('!') {
            Ok(TypeRef::non_null(base))
        } else {
            Ok(base)
        }
    }

    fn directives(&mut self) -> Result<Vec<DirectiveUse>, ParseError> {
        let mut directives = Vec::new();
        while self.is_punct('@') {
            let position = self.advance().position;
            let (name, _) = self.expect_name()?;
            let mut args = Vec::new();
            if self.eat_punct('(') {
                while !self.eat_punct(')') {
                    let (arg_name, _) = self.expect_name()?;
                    self.expect_punct(':')?;
                    args.push(Argument {
                        name: arg_name,
                        value: self.value()?,
                    });
                }
            }
            directives.push(DirectiveUse {
                name,
                args,
                position,
            });
        }
        Ok(directives)
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int(text) => {
                self.advance();
                Ok(Value::Int(text))
            }
            TokenKind::Float(text) => {
                self.advance();
                Ok(Value::Float(text))
            }
            TokenKind::String(text) => {
                self.advance();
                Ok(Value::String(text))
            }
            TokenKind::Name(name) => {
                self.advance();
                Ok(match name.as_str() {
                    "true" => Value::Boolean(true),
                    "false" => Value::Boolean(false),
                    "null" => Value::Null,
                    _ => Value::Enum(name),
                })
            }
            TokenKind::Punct('[') => {
                self.advance();
                let mut items = Vec::new();
                while !self.eat_punct(']') {
                    items.push(self.value()?);
                }
                Ok(Value::List(items))
            }
            TokenKind::Punct('{') => {
                self.advance();
                let mut entries = Vec::new();
                while !self.eat_punct('}') {
                    let (name, _) = self.expect_name()?;
                    self.expect_punct(':')?;
                    entries.push((name, self.value()?));
                }
                Ok(Value::Object(entries))
            }
            TokenKind::Punct('$') => Err(ParseError::at(
                self.file,
                token.position,
                "variables are not allowed in constant values",
            )),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn directive_def(&mut self, description: Option<String>) -> Result<DirectiveDef, ParseError> {
        let position = self.expect_keyword("directive")?;
        self.expect_punct('@')?;
        let (name, _) = self.expect_name()?;
        let args = if self.is_punct('(') {
            self.args_def()?
        } else {
            Vec::new()
        };
        let repeatable = if self.is_keyword("repeatable") {
            self.advance();
            true
        } else {
            false
        };
        self.expect_keyword("on")?;
        self.eat_punct('|');

        let mut locations = vec![self.directive_location()?];
        while self.eat_punct('|') {
            locations.push(self.directive_location()?);
        }

        Ok(DirectiveDef {
            name,
            description,
            args,
            repeatable,
            locations,
            position,
        })
    }

    fn directive_location(&mut self) -> Result<String, ParseError> {
        let (location, position) = self.expect_name()?;
        if DIRECTIVE_LOCATIONS.contains(&location.as_str()) {
            Ok(location)
        } else {
            Err(ParseError::at(
                self.file,
                position,
                format!("unknown directive location '{}'", location),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Document {
        parse_document("test", "test.gql", source).unwrap()
    }

    #[test]
    fn test_single_object() {
        let doc = parse("type Query { hello: String }");
        assert_eq!(doc.name, "test");
        assert_eq!(
            doc.definitions,
            vec![Definition::Type(TypeDef {
                name: "Query".to_string(),
                description: None,
                directives: vec![],
                kind: TypeKind::Object {
                    interfaces: vec![],
                    fields: vec![Field {
                        name: "hello".to_string(),
                        description: None,
                        args: vec![],
                        ty: TypeRef::named("String"),
                        directives: vec![],
                        position: Position::new(1, 14),
                    }],
                },
                position: Position::new(1, 1),
            })]
        );
    }

    #[test]
    fn test_all_type_kinds() {
        let doc = parse(
            r#"
            "The root."
            schema { query: Query mutation: Mutation }
            scalar Time @specifiedBy(url: "https://example.com/time")
            interface Node { id: ID! }
            type User implements Node & Named {
              id: ID!
              "Display name."
              name(short: Boolean = false): String @deprecated(reason: "use label")
              friends(first: Int = 10, after: String): [User!]!
            }
            union Result = | User | Error
            enum Color { RED GREEN "The blue one." BLUE }
            input Filter { color: Color = RED, tags: [String] = ["a", "b"], near: Point = {x: 1.5, y: -2} }
            directive @auth(role: String!) repeatable on FIELD_DEFINITION | OBJECT
            extend type User { age: Int }
            extend schema { subscription: Events }
            "#,
        );

        assert_eq!(doc.definitions.len(), 10);
        assert_eq!(doc.types().count(), 6);
        assert_eq!(doc.extensions().count(), 1);
        assert_eq!(doc.directives().count(), 1);
        assert_eq!(doc.schemas().count(), 2);

        let user = doc.types().find(|t| t.name == "User").unwrap();
        match &user.kind {
            TypeKind::Object { interfaces, fields } => {
                assert_eq!(interfaces, &vec!["Node".to_string(), "Named".to_string()]);
                assert_eq!(fields.len(), 3);
                assert_eq!(fields[1].description.as_deref(), Some("Display name."));
                assert_eq!(fields[1].args[0].default, Some(Value::Boolean(false)));
                assert_eq!(fields[1].directives[0].name, "deprecated");
                assert_eq!(fields[2].ty.to_string(), "[User!]!");
            }
            other => panic!("expected object, got {:?}", other),
        }

        let result = doc.types().find(|t| t.name == "Result").unwrap();
        assert_eq!(
            result.kind,
            TypeKind::Union {
                members: vec!["User".to_string(), "Error".to_string()]
            }
        );

        let filter = doc.types().find(|t| t.name == "Filter").unwrap();
        match &filter.kind {
            TypeKind::InputObject { fields } => {
                assert_eq!(fields[1].default.as_ref().unwrap().to_string(), r#"["a", "b"]"#);
                assert_eq!(fields[2].default.as_ref().unwrap().to_string(), "{x: 1.5, y: -2}");
            }
            other => panic!("expected input, got {:?}", other),
        }

        let auth = doc.directives().next().unwrap();
        assert!(auth.repeatable);
        assert_eq!(auth.locations, vec!["FIELD_DEFINITION", "OBJECT"]);

        let schema = doc.schemas().next().unwrap();
        assert_eq!(schema.description.as_deref(), Some("The root."));
        assert_eq!(schema.operations.len(), 2);
    }

    #[test]
    fn test_legacy_comma_implements() {
        let doc = parse("type A implements B, C { x: Int }\ntype D { y: Int }");
        match &doc.types().next().unwrap().kind {
            TypeKind::Object { interfaces, .. } => {
                assert_eq!(interfaces, &vec!["B".to_string(), "C".to_string()]);
            }
            other => panic!("expected object, got {:?}", other),
        }
        assert_eq!(doc.types().count(), 2);
    }

    #[test]
    fn test_errors_carry_position() {
        let err = parse_document("test", "test.gql", "type Query {\n  hello String\n}").unwrap_err();
        assert_eq!(err.file, "test.gql");
        assert_eq!(err.position, Some(Position::new(2, 9)));
        assert!(err.message.contains("expected ':'"), "{}", err.message);
    }

    #[test]
    fn test_rejects_variables_and_bad_locations() {
        assert!(parse_document("t", "t.gql", "input A { x: Int = $v }").is_err());
        assert!(parse_document("t", "t.gql", "directive @a on NOWHERE").is_err());
        assert!(parse_document("t", "t.gql", "enum E { true }").is_err());
        assert!(parse_document("t", "t.gql", "\"doc\" extend type A { x: Int }").is_err());
    }

    #[test]
    fn test_docset_names() {
        let mut set = DocSet::new();
        let doc = set.parse("schemas/users.graphql", "scalar Time").unwrap();
        assert_eq!(doc.name, "users");
        assert_eq!(doc.path, "schemas/users.graphql");
        assert!(set.contains("users"));

        let err = set.parse("other/users.gql", "scalar Date").unwrap_err();
        assert!(err.message.contains("already used"), "{}", err.message);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_empty_document() {
        let doc = parse("# nothing here\n");
        assert!(doc.definitions.is_empty());
    }
}

//! Document model for parsed schema files.
//!
//! A [`Document`] is produced once by the parser and is read-only afterwards.
//! Every type here is serializable because whole documents travel to plugins
//! inside a [`crate::protocol::Request`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the scalar types every schema gets for free.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Names of the directives every schema gets for free.
pub const BUILTIN_DIRECTIVES: [&str; 4] = ["skip", "include", "deprecated", "specifiedBy"];

/// Returns true if `name` is one of the built-in scalar types.
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

/// A 1-based line/column location in a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One parsed and checked schema file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document name, derived from the source file stem.
    pub name: String,
    /// Source path the document was read from.
    pub path: String,
    /// Top-level definitions in source order.
    #[serde(default)]
    pub definitions: Vec<Definition>,
}

impl Document {
    /// Creates an empty document.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            definitions: Vec::new(),
        }
    }

    /// Iterates over the type definitions (not extensions) in this document.
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Type(t) => Some(t),
            _ => None,
        })
    }

    /// Iterates over the type extensions in this document.
    pub fn extensions(&self) -> impl Iterator<Item = &TypeDef> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Extend(t) => Some(t),
            _ => None,
        })
    }

    /// Iterates over the directive definitions in this document.
    pub fn directives(&self) -> impl Iterator<Item = &DirectiveDef> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Directive(dir) => Some(dir),
            _ => None,
        })
    }

    /// Iterates over schema definitions and schema extensions.
    pub fn schemas(&self) -> impl Iterator<Item = &SchemaDef> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Schema(s) => Some(s),
            _ => None,
        })
    }
}

/// A top-level definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "definition", rename_all = "snake_case")]
pub enum Definition {
    Schema(SchemaDef),
    Type(TypeDef),
    Extend(TypeDef),
    Directive(DirectiveDef),
}

/// Root operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Query,
    Mutation,
    Subscription,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Query => "query",
            Operation::Mutation => "mutation",
            Operation::Subscription => "subscription",
        }
    }
}

/// `schema { query: Query }`, or `extend schema ...` when `extension` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub extension: bool,
    #[serde(default)]
    pub directives: Vec<DirectiveUse>,
    #[serde(default)]
    pub operations: Vec<OperationTypeDef>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationTypeDef {
    pub operation: Operation,
    pub type_name: String,
    pub position: Position,
}

/// A named type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub directives: Vec<DirectiveUse>,
    pub kind: TypeKind,
    pub position: Position,
}

impl TypeDef {
    /// Fields of an object or interface type.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Object { fields, .. } | TypeKind::Interface { fields, .. } => fields,
            _ => &[],
        }
    }
}

/// The shape of a [`TypeDef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeKind {
    Scalar,
    Object {
        #[serde(default)]
        interfaces: Vec<String>,
        #[serde(default)]
        fields: Vec<Field>,
    },
    Interface {
        #[serde(default)]
        interfaces: Vec<String>,
        #[serde(default)]
        fields: Vec<Field>,
    },
    Union {
        #[serde(default)]
        members: Vec<String>,
    },
    Enum {
        #[serde(default)]
        values: Vec<EnumValue>,
    },
    InputObject {
        #[serde(default)]
        fields: Vec<InputValue>,
    },
}

impl TypeKind {
    /// Keyword used to declare this kind in source.
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Scalar => "scalar",
            TypeKind::Object { .. } => "type",
            TypeKind::Interface { .. } => "interface",
            TypeKind::Union { .. } => "union",
            TypeKind::Enum { .. } => "enum",
            TypeKind::InputObject { .. } => "input",
        }
    }

    /// True for kinds usable as field result types.
    pub fn is_output(&self) -> bool {
        !matches!(self, TypeKind::InputObject { .. })
    }

    /// True for kinds usable as argument and input field types.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            TypeKind::Scalar | TypeKind::Enum { .. } | TypeKind::InputObject { .. }
        )
    }
}

/// A field of an object or interface type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub args: Vec<InputValue>,
    pub ty: TypeRef,
    #[serde(default)]
    pub directives: Vec<DirectiveUse>,
    pub position: Position,
}

/// An argument definition or input object field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub directives: Vec<DirectiveUse>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub directives: Vec<DirectiveUse>,
    pub position: Position,
}

/// `directive @name(args) repeatable on LOCATION | ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub args: Vec<InputValue>,
    #[serde(default)]
    pub repeatable: bool,
    pub locations: Vec<String>,
    pub position: Position,
}

/// An applied directive, e.g. `@deprecated(reason: "gone")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveUse {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

/// A reference to a type, possibly wrapped in list and non-null modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    /// The innermost named type.
    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// A constant value literal.
///
/// Numbers keep their source text so rendering reproduces what was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(String),
    Float(String),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(text) | Value::Float(text) => f.write_str(text),
            Value::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => f.write_str("null"),
            Value::Enum(name) => f.write_str(name),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(entries) => {
                f.write_str("{")?;
                for (i, (name, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("User"))));
        assert_eq!(ty.to_string(), "[User!]!");
        assert_eq!(ty.base_name(), "User");
    }

    #[test]
    fn test_value_display() {
        let value = Value::List(vec![
            Value::Int("1".to_string()),
            Value::String("a \"b\"".to_string()),
            Value::Object(vec![("on".to_string(), Value::Boolean(true))]),
        ]);
        assert_eq!(value.to_string(), r#"[1, "a \"b\"", {on: true}]"#);
    }

    #[test]
    fn test_kind_positions() {
        assert!(TypeKind::Scalar.is_input());
        assert!(TypeKind::Scalar.is_output());
        assert!(!TypeKind::InputObject { fields: vec![] }.is_output());
        assert!(!TypeKind::Union { members: vec![] }.is_input());
    }
}

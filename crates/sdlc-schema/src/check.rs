//! Semantic checks over a full set of parsed documents.
//!
//! Documents are checked together so that a type declared in one file can be
//! referenced, implemented or extended from another. Every problem found is
//! reported; checking never stops at the first diagnostic.

use std::collections::{HashMap, HashSet};

use crate::ast::*;
use crate::error::Diagnostic;

/// Checks `docs` as one schema. Diagnostics come back in document order,
/// then source order within each document.
pub fn check_documents(docs: &[Document]) -> Result<(), Vec<Diagnostic>> {
    let mut checker = Checker::default();
    for doc in docs {
        checker.collect(doc);
    }
    for doc in docs {
        checker.check_document(doc);
    }

    if checker.diagnostics.is_empty() {
        Ok(())
    } else {
        Err(checker.diagnostics)
    }
}

#[derive(Default)]
struct Checker<'a> {
    types: HashMap<&'a str, &'a TypeDef>,
    extensions: HashMap<&'a str, Vec<&'a TypeDef>>,
    directives: HashSet<&'a str>,
    schema_seen: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    fn report(&mut self, doc: &Document, position: Position, message: String) {
        self.diagnostics
            .push(Diagnostic::new(doc.name.clone(), position, message));
    }

    /// Registers every declared name, reporting redefinitions.
    fn collect(&mut self, doc: &'a Document) {
        for def in &doc.definitions {
            match def {
                Definition::Type(ty) => {
                    if is_builtin_scalar(&ty.name) || self.types.contains_key(ty.name.as_str()) {
                        self.report(
                            doc,
                            ty.position,
                            format!("type '{}' is already defined", ty.name),
                        );
                    } else {
                        self.types.insert(&ty.name, ty);
                    }
                }
                Definition::Extend(ty) => {
                    self.extensions.entry(&ty.name).or_default().push(ty);
                }
                Definition::Directive(dir) => {
                    if BUILTIN_DIRECTIVES.contains(&dir.name.as_str())
                        || !self.directives.insert(&dir.name)
                    {
                        self.report(
                            doc,
                            dir.position,
                            format!("directive '@{}' is already defined", dir.name),
                        );
                    }
                }
                Definition::Schema(schema) if !schema.extension => {
                    if self.schema_seen {
                        self.report(doc, schema.position, "schema is already defined".to_string());
                    }
                    self.schema_seen = true;
                }
                Definition::Schema(_) => {}
            }
        }
    }

    fn check_document(&mut self, doc: &Document) {
        for def in &doc.definitions {
            match def {
                Definition::Schema(schema) => self.check_schema(doc, schema),
                Definition::Type(ty) => self.check_type(doc, ty),
                Definition::Extend(ty) => {
                    match self.types.get(ty.name.as_str()).copied() {
                        None => self.report(
                            doc,
                            ty.position,
                            format!("cannot extend unknown type '{}'", ty.name),
                        ),
                        Some(base) if base.kind.keyword() != ty.kind.keyword() => {
                            let message = format!(
                                "cannot extend {} '{}' with {}",
                                base.kind.keyword(),
                                ty.name,
                                ty.kind.keyword()
                            );
                            self.report(doc, ty.position, message);
                        }
                        Some(_) => {}
                    }
                    self.check_type(doc, ty);
                }
                Definition::Directive(dir) => {
                    self.check_input_values(doc, &dir.args, "argument");
                }
            }
        }
    }

    fn check_schema(&mut self, doc: &Document, schema: &SchemaDef) {
        self.check_directive_uses(doc, &schema.directives);

        let mut seen = HashSet::new();
        for op in &schema.operations {
            if !seen.insert(op.operation) {
                self.report(
                    doc,
                    op.position,
                    format!("{} operation is defined more than once", op.operation.as_str()),
                );
            }
            match self.types.get(op.type_name.as_str()).copied() {
                Some(def) if matches!(def.kind, TypeKind::Object { .. }) => {}
                Some(_) => self.report(
                    doc,
                    op.position,
                    format!(
                        "{} operation type '{}' must be an object type",
                        op.operation.as_str(),
                        op.type_name
                    ),
                ),
                None => self.report(
                    doc,
                    op.position,
                    format!("unknown type '{}'", op.type_name),
                ),
            }
        }
    }

    fn check_type(&mut self, doc: &Document, ty: &TypeDef) {
        self.check_directive_uses(doc, &ty.directives);

        match &ty.kind {
            TypeKind::Scalar => {}
            TypeKind::Object { interfaces, fields } | TypeKind::Interface { interfaces, fields } => {
                let mut names = HashSet::new();
                for field in fields {
                    if !names.insert(field.name.as_str()) {
                        self.report(
                            doc,
                            field.position,
                            format!("field '{}' is defined more than once on '{}'", field.name, ty.name),
                        );
                    }
                    self.check_ref(doc, &field.ty, field.position, false);
                    self.check_input_values(doc, &field.args, "argument");
                    self.check_directive_uses(doc, &field.directives);
                }
                self.check_interfaces(doc, ty, interfaces);
            }
            TypeKind::Union { members } => {
                let mut names = HashSet::new();
                for member in members {
                    if !names.insert(member.as_str()) {
                        self.report(
                            doc,
                            ty.position,
                            format!("union '{}' lists '{}' more than once", ty.name, member),
                        );
                    }
                    match self.types.get(member.as_str()).copied() {
                        Some(def) if matches!(def.kind, TypeKind::Object { .. }) => {}
                        Some(_) => self.report(
                            doc,
                            ty.position,
                            format!("union member '{}' must be an object type", member),
                        ),
                        None if is_builtin_scalar(member) => self.report(
                            doc,
                            ty.position,
                            format!("union member '{}' must be an object type", member),
                        ),
                        None => self.report(doc, ty.position, format!("unknown type '{}'", member)),
                    }
                }
            }
            TypeKind::Enum { values } => {
                let mut names = HashSet::new();
                for value in values {
                    if !names.insert(value.name.as_str()) {
                        self.report(
                            doc,
                            value.position,
                            format!("enum value '{}' is defined more than once on '{}'", value.name, ty.name),
                        );
                    }
                    self.check_directive_uses(doc, &value.directives);
                }
            }
            TypeKind::InputObject { fields } => {
                self.check_input_values(doc, fields, "input field");
            }
        }
    }

    fn check_interfaces(&mut self, doc: &Document, ty: &TypeDef, interfaces: &[String]) {
        let declared = self.field_names(&ty.name);

        for iface in interfaces {
            let Some(def) = self.types.get(iface.as_str()).copied() else {
                self.report(doc, ty.position, format!("unknown type '{}'", iface));
                continue;
            };
            if !matches!(def.kind, TypeKind::Interface { .. }) {
                self.report(
                    doc,
                    ty.position,
                    format!("'{}' implements '{}', which is not an interface", ty.name, iface),
                );
                continue;
            }

            let mut required: Vec<&str> = self.field_names(iface).into_iter().collect();
            required.sort_unstable();
            for field in required {
                if !declared.contains(field) {
                    self.report(
                        doc,
                        ty.position,
                        format!(
                            "'{}' does not declare field '{}' required by interface '{}'",
                            ty.name, field, iface
                        ),
                    );
                }
            }
        }
    }

    /// Field names of a type including every extension of it.
    fn field_names(&self, name: &str) -> HashSet<&'a str> {
        let base = self.types.get(name).into_iter().copied();
        let extensions = self.extensions.get(name).into_iter().flatten().copied();
        base.chain(extensions)
            .flat_map(|def| def.fields().iter().map(|f| f.name.as_str()))
            .collect()
    }

    fn check_input_values(&mut self, doc: &Document, values: &[InputValue], what: &str) {
        let mut names = HashSet::new();
        for value in values {
            if !names.insert(value.name.as_str()) {
                self.report(
                    doc,
                    value.position,
                    format!("{} '{}' is defined more than once", what, value.name),
                );
            }
            self.check_ref(doc, &value.ty, value.position, true);
            self.check_directive_uses(doc, &value.directives);
        }
    }

    fn check_ref(&mut self, doc: &Document, ty: &TypeRef, position: Position, input: bool) {
        let name = ty.base_name();
        if is_builtin_scalar(name) {
            return;
        }
        match self.types.get(name).copied() {
            None => self.report(doc, position, format!("unknown type '{}'", name)),
            Some(def) if input && !def.kind.is_input() => self.report(
                doc,
                position,
                format!("'{}' is a {} and cannot be used as an input type", name, def.kind.keyword()),
            ),
            Some(def) if !input && !def.kind.is_output() => self.report(
                doc,
                position,
                format!("'{}' is an input and cannot be used as an output type", name),
            ),
            Some(_) => {}
        }
    }

    fn check_directive_uses(&mut self, doc: &Document, uses: &[DirectiveUse]) {
        for used in uses {
            let known = BUILTIN_DIRECTIVES.contains(&used.name.as_str())
                || self.directives.contains(used.name.as_str());
            if !known {
                self.report(doc, used.position, format!("unknown directive '@{}'", used.name));
            }
        }
    }
}

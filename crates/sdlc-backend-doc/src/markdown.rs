//! Markdown rendering.
//!
//! Output is a pure function of the document and options: sections appear in
//! a fixed order and entries keep their declaration order, so the same input
//! always renders byte-identical text.

use sdlc_schema::ast::*;

use crate::options::DocOptions;

/// Section headings, in the order they are rendered.
pub const SECTIONS: [&str; 9] = [
    "Schema",
    "Scalars",
    "Objects",
    "Interfaces",
    "Unions",
    "Enums",
    "Input Objects",
    "Directives",
    "Extensions",
];

const SCHEMA: usize = 0;
const EXTENSIONS: usize = 8;

struct Entry {
    name: String,
    body: String,
}

/// Renders `doc` as a Markdown reference page.
pub fn render_markdown(doc: &Document, options: &DocOptions) -> String {
    let mut sections: Vec<Vec<Entry>> = SECTIONS.iter().map(|_| Vec::new()).collect();

    for def in &doc.definitions {
        let (index, entry) = match def {
            Definition::Schema(schema) => {
                let index = if schema.extension { EXTENSIONS } else { SCHEMA };
                (index, schema_entry(schema))
            }
            Definition::Type(ty) => (type_section(&ty.kind), type_entry(ty)),
            Definition::Extend(ty) => (EXTENSIONS, type_entry(ty)),
            Definition::Directive(dir) => (7, directive_entry(dir)),
        };
        sections[index].push(entry);
    }

    let title = options.title.as_deref().unwrap_or(&doc.name);
    let mut out = format!("# {}\n*This was generated by sdlc.*\n\n", title);

    out.push_str("## Table of Contents\n");
    for (heading, entries) in SECTIONS.iter().zip(&sections) {
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!("- [{}](#{})\n", heading, anchor(heading)));
        for entry in entries {
            out.push_str(&format!("\t* [{}](#{})\n", entry.name, anchor(&entry.name)));
        }
    }
    out.push('\n');

    for (heading, entries) in SECTIONS.iter().zip(&sections) {
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!("## {}\n", heading));
        for entry in entries {
            out.push_str(&format!("\n### {}\n", entry.name));
            out.push_str(&entry.body);
        }
        out.push('\n');
    }

    out
}

/// Link target for a heading.
pub(crate) fn anchor(heading: &str) -> String {
    heading.replace(' ', "-")
}

fn type_section(kind: &TypeKind) -> usize {
    match kind {
        TypeKind::Scalar => 1,
        TypeKind::Object { .. } => 2,
        TypeKind::Interface { .. } => 3,
        TypeKind::Union { .. } => 4,
        TypeKind::Enum { .. } => 5,
        TypeKind::InputObject { .. } => 6,
    }
}

/// Renders a type reference, linking every non-builtin named type.
pub fn type_link(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) => named_link(name),
        TypeRef::List(inner) => format!("[{}]", type_link(inner)),
        TypeRef::NonNull(inner) => format!("{}!", type_link(inner)),
    }
}

fn named_link(name: &str) -> String {
    if is_builtin_scalar(name) {
        name.to_string()
    } else {
        format!("[{}](#{})", name, name)
    }
}

fn indented(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("\n\t")
}

fn description(out: &mut String, description: &Option<String>) {
    if let Some(text) = description {
        out.push_str(&format!("{}\n\n", text));
    }
}

fn directive_list(uses: &[DirectiveUse]) -> String {
    uses.iter()
        .map(|used| {
            if used.args.is_empty() {
                format!("@{}", used.name)
            } else {
                let args: Vec<String> = used
                    .args
                    .iter()
                    .map(|arg| format!("{}: {}", arg.name, arg.value))
                    .collect();
                format!("@{}({})", used.name, args.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn directives_line(out: &mut String, uses: &[DirectiveUse]) {
    if !uses.is_empty() {
        out.push_str(&format!("*Directives*: `{}`\n\n", directive_list(uses)));
    }
}

fn schema_entry(schema: &SchemaDef) -> Entry {
    let mut body = String::new();
    description(&mut body, &schema.description);
    directives_line(&mut body, &schema.directives);
    for op in &schema.operations {
        body.push_str(&format!(
            "- {} **({})**\n",
            op.operation.as_str(),
            named_link(&op.type_name)
        ));
    }
    Entry {
        name: "schema".to_string(),
        body,
    }
}

fn type_entry(ty: &TypeDef) -> Entry {
    let mut body = String::new();
    description(&mut body, &ty.description);
    directives_line(&mut body, &ty.directives);

    match &ty.kind {
        TypeKind::Scalar => {}
        TypeKind::Object { interfaces, fields } | TypeKind::Interface { interfaces, fields } => {
            if !interfaces.is_empty() {
                let links: Vec<String> = interfaces.iter().map(|i| named_link(i)).collect();
                body.push_str(&format!("*Implements*: {}\n\n", links.join(", ")));
            }
            for field in fields {
                field_item(&mut body, field);
            }
        }
        TypeKind::Union { members } => {
            for member in members {
                body.push_str(&format!("- {}\n", named_link(member)));
            }
        }
        TypeKind::Enum { values } => {
            for value in values {
                body.push_str(&format!("- {}\n", value.name));
                if let Some(text) = &value.description {
                    body.push_str(&format!("\n\t{}\n", indented(text)));
                }
                if !value.directives.is_empty() {
                    body.push_str(&format!(
                        "\n\t*Directives*: `{}`\n",
                        directive_list(&value.directives)
                    ));
                }
            }
        }
        TypeKind::InputObject { fields } => {
            for field in fields {
                input_item(&mut body, field, "");
            }
        }
    }

    // A scalar has no item list to close its description block.
    if body.ends_with("\n\n") {
        body.pop();
    }
    Entry {
        name: ty.name.clone(),
        body,
    }
}

fn field_item(out: &mut String, field: &Field) {
    out.push_str(&format!("- {} **({})**\n", field.name, type_link(&field.ty)));
    if let Some(text) = &field.description {
        out.push_str(&format!("\n\t{}\n", indented(text)));
    }
    if !field.args.is_empty() {
        out.push_str("\n\t*Args*:\n");
        for arg in &field.args {
            input_item(out, arg, "\t");
        }
    }
    if !field.directives.is_empty() {
        out.push_str(&format!(
            "\n\t*Directives*: `{}`\n",
            directive_list(&field.directives)
        ));
    }
}

/// Renders an input value at the given nesting. Arguments nest one level
/// below their field; input object fields sit at the top level.
fn input_item(out: &mut String, value: &InputValue, indent: &str) {
    out.push_str(&format!(
        "{}- {} **({})**\n",
        indent,
        value.name,
        type_link(&value.ty)
    ));
    if let Some(text) = &value.description {
        out.push_str(&format!("\n{}\t{}\n", indent, indented(text)));
    }
    if let Some(default) = &value.default {
        out.push_str(&format!("\n{}\t*Default Value*: `{}`\n", indent, default));
    }
}

fn directive_entry(dir: &DirectiveDef) -> Entry {
    let mut body = String::new();
    description(&mut body, &dir.description);
    for arg in &dir.args {
        input_item(&mut body, arg, "");
    }
    if !dir.args.is_empty() {
        body.push('\n');
    }
    if dir.repeatable {
        body.push_str("*Repeatable*\n\n");
    }
    body.push_str(&format!("*Locations*: {}\n", dir.locations.join(" | ")));
    Entry {
        name: dir.name.clone(),
        body,
    }
}

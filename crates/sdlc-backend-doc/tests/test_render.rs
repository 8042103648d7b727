//! Golden-output tests for the Markdown renderer.

use pretty_assertions::assert_eq;
use sdlc_backend_doc::{output_file_name, render_html, render_markdown, render_page, DocOptions};
use sdlc_schema::{DocSet, Document};

fn parse(path: &str, source: &str) -> Document {
    DocSet::new().parse(path, source).unwrap()
}

#[test]
fn test_single_object() {
    let doc = parse("hello.gql", "type Query { hello: String }");
    let page = render_markdown(&doc, &DocOptions::default());
    assert_eq!(
        page,
        "# hello\n\
         *This was generated by sdlc.*\n\
         \n\
         ## Table of Contents\n\
         - [Objects](#Objects)\n\
         \t* [Query](#Query)\n\
         \n\
         ## Objects\n\
         \n\
         ### Query\n\
         - hello **(String)**\n\
         \n"
    );
}

#[test]
fn test_title_option() {
    let doc = parse("hello.gql", "scalar Time");
    let options = DocOptions {
        title: Some("Public API".to_string()),
        ..DocOptions::default()
    };
    let page = render_markdown(&doc, &options);
    assert!(page.starts_with("# Public API\n"), "{}", page);
}

#[test]
fn test_full_document() {
    let source = r#"
        schema { query: Query }
        "A point in time."
        scalar Time
        type Query implements Node {
          id: ID!
          "Looks up users."
          users(first: Int = 10, "Sort order." order: Order): [User!]! @deprecated(reason: "paged")
        }
        interface Node { id: ID! }
        union Result = Query | User
        enum Order { ASC "Newest first." DESC }
        input Filter { since: Time = "2020" }
        directive @auth(role: String!) repeatable on FIELD_DEFINITION | OBJECT
        type User { id: ID! }
        extend type User { born: Time }
    "#;
    let doc = parse("api.graphql", source);
    let page = render_markdown(&doc, &DocOptions::default());

    let expected = "# api
*This was generated by sdlc.*

## Table of Contents
- [Schema](#Schema)
\t* [schema](#schema)
- [Scalars](#Scalars)
\t* [Time](#Time)
- [Objects](#Objects)
\t* [Query](#Query)
\t* [User](#User)
- [Interfaces](#Interfaces)
\t* [Node](#Node)
- [Unions](#Unions)
\t* [Result](#Result)
- [Enums](#Enums)
\t* [Order](#Order)
- [Input Objects](#Input-Objects)
\t* [Filter](#Filter)
- [Directives](#Directives)
\t* [auth](#auth)
- [Extensions](#Extensions)
\t* [User](#User)

## Schema

### schema
- query **([Query](#Query))**

## Scalars

### Time
A point in time.

## Objects

### Query
*Implements*: [Node](#Node)

- id **(ID!)**
- users **([[User](#User)!]!)**

\tLooks up users.

\t*Args*:
\t- first **(Int)**

\t\t*Default Value*: `10`
\t- order **([Order](#Order))**

\t\tSort order.

\t*Directives*: `@deprecated(reason: \"paged\")`

### User
- id **(ID!)**

## Interfaces

### Node
- id **(ID!)**

## Unions

### Result
- [Query](#Query)
- [User](#User)

## Enums

### Order
- ASC
- DESC

\tNewest first.

## Input Objects

### Filter
- since **([Time](#Time))**

\t*Default Value*: `\"2020\"`

## Directives

### auth
- role **(String!)**

*Repeatable*

*Locations*: FIELD_DEFINITION | OBJECT

## Extensions

### User
- born **([Time](#Time))**

";
    assert_eq!(page, expected);
}

#[test]
fn test_described_scalar_ends_with_one_blank_line() {
    let doc = parse("t.gql", "\"A point in time.\" scalar Time\ntype Query { now: Time }");
    let page = render_markdown(&doc, &DocOptions::default());
    assert!(
        page.contains("### Time\nA point in time.\n\n## Objects\n"),
        "{}",
        page
    );
}

#[test]
fn test_html_single_object() {
    let doc = parse("hello.gql", "type Query { hello: String }");
    let options = DocOptions {
        html: true,
        ..DocOptions::default()
    };
    let page = render_html(&doc, &options);
    assert_eq!(
        page,
        r##"<h1 id="hello">hello</h1>
<p><em>This was generated by sdlc.</em></p>
<h2 id="Table-of-Contents">Table of Contents</h2>
<ul>
<li><a href="#Objects">Objects</a>
<ul>
<li><a href="#Query">Query</a></li>
</ul>
</li>
</ul>
<h2 id="Objects">Objects</h2>
<h3 id="Query">Query</h3>
<ul>
<li>hello <strong>(String)</strong></li>
</ul>
"##
    );
    assert_eq!(render_page(&doc, &options), page);
    assert_eq!(output_file_name("hello", &options), "hello.html");
    assert_eq!(output_file_name("hello", &DocOptions::default()), "hello.md");
}

#[test]
fn test_rendering_is_deterministic() {
    let source = "type A { b: B } type B { a: A } enum C { X Y Z }";
    let first = render_markdown(&parse("x.gql", source), &DocOptions::default());
    let second = render_markdown(&parse("x.gql", source), &DocOptions::default());
    assert_eq!(first, second);
}

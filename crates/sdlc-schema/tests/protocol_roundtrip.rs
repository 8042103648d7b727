//! Request round-trips through the wire encoding with every field intact.

use pretty_assertions::assert_eq;
use sdlc_schema::{
    decode_request, decode_response, encode_request, encode_response, DocSet, Document, Request,
    Response, ResponseFile,
};

fn request_for(docs: Vec<Document>) -> Request {
    Request {
        files_to_generate: docs.iter().map(|d| d.path.clone()).collect(),
        parameter: r#"{"title":"API"}"#.to_string(),
        documents: docs,
    }
}

#[test]
fn test_request_with_no_declarations() {
    let doc = DocSet::new().parse("empty.gql", "# nothing\n").unwrap();
    let request = request_for(vec![doc]);
    let bytes = encode_request(&request).unwrap();
    assert_eq!(decode_request(&bytes).unwrap(), request);
}

#[test]
fn test_request_with_one_declaration() {
    let doc = DocSet::new()
        .parse("one.gql", "type Query { hello: String }")
        .unwrap();
    let request = request_for(vec![doc]);
    let bytes = encode_request(&request).unwrap();
    assert_eq!(decode_request(&bytes).unwrap(), request);
}

#[test]
fn test_request_with_many_declarations() {
    let mut set = DocSet::new();
    let source = r#"
        """
        Entry points.
        """
        schema @tag(name: "root") { query: Query mutation: Mutation }
        directive @tag(name: String!) repeatable on SCHEMA | OBJECT | FIELD_DEFINITION
        scalar Time
        interface Node { id: ID! }
        type Query implements Node @tag(name: "q") {
          id: ID!
          users(first: Int = 10, order: Order = ASC, where: Where = {name: "a", ids: [1, 2]}): [User!]!
        }
        type Mutation { ping(at: Time, ratio: Float = 0.5, on: Boolean = true, x: String = null): String }
        type User implements Node { id: ID! }
        union Any = Query | User
        enum Order { ASC "Descending." DESC }
        input Where { name: String ids: [Int] }
        extend type User { born: Time }
    "#;
    let first = set.parse("many.graphql", source).unwrap();
    let second = set.parse("other.gql", "type Other { a: Int }").unwrap();
    let request = request_for(vec![first, second]);

    let bytes = encode_request(&request).unwrap();
    let decoded = decode_request(&bytes).unwrap();
    assert_eq!(decoded.documents[0].definitions.len(), 11);
    assert_eq!(decoded, request);
}

#[test]
fn test_response_round_trip() {
    let response = Response {
        error: String::new(),
        files: vec![
            ResponseFile::new("a.txt", "alpha"),
            ResponseFile::new("nested/b.bin", vec![0u8, 159, 146, 150]),
        ],
    };
    let bytes = encode_response(&response).unwrap();
    assert_eq!(decode_response(&bytes).unwrap(), response);

    let failure = Response::failure("boom");
    let bytes = encode_response(&failure).unwrap();
    assert_eq!(decode_response(&bytes).unwrap().error, "boom");
}

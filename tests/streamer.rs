//! End-to-end streaming over the documents in tests/xml

use std::io::Write;
use std::path::PathBuf;
use xmlstreamer::{Element, NodeKind, StreamError, XmlReader, XmlStreamer};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("xml").join(name)
}

/// (id, name) of a streamed product
fn product(element: &Element) -> (String, String) {
    let field = |name: &str| element.child(name).map(Element::text).unwrap_or_default();
    (field("id"), field("name"))
}

fn stream_products(file: &str, names: &[&str], max: Option<usize>) -> Vec<(String, String)> {
    let mut streamer = XmlStreamer::new(names.iter().copied()).unwrap();
    if let Some(max) = max {
        streamer.set_max_elements(max).unwrap();
    }

    let last = names[names.len() - 1];
    let mut stream = streamer.stream(fixture(file)).unwrap();
    let mut out = Vec::new();
    for element in &mut stream {
        let element = element.unwrap();
        assert_eq!(element.name(), last);
        out.push(product(&element));
    }
    assert_eq!(stream.emitted(), out.len());
    out
}

fn expected(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(id, name)| (id.to_string(), name.to_string())).collect()
}

fn stream_error(file: &str) -> StreamError {
    let streamer = XmlStreamer::new(["a", "b"]).unwrap();
    let mut stream = match streamer.stream(fixture(file)) {
        Ok(stream) => stream,
        Err(e) => return e,
    };
    loop {
        match stream.next() {
            Some(Ok(_)) => continue,
            Some(Err(e)) => return e,
            None => panic!("{} streamed without error", file),
        }
    }
}

#[test]
fn test_stream_products() {
    assert_eq!(stream_products("products-empty.xml", &["products", "product"], None), expected(&[]));
    assert_eq!(
        stream_products("products-depth-0.xml", &["product"], None),
        expected(&[("1", "foo")])
    );
    assert_eq!(
        stream_products("products-depth-1.xml", &["products", "product"], None),
        expected(&[("1", "foo"), ("2", "bar")])
    );
    assert_eq!(
        stream_products("products-depth-2.xml", &["root", "products", "product"], None),
        expected(&[("1", "foo"), ("2", "bar"), ("3", "baz")])
    );
    assert_eq!(
        stream_products("products-depth-2.xml", &["root", "discontinued-products", "product"], None),
        expected(&[("1234", "oldie")])
    );
}

#[test]
fn test_stream_non_matching_paths() {
    let cases: &[(&str, &[&str])] = &[
        ("products-depth-0.xml", &["root"]),
        ("products-depth-1.xml", &["root", "product"]),
        ("products-depth-1.xml", &["products", "item"]),
        ("products-depth-2.xml", &["products", "product"]),
        ("products-depth-2.xml", &["root", "product"]),
        ("products-depth-2.xml", &["root", "products", "item"]),
        ("products-depth-2.xml", &["root", "products", "product", "id", "value"]),
    ];
    for (file, names) in cases {
        assert!(stream_products(file, names, None).is_empty(), "{} {:?}", file, names);
    }
}

#[test]
fn test_stream_max_elements() {
    let all = expected(&[("1", "foo"), ("2", "bar"), ("3", "baz")]);
    for max in 1..=4 {
        let got = stream_products("products-depth-2.xml", &["root", "products", "product"], Some(max));
        assert_eq!(got, all[..max.min(3)].to_vec(), "max {}", max);
    }
}

#[test]
fn test_stream_with_callback() {
    let streamer = XmlStreamer::new(["root", "products", "product"]).unwrap();
    let mut names = Vec::new();
    let count = streamer
        .stream_with(fixture("products-depth-2.xml"), |e| names.push(product(&e).1))
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(names, vec!["foo", "bar", "baz"]);
}

#[test]
fn test_streamer_is_reusable() {
    let streamer = XmlStreamer::new(["root", "products", "product"]).unwrap();
    let first: Vec<_> = streamer.stream(fixture("products-depth-2.xml")).unwrap().map(Result::unwrap).collect();
    let second: Vec<_> = streamer.stream(fixture("products-depth-2.xml")).unwrap().map(Result::unwrap).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_streamed_subtree_is_complete() {
    let streamer = XmlStreamer::new(["root", "discontinued-products", "product"]).unwrap();
    let mut stream = streamer.stream(fixture("products-depth-2.xml")).unwrap();
    let element = stream.next().unwrap().unwrap();
    assert_eq!(
        element.to_xml(),
        "<product>\n      <id>1234</id>\n      <name>oldie</name>\n    </product>"
    );
    assert!(stream.next().is_none());
    assert!(stream.is_closed());
}

#[test]
fn test_encoding() {
    let cases: &[(&str, Option<&str>)] = &[
        ("iso-8859-1.xml", None),
        ("iso-8859-1.xml", Some("UTF-8")),
        ("iso-8859-1-no-encoding.xml", Some("ISO-8859-1")),
    ];
    for &(file, encoding) in cases {
        let mut streamer = XmlStreamer::new(["products", "product"]).unwrap();
        streamer.set_encoding(encoding);
        let names: Vec<String> = streamer
            .stream(fixture(file))
            .unwrap()
            .map(|e| product(&e.unwrap()).1)
            .collect();
        assert_eq!(names, vec!["äëïöü"], "{} {:?}", file, encoding);
    }
}

#[test]
fn test_encoding_not_declared() {
    let streamer = XmlStreamer::new(["products", "product"]).unwrap();
    let mut stream = streamer.stream(fixture("iso-8859-1-no-encoding.xml")).unwrap();
    let err = stream.next().unwrap().unwrap_err();
    assert!(
        err.message().contains("parser error : Input is not proper UTF-8, indicate encoding !"),
        "{}",
        err
    );
    assert!(stream.next().is_none());
}

#[test]
fn test_invalid_documents() {
    let cases = [
        ("nonexistent.xml", "Unable to open source data"),
        ("empty.xml", "parser error : Extra content at the end of the document"),
        ("no-root.xml", "parser error : Extra content at the end of the document"),
        ("unclosed-root-no-contents.xml", "parser error : Extra content at the end of the document"),
        ("unclosed-root-with-contents.xml", "parser error : Extra content at the end of the document"),
        ("products-unclosed-element.xml", "parser error : Opening and ending tag mismatch"),
        ("products-invalid-entity.xml", "parser error : xmlParseEntityRef: no name"),
    ];
    for (file, message) in cases {
        let err = stream_error(file);
        assert!(err.message().contains(message), "{}: {}", file, err);
        assert!(err.reader_error().is_some());
    }
}

#[test]
fn test_error_after_partial_output() {
    // Two good items, then a mismatched end tag
    let xml = "<root><item>1</item><item>2</item><item>3</oops></root>";
    let streamer = XmlStreamer::new(["root", "item"]).unwrap();
    let mut stream = streamer.stream_reader(xml.as_bytes(), "partial.xml").unwrap();

    assert_eq!(stream.next().unwrap().unwrap().text(), "1");
    assert_eq!(stream.next().unwrap().unwrap().text(), "2");
    let err = stream.next().unwrap().unwrap_err();
    assert_eq!(
        err.to_string(),
        "partial.xml:1: parser error : Opening and ending tag mismatch: item line 1 and oops"
    );
    assert!(stream.next().is_none());
    assert_eq!(stream.emitted(), 2);
}

#[test]
fn test_limit_stops_before_malformed_tail() {
    let xml = "<root><item>1</item><item>2</item><broken</root>";
    let streamer = XmlStreamer::new(["root", "item"]).unwrap().with_max_elements(2).unwrap();
    let stream = streamer.stream_reader(xml.as_bytes(), "tail.xml").unwrap();
    let items: Result<Vec<_>, _> = stream.collect();
    assert_eq!(items.unwrap().len(), 2);
}

#[test]
fn test_mismatching_branch_is_validated() {
    let xml = "<root><skip><a></b></skip><item/></root>";
    let streamer = XmlStreamer::new(["root", "item"]).unwrap();
    let mut stream = streamer.stream_reader(xml.as_bytes(), "branch.xml").unwrap();
    let err = stream.next().unwrap().unwrap_err();
    assert!(err.message().contains("Opening and ending tag mismatch: a line 1 and b"));
}

#[test]
fn test_stream_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "<?xml version=\"1.0\"?>\n<!DOCTYPE feed>\n<feed>\n<!-- header -->\n<entry id=\"a\"><![CDATA[x < y]]></entry>\n<?skip me?>\n<entry id=\"b\"/>\n</feed>\n"
    )
    .unwrap();
    file.flush().unwrap();

    let streamer = XmlStreamer::new(["feed", "entry"]).unwrap();
    let entries: Vec<Element> = streamer.stream(file.path()).unwrap().map(Result::unwrap).collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].attribute("id"), Some("a"));
    assert_eq!(entries[0].text(), "x < y");
    assert_eq!(entries[1].to_xml(), "<entry id=\"b\"/>");
}

#[test]
fn test_reader_walks_fixture() {
    let mut reader = XmlReader::open(fixture("products-depth-1.xml"), None).unwrap();
    let mut elements = Vec::new();
    while reader.read().unwrap() {
        if reader.node_kind() == NodeKind::Element {
            elements.push((reader.name().to_string(), reader.depth()));
        }
    }
    assert_eq!(elements[0], ("products".to_string(), 0));
    assert_eq!(elements[1], ("product".to_string(), 1));
    assert_eq!(elements[2], ("id".to_string(), 2));
    assert_eq!(elements.len(), 7);
    reader.close().unwrap();
}

//! Basic example: parse a messy document, inspect it, edit it and write it back.

use lenient_xml::{IssueCollector, ParserConfig, StrSource, WriterConfig, XmlParser, DEPTH_INFINITE};

fn main() {
    let input = r#"
        <?xml version="1.0"?>
        <catalog>
            <book id="b1" lang="en">
                <title>Dune</title>
                <author>Frank Herbert
            </book>
            <book id="b2">
                <title>Solaris &ndash; a novel</title>
                <author>Stanisław Lem</author>
            </book>
            <hr>
        </catalog>
    "#;

    let parser = XmlParser::with_config(ParserConfig::new().with_empty_tags(["hr"]));

    // Recoverable problems are collected instead of failing the parse
    let mut issues = IssueCollector::new();
    let mut doc = parser
        .parse_with(StrSource::new(input), &mut issues)
        .expect("Failed to parse")
        .expect("Document has no root");

    println!("Issues:");
    for issue in &issues.issues {
        println!("  {}", issue);
    }
    println!();

    let catalog = doc.root();
    // The unclosed <author> takes the first </book>, so the second book
    // ends up nested in the first one
    println!("Books:");
    for book in catalog.descendants_by_tag_name("book", DEPTH_INFINITE) {
        let title = book
            .first_child_by_tag_name("title")
            .and_then(|t| t.child_at(0))
            .and_then(|t| t.text())
            .unwrap_or("?");
        println!("  {} ({})", title, book.attribute("id").unwrap_or("-"));
    }
    println!();

    let tagged = catalog.descendants_by_tag_name_and_attribute("book", "lang", DEPTH_INFINITE);
    println!("Books with a language: {}", tagged.len());
    println!();

    // Add a book
    let catalog_id = catalog.id();
    let book = doc.create_element("book");
    doc.set_attribute(book, "id", "b3").expect("Failed to set attribute");
    let title = doc.create_element("title");
    let text = doc.create_text("Roadside Picnic");
    doc.append_child(title, text).expect("Failed to attach text");
    doc.append_child(book, title).expect("Failed to attach title");
    doc.append_child(catalog_id, book).expect("Failed to attach book");

    println!("Pretty printed:");
    print!("{}", lenient_xml::to_string_pretty(doc.root()));
    println!();

    println!("ASCII only:");
    let ascii = WriterConfig::new().with_ascii_only(true);
    println!("{}", lenient_xml::to_string_with(doc.root(), &ascii));
}

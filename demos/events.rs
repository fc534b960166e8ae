//! Event mode with logging: stream a feed without building a tree.
//!
//! Run with `RUST_LOG=lenient_xml=debug` to see each recovered issue logged.

use lenient_xml::{EventHandler, ParseIssue, ReadSource, XmlParser};
use tracing_subscriber::EnvFilter;

/// Prints an outline of the document and skips `<script>` elements.
#[derive(Default)]
struct Outline {
    depth: usize,
    issues: usize,
}

impl EventHandler for Outline {
    fn start_tag(&mut self, name: &str) -> bool {
        if name == "script" {
            return false;
        }
        println!("{}<{}>", "  ".repeat(self.depth), name);
        self.depth += 1;
        true
    }

    fn attribute(&mut self, _tag: &str, name: &str, value: &str) {
        println!("{}@{} = {:?}", "  ".repeat(self.depth), name, value);
    }

    fn end_tag(&mut self, _name: &str) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn text(&mut self, text: &str) {
        println!("{}{:?}", "  ".repeat(self.depth), text);
    }

    fn parsing_error(&mut self, _issue: &ParseIssue) -> bool {
        self.issues += 1;
        true
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("lenient_xml=info".parse().expect("valid log directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let feed: &[u8] = b"<rss version=2.0><channel>\
        <title>Caf\xc3\xa9 news</title>\
        <script>if (a < b) alert('</channel>')</script>\
        <item><title>First &amp; best</title><link>/a?x=1&y=2</item>\
        <item><title>Second</title></item>\
        </channel></rss>";

    let mut outline = Outline::default();
    XmlParser::new()
        .event_parse(ReadSource::new(feed), &mut outline)
        .expect("Failed to parse");
    println!();
    println!("{} issue(s) recovered", outline.issues);
}

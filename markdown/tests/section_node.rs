use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drill::{Error, Node, NodeRef, Query, descend, descendants, query};
use drill_markdown::{
    BlockId, Document, MarkdownOptions, Parser, Render, SectionNode, SourceRenderer, open,
};
use pulldown_cmark::html;

const GUIDE: &str = "\
Intro text.

# Install

Run the installer.

## Linux

Use the package.

## Windows

Use the wizard.

# Usage

Run it.
";

fn guide() -> SectionNode {
    open(GUIDE, &MarkdownOptions::default())
}

fn keys(path: &[&str]) -> Vec<Query> {
    path.iter().map(|&k| Query::from(k)).collect()
}

#[test]
fn root_renders_whole_document() {
    let options = MarkdownOptions::default();
    let mut expected = String::new();
    html::push_html(
        &mut expected,
        pulldown_cmark::Parser::new_ext(GUIDE, options.to_cmark()),
    );
    assert_eq!(guide().fragment(), expected);
}

#[test]
fn section_fragment_includes_heading() {
    let node = guide().into_ref();
    let linux = descend(node, &["Install", "Linux"]).unwrap();
    assert_eq!(linux.fragment(), "<h2>Linux</h2>\n<p>Use the package.</p>\n");
}

#[test]
fn orphan_fragment_has_no_heading() {
    let node = guide().into_ref();
    let intro = query(node, &[Query::Index(0)]).unwrap();
    assert_eq!(intro.fragment(), "<p>Intro text.</p>\n");
}

#[test]
fn child_sections_by_position() {
    let node = guide();
    assert_eq!(
        node.child_sections().map(|(_, s)| s.name.as_str()).collect::<Vec<_>>(),
        vec!["", "Install", "Usage"]
    );
    let branch = node.as_ordered().unwrap();
    assert_eq!(branch.len(), 3);
    assert!(branch.ordered_child(-1).unwrap().fragment().starts_with("<h1>Usage</h1>"));
    assert!(branch.ordered_child(3).is_none());
    assert_eq!(branch.ordered_children().len(), 3);

    // Install holds the orphan for "Run the installer." plus two subsections.
    let install = node.child_named("Install").unwrap();
    assert_eq!(install.as_ordered().unwrap().len(), 3);
}

#[test]
fn mixed_queries() {
    let node = guide().into_ref();
    let windows = query(Arc::clone(&node), &[Query::Index(1), Query::from("Windows")]).unwrap();
    assert!(windows.fragment().contains("wizard"));

    assert!(query(Arc::clone(&node), &[Query::Index(2), Query::from("Windows")]).is_none());
    assert!(query(Arc::clone(&node), &keys(&["Install", "Mac"])).is_none());
    assert!(query(Arc::clone(&node), &[Query::Index(1), Query::Index(-1)])
        .unwrap()
        .fragment()
        .contains("wizard"));
    assert!(Arc::ptr_eq(&query(Arc::clone(&node), &[]).unwrap(), &node));
}

#[test]
fn descend_missing_name() {
    let node = guide().into_ref();
    assert!(descend(Arc::clone(&node), &["Usage", "Linux"]).is_none());
    assert!(descend(node, &["install"]).is_none());
}

#[test]
fn node_overrides_traversal() {
    let node = guide();
    let by_override = node.as_descender().unwrap().descend(&["Install", "Windows"]).unwrap();
    assert!(by_override.fragment().contains("wizard"));

    let by_query = node
        .as_queryer()
        .unwrap()
        .query(&[Query::from("Install"), Query::Index(0)])
        .unwrap();
    assert_eq!(by_query.fragment(), "<p>Run the installer.</p>\n");
}

#[test]
fn duplicate_names_first_wins() {
    let node = open("# X\n\none\n\n# X\n\ntwo\n", &MarkdownOptions::default());
    let first = node.as_unordered().unwrap().unordered_child("X").unwrap();
    assert!(first.fragment().contains("one"));

    let children = node.as_unordered().unwrap().unordered_children();
    assert_eq!(children.len(), 1);
    assert!(children["X"].fragment().contains("one"));
}

#[test]
fn unordered_children_include_orphan() {
    let children = guide().as_unordered().unwrap().unordered_children();
    let mut names: Vec<&str> = children.keys().map(String::as_str).collect();
    names.sort();
    assert_eq!(names, vec!["", "Install", "Usage"]);
}

#[test]
fn descendants_are_pre_order() {
    let node = guide().into_ref();
    let fragments: Vec<String> = descendants(Some(node.as_ref()))
        .iter()
        .map(|n| n.fragment())
        .collect();
    // Every headed section holds its own text in an orphan.
    let expected = [
        "<p>Intro text.</p>\n",
        "<h1>Install</h1>",
        "<p>Run the installer.</p>\n",
        "<h2>Linux</h2>",
        "<p>Use the package.</p>\n",
        "<h2>Windows</h2>",
        "<p>Use the wizard.</p>\n",
        "<h1>Usage</h1>",
        "<p>Run it.</p>\n",
    ];
    assert_eq!(fragments.len(), expected.len());
    for (fragment, prefix) in fragments.iter().zip(expected) {
        assert!(fragment.starts_with(prefix), "{:?} !~ {:?}", fragment, prefix);
    }
}

#[test]
fn views_share_document() {
    let root = guide();
    let linux = root.child_named("Install").unwrap().child_named("Linux").unwrap();
    assert_eq!(linux.name(), Some("Linux"));
    assert_eq!(linux.section().unwrap().level, 2);
    assert!(Arc::ptr_eq(linux.document(), root.document()));
    assert_eq!(linux.root().block(), BlockId::ROOT);
    assert_eq!(root.name(), None);
    assert!(GUIDE[linux.span()].starts_with("## Linux"));
}

#[test]
fn source_renderer_writes_markdown() {
    let root = guide().with_renderer(Some(Arc::new(SourceRenderer)));
    let windows = root.child_named("Install").unwrap().child_named("Windows").unwrap();
    let text = windows.fragment();
    assert!(text.starts_with("## Windows"));
    assert!(text.contains("Use the wizard."));
    assert!(!text.contains("# Usage"));
}

#[test]
fn no_renderer() {
    let doc = Arc::new(Parser::new().parse(GUIDE));
    let node = SectionNode::new(doc, None);
    assert_eq!(node.fragment(), "");
    assert!(matches!(
        node.as_reader().unwrap().fragment_reader(),
        Err(Error::NoRenderer)
    ));
    // Traversal still works without a renderer.
    assert!(node.child_named("Usage").is_some());
}

fn read_all(node: &dyn Node) -> io::Result<String> {
    let mut text = String::new();
    node.as_reader()
        .unwrap()
        .fragment_reader()
        .map_err(|err| io::Error::other(err.to_string()))?
        .read_to_string(&mut text)?;
    Ok(text)
}

#[test]
fn streamed_fragment_matches() {
    let root = guide();
    assert_eq!(read_all(&root).unwrap(), root.fragment());

    let mut long = String::from("# Long\n\n");
    for i in 0..2000 {
        long.push_str(&format!("Paragraph number {}.\n\n", i));
    }
    let node = open(long, &MarkdownOptions::default());
    let streamed = read_all(&node).unwrap();
    assert!(streamed.len() > 32 * 1024);
    assert_eq!(streamed, node.fragment());
}

/// Writes some output, then fails.
struct Failing;

impl Render for Failing {
    fn render(&self, w: &mut dyn Write, _: &Document, _: BlockId) -> io::Result<()> {
        w.write_all(b"partial")?;
        Err(io::Error::other("render exploded"))
    }
}

#[test]
fn render_failure_reaches_reader() {
    let node = guide().with_renderer(Some(Arc::new(Failing)));
    assert_eq!(node.fragment(), "");

    let mut reader = node.as_reader().unwrap().fragment_reader().unwrap();
    let mut buf = Vec::new();
    let err = reader.read_to_end(&mut buf).unwrap_err();
    assert!(err.to_string().contains("render exploded"));
    assert_eq!(buf, b"partial");
    // The failure sticks.
    assert!(reader.read(&mut [0u8; 16]).is_err());
}

/// Writes until the pipe breaks, then reports the error.
struct Endless(mpsc::Sender<io::ErrorKind>);

impl Render for Endless {
    fn render(&self, w: &mut dyn Write, _: &Document, _: BlockId) -> io::Result<()> {
        let chunk = [b'x'; 1024];
        loop {
            if let Err(err) = w.write_all(&chunk) {
                let _ = self.0.send(err.kind());
                return Err(err);
            }
        }
    }
}

#[test]
fn dropping_reader_stops_producer() {
    let (tx, rx) = mpsc::channel();
    let node = guide().with_renderer(Some(Arc::new(Endless(tx))));
    let mut reader = node.as_reader().unwrap().fragment_reader().unwrap();
    let mut buf = [0u8; 100];
    reader.read_exact(&mut buf).unwrap();
    assert_eq!(buf, [b'x'; 100]);
    drop(reader);

    let kind = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(kind, io::ErrorKind::BrokenPipe);
}

/// Writes a little, waits to be resumed, then makes one small write.
struct Paused {
    resume: Mutex<mpsc::Receiver<()>>,
    result: mpsc::Sender<Option<io::ErrorKind>>,
}

impl Render for Paused {
    fn render(&self, w: &mut dyn Write, _: &Document, _: BlockId) -> io::Result<()> {
        w.write_all(b"ready")?;
        w.flush()?;
        let _ = self.resume.lock().unwrap().recv();
        let kind = w.write(b"x").err().map(|err| err.kind());
        let _ = self.result.send(kind);
        Ok(())
    }
}

#[test]
fn first_write_after_reader_dropped_fails() {
    let (resume_tx, resume_rx) = mpsc::channel();
    let (result_tx, result_rx) = mpsc::channel();
    let node = guide().with_renderer(Some(Arc::new(Paused {
        resume: Mutex::new(resume_rx),
        result: result_tx,
    })));
    let mut reader = node.as_reader().unwrap().fragment_reader().unwrap();
    let mut buf = [0u8; 5];
    reader.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ready");
    drop(reader);
    resume_tx.send(()).unwrap();

    let kind = result_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(kind, Some(io::ErrorKind::BrokenPipe));
}

#[test]
fn node_refs_are_shareable() {
    let node: NodeRef = guide().into_ref();
    let handle = {
        let node = Arc::clone(&node);
        std::thread::spawn(move || descend(node, &["Usage"]).map(|n| n.fragment()))
    };
    let from_thread = handle.join().unwrap().unwrap();
    assert_eq!(from_thread, descend(node, &["Usage"]).unwrap().fragment());
}

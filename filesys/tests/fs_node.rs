use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use drill::{Node, NodeRef, Query, descend, descendants, query};
use drill_filesys::{Error, FsNode, Handler, HandlerFn, Handlers, text_handler};
use tempfile::TempDir;

struct Label(String);

impl Node for Label {
    fn fragment(&self) -> String {
        self.0.clone()
    }
}

fn label(text: &'static str) -> HandlerFn {
    Arc::new(move |path: &Path| -> Option<NodeRef> {
        let name = path.file_name()?.to_string_lossy();
        Some(Arc::new(Label(format!("{}:{}", text, name))))
    })
}

/// root/
///   a.md
///   b.txt
///   sub/
///     c.txt
///   z.bin
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.md"), "# A\n").unwrap();
    fs::write(dir.path().join("b.txt"), "bee").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/c.txt"), "sea").unwrap();
    fs::write(dir.path().join("z.bin"), [0u8, 1, 2]).unwrap();
    dir
}

fn text_only() -> Handlers {
    Handlers::new(vec![Handler::new("*.txt", text_handler())]).unwrap()
}

fn root(dir: &TempDir, handlers: Handlers) -> NodeRef {
    Arc::new(FsNode::new(dir.path(), handlers))
}

#[test]
fn malformed_pattern_is_reported() {
    let err = Handlers::new(vec![
        Handler::new("*.md", label("md")),
        Handler::new("[", label("broken")),
    ])
    .unwrap_err();
    match &err {
        Error::Pattern { index, pattern, .. } => {
            assert_eq!(*index, 1);
            assert_eq!(pattern, "[");
        }
    }
    assert!(err.to_string().starts_with("handler 1, pattern \"[\""));
}

#[test]
fn first_matching_handler_wins() {
    let handlers = Handlers::new(vec![
        Handler::new("*.txt", label("txt")),
        Handler::new("*", label("any")),
    ])
    .unwrap();
    let txt = handlers.matching("b.txt").unwrap();
    assert_eq!(txt(Path::new("b.txt")).unwrap().fragment(), "txt:b.txt");
    let any = handlers.matching("a.md").unwrap();
    assert_eq!(any(Path::new("a.md")).unwrap().fragment(), "any:a.md");
    assert_eq!(handlers.position("b.txt"), Some(0));
    assert_eq!(handlers.position("a.md"), Some(1));
    assert_eq!(handlers.len(), 2);
    assert_eq!(handlers.handlers()[1].pattern, "*");
}

#[test]
fn patterns_do_not_cross_separators() {
    let handlers = text_only();
    assert!(handlers.matching("c.txt").is_some());
    assert!(handlers.matching("sub/c.txt").is_none());
    assert!(Handlers::default().matching("c.txt").is_none());
}

#[test]
fn ordered_children_sorted_by_name() {
    let dir = fixture();
    let node = root(&dir, text_only());
    let branch = node.as_ordered().unwrap();
    assert_eq!(branch.len(), 4);

    let b = branch.ordered_child(1).unwrap();
    assert_eq!(b.fragment(), "bee");
    let last = branch.ordered_child(-1).unwrap();
    assert_eq!(last.fragment().as_bytes(), &[0u8, 1, 2]);
    assert!(branch.ordered_child(4).is_none());
    assert!(branch.ordered_child(-5).is_none());

    let sub = branch.ordered_child(2).unwrap();
    assert_eq!(sub.fragment(), "");
    assert_eq!(sub.as_ordered().unwrap().len(), 1);
}

#[test]
fn files_have_no_entries() {
    let dir = fixture();
    let node = root(&dir, text_only());
    let file = node.as_ordered().unwrap().ordered_child(0).unwrap();
    let branch = file.as_ordered().unwrap();
    assert!(branch.is_empty());
    assert!(branch.ordered_child(0).is_none());
}

#[test]
fn unordered_child_uses_handlers() {
    let dir = fixture();
    let node = root(&dir, text_only());
    let branch = node.as_unordered().unwrap();

    assert_eq!(branch.unordered_child("b.txt").unwrap().fragment(), "bee");
    assert!(branch.unordered_child("sub").is_some());
    assert!(branch.unordered_child("z.bin").is_none());
    assert!(branch.unordered_child("a.md").is_none());
    assert!(branch.unordered_child("missing.txt").is_none());
    assert!(branch.unordered_child("../b.txt").is_none());
    assert!(branch.unordered_child("").is_none());
}

#[test]
fn unordered_children_skip_unhandled_files() {
    let dir = fixture();
    let node = root(&dir, text_only());
    let children = node.as_unordered().unwrap().unordered_children();
    let mut names: Vec<&str> = children.keys().map(String::as_str).collect();
    names.sort();
    assert_eq!(names, vec!["b.txt", "sub"]);
    assert_eq!(children["b.txt"].fragment(), "bee");
}

#[test]
fn handlers_are_inherited() {
    let dir = fixture();
    let node = root(&dir, text_only());
    let found = descend(Arc::clone(&node), &["sub", "c.txt"]).unwrap();
    assert_eq!(found.fragment(), "sea");

    let by_index = query(node, &[Query::Index(2), Query::from("c.txt")]).unwrap();
    assert_eq!(by_index.fragment(), "sea");
}

#[test]
fn descendants_walk_the_tree() {
    let dir = fixture();
    let node = root(&dir, text_only());
    let all = descendants(Some(node.as_ref()));
    assert_eq!(all.len(), 5);
    let contents: Vec<String> = all.iter().map(|n| n.fragment()).collect();
    assert_eq!(contents[1], "bee");
    assert_eq!(contents[3], "sea");
}

#[test]
fn fragment_reader_streams_files() {
    let dir = fixture();
    let node = root(&dir, text_only());
    assert!(node.as_reader().unwrap().fragment_reader().is_err());

    let file = descend(node, &["b.txt"]).unwrap();
    let mut text = String::new();
    file.as_reader()
        .unwrap()
        .fragment_reader()
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "bee");
}

#[test]
fn missing_root_is_empty() {
    let dir = fixture();
    let node: NodeRef = Arc::new(FsNode::new(dir.path().join("nope"), text_only()));
    assert_eq!(node.fragment(), "");
    assert_eq!(node.as_ordered().unwrap().len(), 0);
    assert!(node.as_unordered().unwrap().unordered_children().is_empty());
}

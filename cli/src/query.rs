use std::fs;
use std::io::{self, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use drill::{Node, NodeRef, Query, descend, query};
use drill_filesys::{FsNode, text_handler};
use drill_markdown::{HtmlRenderer, Parser, Render, SectionNode, SourceRenderer};
use tracing::debug;

use crate::config::{Config, Format};
use crate::error::CliError;

#[derive(clap::Args)]
pub struct QueryArgs {
    /// Directory or file to drill into
    pub path: PathBuf,

    /// Query tokens. Integers select by position (negative counts from the
    /// end), anything else selects by name.
    #[arg(allow_negative_numbers = true)]
    pub tokens: Vec<String>,

    /// Treat every token as a name
    #[arg(short, long)]
    pub key: bool,

    /// Read the fragment as a stream
    #[arg(long)]
    pub stream: bool,

    /// List the children of the result instead of printing its fragment
    #[arg(long, conflicts_with = "tree")]
    pub list: bool,

    /// Print every node below the result
    #[arg(long)]
    pub tree: bool,

    /// Dump the parsed document (markdown files only)
    #[arg(long)]
    pub ast: bool,

    /// How markdown sections are rendered
    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Html,
    Source,
}

impl OutputFormat {
    fn renderer(self) -> Arc<dyn Render> {
        match self {
            OutputFormat::Html => Arc::new(HtmlRenderer),
            OutputFormat::Source => Arc::new(SourceRenderer),
        }
    }
}

/// Integers become positions; everything else is a name.
pub fn parse_token(token: &str, key: bool) -> Query {
    if !key {
        if let Ok(i) = token.parse::<isize>() {
            return Query::Index(i);
        }
    }
    Query::Key(token.to_string())
}

pub fn format_tokens(tokens: &[Query]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// What a query starts from.
enum Target {
    /// A markdown file, kept concrete for diagnostics and dumps.
    Document { path: PathBuf, root: SectionNode },
    Node(NodeRef),
}

fn open_target(path: &Path, config: &Config, renderer: Arc<dyn Render>) -> Result<Target, CliError> {
    let read_error = |source| CliError::Read {
        path: path.to_path_buf(),
        source,
    };
    let meta = fs::metadata(path).map_err(read_error)?;
    if meta.is_dir() {
        let handlers = config.handlers(renderer)?;
        return Ok(Target::Node(Arc::new(FsNode::new(path, handlers))));
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    match config.format_for(name)? {
        Some(Format::Markdown) => {
            let source = fs::read_to_string(path).map_err(read_error)?;
            let doc = Parser::new().with_options(&config.markdown).parse(source);
            Ok(Target::Document {
                path: path.to_path_buf(),
                root: SectionNode::new(Arc::new(doc), Some(renderer)),
            })
        }
        Some(Format::Text) => text_handler()(path)
            .map(Target::Node)
            .ok_or_else(|| CliError::NoHandler(path.to_path_buf())),
        None => Err(CliError::NoHandler(path.to_path_buf())),
    }
}

/// A section lookup that stopped early.
#[derive(Debug)]
pub struct Miss {
    /// Deepest section that was reached.
    pub reached: SectionNode,
    /// Index of the token that matched nothing.
    pub step: usize,
}

/// Follows `tokens` through the section tree, one direct child at a time.
pub fn walk(root: &SectionNode, tokens: &[Query]) -> Result<SectionNode, Miss> {
    let mut node = root.clone();
    for (step, token) in tokens.iter().enumerate() {
        let child = match token {
            Query::Key(name) => node.child_named(name),
            Query::Index(i) => node.child_at(*i),
        };
        match child {
            Some(child) => node = child,
            None => {
                return Err(Miss {
                    reached: node,
                    step,
                });
            }
        }
    }
    Ok(node)
}

/// Runs the query command. Returns the process exit code.
pub fn run(args: &QueryArgs, config: &Config, color: ColorChoice) -> Result<i32, CliError> {
    let tokens: Vec<Query> = args.tokens.iter().map(|t| parse_token(t, args.key)).collect();
    debug!(path = %args.path.display(), tokens = %format_tokens(&tokens), "query");

    let target = open_target(&args.path, config, args.format.renderer())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match target {
        Target::Document { path, root } => {
            if args.ast {
                write!(out, "{}", root.document().dump())?;
                return Ok(0);
            }
            // With --key every token is already a name, so this follows the
            // same path as the section tree's own descend.
            let found = match walk(&root, &tokens) {
                Ok(found) => found,
                Err(miss) => {
                    report_miss(&path, &miss, &tokens, color)?;
                    return Ok(1);
                }
            };
            if args.list {
                list_sections(&mut out, &found)?;
            } else if args.tree {
                section_tree(&mut out, &found, 0)?;
            } else {
                print_fragment(&mut out, &found, args.stream)?;
            }
        }
        Target::Node(node) => {
            if args.ast {
                return Err(CliError::AstUnsupported);
            }
            let found = if args.key {
                let names: Vec<&str> = tokens.iter().filter_map(Query::as_key).collect();
                descend(node, &names)
            } else {
                query(node, &tokens)
            };
            let Some(found) = found else {
                return Err(CliError::NotFound(format_tokens(&tokens)));
            };
            if args.list {
                list_children(&mut out, found.as_ref())?;
            } else if args.tree {
                node_tree(&mut out, found.as_ref(), 0)?;
            } else {
                print_fragment(&mut out, found.as_ref(), args.stream)?;
            }
        }
    }
    out.flush()?;
    Ok(0)
}

fn print_fragment(out: &mut dyn Write, node: &dyn Node, stream: bool) -> Result<(), CliError> {
    match node.as_reader() {
        Some(reader) if stream => {
            let mut reader = reader.fragment_reader()?;
            io::copy(&mut reader, out)?;
        }
        _ => out.write_all(node.fragment().as_bytes())?,
    }
    Ok(())
}

fn section_label(name: &str) -> &str {
    if name.is_empty() { "(orphan)" } else { name }
}

fn list_sections(out: &mut dyn Write, node: &SectionNode) -> io::Result<()> {
    for (i, (_, section)) in node.child_sections().enumerate() {
        writeln!(out, "{}\t{}", i, section_label(&section.name))?;
    }
    Ok(())
}

fn section_tree(out: &mut dyn Write, node: &SectionNode, depth: usize) -> io::Result<()> {
    for (i, (_, section)) in node.child_sections().enumerate() {
        writeln!(
            out,
            "{}{} {}",
            "  ".repeat(depth),
            "#".repeat(section.level as usize),
            section_label(&section.name)
        )?;
        if let Some(child) = node.child_at(i as isize) {
            section_tree(out, &child, depth + 1)?;
        }
    }
    Ok(())
}

/// Keyed children, sorted, or positions when the node has no keys.
fn list_children(out: &mut dyn Write, node: &dyn Node) -> io::Result<()> {
    if let Some(branch) = node.as_unordered() {
        let mut names: Vec<String> = branch.unordered_children().into_keys().collect();
        names.sort();
        for name in names {
            writeln!(out, "{}", section_label(&name))?;
        }
    } else if let Some(branch) = node.as_ordered() {
        for i in 0..branch.len() {
            writeln!(out, "{}", i)?;
        }
    }
    Ok(())
}

fn node_tree(out: &mut dyn Write, node: &dyn Node, depth: usize) -> io::Result<()> {
    let Some(branch) = node.as_unordered() else {
        return Ok(());
    };
    let mut children: Vec<(String, NodeRef)> = branch.unordered_children().into_iter().collect();
    children.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, child) in children {
        writeln!(out, "{}{}", "  ".repeat(depth), section_label(&name))?;
        node_tree(out, child.as_ref(), depth + 1)?;
    }
    Ok(())
}

/// First line of `span` in `source`.
fn first_line(source: &str, span: Range<usize>) -> Range<usize> {
    let text = source.get(span.clone()).unwrap_or_default();
    let len = text.find('\n').unwrap_or(text.len());
    span.start..span.start + len
}

fn report_miss(path: &Path, miss: &Miss, tokens: &[Query], color: ColorChoice) -> io::Result<()> {
    let doc = miss.reached.document();
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), doc.source());

    let token = &tokens[miss.step];
    let reached = match miss.reached.name() {
        None => "document".to_string(),
        Some("") => "orphaned section".to_string(),
        Some(name) => format!("section {:?}", name),
    };
    let available: Vec<String> = miss
        .reached
        .child_sections()
        .enumerate()
        .map(|(i, (_, s))| format!("{}: {}", i, section_label(&s.name)))
        .collect();
    let note = if available.is_empty() {
        format!("{} has no sections", reached)
    } else {
        format!("available: {}", available.join(", "))
    };

    let diagnostic = Diagnostic::error()
        .with_message(format!("no section matches {}", token))
        .with_labels(vec![
            Label::primary(file_id, first_line(doc.source(), miss.reached.span()))
                .with_message(format!("in this {}", reached)),
        ])
        .with_notes(vec![note]);

    let writer = StandardStream::stderr(color);
    let config = term::Config::default();
    term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic)
        .map_err(io::Error::other)
}

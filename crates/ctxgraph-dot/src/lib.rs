//! Ctxgraph DOT - text serialization for graph stores
//!
//! Reads and writes a DOT-like grammar:
//!
//! ```text
//! digraph NAME {
//!   "src" -> "dst" [label="L", expire_time="T", within="(T1,T2)"];
//! }
//! ```
//!
//! `expire_time` and the `within` bounds are Unix timestamps in seconds.
//! A missing `label` yields an empty edge label, a missing `expire_time`
//! means the edge never expires, a missing `within` means permanently
//! valid. Loading is atomic: the whole input is parsed before the first
//! edge is inserted, so a corrupt file leaves the target graph unchanged.

pub mod error;

pub use error::{DotError, DotResult};

use chrono::{DateTime, Utc};
use ctxgraph_core::{never_expires, GraphStore, ValidityWindow};
use regex::Regex;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::OnceLock;

struct Statement {
    label: String,
    source: String,
    destination: String,
    expire_at: DateTime<Utc>,
    window: ValidityWindow,
}

/// Parse DOT text into a fresh graph.
pub fn parse(input: &str) -> DotResult<GraphStore> {
    let mut graph = GraphStore::new();
    parse_into(input, &mut graph)?;
    Ok(graph)
}

/// Parse DOT text and append its edges to an existing graph.
pub fn parse_into(input: &str, graph: &mut GraphStore) -> DotResult<()> {
    let open = input
        .find('{')
        .ok_or_else(|| DotError::Parse("missing opening brace".into()))?;
    let close = input
        .rfind('}')
        .ok_or_else(|| DotError::Parse("missing closing brace".into()))?;
    if close < open {
        return Err(DotError::Parse("braces out of order".into()));
    }
    let body = &input[open + 1..close];

    // Parse everything first so a malformed statement mutates nothing.
    let mut statements = Vec::new();
    for raw in body.split(';') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        statements.push(parse_statement(raw)?);
    }

    tracing::debug!(edges = statements.len(), "loading DOT graph");
    for st in statements {
        graph.add_edge_timed(
            &st.label,
            &st.source,
            &st.destination,
            st.expire_at,
            st.window,
        );
    }
    Ok(())
}

/// Serialize every live edge of `graph` as DOT text. Expirations and
/// validity windows are written only when finite, so a reloaded graph
/// carries the same temporal state.
pub fn to_dot(graph: &GraphStore, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {name} {{");
    for (_, edge) in graph.edges() {
        let mut attrs = format!("label=\"{}\"", escape(&edge.label));
        let expiry = edge.last_expiration();
        if expiry != never_expires() {
            let _ = write!(attrs, ", expire_time=\"{}\"", expiry.timestamp());
        }
        if edge.window != ValidityWindow::permanent() {
            let _ = write!(
                attrs,
                ", within=\"({},{})\"",
                edge.window.from.timestamp(),
                edge.window.to.timestamp()
            );
        }
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [{attrs}];",
            escape(graph.node_label(edge.source)),
            escape(graph.node_label(edge.destination))
        );
    }
    out.push('}');
    out
}

pub fn read_file(path: impl AsRef<Path>) -> DotResult<GraphStore> {
    let input = std::fs::read_to_string(path)?;
    parse(&input)
}

pub fn write_file(graph: &GraphStore, path: impl AsRef<Path>, name: &str) -> DotResult<()> {
    std::fs::write(path, to_dot(graph, name))?;
    Ok(())
}

fn parse_statement(raw: &str) -> DotResult<Statement> {
    static EDGE_RE: OnceLock<Regex> = OnceLock::new();
    let edge_re = EDGE_RE.get_or_init(|| {
        Regex::new(
            r#"^\s*("(?:[^"\\]|\\.)*"|[^\s\[]+)\s*->\s*("(?:[^"\\]|\\.)*"|[^\s\[]+)\s*(?:\[(.*)\])?\s*$"#,
        )
        .expect("statement pattern is valid")
    });
    let caps = edge_re
        .captures(raw)
        .ok_or_else(|| DotError::Parse(format!("unrecognized statement: {raw}")))?;

    let source = unquote(&caps[1]);
    let destination = unquote(&caps[2]);

    let mut label = String::new();
    let mut expire_at = never_expires();
    let mut window = ValidityWindow::permanent();

    if let Some(attrs) = caps.get(3) {
        static ATTR_RE: OnceLock<Regex> = OnceLock::new();
        let attr_re = ATTR_RE.get_or_init(|| {
            Regex::new(r#"(\w+)\s*=\s*("(?:[^"\\]|\\.)*"|[^,\]\s]+)"#)
                .expect("attribute pattern is valid")
        });
        for attr in attr_re.captures_iter(attrs.as_str()) {
            let name = &attr[1];
            let value = unquote(&attr[2]);
            match name {
                "label" => label = value,
                "expire_time" => {
                    expire_at = parse_timestamp(&value).ok_or_else(|| DotError::Attribute {
                        name: name.to_string(),
                        value: value.clone(),
                    })?;
                }
                "within" => {
                    window = parse_window(&value).ok_or_else(|| DotError::Attribute {
                        name: name.to_string(),
                        value: value.clone(),
                    })?;
                }
                _ => {
                    tracing::debug!(attribute = name, "skipping unknown edge attribute");
                }
            }
        }
    }

    Ok(Statement {
        label,
        source,
        destination,
        expire_at,
        window,
    })
}

/// Inverse of [`unquote`]: embedded quotes become `\"`.
fn escape(raw: &str) -> String {
    raw.replace('"', "\\\"")
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\\\"", "\"")
    } else {
        trimmed.to_string()
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = value.trim().parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// `(T1,T2)` with Unix-second bounds.
fn parse_window(value: &str) -> Option<ValidityWindow> {
    let inner = value.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (from, to) = inner.split_once(',')?;
    Some(ValidityWindow::new(
        parse_timestamp(from)?,
        parse_timestamp(to)?,
    ))
}

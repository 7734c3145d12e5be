//! Per-node replacement rules layered over the generic converter
//!
//! The generic converter knows how every element renders by default. A
//! [`RuleSet`] lets settings override that for specific element types: each
//! [`NodeRule`] names the elements it applies to and computes replacement
//! text from the element alone, without looking at the surrounding output.
//! Rules are consulted in registration order and the first one accepting an
//! element wins.
//!
//! | Rule             | Active when              | Elements | Replacement                  |
//! |------------------|--------------------------|----------|------------------------------|
//! | `SuppressImages` | images are excluded      | `img`    | empty                        |
//! | `FlattenLinks`   | links are excluded       | `a`      | the anchor's text content    |
//! | `PipeTable`      | tables are preserved     | `table`  | pipe-delimited Markdown table |

use markup5ever_rcdom::{Handle, NodeData};

use crate::converter::ConversionOptions;

/// A single replacement strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRule {
    SuppressImages,
    FlattenLinks,
    PipeTable,
}

impl NodeRule {
    pub fn name(&self) -> &'static str {
        match self {
            NodeRule::SuppressImages => "removeImages",
            NodeRule::FlattenLinks => "removeLinks",
            NodeRule::PipeTable => "table",
        }
    }

    /// Whether this rule handles elements named `tag_name`
    pub fn accepts(&self, tag_name: &str) -> bool {
        match self {
            NodeRule::SuppressImages => tag_name == "img",
            NodeRule::FlattenLinks => tag_name == "a",
            NodeRule::PipeTable => tag_name == "table",
        }
    }

    /// Replacement text for an accepted element
    pub fn replacement(&self, node: &Handle) -> String {
        match self {
            NodeRule::SuppressImages => String::new(),
            NodeRule::FlattenLinks => text_content(node),
            NodeRule::PipeTable => render_pipe_table(node),
        }
    }
}

/// Ordered collection of active rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<NodeRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules implied by the output options
    pub fn from_options(options: &ConversionOptions) -> Self {
        let mut rules = Self::new();
        if !options.include_images {
            rules.add(NodeRule::SuppressImages);
        }
        if !options.include_links {
            rules.add(NodeRule::FlattenLinks);
        }
        if options.preserve_tables {
            rules.add(NodeRule::PipeTable);
        }
        rules
    }

    pub fn add(&mut self, rule: NodeRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[NodeRule] {
        &self.rules
    }

    pub fn contains(&self, rule: NodeRule) -> bool {
        self.rules.contains(&rule)
    }

    /// Replacement from the first rule accepting `tag_name`, if any
    pub fn apply(&self, tag_name: &str, node: &Handle) -> Option<String> {
        self.rules
            .iter()
            .find(|rule| rule.accepts(tag_name))
            .map(|rule| rule.replacement(node))
    }
}

/// Concatenated text of every descendant text node, like DOM `textContent`
///
/// The walk keeps its own stack, so arbitrarily deep markup cannot exhaust
/// the thread's stack.
pub fn text_content(node: &Handle) -> String {
    let mut output = String::new();
    let mut pending = vec![node.clone()];

    while let Some(current) = pending.pop() {
        match current.data {
            NodeData::Text { ref contents } => output.push_str(&contents.borrow()),
            NodeData::Element { .. } | NodeData::Document => {
                pending.extend(current.children.borrow().iter().rev().cloned());
            }
            _ => {}
        }
    }

    output
}

fn is_element(node: &Handle, tags: &[&str]) -> bool {
    match node.data {
        NodeData::Element { ref name, .. } => tags.contains(&name.local.as_ref()),
        _ => false,
    }
}

/// Descendants of `node` (excluding itself) named in `tags`, in document order
fn descendants_named(node: &Handle, tags: &[&str]) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut pending: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();

    while let Some(current) = pending.pop() {
        if is_element(&current, tags) {
            found.push(current.clone());
        }
        pending.extend(current.children.borrow().iter().rev().cloned());
    }

    found
}

/// Cell text with pipes escaped and newlines flattened
fn cell_text(cell: &Handle) -> String {
    text_content(cell)
        .replace('|', "\\|")
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// Render every `tr` under `table` as a pipe row
///
/// The first row is treated as the header whatever its cells are, and is
/// followed by a `---` separator with one cell per column of that row.
pub fn render_pipe_table(table: &Handle) -> String {
    let rows = descendants_named(table, &["tr"]);
    if rows.is_empty() {
        return String::new();
    }

    let mut markdown = String::from("\n\n");
    for (index, row) in rows.iter().enumerate() {
        let cells = descendants_named(row, &["th", "td"]);
        let contents: Vec<String> = cells.iter().map(cell_text).collect();

        markdown.push_str("| ");
        markdown.push_str(&contents.join(" | "));
        markdown.push_str(" |\n");

        if index == 0 {
            markdown.push_str("| ");
            markdown.push_str(&vec!["---"; cells.len()].join(" | "));
            markdown.push_str(" |\n");
        }
    }
    markdown.push('\n');
    markdown
}

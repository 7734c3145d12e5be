//! Markdown converter - transforms a DOM tree to Markdown
//!
//! The converter walks an html5ever DOM depth-first, in document order, and
//! writes Markdown for each node into a single output buffer. Elements are
//! handled in three layers:
//!
//! 1. the [`SecurityPolicy`] drops non-content subtrees (`script`, `style`,
//!    `head`, ...) and rejects trees nested deeper than its limit;
//! 2. the active [`RuleSet`] may replace an element outright (suppressed
//!    images, flattened links, pipe tables);
//! 3. otherwise a per-tag handler renders the element, falling back to
//!    walking the children as a plain container.
//!
//! # Output shape
//!
//! - Headings are ATX style (`#` to `######`)
//! - Block elements are separated by one blank line
//! - `strong`/`b` become `**text**`, `em`/`i` become `*text*`
//! - Unordered lists use `- `, ordered lists count up from their `start`
//! - `pre` becomes a fenced block, tagged with a `language-*`/`lang-*` class
//! - Text is whitespace-collapsed except inside code
//!
//! The raw buffer is tidied (LF line endings, no trailing spaces outside
//! fenced code) and finally passed through [`clean_whitespace`].
//!
//! # Examples
//!
//! ```rust
//! use page2md::converter::MarkdownConverter;
//!
//! let converter = MarkdownConverter::new();
//! let markdown = converter.convert_html("<h1>Title</h1><p>Some <b>bold</b> text.</p>").unwrap();
//! assert_eq!(markdown, "# Title\n\nSome **bold** text.");
//! ```

use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::ConversionError;
use crate::parser::parse_html;
use crate::rules::{RuleSet, text_content};
use crate::security::SecurityPolicy;
use crate::settings::ExtensionSettings;

/// Elements rendered as standalone blocks separated by blank lines
const BLOCK_ELEMENTS: &[&str] = &[
    "div",
    "section",
    "article",
    "main",
    "header",
    "footer",
    "aside",
    "nav",
    "figure",
    "figcaption",
    "address",
    "details",
    "summary",
    "dl",
    "dt",
    "dd",
    "form",
    "fieldset",
    "center",
];

/// Table structure, rendered as plain blocks when tables are not preserved
const TABLE_ELEMENTS: &[&str] = &[
    "table", "caption", "thead", "tbody", "tfoot", "tr", "th", "td",
];

/// Output toggles that shape the active rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Render `img` elements as Markdown images
    pub include_images: bool,

    /// Render `a` elements as Markdown links
    pub include_links: bool,

    /// Render tables as pipe tables instead of plain blocks
    pub preserve_tables: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            include_links: true,
            preserve_tables: true,
        }
    }
}

impl From<&ExtensionSettings> for ConversionOptions {
    fn from(settings: &ExtensionSettings) -> Self {
        Self {
            include_images: settings.include_images,
            include_links: settings.include_links,
            preserve_tables: settings.preserve_tables,
        }
    }
}

/// HTML to Markdown converter
///
/// A converter is cheap to build and holds no per-conversion state, so a
/// fresh one can be created for every request from the current settings.
///
/// ```rust
/// use page2md::converter::{ConversionOptions, MarkdownConverter};
///
/// let converter = MarkdownConverter::with_options(ConversionOptions {
///     include_links: false,
///     ..Default::default()
/// });
/// let markdown = converter.convert_html(r#"<a href="http://x">Click</a>"#).unwrap();
/// assert_eq!(markdown, "Click");
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    options: ConversionOptions,
    rules: RuleSet,
    security: SecurityPolicy,
}

impl MarkdownConverter {
    /// Converter with every output option enabled
    pub fn new() -> Self {
        Self::with_options(ConversionOptions::default())
    }

    pub fn with_options(options: ConversionOptions) -> Self {
        let rules = RuleSet::from_options(&options);
        Self {
            options,
            rules,
            security: SecurityPolicy::new(),
        }
    }

    /// Converter configured from the output flags of `settings`
    pub fn from_settings(settings: &ExtensionSettings) -> Self {
        Self::with_options(ConversionOptions::from(settings))
    }

    /// Replace the default security policy
    pub fn with_security_policy(mut self, security: SecurityPolicy) -> Self {
        self.security = security;
        self
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Convert a parsed DOM tree to Markdown
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the tree is nested deeper than the
    /// security policy allows.
    pub fn convert(&self, dom: &RcDom) -> Result<String, ConversionError> {
        let mut output = String::with_capacity(1024);
        self.traverse_node(&dom.document, &mut output, 0)?;
        Ok(clean_whitespace(&self.tidy_lines(&output)))
    }

    /// Parse `html` and convert it in one step
    pub fn convert_html(&self, html: &str) -> Result<String, ConversionError> {
        let dom = parse_html(html);
        self.convert(&dom)
    }

    /// Traverse a DOM node and write Markdown for it and its subtree
    ///
    /// `depth` counts element nesting from the document root and is checked
    /// against the security policy for every element.
    fn traverse_node(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
    ) -> Result<(), ConversionError> {
        match node.data {
            NodeData::Document => {
                for child in node.children.borrow().iter() {
                    self.traverse_node(child, output, depth)?;
                }
            }
            NodeData::Element { ref name, .. } => {
                let tag_name = name.local.as_ref();
                self.handle_element(node, tag_name, output, depth)?;
            }
            NodeData::Text { ref contents } => {
                let text = contents.borrow();
                let normalized = normalize_text(&text);
                if normalized.is_empty() {
                    // Whitespace between inline elements still separates words
                    if !text.is_empty() && !output.is_empty() && needs_space(output) {
                        output.push(' ');
                    }
                } else {
                    let escaped = escape_markdown(&normalized, at_line_start(output));
                    push_inline(output, &text, &escaped);
                }
            }
            NodeData::Comment { .. }
            | NodeData::Doctype { .. }
            | NodeData::ProcessingInstruction { .. } => {}
        }

        Ok(())
    }

    fn handle_element(
        &self,
        node: &Handle,
        tag_name: &str,
        output: &mut String,
        depth: usize,
    ) -> Result<(), ConversionError> {
        if self.security.is_skipped_element(tag_name) {
            return Ok(());
        }
        self.security.check_depth(depth)?;

        if let Some(replacement) = self.rules.apply(tag_name, node) {
            output.push_str(&replacement);
            return Ok(());
        }

        match tag_name {
            "h1" => self.handle_heading(node, 1, output, depth)?,
            "h2" => self.handle_heading(node, 2, output, depth)?,
            "h3" => self.handle_heading(node, 3, output, depth)?,
            "h4" => self.handle_heading(node, 4, output, depth)?,
            "h5" => self.handle_heading(node, 5, output, depth)?,
            "h6" => self.handle_heading(node, 6, output, depth)?,

            "p" => self.handle_block(node, output, depth)?,
            "blockquote" => self.handle_blockquote(node, output, depth)?,
            "hr" => {
                ensure_blank_line(output);
                output.push_str("---\n\n");
            }
            "br" => output.push('\n'),

            "a" => self.handle_link(node, output, depth)?,
            "img" => self.handle_image(node, output)?,

            "ul" => self.handle_list(node, output, "", false, depth)?,
            "ol" => self.handle_list(node, output, "", true, depth)?,
            "li" => {
                let mut wrote_marker = false;
                self.handle_list_item(node, output, "", "- ", &mut wrote_marker, depth)?
            }

            "pre" => self.handle_code_block(node, output),
            "code" => self.handle_inline_code(node, output),

            "strong" | "b" => self.handle_emphasis(node, "**", output, depth)?,
            "em" | "i" => self.handle_emphasis(node, "*", output, depth)?,

            tag if BLOCK_ELEMENTS.contains(&tag) || TABLE_ELEMENTS.contains(&tag) => {
                self.handle_block(node, output, depth)?
            }

            _ => {
                for child in node.children.borrow().iter() {
                    self.traverse_node(child, output, depth + 1)?;
                }
            }
        }

        Ok(())
    }

    /// Render children into a fresh buffer
    fn render_children(&self, node: &Handle, depth: usize) -> Result<String, ConversionError> {
        let mut buffer = String::new();
        for child in node.children.borrow().iter() {
            self.traverse_node(child, &mut buffer, depth + 1)?;
        }
        Ok(buffer)
    }

    /// Handle heading elements (h1-h6)
    ///
    /// Inline markup inside the heading is kept; the heading text is
    /// collapsed onto one line and surrounded by blank lines.
    fn handle_heading(
        &self,
        node: &Handle,
        level: usize,
        output: &mut String,
        depth: usize,
    ) -> Result<(), ConversionError> {
        let content = normalize_text(&self.render_children(node, depth)?);
        if content.is_empty() {
            return Ok(());
        }

        ensure_blank_line(output);
        output.push_str(&"#".repeat(level));
        output.push(' ');
        output.push_str(&content);
        output.push_str("\n\n");

        Ok(())
    }

    /// Handle paragraphs and other block containers
    ///
    /// The block is preceded and followed by a blank line. A block that
    /// renders nothing leaves at most a blank line behind, which the final
    /// whitespace cleanup absorbs.
    fn handle_block(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
    ) -> Result<(), ConversionError> {
        ensure_blank_line(output);

        let start_len = output.len();
        for child in node.children.borrow().iter() {
            self.traverse_node(child, output, depth + 1)?;
        }

        if output.len() > start_len {
            output.push_str("\n\n");
        }

        Ok(())
    }

    fn handle_blockquote(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
    ) -> Result<(), ConversionError> {
        let content = clean_whitespace(&self.render_children(node, depth)?);
        if content.is_empty() {
            return Ok(());
        }

        ensure_blank_line(output);
        for line in content.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                output.push('>');
            } else {
                output.push_str("> ");
                output.push_str(line);
            }
            output.push('\n');
        }
        output.push('\n');

        Ok(())
    }

    /// Handle anchor (link) elements
    ///
    /// Links are rendered as `[content](href)`, where the content is the
    /// converted children of the anchor, so inline markup and images inside
    /// a link survive. Anchors without an `href`, or whose target uses a
    /// blocked scheme, are rendered as their content alone. Anchors whose
    /// content renders to nothing are dropped.
    ///
    /// ```html
    /// <a href="/full.png"><img src="/thumb.png" alt="Diagram"></a>
    /// ```
    /// becomes:
    /// ```markdown
    /// [![Diagram](/thumb.png)](/full.png)
    /// ```
    fn handle_link(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
    ) -> Result<(), ConversionError> {
        let content = normalize_text(&self.render_children(node, depth)?);
        if content.is_empty() {
            return Ok(());
        }

        let raw_text = text_content(node);
        let href = attribute(node, "href");
        match href.as_deref().and_then(|url| self.security.safe_url(url)) {
            Some(url) => {
                let rendered = format!("[{content}]({url})");
                push_inline(output, &raw_text, &rendered);
            }
            None => push_inline(output, &raw_text, &content),
        }

        Ok(())
    }

    /// Handle image elements
    ///
    /// Images render as `![alt](src)`. An image without a `src`, or with a
    /// blocked scheme, renders nothing.
    fn handle_image(&self, node: &Handle, output: &mut String) -> Result<(), ConversionError> {
        let Some(src) = attribute(node, "src") else {
            return Ok(());
        };
        let Some(url) = self.security.safe_url(&src) else {
            return Ok(());
        };

        let alt = attribute(node, "alt").map(|a| normalize_text(&a)).unwrap_or_default();
        output.push_str("![");
        output.push_str(&alt);
        output.push_str("](");
        output.push_str(url);
        output.push(')');

        Ok(())
    }

    /// Handle list elements (ul/ol)
    ///
    /// `indent` is the prefix for this list's markers. Nested lists are
    /// indented under their parent item's text, so items of an ordered list
    /// indent their children by three spaces and unordered items by two.
    ///
    /// Ordered lists number from the `start` attribute (default 1).
    ///
    /// ```html
    /// <ol start="3"><li>Three</li><li>Four</li></ol>
    /// ```
    /// becomes:
    /// ```markdown
    /// 3. Three
    /// 4. Four
    /// ```
    fn handle_list(
        &self,
        node: &Handle,
        output: &mut String,
        indent: &str,
        ordered: bool,
        depth: usize,
    ) -> Result<(), ConversionError> {
        let top_level = indent.is_empty();
        if top_level {
            ensure_blank_line(output);
        } else if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }

        let mut number = if ordered {
            attribute(node, "start")
                .and_then(|start| start.trim().parse::<usize>().ok())
                .unwrap_or(1)
        } else {
            1
        };

        for child in node.children.borrow().iter() {
            if element_name(child).as_deref() != Some("li") {
                continue;
            }
            self.security.check_depth(depth + 1)?;
            let marker = if ordered {
                format!("{number}. ")
            } else {
                "- ".to_string()
            };
            let mut wrote_marker = false;
            self.handle_list_item(child, output, indent, &marker, &mut wrote_marker, depth + 1)?;
            number += 1;
        }

        if top_level && !output.ends_with("\n\n") {
            output.push('\n');
        }

        Ok(())
    }

    /// Handle a single list item
    ///
    /// Inline content is collected until a nested list (or the end of the
    /// item) and then written after the marker. Continuation lines are
    /// indented to line up with the text after the marker.
    fn handle_list_item(
        &self,
        node: &Handle,
        output: &mut String,
        indent: &str,
        marker: &str,
        wrote_marker: &mut bool,
        depth: usize,
    ) -> Result<(), ConversionError> {
        let nested_indent = format!("{indent}{}", " ".repeat(marker.len()));
        let mut buffer = String::new();

        for child in node.children.borrow().iter() {
            let nested = match element_name(child).as_deref() {
                Some("ul") => Some(false),
                Some("ol") => Some(true),
                _ => None,
            };
            match nested {
                Some(ordered) => {
                    write_item_text(buffer.trim(), output, indent, marker, wrote_marker);
                    buffer.clear();
                    self.security.check_depth(depth + 1)?;
                    self.handle_list(child, output, &nested_indent, ordered, depth + 1)?;
                }
                None => self.traverse_node(child, &mut buffer, depth + 1)?,
            }
        }
        write_item_text(buffer.trim(), output, indent, marker, wrote_marker);

        Ok(())
    }

    /// Handle `pre` blocks as fenced code
    ///
    /// The language is taken from a `language-*` or `lang-*` class on a
    /// direct `code` child. Content is copied without normalization. The
    /// fence is one backtick longer than the longest backtick run in the
    /// content, and never shorter than three.
    fn handle_code_block(&self, node: &Handle, output: &mut String) {
        ensure_blank_line(output);

        let language = node
            .children
            .borrow()
            .iter()
            .filter(|child| element_name(child).as_deref() == Some("code"))
            .filter_map(|child| attribute(child, "class"))
            .find_map(|class| code_language(&class))
            .unwrap_or_default();

        let code = text_content(node);
        let fence = "`".repeat(longest_backtick_run(&code).max(2) + 1);

        output.push_str(&fence);
        output.push_str(&language);
        output.push('\n');
        output.push_str(&code);
        if !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&fence);
        output.push_str("\n\n");
    }

    fn handle_inline_code(&self, node: &Handle, output: &mut String) {
        let code = text_content(node);
        if code.is_empty() {
            return;
        }

        let delimiter = "`".repeat(longest_backtick_run(&code) + 1);
        let padding = if code.starts_with('`') || code.ends_with('`') {
            " "
        } else {
            ""
        };

        output.push_str(&delimiter);
        output.push_str(padding);
        output.push_str(&code);
        output.push_str(padding);
        output.push_str(&delimiter);
    }

    /// Handle bold and italic elements
    ///
    /// Whitespace at the edges of the content is moved outside the
    /// delimiters so that `<b> word </b>` renders as ` **word** `.
    fn handle_emphasis(
        &self,
        node: &Handle,
        delimiter: &str,
        output: &mut String,
        depth: usize,
    ) -> Result<(), ConversionError> {
        let content = self.render_children(node, depth)?;
        let raw = text_content(node);
        let trimmed = content.trim();
        if trimmed.is_empty() {
            if !raw.is_empty() && !output.is_empty() && needs_space(output) {
                output.push(' ');
            }
            return Ok(());
        }

        let rendered = format!("{delimiter}{trimmed}{delimiter}");
        push_inline(output, &raw, &rendered);

        Ok(())
    }

    /// Tidy the raw buffer line by line
    ///
    /// Line endings become LF and trailing whitespace is removed from every
    /// line outside fenced code blocks. A fence closes only on a line of at
    /// least as many backticks as opened it.
    fn tidy_lines(&self, output: &str) -> String {
        let output = output.replace("\r\n", "\n");
        let mut result = String::with_capacity(output.len());
        let mut open_fence: Option<usize> = None;

        for line in output.split('\n') {
            let trimmed = line.trim();
            let run = trimmed.len() - trimmed.trim_start_matches('`').len();

            match open_fence {
                None if run >= 3 && !trimmed[run..].contains('`') => {
                    open_fence = Some(run);
                    result.push_str(line.trim_end());
                }
                Some(opened) if run >= opened && run == trimmed.len() => {
                    open_fence = None;
                    result.push_str(line.trim_end());
                }
                Some(_) => result.push_str(line),
                None => result.push_str(line.trim_end()),
            }
            result.push('\n');
        }
        // split yields one more segment than there are separators
        result.pop();

        result
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse runs of three or more newlines to one blank line and trim
///
/// This is the last step of every conversion. It is idempotent.
///
/// ```rust
/// use page2md::converter::clean_whitespace;
///
/// assert_eq!(clean_whitespace("\n\nA\n\n\n\nB\n"), "A\n\nB");
/// ```
pub fn clean_whitespace(markdown: &str) -> String {
    static BLANK_RUNS: OnceLock<Option<Regex>> = OnceLock::new();
    let collapsed = match BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").ok()) {
        Some(regex) => regex.replace_all(markdown, "\n\n").into_owned(),
        None => markdown.to_string(),
    };
    collapsed.trim().to_string()
}

/// Collapse whitespace runs to single spaces and trim
fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the next inline token needs a separating space
fn needs_space(output: &str) -> bool {
    !output.ends_with(char::is_whitespace)
}

/// Append `rendered`, carrying over the edge whitespace of `raw`
fn push_inline(output: &mut String, raw: &str, rendered: &str) {
    if raw.starts_with(char::is_whitespace) && needs_space(output) && !output.is_empty() {
        output.push(' ');
    }
    output.push_str(rendered);
    if raw.ends_with(char::is_whitespace) {
        output.push(' ');
    }
}

fn ensure_blank_line(output: &mut String) {
    if !output.is_empty() && !output.ends_with("\n\n") {
        if output.ends_with('\n') {
            output.push('\n');
        } else {
            output.push_str("\n\n");
        }
    }
}

/// Write a list item's collected text after its marker
///
/// The marker line is written on the first call even when `text` is empty,
/// so an item that opens with a nested list still gets its own marker.
fn write_item_text(
    text: &str,
    output: &mut String,
    indent: &str,
    marker: &str,
    wrote_marker: &mut bool,
) {
    let continuation = " ".repeat(marker.len());
    let mut lines = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty());

    if !*wrote_marker {
        output.push_str(indent);
        output.push_str(marker);
        if let Some(first) = lines.next() {
            output.push_str(first.trim_start());
        }
        output.push('\n');
        *wrote_marker = true;
    }

    for line in lines {
        output.push_str(indent);
        output.push_str(&continuation);
        output.push_str(line);
        output.push('\n');
    }
}

fn element_name(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attribute(node: &Handle, name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn code_language(class_value: &str) -> Option<String> {
    class_value.split_whitespace().find_map(|class| {
        class
            .strip_prefix("language-")
            .or_else(|| class.strip_prefix("lang-"))
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
    })
}

/// Length of the longest run of consecutive backticks in `text`
fn longest_backtick_run(text: &str) -> usize {
    text.split(|c: char| c != '`').map(str::len).max().unwrap_or(0)
}

fn at_line_start(output: &str) -> bool {
    output.is_empty() || output.ends_with('\n')
}

/// Backslash-escape page text so it cannot be read as Markdown syntax
///
/// Backslashes, `*`, `_` and backticks are escaped everywhere. Text opening
/// a line is also kept from starting a heading, list item, quote or rule.
fn escape_markdown(text: &str, line_start: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '_' | '`') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    if !line_start {
        return escaped;
    }

    if escaped.starts_with(['#', '-', '>']) || escaped == "+" || escaped.starts_with("+ ") {
        return format!("\\{escaped}");
    }

    let digits = escaped.len() - escaped.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &escaped[digits..];
    if digits > 0 && (rest == "." || rest.starts_with(". ")) {
        return format!("{}\\{rest}", &escaped[..digits]);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn convert(html: &str) -> String {
        MarkdownConverter::new()
            .convert_html(html)
            .expect("Conversion failed")
    }

    fn convert_with(options: ConversionOptions, html: &str) -> String {
        MarkdownConverter::with_options(options)
            .convert_html(html)
            .expect("Conversion failed")
    }

    #[test]
    fn test_heading_conversion() {
        assert_eq!(convert("<h1>Main Title</h1>"), "# Main Title");
        assert_eq!(convert("<h3>  Spaced \n heading </h3>"), "### Spaced heading");
    }

    #[test]
    fn test_all_heading_levels() {
        let html = "<h1>1</h1><h2>2</h2><h3>3</h3><h4>4</h4><h5>5</h5><h6>6</h6>";
        assert_eq!(
            convert(html),
            "# 1\n\n## 2\n\n### 3\n\n#### 4\n\n##### 5\n\n###### 6"
        );
    }

    #[test]
    fn test_heading_keeps_inline_markup() {
        assert_eq!(
            convert("<h2>Using <code>cargo</code></h2>"),
            "## Using `cargo`"
        );
    }

    #[test]
    fn test_paragraph_with_bold() {
        assert_eq!(convert("<p>Hello <b>World</b></p>"), "Hello **World**");
    }

    #[test]
    fn test_paragraphs_separated_by_blank_line() {
        assert_eq!(
            convert("<p>First   paragraph.</p>\n\n<p>Second\nparagraph.</p>"),
            "First paragraph.\n\nSecond paragraph."
        );
    }

    #[test]
    fn test_divs_are_blocks() {
        assert_eq!(convert("<div>one</div><div>two</div>"), "one\n\ntwo");
    }

    #[test]
    fn test_empty_and_whitespace_paragraphs() {
        assert_eq!(convert("<p></p>"), "");
        assert_eq!(convert("<p>   \n  </p>"), "");
        assert_eq!(convert("<p>a</p><p> </p><p>b</p>"), "a\n\nb");
    }

    #[test]
    fn test_non_content_elements_removed() {
        let html = "<head><title>T</title><style>p{}</style></head>\
                    <body><script>alert(1)</script><p>Visible</p><noscript>Enable JS</noscript></body>";
        assert_eq!(convert(html), "Visible");
    }

    #[test]
    fn test_emphasis_and_spacing() {
        assert_eq!(
            convert("<p><em>a</em> and <strong>b</strong>.</p>"),
            "*a* and **b**."
        );
        assert_eq!(convert("<p>x<b> y </b>z</p>"), "x **y** z");
        assert_eq!(convert("<p><i>one</i> <i>two</i></p>"), "*one* *two*");
    }

    #[test]
    fn test_empty_emphasis_dropped() {
        assert_eq!(convert("<p>a<b> </b>b</p>"), "a b");
    }

    #[test]
    fn test_link_conversion() {
        assert_eq!(
            convert("<p>See <a href=\"https://example.com\">Example</a> now</p>"),
            "See [Example](https://example.com) now"
        );
    }

    #[test]
    fn test_link_without_href_or_unsafe() {
        assert_eq!(convert("<a>Plain</a>"), "Plain");
        assert_eq!(convert("<a href=\"javascript:alert(1)\">Bad</a>"), "Bad");
        assert_eq!(convert("<p>x<a href=\"/y\"></a></p>"), "x");
    }

    #[test]
    fn test_links_flattened_when_excluded() {
        let options = ConversionOptions {
            include_links: false,
            ..Default::default()
        };
        assert_eq!(
            convert_with(options, "<a href=\"http://x\">Click</a>"),
            "Click"
        );
    }

    #[test]
    fn test_image_conversion() {
        assert_eq!(
            convert("<img src=\"pic.png\" alt=\"A picture\">"),
            "![A picture](pic.png)"
        );
        assert_eq!(convert("<img src=\"pic.png\">"), "![](pic.png)");
        assert_eq!(convert("<p>a<img alt=\"none\">b</p>"), "ab");
        assert_eq!(convert("<img src=\"data:image/png;base64,AA\" alt=\"x\">"), "");
    }

    #[test]
    fn test_images_suppressed_when_excluded() {
        let options = ConversionOptions {
            include_images: false,
            ..Default::default()
        };
        assert_eq!(
            convert_with(options, "<p>Before<img src=\"a.png\" alt=\"x\">After</p>"),
            "BeforeAfter"
        );
    }

    #[test]
    fn test_unordered_list_conversion() {
        assert_eq!(
            convert("<ul>\n<li>One</li>\n<li>Two</li>\n</ul>"),
            "- One\n- Two"
        );
    }

    #[test]
    fn test_ordered_list_numbering() {
        assert_eq!(convert("<ol><li>a</li><li>b</li></ol>"), "1. a\n2. b");
        assert_eq!(
            convert("<ol start=\"3\"><li>Three</li><li>Four</li></ol>"),
            "3. Three\n4. Four"
        );
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            convert("<ul><li>Parent<ul><li>Child</li></ul></li><li>Next</li></ul>"),
            "- Parent\n  - Child\n- Next"
        );
        assert_eq!(
            convert("<ol><li>Step<ul><li>detail</li></ul></li></ol>"),
            "1. Step\n   - detail"
        );
    }

    #[test]
    fn test_list_item_with_paragraphs() {
        assert_eq!(
            convert("<ul><li><p>First</p><p>Second</p></li></ul>"),
            "- First\n  Second"
        );
    }

    #[test]
    fn test_list_between_paragraphs() {
        assert_eq!(
            convert("<p>Intro</p><ul><li>item</li></ul><p>Outro</p>"),
            "Intro\n\n- item\n\nOutro"
        );
    }

    #[test]
    fn test_list_item_with_link() {
        assert_eq!(
            convert("<ul><li><a href=\"/docs\">Docs</a> page</li></ul>"),
            "- [Docs](/docs) page"
        );
    }

    #[test]
    fn test_code_block_with_language() {
        let html = "<pre><code class=\"language-rust\">fn main() {\n    println!(\"hi\");\n}\n</code></pre>";
        assert_eq!(
            convert(html),
            "```rust\nfn main() {\n    println!(\"hi\");\n}\n```"
        );
    }

    #[test]
    fn test_code_block_lang_prefix_and_plain() {
        assert_eq!(
            convert("<pre><code class=\"hl lang-js\">x = 1</code></pre>"),
            "```js\nx = 1\n```"
        );
        assert_eq!(convert("<pre>plain  text</pre>"), "```\nplain  text\n```");
    }

    #[test]
    fn test_code_block_keeps_trailing_spaces() {
        let result = convert("<pre><code>a   \nb</code></pre>");
        assert!(result.contains("a   \nb"));
    }

    #[test]
    fn test_inline_code_preserved() {
        assert_eq!(
            convert("<p>Use <code>a  &lt;b&gt;</code> here</p>"),
            "Use `a  <b>` here"
        );
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            convert("<p>Said:</p><blockquote><p>One</p><p>Two</p></blockquote>"),
            "Said:\n\n> One\n>\n> Two"
        );
    }

    #[test]
    fn test_horizontal_rule_and_line_break() {
        assert_eq!(convert("<p>a</p><hr><p>b</p>"), "a\n\n---\n\nb");
        assert_eq!(convert("<p>line one<br>line two</p>"), "line one\nline two");
    }

    #[test]
    fn test_table_preserved_as_pipe_table() {
        let html = "<p>Before</p><table><tr><th>A</th><th>B</th></tr>\
                    <tr><td>1</td><td>2</td></tr></table><p>After</p>";
        assert_eq!(
            convert(html),
            "Before\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n\nAfter"
        );
    }

    #[test]
    fn test_table_not_preserved_renders_cells_as_blocks() {
        let options = ConversionOptions {
            preserve_tables: false,
            ..Default::default()
        };
        assert_eq!(
            convert_with(options, "<table><tr><td>a</td><td>b</td></tr></table>"),
            "a\n\nb"
        );
    }

    #[test]
    fn test_options_from_settings() {
        let settings = ExtensionSettings {
            include_images: false,
            preserve_tables: false,
            ..Default::default()
        };
        let converter = MarkdownConverter::from_settings(&settings);
        assert_eq!(
            converter.options(),
            &ConversionOptions {
                include_images: false,
                include_links: true,
                preserve_tables: false,
            }
        );
        assert_eq!(converter.rules().rules().len(), 1);
    }

    #[test]
    fn test_depth_limit_is_enforced() {
        let html = format!("{}text{}", "<div>".repeat(40), "</div>".repeat(40));
        let converter =
            MarkdownConverter::new().with_security_policy(SecurityPolicy::with_max_depth(10));
        assert!(matches!(
            converter.convert_html(&html),
            Err(ConversionError::InvalidInput(_))
        ));
        assert_eq!(convert(&html), "text");
    }

    #[test]
    fn test_tidy_removes_crlf_and_trailing_spaces() {
        let converter = MarkdownConverter::new();
        assert_eq!(converter.tidy_lines("a  \r\nb\t\n"), "a\nb\n");
        assert_eq!(
            converter.tidy_lines("```\ncode  \n```  \ntext  "),
            "```\ncode  \n```\ntext"
        );
    }

    #[test]
    fn test_clean_whitespace() {
        assert_eq!(clean_whitespace(""), "");
        assert_eq!(clean_whitespace("  \n\n  "), "");
        assert_eq!(clean_whitespace("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_whitespace("a\n\nb"), "a\n\nb");
        assert_eq!(clean_whitespace("\n\n\nA\n\n"), "A");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            convert("<p>Fish &amp; Chips &lt;3 &copy;</p>"),
            "Fish & Chips <3 ©"
        );
    }

    fn nested(open: &str, close: &str, levels: usize, inner: &str) -> String {
        format!("{}{inner}{}", open.repeat(levels), close.repeat(levels))
    }

    #[test]
    fn test_linked_image_kept() {
        assert_eq!(
            convert(r#"<p><a href="/full.png"><img src="/thumb.png" alt="Diagram"></a></p>"#),
            "[![Diagram](/thumb.png)](/full.png)"
        );
        assert_eq!(
            convert(r#"<a href="javascript:open()"><img src="/a.png" alt="A"></a>"#),
            "![A](/a.png)"
        );
    }

    #[test]
    fn test_linked_image_dropped_when_images_excluded() {
        let options = ConversionOptions {
            include_images: false,
            ..Default::default()
        };
        assert_eq!(
            convert_with(options, r#"<p>a <a href="/f"><img src="/t.png" alt="T"></a> b</p>"#),
            "a b"
        );
    }

    #[test]
    fn test_link_keeps_inline_markup() {
        assert_eq!(convert(r#"<a href="/x"><b>x</b></a>"#), "[**x**](/x)");
        assert_eq!(
            convert(r#"<p>Go <a href="/x"><b>Bold</b> link</a> now</p>"#),
            "Go [**Bold** link](/x) now"
        );
    }

    #[test]
    fn test_deep_nesting_inside_table_does_not_overflow() {
        let html = format!(
            "<table><tr><td>{}</td></tr></table>",
            nested("<span>", "</span>", 5_000, "deep")
        );
        assert_eq!(convert(&html), "| deep |\n| --- |");

        let options = ConversionOptions {
            preserve_tables: false,
            ..Default::default()
        };
        assert!(matches!(
            MarkdownConverter::with_options(options).convert_html(&html),
            Err(ConversionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deep_nesting_inside_emphasis_is_rejected() {
        let html = format!("<p><b>{}</b></p>", nested("<span>", "</span>", 5_000, "deep"));
        assert!(matches!(
            MarkdownConverter::new().convert_html(&html),
            Err(ConversionError::InvalidInput(_))
        ));

        let bold = format!("<p>{}</p>", nested("<b>", "</b>", 5_000, "deep"));
        assert!(matches!(
            MarkdownConverter::new().convert_html(&bold),
            Err(ConversionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deep_nesting_inside_code_and_flattened_link() {
        let code = format!("<pre>{}</pre>", nested("<span>", "</span>", 5_000, "deep"));
        assert_eq!(convert(&code), "```\ndeep\n```");

        let options = ConversionOptions {
            include_links: false,
            ..Default::default()
        };
        let link = format!(
            "<a href=\"/x\">{}</a>",
            nested("<span>", "</span>", 5_000, "deep")
        );
        assert_eq!(convert_with(options, &link), "deep");
    }

    #[test]
    fn test_line_start_markdown_syntax_escaped() {
        assert_eq!(convert("<p>* not a list</p>"), "\\* not a list");
        assert_eq!(convert("<p>1. not numbered</p>"), "1\\. not numbered");
        assert_eq!(convert("<p># not a heading</p>"), "\\# not a heading");
        assert_eq!(convert("<p>- not a bullet</p>"), "\\- not a bullet");
        assert_eq!(convert("<p>+ plus</p>"), "\\+ plus");
        assert_eq!(convert("<p>&gt; not a quote</p>"), "\\> not a quote");
        assert_eq!(convert("<p>a<br>- b</p>"), "a\n\\- b");
    }

    #[test]
    fn test_plain_text_left_alone() {
        assert_eq!(convert("<p>Version 2.0 is out</p>"), "Version 2.0 is out");
        assert_eq!(convert("<p>+1 from me</p>"), "+1 from me");
        assert_eq!(convert("<p>a - b # c</p>"), "a - b # c");
    }

    #[test]
    fn test_inline_markdown_characters_escaped() {
        assert_eq!(
            convert("<p>snake_case *star* `tick` back\\slash</p>"),
            "snake\\_case \\*star\\* \\`tick\\` back\\\\slash"
        );
        assert_eq!(convert("<p>Use <code>a_b*</code></p>"), "Use `a_b*`");
    }

    #[test]
    fn test_code_block_fence_longer_than_content_backticks() {
        assert_eq!(
            convert("<pre>before\n```\nafter</pre>"),
            "````\nbefore\n```\nafter\n````"
        );
        assert_eq!(
            convert("<pre><code class=\"language-md\">``````</code></pre>"),
            "```````md\n``````\n```````"
        );
    }

    #[test]
    fn test_inline_code_with_backticks() {
        assert_eq!(convert("<p><code>a`b</code></p>"), "``a`b``");
        assert_eq!(convert("<p><code>`x</code></p>"), "`` `x ``");
    }

    #[test]
    fn test_tidy_keeps_trailing_spaces_inside_long_fence() {
        let converter = MarkdownConverter::new();
        assert_eq!(
            converter.tidy_lines("````\na  \n```  \nb  \n````\nc  "),
            "````\na  \n```  \nb  \n````\nc"
        );
    }

    proptest! {
        #[test]
        fn prop_clean_whitespace_is_idempotent(input in "[a-z \\n\\t]{0,200}") {
            let once = clean_whitespace(&input);
            prop_assert_eq!(clean_whitespace(&once), once.clone());
            prop_assert!(!once.contains("\n\n\n"));
            prop_assert_eq!(once.trim(), once.as_str());
        }

        #[test]
        fn prop_heading_text_preserved(level in 1usize..=6, text in "[A-Za-z][A-Za-z0-9 ]{0,30}") {
            let html = format!("<h{level}>{text}</h{level}>");
            let expected = format!("{} {}", "#".repeat(level), normalize_text(&text));
            prop_assert_eq!(convert(&html), expected);
        }

        #[test]
        fn prop_paragraphs_are_separated(texts in prop::collection::vec("[A-Za-z][A-Za-z ]{0,20}[A-Za-z]", 1..6)) {
            let html: String = texts.iter().map(|t| format!("<p>{t}</p>")).collect();
            let expected: Vec<String> = texts.iter().map(|t| normalize_text(t)).collect();
            prop_assert_eq!(convert(&html), expected.join("\n\n"));
        }

        #[test]
        fn prop_non_content_elements_never_leak(
            tag in prop::sample::select(vec!["script", "style", "noscript", "template", "iframe"]),
            secret in "[A-Z]{12}",
        ) {
            let html = format!("<p>keep</p><{tag}>{secret}</{tag}>");
            let result = convert(&html);
            prop_assert!(!result.contains(&secret));
            prop_assert!(result.contains("keep"));
        }

        #[test]
        fn prop_output_is_deterministic_and_clean(html in "(<p>|</p>|<b>|</b>|<li>|<ul>|</ul>|<br>|[a-z ]{1,8}|\\n){0,30}") {
            let first = convert(&html);
            let second = convert(&html);
            prop_assert_eq!(&first, &second);
            prop_assert!(!first.contains("\n\n\n"));
            prop_assert_eq!(clean_whitespace(&first), first);
        }
    }
}

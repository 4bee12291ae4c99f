//! DOM walk over filing HTML.
//!
//! Headings come from `h1`-`h6` and from short block elements that look like headings (bold,
//! upper-case or `Item`/`Part` markers). Tables and lists are kept as structured sections nested
//! under the heading they follow.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use super::text::{heading_level, is_heading_line, is_structural_heading, normalize_text, SectionBuilder};
use super::types::{ParserOptions, Section, StructuredDocument};
use crate::core::{PipelineError, Result};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("static selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));
static CAPTION: Lazy<Selector> = Lazy::new(|| Selector::parse("caption").expect("static selector"));
static EMPHASIS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("b, strong, span, font").expect("static selector"));

const SKIP_TAGS: &[&str] = &[
    "script", "style", "head", "noscript", "template", "meta", "link", "ix:header",
];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "body", "center", "dd", "div", "dl", "dt", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "ul",
];

/// Cells that only carry a currency sign or closing parenthesis are merged into their neighbour.
const LEADING_FRAGMENTS: &[&str] = &["$", "(", "($", "€", "£"];
const TRAILING_FRAGMENTS: &[&str] = &[")", "%", ")%", "%)"];

pub fn parse(html: &str, options: &ParserOptions) -> Result<StructuredDocument> {
    let document = Html::parse_document(html);
    let mut walker = Walker {
        builder: SectionBuilder::new(options),
        inline: String::new(),
    };

    if let Some(title) = document
        .select(&TITLE)
        .next()
        .map(|t| normalize_text(&element_text(t), false))
        .filter(|t| !t.is_empty())
    {
        walker.builder.push(Section::title(title));
    }

    let body = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());
    walker.walk_children(body);
    walker.flush_inline();

    let sections = walker.builder.finish();
    if sections.is_empty() {
        return Err(PipelineError::parse("html", html.len(), "document has no textual content"));
    }
    log::debug!("HTML parser produced {} top-level sections", sections.len());
    Ok(StructuredDocument::from_sections(sections))
}

struct Walker<'a> {
    builder: SectionBuilder<'a>,
    inline: String,
}

impl Walker<'_> {
    fn walk_children(&mut self, element: ElementRef) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.inline.push_str(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.visit(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef) {
        let name = element.value().name();
        if SKIP_TAGS.contains(&name) || is_hidden(element) {
            return;
        }

        match name {
            "br" => self.inline.push('\n'),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_inline();
                let level = name[1..].parse().unwrap_or(3);
                self.builder.heading(&element_text(element), level);
            }
            "table" => {
                self.flush_inline();
                self.table(element);
            }
            "ul" | "ol" => {
                self.flush_inline();
                self.list(element);
            }
            _ if BLOCK_TAGS.contains(&name) => {
                self.flush_inline();
                if has_block_descendant(element) {
                    self.walk_children(element);
                    self.flush_inline();
                } else {
                    self.leaf_block(element);
                }
            }
            _ => {
                if has_block_descendant(element) {
                    self.walk_children(element);
                } else {
                    self.inline.push_str(&element_text(element));
                }
            }
        }
    }

    fn flush_inline(&mut self) {
        if !self.inline.trim().is_empty() {
            let text = std::mem::take(&mut self.inline);
            self.builder.paragraph(&text);
        }
        self.inline.clear();
    }

    fn leaf_block(&mut self, element: ElementRef) {
        let raw = element_text(element);
        let clean = normalize_text(&raw, false);
        if clean.is_empty() {
            return;
        }
        if is_structural_heading(&clean) || (is_emphasized(element, &clean) && is_heading_line(&clean)) {
            self.builder.heading(&clean, heading_level(&clean));
        } else {
            self.builder.paragraph(&raw);
        }
    }

    fn table(&mut self, element: ElementRef) {
        let rows: Vec<Vec<String>> = table_rows(element)
            .into_iter()
            .map(|row| {
                merge_fragments(
                    child_elements(row)
                        .filter(|c| matches!(c.value().name(), "td" | "th"))
                        .map(|c| normalize_text(&element_text(c), false)),
                )
            })
            .filter(|row| !row.is_empty())
            .collect();
        if rows.is_empty() {
            return;
        }

        // Layout tables: one column, or a single row that reads as a heading.
        let max_columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if max_columns < 2 || rows.len() == 1 {
            let joined = rows.iter().map(|r| r.join(" ")).collect::<Vec<_>>();
            if rows.len() == 1 && is_structural_heading(&joined[0]) {
                self.builder.heading(&joined[0], heading_level(&joined[0]));
                return;
            }
            if max_columns < 2 {
                for line in joined {
                    if is_structural_heading(&line) {
                        self.builder.heading(&line, heading_level(&line));
                    } else {
                        self.builder.paragraph(&line);
                    }
                }
                return;
            }
        }

        if !self.builder.options().extract_tables {
            let text = rows.iter().map(|r| r.join(" ")).collect::<Vec<_>>().join("\n");
            self.builder.paragraph(&text);
            return;
        }

        let title = element
            .select(&CAPTION)
            .next()
            .map(|c| normalize_text(&element_text(c), false))
            .filter(|c| !c.is_empty())
            .or_else(|| self.builder.current_title().map(String::from));
        self.builder.block(Section::table(title, rows));
    }

    fn list(&mut self, element: ElementRef) {
        let items: Vec<String> = element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "li")
            .map(|li| normalize_text(&element_text(li), false))
            .filter(|item| !item.is_empty())
            .collect();
        if items.is_empty() {
            return;
        }

        if self.builder.options().extract_lists {
            let title = self.builder.current_title().map(String::from);
            self.builder.block(Section::list(title, items));
        } else {
            self.builder.paragraph(&items.join("\n"));
        }
    }
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Rows of this table only; rows of nested tables stay inside their enclosing cell.
fn table_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|row| row.value().name() == "tr"))
            }
            _ => {}
        }
    }
    rows
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join("")
}

fn has_block_descendant(element: ElementRef) -> bool {
    element.descendants().skip(1).any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| BLOCK_TAGS.contains(&e.name()) || e.name() == "br")
    })
}

fn compact_style(style: Option<&str>) -> String {
    style
        .unwrap_or_default()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn is_hidden(element: ElementRef) -> bool {
    compact_style(element.value().attr("style")).contains("display:none")
}

fn style_is_bold(style: Option<&str>) -> bool {
    let style = compact_style(style);
    ["font-weight:bold", "font-weight:700", "font-weight:800", "font-weight:900"]
        .iter()
        .any(|rule| style.contains(rule))
}

/// True when all visible text of the element sits inside bold markup.
fn is_emphasized(element: ElementRef, text: &str) -> bool {
    if style_is_bold(element.value().attr("style")) {
        return true;
    }
    let emphasized: usize = element
        .select(&EMPHASIS)
        .filter(|e| matches!(e.value().name(), "b" | "strong") || style_is_bold(e.value().attr("style")))
        .flat_map(|e| e.text())
        .map(|t| t.chars().filter(|c| !c.is_whitespace()).count())
        .sum();
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    total > 0 && emphasized >= total
}

fn merge_fragments(cells: impl Iterator<Item = String>) -> Vec<String> {
    let mut row: Vec<String> = Vec::new();
    let mut pending = String::new();
    for cell in cells.filter(|c| !c.is_empty()) {
        if LEADING_FRAGMENTS.contains(&cell.as_str()) {
            pending.push_str(&cell);
        } else if TRAILING_FRAGMENTS.contains(&cell.as_str()) && !row.is_empty() {
            if let Some(last) = row.last_mut() {
                last.push_str(&cell);
            }
        } else {
            row.push(format!("{}{}", std::mem::take(&mut pending), cell));
        }
    }
    if !pending.is_empty() {
        row.push(pending);
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::types::SectionKind;

    fn parse_default(html: &str) -> StructuredDocument {
        parse(html, &ParserOptions::default()).unwrap()
    }

    #[test]
    fn test_title_and_headings() {
        let doc = parse_default(
            "<html><head><title>Acme 8-K</title></head><body>\
             <h1>CURRENT REPORT</h1><p>Pursuant to Section 13.</p>\
             <p><b>Item 8.01 Other Events</b></p><p>The company announced a dividend.</p>\
             </body></html>",
        );

        assert_eq!(doc.title.as_deref(), Some("Acme 8-K"));
        assert_eq!(doc.sections[0].kind, SectionKind::Title);
        assert_eq!(doc.sections[1].title.as_deref(), Some("CURRENT REPORT"));
        assert_eq!(doc.sections[1].level, 1);
        assert_eq!(doc.sections[2].title.as_deref(), Some("Item 8.01 Other Events"));
        assert_eq!(doc.sections[2].content, "The company announced a dividend.");
    }

    #[test]
    fn test_nested_table_rows_are_not_repeated() {
        let doc = parse_default(
            "<body><h2>Holdings</h2><table>\
             <tr><th>Holder</th><th>Shares</th></tr>\
             <tr><td>Fund A</td><td><table><tr><td>100 common</td></tr></table></td></tr>\
             <tr><td>Fund B</td><td>200</td></tr>\
             </table></body>",
        );

        let table = &doc.sections[0].children[0];
        let rows = table.table_data.as_ref().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["Fund A".to_string(), "100 common".to_string()]);
        assert_eq!(rows[2], vec!["Fund B".to_string(), "200".to_string()]);
    }

    #[test]
    fn test_tables_nest_under_heading() {
        let doc = parse_default(
            "<body><h2>Selected Data</h2><p>Figures below.</p><table>\
             <tr><td></td><td>2023</td><td>2022</td></tr>\
             <tr><td>Revenue</td><td>$</td><td>1,200</td><td>$</td><td>1,000</td></tr>\
             <tr><td>Net loss</td><td>(50</td><td>)</td><td>(40</td><td>)</td></tr>\
             </table></body>",
        );

        let heading = &doc.sections[0];
        assert_eq!(heading.children.len(), 1);
        let table = &heading.children[0];
        assert_eq!(table.kind, SectionKind::Table);
        assert_eq!(table.title.as_deref(), Some("Selected Data"));
        let rows = table.table_data.as_ref().unwrap();
        assert_eq!(rows[0], vec!["2023", "2022"]);
        assert_eq!(rows[1], vec!["Revenue", "$1,200", "$1,000"]);
        assert_eq!(rows[2], vec!["Net loss", "(50)", "(40)"]);
    }

    #[test]
    fn test_tables_become_text_when_disabled() {
        let options = ParserOptions {
            extract_tables: false,
            ..ParserOptions::default()
        };
        let doc = parse(
            "<body><table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table></body>",
            &options,
        )
        .unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].kind, SectionKind::Paragraph);
        assert_eq!(doc.sections[0].content, "a b c d");
    }

    #[test]
    fn test_single_row_item_table_is_heading() {
        let doc = parse_default(
            "<body><table><tr><td>Item 2.02</td><td>Results of Operations</td></tr></table>\
             <p>Quarterly results were released.</p></body>",
        );
        assert_eq!(doc.sections[0].title.as_deref(), Some("Item 2.02 Results of Operations"));
        assert_eq!(doc.sections[0].content, "Quarterly results were released.");
    }

    #[test]
    fn test_lists_and_hidden_content() {
        let doc = parse_default(
            "<body><h3>Exhibits</h3><ul><li>Press release</li><li>Agreement</li></ul>\
             <div style=\"display: none\">hidden text</div><script>var x = 1;</script></body>",
        );
        let lists: Vec<_> = doc.sections[0].children.iter().collect();
        assert_eq!(lists[0].kind, SectionKind::List);
        assert_eq!(lists[0].content, "- Press release\n- Agreement");
        assert!(!doc.text.contains("hidden text"));
        assert!(!doc.text.contains("var x"));
    }

    #[test]
    fn test_empty_document_is_error() {
        assert!(parse("<html><body>   </body></html>", &ParserOptions::default()).is_err());
    }
}

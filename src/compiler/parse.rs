//! Recursive-descent template parser.
//!
//! Grammar:
//!
//! ```text
//! children      := (interpolation | element | text)*
//! interpolation := "{{" expr "}}"
//! element       := "<" tag attrs? ">" children "</" tag ">"  |  "<" tag attrs? "/>"
//! text          := anything up to the next "<" or "{{"
//! ```
//!
//! Attributes are skipped, not parsed. Tag names compare case-insensitively.

use crate::compiler::ast::{Element, Expression, Node, Root};
use crate::error::CompileError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

pub fn parse(template: &str) -> Result<Root, CompileError> {
    let mut parser = Parser {
        source: template,
        pos: 0,
    };
    let mut ancestors = Vec::new();
    let children = parser.parse_children(&mut ancestors)?;
    Ok(Root {
        children,
        helpers: Vec::new(),
    })
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn advance(&mut self, len: usize) {
        self.pos += len;
    }

    fn parse_children(&mut self, ancestors: &mut Vec<String>) -> Result<Vec<Node>, CompileError> {
        let mut nodes = Vec::new();
        while !self.is_end(ancestors) {
            let rest = self.rest();
            let node = if rest.starts_with(OPEN) {
                self.parse_interpolation()?
            } else if starts_element(rest) {
                self.parse_element(ancestors)?
            } else {
                self.parse_text()
            };
            // whitespace-only runs that span lines are layout, not content
            if let Node::Text(text) = &node {
                if text.trim().is_empty() && text.contains('\n') {
                    continue;
                }
            }
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Out of input, or at an end tag some open element is waiting for.
    fn is_end(&self, ancestors: &[String]) -> bool {
        let rest = self.rest();
        if rest.is_empty() {
            return true;
        }
        rest.starts_with("</")
            && ancestors
                .iter()
                .rev()
                .any(|tag| starts_with_end_tag(rest, tag))
    }

    fn parse_element(&mut self, ancestors: &mut Vec<String>) -> Result<Node, CompileError> {
        // "<" + name
        let rest = &self.rest()[1..];
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        let tag = rest[..name_len].to_string();
        self.advance(1 + name_len);

        let Some(close) = self.rest().find('>') else {
            return Err(CompileError::MissingEndTag { tag });
        };
        let self_closing = self.rest()[..close].ends_with('/');
        self.advance(close + 1);

        if self_closing {
            return Ok(Node::Element(Element {
                tag,
                children: Vec::new(),
            }));
        }

        ancestors.push(tag);
        let children = self.parse_children(ancestors)?;
        let tag = ancestors.pop().unwrap_or_default();

        if !starts_with_end_tag(self.rest(), &tag) {
            return Err(CompileError::MissingEndTag { tag });
        }
        let end = self.rest().find('>').map_or(self.rest().len(), |i| i + 1);
        self.advance(end);

        Ok(Node::Element(Element { tag, children }))
    }

    fn parse_interpolation(&mut self) -> Result<Node, CompileError> {
        let start = self.pos;
        let Some(close) = self.rest()[OPEN.len()..].find(CLOSE) else {
            return Err(CompileError::UnterminatedInterpolation { offset: start });
        };
        let raw = self.rest()[OPEN.len()..OPEN.len() + close].trim().to_string();
        self.advance(OPEN.len() + close + CLOSE.len());
        Ok(Node::Interpolation(Expression::new(raw)))
    }

    fn parse_text(&mut self) -> Node {
        let rest = self.rest();
        // always consume at least one character
        let first = rest.chars().next().map_or(0, char::len_utf8);
        let end = [rest[first..].find('<'), rest[first..].find(OPEN)]
            .into_iter()
            .flatten()
            .min()
            .map_or(rest.len(), |i| i + first);
        let text = rest[..end].to_string();
        self.advance(end);
        Node::Text(text)
    }
}

fn starts_element(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// `rest` opens with `</tag` followed by `>`, whitespace or end of input.
fn starts_with_end_tag(rest: &str, tag: &str) -> bool {
    let Some(after) = rest.strip_prefix("</") else {
        return false;
    };
    let Some(name) = after.get(..tag.len()) else {
        return false;
    };
    name.eq_ignore_ascii_case(tag)
        && after[tag.len()..]
            .chars()
            .next()
            .is_none_or(|c| c == '>' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, children: Vec<Node>) -> Node {
        Node::Element(Element {
            tag: tag.to_string(),
            children,
        })
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn interp(raw: &str) -> Node {
        Node::Interpolation(Expression::new(raw))
    }

    #[test]
    fn test_interpolation_is_trimmed() {
        let root = parse("{{ message }}").unwrap();
        assert_eq!(root.children, vec![interp("message")]);
    }

    #[test]
    fn test_simple_element_and_text() {
        assert_eq!(parse("<div></div>").unwrap().children, vec![element("div", vec![])]);
        assert_eq!(parse("some text").unwrap().children, vec![text("some text")]);
    }

    #[test]
    fn test_mixed_children() {
        let root = parse("<div>hi,{{message}}</div>").unwrap();
        assert_eq!(
            root.children,
            vec![element("div", vec![text("hi,"), interp("message")])]
        );
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let root = parse("<div id=\"app\"><p>{{ a }}</p><br/><SPAN>x</span></div>").unwrap();
        assert_eq!(
            root.children,
            vec![element(
                "div",
                vec![
                    element("p", vec![interp("a")]),
                    element("br", vec![]),
                    element("SPAN", vec![text("x")]),
                ]
            )]
        );
    }

    #[test]
    fn test_layout_whitespace_dropped() {
        let root = parse("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>").unwrap();
        assert_eq!(
            root.children,
            vec![element(
                "ul",
                vec![element("li", vec![text("a")]), element("li", vec![text("b")])]
            )]
        );
    }

    #[test]
    fn test_missing_end_tag() {
        assert_eq!(
            parse("<div><span></div>"),
            Err(CompileError::MissingEndTag { tag: "span".into() })
        );
        assert_eq!(
            parse("<div>"),
            Err(CompileError::MissingEndTag { tag: "div".into() })
        );
    }

    #[test]
    fn test_unterminated_interpolation() {
        assert_eq!(
            parse("ab{{ oops"),
            Err(CompileError::UnterminatedInterpolation { offset: 2 })
        );
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let root = parse("a < b").unwrap();
        assert_eq!(root.children, vec![text("a "), text("< b")]);
    }
}

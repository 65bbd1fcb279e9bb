//! Template syntax parser
//!
//! Splits template source into literal text and `{{ ... }}` directives,
//! applies trim markers, separates the variables preamble from the contents
//! and builds the element tree the engine walks.

use std::collections::BTreeSet;

use crate::models::Template;
use crate::templates::error::TemplateError;
use crate::templates::expression::{parse_statement, Expr, Statement};
use crate::templates::trim::apply_trim_markers;

/// Comment that starts the variables preamble
pub const VARIABLES_MARKER: &str = "variables";
/// Comment that ends the preamble and starts the emitted contents
pub const CONTENTS_MARKER: &str = "contents";

/// Lexical unit of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Text(String),
    Action {
        body: String,
        line: usize,
        trim_left: bool,
        trim_right: bool,
    },
}

/// Represents a parsed template element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateElement {
    /// Literal text, emitted as is
    Text(String),
    /// Interpolation: `{{ expr }}`
    Output {
        /// Expression to print
        expr: Expr,
        /// Source line
        line: usize,
    },
    /// `{{ $name := expr }}`
    Declare {
        /// Variable name without `$`
        name: String,
        /// Bound value
        value: Expr,
        /// Source line
        line: usize,
    },
    /// `{{ $name = expr }}`
    Assign {
        /// Variable name without `$`
        name: String,
        /// New value
        value: Expr,
        /// Source line
        line: usize,
    },
    /// `{{ if }}` / `{{ else if }}` / `{{ else }}` chain
    Conditional {
        /// Guarded branches, tried in order
        branches: Vec<Branch>,
        /// `else` body
        otherwise: Vec<TemplateElement>,
    },
    /// `{{ range }}` block
    Loop {
        /// Per-iteration local, if named
        binding: Option<String>,
        /// Sequence to iterate
        sequence: Expr,
        /// Body emitted once per element
        body: Vec<TemplateElement>,
        /// `else` body, emitted when the sequence is empty
        otherwise: Vec<TemplateElement>,
        /// Source line of the `range`
        line: usize,
    },
}

/// One guarded branch of a conditional
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Condition, tested for truthiness
    pub condition: Expr,
    /// Source line of the `if` / `else if`
    pub line: usize,
    /// Elements emitted when the condition holds
    pub body: Vec<TemplateElement>,
}

/// Parsed template structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    /// Template identifier, carried into render errors
    pub id: String,
    /// Bindings executed once before the contents
    pub preamble: Vec<TemplateElement>,
    /// Elements that produce the output
    pub contents: Vec<TemplateElement>,
}

impl ParsedTemplate {
    /// Context keys (`.name`) referenced anywhere in the template
    pub fn context_keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        collect_keys(&self.preamble, &mut keys);
        collect_keys(&self.contents, &mut keys);
        keys
    }

    /// Whether the template declares a variables preamble
    pub fn has_preamble(&self) -> bool {
        !self.preamble.is_empty()
    }
}

fn collect_keys(elements: &[TemplateElement], keys: &mut BTreeSet<String>) {
    for element in elements {
        match element {
            TemplateElement::Text(_) => {}
            TemplateElement::Output { expr, .. }
            | TemplateElement::Declare { value: expr, .. }
            | TemplateElement::Assign { value: expr, .. } => collect_expr_keys(expr, keys),
            TemplateElement::Conditional {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    collect_expr_keys(&branch.condition, keys);
                    collect_keys(&branch.body, keys);
                }
                collect_keys(otherwise, keys);
            }
            TemplateElement::Loop {
                sequence,
                body,
                otherwise,
                ..
            } => {
                collect_expr_keys(sequence, keys);
                collect_keys(body, keys);
                collect_keys(otherwise, keys);
            }
        }
    }
}

fn collect_expr_keys(expr: &Expr, keys: &mut BTreeSet<String>) {
    match expr {
        Expr::Field(name) => {
            keys.insert(name.clone());
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_expr_keys(arg, keys);
            }
        }
        Expr::Dot | Expr::Variable(_) | Expr::Literal(_) => {}
    }
}

/// Template parser
pub struct TemplateParser;

impl TemplateParser {
    /// Parse a template
    ///
    /// # Returns
    /// Parsed template structure or a `TemplateError::Parse` with line number
    pub fn parse(template: &Template) -> Result<ParsedTemplate, TemplateError> {
        Self::parse_source(&template.id, &template.source)
    }

    /// Parse raw source under the given identifier
    pub fn parse_source(id: &str, source: &str) -> Result<ParsedTemplate, TemplateError> {
        let mut tokens = Lexer::new(id, source).tokenize()?;
        apply_trim_markers(&mut tokens);

        let items = classify(id, tokens)?;
        let (preamble_items, mut content_items, has_marker) = split_sections(id, items)?;

        if has_marker {
            if let Some(Item::Text(text)) = content_items.first_mut() {
                strip_one_line_break(text);
            }
        }

        let preamble = check_preamble(id, &preamble_items)?;
        let contents = TreeBuilder::new(id, content_items).build()?;

        Ok(ParsedTemplate {
            id: id.to_string(),
            preamble,
            contents,
        })
    }

    /// Whether the source contains any directive
    pub fn has_directives(source: &str) -> bool {
        source.contains("{{")
    }
}

fn parse_error(id: &str, line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Parse {
        template: id.to_string(),
        line,
        message: message.into(),
    }
}

fn strip_one_line_break(text: &mut String) {
    if text.starts_with("\r\n") {
        text.drain(..2);
    } else if text.starts_with('\n') {
        text.remove(0);
    }
}

/// Splits source into text and directive tokens
struct Lexer<'a> {
    id: &'a str,
    source: &'a str,
    position: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(id: &'a str, source: &'a str) -> Self {
        Self {
            id,
            source,
            position: 0,
            line: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, TemplateError> {
        let mut tokens = Vec::new();

        while self.position < self.source.len() {
            let rest = &self.source[self.position..];
            match rest.find("{{") {
                None => {
                    tokens.push(Token::Text(rest.to_string()));
                    self.position = self.source.len();
                }
                Some(offset) => {
                    if offset > 0 {
                        let text = &rest[..offset];
                        self.line += text.matches('\n').count();
                        tokens.push(Token::Text(text.to_string()));
                    }
                    self.position += offset;
                    tokens.push(self.action()?);
                }
            }
        }

        Ok(tokens)
    }

    /// Lex one directive; `position` sits on its opening `{{`
    fn action(&mut self) -> Result<Token, TemplateError> {
        let line = self.line;
        let open = self.position;
        let mut body_start = open + 2;

        let after_open = &self.source[body_start..];
        let trim_left = after_open.starts_with('-')
            && after_open[1..].starts_with(|c: char| c.is_ascii_whitespace());
        if trim_left {
            body_start += 1;
        }

        let close = self.find_close(body_start).ok_or_else(|| {
            parse_error(self.id, line, "unclosed directive, expected '}}'")
        })?;

        let mut body = &self.source[body_start..close];
        let trim_right = body.ends_with('-')
            && body[..body.len() - 1].ends_with(|c: char| c.is_ascii_whitespace());
        if trim_right {
            body = &body[..body.len() - 1];
        }

        self.line += self.source[open..close].matches('\n').count();
        self.position = close + 2;

        Ok(Token::Action {
            body: body.trim().to_string(),
            line,
            trim_left,
            trim_right,
        })
    }

    /// Byte offset of the `}}` closing the directive whose body starts at `from`
    fn find_close(&self, from: usize) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let body = &self.source[from..];
        let leading = body.len() - body.trim_start().len();

        if body[leading..].starts_with("/*") {
            let comment_end = from + leading + body[leading..].find("*/")? + 2;
            return self.source[comment_end..]
                .find("}}")
                .map(|offset| comment_end + offset);
        }

        let mut i = from;
        while i < bytes.len() {
            match bytes[i] {
                b'"' => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'"' {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                b'`' => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'`' {
                        i += 1;
                    }
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
                _ => {}
            }
            i += 1;
        }

        None
    }
}

#[derive(Debug, Clone)]
enum Item {
    Text(String),
    Statement(Statement, usize),
}

fn classify(id: &str, tokens: Vec<Token>) -> Result<Vec<Item>, TemplateError> {
    tokens
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => Ok(Item::Text(text)),
            Token::Action { body, line, .. } => parse_statement(&body)
                .map(|statement| Item::Statement(statement, line))
                .map_err(|message| parse_error(id, line, message)),
        })
        .collect()
}

fn marker_line(item: &Item, marker: &str) -> Option<usize> {
    match item {
        Item::Statement(Statement::Comment(text), line) if text == marker => Some(*line),
        _ => None,
    }
}

/// Split at the contents marker; everything before it is the preamble
fn split_sections(
    id: &str,
    mut items: Vec<Item>,
) -> Result<(Vec<Item>, Vec<Item>, bool), TemplateError> {
    let contents_at = items
        .iter()
        .position(|item| marker_line(item, CONTENTS_MARKER).is_some());

    match contents_at {
        Some(index) => {
            let contents = items.split_off(index + 1);
            items.pop();
            Ok((items, contents, true))
        }
        None => {
            if let Some(line) = items.iter().find_map(|item| marker_line(item, VARIABLES_MARKER)) {
                return Err(parse_error(
                    id,
                    line,
                    "variables section is not followed by a {{/* contents */}} marker",
                ));
            }
            Ok((Vec::new(), items, false))
        }
    }
}

fn check_preamble(id: &str, items: &[Item]) -> Result<Vec<TemplateElement>, TemplateError> {
    let mut line = 1;
    let mut elements = Vec::new();

    for item in items {
        match item {
            Item::Text(text) => {
                if let Some(offset) = text.find(|c: char| !c.is_whitespace()) {
                    return Err(parse_error(
                        id,
                        line + text[..offset].matches('\n').count(),
                        "text is not allowed in the variables section",
                    ));
                }
                line += text.matches('\n').count();
            }
            Item::Statement(statement, at) => {
                line = *at;
                match statement {
                    Statement::Comment(_) => {}
                    Statement::Declare { name, value } => elements.push(TemplateElement::Declare {
                        name: name.clone(),
                        value: value.clone(),
                        line: *at,
                    }),
                    Statement::Assign { name, value } => elements.push(TemplateElement::Assign {
                        name: name.clone(),
                        value: value.clone(),
                        line: *at,
                    }),
                    _ => {
                        return Err(parse_error(
                            id,
                            *at,
                            "only variable bindings are allowed in the variables section",
                        ))
                    }
                }
            }
        }
    }

    Ok(elements)
}

enum BlockEnd {
    End,
    Else,
    ElseIf(Expr),
}

/// Builds the nested element tree from a flat item list
struct TreeBuilder<'a> {
    id: &'a str,
    items: std::vec::IntoIter<Item>,
}

impl<'a> TreeBuilder<'a> {
    fn new(id: &'a str, items: Vec<Item>) -> Self {
        Self {
            id,
            items: items.into_iter(),
        }
    }

    fn build(mut self) -> Result<Vec<TemplateElement>, TemplateError> {
        let (elements, end) = self.parse_list()?;
        match end {
            None => Ok(elements),
            Some((BlockEnd::End, line)) => {
                Err(parse_error(self.id, line, "unexpected {{ end }} outside a block"))
            }
            Some((_, line)) => {
                Err(parse_error(self.id, line, "unexpected {{ else }} outside a block"))
            }
        }
    }

    /// Parse until a block terminator or the end of input
    fn parse_list(
        &mut self,
    ) -> Result<(Vec<TemplateElement>, Option<(BlockEnd, usize)>), TemplateError> {
        let mut elements = Vec::new();

        while let Some(item) = self.items.next() {
            let (statement, line) = match item {
                Item::Text(text) => {
                    elements.push(TemplateElement::Text(text));
                    continue;
                }
                Item::Statement(statement, line) => (statement, line),
            };

            match statement {
                Statement::Comment(_) => {}
                Statement::Output(expr) => elements.push(TemplateElement::Output { expr, line }),
                Statement::Declare { name, value } => {
                    elements.push(TemplateElement::Declare { name, value, line })
                }
                Statement::Assign { name, value } => {
                    elements.push(TemplateElement::Assign { name, value, line })
                }
                Statement::If(condition) => elements.push(self.parse_if(condition, line)?),
                Statement::Range { binding, sequence } => {
                    elements.push(self.parse_range(binding, sequence, line)?)
                }
                Statement::End => return Ok((elements, Some((BlockEnd::End, line)))),
                Statement::Else => return Ok((elements, Some((BlockEnd::Else, line)))),
                Statement::ElseIf(condition) => {
                    return Ok((elements, Some((BlockEnd::ElseIf(condition), line))))
                }
            }
        }

        Ok((elements, None))
    }

    fn parse_if(&mut self, condition: Expr, line: usize) -> Result<TemplateElement, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = condition;
        let mut branch_line = line;

        loop {
            let (body, end) = self.parse_list()?;
            branches.push(Branch {
                condition,
                line: branch_line,
                body,
            });

            match end {
                None => return Err(parse_error(self.id, line, "unclosed {{ if }}, missing {{ end }}")),
                Some((BlockEnd::End, _)) => {
                    return Ok(TemplateElement::Conditional {
                        branches,
                        otherwise: Vec::new(),
                    })
                }
                Some((BlockEnd::ElseIf(next), at)) => {
                    condition = next;
                    branch_line = at;
                }
                Some((BlockEnd::Else, _)) => {
                    let otherwise = self.parse_else_body(line, "if")?;
                    return Ok(TemplateElement::Conditional {
                        branches,
                        otherwise,
                    });
                }
            }
        }
    }

    fn parse_range(
        &mut self,
        binding: Option<String>,
        sequence: Expr,
        line: usize,
    ) -> Result<TemplateElement, TemplateError> {
        let (body, end) = self.parse_list()?;

        let otherwise = match end {
            None => {
                return Err(parse_error(self.id, line, "unclosed {{ range }}, missing {{ end }}"))
            }
            Some((BlockEnd::End, _)) => Vec::new(),
            Some((BlockEnd::Else, _)) => self.parse_else_body(line, "range")?,
            Some((BlockEnd::ElseIf(_), at)) => {
                return Err(parse_error(self.id, at, "{{ else if }} is not allowed in {{ range }}"))
            }
        };

        Ok(TemplateElement::Loop {
            binding,
            sequence,
            body,
            otherwise,
            line,
        })
    }

    fn parse_else_body(
        &mut self,
        line: usize,
        block: &str,
    ) -> Result<Vec<TemplateElement>, TemplateError> {
        let (otherwise, end) = self.parse_list()?;
        match end {
            Some((BlockEnd::End, _)) => Ok(otherwise),
            None => Err(parse_error(
                self.id,
                line,
                format!("unclosed {{{{ {} }}}}, missing {{{{ end }}}}", block),
            )),
            Some((_, at)) => Err(parse_error(self.id, at, "unexpected {{ else }} after {{ else }}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    fn parse(source: &str) -> Result<ParsedTemplate, TemplateError> {
        TemplateParser::parse_source("test", source)
    }

    fn parse_err_line(source: &str) -> usize {
        match parse(source) {
            Err(TemplateError::Parse { line, .. }) => line,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_is_single_element() {
        let parsed = parse("#pragma once\n").unwrap();
        assert_eq!(parsed.contents, vec![TemplateElement::Text("#pragma once\n".to_string())]);
        assert!(!parsed.has_preamble());
    }

    #[test]
    fn test_parse_output_and_text() {
        let parsed = parse("class {{ .name }};").unwrap();
        assert_eq!(
            parsed.contents,
            vec![
                TemplateElement::Text("class ".to_string()),
                TemplateElement::Output {
                    expr: Expr::Field("name".to_string()),
                    line: 1
                },
                TemplateElement::Text(";".to_string()),
            ]
        );
    }

    #[test]
    fn test_braces_inside_string_literal() {
        let parsed = parse(r#"{{ printf "}}" }}x"#).unwrap();
        assert_eq!(parsed.contents.len(), 2);
    }

    #[test]
    fn test_trim_markers_applied() {
        let parsed = parse("a\n{{- .x -}}\n  b").unwrap();
        assert_eq!(parsed.contents[0], TemplateElement::Text("a".to_string()));
        assert_eq!(parsed.contents[2], TemplateElement::Text("b".to_string()));
    }

    #[test]
    fn test_dash_without_space_is_not_a_trim_marker() {
        let parsed = parse("a {{-x}}");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_if_else_chain() {
        let parsed = parse("{{ if .a }}A{{ else if .b }}B{{ else }}C{{ end }}").unwrap();
        match &parsed.contents[0] {
            TemplateElement::Conditional {
                branches,
                otherwise,
            } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(otherwise, &vec![TemplateElement::Text("C".to_string())]);
            }
            other => panic!("unexpected element {:?}", other),
        }
    }

    #[test]
    fn test_range_with_else() {
        let parsed = parse("{{ range .items }}{{ . }}{{ else }}none{{ end }}").unwrap();
        assert!(matches!(
            &parsed.contents[0],
            TemplateElement::Loop { otherwise, .. } if otherwise.len() == 1
        ));
    }

    #[test]
    fn test_sections_split_on_markers() {
        let source = "{{/* variables */}}\n{{ $x := \"v\" }}\n\n{{/* contents */}}\nbody {{ $x }}\n";
        let parsed = parse(source).unwrap();

        assert_eq!(
            parsed.preamble,
            vec![TemplateElement::Declare {
                name: "x".to_string(),
                value: Expr::Literal(Value::from("v")),
                line: 2,
            }]
        );
        assert_eq!(parsed.contents[0], TemplateElement::Text("body ".to_string()));
    }

    #[test]
    fn test_text_in_preamble_rejected() {
        let source = "{{/* variables */}}\nstray\n{{/* contents */}}\n";
        assert_eq!(parse_err_line(source), 2);
    }

    #[test]
    fn test_output_in_preamble_rejected() {
        let source = "{{/* variables */}}\n{{ .name }}\n{{/* contents */}}\n";
        assert_eq!(parse_err_line(source), 2);
    }

    #[test]
    fn test_variables_without_contents_rejected() {
        assert_eq!(parse_err_line("\n{{/* variables */}}\n{{ $x := true }}"), 2);
    }

    #[test]
    fn test_unclosed_blocks_report_opening_line() {
        assert_eq!(parse_err_line("a\n{{ if .x }}\nb"), 2);
        assert_eq!(parse_err_line("a\n\n{{ range .x }}b"), 3);
        assert_eq!(parse_err_line("{{ if .x }}{{ else }}{{ else }}{{ end }}"), 1);
    }

    #[test]
    fn test_stray_end_rejected() {
        assert_eq!(parse_err_line("a\nb\n{{ end }}"), 3);
        assert!(parse("{{ else }}").is_err());
    }

    #[test]
    fn test_unclosed_directive() {
        assert_eq!(parse_err_line("line\nHello {{ .name"), 2);
    }

    #[test]
    fn test_multiline_comment() {
        let parsed = parse("a{{/* one\ntwo */}}\n{{ .b }}").unwrap();
        assert!(matches!(
            &parsed.contents[2],
            TemplateElement::Output { line: 2, .. }
        ));
    }

    #[test]
    fn test_context_keys() {
        let parsed = parse(
            "{{ if .useForm }}{{ .className }}{{ end }}{{ range .list }}{{ printf \"%s\" .name }}{{ end }}",
        )
        .unwrap();
        let keys: Vec<_> = parsed.context_keys().into_iter().collect();
        assert_eq!(keys, vec!["className", "list", "name", "useForm"]);
    }

    #[test]
    fn test_leading_line_break_kept_without_marker() {
        let parsed = parse("\n{{ .a }}").unwrap();
        assert_eq!(parsed.contents[0], TemplateElement::Text("\n".to_string()));
    }

    #[test]
    fn test_has_directives() {
        assert!(TemplateParser::has_directives("{{ .x }}"));
        assert!(!TemplateParser::has_directives("int main() {}"));
    }
}

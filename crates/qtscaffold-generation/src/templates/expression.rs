//! Parsing of a single directive body
//!
//! A directive body is the text between `{{` and `}}` once trim markers are
//! stripped. It is either a block keyword (`if`, `else`, `range`, `end`),
//! a local binding (`$x := ...`, `$x = ...`), a comment, or a pipeline to
//! interpolate.

use crate::models::Value;

/// An evaluable expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `.`: the current loop element
    Dot,
    /// `.name`: a key of the variable context
    Field(String),
    /// `$name`: a local binding
    Variable(String),
    /// A string or boolean literal
    Literal(Value),
    /// Helper call; pipelines fold into nested calls
    Call {
        /// Helper name as written (`printf`, `Qt.Append`)
        name: String,
        /// Arguments in call order
        args: Vec<Expr>,
    },
}

/// One parsed directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `{{ pipeline }}`
    Output(Expr),
    /// `{{ $name := pipeline }}`
    Declare {
        /// Variable name without `$`
        name: String,
        /// Bound value
        value: Expr,
    },
    /// `{{ $name = pipeline }}`
    Assign {
        /// Variable name without `$`
        name: String,
        /// New value
        value: Expr,
    },
    /// `{{ if pipeline }}`
    If(Expr),
    /// `{{ else if pipeline }}`
    ElseIf(Expr),
    /// `{{ else }}`
    Else,
    /// `{{ end }}`
    End,
    /// `{{ range pipeline }}` or `{{ range $x := pipeline }}`
    Range {
        /// Per-iteration local, if named
        binding: Option<String>,
        /// Sequence to iterate
        sequence: Expr,
    },
    /// `{{/* text */}}`
    Comment(String),
}

const UNSUPPORTED_KEYWORDS: &[&str] = &["with", "define", "template", "block", "break", "continue"];

/// Parse a directive body into a statement
///
/// Errors are plain messages; the caller attaches template id and line.
pub fn parse_statement(body: &str) -> Result<Statement, String> {
    let body = body.trim();

    if let Some(rest) = body.strip_prefix("/*") {
        let text = rest
            .strip_suffix("*/")
            .ok_or_else(|| "unterminated comment".to_string())?;
        return Ok(Statement::Comment(text.trim().to_string()));
    }

    if body.is_empty() {
        return Err("empty directive".to_string());
    }

    let lexemes = lex(body)?;
    let mut parser = ExprParser { lexemes, pos: 0 };
    let statement = parser.statement()?;

    if let Some(extra) = parser.peek() {
        return Err(format!("unexpected {} in directive", extra.describe()));
    }

    Ok(statement)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    LParen,
    RParen,
    Pipe,
    Comma,
    Declare,
    Assign,
    Str(String),
    Bool(bool),
    Dot,
    Field(String),
    Variable(String),
    Ident(String),
}

impl Lexeme {
    fn describe(&self) -> String {
        match self {
            Lexeme::LParen => "'('".to_string(),
            Lexeme::RParen => "')'".to_string(),
            Lexeme::Pipe => "'|'".to_string(),
            Lexeme::Comma => "','".to_string(),
            Lexeme::Declare => "':='".to_string(),
            Lexeme::Assign => "'='".to_string(),
            Lexeme::Str(s) => format!("string {:?}", s),
            Lexeme::Bool(b) => format!("literal {}", b),
            Lexeme::Dot => "'.'".to_string(),
            Lexeme::Field(name) => format!("field .{}", name),
            Lexeme::Variable(name) => format!("variable ${}", name),
            Lexeme::Ident(name) => format!("identifier {}", name),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex(body: &str) -> Result<Vec<Lexeme>, String> {
    let mut lexemes = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                lexemes.push(Lexeme::LParen);
            }
            ')' => {
                chars.next();
                lexemes.push(Lexeme::RParen);
            }
            '|' => {
                chars.next();
                lexemes.push(Lexeme::Pipe);
            }
            ',' => {
                chars.next();
                lexemes.push(Lexeme::Comma);
            }
            ':' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err("expected ':='".to_string());
                }
                lexemes.push(Lexeme::Declare);
            }
            '=' => {
                chars.next();
                lexemes.push(Lexeme::Assign);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err("unterminated string literal".to_string()),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some('r') => value.push('\r'),
                            Some('"') => value.push('"'),
                            Some('\\') => value.push('\\'),
                            Some(other) => {
                                return Err(format!("unknown escape sequence \\{}", other))
                            }
                            None => return Err("unterminated string literal".to_string()),
                        },
                        Some(ch) => value.push(ch),
                    }
                }
                lexemes.push(Lexeme::Str(value));
            }
            '`' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err("unterminated raw string".to_string()),
                        Some('`') => break,
                        Some(ch) => value.push(ch),
                    }
                }
                lexemes.push(Lexeme::Str(value));
            }
            '.' => {
                chars.next();
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if !is_ident_char(ch) {
                        break;
                    }
                    name.push(ch);
                    chars.next();
                }
                if name.is_empty() {
                    lexemes.push(Lexeme::Dot);
                } else {
                    if chars.peek() == Some(&'.') {
                        return Err(format!("nested field access on .{} is not supported", name));
                    }
                    lexemes.push(Lexeme::Field(name));
                }
            }
            '$' => {
                chars.next();
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if !is_ident_char(ch) {
                        break;
                    }
                    name.push(ch);
                    chars.next();
                }
                if name.is_empty() {
                    return Err("bare '$' is not supported, name the variable".to_string());
                }
                lexemes.push(Lexeme::Variable(name));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                return Err("numeric literals are not supported".to_string());
            }
            c if is_ident_start(c) => {
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if !is_ident_char(ch) && ch != '.' {
                        break;
                    }
                    name.push(ch);
                    chars.next();
                }
                if name.ends_with('.') {
                    return Err(format!("incomplete identifier {}", name));
                }
                match name.as_str() {
                    "true" => lexemes.push(Lexeme::Bool(true)),
                    "false" => lexemes.push(Lexeme::Bool(false)),
                    _ => lexemes.push(Lexeme::Ident(name)),
                }
            }
            other => return Err(format!("unexpected character {:?}", other)),
        }
    }

    Ok(lexemes)
}

struct ExprParser {
    lexemes: Vec<Lexeme>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Lexeme> {
        self.lexemes.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn statement(&mut self) -> Result<Statement, String> {
        if let Some(Lexeme::Ident(keyword)) = self.peek() {
            let keyword = keyword.clone();
            match keyword.as_str() {
                "if" => {
                    self.advance();
                    return Ok(Statement::If(self.required_pipeline("if")?));
                }
                "else" => {
                    self.advance();
                    if self.peek().is_none() {
                        return Ok(Statement::Else);
                    }
                    if self.peek() == Some(&Lexeme::Ident("if".to_string())) {
                        self.advance();
                        return Ok(Statement::ElseIf(self.required_pipeline("else if")?));
                    }
                    return Err("expected `else` or `else if`".to_string());
                }
                "end" => {
                    self.advance();
                    return Ok(Statement::End);
                }
                "range" => {
                    self.advance();
                    return self.range();
                }
                k if UNSUPPORTED_KEYWORDS.contains(&k) => {
                    return Err(format!("`{}` directives are not supported", k));
                }
                _ => {}
            }
        }

        if let (Some(Lexeme::Variable(name)), Some(op)) =
            (self.peek().cloned(), self.peek_at(1).cloned())
        {
            match op {
                Lexeme::Declare => {
                    self.pos += 2;
                    let value = self.required_pipeline("binding")?;
                    return Ok(Statement::Declare { name, value });
                }
                Lexeme::Assign => {
                    self.pos += 2;
                    let value = self.required_pipeline("assignment")?;
                    return Ok(Statement::Assign { name, value });
                }
                _ => {}
            }
        }

        Ok(Statement::Output(self.pipeline()?))
    }

    fn range(&mut self) -> Result<Statement, String> {
        let mut binding = None;

        if let Some(Lexeme::Variable(name)) = self.peek().cloned() {
            match self.peek_at(1) {
                Some(Lexeme::Declare) => {
                    binding = Some(name);
                    self.pos += 2;
                }
                Some(Lexeme::Comma) => {
                    return Err("range with an index variable is not supported".to_string())
                }
                _ => {}
            }
        }

        let sequence = self.required_pipeline("range")?;
        Ok(Statement::Range { binding, sequence })
    }

    fn required_pipeline(&mut self, context: &str) -> Result<Expr, String> {
        if self.peek().is_none() {
            return Err(format!("missing value in {}", context));
        }
        self.pipeline()
    }

    fn pipeline(&mut self) -> Result<Expr, String> {
        let mut expr = self.command()?;

        while self.peek() == Some(&Lexeme::Pipe) {
            self.advance();
            match self.command()? {
                Expr::Call { name, mut args } => {
                    args.push(expr);
                    expr = Expr::Call { name, args };
                }
                _ => return Err("pipeline stage must be a helper call".to_string()),
            }
        }

        Ok(expr)
    }

    fn command(&mut self) -> Result<Expr, String> {
        let (head, is_helper) = match self.operand()? {
            Some(operand) => operand,
            None => {
                return Err(match self.peek() {
                    Some(lexeme) => format!("unexpected {}", lexeme.describe()),
                    None => "missing value".to_string(),
                })
            }
        };

        let mut args = Vec::new();
        while let Some((arg, _)) = self.operand()? {
            args.push(arg);
        }

        match head {
            Expr::Call { name, .. } if is_helper => Ok(Expr::Call { name, args }),
            other if args.is_empty() => Ok(other),
            _ => Err("arguments can only be passed to a helper".to_string()),
        }
    }

    /// Returns the operand and whether it was a bare helper name
    fn operand(&mut self) -> Result<Option<(Expr, bool)>, String> {
        let lexeme = match self.peek() {
            None | Some(Lexeme::Pipe) | Some(Lexeme::RParen) => return Ok(None),
            Some(lexeme) => lexeme.clone(),
        };

        let operand = match lexeme {
            Lexeme::LParen => {
                self.advance();
                let inner = self.pipeline()?;
                if self.advance() != Some(Lexeme::RParen) {
                    return Err("unclosed '('".to_string());
                }
                (inner, false)
            }
            Lexeme::Str(s) => {
                self.advance();
                (Expr::Literal(Value::String(s)), false)
            }
            Lexeme::Bool(b) => {
                self.advance();
                (Expr::Literal(Value::Bool(b)), false)
            }
            Lexeme::Dot => {
                self.advance();
                (Expr::Dot, false)
            }
            Lexeme::Field(name) => {
                self.advance();
                (Expr::Field(name), false)
            }
            Lexeme::Variable(name) => {
                self.advance();
                (Expr::Variable(name), false)
            }
            Lexeme::Ident(name) => {
                self.advance();
                (
                    Expr::Call {
                        name,
                        args: Vec::new(),
                    },
                    true,
                )
            }
            other => return Err(format!("unexpected {}", other.describe())),
        };

        Ok(Some(operand))
    }
}

//! Fixed helper library callable from templates
//!
//! Helpers are pure functions over [`Value`]s. Sequence helpers never mutate
//! their input; templates rebind the result instead:
//!
//! ```text
//! {{ $macros := Qt.NewArray }}
//! {{ $macros = (Qt.Append $macros "Q_OBJECT") }}
//! ```
//!
//! Helpers may be called bare (`NewArray`) or under the `Qt.` namespace.

use std::collections::HashMap;

use crate::models::Value;
use crate::templates::error::HelperArgumentError;

/// Signature shared by every helper
pub type HelperFn = fn(&[Value]) -> Result<Value, HelperArgumentError>;

/// Namespace prefix accepted in front of helper names
pub const HELPER_NAMESPACE: &str = "Qt";

/// Registry of helpers available to the renderer
#[derive(Clone)]
pub struct HelperLibrary {
    helpers: HashMap<&'static str, HelperFn>,
}

impl HelperLibrary {
    /// The standard helper set
    pub fn standard() -> Self {
        let mut helpers: HashMap<&'static str, HelperFn> = HashMap::new();
        helpers.insert("NewArray", new_array);
        helpers.insert("Append", append);
        helpers.insert("AppendIf", append_if);
        helpers.insert("Reverse", reverse);
        helpers.insert("printf", printf);
        helpers.insert("print", print);
        helpers.insert("eq", eq);
        helpers.insert("ne", ne);
        helpers.insert("not", not);
        helpers.insert("and", and);
        helpers.insert("or", or);
        Self { helpers }
    }

    /// Resolve a helper by name, with or without the `Qt.` namespace
    pub fn get(&self, name: &str) -> Option<HelperFn> {
        let bare = name
            .strip_prefix(HELPER_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        self.helpers.get(bare).copied()
    }

    /// Whether a helper with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered helper names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.helpers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for HelperLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for HelperLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperLibrary")
            .field("helpers", &self.names())
            .finish()
    }
}

fn expect_arity(args: &[Value], expected: usize) -> Result<(), HelperArgumentError> {
    if args.len() != expected {
        return Err(HelperArgumentError::Arity {
            expected: expected.to_string(),
            found: args.len(),
        });
    }
    Ok(())
}

fn expect_at_least(args: &[Value], minimum: usize) -> Result<(), HelperArgumentError> {
    if args.len() < minimum {
        return Err(HelperArgumentError::Arity {
            expected: format!("at least {}", minimum),
            found: args.len(),
        });
    }
    Ok(())
}

fn string_arg(args: &[Value], index: usize) -> Result<&str, HelperArgumentError> {
    match &args[index] {
        Value::String(s) => Ok(s),
        other => Err(HelperArgumentError::Type {
            position: index + 1,
            expected: "string",
            found: other.kind(),
        }),
    }
}

fn sequence_arg(args: &[Value], index: usize) -> Result<&[String], HelperArgumentError> {
    match &args[index] {
        Value::Sequence(items) => Ok(items),
        other => Err(HelperArgumentError::Type {
            position: index + 1,
            expected: "sequence",
            found: other.kind(),
        }),
    }
}

fn bool_arg(args: &[Value], index: usize) -> Result<bool, HelperArgumentError> {
    match &args[index] {
        Value::Bool(b) => Ok(*b),
        other => Err(HelperArgumentError::Type {
            position: index + 1,
            expected: "bool",
            found: other.kind(),
        }),
    }
}

/// `NewArray(values...)`: a sequence holding the given strings
pub fn new_array(args: &[Value]) -> Result<Value, HelperArgumentError> {
    let items = (0..args.len())
        .map(|i| string_arg(args, i).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Sequence(items))
}

/// `Append(seq, value)`: a new sequence with `value` at the end
pub fn append(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_arity(args, 2)?;
    let items = sequence_arg(args, 0)?;
    let value = string_arg(args, 1)?;

    let mut appended = items.to_vec();
    appended.push(value.to_string());
    Ok(Value::Sequence(appended))
}

/// `AppendIf(seq, value, condition)`: `Append` when `condition` holds
pub fn append_if(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_arity(args, 3)?;
    let items = sequence_arg(args, 0)?;
    let value = string_arg(args, 1)?;

    if bool_arg(args, 2)? {
        let mut appended = items.to_vec();
        appended.push(value.to_string());
        Ok(Value::Sequence(appended))
    } else {
        Ok(Value::Sequence(items.to_vec()))
    }
}

/// `Reverse(seq)`: a new sequence in reverse order
pub fn reverse(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_arity(args, 1)?;
    let mut items = sequence_arg(args, 0)?.to_vec();
    items.reverse();
    Ok(Value::Sequence(items))
}

/// `printf(format, args...)`
///
/// Supported verbs: `%s` and `%v` (string form), `%q` (quoted string),
/// `%t` (bool) and `%%`. Every argument must be consumed by exactly one verb.
pub fn printf(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_at_least(args, 1)?;
    let format = string_arg(args, 0)?;
    let rest = &args[1..];

    let mut out = String::with_capacity(format.len());
    let mut next = 0;
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let verb = chars.next().ok_or_else(|| {
            HelperArgumentError::Format("format string ends with a lone '%'".to_string())
        })?;
        if verb == '%' {
            out.push('%');
            continue;
        }

        let arg = rest.get(next).ok_or_else(|| {
            HelperArgumentError::Format(format!("missing argument for %{}", verb))
        })?;
        let position = next + 2;
        next += 1;

        match (verb, arg) {
            ('s' | 'v', value) => out.push_str(&value.to_string()),
            ('q', Value::String(s)) => out.push_str(&quote(s)),
            ('t', Value::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
            ('q', other) => {
                return Err(HelperArgumentError::Type {
                    position,
                    expected: "string",
                    found: other.kind(),
                })
            }
            ('t', other) => {
                return Err(HelperArgumentError::Type {
                    position,
                    expected: "bool",
                    found: other.kind(),
                })
            }
            (other, _) => {
                return Err(HelperArgumentError::Format(format!(
                    "unsupported verb %{}",
                    other
                )))
            }
        }
    }

    if next < rest.len() {
        return Err(HelperArgumentError::Format(format!(
            "{} unused argument(s)",
            rest.len() - next
        )));
    }

    Ok(Value::String(out))
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// `print(args...)`: string forms concatenated, with a space between two
/// adjacent operands when neither is a string
pub fn print(args: &[Value]) -> Result<Value, HelperArgumentError> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            let prev_is_string = matches!(args[i - 1], Value::String(_));
            let this_is_string = matches!(arg, Value::String(_));
            if !prev_is_string && !this_is_string {
                out.push(' ');
            }
        }
        out.push_str(&arg.to_string());
    }
    Ok(Value::String(out))
}

fn compare(args: &[Value], first: usize, other: usize) -> Result<bool, HelperArgumentError> {
    let (a, b) = (&args[first], &args[other]);
    if a.kind() != b.kind() {
        return Err(HelperArgumentError::Type {
            position: other + 1,
            expected: a.kind(),
            found: b.kind(),
        });
    }
    Ok(a == b)
}

/// `eq(a, b, c...)`: true when `a` equals any of the following operands
pub fn eq(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_at_least(args, 2)?;
    for other in 1..args.len() {
        if compare(args, 0, other)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

/// `ne(a, b)`
pub fn ne(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_arity(args, 2)?;
    Ok(Value::Bool(!compare(args, 0, 1)?))
}

/// `not(x)`: negated truthiness
pub fn not(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_arity(args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

/// `and(xs...)`: the first falsy operand, or the last one
pub fn and(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_at_least(args, 1)?;
    let picked = args
        .iter()
        .find(|v| !v.is_truthy())
        .unwrap_or(&args[args.len() - 1]);
    Ok(picked.clone())
}

/// `or(xs...)`: the first truthy operand, or the last one
pub fn or(args: &[Value]) -> Result<Value, HelperArgumentError> {
    expect_at_least(args, 1)?;
    let picked = args
        .iter()
        .find(|v| v.is_truthy())
        .unwrap_or(&args[args.len() - 1]);
    Ok(picked.clone())
}

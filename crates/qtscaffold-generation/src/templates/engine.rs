//! Template engine for rendering parsed templates against a variable context
//!
//! Provides template rendering with support for:
//! - Context interpolation (`{{ .name }}`) and local bindings (`{{ $x }}`)
//! - Conditional blocks (`{{ if }}...{{ else }}...{{ end }}`)
//! - Loops (`{{ range }}...{{ end }}`)
//! - Helper calls and pipelines (`{{ .name | printf "<%s>" }}`)

use tracing::trace;

use crate::{
    models::{Template, TemplateContext, Value},
    templates::{
        error::TemplateError,
        expression::Expr,
        helpers::HelperLibrary,
        parser::{ParsedTemplate, TemplateElement, TemplateParser},
    },
};

/// Template engine for rendering templates with a variable context
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    /// Helpers callable from templates
    helpers: HelperLibrary,
}

impl TemplateEngine {
    /// Create a new template engine with the standard helpers
    pub fn new() -> Self {
        Self {
            helpers: HelperLibrary::standard(),
        }
    }

    /// Create a new template engine with a custom helper library
    pub fn with_helpers(helpers: HelperLibrary) -> Self {
        Self { helpers }
    }

    /// Helpers available to templates
    pub fn helpers(&self) -> &HelperLibrary {
        &self.helpers
    }

    /// Render a template with the provided context
    ///
    /// # Arguments
    /// * `template` - The template to render
    /// * `context` - Variable context; never modified
    ///
    /// # Returns
    /// Rendered content or error
    pub fn render(
        &self,
        template: &Template,
        context: &TemplateContext,
    ) -> Result<String, TemplateError> {
        let parsed = TemplateParser::parse(template)?;
        self.render_parsed(&parsed, context)
    }

    /// Render template source under the given identifier
    pub fn render_str(
        &self,
        id: &str,
        source: &str,
        context: &TemplateContext,
    ) -> Result<String, TemplateError> {
        let parsed = TemplateParser::parse_source(id, source)?;
        self.render_parsed(&parsed, context)
    }

    /// Render an already parsed template
    pub fn render_parsed(
        &self,
        parsed: &ParsedTemplate,
        context: &TemplateContext,
    ) -> Result<String, TemplateError> {
        let mut pass = RenderPass {
            template: &parsed.id,
            context,
            helpers: &self.helpers,
            locals: Vec::new(),
            dots: Vec::new(),
            output: String::new(),
        };

        pass.run(&parsed.preamble)?;
        pass.run(&parsed.contents)?;

        trace!(template = %parsed.id, bytes = pass.output.len(), "rendered template");
        Ok(pass.output)
    }
}

/// State of a single render call
struct RenderPass<'a> {
    template: &'a str,
    context: &'a TemplateContext,
    helpers: &'a HelperLibrary,
    /// Local bindings, innermost last
    locals: Vec<(String, Value)>,
    /// Current loop elements, innermost last
    dots: Vec<Value>,
    output: String,
}

impl<'a> RenderPass<'a> {
    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::Render {
            template: self.template.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Execute elements inside a scope that ends with the block
    fn run_block(&mut self, elements: &[TemplateElement]) -> Result<(), TemplateError> {
        let depth = self.locals.len();
        let result = self.run(elements);
        self.locals.truncate(depth);
        result
    }

    fn run(&mut self, elements: &[TemplateElement]) -> Result<(), TemplateError> {
        for element in elements {
            match element {
                TemplateElement::Text(text) => self.output.push_str(text),
                TemplateElement::Output { expr, line } => {
                    let value = self.eval(expr, *line)?;
                    self.output.push_str(&value.to_string());
                }
                TemplateElement::Declare { name, value, line } => {
                    let value = self.eval(value, *line)?;
                    self.locals.push((name.clone(), value));
                }
                TemplateElement::Assign { name, value, line } => {
                    let value = self.eval(value, *line)?;
                    match self.locals.iter_mut().rev().find(|(local, _)| local == name) {
                        Some(slot) => slot.1 = value,
                        None => {
                            return Err(self.error(
                                *line,
                                format!("assignment to undeclared variable ${}", name),
                            ))
                        }
                    }
                }
                TemplateElement::Conditional {
                    branches,
                    otherwise,
                } => {
                    let mut taken = false;
                    for branch in branches {
                        if self.eval(&branch.condition, branch.line)?.is_truthy() {
                            self.run_block(&branch.body)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken {
                        self.run_block(otherwise)?;
                    }
                }
                TemplateElement::Loop {
                    binding,
                    sequence,
                    body,
                    otherwise,
                    line,
                } => self.run_loop(binding.as_deref(), sequence, body, otherwise, *line)?,
            }
        }

        Ok(())
    }

    fn run_loop(
        &mut self,
        binding: Option<&str>,
        sequence: &Expr,
        body: &[TemplateElement],
        otherwise: &[TemplateElement],
        line: usize,
    ) -> Result<(), TemplateError> {
        let items = match self.eval(sequence, line)? {
            Value::Sequence(items) => items,
            other => {
                return Err(self.error(
                    line,
                    format!("range over a {}, expected a sequence", other.kind()),
                ))
            }
        };

        if items.is_empty() {
            return self.run_block(otherwise);
        }

        for item in items {
            let depth = self.locals.len();
            if let Some(name) = binding {
                self.locals.push((name.to_string(), Value::String(item.clone())));
            }
            self.dots.push(Value::String(item));

            let result = self.run(body);

            self.dots.pop();
            self.locals.truncate(depth);
            result?;
        }

        Ok(())
    }

    fn eval(&self, expr: &Expr, line: usize) -> Result<Value, TemplateError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Dot => self
                .dots
                .last()
                .cloned()
                .ok_or_else(|| self.error(line, "`.` used outside of a range")),
            Expr::Field(name) => self
                .context
                .get(name)
                .cloned()
                .ok_or_else(|| self.error(line, format!("undefined context key .{}", name))),
            Expr::Variable(name) => self
                .locals
                .iter()
                .rev()
                .find(|(local, _)| local == name)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| self.error(line, format!("undefined variable ${}", name))),
            Expr::Call { name, args } => {
                let helper = self
                    .helpers
                    .get(name)
                    .ok_or_else(|| self.error(line, format!("unknown helper `{}`", name)))?;

                let values = args
                    .iter()
                    .map(|arg| self.eval(arg, line))
                    .collect::<Result<Vec<_>, _>>()?;

                helper(&values).map_err(|source| TemplateError::Helper {
                    template: self.template.to_string(),
                    line,
                    helper: name.clone(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::error::HelperArgumentError;

    fn render(source: &str, context: &TemplateContext) -> Result<String, TemplateError> {
        TemplateEngine::new().render_str("test", source, context)
    }

    #[test]
    fn test_render_context_value() {
        let ctx = TemplateContext::new().with("name", "Foo");
        assert_eq!(render("class {{ .name }};", &ctx).unwrap(), "class Foo;");
    }

    #[test]
    fn test_render_without_directives_is_identity() {
        let source = "int main()\n{\n    return 0;\n}\n";
        assert_eq!(render(source, &TemplateContext::new()).unwrap(), source);
    }

    #[test]
    fn test_undefined_key_is_render_error() {
        let err = render("a\n{{ .missing }}", &TemplateContext::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Render { line: 2, .. }));
    }

    #[test]
    fn test_conditional_branches() {
        let source = "{{ if .a }}A{{ else if .b }}B{{ else }}C{{ end }}";
        let ctx = |a: bool, b: bool| TemplateContext::new().with("a", a).with("b", b);
        assert_eq!(render(source, &ctx(true, true)).unwrap(), "A");
        assert_eq!(render(source, &ctx(false, true)).unwrap(), "B");
        assert_eq!(render(source, &ctx(false, false)).unwrap(), "C");
    }

    #[test]
    fn test_string_truthiness() {
        let source = "x{{ if .baseClass }}: public {{ .baseClass }}{{ end }}";
        let empty = TemplateContext::new().with("baseClass", "");
        let set = TemplateContext::new().with("baseClass", "QObject");
        assert_eq!(render(source, &empty).unwrap(), "x");
        assert_eq!(render(source, &set).unwrap(), "x: public QObject");
    }

    #[test]
    fn test_range_over_local() {
        let source = "{{ $l := NewArray \"a\" \"b\" }}{{ range $l }}<{{ . }}>{{ end }}";
        assert_eq!(render(source, &TemplateContext::new()).unwrap(), "<a><b>");
    }

    #[test]
    fn test_range_binding_and_else() {
        let source = "{{ range $m := .items }}{{ $m }},{{ else }}none{{ end }}";
        let full = TemplateContext::new().with("items", vec!["x", "y"]);
        let empty = TemplateContext::new().with("items", Vec::<String>::new());
        assert_eq!(render(source, &full).unwrap(), "x,y,");
        assert_eq!(render(source, &empty).unwrap(), "none");
    }

    #[test]
    fn test_range_over_string_fails() {
        let ctx = TemplateContext::new().with("items", "abc");
        let err = render("{{ range .items }}{{ end }}", &ctx).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_dot_outside_range_fails() {
        assert!(render("{{ . }}", &TemplateContext::new()).is_err());
    }

    #[test]
    fn test_rebinding_sees_appended_value() {
        let source = "{{ $m := Qt.NewArray }}{{ $m = (Qt.Append $m \"Q_OBJECT\") }}{{ $m }}";
        assert_eq!(render(source, &TemplateContext::new()).unwrap(), "[Q_OBJECT]");
    }

    #[test]
    fn test_block_scoped_declaration() {
        let source = "{{ if true }}{{ $x := \"in\" }}{{ end }}{{ $x }}";
        let err = render(source, &TemplateContext::new()).unwrap_err();
        assert!(err.to_string().contains("undefined variable $x"));
    }

    #[test]
    fn test_assignment_inside_block_is_visible_after() {
        let source = "{{ $x := \"a\" }}{{ if true }}{{ $x = \"b\" }}{{ end }}{{ $x }}";
        assert_eq!(render(source, &TemplateContext::new()).unwrap(), "b");
    }

    #[test]
    fn test_assign_undeclared_fails() {
        let err = render("{{ $x = \"b\" }}", &TemplateContext::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Render { line: 1, .. }));
    }

    #[test]
    fn test_locals_do_not_shadow_context() {
        let source = "{{ $name := \"local\" }}{{ .name }}/{{ $name }}";
        let ctx = TemplateContext::new().with("name", "ctx");
        assert_eq!(render(source, &ctx).unwrap(), "ctx/local");
    }

    #[test]
    fn test_pipeline_and_printf() {
        let ctx = TemplateContext::new().with("baseClass", "QObject");
        assert_eq!(
            render(r#"{{ .baseClass | printf "<%s>" }}"#, &ctx).unwrap(),
            "<QObject>"
        );
    }

    #[test]
    fn test_helper_error_carries_name_and_line() {
        let err = render("\n\n{{ printf \"%s %s\" \"a\" }}", &TemplateContext::new()).unwrap_err();
        match err {
            TemplateError::Helper {
                line,
                helper,
                source,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(helper, "printf");
                assert!(matches!(source, HelperArgumentError::Format(_)));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_helper_fails() {
        let err = render("{{ upper .name }}", &TemplateContext::new().with("name", "x")).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_preamble_bindings_visible_in_contents() {
        let source = "{{/* variables */}}\n{{ $greeting := printf \"hi %s\" .name }}\n\n{{/* contents */}}\n{{ $greeting }}\n";
        let ctx = TemplateContext::new().with("name", "Qt");
        assert_eq!(render(source, &ctx).unwrap(), "hi Qt\n");
    }

    #[test]
    fn test_trim_does_not_touch_directive_output() {
        let source = "a{{ printf \"\\n\\n\" }}\n{{- \"b\" }}";
        assert_eq!(render(source, &TemplateContext::new()).unwrap(), "a\n\nb");
    }

    #[test]
    fn test_render_does_not_mutate_context() {
        let ctx = TemplateContext::new().with("name", "Foo");
        let before = ctx.clone();
        render("{{ $name := \"x\" }}{{ .name }}", &ctx).unwrap();
        assert_eq!(ctx, before);
    }
}

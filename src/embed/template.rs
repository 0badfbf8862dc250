//! Template types for typed variable injection.

use std::marker::PhantomData;

/// Trait for template variable sets
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

/// Variable set for snippets without placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVars;

impl TemplateVars for NoVars {
    fn apply(&self, content: &str) -> String {
        content.to_string()
    }
}

/// Template with typed variable injection
#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _marker: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _marker: PhantomData,
        }
    }

    pub const fn content(&self) -> &'static str {
        self.content
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}

impl Template<NoVars> {
    /// Render a template that takes no variables.
    pub fn text(&self) -> &'static str {
        self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeting<'a>(&'a str);

    impl TemplateVars for Greeting<'_> {
        fn apply(&self, content: &str) -> String {
            content.replace("__NAME__", self.0)
        }
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        const T: Template<Greeting<'static>> = Template::new("hi __NAME__, bye __NAME__");
        assert_eq!(T.render(&Greeting("ann")), "hi ann, bye ann");
    }

    #[test]
    fn test_no_vars_is_identity() {
        const T: Template<NoVars> = Template::new("a();");
        assert_eq!(T.render(&NoVars), "a();");
        assert_eq!(T.text(), T.content());
    }
}

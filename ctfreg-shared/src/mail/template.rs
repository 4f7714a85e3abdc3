/// Plaintext mail templates
///
/// Templates use `{{ name }}` placeholders. Rendering replaces each
/// placeholder with the matching context value; unknown names render as the
/// empty string.
///
/// # Example
///
/// ```
/// use ctfreg_shared::mail::template::{MailTemplate, TemplateContext};
///
/// let template = MailTemplate::new("Welcome to {{ competition_name }}!");
/// let mut context = TemplateContext::new();
/// context.insert("competition_name", "FAUST CTF");
///
/// assert_eq!(template.render(&context), "Welcome to FAUST CTF!");
/// ```

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use tracing::debug;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Body of the address confirmation mail
pub const CONFIRMATION_MAIL: &str = include_str!("../../templates/confirmation_mail.txt");

/// Values available to a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: HashMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.values.insert(name.into(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// A parsed-on-render plaintext template
#[derive(Debug, Clone)]
pub struct MailTemplate {
    source: String,
}

impl MailTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The built-in confirmation mail template
    pub fn confirmation() -> Self {
        Self::new(CONFIRMATION_MAIL)
    }

    pub fn render(&self, context: &TemplateContext) -> String {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                let name = &caps[1];
                match context.get(name) {
                    Some(value) => value.to_string(),
                    None => {
                        debug!(placeholder = name, "Template variable not in context");
                        String::new()
                    }
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_placeholders() {
        let template = MailTemplate::new("{{a}} and {{  b  }} and {{ a }}");
        let mut context = TemplateContext::new();
        context.insert("a", "x").insert("b", 42);

        assert_eq!(template.render(&context), "x and 42 and x");
    }

    #[test]
    fn test_unknown_placeholder_renders_empty() {
        let template = MailTemplate::new("[{{ missing }}]");
        assert_eq!(template.render(&TemplateContext::new()), "[]");
    }

    #[test]
    fn test_text_without_placeholders_untouched() {
        let template = MailTemplate::new("plain {text} with { braces }");
        assert_eq!(
            template.render(&TemplateContext::new()),
            "plain {text} with { braces }"
        );
    }

    #[test]
    fn test_confirmation_template_uses_all_variables() {
        for name in ["competition_name", "protocol", "host", "user", "token"] {
            assert!(
                CONFIRMATION_MAIL.contains(&format!("{{{{ {} }}}}", name)),
                "missing {}",
                name
            );
        }
    }
}

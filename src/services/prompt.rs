//! MiniJinja prompt templates

use minijinja::{context, Environment, Error, ErrorKind, Value};
use std::path::Path;
use anyhow::Result;

use crate::types::UpstreamError;

pub const SYSTEM_TEMPLATE: &str = "system.txt";
pub const USER_TURN_TEMPLATE: &str = "user_turn.txt";

const DEFAULT_SYSTEM: &str = "{{ system_prompt }}";

const DEFAULT_USER_TURN: &str = "{{ message }}\
{% if file_name %}\n\nAttached file \"{{ file_name }}\":\n\
{{ file_content | truncate(max_attachment_chars) }}{% endif %}";

pub struct PromptTemplates {
    env: Environment<'static>,
    system_prompt: String,
    max_attachment_chars: usize,
}

impl PromptTemplates {
    /// Built-in templates, optionally overridden by files in `template_dir`.
    pub fn new(
        system_prompt: &str,
        max_attachment_chars: usize,
        template_dir: Option<&Path>,
    ) -> Result<Self> {
        let mut env = Environment::new();
        env.set_debug(cfg!(debug_assertions));
        env.add_filter("truncate", truncate_text);

        env.add_template(SYSTEM_TEMPLATE, DEFAULT_SYSTEM)?;
        env.add_template(USER_TURN_TEMPLATE, DEFAULT_USER_TURN)?;

        if let Some(dir) = template_dir {
            for name in [SYSTEM_TEMPLATE, USER_TURN_TEMPLATE] {
                let path = dir.join(name);
                if !path.exists() {
                    continue;
                }
                let source = std::fs::read_to_string(&path)?;
                env.add_template_owned(name, source)?;
                tracing::info!("Loaded prompt template override {}", path.display());
            }
        }

        Ok(Self {
            env,
            system_prompt: system_prompt.to_string(),
            max_attachment_chars,
        })
    }

    pub fn render_system(&self) -> Result<String, UpstreamError> {
        self.render(SYSTEM_TEMPLATE, context! {
            system_prompt => self.system_prompt.as_str(),
        })
    }

    pub fn render_user_turn(
        &self,
        message: &str,
        file_name: &str,
        file_content: &str,
    ) -> Result<String, UpstreamError> {
        self.render(USER_TURN_TEMPLATE, context! {
            message => message,
            file_name => file_name,
            file_content => file_content,
            max_attachment_chars => self.max_attachment_chars,
        })
    }

    fn render(&self, name: &str, ctx: Value) -> Result<String, UpstreamError> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|e| UpstreamError::Prompt(e.to_string()))
    }
}

fn truncate_text(value: &Value, length: &[Value]) -> Result<Value, Error> {
    let text = value.as_str().ok_or_else(|| {
        Error::new(ErrorKind::InvalidOperation, "expected string")
    })?;

    let max_chars = length
        .first()
        .and_then(|v| v.as_i64().map(|i| i.max(0) as usize))
        .unwrap_or(50);

    match text.char_indices().nth(max_chars) {
        None => Ok(Value::from(text)),
        Some((cut, _)) => Ok(Value::from(format!("{}\n[... truncated]", &text[..cut]))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_turn_without_file() -> Result<()> {
        let prompts = PromptTemplates::new("be nice", 100, None)?;
        assert_eq!(prompts.render_user_turn("hello", "", "")?, "hello");
        assert_eq!(prompts.render_system()?, "be nice");
        Ok(())
    }

    #[test]
    fn test_user_turn_with_file() -> Result<()> {
        let prompts = PromptTemplates::new("be nice", 100, None)?;
        let rendered = prompts.render_user_turn("summarise", "plan.txt", "oats & <berries>")?;
        assert_eq!(
            rendered,
            "summarise\n\nAttached file \"plan.txt\":\noats & <berries>"
        );
        Ok(())
    }

    #[test]
    fn test_attachment_is_truncated_on_char_boundary() -> Result<()> {
        let prompts = PromptTemplates::new("", 3, None)?;
        let rendered = prompts.render_user_turn("", "f", "ñandú")?;
        assert!(rendered.ends_with("ñan\n[... truncated]"));
        Ok(())
    }

    #[test]
    fn test_template_dir_override() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(USER_TURN_TEMPLATE), "Q: {{ message }}")?;
        let prompts = PromptTemplates::new("sys", 100, Some(dir.path()))?;
        assert_eq!(prompts.render_user_turn("hi", "", "")?, "Q: hi");
        assert_eq!(prompts.render_system()?, "sys");
        Ok(())
    }
}

//! Template compilation and rendering
//!
//! Templates are plain command text with `{{ name }}` placeholders. A
//! template is compiled once per batch and rendered once per label.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use shared::{AppError, ErrorCode, ItemContext};
use thiserror::Error;

use super::fields::FieldSet;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template text is malformed
    #[error("Template compilation error: {0}")]
    Compile(String),

    /// Template compiled but could not be rendered with the given fields
    #[error("Template render error: {0}")]
    Render(String),
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Compile(msg) => {
                AppError::with_message(ErrorCode::TemplateCompileFailed, msg)
            }
            TemplateError::Render(msg) => AppError::with_message(ErrorCode::TemplateRenderFailed, msg),
        }
    }
}

/// Compiles template text into renderers
pub trait TemplateEngine: Send + Sync {
    fn compile(&self, body: &str) -> Result<Box<dyn CompiledTemplate>, TemplateError>;
}

/// A compiled template
pub trait CompiledTemplate: Send + Sync {
    fn render(&self, fields: &FieldSet) -> Result<String, TemplateError>;
}

/// Default engine for `{{ name }}` placeholders
///
/// - names are letters, digits, `_`, `.` and `-`; dots address nested objects
/// - a stray `{{` or `}}` is a compile error
/// - a missing field renders as an empty string
/// - an object or array value is a render error
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

#[derive(Debug)]
struct PlaceholderTemplate {
    segments: Vec<Segment>,
}

impl TemplateEngine for PlaceholderEngine {
    fn compile(&self, body: &str) -> Result<Box<dyn CompiledTemplate>, TemplateError> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(body) {
            let Some(whole) = caps.get(0) else { continue };
            push_text(&mut segments, &body[last..whole.start()], last)?;

            let name = caps.get(1).map_or("", |m| m.as_str());
            if name.is_empty() {
                return Err(TemplateError::Compile(format!(
                    "empty placeholder at offset {}",
                    whole.start()
                )));
            }
            if !is_valid_name(name) {
                return Err(TemplateError::Compile(format!(
                    "invalid placeholder name '{}' at offset {}",
                    name,
                    whole.start()
                )));
            }
            segments.push(Segment::Field(name.to_string()));
            last = whole.end();
        }
        push_text(&mut segments, &body[last..], last)?;

        Ok(Box::new(PlaceholderTemplate { segments }))
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str, offset: usize) -> Result<(), TemplateError> {
    if let Some(pos) = text.find("{{") {
        return Err(TemplateError::Compile(format!(
            "unclosed '{{{{' at offset {}",
            offset + pos
        )));
    }
    if let Some(pos) = text.find("}}") {
        return Err(TemplateError::Compile(format!(
            "unmatched '}}}}' at offset {}",
            offset + pos
        )));
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
    Ok(())
}

fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

impl CompiledTemplate for PlaceholderTemplate {
    fn render(&self, fields: &FieldSet) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(name) => match fields.lookup(name) {
                    None | Some(Value::Null) => {}
                    Some(Value::String(s)) => out.push_str(s),
                    Some(Value::Number(n)) => out.push_str(&n.to_string()),
                    Some(Value::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
                    Some(Value::Array(_) | Value::Object(_)) => {
                        return Err(TemplateError::Render(format!(
                            "placeholder '{}' refers to a non-scalar value",
                            name
                        )));
                    }
                },
            }
        }
        Ok(out)
    }
}

/// Render failure scoped to one label
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "Error rendering label {} (ID {}): {source}",
    .context.label_number(),
    .context.display_id()
)]
pub struct ItemRenderError {
    pub context: ItemContext,
    pub source: TemplateError,
}

/// Compile-once, render-per-item front of a [`TemplateEngine`]
#[derive(Clone)]
pub struct TemplateRenderer {
    engine: Arc<dyn TemplateEngine>,
}

impl TemplateRenderer {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    pub fn compile(&self, body: &str) -> Result<Box<dyn CompiledTemplate>, TemplateError> {
        self.engine.compile(body)
    }

    /// Render one label, attaching the item context to any failure
    pub fn render_item(
        &self,
        template: &dyn CompiledTemplate,
        fields: &FieldSet,
        context: &ItemContext,
    ) -> Result<String, ItemRenderError> {
        template.render(fields).map_err(|source| ItemRenderError {
            context: context.clone(),
            source,
        })
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderEngine))
    }
}

//! Template rendering
//!
//! HTML pages are rendered with Tera. The templates shipped in
//! `templates/` are embedded into the binary; a directory configured as
//! `templates.dir` may replace any of them by using the same relative name.

use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::RenderError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Engine over the embedded templates only.
    pub fn embedded() -> Result<Self, RenderError> {
        Self::new(None)
    }

    /// Embedded templates, with files under `override_dir` taking precedence.
    pub fn new(override_dir: Option<&Path>) -> Result<Self, RenderError> {
        let mut templates = embedded_templates()?;

        if let Some(dir) = override_dir {
            if dir.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(dir, dir, &mut overrides)?;
                tracing::info!(dir = ?dir, count = overrides.len(), "Loaded template overrides");
                templates.extend(overrides);
            } else {
                tracing::warn!(dir = ?dir, "Template directory not found, using embedded templates");
            }
        }

        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);
        tera.set_escape_fn(escape_html);
        tera.add_raw_templates(templates)
            .map_err(|e| RenderError::TemplateError(error_chain(&e)))?;

        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, RenderError> {
        if !self.has_template(template) {
            return Err(RenderError::NotFound(template.to_string()));
        }
        self.tera.render(template, context).map_err(|e| {
            RenderError::TemplateError(format!("Failed to render '{}': {}", template, error_chain(&e)))
        })
    }
}

fn embedded_templates() -> Result<BTreeMap<String, String>, RenderError> {
    let mut templates = BTreeMap::new();
    for name in EmbeddedTemplates::iter() {
        let Some(file) = EmbeddedTemplates::get(&name) else {
            continue;
        };
        let content = String::from_utf8(file.data.into_owned()).map_err(|e| {
            RenderError::TemplateError(format!("Template {} is not UTF-8: {}", name, e))
        })?;
        templates.insert(name.to_string(), content);
    }
    Ok(templates)
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), RenderError> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative = path.strip_prefix(base_path).map_err(|_| {
                RenderError::TemplateError(format!("Template outside {:?}: {:?}", base_path, path))
            })?;
            let name = relative.to_string_lossy().replace('\\', "/");
            templates.push((name, fs::read_to_string(&path)?));
        }
    }
    Ok(())
}

/// HTML-escape `& < > " '`. Slashes stay readable so URLs survive as-is.
fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len() + input.len() / 8);
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

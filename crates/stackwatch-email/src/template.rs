//! Email template rendering with Handlebars
//!
//! Templates are compiled into the binary. Each template has a plain text and
//! an HTML variant with YAML frontmatter for metadata (subject, layout). The
//! subject is itself a Handlebars template rendered with the same variables.

use handlebars::Handlebars;
use serde::Deserialize;
use std::collections::HashMap;

use crate::prelude::*;

/// Metadata extracted from template frontmatter
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TemplateMetadata {
	#[serde(default)]
	pub layout: Option<String>,
	#[serde(default)]
	pub subject: Option<String>,
}

/// Result of template rendering
#[derive(Debug)]
pub struct RenderResult {
	pub subject: String,
	pub text_body: String,
	pub html_body: String,
}

// (name, text variant, html variant)
const TEMPLATES: [(&str, &str, &str); 3] = [
	(
		"watch_alert",
		include_str!("../templates/watch_alert.txt.hbs"),
		include_str!("../templates/watch_alert.html.hbs"),
	),
	(
		"watch_reminder",
		include_str!("../templates/watch_reminder.txt.hbs"),
		include_str!("../templates/watch_reminder.html.hbs"),
	),
	(
		"broadcast",
		include_str!("../templates/broadcast.txt.hbs"),
		include_str!("../templates/broadcast.html.hbs"),
	),
];

const LAYOUTS: [(&str, &str); 1] =
	[("default", include_str!("../templates/layouts/default.html.hbs"))];

/// Splits `---` delimited YAML frontmatter from the template body
fn parse_frontmatter(content: &str) -> (TemplateMetadata, &str) {
	let content = content.trim_start();
	let Some(after_first) = content.strip_prefix("---") else {
		return (TemplateMetadata::default(), content);
	};

	if let Some(end_pos) = after_first.find("\n---") {
		let yaml_content = &after_first[..end_pos];
		let template_content = &after_first[end_pos + 4..];
		match serde_yaml::from_str(yaml_content) {
			Ok(metadata) => (metadata, template_content.trim_start_matches('\n')),
			Err(e) => {
				warn!("Failed to parse frontmatter YAML: {}", e);
				(TemplateMetadata::default(), content)
			}
		}
	} else {
		(TemplateMetadata::default(), content)
	}
}

fn template_error(name: &str, err: impl std::fmt::Display) -> Error {
	Error::ConfigError(format!("email template '{}': {}", name, err))
}

pub struct TemplateEngine {
	text: Handlebars<'static>,
	html: Handlebars<'static>,
	metadata: HashMap<&'static str, (TemplateMetadata, TemplateMetadata)>,
}

impl std::fmt::Debug for TemplateEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TemplateEngine")
			.field("templates", &self.metadata.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl TemplateEngine {
	pub fn new() -> ClResult<Self> {
		let mut text = Handlebars::new();
		text.register_escape_fn(handlebars::no_escape);
		let mut html = Handlebars::new();
		let mut metadata = HashMap::new();

		for (name, text_src, html_src) in TEMPLATES {
			let (text_meta, text_body) = parse_frontmatter(text_src);
			let (html_meta, html_body) = parse_frontmatter(html_src);
			text.register_template_string(name, text_body).map_err(|e| template_error(name, e))?;
			html.register_template_string(name, html_body).map_err(|e| template_error(name, e))?;
			metadata.insert(name, (text_meta, html_meta));
		}
		for (name, src) in LAYOUTS {
			html.register_template_string(&format!("layouts/{}", name), src)
				.map_err(|e| template_error(name, e))?;
		}

		Ok(Self { text, html, metadata })
	}

	/// Renders both variants of a template and its subject
	pub fn render(&self, name: &str, vars: &serde_json::Value) -> ClResult<RenderResult> {
		let (text_meta, html_meta) =
			self.metadata.get(name).ok_or_else(|| template_error(name, "not found"))?;

		let subject_template = text_meta
			.subject
			.as_deref()
			.or(html_meta.subject.as_deref())
			.ok_or_else(|| template_error(name, "no subject in frontmatter"))?;
		let subject = self
			.text
			.render_template(subject_template, vars)
			.map_err(|e| template_error(name, e))?;

		let text_body = self.text.render(name, vars).map_err(|e| template_error(name, e))?;
		let mut html_body = self.html.render(name, vars).map_err(|e| template_error(name, e))?;

		if let Some(layout) = html_meta.layout.as_deref() {
			let mut layout_vars = vars.clone();
			if let serde_json::Value::Object(ref mut map) = layout_vars {
				map.insert("body".into(), serde_json::Value::String(html_body));
				map.insert("title".into(), serde_json::Value::String(subject.clone()));
			}
			html_body = self
				.html
				.render(&format!("layouts/{}", layout), &layout_vars)
				.map_err(|e| template_error(name, e))?;
		}

		Ok(RenderResult { subject: subject.trim().to_string(), text_body, html_body })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_frontmatter() {
		let (meta, body) = parse_frontmatter("---\nlayout: default\nsubject: Hi\n---\nBody");
		assert_eq!(meta.layout.as_deref(), Some("default"));
		assert_eq!(meta.subject.as_deref(), Some("Hi"));
		assert_eq!(body, "Body");

		let (meta, body) = parse_frontmatter("No frontmatter");
		assert!(meta.subject.is_none());
		assert_eq!(body, "No frontmatter");
	}

	#[test]
	fn test_render_watch_alert() {
		let engine = TemplateEngine::new().unwrap();
		let res = engine
			.render(
				"watch_alert",
				&serde_json::json!({
					"url": "https://example.com/?a=1&b=2",
					"changedAt": "2026-01-01T00:00:00Z",
					"baseUrl": "https://stackwatch.dev",
				}),
			)
			.unwrap();
		assert_eq!(res.subject, "Change detected on https://example.com/?a=1&b=2");
		assert!(res.text_body.contains("https://example.com/?a=1&b=2"));
		assert!(res.html_body.contains("&amp;b"));
		assert!(res.html_body.contains("<!DOCTYPE html>"));
	}

	#[test]
	fn test_render_reminder_lists_watches() {
		let engine = TemplateEngine::new().unwrap();
		let res = engine
			.render(
				"watch_reminder",
				&serde_json::json!({
					"count": 2,
					"baseUrl": "https://stackwatch.dev",
					"watches": [
						{ "url": "https://a.example.com", "lastChangedAt": null },
						{ "url": "https://b.example.com", "lastChangedAt": "2026-01-01T00:00:00Z" },
					],
				}),
			)
			.unwrap();
		assert!(res.text_body.contains("https://a.example.com"));
		assert!(res.text_body.contains("last change 2026-01-01T00:00:00Z"));
		assert_eq!(res.subject, "Your Stackwatch watches");
	}

	#[test]
	fn test_unknown_template() {
		let engine = TemplateEngine::new().unwrap();
		assert!(engine.render("nope", &serde_json::json!({})).is_err());
	}
}

// vim: ts=4

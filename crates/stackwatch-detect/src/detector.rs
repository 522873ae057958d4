//! Signature matching over a fetched page

use axum::http::HeaderMap;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::prelude::*;
use crate::signature::{Rule, SIGNATURES, Signature};

const MAX_EVIDENCE_LEN: usize = 80;

/// One detected company with the evidence that matched
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
	pub id: &'static str,
	pub name: &'static str,
	pub evidence: Vec<String>,
}

#[derive(Debug)]
enum CompiledRule {
	Header(&'static str, Option<Regex>),
	Generator(Regex),
	Html(Regex),
}

#[derive(Debug)]
struct CompiledSignature {
	signature: &'static Signature,
	rules: Vec<CompiledRule>,
}

/// Compiled signature set, registered as an app extension
#[derive(Debug)]
pub struct Detector {
	signatures: Vec<CompiledSignature>,
	meta_tag: Regex,
	meta_name_generator: Regex,
	meta_content: Regex,
}

fn compile(pattern: &str) -> ClResult<Regex> {
	RegexBuilder::new(pattern)
		.case_insensitive(true)
		.build()
		.map_err(|err| Error::ConfigError(format!("invalid signature pattern {}: {}", pattern, err)))
}

fn clip(s: &str) -> String {
	match s.char_indices().nth(MAX_EVIDENCE_LEN) {
		Some((idx, _)) => format!("{}...", &s[..idx]),
		None => s.to_string(),
	}
}

impl Detector {
	pub fn new() -> ClResult<Self> {
		let mut signatures = Vec::with_capacity(SIGNATURES.len());
		for signature in SIGNATURES {
			let mut rules = Vec::with_capacity(signature.rules.len());
			for rule in signature.rules {
				rules.push(match *rule {
					Rule::Header(name, pattern) => {
						CompiledRule::Header(name, pattern.map(compile).transpose()?)
					}
					Rule::Generator(pattern) => CompiledRule::Generator(compile(pattern)?),
					Rule::Html(pattern) => CompiledRule::Html(compile(pattern)?),
				});
			}
			signatures.push(CompiledSignature { signature, rules });
		}

		Ok(Self {
			signatures,
			meta_tag: compile(r"<meta\b[^>]*>")?,
			meta_name_generator: compile(r#"\bname\s*=\s*["']?generator\b"#)?,
			meta_content: compile(r#"\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
		})
	}

	/// Contents of every `<meta name="generator">` tag
	pub fn generators(&self, html: &str) -> Vec<String> {
		self.meta_tag
			.find_iter(html)
			.map(|m| m.as_str())
			.filter(|tag| self.meta_name_generator.is_match(tag))
			.filter_map(|tag| {
				let caps = self.meta_content.captures(tag)?;
				caps.get(1).or_else(|| caps.get(2)).map(|c| c.as_str().trim().to_string())
			})
			.filter(|g| !g.is_empty())
			.collect()
	}

	/// Matches every signature against the response headers and body
	pub fn detect(&self, headers: &HeaderMap, html: &str) -> Vec<Detection> {
		let generators = self.generators(html);
		let mut detections = Vec::new();

		for compiled in &self.signatures {
			let mut evidence = Vec::new();
			for rule in &compiled.rules {
				match rule {
					CompiledRule::Header(name, pattern) => {
						for value in headers.get_all(*name) {
							let value = String::from_utf8_lossy(value.as_bytes());
							if pattern.as_ref().is_none_or(|p| p.is_match(&value)) {
								evidence.push(format!("header {}: {}", name, clip(&value)));
								break;
							}
						}
					}
					CompiledRule::Generator(pattern) => {
						if let Some(g) = generators.iter().find(|g| pattern.is_match(g)) {
							evidence.push(format!("generator: {}", clip(g)));
						}
					}
					CompiledRule::Html(pattern) => {
						if let Some(m) = pattern.find(html) {
							evidence.push(format!("html: {}", clip(m.as_str())));
						}
					}
				}
			}
			if !evidence.is_empty() {
				detections.push(Detection {
					id: compiled.signature.id,
					name: compiled.signature.name,
					evidence,
				});
			}
		}

		detections
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ids(detections: &[Detection]) -> Vec<&'static str> {
		detections.iter().map(|d| d.id).collect()
	}

	#[test]
	fn test_all_patterns_compile() {
		let detector = Detector::new().unwrap();
		assert_eq!(detector.signatures.len(), SIGNATURES.len());
	}

	#[test]
	fn test_generator_extraction() {
		let detector = Detector::new().unwrap();
		let html = r#"<html><head>
			<meta charset="utf-8">
			<META content='WordPress 6.4.2' NAME="generator">
			<meta name="generator" content="Elementor 3.18.0; features: e_dom_optimization">
			<meta name="description" content="not this">
		</head></html>"#;
		assert_eq!(
			detector.generators(html),
			vec!["WordPress 6.4.2", "Elementor 3.18.0; features: e_dom_optimization"]
		);
	}

	#[test]
	fn test_detect_wordpress_and_elementor() {
		let detector = Detector::new().unwrap();
		let html = r#"<meta name="generator" content="WordPress 6.4.2">
			<link rel="stylesheet" href="/wp-content/plugins/elementor/assets/css/frontend.min.css">
			<div data-elementor-type="wp-page"></div>"#;
		let found = detector.detect(&HeaderMap::new(), html);
		assert_eq!(ids(&found), vec!["wordpress", "elementor"]);
		assert!(found[0].evidence.contains(&"generator: WordPress 6.4.2".to_string()));
	}

	#[test]
	fn test_detect_by_header() {
		let detector = Detector::new().unwrap();
		let mut headers = HeaderMap::new();
		headers.insert("server", "Pepyaka/1.19.10".parse().unwrap());
		headers.insert("x-wix-request-id", "1700000000.123".parse().unwrap());
		let found = detector.detect(&headers, "<html></html>");
		assert_eq!(ids(&found), vec!["wix"]);
		assert_eq!(found[0].evidence.len(), 2);
	}

	#[test]
	fn test_detect_webflow_markers() {
		let detector = Detector::new().unwrap();
		let html = r#"<html data-wf-page="abc" data-wf-site="def">
			<script src="https://assets.website-files.com/js/webflow.js"></script>"#;
		assert_eq!(ids(&detector.detect(&HeaderMap::new(), html)), vec!["webflow"]);
	}

	#[test]
	fn test_detect_nothing() {
		let detector = Detector::new().unwrap();
		let html = "<html><body><h1>Hand written</h1></body></html>";
		assert!(detector.detect(&HeaderMap::new(), html).is_empty());
	}

	#[test]
	fn test_clip() {
		let long = "x".repeat(200);
		assert_eq!(clip(&long).len(), MAX_EVIDENCE_LEN + 3);
		assert_eq!(clip("short"), "short");
	}
}

// vim: ts=4

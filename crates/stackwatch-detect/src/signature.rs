//! Page-builder signatures
//!
//! Patterns are case-insensitive regular expressions. A signature matches when
//! any of its rules does.

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub enum Rule {
	/// Response header, by name. `None` matches on presence alone.
	Header(&'static str, Option<&'static str>),
	/// Content of `<meta name="generator">`
	Generator(&'static str),
	/// Anywhere in the HTML body
	Html(&'static str),
}

#[derive(Debug)]
pub struct Signature {
	pub id: &'static str,
	pub name: &'static str,
	pub rules: &'static [Rule],
}

/// Public description of a supported signature
#[derive(Debug, Clone, Serialize)]
pub struct CompanyInfo {
	pub id: &'static str,
	pub name: &'static str,
}

pub static SIGNATURES: &[Signature] = &[
	Signature {
		id: "webflow",
		name: "Webflow",
		rules: &[
			Rule::Generator(r"^webflow"),
			Rule::Html(r"data-wf-(?:page|site)="),
			Rule::Html(r"assets(?:-global)?\.website-files\.com"),
		],
	},
	Signature {
		id: "wix",
		name: "Wix",
		rules: &[
			Rule::Header("x-wix-request-id", None),
			Rule::Header("server", Some(r"^pepyaka")),
			Rule::Generator(r"wix\.com"),
			Rule::Html(r"static\.(?:wixstatic|parastorage)\.com"),
		],
	},
	Signature {
		id: "squarespace",
		name: "Squarespace",
		rules: &[
			Rule::Header("server", Some(r"^squarespace")),
			Rule::Generator(r"squarespace"),
			Rule::Html(r"static1\.squarespace\.com"),
			Rule::Html(r"squarespace_context"),
		],
	},
	Signature {
		id: "framer",
		name: "Framer",
		rules: &[
			Rule::Header("server", Some(r"^framer")),
			Rule::Generator(r"^framer"),
			Rule::Html(r"framerusercontent\.com"),
			Rule::Html(r"data-framer-(?:name|component-type)"),
		],
	},
	Signature {
		id: "shopify",
		name: "Shopify",
		rules: &[
			Rule::Header("x-shopid", None),
			Rule::Header("x-shopify-stage", None),
			Rule::Header("powered-by", Some(r"shopify")),
			Rule::Html(r"cdn\.shopify\.com"),
			Rule::Html(r"shopify\.theme"),
		],
	},
	Signature {
		id: "wordpress",
		name: "WordPress",
		rules: &[
			Rule::Header("link", Some(r"api\.w\.org")),
			Rule::Generator(r"^wordpress"),
			Rule::Html(r"/wp-(?:content|includes)/"),
		],
	},
	Signature {
		id: "elementor",
		name: "Elementor",
		rules: &[
			Rule::Generator(r"elementor"),
			Rule::Html(r"/plugins/elementor/"),
			Rule::Html(r#"data-elementor-type="#),
			Rule::Html(r"elementor-kit-\d+"),
		],
	},
	Signature {
		id: "bubble",
		name: "Bubble",
		rules: &[
			Rule::Header("x-bubble-perf", None),
			Rule::Html(r"cdn\.bubble\.io"),
			Rule::Html(r"bubble_page_name"),
			Rule::Html(r"_bubble_page_load_data"),
		],
	},
	Signature {
		id: "carrd",
		name: "Carrd",
		rules: &[
			Rule::Generator(r"^carrd"),
			Rule::Html(r"carrd\.co/"),
			Rule::Html(r"<!-- built with carrd"),
		],
	},
	Signature {
		id: "duda",
		name: "Duda",
		rules: &[
			Rule::Html(r"irp(?:-cdn)?\.multiscreensite\.com"),
			Rule::Html(r"irp\.cdn-website\.com"),
			Rule::Html(r"dudamobile\.com"),
		],
	},
	Signature {
		id: "weebly",
		name: "Weebly",
		rules: &[
			Rule::Header("x-host", Some(r"weebly\.net")),
			Rule::Generator(r"weebly"),
			Rule::Html(r"editmysite\.com"),
			Rule::Html(r"_W\.configDomain"),
		],
	},
	Signature {
		id: "hubspot_cms",
		name: "HubSpot CMS",
		rules: &[
			Rule::Header("x-hs-hub-id", None),
			Rule::Header("x-hs-cache-config", None),
			Rule::Generator(r"hubspot"),
			Rule::Html(r"/hs/hsstatic/"),
			Rule::Html(r"js\.hs-scripts\.com"),
		],
	},
];

/// Supported signatures, in detection order
pub fn companies() -> Vec<CompanyInfo> {
	SIGNATURES.iter().map(|s| CompanyInfo { id: s.id, name: s.name }).collect()
}

// vim: ts=4

//! Fragment tag parsing.
//!
//! Fragments are declared in template source with a block tag:
//!
//! ```text
//! {% htmxfragment "board" %} … {% endhtmxfragment %}
//! {% htmxfragment "activity" lazy %} … {% endhtmxfragment %}
//! ```
//!
//! The tag is handled as a preprocessing pass over the template source
//! before it is handed to Tera, the same way includes are expanded ahead
//! of engine parsing. A full-page render wraps each fragment body in a
//! container `<div>` carrying the fragment name and the swap attributes;
//! a fragment-targeted render emits only that container and its body.
//!
//! Fragment names must be static string literals so the set of fragments
//! is known when the source is parsed. That rules out declaring fragments
//! inside `{% for %}` loops by construction, and it makes a duplicated
//! name a definition-time error instead of a silent overwrite.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::headers::FRAGMENT_ATTR;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"\{%\s*(htmxfragment|endhtmxfragment)\b([^%]*?)%\}").expect("fragment tag regex")
});

static ARGS_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r#"^\s*(?:"([A-Za-z0-9_.:-]+)"|'([A-Za-z0-9_.:-]+)')(\s+lazy)?\s*$"#)
		.expect("fragment args regex")
});

/// A named fragment extracted from template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
	pub name: String,
	/// Lazy fragments render empty on the initial page and load themselves
	/// with a follow-up request.
	pub lazy: bool,
	/// Raw (unrendered) template source between the block tags
	pub body: String,
}

impl Fragment {
	/// Opening container tag emitted around the fragment body.
	pub fn container_open(&self) -> String {
		format!(
			r#"<div {FRAGMENT_ATTR}="{}" hx-swap="outerHTML" hx-target="this" hx-indicator="this">"#,
			self.name
		)
	}

	/// Empty container emitted for a lazy fragment on the initial render.
	///
	/// The `fhx:load` trigger fires once the browser script announces page
	/// load, so the client immediately fetches the fragment content.
	pub fn lazy_container(&self) -> String {
		format!(
			r#"<div {FRAGMENT_ATTR}="{}" hx-swap="outerHTML" hx-target="this" hx-indicator="this" hx-get="" hx-trigger="fhx:load from:body"></div>"#,
			self.name
		)
	}
}

/// The set of fragments defined by one template source.
///
/// Built anew every time a source is parsed and discarded with the render;
/// nothing is shared across requests.
#[derive(Debug, Default)]
pub struct FragmentSet {
	fragments: Vec<Fragment>,
}

impl FragmentSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a fragment, rejecting duplicate names.
	pub fn insert(&mut self, fragment: Fragment) -> Result<()> {
		if self.get(&fragment.name).is_some() {
			return Err(Error::DuplicateFragment {
				name: fragment.name,
			});
		}
		self.fragments.push(fragment);
		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<&Fragment> {
		self.fragments.iter().find(|fragment| fragment.name == name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.fragments.iter().map(|fragment| fragment.name.as_str())
	}

	pub fn len(&self) -> usize {
		self.fragments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fragments.is_empty()
	}
}

/// One chunk of a parsed template: literal source, or a fragment slot.
#[derive(Debug)]
enum Part {
	Text(String),
	Fragment(usize),
}

/// A template source split into literal parts and fragment definitions.
///
/// # Examples
///
/// ```
/// use forge_htmx::ParsedTemplate;
///
/// let source = r#"<h1>Board</h1>{% htmxfragment "board" %}<ul>…</ul>{% endhtmxfragment %}"#;
/// let parsed = ParsedTemplate::parse(source).unwrap();
///
/// assert!(parsed.fragments().get("board").is_some());
/// assert!(parsed.full_page_source().contains(r#"fhx-fragment="board""#));
/// assert!(parsed.fragment_source("missing").is_none());
/// ```
#[derive(Debug)]
pub struct ParsedTemplate {
	parts: Vec<Part>,
	fragments: FragmentSet,
}

impl ParsedTemplate {
	/// Splits template source into literal text and fragment definitions.
	///
	/// # Errors
	///
	/// Returns a definition-time error for duplicate fragment names,
	/// nested or unbalanced fragment tags, and non-static fragment names.
	pub fn parse(source: &str) -> Result<Self> {
		let mut parts = Vec::new();
		let mut fragments = FragmentSet::new();
		// (name, lazy, body start offset) of the currently open block
		let mut open: Option<(String, bool, usize)> = None;
		let mut cursor = 0;

		for caps in TAG_RE.captures_iter(source) {
			let whole = caps.get(0).expect("regex match has a whole capture");
			let args = caps.get(2).map(|m| m.as_str()).unwrap_or("");

			match &caps[1] {
				"htmxfragment" => {
					if let Some((name, _, _)) = &open {
						return Err(Error::TemplateSyntax(format!(
							"htmxfragment \"{}\" cannot contain another htmxfragment",
							name
						)));
					}
					let (name, lazy) = parse_args(args)?;
					if cursor < whole.start() {
						parts.push(Part::Text(source[cursor..whole.start()].to_string()));
					}
					open = Some((name, lazy, whole.end()));
				}
				"endhtmxfragment" => {
					let Some((name, lazy, body_start)) = open.take() else {
						return Err(Error::TemplateSyntax(
							"endhtmxfragment without a matching htmxfragment".to_string(),
						));
					};
					if !args.trim().is_empty() {
						return Err(Error::TemplateSyntax(
							"endhtmxfragment takes no arguments".to_string(),
						));
					}
					let body = source[body_start..whole.start()].to_string();
					fragments.insert(Fragment { name, lazy, body })?;
					parts.push(Part::Fragment(fragments.len() - 1));
				}
				_ => unreachable!("regex only matches the two fragment tags"),
			}
			cursor = whole.end();
		}

		if let Some((name, _, _)) = open {
			return Err(Error::TemplateSyntax(format!(
				"htmxfragment \"{}\" is never closed",
				name
			)));
		}
		if cursor < source.len() {
			parts.push(Part::Text(source[cursor..].to_string()));
		}

		Ok(Self { parts, fragments })
	}

	pub fn fragments(&self) -> &FragmentSet {
		&self.fragments
	}

	/// Emits the full-page template source.
	///
	/// Fragment bodies are kept inline inside their containers; lazy
	/// fragments emit only their empty self-loading container.
	pub fn full_page_source(&self) -> String {
		let mut out = String::new();
		for part in &self.parts {
			match part {
				Part::Text(text) => out.push_str(text),
				Part::Fragment(index) => {
					let fragment = &self.fragments.fragments[*index];
					if fragment.lazy {
						out.push_str(&fragment.lazy_container());
					} else {
						out.push_str(&fragment.container_open());
						out.push_str(&fragment.body);
						out.push_str("</div>");
					}
				}
			}
		}
		out
	}

	/// Emits the standalone source for one fragment, or `None` if the name
	/// is not defined in this template.
	///
	/// The container is included: the client swaps with `outerHTML`, so
	/// the re-rendered fragment must carry its own container to replace
	/// the old one. Laziness does not apply here: a fragment-targeted
	/// render is exactly the follow-up request lazy containers issue.
	pub fn fragment_source(&self, name: &str) -> Option<String> {
		let fragment = self.fragments.get(name)?;
		let mut out = fragment.container_open();
		out.push_str(&fragment.body);
		out.push_str("</div>");
		Some(out)
	}
}

fn parse_args(args: &str) -> Result<(String, bool)> {
	let Some(caps) = ARGS_RE.captures(args) else {
		return Err(Error::TemplateSyntax(format!(
			"htmxfragment requires a quoted static name, optionally followed by `lazy`, got `{}`",
			args.trim()
		)));
	};
	let name = caps
		.get(1)
		.or_else(|| caps.get(2))
		.expect("args regex matched one of the quoted alternatives")
		.as_str()
		.to_string();
	Ok((name, caps.get(3).is_some()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_plain_template_has_no_fragments() {
		let parsed = ParsedTemplate::parse("<p>{{ name }}</p>").unwrap();
		assert!(parsed.fragments().is_empty());
		assert_eq!(parsed.full_page_source(), "<p>{{ name }}</p>");
	}

	#[test]
	fn test_parse_single_fragment() {
		let source = r#"<body>{% htmxfragment "main" %}<p>hello</p>{% endhtmxfragment %}</body>"#;
		let parsed = ParsedTemplate::parse(source).unwrap();

		let fragment = parsed.fragments().get("main").unwrap();
		assert!(!fragment.lazy);
		assert_eq!(fragment.body, "<p>hello</p>");

		let page = parsed.full_page_source();
		assert_eq!(
			page,
			r#"<body><div fhx-fragment="main" hx-swap="outerHTML" hx-target="this" hx-indicator="this"><p>hello</p></div></body>"#
		);
	}

	#[test]
	fn test_parse_accepts_single_quotes_and_whitespace() {
		let source = "{%  htmxfragment  'side'  %}x{%  endhtmxfragment  %}";
		let parsed = ParsedTemplate::parse(source).unwrap();
		assert!(parsed.fragments().get("side").is_some());
	}

	#[test]
	fn test_lazy_fragment_omits_body_on_full_page() {
		let source = r#"{% htmxfragment "feed" lazy %}<p>{{ expensive }}</p>{% endhtmxfragment %}"#;
		let parsed = ParsedTemplate::parse(source).unwrap();

		let page = parsed.full_page_source();
		assert!(
			!page.contains("expensive"),
			"lazy body must not appear on the full page, got '{}'",
			page
		);
		assert!(page.contains(r#"hx-trigger="fhx:load from:body""#));
		assert!(page.contains(r#"hx-get="""#));

		// The follow-up request renders the body inside a normal container.
		let fragment = parsed.fragment_source("feed").unwrap();
		assert!(fragment.contains("{{ expensive }}"));
		assert!(!fragment.contains("fhx:load"));
	}

	#[test]
	fn test_duplicate_name_is_a_definition_error() {
		let source = r#"
			{% htmxfragment "main" %}a{% endhtmxfragment %}
			{% htmxfragment "main" %}b{% endhtmxfragment %}
		"#;
		let error = ParsedTemplate::parse(source).unwrap_err();
		assert!(
			matches!(error, Error::DuplicateFragment { ref name } if name == "main"),
			"expected DuplicateFragment, got {:?}",
			error
		);
	}

	#[test]
	fn test_unclosed_fragment_is_an_error() {
		let error = ParsedTemplate::parse(r#"{% htmxfragment "main" %}<p>"#).unwrap_err();
		assert!(matches!(error, Error::TemplateSyntax(_)));
	}

	#[test]
	fn test_stray_end_tag_is_an_error() {
		let error = ParsedTemplate::parse("{% endhtmxfragment %}").unwrap_err();
		assert!(matches!(error, Error::TemplateSyntax(_)));
	}

	#[test]
	fn test_nested_fragments_are_an_error() {
		let source = r#"{% htmxfragment "outer" %}{% htmxfragment "inner" %}x{% endhtmxfragment %}{% endhtmxfragment %}"#;
		let error = ParsedTemplate::parse(source).unwrap_err();
		assert!(matches!(error, Error::TemplateSyntax(_)));
	}

	#[test]
	fn test_dynamic_name_is_rejected() {
		let error = ParsedTemplate::parse(r#"{% htmxfragment item.name %}x{% endhtmxfragment %}"#)
			.unwrap_err();
		assert!(
			matches!(error, Error::TemplateSyntax(_)),
			"unquoted name expression must be rejected, got {:?}",
			error
		);
	}

	#[test]
	fn test_fragment_source_matches_full_page_subtree() {
		let source = r#"<header>h</header>{% htmxfragment "main" %}<p>{{ n }}</p>{% endhtmxfragment %}<footer>f</footer>"#;
		let parsed = ParsedTemplate::parse(source).unwrap();

		let page = parsed.full_page_source();
		let fragment = parsed.fragment_source("main").unwrap();
		assert!(
			page.contains(&fragment),
			"full page must contain the fragment source verbatim;\npage: {}\nfragment: {}",
			page,
			fragment
		);
	}

	#[test]
	fn test_other_tera_tags_pass_through_untouched() {
		let source = "{% if shown %}{% htmxfragment \"x\" %}{{ v }}{% endhtmxfragment %}{% endif %}";
		let parsed = ParsedTemplate::parse(source).unwrap();
		let page = parsed.full_page_source();
		assert!(page.starts_with("{% if shown %}"));
		assert!(page.ends_with("{% endif %}"));
	}
}

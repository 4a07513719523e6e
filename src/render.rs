//! Fragment-aware template rendering.
//!
//! [`Templates`] owns template sources (registered in memory or loaded
//! from a base directory), preprocesses the fragment tags out of them and
//! hands the result to Tera. The active request's [`HtmxDetails`] decides
//! what comes back:
//!
//! - a plain request renders the full page, fragment bodies inline in
//!   their containers (lazy bodies omitted);
//! - a request carrying `FHX-Fragment` renders only that fragment's
//!   container and body;
//! - a request carrying `HX-Request: true` first probes for a dedicated
//!   `name_htmx.ext` template and falls back to `name.ext`.
//!
//! [`RenderContext`] is threaded through explicitly; there is no ambient
//! per-render registry. It is built per request and consumed by the render.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tera::Tera;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fragment::ParsedTemplate;
use crate::headers::HtmxDetails;
use crate::script::HtmxJsFunction;

/// Marker inserted before the file extension when probing for a template
/// dedicated to partial-update responses (`page.html` → `page_htmx.html`).
pub const DEDICATED_TEMPLATE_SUFFIX: &str = "_htmx";

static EXT_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^(?P<stem>.+)\.(?P<ext>[^./\\]+)$").expect("extension regex"));

static REF_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r#"\{%\s*(?:extends|include)\s+"([^"]+)""#).expect("template reference regex")
});

/// A context value whose computation is deferred until a fragment render
/// actually needs it.
///
/// This is the explicit replacement for "pass a callable and hope the
/// template only calls it when needed": deferred values are tagged as such
/// and are only resolved on fragment-targeted renders. The initial
/// full-page render of a lazy fragment never invokes them.
pub struct Deferred(Box<dyn FnOnce() -> serde_json::Result<serde_json::Value> + Send>);

impl Deferred {
	/// Wraps a computation producing any serializable value.
	///
	/// # Examples
	///
	/// ```
	/// use forge_htmx::Deferred;
	///
	/// let deferred = Deferred::new(|| vec!["a", "b"]);
	/// ```
	pub fn new<T, F>(f: F) -> Self
	where
		T: Serialize,
		F: FnOnce() -> T + Send + 'static,
	{
		Self(Box::new(move || serde_json::to_value(f())))
	}

	fn resolve(self) -> serde_json::Result<serde_json::Value> {
		(self.0)()
	}
}

impl fmt::Debug for Deferred {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Deferred").finish_non_exhaustive()
	}
}

/// Request-scoped render context: eager values plus deferred computations.
///
/// # Examples
///
/// ```
/// use forge_htmx::{Deferred, RenderContext};
///
/// let mut context = RenderContext::new();
/// context.insert("title", "Inbox");
/// context.insert_deferred("messages", Deferred::new(|| vec!["hi"]));
/// ```
#[derive(Debug, Default)]
pub struct RenderContext {
	values: tera::Context,
	deferred: Vec<(String, Deferred)>,
}

impl RenderContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts an eagerly evaluated value.
	pub fn insert<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) {
		self.values.insert(key.into(), value);
	}

	/// Inserts a deferred value, resolved only on fragment-targeted renders.
	pub fn insert_deferred(&mut self, key: impl Into<String>, deferred: Deferred) {
		self.deferred.push((key.into(), deferred));
	}

	/// Context for a full-page render: eager values only. Deferred values
	/// stay unresolved, which is what keeps lazy fragments cheap.
	fn eager(&self) -> tera::Context {
		self.values.clone()
	}

	/// Context for a fragment render: eager values plus every deferred
	/// value, each closure invoked exactly once.
	fn resolved(self) -> Result<tera::Context> {
		let mut context = self.values;
		for (key, deferred) in self.deferred {
			let value = deferred
				.resolve()
				.map_err(|e| Error::Internal(format!("deferred value \"{}\": {}", key, e)))?;
			context.insert(key, &value);
		}
		Ok(context)
	}
}

/// Template store and fragment-aware renderer.
///
/// Templates can be registered as raw sources (the usual move in tests)
/// or loaded by name from a base directory, with the same traversal
/// checks a filesystem template loader needs.
///
/// # Examples
///
/// ```
/// use forge_htmx::{HtmxDetails, RenderContext, Templates};
///
/// let mut templates = Templates::new();
/// templates
///     .add_raw_template(
///         "hello.html",
///         r#"<body>{% htmxfragment "greeting" %}Hello {{ name }}!{% endhtmxfragment %}</body>"#,
///     )
///     .unwrap();
///
/// let mut context = RenderContext::new();
/// context.insert("name", "World");
///
/// let page = templates
///     .render("hello.html", context, &HtmxDetails::default())
///     .unwrap();
/// assert!(page.contains("Hello World!"));
/// assert!(page.contains(r#"fhx-fragment="greeting""#));
/// ```
#[derive(Debug, Default)]
pub struct Templates {
	base_dir: Option<PathBuf>,
	raw: HashMap<String, String>,
}

impl Templates {
	/// Creates an empty store holding only registered raw templates.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store that also loads templates from `base_dir` by name.
	pub fn with_base_dir(base_dir: &Path) -> Self {
		Self {
			base_dir: Some(base_dir.to_path_buf()),
			raw: HashMap::new(),
		}
	}

	/// Registers a template source under a name.
	///
	/// The source is parsed immediately so fragment definition errors
	/// (duplicate names, unbalanced tags) surface here, not mid-request.
	pub fn add_raw_template(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<()> {
		let source = source.into();
		ParsedTemplate::parse(&source)?;
		self.raw.insert(name.into(), source);
		Ok(())
	}

	/// Picks the template to render for this request.
	///
	/// Partial-update requests probe for the dedicated `_htmx` variant and
	/// use it only if it exists; everything else gets the original name.
	pub fn resolve_template_name(&self, name: &str, details: &HtmxDetails) -> String {
		if details.is_htmx_request
			&& let Some(candidate) = dedicated_name(name)
			&& self.exists(&candidate)
		{
			debug!(template = %name, dedicated = %candidate, "using dedicated htmx template");
			return candidate;
		}
		name.to_string()
	}

	/// Renders a template for the given request details.
	///
	/// The context is consumed: it is request-scoped, and fragment renders
	/// resolve its deferred values exactly once.
	pub fn render(
		&self,
		name: &str,
		context: RenderContext,
		details: &HtmxDetails,
	) -> Result<String> {
		let resolved = self.resolve_template_name(name, details);
		let source = self.load(&resolved)?;
		let (mut tera, parsed) = self.build_engine(&resolved, &source)?;

		if let Some(fragment_name) = details.fragment_name.as_deref() {
			let Some(fragment_source) = parsed.fragment_source(fragment_name) else {
				return Err(Error::FragmentNotFound {
					name: fragment_name.to_string(),
					template: resolved,
				});
			};
			debug!(template = %resolved, fragment = %fragment_name, "rendering fragment");
			// Suffix keeps the resolved name so autoescaping decisions match.
			let synthetic = format!("__fragment__{}", resolved);
			tera.add_raw_template(&synthetic, &fragment_source)?;
			let context = context.resolved()?;
			Ok(tera.render(&synthetic, &context)?)
		} else {
			debug!(template = %resolved, "rendering full page");
			Ok(tera.render(&resolved, &context.eager())?)
		}
	}

	/// Builds a Tera instance holding the preprocessed target template,
	/// every registered raw template, and any filesystem templates the
	/// target references through `{% extends %}` / `{% include %}`.
	fn build_engine(&self, root_name: &str, root_source: &str) -> Result<(Tera, ParsedTemplate)> {
		let root = ParsedTemplate::parse(root_source)?;
		let mut sources: Vec<(String, String)> = Vec::new();
		let mut seen: HashSet<String> = HashSet::new();

		for (name, source) in &self.raw {
			let parsed = ParsedTemplate::parse(source)?;
			sources.push((name.clone(), parsed.full_page_source()));
			seen.insert(name.clone());
		}
		if seen.insert(root_name.to_string()) {
			sources.push((root_name.to_string(), root.full_page_source()));
		}

		let mut pending = referenced_names(root_source);
		while let Some(name) = pending.pop() {
			if !seen.insert(name.clone()) {
				continue;
			}
			let source = self.load(&name)?;
			let parsed = ParsedTemplate::parse(&source)?;
			pending.extend(referenced_names(&source));
			sources.push((name, parsed.full_page_source()));
		}

		let mut tera = Tera::default();
		tera.register_function("htmx_js", HtmxJsFunction);
		tera.add_raw_templates(sources)?;
		Ok((tera, root))
	}

	fn exists(&self, name: &str) -> bool {
		if self.raw.contains_key(name) {
			return true;
		}
		self.fs_path(name).map(|path| path.is_file()).unwrap_or(false)
	}

	fn load(&self, name: &str) -> Result<String> {
		if let Some(source) = self.raw.get(name) {
			return Ok(source.clone());
		}
		let path = self
			.fs_path(name)
			.ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;
		if !path.is_file() {
			return Err(Error::TemplateNotFound(name.to_string()));
		}
		fs::read_to_string(&path)
			.map_err(|e| Error::TemplateNotFound(format!("cannot read {}: {}", name, e)))
	}

	/// Resolves a template name below the base directory, rejecting
	/// absolute paths and parent-directory traversal.
	fn fs_path(&self, name: &str) -> Option<PathBuf> {
		let base_dir = self.base_dir.as_ref()?;
		let relative = name.trim_start_matches('/');
		for component in Path::new(relative).components() {
			match component {
				Component::Normal(_) | Component::CurDir => {}
				_ => return None,
			}
		}
		Some(base_dir.join(relative))
	}
}

fn dedicated_name(name: &str) -> Option<String> {
	EXT_RE.captures(name).map(|caps| {
		format!(
			"{}{}.{}",
			&caps["stem"], DEDICATED_TEMPLATE_SUFFIX, &caps["ext"]
		)
	})
}

fn referenced_names(source: &str) -> Vec<String> {
	REF_RE
		.captures_iter(source)
		.map(|caps| caps[1].to_string())
		.collect()
}

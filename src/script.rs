//! The browser-side half of the integration.
//!
//! The embedded script subscribes to the HTMX client lifecycle events:
//! before each request it walks up the DOM from the triggering element and
//! attaches the nearest `fhx-action` / `fhx-fragment` attribute values as
//! the `FHX-Action` / `FHX-Fragment` headers, plus the CSRF token header
//! on non-GET requests. Failed requests are reflected as `htmx-error-*`
//! CSS classes on the swap target, and one `fhx:load` event is dispatched
//! on page load so lazy fragment containers fire their first request.
//!
//! Templates pull the script in with the `htmx_js` function:
//!
//! ```text
//! {{ htmx_js(csrf_token=csrf_token) }}
//! ```

use std::collections::HashMap;

/// The browser script, embedded at compile time.
pub const FORGE_HTMX_JS: &str = include_str!("../static/forge-htmx.js");

/// Renders the inline script tag.
///
/// The CSRF token travels as a `data-csrf-token` attribute on the script
/// element itself; the script reads its configuration from its own tag.
///
/// # Examples
///
/// ```
/// use forge_htmx::script_tag;
///
/// let tag = script_tag(Some("token-123"));
/// assert!(tag.starts_with(r#"<script data-csrf-token="token-123">"#));
/// assert!(tag.ends_with("</script>"));
///
/// let tag = script_tag(None);
/// assert!(tag.starts_with("<script>"));
/// ```
pub fn script_tag(csrf_token: Option<&str>) -> String {
	match csrf_token {
		Some(token) => format!(
			"<script data-csrf-token=\"{}\">\n{}</script>",
			escape_attr(token),
			FORGE_HTMX_JS
		),
		None => format!("<script>\n{}</script>", FORGE_HTMX_JS),
	}
}

/// Minimal HTML attribute-value escaping for the token.
fn escape_attr(value: &str) -> String {
	value
		.replace('&', "&amp;")
		.replace('"', "&quot;")
		.replace('<', "&lt;")
}

/// Tera function exposing [`script_tag`] to templates as `htmx_js`.
pub struct HtmxJsFunction;

impl tera::Function for HtmxJsFunction {
	fn call(&self, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
		let token = args.get("csrf_token").and_then(|value| value.as_str());
		Ok(tera::Value::String(script_tag(token)))
	}

	fn is_safe(&self) -> bool {
		true
	}
}

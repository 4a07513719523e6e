//! Wire conventions shared between the browser script and the server side.
//!
//! The browser script attaches the fragment and action headers on every
//! HTMX request it configures; the view layer reads them back through
//! [`HtmxDetails`]. Nothing here is persisted; the descriptor is computed
//! per request and dropped with it.

use hyper::HeaderMap;

use crate::http::Request;

/// Header set by the HTMX client library on every request it issues.
pub const HX_REQUEST: &str = "HX-Request";

/// Header naming the fragment the client wants re-rendered.
pub const FHX_FRAGMENT: &str = "FHX-Fragment";

/// Header naming the action the client wants dispatched.
pub const FHX_ACTION: &str = "FHX-Action";

/// Response header instructing the HTMX client to navigate.
pub const HX_REDIRECT: &str = "HX-Redirect";

/// Header the browser script uses to send CSRF tokens on non-GET requests.
pub const CSRF_HEADER_NAME: &str = "X-CSRFToken";

/// Markup attribute carrying a fragment name, consumed by the browser script.
pub const FRAGMENT_ATTR: &str = "fhx-fragment";

/// Markup attribute carrying an action name, consumed by the browser script.
pub const ACTION_ATTR: &str = "fhx-action";

/// Per-request descriptor derived from the HTMX headers.
///
/// # Examples
///
/// ```
/// use forge_htmx::HtmxDetails;
/// use hyper::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("HX-Request", "true".parse().unwrap());
/// headers.insert("FHX-Fragment", "board".parse().unwrap());
///
/// let details = HtmxDetails::from_headers(&headers);
/// assert!(details.is_htmx_request);
/// assert_eq!(details.fragment_name.as_deref(), Some("board"));
/// assert_eq!(details.action_name, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmxDetails {
	/// True when the request came from the HTMX client (`HX-Request: true`)
	pub is_htmx_request: bool,
	/// Fragment the client wants re-rendered, if any
	pub fragment_name: Option<String>,
	/// Action the client wants dispatched, if any
	pub action_name: Option<String>,
}

impl HtmxDetails {
	/// Parses the descriptor out of the request headers.
	///
	/// Empty header values count as absent, matching what the browser
	/// script sends when no enclosing attribute is found.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		let is_htmx_request = headers
			.get(HX_REQUEST)
			.and_then(|value| value.to_str().ok())
			.map(|value| value == "true")
			.unwrap_or(false);

		Self {
			is_htmx_request,
			fragment_name: non_empty(headers, FHX_FRAGMENT),
			action_name: non_empty(headers, FHX_ACTION),
		}
	}
}

fn non_empty(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.filter(|value| !value.is_empty())
		.map(|value| value.to_string())
}

impl Request {
	/// Derives the HTMX descriptor for this request.
	pub fn htmx_details(&self) -> HtmxDetails {
		HtmxDetails::from_headers(&self.headers)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_plain_request_has_no_htmx_details() {
		let details = HtmxDetails::from_headers(&HeaderMap::new());
		assert!(!details.is_htmx_request);
		assert_eq!(details.fragment_name, None);
		assert_eq!(details.action_name, None);
	}

	#[test]
	fn test_hx_request_must_be_literal_true() {
		let mut headers = HeaderMap::new();
		headers.insert(HX_REQUEST, "1".parse().unwrap());
		assert!(!HtmxDetails::from_headers(&headers).is_htmx_request);

		let mut headers = HeaderMap::new();
		headers.insert(HX_REQUEST, "true".parse().unwrap());
		assert!(HtmxDetails::from_headers(&headers).is_htmx_request);
	}

	#[test]
	fn test_empty_header_values_count_as_absent() {
		let mut headers = HeaderMap::new();
		headers.insert(FHX_FRAGMENT, "".parse().unwrap());
		headers.insert(FHX_ACTION, "".parse().unwrap());

		let details = HtmxDetails::from_headers(&headers);
		assert_eq!(details.fragment_name, None);
		assert_eq!(details.action_name, None);
	}

	#[test]
	fn test_fragment_and_action_parsed() {
		let mut headers = HeaderMap::new();
		headers.insert(FHX_FRAGMENT, "main".parse().unwrap());
		headers.insert(FHX_ACTION, "create".parse().unwrap());

		let details = HtmxDetails::from_headers(&headers);
		assert_eq!(details.fragment_name.as_deref(), Some("main"));
		assert_eq!(details.action_name.as_deref(), Some("create"));
	}
}

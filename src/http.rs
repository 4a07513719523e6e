//! Thin HTTP request/response seam for the view layer.
//!
//! The integration does not ship a server; it plugs into whatever serves
//! requests. These types carry just enough of the request (method, uri,
//! headers, body) for header-driven dispatch and fragment rendering, and
//! just enough of the response to hand markup back.

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, StatusCode, Uri, Version};

use crate::error::{Error, Result};
use crate::headers::HX_REDIRECT;

/// HTTP request representation
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Request {
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
		Self {
			method,
			uri,
			version,
			headers,
			body,
		}
	}

	/// Creates a builder for assembling a request piece by piece.
	///
	/// # Examples
	///
	/// ```
	/// use forge_htmx::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::GET)
	///     .uri("/board")
	///     .header("HX-Request", "true")
	///     .build()
	///     .unwrap();
	/// assert_eq!(request.method, Method::GET);
	/// assert!(request.htmx_details().is_htmx_request);
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	pub fn path(&self) -> &str {
		self.uri.path()
	}
}

/// Builder for [`Request`]
#[derive(Debug, Default)]
pub struct RequestBuilder {
	method: Method,
	uri: String,
	headers: HeaderMap,
	body: Bytes,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = uri.into();
		self
	}

	/// Adds a header; silently skipped if the name or value is malformed.
	pub fn header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn build(self) -> Result<Request> {
		let uri = if self.uri.is_empty() { "/" } else { &self.uri };
		let uri = uri
			.parse::<Uri>()
			.map_err(|e| Error::Internal(format!("invalid uri {:?}: {}", self.uri, e)))?;
		Ok(Request::new(
			self.method,
			uri,
			Version::HTTP_11,
			self.headers,
			self.body,
		))
	}
}

/// HTTP response representation
#[derive(Debug)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	/// Create a new Response with the given status code
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	/// Create a Response with HTTP 200 OK status
	///
	/// # Examples
	///
	/// ```
	/// use forge_htmx::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::ok();
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// Create a Response with HTTP 404 Not Found status
	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// Create a Response with HTTP 405 Method Not Allowed status
	pub fn method_not_allowed() -> Self {
		Self::new(StatusCode::METHOD_NOT_ALLOWED)
	}

	/// Create a 200 response carrying HTML markup.
	///
	/// # Examples
	///
	/// ```
	/// use forge_htmx::Response;
	///
	/// let response = Response::html("<p>hi</p>");
	/// assert_eq!(
	///     response.headers.get("content-type").unwrap(),
	///     "text/html; charset=utf-8"
	/// );
	/// ```
	pub fn html(body: impl Into<Bytes>) -> Self {
		Self::ok()
			.with_body(body)
			.with_header("content-type", "text/html; charset=utf-8")
	}

	/// Create a response instructing the HTMX client to navigate elsewhere.
	///
	/// HTMX performs the redirect browser-side when it sees the
	/// `HX-Redirect` response header, so the status stays 200.
	///
	/// # Examples
	///
	/// ```
	/// use forge_htmx::Response;
	///
	/// let response = Response::hx_redirect("/inbox/");
	/// assert_eq!(response.headers.get("HX-Redirect").unwrap(), "/inbox/");
	/// ```
	pub fn hx_redirect(location: &str) -> Self {
		Self::ok().with_header(HX_REDIRECT, location)
	}

	/// Translate an [`Error`] into a plain-text response.
	pub fn from_error(error: &Error) -> Self {
		Self::new(error.status_code())
			.with_body(error.to_string())
			.with_header("content-type", "text/plain; charset=utf-8")
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Sets a header; silently skipped if the name or value is malformed.
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}
}

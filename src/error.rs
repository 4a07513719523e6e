//! Error types for fragment parsing, rendering and dispatch.

use hyper::StatusCode;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by template parsing, fragment rendering and view dispatch.
///
/// Handler-raised errors are never caught or translated by the dispatcher;
/// they propagate through `View::dispatch` unchanged so the serving layer
/// can turn them into responses (see [`Error::status_code`]).
#[derive(Debug, Error)]
pub enum Error {
	/// No template with the given name is registered or present on disk
	#[error("template not found: {0}")]
	TemplateNotFound(String),

	/// Malformed fragment tag, unbalanced block, or a non-static fragment name
	#[error("template syntax error: {0}")]
	TemplateSyntax(String),

	/// The same fragment name was defined twice in one template
	#[error("duplicate fragment \"{name}\" in template")]
	DuplicateFragment { name: String },

	/// A request asked for a fragment the rendered template does not define
	#[error("fragment \"{name}\" not found in template \"{template}\"")]
	FragmentNotFound { name: String, template: String },

	/// Tera failed to render the (preprocessed) template
	#[error("render error: {0}")]
	Render(#[from] tera::Error),

	/// The request method has no handler and no fallback accepts it
	#[error("method {0} not allowed")]
	MethodNotAllowed(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Maps the error to the HTTP status the serving layer should answer with.
	///
	/// # Examples
	///
	/// ```
	/// use forge_htmx::Error;
	/// use hyper::StatusCode;
	///
	/// let error = Error::TemplateNotFound("page.html".to_string());
	/// assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
	///
	/// let error = Error::MethodNotAllowed("PATCH".to_string());
	/// assert_eq!(error.status_code(), StatusCode::METHOD_NOT_ALLOWED);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::TemplateNotFound(_) | Error::FragmentNotFound { .. } => StatusCode::NOT_FOUND,
			Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
			Error::TemplateSyntax(_)
			| Error::DuplicateFragment { .. }
			| Error::Render(_)
			| Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_fragment_not_found_status() {
		let error = Error::FragmentNotFound {
			name: "main".to_string(),
			template: "page.html".to_string(),
		};
		assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
		assert!(
			error.to_string().contains("main"),
			"error message should name the missing fragment, got '{}'",
			error
		);
	}

	#[test]
	fn test_duplicate_fragment_status() {
		let error = Error::DuplicateFragment {
			name: "sidebar".to_string(),
		};
		assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn test_render_error_conversion() {
		let tera_error = tera::Error::msg("boom");
		let error: Error = tera_error.into();
		assert!(matches!(error, Error::Render(_)));
	}
}

//! Header-driven action dispatch at the view layer.
//!
//! [`HtmxView`] sits in front of a regular [`View`] and routes HTMX
//! requests by `(method, action)` before the wrapped view ever sees them.
//! Handlers are registered explicitly in a table built once per view
//! (there is no name probing), but the resolution order is the familiar
//! one:
//!
//! 1. action header present and `(method, action)` registered → that handler;
//! 2. `(method, no action)` registered → that handler;
//! 3. otherwise the wrapped fallback view's own `dispatch` runs.
//!
//! Non-HTMX requests skip the table entirely. The dispatcher mutates
//! nothing and catches nothing: handler errors propagate unchanged.

use async_trait::async_trait;
use futures::future::BoxFuture;
use hyper::Method;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::headers::HtmxDetails;
use crate::http::{Request, Response};
use crate::render::{RenderContext, Templates};

/// Base trait for views
#[async_trait]
pub trait View: Send + Sync {
	async fn dispatch(&self, request: Request) -> Result<Response>;

	/// Returns the list of HTTP methods allowed by this view
	fn allowed_methods(&self) -> Vec<Method> {
		vec![Method::GET, Method::HEAD, Method::OPTIONS]
	}
}

/// Boxed action handler stored in the dispatch table.
pub type ActionHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandlerKey {
	method: Method,
	action: Option<String>,
}

/// A view wrapper dispatching HTMX requests through an explicit
/// `(method, action)` table.
///
/// # Examples
///
/// ```
/// use forge_htmx::{DefaultDispatch, HtmxView, Response};
/// use hyper::Method;
///
/// let view = HtmxView::new(DefaultDispatch)
///     .on(Method::POST, "close", |_request| async { Ok(Response::ok()) })
///     .on_method(Method::GET, |_request| async { Ok(Response::ok()) });
/// # let _ = view;
/// ```
pub struct HtmxView<F> {
	handlers: HashMap<HandlerKey, ActionHandler>,
	fallback: F,
}

impl<F: View> HtmxView<F> {
	/// Wraps a fallback view; requests the table does not claim are
	/// forwarded to it untouched.
	pub fn new(fallback: F) -> Self {
		Self {
			handlers: HashMap::new(),
			fallback,
		}
	}

	/// Registers a handler for a method plus action name.
	pub fn on<H, Fut>(mut self, method: Method, action: &str, handler: H) -> Self
	where
		H: Fn(Request) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Response>> + Send + 'static,
	{
		self.register(method, Some(action.to_string()), handler);
		self
	}

	/// Registers a handler for a method regardless of action name.
	pub fn on_method<H, Fut>(mut self, method: Method, handler: H) -> Self
	where
		H: Fn(Request) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Response>> + Send + 'static,
	{
		self.register(method, None, handler);
		self
	}

	fn register<H, Fut>(&mut self, method: Method, action: Option<String>, handler: H)
	where
		H: Fn(Request) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Response>> + Send + 'static,
	{
		let handler: ActionHandler = Arc::new(move |request| Box::pin(handler(request)));
		self.handlers.insert(HandlerKey { method, action }, handler);
	}

	/// Applies the resolution order over the table.
	fn resolve(&self, method: &Method, action: Option<&str>) -> Option<&ActionHandler> {
		if let Some(action) = action
			&& let Some(handler) = self.handlers.get(&HandlerKey {
				method: method.clone(),
				action: Some(action.to_string()),
			}) {
			return Some(handler);
		}
		self.handlers.get(&HandlerKey {
			method: method.clone(),
			action: None,
		})
	}
}

#[async_trait]
impl<F: View> View for HtmxView<F> {
	async fn dispatch(&self, request: Request) -> Result<Response> {
		let details = request.htmx_details();
		if details.is_htmx_request
			&& let Some(handler) = self.resolve(&request.method, details.action_name.as_deref())
		{
			debug!(
				method = %request.method,
				action = details.action_name.as_deref().unwrap_or(""),
				"dispatching htmx action handler"
			);
			return handler(request).await;
		}
		self.fallback.dispatch(request).await
	}

	fn allowed_methods(&self) -> Vec<Method> {
		self.fallback.allowed_methods()
	}
}

/// Stand-in for the framework's default verb dispatch: answers 405 for
/// everything, which is what a view without handlers for the verb does.
pub struct DefaultDispatch;

#[async_trait]
impl View for DefaultDispatch {
	async fn dispatch(&self, _request: Request) -> Result<Response> {
		Ok(Response::method_not_allowed())
	}
}

/// Renders a template for the request and wraps it in an HTML response.
///
/// The usual tail call of a handler: fragment-targeted requests come back
/// as just the fragment markup, everything else as the full page.
pub fn render_to_response(
	templates: &Templates,
	name: &str,
	context: RenderContext,
	details: &HtmxDetails,
) -> Result<Response> {
	Ok(Response::html(templates.render(name, context, details)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Error;
	use hyper::StatusCode;
	use std::sync::Mutex;

	/// Records which handler ran, for resolution-order assertions.
	#[derive(Default)]
	struct Invocations(Mutex<Vec<&'static str>>);

	impl Invocations {
		fn record(&self, label: &'static str) {
			self.0.lock().unwrap().push(label);
		}

		fn taken(&self) -> Vec<&'static str> {
			std::mem::take(&mut *self.0.lock().unwrap())
		}
	}

	struct FallbackView {
		invocations: Arc<Invocations>,
	}

	#[async_trait]
	impl View for FallbackView {
		async fn dispatch(&self, _request: Request) -> Result<Response> {
			self.invocations.record("fallback");
			Ok(Response::method_not_allowed())
		}
	}

	fn htmx_request(method: Method, action: Option<&str>) -> Request {
		let mut builder = Request::builder().method(method).header("HX-Request", "true");
		if let Some(action) = action {
			builder = builder.header("FHX-Action", action);
		}
		builder.build().unwrap()
	}

	fn table(invocations: &Arc<Invocations>) -> HtmxView<FallbackView> {
		let fallback = FallbackView {
			invocations: Arc::clone(invocations),
		};
		let get = Arc::clone(invocations);
		let get_close = Arc::clone(invocations);
		let post_merge = Arc::clone(invocations);
		HtmxView::new(fallback)
			.on_method(Method::GET, move |_| {
				let invocations = Arc::clone(&get);
				async move {
					invocations.record("get");
					Ok(Response::ok())
				}
			})
			.on(Method::GET, "close", move |_| {
				let invocations = Arc::clone(&get_close);
				async move {
					invocations.record("get_close");
					Ok(Response::ok())
				}
			})
			.on(Method::POST, "merge", move |_| {
				let invocations = Arc::clone(&post_merge);
				async move {
					invocations.record("post_merge");
					Ok(Response::ok())
				}
			})
	}

	#[tokio::test]
	async fn test_action_handler_preferred_over_method_handler() {
		let invocations = Arc::new(Invocations::default());
		let view = table(&invocations);

		view.dispatch(htmx_request(Method::GET, Some("close")))
			.await
			.unwrap();
		assert_eq!(invocations.taken(), vec!["get_close"]);
	}

	#[tokio::test]
	async fn test_unknown_action_falls_back_to_method_handler() {
		let invocations = Arc::new(Invocations::default());
		let view = table(&invocations);

		view.dispatch(htmx_request(Method::GET, Some("merge")))
			.await
			.unwrap();
		assert_eq!(
			invocations.taken(),
			vec!["get"],
			"GET with unregistered action must use the method-only handler"
		);
	}

	#[tokio::test]
	async fn test_no_action_uses_method_handler() {
		let invocations = Arc::new(Invocations::default());
		let view = table(&invocations);

		view.dispatch(htmx_request(Method::GET, None)).await.unwrap();
		assert_eq!(invocations.taken(), vec!["get"]);
	}

	#[tokio::test]
	async fn test_unhandled_method_falls_through_to_view() {
		let invocations = Arc::new(Invocations::default());
		let view = table(&invocations);

		let response = view
			.dispatch(htmx_request(Method::DELETE, Some("merge")))
			.await
			.unwrap();
		assert_eq!(invocations.taken(), vec!["fallback"]);
		assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
	}

	#[tokio::test]
	async fn test_non_htmx_request_bypasses_table() {
		let invocations = Arc::new(Invocations::default());
		let view = table(&invocations);

		let request = Request::builder()
			.method(Method::GET)
			.header("FHX-Action", "close")
			.build()
			.unwrap();
		view.dispatch(request).await.unwrap();
		assert_eq!(
			invocations.taken(),
			vec!["fallback"],
			"without HX-Request the table must not be consulted"
		);
	}

	#[tokio::test]
	async fn test_handler_errors_propagate_unchanged() {
		let view = HtmxView::new(DefaultDispatch).on(Method::POST, "close", |_| async {
			Err(Error::Internal("invalid state transition".to_string()))
		});

		let error = view
			.dispatch(htmx_request(Method::POST, Some("close")))
			.await
			.unwrap_err();
		assert!(
			matches!(error, Error::Internal(ref message) if message.contains("invalid state")),
			"dispatcher must not translate handler errors, got {:?}",
			error
		);
	}

	#[tokio::test]
	async fn test_default_dispatch_is_method_not_allowed() {
		let response = DefaultDispatch
			.dispatch(Request::builder().method(Method::PATCH).build().unwrap())
			.await
			.unwrap();
		assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
	}
}

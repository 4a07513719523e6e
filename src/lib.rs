//! # forge-htmx
//!
//! Server-rendered partial updates for [HTMX](https://htmx.org): named
//! template fragments that re-render independently, and header-driven
//! action dispatch so simple UI interactions don't need their own REST
//! endpoints.
//!
//! Two loosely coupled mechanisms share a header naming convention:
//!
//! - **Fragments**: a template block tag marks a named region. Full-page
//!   renders wrap it in a container the client can swap; a request
//!   carrying the fragment header gets only that region re-rendered.
//!   Lazy fragments defer their content (and their context computation)
//!   to an immediate follow-up request.
//! - **Actions**: a request carrying an action header is routed through
//!   an explicit `(method, action)` handler table in front of the normal
//!   view, falling back to a method-only handler and then to the view
//!   itself.
//!
//! The embedded browser script supplies the headers: it walks up the DOM
//! from the triggering element to find the nearest `fhx-action` /
//! `fhx-fragment` attributes, attaches the CSRF token on writes, and
//! reflects failed requests as `htmx-error-*` CSS classes.
//!
//! ## Example
//!
//! ```
//! use forge_htmx::{HtmxDetails, RenderContext, Templates};
//!
//! let mut templates = Templates::new();
//! templates
//!     .add_raw_template(
//!         "board.html",
//!         r#"<h1>Board</h1>{% htmxfragment "tasks" %}{{ open_count }} open{% endhtmxfragment %}"#,
//!     )
//!     .unwrap();
//!
//! let mut context = RenderContext::new();
//! context.insert("open_count", &3);
//!
//! // A request that asks for just the "tasks" fragment:
//! let details = HtmxDetails {
//!     is_htmx_request: true,
//!     fragment_name: Some("tasks".to_string()),
//!     action_name: None,
//! };
//! let fragment = templates.render("board.html", context, &details).unwrap();
//! assert!(fragment.contains("3 open"));
//! assert!(!fragment.contains("<h1>"));
//! ```

pub mod error;
pub mod fragment;
pub mod headers;
pub mod http;
pub mod render;
pub mod script;
pub mod views;

pub use error::{Error, Result};
pub use fragment::{Fragment, FragmentSet, ParsedTemplate};
pub use headers::{
	ACTION_ATTR, CSRF_HEADER_NAME, FHX_ACTION, FHX_FRAGMENT, FRAGMENT_ATTR, HX_REDIRECT,
	HX_REQUEST, HtmxDetails,
};
pub use http::{Request, RequestBuilder, Response};
pub use render::{DEDICATED_TEMPLATE_SUFFIX, Deferred, RenderContext, Templates};
pub use script::{FORGE_HTMX_JS, HtmxJsFunction, script_tag};
pub use views::{ActionHandler, DefaultDispatch, HtmxView, View, render_to_response};

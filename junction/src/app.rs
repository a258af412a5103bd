//! The application: registration surface and shared request state.

use crate::options::AppOptions;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Extensions, Method, Request, Response};
use hyper::body::{Body, Incoming};
use junction_core::{BoxError, BoxHandler, Handler, HttpError, Params};
use junction_std::{
    adapters::{self, HttpBody, PlainRequest, PlainResponse},
    handlers::LazyHandler,
    middleware::{LayerOptions, LayerSpec, MiddlewareRegistry},
    normalize::Normalizer,
    routing::{Lookup, RouteMethod, RouteTable},
};
use std::{convert::Infallible, future::Future, sync::Arc};

/// A route selected by [`App::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// The registered pattern.
    pub route: String,
    /// The handler dispatch would invoke.
    pub handler: BoxHandler,
    /// The parameters it would see.
    pub params: Params,
}

/// An HTTP application: hooks, middleware and routes.
///
/// Registration takes `&mut self`; serving takes an `Arc<App>`, so the
/// tables are read-only once requests flow.
///
/// # Example
///
/// ```rust
/// use junction::{App, Event};
///
/// let mut app = App::new();
/// app.use_middleware(|event: Event| async move {
///     tracing::debug!(path = event.path(), "request");
/// })
/// .get("/hello/:name", |event: Event| async move {
///     format!("Hello {}!", event.param("name").unwrap_or_default())
/// });
///
/// assert!(app.resolve(&http::Method::GET, "/hello/world").is_some());
/// ```
#[derive(Debug, Default)]
pub struct App {
    pub(crate) options: AppOptions,
    pub(crate) normalizer: Normalizer,
    pub(crate) middleware: MiddlewareRegistry,
    pub(crate) routes: RouteTable<BoxHandler>,
}

impl App {
    /// An app with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// An app with the given options.
    pub fn with_options(options: AppOptions) -> Self {
        Self {
            normalizer: Normalizer::new(options.is_debug()),
            options,
            ..Self::default()
        }
    }

    /// The options the app was created with.
    pub fn config(&self) -> &AppOptions {
        &self.options
    }

    // ------------------------------------------------------------------
    // Middleware
    // ------------------------------------------------------------------

    /// Register a global middleware.
    pub fn use_middleware<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.use_layer(LayerSpec::global(handler))
    }

    /// Register a middleware under `prefix`. `""` and `"/"` mean global.
    pub fn use_at<H: Handler>(&mut self, prefix: &str, handler: H) -> &mut Self {
        self.use_layer(LayerSpec::scoped(prefix, handler))
    }

    /// Register a middleware under `prefix` with extra options.
    pub fn use_with<H: Handler>(&mut self, prefix: &str, handler: H, options: LayerOptions) -> &mut Self {
        self.use_layer(LayerSpec::scoped(prefix, handler).with_options(options))
    }

    /// Register a middleware whose handler is built by `factory` on first use.
    pub fn use_lazy<F, Fut, H>(&mut self, prefix: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<H, HttpError>> + Send,
        H: Handler,
    {
        self.use_at(prefix, LazyHandler::new(factory))
    }

    /// Register a layer descriptor.
    pub fn use_layer(&mut self, spec: LayerSpec) -> &mut Self {
        self.middleware.add(spec);
        self
    }

    /// Register several layer descriptors, in order.
    pub fn use_layers<I>(&mut self, specs: I) -> &mut Self
    where
        I: IntoIterator<Item = LayerSpec>,
    {
        for spec in specs {
            self.middleware.add(spec);
        }
        self
    }

    // ------------------------------------------------------------------
    // Routes
    // ------------------------------------------------------------------

    /// Register a route. Registering the same method and pattern again
    /// replaces the handler.
    pub fn on<H: Handler>(&mut self, method: impl Into<RouteMethod>, pattern: &str, handler: H) -> &mut Self {
        let method = method.into();
        if self
            .routes
            .insert(method.clone(), pattern, BoxHandler::new(handler))
            .is_some()
        {
            tracing::debug!(%method, pattern, "route replaced");
        }
        self
    }

    /// Register a `GET` route.
    pub fn get<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.on(Method::GET, pattern, handler)
    }

    /// Register a `POST` route.
    pub fn post<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.on(Method::POST, pattern, handler)
    }

    /// Register a `PUT` route.
    pub fn put<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.on(Method::PUT, pattern, handler)
    }

    /// Register a `PATCH` route.
    pub fn patch<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.on(Method::PATCH, pattern, handler)
    }

    /// Register a `DELETE` route.
    pub fn delete<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.on(Method::DELETE, pattern, handler)
    }

    /// Register a `HEAD` route.
    pub fn head<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.on(Method::HEAD, pattern, handler)
    }

    /// Register an `OPTIONS` route.
    pub fn options<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.on(Method::OPTIONS, pattern, handler)
    }

    /// Register a route answering every method.
    pub fn all<H: Handler>(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.on(RouteMethod::All, pattern, handler)
    }

    /// The route dispatch would select for `method` on `path`, without
    /// invoking anything.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<ResolvedRoute> {
        let pathname = path.split_once('?').map_or(path, |(p, _)| p);
        match self.routes.lookup(method, pathname) {
            Lookup::Found(found) => Some(ResolvedRoute {
                route: found.pattern.to_string(),
                handler: found.value.clone(),
                params: found.params,
            }),
            Lookup::MethodNotAllowed { .. } | Lookup::NotFound => None,
        }
    }

    // ------------------------------------------------------------------
    // Serving
    // ------------------------------------------------------------------

    /// Freeze the app for serving.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// A hyper service function; see [`adapters::node_handler`].
    pub fn node_handler(
        self: &Arc<Self>,
    ) -> impl Fn(Request<Incoming>) -> BoxFuture<'static, Result<Response<HttpBody>, Infallible>>
    + Clone
    + Send
    + Sync
    + use<> {
        adapters::node_handler(Arc::clone(self))
    }

    /// A fetch-style handler; see [`adapters::web_handler`].
    pub fn web_handler<B>(
        self: &Arc<Self>,
    ) -> impl Fn(Request<B>, Option<Extensions>) -> BoxFuture<'static, Response<HttpBody>>
    + Clone
    + Send
    + Sync
    + use<B>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        adapters::web_handler(Arc::clone(self))
    }

    /// An in-memory handler; see [`adapters::plain_handler`].
    pub fn plain_handler(
        self: &Arc<Self>,
    ) -> impl Fn(PlainRequest) -> BoxFuture<'static, PlainResponse> + Clone + Send + Sync + use<> {
        adapters::plain_handler(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use junction_core::Event;

    #[test]
    fn test_resolve_ignores_query() {
        let mut app = App::new();
        app.get("/users/:id", |_event: Event| async { "user" });

        let resolved = app.resolve(&Method::GET, "/users/7?full=1").unwrap();
        assert_eq!(resolved.route, "/users/:id");
        assert_eq!(resolved.params.get("id"), Some("7"));
        assert!(app.resolve(&Method::POST, "/users/7").is_none());
    }

    #[test]
    fn test_layers_are_counted() {
        let mut app = App::new();
        app.use_middleware(|_event: Event| async {})
            .use_at("/api", |_event: Event| async {})
            .use_layers([
                LayerSpec::global(|_event: Event| async {}),
                LayerSpec::scoped("/", |_event: Event| async {}),
            ]);
        assert_eq!(app.middleware.len(), 4);
        assert_eq!(app.middleware.global().len(), 3);
    }

    #[test]
    fn test_debug_follows_options() {
        let app = App::with_options(AppOptions::new().debug(true));
        assert!(app.normalizer.is_debug());
        assert!(app.config().is_debug());
    }
}

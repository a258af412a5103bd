//! The staged request dispatcher.
//!
//! # Stages
//!
//! | Stage    | Runs                                               | Stops on              |
//! |----------|----------------------------------------------------|-----------------------|
//! | Hooks    | `on_request`                                       | an error              |
//! | Global   | global middleware, registration order              | first non-pass output |
//! | Scoped   | scoped middleware, longest prefix first            | first non-pass output |
//! | Route    | the route table, on the original pathname          | any output but pass   |
//! | NotFound | nothing matched                                    | always                |
//!
//! After every handler the event is checked for a response written by the
//! handler itself; dispatch then ends without normalizing.
//!
//! Errors and panics from any stage end up in the error pipeline. Failures of
//! the observation hooks (`on_error`, `on_before_response`,
//! `on_after_response`) are logged and otherwise ignored.

use crate::app::App;
use futures::FutureExt;
use http::{HeaderValue, header};
use junction_core::{
    BoxHook, Dispatcher, ErrorEvent, Event, Handler, HttpError, MatchedRoute, Output, ResponseEvent,
};
use junction_std::routing::Lookup;
use std::{future::Future, panic::AssertUnwindSafe};

impl Dispatcher for App {
    async fn dispatch(&self, event: Event) {
        let output = match AssertUnwindSafe(self.run_stages(&event))
            .catch_unwind()
            .await
        {
            Ok(output) => output,
            Err(payload) => Output::Error(HttpError::from_panic(payload)),
        };

        if event.handled() {
            tracing::debug!(path = event.path(), "response written by handler");
            return;
        }
        self.respond(&event, output).await;
    }
}

impl App {
    async fn run_stages(&self, event: &Event) -> Output {
        // Hooks
        if let Some(hook) = &self.options.on_request {
            if let Err(err) = hook.call_dyn(event.clone()).await {
                return Output::Error(err);
            }
            if event.handled() {
                return Output::Empty;
            }
        }

        // Global middleware
        for layer in self.middleware.global() {
            if !layer.matches(event.path(), event) {
                continue;
            }
            let output = layer.handler().call(event.clone()).await;
            if !output.is_pass() || event.handled() {
                tracing::debug!(stage = "global", path = event.path(), "middleware answered");
                return output;
            }
        }

        // Scoped middleware
        for (relative, layer) in self.middleware.scoped(event.path()) {
            let view = event.with_path(&relative);
            if !layer.matches(view.path(), &view) {
                continue;
            }
            let output = layer.handler().call(view).await;
            if !output.is_pass() || event.handled() {
                tracing::debug!(
                    stage = "scoped",
                    prefix = layer.prefix().unwrap_or_default(),
                    path = %relative,
                    "middleware answered"
                );
                return output;
            }
        }

        // Route
        match self.routes.lookup(event.method(), event.pathname()) {
            Lookup::Found(found) => {
                {
                    let mut context = event.context();
                    context.params = found.params;
                    context.matched_route = Some(MatchedRoute {
                        pattern: found.pattern.to_string(),
                    });
                }
                let output = found.value.call(event.clone()).await;
                if !output.is_pass() || event.handled() {
                    tracing::debug!(stage = "route", route = found.pattern, "route answered");
                    return output;
                }
            }
            Lookup::MethodNotAllowed { allowed } => {
                let allow = allowed
                    .iter()
                    .map(|method| method.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    event.set_response_header(header::ALLOW, value);
                }
                return Output::Error(HttpError::method_not_allowed(event.method()));
            }
            Lookup::NotFound => {}
        }

        Output::NotFound
    }

    async fn respond(&self, event: &Event, output: Output) {
        let state = event.response_state();
        let response = self.normalizer.normalize(output, event.path(), &state);

        if let Some(error) = &response.error {
            if error.is_unhandled() || error.is_fatal() {
                tracing::error!(
                    status = error.status_code().as_u16(),
                    fatal = error.is_fatal(),
                    unhandled = error.is_unhandled(),
                    path = event.path(),
                    error = %error,
                    "request failed"
                );
            }
            let report = ErrorEvent {
                error: error.clone(),
                event: event.clone(),
            };
            observe("on_error", self.options.on_error.as_ref(), report).await;
            if event.handled() {
                tracing::debug!(path = event.path(), "response written by on_error");
                return;
            }
        }

        let meta = response.meta();
        observe(
            "on_before_response",
            self.options.on_before_response.as_ref(),
            ResponseEvent {
                event: event.clone(),
                response: meta.clone(),
            },
        )
        .await;

        if let Err(err) = event.send(response).await {
            tracing::warn!(path = event.path(), error = %err, "failed to send response");
            return;
        }

        observe(
            "on_after_response",
            self.options.on_after_response.as_ref(),
            ResponseEvent {
                event: event.clone(),
                response: meta,
            },
        )
        .await;
    }
}

/// Run an observation hook, logging its failure or panic.
async fn observe<A: Send + 'static>(name: &'static str, hook: Option<&BoxHook<A>>, input: A) {
    let Some(hook) = hook else {
        return;
    };
    match catch(hook.call_dyn(input)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!(hook = name, error = %err, "hook failed"),
        Err(err) => tracing::error!(hook = name, error = %err, "hook panicked"),
    }
}

async fn catch<F: Future>(future: F) -> Result<F::Output, HttpError> {
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(HttpError::from_panic)
}

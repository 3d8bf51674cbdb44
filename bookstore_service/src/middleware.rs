//! Interceptors applied to every request. `app_config::build_app` wraps them so that
//! logging is outermost and the content type filter innermost, which keeps logging
//! and timing in place for requests the filter rejects.

use std::time::Instant;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderMap, CONTENT_TYPE};
use actix_web::http::{Method, StatusCode};
use actix_web::middleware::Next;
use actix_web::Error;

use crate::handlers::plain_text_response;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const UNSUPPORTED_MEDIA_TYPE_MESSAGE: &str = "Content-Type must be application/json";

/// Logs method and path before the request is handled
pub async fn log_request(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    tracing::info!(method = %req.method(), path = %req.path(), "Request");
    next.call(req).await
}

/// Logs method, path and the time spent in the inner chain once it returns
pub async fn time_request(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();
    let path = req.path().to_owned();
    let start = Instant::now();

    let response = next.call(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        elapsed = ?start.elapsed(),
        "Completed"
    );
    response
}

fn carries_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT
}

/// True when the Content-Type header contains `application/json` anywhere in its value.
/// A missing or non visible ASCII header counts as empty
pub fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .contains(JSON_CONTENT_TYPE)
}

/// Rejects POST and PUT requests to registered routes without a JSON content type
/// with 415. Other methods and paths no resource matches pass through untouched
pub async fn filter_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<EitherBody<impl MessageBody>>, Error> {
    let matches_route = req.request().match_pattern().is_some();
    if matches_route && carries_body(req.method()) && !has_json_content_type(req.headers()) {
        tracing::warn!(
            method = %req.method(),
            path = %req.path(),
            "Rejected request with unsupported content type"
        );
        let response = plain_text_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UNSUPPORTED_MEDIA_TYPE_MESSAGE,
        );
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req)
        .await
        .map(ServiceResponse::map_into_left_body)
}

#[cfg(test)]
mod middleware_tests {
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::Arc;

    use actix_web::http::header::{HeaderValue, CONTENT_TYPE};
    use actix_web::http::{header::HeaderMap, StatusCode};
    use actix_web::middleware::from_fn;
    use actix_web::test as actix_test;
    use actix_web::{web, App, HttpResponse};
    use proptest::prelude::*;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    use super::*;

    type RecordedEvent = HashMap<String, String>;

    /// Keeps the fields of every event emitted while it is the default subscriber
    #[derive(Clone, Default)]
    struct EventRecorder {
        events: Arc<parking_lot::Mutex<Vec<RecordedEvent>>>,
    }

    struct FieldVisitor<'a>(&'a mut RecordedEvent);

    impl Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0
                .insert(field.name().to_string(), format!("{:?}", value));
        }

        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }
    }

    impl<S: Subscriber> Layer<S> for EventRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = RecordedEvent::new();
            event.record(&mut FieldVisitor(&mut fields));
            self.events.lock().push(fields);
        }
    }

    impl EventRecorder {
        fn with_message(&self, message: &str) -> Vec<RecordedEvent> {
            self.events
                .lock()
                .iter()
                .filter(|fields| fields.get("message").map(String::as_str) == Some(message))
                .cloned()
                .collect()
        }
    }

    fn headers_with_content_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(value).expect("Invalid header value"),
        );
        headers
    }

    #[test]
    fn test_json_content_type_is_a_substring_match() {
        assert!(has_json_content_type(&headers_with_content_type(
            "application/json"
        )));
        assert!(has_json_content_type(&headers_with_content_type(
            "application/json; charset=utf-8"
        )));
        assert!(!has_json_content_type(&headers_with_content_type(
            "text/plain"
        )));
        assert!(!has_json_content_type(&headers_with_content_type(
            "Application/JSON"
        )));
        assert!(!has_json_content_type(&HeaderMap::new()));
    }

    #[actix_web::test]
    /// Filter short-circuits POST and PUT with wrong content type
    /// and lets GET and DELETE through no matter what the header says
    async fn test_filter_content_type() {
        let app = actix_test::init_service(
            App::new()
                .wrap(from_fn(filter_content_type))
                .service(
                    web::resource("/books").to(|| async { HttpResponse::Ok().body("handled") }),
                )
                .service(
                    web::resource("/books/{id}")
                        .to(|| async { HttpResponse::Ok().body("handled") }),
                ),
        )
        .await;

        for method in [Method::POST, Method::PUT] {
            let req = actix_test::TestRequest::default()
                .method(method.clone())
                .uri("/books")
                .insert_header((CONTENT_TYPE, "text/plain"))
                .set_payload(r#"{"title":"t","author":"a"}"#)
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
            let body = actix_test::read_body(resp).await;
            assert_eq!(body, UNSUPPORTED_MEDIA_TYPE_MESSAGE);

            let req = actix_test::TestRequest::default()
                .method(method.clone())
                .uri("/books")
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

            let req = actix_test::TestRequest::default()
                .method(method)
                .uri("/books")
                .insert_header((CONTENT_TYPE, "application/json"))
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        for method in [Method::GET, Method::DELETE] {
            let req = actix_test::TestRequest::default()
                .method(method)
                .uri("/books/1")
                .insert_header((CONTENT_TYPE, "text/plain"))
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(actix_test::read_body(resp).await, "handled");
        }
    }

    #[actix_web::test]
    /// Paths without a resource fall through to the 404 default service
    async fn test_filter_skips_unknown_paths() {
        let app = actix_test::init_service(
            App::new()
                .wrap(from_fn(filter_content_type))
                .service(web::resource("/books").to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/nope")
            .insert_header((CONTENT_TYPE, "text/plain"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    /// Logging and timing wrap the filter, a rejected request is still logged once
    /// before handling and once with its elapsed time
    async fn test_full_chain_logs_rejected_request() {
        let recorder = EventRecorder::default();
        let subscriber = Registry::default().with(recorder.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = actix_test::init_service(
            App::new()
                .wrap(from_fn(filter_content_type))
                .wrap(from_fn(time_request))
                .wrap(from_fn(log_request))
                .service(web::resource("/books").to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/books")
            .insert_header((CONTENT_TYPE, "text/plain"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let requests = recorder.with_message("Request");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["method"], "POST");
        assert_eq!(requests[0]["path"], "/books");

        let completed = recorder.with_message("Completed");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0]["method"], "POST");
        assert_eq!(completed[0]["path"], "/books");
        assert!(completed[0].contains_key("elapsed"));

        let req = actix_test::TestRequest::get().uri("/books").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(recorder.with_message("Request").len(), 2);
        assert_eq!(recorder.with_message("Completed").len(), 2);
    }

    proptest! {
        #[test]
        fn any_value_containing_json_type_is_accepted(
            prefix in "[a-z/;= ]{0,16}",
            suffix in "[a-z/;= -]{0,16}",
        ) {
            let value = format!("{prefix}{JSON_CONTENT_TYPE}{suffix}");
            prop_assert!(has_json_content_type(&headers_with_content_type(&value)));
        }

        #[test]
        fn values_without_json_type_are_rejected(value in "[a-z/;= -]{0,32}") {
            prop_assume!(!value.contains(JSON_CONTENT_TYPE));
            prop_assert!(!has_json_content_type(&headers_with_content_type(&value)));
        }
    }
}

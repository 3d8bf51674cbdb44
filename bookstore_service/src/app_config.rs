use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::from_fn;
use actix_web::App;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;

use crate::books_repository::BookRepository;
use crate::handlers;
use crate::middleware::{filter_content_type, log_request, time_request};

pub const OPENAPI_SPEC_PATH: &str = "/apispec/v2";

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::resource("/books")
                .route(web::get().to(handlers::list_books))
                .route(web::post().to(handlers::add_book)),
        )
        .service(
            web::resource("/books/{id}")
                .route(web::get().to(handlers::get_book))
                .route(web::put().to(handlers::update_book))
                .route(web::delete().to(handlers::delete_book)),
        );
}

/// Builds the whole application around the given repository.
/// Middlewares run in order: tracing span, logging, timing, content type filter
pub fn build_app(
    books_repository: Arc<dyn BookRepository>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap_api()
        .app_data(web::Data::new(books_repository))
        .app_data(actix_web::web::PathConfig::default().error_handler(handlers::invalid_id_handler))
        .app_data(
            actix_web::web::JsonConfig::default()
                .limit(handlers::MAX_BOOK_PAYLOAD_SIZE)
                .content_type_required(false)
                .error_handler(handlers::invalid_json_handler),
        )
        .wrap(from_fn(filter_content_type))
        .wrap(from_fn(time_request))
        .wrap(from_fn(log_request))
        .wrap(TracingLogger::default())
        .configure(config_app)
        .with_json_spec_at(OPENAPI_SPEC_PATH)
        .build()
}

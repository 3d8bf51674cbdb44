use std::sync::Arc;

use actix_web::error::{InternalError, JsonPayloadError, PathError};
use actix_web::http::header::{ContentType, LOCATION};
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{Error, HttpRequest, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{BookDetails, BookId};
use crate::books_repository::{BookRepository, BookRepositoryError};

pub const INVALID_ID_MESSAGE: &str = "invalid id";
pub const INVALID_JSON_MESSAGE: &str = "invalid JSON";
pub const BOOK_NOT_FOUND_MESSAGE: &str = "book not found";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "request body too large";

/// Bodies are read whole into memory before decoding, this caps a single request
pub const MAX_BOOK_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

pub(crate) fn plain_text_response(status: StatusCode, message: &'static str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::plaintext())
        .body(message)
}

/// Turns a `{id}` segment that is not an integer into 400 "invalid id"
pub fn invalid_id_handler(err: PathError, _req: &HttpRequest) -> Error {
    tracing::debug!("Rejected book id: {}", err);
    InternalError::from_response(
        err,
        plain_text_response(StatusCode::BAD_REQUEST, INVALID_ID_MESSAGE),
    )
    .into()
}

/// Turns any body that does not decode into `BookDetails` into 400 "invalid JSON".
/// Bodies over `MAX_BOOK_PAYLOAD_SIZE` are not a decode failure and get 413 instead
pub fn invalid_json_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    tracing::debug!("Rejected book body: {}", err);
    let response = match err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            plain_text_response(StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE_MESSAGE)
        }
        _ => plain_text_response(StatusCode::BAD_REQUEST, INVALID_JSON_MESSAGE),
    };
    InternalError::from_response(err, response).into()
}

fn repository_error_response(err: BookRepositoryError) -> HttpResponse {
    match err {
        BookRepositoryError::NotFound(book_id) => {
            tracing::debug!("Book {} not found", book_id);
            plain_text_response(StatusCode::NOT_FOUND, BOOK_NOT_FOUND_MESSAGE)
        }
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn list_books(
    books_repository: Data<Arc<dyn BookRepository>>,
) -> Result<HttpResponse, Error> {
    Ok(match books_repository.list_books().await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => repository_error_response(err),
    })
}

#[api_v2_operation]
pub async fn add_book(
    books_repository: Data<Arc<dyn BookRepository>>,
    details: web::Json<Option<BookDetails>>,
) -> Result<HttpResponse, Error> {
    // a `null` body decodes to empty details
    let details = details.into_inner().unwrap_or_default();
    Ok(
        match books_repository.add_book(details).await {
            Ok(book) => HttpResponse::Created()
                .append_header((LOCATION, format!("/books/{}", book.id)))
                .json(book),
            Err(err) => repository_error_response(err),
        },
    )
}

#[api_v2_operation]
pub async fn get_book(
    books_repository: Data<Arc<dyn BookRepository>>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository.get_book(book_id.into_inner()).await {
            Ok(book) => HttpResponse::Ok().json(book),
            Err(err) => repository_error_response(err),
        },
    )
}

#[api_v2_operation]
pub async fn update_book(
    books_repository: Data<Arc<dyn BookRepository>>,
    book_id: web::Path<BookId>,
    details: web::Json<Option<BookDetails>>,
) -> Result<HttpResponse, Error> {
    let details = details.into_inner().unwrap_or_default();
    Ok(
        match books_repository
            .update_book(book_id.into_inner(), details)
            .await
        {
            Ok(book) => HttpResponse::Ok().json(book),
            Err(err) => repository_error_response(err),
        },
    )
}

#[api_v2_operation]
pub async fn delete_book(
    books_repository: Data<Arc<dyn BookRepository>>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository.delete_book(book_id.into_inner()).await {
            Ok(()) => HttpResponse::NoContent().finish(),
            Err(err) => repository_error_response(err),
        },
    )
}

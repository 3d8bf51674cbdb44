use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;

use crate::api::{Book, BookDetails, BookId};

const MAX_RETRIES: u32 = 3;
const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(100);
const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// GET, PUT and DELETE go through `client` which retries transient failures.
/// POST is not idempotent and goes through `create_client`, which never retries
pub struct BookstoreClient {
    url: String,
    client: ClientWithMiddleware,
    create_client: ClientWithMiddleware,
}

impl BookstoreClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(MIN_RETRY_INTERVAL, MAX_RETRY_INTERVAL)
            .build_with_max_retries(MAX_RETRIES);
        let client = ClientBuilder::new(reqwest_client.clone())
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        let create_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            create_client,
        })
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("{} {}", status, body)
    }

    /// Calls GET /books endpoint
    pub async fn list_books(&self) -> anyhow::Result<Vec<Book>> {
        let response = self
            .client
            .get(format!("{}/books", self.url))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            bail!("Failed to list books {}", Self::error_message(response).await)
        }
    }

    /// Calls POST /books endpoint
    /// Returns the stored book with the id assigned by the service
    pub async fn add_book(&self, book_details: BookDetails) -> anyhow::Result<Book> {
        let response = self
            .create_client
            .post(format!("{}/books", self.url))
            .json(&book_details)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            bail!("Failed to add book {}", Self::error_message(response).await)
        }

        response.json().await.context("Failed to parse added book")
    }

    /// Calls GET /books/{book_id} endpoint
    /// Returns None if book was not in the store
    pub async fn get_book(&self, book_id: BookId) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .get(format!("{}/books/{}", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            bail!("Failed to get book {}", Self::error_message(response).await)
        }
    }

    /// Calls PUT /books/{book_id} endpoint
    /// Returns the updated book, None if book was not in the store
    pub async fn update_book(
        &self,
        book_id: BookId,
        book_details: BookDetails,
    ) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .put(format!("{}/books/{}", self.url, book_id))
            .json(&book_details)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            bail!("Failed to update book {}", Self::error_message(response).await)
        }
    }

    /// Calls DELETE /books/{book_id} endpoint
    /// Returns true if book was deleted and false if it was not in the store
    pub async fn delete_book(&self, book_id: BookId) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/books/{}", self.url, book_id))
            .send()
            .await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => bail!("Failed to delete book {}", Self::error_message(response).await),
        }
    }

    /// Sends a raw body with the given content type to POST /books, returns status and body text.
    /// Used to check how the service treats payloads the typed methods never produce
    pub async fn post_raw(
        &self,
        content_type: &str,
        body: &str,
    ) -> anyhow::Result<(StatusCode, String)> {
        let response = self
            .create_client
            .post(format!("{}/books", self.url))
            .header(CONTENT_TYPE, content_type)
            .body(body.to_string())
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.text().await?))
    }
}

pub use in_memory_books_repository::InMemoryBookRepository;

use crate::api::{Book, BookDetails, BookId};

mod in_memory_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),
}

#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Adds book to repository, returns the stored book with its assigned id
    async fn add_book(&self, details: BookDetails) -> Result<Book, BookRepositoryError>;
    /// Replaces title and author of an existing book, the id is preserved
    async fn update_book(
        &self,
        book_id: BookId,
        details: BookDetails,
    ) -> Result<Book, BookRepositoryError>;
    /// Retrieves the book from repository
    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError>;
    /// Removes the book from repository
    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError>;
    /// Lists all books in the repository, order is unspecified
    async fn list_books(&self) -> Result<Vec<Book>, BookRepositoryError>;
}

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::api::{Book, BookDetails, BookId};
use crate::books_repository::{BookRepository, BookRepositoryError};

const FIRST_BOOK_ID: BookId = 1;

struct BooksState {
    next_book_id: BookId,
    books: HashMap<BookId, Book>,
}

/// Books kept in process memory. The map and the id counter sit behind one lock
/// so every operation is serialized with respect to the others.
pub struct InMemoryBookRepository {
    state: parking_lot::Mutex<BooksState>,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self {
            state: parking_lot::Mutex::new(BooksState {
                next_book_id: FIRST_BOOK_ID,
                books: HashMap::new(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn add_book(&self, details: BookDetails) -> Result<Book, BookRepositoryError> {
        let mut state = self.state.lock();
        let id = state.next_book_id;
        state.next_book_id += 1;
        let book = Book::from_details(id, details);
        state.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update_book(
        &self,
        book_id: BookId,
        details: BookDetails,
    ) -> Result<Book, BookRepositoryError> {
        let mut state = self.state.lock();
        let book = state
            .books
            .get_mut(&book_id)
            .ok_or(BookRepositoryError::NotFound(book_id))?;
        *book = Book::from_details(book_id, details);
        Ok(book.clone())
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError> {
        self.state
            .lock()
            .books
            .get(&book_id)
            .cloned()
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError> {
        match self.state.lock().books.entry(book_id) {
            Entry::Occupied(occupied) => {
                occupied.remove();
                Ok(())
            }
            Entry::Vacant(_) => Err(BookRepositoryError::NotFound(book_id)),
        }
    }

    async fn list_books(&self) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self.state.lock().books.values().cloned().collect())
    }
}

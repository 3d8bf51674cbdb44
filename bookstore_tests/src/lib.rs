//! Tests run against a bookstore service that is already up.
//! The address is taken from `BOOKSTORE_URL`, `http://127.0.0.1:8080` by default.


#[cfg(all(test, any(feature = "system_tests", feature = "load_tests")))]
pub(crate) fn bookstore_url() -> String {
    std::env::var("BOOKSTORE_URL").unwrap_or("http://127.0.0.1:8080".to_string())
}

use std::fmt;

use paperclip::actix::Apiv2Schema;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

pub type BookId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Struct representing a book stored in the service
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq, Apiv2Schema)]
/// Struct representing details of the book sent in POST and PUT requests.
///
/// Decoding is lenient: keys match regardless of ASCII case, missing or `null`
/// fields stay empty and unknown keys are skipped. An `id` key must still hold an
/// integer (or `null`) but its value is dropped, the service assigns ids itself.
pub struct BookDetails {
    pub title: String,
    pub author: String,
}

impl Book {
    pub fn from_details(id: BookId, details: BookDetails) -> Self {
        Self {
            id,
            title: details.title,
            author: details.author,
        }
    }
}

impl<'de> Deserialize<'de> for BookDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(BookDetailsVisitor)
    }
}

struct BookDetailsVisitor;

impl<'de> Visitor<'de> for BookDetailsVisitor {
    type Value = BookDetails;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object with title and author")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut details = BookDetails::default();
        // later duplicates overwrite earlier ones
        while let Some(key) = map.next_key::<String>()? {
            if key.eq_ignore_ascii_case("title") {
                if let Some(title) = map.next_value::<Option<String>>()? {
                    details.title = title;
                }
            } else if key.eq_ignore_ascii_case("author") {
                if let Some(author) = map.next_value::<Option<String>>()? {
                    details.author = author;
                }
            } else if key.eq_ignore_ascii_case("id") {
                map.next_value::<Option<BookId>>()?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(details)
    }
}

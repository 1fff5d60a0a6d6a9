//! Sample data: ten books spanning several genres and two centuries.

use serde_json::{json, Value};

/// Name of the collection the sample books live in.
pub const BOOKS_COLLECTION: &str = "books";

/// Returns the ten sample book documents, without `_id`s.
pub fn sample_books() -> Vec<Value> {
    vec![
        book("The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, 10.99, true, 310, "George Allen & Unwin"),
        book("1984", "George Orwell", "Dystopian", 1949, 9.99, true, 328, "Secker & Warburg"),
        book("To Kill a Mockingbird", "Harper Lee", "Classic", 1960, 12.5, false, 281, "J.B. Lippincott & Co."),
        book("The Great Gatsby", "F. Scott Fitzgerald", "Classic", 1925, 8.99, true, 180, "Charles Scribner's Sons"),
        book("The Catcher in the Rye", "J.D. Salinger", "Fiction", 1951, 7.99, true, 214, "Little, Brown and Company"),
        book(
            "Harry Potter and the Sorcerer's Stone",
            "J.K. Rowling",
            "Fantasy",
            1997,
            14.99,
            true,
            309,
            "Bloomsbury",
        ),
        book("The Alchemist", "Paulo Coelho", "Adventure", 1988, 11.99, true, 208, "HarperTorch"),
        book("Pride and Prejudice", "Jane Austen", "Romance", 1813, 6.99, false, 279, "T. Egerton"),
        book("The Da Vinci Code", "Dan Brown", "Thriller", 2003, 13.49, true, 489, "Doubleday"),
        book("Becoming", "Michelle Obama", "Biography", 2018, 16.99, true, 448, "Crown Publishing Group"),
    ]
}

#[allow(clippy::too_many_arguments, reason = "one argument per book field keeps the table readable")]
fn book(
    title: &str,
    author: &str,
    genre: &str,
    published_year: i64,
    price: f64,
    in_stock: bool,
    pages: i64,
    publisher: &str,
) -> Value {
    json!({
        "title": title,
        "author": author,
        "genre": genre,
        "published_year": published_year,
        "price": price,
        "in_stock": in_stock,
        "pages": pages,
        "publisher": publisher,
    })
}

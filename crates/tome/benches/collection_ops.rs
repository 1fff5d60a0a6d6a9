use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::{seq::SliceRandom as _, Rng as _};
use serde_json::{json, Value};
use tome::Collection;

const GENRES: &[&str] = &["Fantasy", "Dystopian", "Classic", "Fiction", "Adventure", "Romance", "Thriller"];

fn random_books(count: usize) -> Vec<Value> {
    let mut rng = rand::thread_rng();
    (0 .. count)
        .map(|i| {
            json!({
                "title": format!("Book {}", i),
                "author": format!("Author {}", rng.gen_range(0 .. 200)),
                "genre": GENRES.choose(&mut rng).unwrap(),
                "published_year": rng.gen_range(1800 .. 2024),
                "price": rng.gen_range(5.0 .. 30.0),
                "in_stock": rng.gen_bool(0.8),
            })
        })
        .collect()
}

fn setup_collection(count: usize) -> Collection {
    let mut collection = Collection::new("bench_books");
    collection.insert_many(random_books(count)).unwrap();
    collection
}

fn bench_insert_many(c: &mut Criterion) {
    let books = random_books(1_000);

    c.bench_function("collection_insert_many_1000", |b| {
        b.iter_batched(
            || books.clone(),
            |books| {
                let mut collection = Collection::new("bench_books");
                black_box(collection.insert_many(books).unwrap());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_find_equality(c: &mut Criterion) {
    let scanned = setup_collection(10_000);
    let mut indexed = scanned.clone();
    indexed.create_index(&json!({"author": 1})).unwrap();
    let filter = json!({"author": "Author 42"});

    c.bench_function("collection_find_scan", |b| {
        b.iter(|| black_box(scanned.find(&filter).unwrap().to_vec()))
    });
    c.bench_function("collection_find_indexed", |b| {
        b.iter(|| black_box(indexed.find(&filter).unwrap().to_vec()))
    });
}

fn bench_sort_page(c: &mut Criterion) {
    let collection = setup_collection(10_000);

    c.bench_function("collection_sort_skip_limit", |b| {
        b.iter(|| {
            let cursor = collection
                .find(&json!({"in_stock": true}))
                .unwrap()
                .sort(&json!({"price": -1}))
                .unwrap()
                .skip(black_box(100))
                .limit(10);
            black_box(cursor.to_vec())
        })
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let collection = setup_collection(10_000);
    let pipeline = json!([
        {"$group": {"_id": "$genre", "avgPrice": {"$avg": "$price"}, "count": {"$sum": 1}}},
        {"$sort": {"avgPrice": -1}}
    ]);

    c.bench_function("collection_aggregate_group", |b| {
        b.iter(|| black_box(collection.aggregate(&pipeline).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_insert_many,
    bench_find_equality,
    bench_sort_page,
    bench_aggregate
);
criterion_main!(benches);

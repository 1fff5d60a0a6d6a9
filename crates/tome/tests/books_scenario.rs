use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use tome::{seed, Collection, Document, Store, TomeError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn seeded_store() -> Store {
    init_tracing();
    let mut store = Store::new();
    store
        .collection_mut(seed::BOOKS_COLLECTION)
        .unwrap()
        .insert_many(seed::sample_books())
        .unwrap();
    store
}

fn books(store: &mut Store) -> &mut Collection { store.collection_mut(seed::BOOKS_COLLECTION).unwrap() }

fn field<'a>(doc: &'a Document, name: &str) -> &'a Value { doc.get(name).unwrap() }

fn title_set<'a, I: IntoIterator<Item = &'a Document>>(docs: I) -> BTreeSet<String> {
    docs.into_iter()
        .map(|doc| field(doc, "title").as_str().unwrap().to_owned())
        .collect()
}

#[test]
fn find_all_returns_the_inserted_set() {
    let mut store = seeded_store();
    let found = books(&mut store).find(&json!({})).unwrap().to_vec();
    assert_eq!(found.len(), 10);

    let mut expected: Vec<Value> = seed::sample_books();
    let mut actual: Vec<Value> = found
        .into_iter()
        .map(|mut doc| {
            assert!(doc.remove("_id").is_some());
            doc.into_value()
        })
        .collect();
    let key = |v: &Value| v.get("title").and_then(Value::as_str).unwrap_or_default().to_owned();
    expected.sort_by_key(key);
    actual.sort_by_key(key);
    assert_eq!(actual, expected);
}

#[test]
fn fantasy_books() {
    let mut store = seeded_store();
    let fantasy = books(&mut store).find(&json!({"genre": "Fantasy"})).unwrap().to_vec();
    assert_eq!(
        title_set(&fantasy),
        BTreeSet::from(["The Hobbit".to_owned(), "Harry Potter and the Sorcerer's Stone".to_owned()])
    );
}

#[test]
fn update_one_touches_exactly_one_field_of_one_document() {
    let mut store = seeded_store();
    let collection = books(&mut store);
    let before = collection.find(&json!({})).unwrap().to_vec();

    let result = collection
        .update_one(&json!({"title": "1984"}), &json!({"$set": {"price": 11.5}}))
        .unwrap();
    assert_eq!(result.matched_count, 1);

    let after = collection.find(&json!({})).unwrap().to_vec();
    for (old, new) in before.iter().zip(&after) {
        if field(old, "title") == &json!("1984") {
            assert_eq!(field(new, "price"), &json!(11.5));
            let mut restored = new.clone();
            restored.set("price", field(old, "price").clone()).unwrap();
            assert_eq!(&restored, old);
        }
        else {
            assert_eq!(old, new);
        }
    }

    let missing = collection
        .update_one(&json!({"title": "The Silmarillion"}), &json!({"$set": {"price": 1}}))
        .unwrap();
    assert_eq!(missing.matched_count, 0);
    assert_eq!(collection.find(&json!({})).unwrap().to_vec(), after);
}

#[test]
fn delete_one_shrinks_by_at_most_one() {
    let mut store = seeded_store();
    let collection = books(&mut store);

    assert_eq!(collection.delete_one(&json!({"title": "Pride and Prejudice"})).unwrap().deleted_count, 1);
    assert_eq!(collection.len(), 9);
    assert_eq!(collection.delete_one(&json!({"title": "Pride and Prejudice"})).unwrap().deleted_count, 0);
    assert_eq!(collection.len(), 9);
    assert_eq!(collection.delete_one(&json!({"in_stock": true})).unwrap().deleted_count, 1);
    assert_eq!(collection.len(), 8);
}

#[test]
fn price_sorts_are_reverses() {
    let mut store = seeded_store();
    let collection = books(&mut store);
    let prices = |direction: i64| -> Vec<Value> {
        collection
            .find(&json!({}))
            .unwrap()
            .sort(&json!({"price": direction}))
            .unwrap()
            .projection(&json!({"title": 1, "price": 1}))
            .unwrap()
            .iter()
            .map(|doc| field(&doc, "price").clone())
            .collect()
    };

    let ascending = prices(1);
    let mut descending = prices(-1);
    descending.reverse();
    assert_eq!(ascending, descending);
    assert_eq!(ascending.first(), Some(&json!(6.99)));
    assert_eq!(ascending.last(), Some(&json!(16.99)));
}

#[test]
fn pages_partition_the_collection() {
    let mut store = seeded_store();
    let collection = books(&mut store);
    let page = |n: usize| collection.find(&json!({})).unwrap().skip(n * 5).limit(5).to_vec();

    let first = title_set(&page(0));
    let second = title_set(&page(1));
    assert_eq!(first.len(), 5);
    assert_eq!(second.len(), 5);
    assert!(first.is_disjoint(&second));

    let all = title_set(&collection.find(&json!({})).unwrap().to_vec());
    assert_eq!(first.union(&second).cloned().collect::<BTreeSet<_>>(), all);
}

#[test]
fn average_price_by_genre() {
    let mut store = seeded_store();
    let collection = books(&mut store);

    let mut expected: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for doc in collection.documents() {
        expected
            .entry(field(doc, "genre").as_str().unwrap().to_owned())
            .or_default()
            .push(field(doc, "price").as_f64().unwrap());
    }

    let groups = collection
        .aggregate(&json!([
            {"$group": {"_id": "$genre", "avgPrice": {"$avg": "$price"}, "count": {"$sum": 1}}},
            {"$sort": {"avgPrice": -1}}
        ]))
        .unwrap();

    let counted: i64 = groups.iter().map(|g| field(g, "count").as_i64().unwrap()).sum();
    assert_eq!(counted, 10);
    assert_eq!(groups.len(), expected.len());

    for group in &groups {
        let prices = expected.get(field(group, "_id").as_str().unwrap()).unwrap();
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        assert!((field(group, "avgPrice").as_f64().unwrap() - mean).abs() < 1e-9);
    }

    let averages: Vec<f64> = groups.iter().map(|g| field(g, "avgPrice").as_f64().unwrap()).collect();
    assert!(averages.windows(2).all(|w| w.first() >= w.get(1)));
}

#[test]
fn author_with_most_books() {
    let mut store = seeded_store();
    let collection = books(&mut store);
    collection.insert_one(json!({"title": "Animal Farm", "author": "George Orwell"})).unwrap();

    let top = collection
        .aggregate(&json!([
            {"$group": {"_id": "$author", "totalBooks": {"$sum": 1}}},
            {"$sort": {"totalBooks": -1}},
            {"$limit": 1}
        ]))
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(
        top.into_iter().next().unwrap().into_value(),
        json!({"_id": "George Orwell", "totalBooks": 2})
    );
}

#[test]
fn books_by_decade() {
    let mut store = seeded_store();
    let decades = books(&mut store)
        .aggregate(&json!([
            {"$addFields": {
                "decade": {"$concat": [
                    {"$toString": {"$multiply": [{"$floor": {"$divide": ["$published_year", 10]}}, 10]}},
                    "s"
                ]}
            }},
            {"$group": {"_id": "$decade", "count": {"$sum": 1}}},
            {"$sort": {"_id": 1}}
        ]))
        .unwrap();

    let buckets: Vec<(String, i64)> = decades
        .iter()
        .map(|d| (field(d, "_id").as_str().unwrap().to_owned(), field(d, "count").as_i64().unwrap()))
        .collect();
    let expected: Vec<(String, i64)> = [
        ("1810s", 1),
        ("1920s", 1),
        ("1930s", 1),
        ("1940s", 1),
        ("1950s", 1),
        ("1960s", 1),
        ("1980s", 1),
        ("1990s", 1),
        ("2000s", 1),
        ("2010s", 1),
    ]
    .into_iter()
    .map(|(d, n)| (d.to_owned(), n))
    .collect();
    assert_eq!(buckets, expected);
}

#[test]
fn indexes_never_change_results() {
    let mut store = seeded_store();
    let collection = books(&mut store);
    let filters = [
        json!({"title": "The Great Gatsby"}),
        json!({"author": "George Orwell", "published_year": {"$lt": 1950}}),
        json!({"author": {"$in": ["Jane Austen", "Dan Brown"]}}),
    ];
    let before: Vec<_> = filters.iter().map(|f| collection.find(f).unwrap().to_vec()).collect();

    collection.create_index(&json!({"title": 1})).unwrap();
    collection.create_index(&json!({"author": 1, "published_year": -1})).unwrap();

    let after: Vec<_> = filters.iter().map(|f| collection.find(f).unwrap().to_vec()).collect();
    assert_eq!(before, after);

    let stats = collection.explain(&json!({"title": "The Great Gatsby"})).unwrap();
    assert_eq!(stats.docs_examined, 1);
    assert_eq!(stats.n_returned, 1);
}

#[test]
fn malformed_queries_are_rejected() {
    let mut store = seeded_store();
    let collection = books(&mut store);

    for filter in [json!({"$foo": 1}), json!({"price": {"$gt": true}}), json!({"price": {"$regex": "x"}})] {
        assert!(matches!(collection.find(&filter), Err(TomeError::InvalidQuery { .. })), "{}", filter);
    }
    assert!(matches!(
        collection.update_one(&json!({}), &json!({"price": 1})),
        Err(TomeError::InvalidQuery { .. })
    ));
    assert!(matches!(
        collection.aggregate(&json!([{"$unwind": "$tags"}])),
        Err(TomeError::InvalidQuery { .. })
    ));
    assert_eq!(collection.len(), 10);
}

#[test]
fn missing_collection_is_an_error() {
    let store = seeded_store();
    assert!(matches!(store.collection("authors"), Err(TomeError::CollectionNotFound { .. })));
}

//! Integration tests for basic CRUD, bulk writes, global scopes and
//! category relations.

mod common;

use common::*;
use relmap_core::{ConstraintError, Error, Record, RecordState, Value};

fn category_batch(db: &relmap_core::Database, n: usize) -> Vec<Record> {
    let registry = db.registry();
    (0..n)
        .map(|i| {
            registry
                .instantiate_with(
                    "Category",
                    [
                        ("id", Value::from(format!("ID {}", i))),
                        ("name", Value::from(format!("Category {}", i))),
                        ("is_active", Value::from(true)),
                    ],
                )
                .unwrap()
        })
        .collect()
}

#[test]
fn test_insert() {
    let db = test_db();
    let registry = db.registry();

    let mut category = db.instantiate("Category").unwrap();
    assert_eq!(category.state(), RecordState::New);
    registry.set_attribute(&mut category, "id", "SMARTPHONE").unwrap();
    registry
        .set_attribute(&mut category, "name", "Samsung S10 PRO")
        .unwrap();

    db.save(&mut category).unwrap();
    assert_eq!(category.state(), RecordState::Persisted);
    assert!(!category.has_changes());
}

#[test]
fn test_insert_many() {
    let db = test_db();
    let mut categories = category_batch(&db, 10);

    let inserted = db.insert_many(&mut categories).unwrap();
    assert_eq!(inserted, 10);
    assert!(categories.iter().all(Record::exists));

    let total = db.query("Category").unwrap().count().unwrap();
    assert_eq!(total, 10);
}

#[test]
fn test_insert_many_is_all_or_nothing() {
    let db = test_db();
    let mut categories = category_batch(&db, 5);
    // Same key as the first record of the batch.
    categories.push(
        db.registry()
            .instantiate_with("Category", [("id", "ID 0"), ("name", "Duplicate")])
            .unwrap(),
    );

    let result = db.insert_many(&mut categories);
    assert!(matches!(
        result,
        Err(Error::ConstraintViolation(ConstraintError::DuplicateKey { .. }))
    ));
    assert!(categories.iter().all(|c| c.state() == RecordState::New));

    let total = db
        .query("Category")
        .unwrap()
        .without_global_scopes()
        .count()
        .unwrap();
    assert_eq!(total, 0);
}

#[test]
fn test_not_null_violation() {
    let db = test_db();
    let mut category = db
        .registry()
        .instantiate_with("Category", [("id", "FOOD")])
        .unwrap();

    let result = db.insert(&mut category);
    assert!(matches!(
        result,
        Err(Error::ConstraintViolation(ConstraintError::NotNull { ref column, .. })) if column == "name"
    ));
    assert!(!category.exists());
}

#[test]
fn test_insert_duplicate_key() {
    let db = test_db();
    seed_categories(&db);

    let result = db.create("Category", [("id", "FOOD"), ("name", "Again")]);
    assert!(matches!(
        result,
        Err(Error::ConstraintViolation(ConstraintError::DuplicateKey { .. }))
    ));
}

#[test]
fn test_missing_manual_key() {
    let db = test_db();
    let result = db.create("Category", [("name", "Nameless")]);
    assert!(matches!(result, Err(Error::MissingKey(ref e)) if e == "Category"));
}

#[test]
fn test_find() {
    let db = test_db();
    seed_categories(&db);

    let category = db.find("Category", "FOOD").unwrap().unwrap();
    assert_eq!(category.value("id"), Value::from("FOOD"));
    assert_eq!(category.value("name"), Value::from("Food"));
    assert_eq!(category.value("description"), Value::from("Food Category"));

    assert!(db.find("Category", "DRINK").unwrap().is_none());
}

#[test]
fn test_update() {
    let db = test_db();
    seed_categories(&db);

    let mut category = db.find("Category", "FOOD").unwrap().unwrap();
    db.registry()
        .set_attribute(&mut category, "name", "Food Updated")
        .unwrap();
    assert!(category.is_dirty("name"));

    assert!(db.update(&mut category).unwrap());
    assert!(!category.has_changes());
    // Nothing left to write.
    assert!(!db.update(&mut category).unwrap());

    let reloaded = db.find("Category", "FOOD").unwrap().unwrap();
    assert_eq!(reloaded.value("name"), Value::from("Food Updated"));
}

#[test]
fn test_primary_key_is_immutable() {
    let db = test_db();
    seed_categories(&db);

    let mut category = db.find("Category", "FOOD").unwrap().unwrap();
    let result = db.registry().set_attribute(&mut category, "id", "DRINK");
    assert!(matches!(result, Err(Error::ImmutableKey(_))));
    assert_eq!(
        db.registry().primary_key_of(&category).unwrap(),
        Some(Value::from("FOOD"))
    );
}

#[test]
fn test_select() {
    let db = test_db();
    let registry = db.registry();
    for i in 0..5 {
        let mut category = db.instantiate("Category").unwrap();
        registry
            .fill(
                &mut category,
                [
                    ("id", Value::from(format!("ID {}", i))),
                    ("name", Value::from(format!("Category {}", i))),
                    ("is_active", Value::from(true)),
                ],
            )
            .unwrap();
        db.save(&mut category).unwrap();
    }

    let categories = db
        .query("Category")
        .unwrap()
        .where_null("description")
        .get()
        .unwrap();
    assert_eq!(categories.len(), 5);

    for mut category in categories {
        assert!(category.value("description").is_null());
        registry
            .set_attribute(&mut category, "description", "Updated")
            .unwrap();
        assert!(db.update(&mut category).unwrap());
    }

    let remaining = db
        .query("Category")
        .unwrap()
        .where_null("description")
        .count()
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn test_update_many() {
    let db = test_db();
    db.insert_many(&mut category_batch(&db, 10)).unwrap();

    let updated = db
        .query("Category")
        .unwrap()
        .where_null("description")
        .update([("description", "Updated")])
        .unwrap();
    assert_eq!(updated, 10);

    let total = db
        .query("Category")
        .unwrap()
        .where_op("description", "=", "Updated")
        .count()
        .unwrap();
    assert_eq!(total, 10);
}

#[test]
fn test_update_many_rejects_unknown_column() {
    let db = test_db();
    db.insert_many(&mut category_batch(&db, 3)).unwrap();

    let result = db
        .query("Category")
        .unwrap()
        .update([("colour", "red")]);
    assert!(matches!(result, Err(Error::UnknownColumn { .. })));
}

#[test]
fn test_delete() {
    let db = test_db();
    seed_categories(&db);

    let mut category = db.find("Category", "FOOD").unwrap().unwrap();
    assert!(db.delete(&mut category).unwrap());
    assert_eq!(category.state(), RecordState::Deleted);

    let total = db.query("Category").unwrap().count().unwrap();
    assert_eq!(total, 0);
}

#[test]
fn test_delete_many() {
    let db = test_db();
    db.insert_many(&mut category_batch(&db, 10)).unwrap();
    assert_eq!(db.query("Category").unwrap().count().unwrap(), 10);

    let deleted = db
        .query("Category")
        .unwrap()
        .where_null("description")
        .delete()
        .unwrap();
    assert_eq!(deleted, 10);
    assert_eq!(db.query("Category").unwrap().count().unwrap(), 0);
}

#[test]
fn test_create() {
    let db = test_db();
    let mut category = db
        .registry()
        .instantiate_with(
            "Category",
            [
                ("id", "FOOD"),
                ("name", "Food"),
                ("description", "Food Category"),
            ],
        )
        .unwrap();
    db.save(&mut category).unwrap();

    assert!(db.registry().primary_key_of(&category).unwrap().is_some());
}

#[test]
fn test_create_using_query_builder() {
    let db = test_db();
    let category = db
        .create(
            "Category",
            [
                ("id", "FOOD"),
                ("name", "Food"),
                ("description", "Food Category"),
            ],
        )
        .unwrap();

    assert_eq!(category.value("id"), Value::from("FOOD"));
    assert!(category.exists());
}

#[test]
fn test_update_mass() {
    let db = test_db();
    seed_categories(&db);

    let mut category = db.find("Category", "FOOD").unwrap().unwrap();
    db.registry()
        .fill(
            &mut category,
            [
                ("name", "Food Updated"),
                ("description", "Food Category Updated"),
            ],
        )
        .unwrap();
    db.save(&mut category).unwrap();

    let reloaded = db.find("Category", "FOOD").unwrap().unwrap();
    assert_eq!(
        reloaded.value("description"),
        Value::from("Food Category Updated")
    );
}

#[test]
fn test_global_scope() {
    let db = test_db();
    db.create(
        "Category",
        [
            ("id", Value::from("FOOD")),
            ("name", Value::from("Food")),
            ("description", Value::from("Food Category")),
            ("is_active", Value::from(false)),
        ],
    )
    .unwrap();

    assert!(db.find("Category", "FOOD").unwrap().is_none());

    let category = db
        .query("Category")
        .unwrap()
        .without_scopes(&["is_active"])
        .find("FOOD")
        .unwrap();
    assert!(category.is_some());

    // The bypass lasts for one query only.
    assert_eq!(db.query("Category").unwrap().count().unwrap(), 0);
}

#[test]
fn test_global_scope_limits_bulk_writes() {
    let db = test_db();
    seed_categories(&db);
    db.create("Category", [("id", "HIDDEN"), ("name", "Hidden")])
        .unwrap();

    let updated = db
        .query("Category")
        .unwrap()
        .update([("description", "Touched")])
        .unwrap();
    assert_eq!(updated, 1);

    let hidden = db
        .query("Category")
        .unwrap()
        .without_global_scopes()
        .find("HIDDEN")
        .unwrap()
        .unwrap();
    assert!(hidden.value("description").is_null());
}

#[test]
fn test_one_to_many() {
    let db = test_db();
    seed_categories(&db);
    seed_products(&db);

    let category = db.find("Category", "FOOD").unwrap().unwrap();
    let products = db.resolver().many(&category, "products").unwrap();
    assert_eq!(products.len(), 2);
}

#[test]
fn test_has_many_through() {
    let db = test_db();
    seed_categories(&db);
    seed_products(&db);
    seed_customers(&db);
    seed_reviews(&db);

    let category = db.find("Category", "FOOD").unwrap().unwrap();
    let reviews = db.resolver().many(&category, "reviews").unwrap();
    assert_eq!(reviews.len(), 2);
    assert!(reviews.iter().all(|r| r.entity() == "Review"));
}

#[test]
fn test_query_relations() {
    let db = test_db();
    seed_categories(&db);
    seed_products(&db);

    let category = db.find("Category", "FOOD").unwrap().unwrap();
    let products = db
        .resolver()
        .query(&category, "products")
        .unwrap()
        .where_op("price", "=", 200i64)
        .get()
        .unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].value("id"), Value::from("2"));
}

#[test]
fn test_query_relations_aggregate() {
    let db = test_db();
    seed_categories(&db);
    seed_products(&db);

    let category = db.find("Category", "FOOD").unwrap().unwrap();
    let total = db
        .resolver()
        .query(&category, "products")
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(total, 2);
}

#[test]
fn test_unknown_entity_and_column() {
    let db = test_db();

    assert!(matches!(
        db.catalog().describe("Planet"),
        Err(Error::UnknownEntity(ref e)) if e == "Planet"
    ));
    assert!(matches!(db.query("Planet"), Err(Error::UnknownEntity(_))));

    let mut category = db.instantiate("Category").unwrap();
    let result = db.registry().set_attribute(&mut category, "colour", "red");
    assert!(matches!(result, Err(Error::UnknownColumn { .. })));

    let result = db.query("Category").unwrap().where_eq("colour", "red").get();
    assert!(matches!(result, Err(Error::UnknownColumn { .. })));
}

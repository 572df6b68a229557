//! Shared fixture: the store schema used by the integration suites.

#![allow(dead_code)]

use relmap_core::catalog::{
    Catalog, DefaultValue, EntityDef, FieldDef, KeyStrategy, OneOfMany, Predicate, RelationDef,
    ScalarType, SchemaBundle, ScopeDef, VirtualAttribute,
};
use relmap_core::storage::key::current_timestamp;
use relmap_core::{Database, Error, FilterExpr, Operator, Record, StorageConfig, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const WEEK_MICROS: i64 = 7 * 24 * 60 * 60 * 1_000_000;

/// Postal address stored in `Person.address` as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
}

impl Address {
    pub fn new(street: &str, city: &str, country: &str, postal_code: &str) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            country: country.into(),
            postal_code: postal_code.into(),
        }
    }
}

/// `Person.full_name`: upper-cased first name followed by the last name.
pub struct FullName;

impl VirtualAttribute for FullName {
    fn get(&self, record: &Record) -> Result<Value, Error> {
        let first = record.value("first_name");
        let last = record.value("last_name");
        Ok(Value::String(format!(
            "{} {}",
            first.as_str().unwrap_or_default().to_uppercase(),
            last.as_str().unwrap_or_default()
        )))
    }

    fn set(&self, value: Value) -> Result<Vec<(String, Value)>, Error> {
        let full = value.as_str().ok_or_else(|| Error::TypeMismatch {
            entity: "Person".into(),
            column: "full_name".into(),
            expected: "string".into(),
            actual: value.kind(),
        })?;
        let (first, last) = full.split_once(' ').unwrap_or((full, ""));
        Ok(vec![
            ("first_name".into(), Value::from(first.to_uppercase())),
            ("last_name".into(), Value::from(last)),
        ])
    }
}

pub fn store_schema() -> SchemaBundle {
    let category = EntityDef::new("Category", "id")
        .with_field(FieldDef::new("id", ScalarType::String))
        .with_field(FieldDef::new("name", ScalarType::String))
        .with_field(FieldDef::optional("description", ScalarType::String))
        .with_field(
            FieldDef::new("is_active", ScalarType::Bool).with_default(DefaultValue::Bool(false)),
        )
        .with_timestamps();

    let product = EntityDef::new("Product", "id")
        .with_field(FieldDef::new("id", ScalarType::String))
        .with_field(FieldDef::new("name", ScalarType::String))
        .with_field(FieldDef::optional("description", ScalarType::String))
        .with_field(FieldDef::new("price", ScalarType::Int64).with_default(DefaultValue::Int(0)))
        .with_field(FieldDef::new("stock", ScalarType::Int64).with_default(DefaultValue::Int(0)))
        .with_field(FieldDef::optional("category_id", ScalarType::String))
        .with_morph_alias("product");

    let customer = EntityDef::new("Customer", "id")
        .with_field(FieldDef::new("id", ScalarType::String))
        .with_field(FieldDef::new("name", ScalarType::String))
        .with_field(FieldDef::new("email", ScalarType::String))
        .with_morph_alias("customer");

    let wallet = EntityDef::new("Wallet", "id")
        .with_key_strategy(KeyStrategy::AutoIncrement)
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("customer_id", ScalarType::String))
        .with_field(FieldDef::new("amount", ScalarType::Int64));

    let virtual_account = EntityDef::new("VirtualAccount", "id")
        .with_key_strategy(KeyStrategy::AutoIncrement)
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("bank", ScalarType::String))
        .with_field(FieldDef::new("va_number", ScalarType::String))
        .with_field(FieldDef::new("wallet_id", ScalarType::Int64));

    let review = EntityDef::new("Review", "id")
        .with_key_strategy(KeyStrategy::AutoIncrement)
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("product_id", ScalarType::String))
        .with_field(FieldDef::new("customer_id", ScalarType::String))
        .with_field(FieldDef::new("rating", ScalarType::Int32))
        .with_field(FieldDef::optional("comment", ScalarType::String))
        .with_timestamps();

    let like = EntityDef::new("Like", "id")
        .with_key_strategy(KeyStrategy::AutoIncrement)
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("customer_id", ScalarType::String))
        .with_field(FieldDef::new("product_id", ScalarType::String))
        .with_timestamps();

    let image = EntityDef::new("Image", "id")
        .with_key_strategy(KeyStrategy::AutoIncrement)
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("url", ScalarType::String))
        .with_field(FieldDef::new("imageable_id", ScalarType::String))
        .with_field(FieldDef::new("imageable_type", ScalarType::String));

    let comment = EntityDef::new("Comment", "id")
        .with_key_strategy(KeyStrategy::AutoIncrement)
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("email", ScalarType::String))
        .with_field(
            FieldDef::new("title", ScalarType::String)
                .with_default(DefaultValue::String("Sample Title".into())),
        )
        .with_field(
            FieldDef::new("comment", ScalarType::String)
                .with_default(DefaultValue::String("Sample Comment".into())),
        )
        .with_field(FieldDef::optional("commentable_id", ScalarType::String))
        .with_field(FieldDef::optional("commentable_type", ScalarType::String))
        .with_timestamps();

    let voucher = EntityDef::new("Voucher", "id")
        .with_key_strategy(KeyStrategy::Uuid)
        .with_field(FieldDef::new("id", ScalarType::String))
        .with_field(FieldDef::new("name", ScalarType::String))
        .with_field(
            FieldDef::new("voucher_code", ScalarType::String).with_default(DefaultValue::AutoUuid),
        )
        .with_field(
            FieldDef::new("is_active", ScalarType::Bool).with_default(DefaultValue::Bool(false)),
        )
        .with_soft_delete()
        .with_timestamps()
        .with_morph_alias("voucher");

    let person = EntityDef::new("Person", "id")
        .with_key_strategy(KeyStrategy::AutoIncrement)
        .with_field(FieldDef::new("id", ScalarType::Int64))
        .with_field(FieldDef::new("first_name", ScalarType::String))
        .with_field(FieldDef::optional("last_name", ScalarType::String))
        .with_field(FieldDef::optional("address", ScalarType::Json))
        .with_timestamps()
        .with_virtual("full_name", FullName);

    let liked_last_week = Predicate::dynamic(|| {
        FilterExpr::compare(
            "created_at",
            Operator::Ge,
            Value::Timestamp(current_timestamp() - WEEK_MICROS),
        )
    });

    SchemaBundle::new()
        .with_entity(category)
        .with_entity(product)
        .with_entity(customer)
        .with_entity(wallet)
        .with_entity(virtual_account)
        .with_entity(review)
        .with_entity(like)
        .with_entity(image)
        .with_entity(comment)
        .with_entity(voucher)
        .with_entity(person)
        // Category
        .with_scope(ScopeDef::global(
            "is_active",
            "Category",
            FilterExpr::eq("is_active", true),
        ))
        .with_relation(RelationDef::has_many("products", "Category", "Product", "category_id"))
        .with_relation(
            RelationDef::has_many("cheapest_product", "Category", "Product", "category_id")
                .of_many(OneOfMany::Min("price".into())),
        )
        .with_relation(
            RelationDef::has_many("most_expensive_product", "Category", "Product", "category_id")
                .of_many(OneOfMany::Max("price".into())),
        )
        .with_relation(RelationDef::has_many_through(
            "reviews",
            "Category",
            "Review",
            "Product",
            "category_id",
            "product_id",
        ))
        // Product
        .with_relation(RelationDef::belongs_to("category", "Product", "Category", "category_id"))
        .with_relation(RelationDef::has_many("reviews", "Product", "Review", "product_id"))
        .with_relation(RelationDef::morph_one("image", "Product", "Image", "imageable"))
        .with_relation(RelationDef::morph_many("comments", "Product", "Comment", "commentable"))
        .with_relation(
            RelationDef::morph_many("latest_comment", "Product", "Comment", "commentable")
                .latest_of_many(),
        )
        .with_relation(
            RelationDef::morph_many("oldest_comment", "Product", "Comment", "commentable")
                .oldest_of_many(),
        )
        .with_relation(RelationDef::belongs_to_many(
            "liked_by_customers",
            "Product",
            "Customer",
            "Like",
            "product_id",
            "customer_id",
        ))
        // Customer
        .with_relation(RelationDef::has_one("wallet", "Customer", "Wallet", "customer_id"))
        .with_relation(RelationDef::has_one_through(
            "virtual_account",
            "Customer",
            "VirtualAccount",
            "Wallet",
            "customer_id",
            "wallet_id",
        ))
        .with_relation(RelationDef::has_many("reviews", "Customer", "Review", "customer_id"))
        .with_relation(RelationDef::belongs_to_many(
            "like_products",
            "Customer",
            "Product",
            "Like",
            "customer_id",
            "product_id",
        ))
        .with_relation(
            RelationDef::belongs_to_many(
                "like_products_last_week",
                "Customer",
                "Product",
                "Like",
                "customer_id",
                "product_id",
            )
            .with_pivot_filter(liked_last_week),
        )
        .with_relation(RelationDef::morph_one("image", "Customer", "Image", "imageable"))
        // Wallet
        .with_relation(RelationDef::belongs_to("customer", "Wallet", "Customer", "customer_id"))
        .with_relation(RelationDef::has_one("virtual_account", "Wallet", "VirtualAccount", "wallet_id"))
        .with_relation(RelationDef::belongs_to("wallet", "VirtualAccount", "Wallet", "wallet_id"))
        // Review
        .with_relation(RelationDef::belongs_to("product", "Review", "Product", "product_id"))
        .with_relation(RelationDef::belongs_to("customer", "Review", "Customer", "customer_id"))
        // Like (pivot model)
        .with_relation(RelationDef::belongs_to("customer", "Like", "Customer", "customer_id"))
        .with_relation(RelationDef::belongs_to("product", "Like", "Product", "product_id"))
        // Polymorphic inverses
        .with_relation(RelationDef::morph_to("imageable", "Image", "imageable"))
        .with_relation(RelationDef::morph_to("commentable", "Comment", "commentable"))
        // Voucher
        .with_scope(ScopeDef::local("active", "Voucher", FilterExpr::eq("is_active", true)))
        .with_scope(ScopeDef::local("non_active", "Voucher", FilterExpr::eq("is_active", false)))
        .with_relation(RelationDef::morph_many("comments", "Voucher", "Comment", "commentable"))
}

pub fn test_db() -> Database {
    let catalog = Arc::new(Catalog::new(store_schema()).unwrap());
    Database::open(StorageConfig::temporary(), catalog).unwrap()
}

pub fn seed_categories(db: &Database) {
    db.create(
        "Category",
        [
            ("id", Value::from("FOOD")),
            ("name", Value::from("Food")),
            ("description", Value::from("Food Category")),
            ("is_active", Value::from(true)),
        ],
    )
    .unwrap();
}

/// Two FOOD products: "1" priced 100 and out of stock, "2" priced 200.
pub fn seed_products(db: &Database) {
    db.create(
        "Product",
        [
            ("id", Value::from("1")),
            ("name", Value::from("Mangga")),
            ("description", Value::from("Product Mangga Description")),
            ("price", Value::from(100i64)),
            ("stock", Value::from(0i64)),
            ("category_id", Value::from("FOOD")),
        ],
    )
    .unwrap();
    db.create(
        "Product",
        [
            ("id", Value::from("2")),
            ("name", Value::from("Apel")),
            ("description", Value::from("Product Apel Description")),
            ("price", Value::from(200i64)),
            ("stock", Value::from(10i64)),
            ("category_id", Value::from("FOOD")),
        ],
    )
    .unwrap();
}

pub fn seed_customers(db: &Database) {
    db.create(
        "Customer",
        [
            ("id", "UCUP"),
            ("name", "Ucup Surucup"),
            ("email", "ucup@gmail.com"),
        ],
    )
    .unwrap();
}

pub fn seed_wallets(db: &Database) {
    db.create(
        "Wallet",
        [
            ("customer_id", Value::from("UCUP")),
            ("amount", Value::from(1_000_000i64)),
        ],
    )
    .unwrap();
}

pub fn seed_virtual_accounts(db: &Database) {
    let wallet = db
        .query("Wallet")
        .unwrap()
        .where_eq("customer_id", "UCUP")
        .first_or_fail()
        .unwrap();

    db.create(
        "VirtualAccount",
        [
            ("bank", Value::from("BCA")),
            ("va_number", Value::from("1234123432")),
            ("wallet_id", wallet.value("id")),
        ],
    )
    .unwrap();
}

pub fn seed_reviews(db: &Database) {
    for (product, rating) in [("1", 5), ("2", 3)] {
        db.create(
            "Review",
            [
                ("product_id", Value::from(product)),
                ("customer_id", Value::from("UCUP")),
                ("rating", Value::from(rating)),
                ("comment", Value::from("Bagus")),
            ],
        )
        .unwrap();
    }
}

pub fn seed_vouchers(db: &Database) {
    db.create(
        "Voucher",
        [("name", "Sample Voucher"), ("voucher_code", "130498712341")],
    )
    .unwrap();
}

pub fn seed_images(db: &Database) {
    db.create(
        "Image",
        [
            ("url", "https://ucup.com/image/1.jpg"),
            ("imageable_id", "UCUP"),
            ("imageable_type", "customer"),
        ],
    )
    .unwrap();
    db.create(
        "Image",
        [
            ("url", "https://ucup.com/image/2.jpg"),
            ("imageable_id", "1"),
            ("imageable_type", "product"),
        ],
    )
    .unwrap();
}

/// One comment on product "1" and one on the first voucher.
pub fn seed_comments(db: &Database) {
    let product = db.find("Product", "1").unwrap().unwrap();
    let voucher = db.query("Voucher").unwrap().first().unwrap().unwrap();

    for (owner_id, owner_type) in [
        (product.value("id"), "product"),
        (voucher.value("id"), "voucher"),
    ] {
        db.create(
            "Comment",
            [
                ("email", Value::from("ucup@gmail.com")),
                ("title", Value::from("Title")),
                ("commentable_id", owner_id),
                ("commentable_type", Value::from(owner_type)),
            ],
        )
        .unwrap();
    }
}

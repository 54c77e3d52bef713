//! Catalog records and seed data

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use suite_query::prelude::*;

/// A product category; top-level categories have no parent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Slug-style identifier
    pub id: String,
    /// Parent category; `None` for top-level categories
    pub parent_id: Option<String>,
    /// Display name
    pub name: String,
    /// Whether the category is shown to shoppers
    pub active: bool,
    /// Whether the category is promoted
    pub featured: bool,
    /// Soft-delete flag; never serialized
    #[serde(skip)]
    pub is_deleted: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Filled only when the `subcategories` include is requested
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<Category>,
}

impl Category {
    /// An active, non-featured category
    pub fn new(id: &str, parent_id: Option<&str>, name: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
            name: name.to_string(),
            active: true,
            featured: false,
            is_deleted: false,
            created_at,
            subcategories: Vec::new(),
        }
    }
}

impl Record for Category {
    fn field(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.clone().into()),
            "parent_id" => Some(self.parent_id.clone().into()),
            "name" => Some(self.name.clone().into()),
            "active" => Some(self.active.into()),
            "featured" => Some(self.featured.into()),
            "is_deleted" => Some(self.is_deleted.into()),
            "created_at" => Some(timestamp(&self.created_at)),
            _ => None,
        }
    }
}

impl Auditable for Category {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

/// A discount code attached to a category
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    /// Voucher identifier
    pub id: String,
    /// Category the voucher applies to
    pub category_id: String,
    /// Code entered at checkout
    pub code: String,
    /// Discount in whole percent
    pub discount_percent: i64,
    /// Whether the code can be redeemed
    pub active: bool,
    /// Whether the voucher is promoted
    pub featured: bool,
    /// Soft-delete flag; never serialized
    #[serde(skip)]
    pub is_deleted: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Record for Voucher {
    fn field(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.clone().into()),
            "category_id" => Some(self.category_id.clone().into()),
            "code" => Some(self.code.clone().into()),
            "discount_percent" => Some(self.discount_percent.into()),
            "active" => Some(self.active.into()),
            "featured" => Some(self.featured.into()),
            "is_deleted" => Some(self.is_deleted.into()),
            "created_at" => Some(timestamp(&self.created_at)),
            _ => None,
        }
    }
}

impl Auditable for Voucher {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

// Fixed-width RFC 3339 sorts the same as the instant it names
fn timestamp(at: &DateTime<Utc>) -> FilterValue {
    at.to_rfc3339_opts(SecondsFormat::Secs, true).into()
}

fn day(n: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_067_200 + n * 86_400, 0).unwrap_or_default()
}

/// Demo categories: three roots, their children, one deleted child
pub fn seed_categories() -> Vec<Category> {
    let mut electronics = Category::new("electronics", None, "Electronics", day(0));
    electronics.featured = true;
    let mut garden = Category::new("garden", None, "Garden", day(2));
    garden.active = false;
    let mut lighting = Category::new("lighting", Some("home"), "Lighting", day(7));
    lighting.is_deleted = true;

    vec![
        electronics,
        Category::new("home", None, "Home", day(1)),
        garden,
        Category::new("phones", Some("electronics"), "Phones", day(3)),
        Category::new("laptops", Some("electronics"), "Laptops", day(4)),
        Category::new("audio", Some("electronics"), "Audio", day(5)),
        Category::new("kitchen", Some("home"), "Kitchen", day(6)),
        lighting,
    ]
}

/// Demo vouchers spread over the leaf categories
pub fn seed_vouchers() -> Vec<Voucher> {
    const CATEGORIES: [&str; 4] = ["phones", "laptops", "audio", "kitchen"];

    (1..=30)
        .map(|n: i64| Voucher {
            id: format!("voucher-{n:02}"),
            category_id: CATEGORIES[(n as usize) % CATEGORIES.len()].to_string(),
            code: format!("SAVE{n:02}"),
            discount_percent: 5 + (n % 6) * 5,
            active: n % 5 != 0,
            featured: n % 7 == 0,
            is_deleted: n == 13,
            created_at: day(n),
        })
        .collect()
}

//! List specifications built from page parameters
//!
//! Each endpoint honours a subset of [`PageParameters`]; absent or blank
//! values leave the matching clause out.

use suite_query::prelude::*;

use crate::models::{Category, Voucher};

/// Include path attaching each category's live children
pub const SUBCATEGORIES: &str = "subcategories";

/// Default page size for the voucher listing
pub const VOUCHER_PAGE_SIZE: u64 = 25;

/// Sortable category fields
pub const CATEGORY_SORT_FIELDS: &[SortField] = &[
    SortField::new("Id", "id"),
    SortField::new("Name", "name"),
    SortField::new("CreatedAt", "created_at"),
];

/// Sortable voucher fields
pub const VOUCHER_SORT_FIELDS: &[SortField] = &[
    SortField::new("Id", "id"),
    SortField::new("Code", "code"),
    SortField::new("Discount", "discount_percent"),
    SortField::new("CreatedAt", "created_at"),
];

/// Categories filtered by parent, flags and name, with subcategories attached
///
/// # Errors
///
/// Returns a validation error for an unknown `orderBy`.
pub fn category_specification(params: &PageParameters) -> Result<Specification<Category>> {
    let order = params.ordering(CATEGORY_SORT_FIELDS)?;

    Ok(Specification::<Category>::builder()
        .and_when_text(params.parent_id.as_deref(), |id| {
            FilterCondition::eq("parent_id", id)
        })
        .and_when(params.active, |active| FilterCondition::eq("active", active))
        .and_when(params.featured, |featured| {
            FilterCondition::eq("featured", featured)
        })
        .and_when(params.search_text(), |text| {
            FilterCondition::contains("name", text)
        })
        .include(SUBCATEGORIES)
        .order_by(order)
        .build())
}

/// Vouchers filtered by category, flags and code
///
/// # Errors
///
/// Returns a validation error for an unknown `orderBy`.
pub fn voucher_specification(params: &PageParameters) -> Result<Specification<Voucher>> {
    let order = params.ordering(VOUCHER_SORT_FIELDS)?;

    Ok(Specification::<Voucher>::builder()
        .and_when_text(params.category_id.as_deref(), |id| {
            FilterCondition::eq("category_id", id)
        })
        .and_when(params.active, |active| FilterCondition::eq("active", active))
        .and_when(params.featured, |featured| {
            FilterCondition::eq("featured", featured)
        })
        .and_when(params.search_text(), |text| {
            FilterCondition::contains("code", text)
        })
        .order_by(order)
        .build())
}

/// Expander for [`SUBCATEGORIES`]: children of each page item, by name
pub fn attach_subcategories(page: &mut [Category], all: &[Category]) -> SourceResult<()> {
    for category in page.iter_mut() {
        let mut children: Vec<Category> = all
            .iter()
            .filter(|child| !child.is_deleted())
            .filter(|child| child.parent_id.as_deref() == Some(category.id.as_str()))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        category.subcategories = children;
    }
    Ok(())
}

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use storefront::schema::wishlist_items;
use uuid::Uuid;

use crate::product::models::{Product, ProductVariant};

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = wishlist_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WishlistItem {
    pub id: i32,
    pub user_id: Uuid,
    pub product_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = wishlist_items)]
pub struct NewWishlistItem {
    pub user_id: Uuid,
    pub product_id: Option<i32>,
    pub variant_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AddWishlistPayload {
    pub product: Option<i32>,
    pub variant: Option<i32>,
}

#[derive(Serialize)]
pub struct WishlistProductRef {
    pub id: i32,
    pub name: String,
}

/// Product-entry views carry the whole product; variant-entry views only
/// name the variant's parent.
#[derive(Serialize)]
#[serde(untagged)]
pub enum WishlistProduct {
    Full(Product),
    Summary(WishlistProductRef),
}

#[derive(Serialize)]
pub struct WishlistEntryView {
    pub id: i32,
    pub product: Option<WishlistProduct>,
    pub variant: Option<ProductVariant>,
    pub price: BigDecimal,
    pub created_at: NaiveDateTime,
}

use std::collections::HashMap;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{Value, json};
use storefront::schema::{product_variants, products, wishlist_items};

use super::models::{
    AddWishlistPayload, NewWishlistItem, WishlistEntryView, WishlistItem, WishlistProduct,
    WishlistProductRef,
};
use crate::auth::models::AccessTokenClaims;
use crate::product::models::{LineRef, Product, ProductVariant};
use crate::state::AppState;
use crate::utils::error::{ApiError, is_foreign_key_violation, is_unique_violation};
use crate::utils::types::Conn;

pub async fn add_entry(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Json(payload): Json<AddWishlistPayload>,
) -> Result<(StatusCode, Json<WishlistEntryView>), ApiError> {
    let user_id = claims.user_id()?;

    let line = LineRef::from_ids(payload.product, payload.variant)?;

    let mut conn = state.pool.get().await?;

    let new_entry = NewWishlistItem {
        user_id,
        product_id: line.product_id(),
        variant_id: line.variant_id(),
    };

    // Existence of the target and duplicate prevention both fall out of
    // the constraints; translate them instead of pre-querying.
    let entry = diesel::insert_into(wishlist_items::table)
        .values(&new_entry)
        .returning(WishlistItem::as_returning())
        .get_result::<WishlistItem>(&mut conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("already in the wishlist".to_owned())
            } else if is_foreign_key_violation(&e) {
                match line {
                    LineRef::Product(_) => ApiError::not_found("product"),
                    LineRef::Variant(_) => ApiError::not_found("variant"),
                }
            } else {
                e.into()
            }
        })?;

    let view = entry_view(&mut conn, entry).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_entries(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
) -> Result<Json<Vec<WishlistEntryView>>, ApiError> {
    let user_id = claims.user_id()?;

    let mut conn = state.pool.get().await?;

    let entries = wishlist_items::table
        .filter(wishlist_items::user_id.eq(user_id))
        .order(wishlist_items::created_at.desc())
        .select(WishlistItem::as_select())
        .load::<WishlistItem>(&mut conn)
        .await?;

    let product_ids: Vec<i32> = entries.iter().filter_map(|e| e.product_id).collect();
    let variant_ids: Vec<i32> = entries.iter().filter_map(|e| e.variant_id).collect();

    let products = load_products(&mut conn, &product_ids).await?;
    let variants = load_variants(&mut conn, &variant_ids).await?;

    let parent_ids: Vec<i32> = variants.values().map(|v| v.product_id).collect();
    let parents = load_products(&mut conn, &parent_ids).await?;

    let mut res = Vec::with_capacity(entries.len());
    for entry in entries {
        res.push(assemble_view(entry, &products, &variants, &parents)?);
    }

    Ok(Json(res))
}

pub async fn remove_entry(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let user_id = claims.user_id()?;

    let mut conn = state.pool.get().await?;

    let deleted = diesel::delete(
        wishlist_items::table
            .filter(wishlist_items::id.eq(id))
            .filter(wishlist_items::user_id.eq(user_id)),
    )
    .execute(&mut conn)
    .await?;

    if deleted == 0 {
        return Err(ApiError::not_found("wishlist entry"));
    }

    Ok(Json(json!({ "message": "Item removed from wishlist" })))
}

async fn load_products(
    conn: &mut Conn<'_>,
    ids: &[i32],
) -> Result<HashMap<i32, Product>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = products::table
        .filter(products::id.eq_any(ids))
        .select(Product::as_select())
        .load::<Product>(conn)
        .await?;

    Ok(rows.into_iter().map(|p| (p.id, p)).collect())
}

async fn load_variants(
    conn: &mut Conn<'_>,
    ids: &[i32],
) -> Result<HashMap<i32, ProductVariant>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = product_variants::table
        .filter(product_variants::id.eq_any(ids))
        .select(ProductVariant::as_select())
        .load::<ProductVariant>(conn)
        .await?;

    Ok(rows.into_iter().map(|v| (v.id, v)).collect())
}

async fn entry_view(conn: &mut Conn<'_>, entry: WishlistItem) -> Result<WishlistEntryView, ApiError> {
    let products = load_products(conn, &entry.product_id.into_iter().collect::<Vec<_>>()).await?;
    let variants = load_variants(conn, &entry.variant_id.into_iter().collect::<Vec<_>>()).await?;

    let parent_ids: Vec<i32> = variants.values().map(|v| v.product_id).collect();
    let parents = load_products(conn, &parent_ids).await?;

    assemble_view(entry, &products, &variants, &parents)
}

fn assemble_view(
    entry: WishlistItem,
    products: &HashMap<i32, Product>,
    variants: &HashMap<i32, ProductVariant>,
    parents: &HashMap<i32, Product>,
) -> Result<WishlistEntryView, ApiError> {
    let dangling = || ApiError::Internal("wishlist entry references nothing".to_owned());

    if let Some(variant_id) = entry.variant_id {
        let variant = variants.get(&variant_id).ok_or_else(dangling)?;
        let parent = parents.get(&variant.product_id).ok_or_else(dangling)?;

        return Ok(WishlistEntryView {
            id: entry.id,
            product: Some(WishlistProduct::Summary(WishlistProductRef {
                id: parent.id,
                name: parent.name.clone(),
            })),
            variant: Some(variant.clone()),
            price: variant.price.clone(),
            created_at: entry.created_at,
        });
    }

    let product_id = entry.product_id.ok_or_else(dangling)?;
    let product = products.get(&product_id).ok_or_else(dangling)?;

    Ok(WishlistEntryView {
        id: entry.id,
        product: Some(WishlistProduct::Full(product.clone())),
        variant: None,
        price: product.base_price.clone(),
        created_at: entry.created_at,
    })
}

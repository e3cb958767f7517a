use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use bigdecimal::{BigDecimal, Zero};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{Value, json};
use storefront::schema::{product_variants, products};
use validator::Validate;

use super::models::{
    NewProduct, NewProductVariant, Product, ProductVariant, ProductWithVariants, SearchParams,
    UpdateProduct, UpdateProductVariant,
};
use crate::auth::models::AccessTokenClaims;
use crate::state::AppState;
use crate::utils::error::{ApiError, is_foreign_key_violation};

pub async fn get_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ProductWithVariants>>, ApiError> {
    let mut conn = state.pool.get().await?;

    let mut query = products::table
        .select(Product::as_select())
        .order(products::created_at.desc())
        .into_boxed();

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query = query.filter(
            products::name
                .ilike(pattern.clone())
                .or(products::description.ilike(pattern)),
        );
    }

    let items = query.load::<Product>(&mut conn).await?;

    let variants = ProductVariant::belonging_to(&items)
        .select(ProductVariant::as_select())
        .load::<ProductVariant>(&mut conn)
        .await?
        .grouped_by(&items);

    let res = items
        .into_iter()
        .zip(variants)
        .map(|(product, variants)| ProductWithVariants { product, variants })
        .collect();

    Ok(Json(res))
}

pub async fn get_product_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductWithVariants>, ApiError> {
    let mut conn = state.pool.get().await?;

    let product = products::table
        .find(id)
        .select(Product::as_select())
        .first::<Product>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("product"))?;

    let variants = ProductVariant::belonging_to(&product)
        .select(ProductVariant::as_select())
        .load::<ProductVariant>(&mut conn)
        .await?;

    Ok(Json(ProductWithVariants { product, variants }))
}

pub async fn create_product(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Json(payload): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    claims.require_admin()?;
    payload.validate()?;

    if payload.base_price < BigDecimal::zero() {
        return Err(ApiError::Validation("base_price must not be negative".to_owned()));
    }

    let mut conn = state.pool.get().await?;

    let res = diesel::insert_into(products::table)
        .values(&payload)
        .returning(Product::as_returning())
        .get_result::<Product>(&mut conn)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::Validation("unknown category".to_owned())
            } else {
                e.into()
            }
        })?;

    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn update_product(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    claims.require_admin()?;

    if payload.is_empty() {
        return Err(ApiError::Validation("no fields to update".to_owned()));
    }
    if payload
        .base_price
        .as_ref()
        .is_some_and(|p| *p < BigDecimal::zero())
    {
        return Err(ApiError::Validation("base_price must not be negative".to_owned()));
    }

    let mut conn = state.pool.get().await?;

    let res = diesel::update(products::table.find(id))
        .set(&payload)
        .returning(Product::as_returning())
        .get_result::<Product>(&mut conn)
        .await
        .optional()
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::Validation("unknown category".to_owned())
            } else {
                ApiError::from(e)
            }
        })?
        .ok_or_else(|| ApiError::not_found("product"))?;

    Ok(Json(res))
}

pub async fn delete_product(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    claims.require_admin()?;

    let mut conn = state.pool.get().await?;

    let deleted = diesel::delete(products::table.find(id))
        .execute(&mut conn)
        .await?;

    if deleted == 0 {
        return Err(ApiError::not_found("product"));
    }

    Ok(Json(json!({ "message": format!("{} deleted", id) })))
}

pub async fn get_variants(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ProductVariant>>, ApiError> {
    let mut conn = state.pool.get().await?;

    let mut query = product_variants::table
        .select(ProductVariant::as_select())
        .order(product_variants::created_at.desc())
        .into_boxed();

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query = query.filter(
            product_variants::color
                .ilike(pattern.clone())
                .or(product_variants::description.ilike(pattern)),
        );
    }

    let res = query.load::<ProductVariant>(&mut conn).await?;

    Ok(Json(res))
}

pub async fn get_variant_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductVariant>, ApiError> {
    let mut conn = state.pool.get().await?;

    let res = product_variants::table
        .find(id)
        .select(ProductVariant::as_select())
        .first::<ProductVariant>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("variant"))?;

    Ok(Json(res))
}

pub async fn create_variant(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Json(payload): Json<NewProductVariant>,
) -> Result<(StatusCode, Json<ProductVariant>), ApiError> {
    claims.require_admin()?;
    payload.validate()?;

    if payload.price < BigDecimal::zero() {
        return Err(ApiError::Validation("price must not be negative".to_owned()));
    }

    let mut conn = state.pool.get().await?;

    let res = diesel::insert_into(product_variants::table)
        .values(&payload)
        .returning(ProductVariant::as_returning())
        .get_result::<ProductVariant>(&mut conn)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::Validation("unknown product".to_owned())
            } else {
                e.into()
            }
        })?;

    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn update_variant(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductVariant>,
) -> Result<Json<ProductVariant>, ApiError> {
    claims.require_admin()?;

    if payload.is_empty() {
        return Err(ApiError::Validation("no fields to update".to_owned()));
    }
    if payload
        .price
        .as_ref()
        .is_some_and(|p| *p < BigDecimal::zero())
    {
        return Err(ApiError::Validation("price must not be negative".to_owned()));
    }

    let mut conn = state.pool.get().await?;

    let res = diesel::update(product_variants::table.find(id))
        .set(&payload)
        .returning(ProductVariant::as_returning())
        .get_result::<ProductVariant>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("variant"))?;

    Ok(Json(res))
}

pub async fn delete_variant(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    claims.require_admin()?;

    let mut conn = state.pool.get().await?;

    let deleted = diesel::delete(product_variants::table.find(id))
        .execute(&mut conn)
        .await?;

    if deleted == 0 {
        return Err(ApiError::not_found("variant"));
    }

    Ok(Json(json!({ "message": format!("{} deleted", id) })))
}

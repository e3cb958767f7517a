use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{Value, json};
use storefront::schema::categories;
use validator::Validate;

use super::models::{Category, NewCategory, UpdateCategory};
use crate::auth::models::AccessTokenClaims;
use crate::product::models::SearchParams;
use crate::state::AppState;
use crate::utils::error::{ApiError, is_unique_violation};

pub async fn get_categories(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let mut conn = state.pool.get().await?;

    let mut query = categories::table
        .select(Category::as_select())
        .order(categories::created_at.desc())
        .into_boxed();

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query = query.filter(
            categories::name
                .ilike(pattern.clone())
                .or(categories::description.ilike(pattern)),
        );
    }

    let res = query.load::<Category>(&mut conn).await?;

    Ok(Json(res))
}

pub async fn get_category_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>, ApiError> {
    let mut conn = state.pool.get().await?;

    let res = categories::table
        .find(id)
        .select(Category::as_select())
        .first::<Category>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("category"))?;

    Ok(Json(res))
}

pub async fn create_category(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Json(payload): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    claims.require_admin()?;
    payload.validate()?;

    let mut conn = state.pool.get().await?;

    let res = diesel::insert_into(categories::table)
        .values(&payload)
        .returning(Category::as_returning())
        .get_result::<Category>(&mut conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("category name already exists".to_owned())
            } else {
                e.into()
            }
        })?;

    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn update_category(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategory>,
) -> Result<Json<Category>, ApiError> {
    claims.require_admin()?;

    if payload.is_empty() {
        return Err(ApiError::Validation("no fields to update".to_owned()));
    }

    let mut conn = state.pool.get().await?;

    let res = diesel::update(categories::table.find(id))
        .set(&payload)
        .returning(Category::as_returning())
        .get_result::<Category>(&mut conn)
        .await
        .optional()
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("category name already exists".to_owned())
            } else {
                ApiError::from(e)
            }
        })?
        .ok_or_else(|| ApiError::not_found("category"))?;

    Ok(Json(res))
}

pub async fn delete_category(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    claims.require_admin()?;

    let mut conn = state.pool.get().await?;

    let deleted = diesel::delete(categories::table.find(id))
        .execute(&mut conn)
        .await?;

    if deleted == 0 {
        return Err(ApiError::not_found("category"));
    }

    Ok(Json(json!({ "message": format!("{} deleted", id) })))
}

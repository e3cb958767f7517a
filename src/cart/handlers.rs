use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{Value, json};
use storefront::schema::{cart_items, carts, product_variants, products};
use uuid::Uuid;

use super::models::{
    AddItemPayload, Cart, CartItem, CartItemView, CartView, NewCart, NewCartItem,
    UpdateItemPayload, cart_total, ensure_valid_quantity, line_unit_price,
};
use crate::auth::models::AccessTokenClaims;
use crate::product::models::{LineRef, Product, ProductVariant};
use crate::state::AppState;
use crate::utils::error::{ApiError, is_unique_violation};
use crate::utils::types::Conn;

pub async fn get_cart(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
) -> Result<Json<CartView>, ApiError> {
    let user_id = claims.user_id()?;

    let mut conn = state.pool.get().await?;

    let cart = get_or_create_cart(&mut conn, user_id).await?;
    let lines = priced_lines(&mut conn, cart.id).await?;

    let mut items = Vec::with_capacity(lines.len());
    for (item, product, variant) in lines {
        items.push(item_view(item, product, variant)?);
    }

    let total_amount = cart_total(items.iter().map(|i| (&i.unit_price, i.quantity)));

    Ok(Json(CartView {
        id: cart.id,
        items,
        total_amount,
    }))
}

pub async fn add_item(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Json(payload): Json<AddItemPayload>,
) -> Result<(StatusCode, Json<CartItemView>), ApiError> {
    let user_id = claims.user_id()?;

    ensure_valid_quantity(payload.quantity)?;

    let line = LineRef::from_ids(payload.product, payload.variant)?;

    let mut conn = state.pool.get().await?;

    // Resolve the reference up front; a missing target is the caller's
    // mistake, not a database error.
    let (product, variant) = load_line_target(&mut conn, line).await?;

    let cart = get_or_create_cart(&mut conn, user_id).await?;
    let item = upsert_line(&mut conn, cart.id, line, payload.quantity).await?;

    Ok((
        StatusCode::CREATED,
        Json(item_view(item, product, variant)?),
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<Json<CartItemView>, ApiError> {
    let user_id = claims.user_id()?;

    ensure_valid_quantity(payload.quantity)?;

    let mut conn = state.pool.get().await?;

    let cart = user_cart(&mut conn, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cart item"))?;

    let item = diesel::update(
        cart_items::table
            .filter(cart_items::id.eq(id))
            .filter(cart_items::cart_id.eq(cart.id)),
    )
    .set(cart_items::quantity.eq(payload.quantity))
    .returning(CartItem::as_returning())
    .get_result::<CartItem>(&mut conn)
    .await
    .optional()?
    .ok_or_else(|| ApiError::not_found("cart item"))?;

    let (product, variant) = load_line_detail(&mut conn, &item).await?;

    Ok(Json(item_view(item, product, variant)?))
}

pub async fn remove_item(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let user_id = claims.user_id()?;

    let mut conn = state.pool.get().await?;

    let cart = user_cart(&mut conn, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cart item"))?;

    let deleted = diesel::delete(
        cart_items::table
            .filter(cart_items::id.eq(id))
            .filter(cart_items::cart_id.eq(cart.id)),
    )
    .execute(&mut conn)
    .await?;

    if deleted == 0 {
        return Err(ApiError::not_found("cart item"));
    }

    Ok(Json(json!({ "message": "Item removed from cart" })))
}

/// The cart is created lazily on first access; creation races resolve on
/// the unique user index.
pub async fn get_or_create_cart(conn: &mut Conn<'_>, user_id: Uuid) -> Result<Cart, ApiError> {
    diesel::insert_into(carts::table)
        .values(&NewCart { user_id })
        .on_conflict(carts::user_id)
        .do_nothing()
        .execute(conn)
        .await?;

    let cart = carts::table
        .filter(carts::user_id.eq(user_id))
        .select(Cart::as_select())
        .first::<Cart>(conn)
        .await?;

    Ok(cart)
}

pub async fn user_cart(conn: &mut Conn<'_>, user_id: Uuid) -> Result<Option<Cart>, ApiError> {
    let cart = carts::table
        .filter(carts::user_id.eq(user_id))
        .select(Cart::as_select())
        .first::<Cart>(conn)
        .await
        .optional()?;

    Ok(cart)
}

/// Cart lines with their product/variant rows, oldest first. Prices come
/// from the catalog at read time, never from the line itself.
pub async fn priced_lines(
    conn: &mut Conn<'_>,
    cart_id: i32,
) -> Result<Vec<(CartItem, Option<Product>, Option<ProductVariant>)>, ApiError> {
    let rows = cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .left_join(products::table)
        .left_join(product_variants::table)
        .select((
            CartItem::as_select(),
            Option::<Product>::as_select(),
            Option::<ProductVariant>::as_select(),
        ))
        .order(cart_items::added_at.asc())
        .load::<(CartItem, Option<Product>, Option<ProductVariant>)>(conn)
        .await?;

    Ok(rows)
}

/// Adds `quantity` to an existing matching line with a single atomic
/// update, falling back to an insert for a new line. If a concurrent
/// request wins the insert race on the unique index, the increment is
/// retried against the winning row.
async fn upsert_line(
    conn: &mut Conn<'_>,
    cart_id: i32,
    line: LineRef,
    quantity: i32,
) -> Result<CartItem, ApiError> {
    if let Some(item) = increment_line(conn, cart_id, line, quantity).await? {
        return Ok(item);
    }

    let new_item = NewCartItem {
        cart_id,
        product_id: line.product_id(),
        variant_id: line.variant_id(),
        quantity,
    };

    match diesel::insert_into(cart_items::table)
        .values(&new_item)
        .returning(CartItem::as_returning())
        .get_result::<CartItem>(conn)
        .await
    {
        Ok(item) => Ok(item),
        Err(e) if is_unique_violation(&e) => increment_line(conn, cart_id, line, quantity)
            .await?
            .ok_or_else(|| ApiError::Internal("cart line vanished during upsert".to_owned())),
        Err(e) => Err(e.into()),
    }
}

async fn increment_line(
    conn: &mut Conn<'_>,
    cart_id: i32,
    line: LineRef,
    quantity: i32,
) -> Result<Option<CartItem>, ApiError> {
    let res = match line {
        LineRef::Product(id) => {
            diesel::update(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart_id))
                    .filter(cart_items::product_id.eq(id))
                    .filter(cart_items::variant_id.is_null()),
            )
            .set(cart_items::quantity.eq(cart_items::quantity + quantity))
            .returning(CartItem::as_returning())
            .get_result::<CartItem>(conn)
            .await
        }
        LineRef::Variant(id) => {
            diesel::update(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart_id))
                    .filter(cart_items::variant_id.eq(id))
                    .filter(cart_items::product_id.is_null()),
            )
            .set(cart_items::quantity.eq(cart_items::quantity + quantity))
            .returning(CartItem::as_returning())
            .get_result::<CartItem>(conn)
            .await
        }
    };

    res.optional().map_err(ApiError::from)
}

async fn load_line_target(
    conn: &mut Conn<'_>,
    line: LineRef,
) -> Result<(Option<Product>, Option<ProductVariant>), ApiError> {
    match line {
        LineRef::Product(id) => {
            let product = products::table
                .find(id)
                .select(Product::as_select())
                .first::<Product>(conn)
                .await
                .optional()?
                .ok_or_else(|| ApiError::not_found("product"))?;
            Ok((Some(product), None))
        }
        LineRef::Variant(id) => {
            let variant = product_variants::table
                .find(id)
                .select(ProductVariant::as_select())
                .first::<ProductVariant>(conn)
                .await
                .optional()?
                .ok_or_else(|| ApiError::not_found("variant"))?;
            Ok((None, Some(variant)))
        }
    }
}

async fn load_line_detail(
    conn: &mut Conn<'_>,
    item: &CartItem,
) -> Result<(Option<Product>, Option<ProductVariant>), ApiError> {
    let line = LineRef::from_ids(item.product_id, item.variant_id)
        .map_err(|_| ApiError::Internal("cart line references nothing".to_owned()))?;
    load_line_target(conn, line).await
}

fn item_view(
    item: CartItem,
    product: Option<Product>,
    variant: Option<ProductVariant>,
) -> Result<CartItemView, ApiError> {
    let unit_price = line_unit_price(product.as_ref(), variant.as_ref())
        .ok_or_else(|| ApiError::Internal("cart line references nothing".to_owned()))?;
    let subtotal = &unit_price * bigdecimal::BigDecimal::from(item.quantity);

    Ok(CartItemView {
        id: item.id,
        product: product.map(Into::into),
        variant: variant.map(Into::into),
        quantity: item.quantity,
        unit_price,
        subtotal,
    })
}

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{Value, json};
use storefront::schema::orders;

use super::models::{
    CreateOrderResponse, NewOrder, Order, OrderStatus, VerifyPaymentPayload, to_minor_units,
};
use crate::auth::models::AccessTokenClaims;
use crate::cart::handlers::{priced_lines, user_cart};
use crate::cart::models::{cart_total, line_unit_price};
use crate::state::AppState;
use crate::utils::error::ApiError;

pub async fn create_order(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let user_id = claims.user_id()?;

    let mut conn = state.pool.get().await?;

    let cart = user_cart(&mut conn, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cart"))?;

    let lines = priced_lines(&mut conn, cart.id).await?;
    if lines.is_empty() {
        return Err(ApiError::Validation("cart is empty".to_owned()));
    }

    let mut pairs = Vec::with_capacity(lines.len());
    for (item, product, variant) in &lines {
        let price = line_unit_price(product.as_ref(), variant.as_ref())
            .ok_or_else(|| ApiError::Internal("cart line references nothing".to_owned()))?;
        pairs.push((price, item.quantity));
    }

    let total = cart_total(pairs.iter().map(|(price, quantity)| (price, *quantity)));
    let amount_minor = to_minor_units(&total)?;

    let receipt = format!("cart-{}", cart.id);
    let gateway_order = state.gateway.create_order(amount_minor, &receipt).await?;

    let new_order = NewOrder {
        user_id,
        cart_id: Some(cart.id),
        gateway_order_id: gateway_order.id,
        amount: total,
        status: OrderStatus::Pending.as_str().to_owned(),
    };

    let order = diesel::insert_into(orders::table)
        .values(&new_order)
        .returning(Order::as_returning())
        .get_result::<Order>(&mut conn)
        .await?;

    tracing::info!(
        order_id = order.id,
        gateway_order_id = %order.gateway_order_id,
        amount = %order.amount,
        "order created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: state.gateway.currency().to_owned(),
            gateway_order_id: order.gateway_order_id,
            gateway_key: state.gateway.key_id().to_owned(),
        }),
    ))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Json(payload): Json<VerifyPaymentPayload>,
) -> Result<Json<Value>, ApiError> {
    let user_id = claims.user_id()?;

    if !state
        .gateway
        .verify_signature(&payload.order_id, &payload.payment_id, &payload.signature)
    {
        tracing::warn!(
            gateway_order_id = %payload.order_id,
            %user_id,
            "rejected payment callback with bad signature"
        );
        return Err(ApiError::Validation("invalid payment signature".to_owned()));
    }

    let mut conn = state.pool.get().await?;

    let order = orders::table
        .filter(orders::gateway_order_id.eq(&payload.order_id))
        .select(Order::as_select())
        .first::<Order>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("order"))?;

    if order.status != OrderStatus::Pending.as_str() {
        return Err(ApiError::Conflict("order already finalized".to_owned()));
    }

    // The status filter keeps the transition one-shot even when two
    // callbacks race.
    let updated = diesel::update(
        orders::table
            .find(order.id)
            .filter(orders::status.eq(OrderStatus::Pending.as_str())),
    )
    .set((
        orders::gateway_payment_id.eq(&payload.payment_id),
        orders::gateway_signature.eq(&payload.signature),
        orders::status.eq(OrderStatus::Paid.as_str()),
    ))
    .execute(&mut conn)
    .await?;

    if updated == 0 {
        return Err(ApiError::Conflict("order already finalized".to_owned()));
    }

    tracing::info!(order_id = order.id, "payment verified");

    Ok(Json(json!({ "message": "Payment verified successfully" })))
}

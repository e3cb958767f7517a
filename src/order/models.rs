use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use storefront::schema::orders;
use uuid::Uuid;

use crate::utils::error::ApiError;

/// `pending -> paid` and `pending -> failed` are the only transitions;
/// both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq, Serialize)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub id: i32,
    pub user_id: Uuid,
    pub cart_id: Option<i32>,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub amount: BigDecimal,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub cart_id: Option<i32>,
    pub gateway_order_id: String,
    pub amount: BigDecimal,
    pub status: String,
}

#[derive(Serialize)]
pub struct CreateOrderResponse {
    pub order_id: i32,
    pub amount: BigDecimal,
    pub currency: String,
    pub gateway_order_id: String,
    pub gateway_key: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentPayload {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Converts a money amount to the gateway's smallest currency unit.
/// Amounts carry at most two fraction digits, so the scaling is exact.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, ApiError> {
    (amount * BigDecimal::from(100))
        .with_scale(0)
        .to_i64()
        .ok_or_else(|| ApiError::Internal("order amount out of range".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn minor_units_scale_by_hundred() {
        let cases = [("350", 35_000), ("12.34", 1_234), ("0.99", 99), ("0", 0)];
        for (amount, expected) in cases {
            let amount = BigDecimal::from_str(amount).unwrap();
            assert_eq!(to_minor_units(&amount).unwrap(), expected);
        }
    }

    #[test]
    fn status_round_trips_through_storage() {
        for status in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Failed] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }
}

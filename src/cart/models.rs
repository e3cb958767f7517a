use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use storefront::schema::{cart_items, carts};
use uuid::Uuid;

use crate::product::models::{Product, ProductVariant};
use crate::utils::error::ApiError;

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Cart {
    pub id: i32,
    pub user_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = carts)]
pub struct NewCart {
    pub user_id: Uuid,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, PartialEq)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(Cart))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItem {
    pub id: i32,
    pub cart_id: i32,
    pub product_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    pub added_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItem {
    pub cart_id: i32,
    pub product_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddItemPayload {
    pub product: Option<i32>,
    pub variant: Option<i32>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemPayload {
    pub quantity: i32,
}

#[derive(Serialize)]
pub struct ProductLine {
    pub id: i32,
    pub name: String,
    pub base_price: BigDecimal,
}

impl From<Product> for ProductLine {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            base_price: p.base_price,
        }
    }
}

#[derive(Serialize)]
pub struct VariantLine {
    pub id: i32,
    pub color: String,
    pub price: BigDecimal,
}

impl From<ProductVariant> for VariantLine {
    fn from(v: ProductVariant) -> Self {
        Self {
            id: v.id,
            color: v.color,
            price: v.price,
        }
    }
}

#[derive(Serialize)]
pub struct CartItemView {
    pub id: i32,
    pub product: Option<ProductLine>,
    pub variant: Option<VariantLine>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

#[derive(Serialize)]
pub struct CartView {
    pub id: i32,
    pub items: Vec<CartItemView>,
    pub total_amount: BigDecimal,
}

/// Line quantities are strictly positive, both on add and on absolute
/// replacement.
pub fn ensure_valid_quantity(quantity: i32) -> Result<(), ApiError> {
    if quantity < 1 {
        return Err(ApiError::Validation(
            "quantity must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

/// Variant price wins over the product base price when both are present.
pub fn line_unit_price(
    product: Option<&Product>,
    variant: Option<&ProductVariant>,
) -> Option<BigDecimal> {
    variant
        .map(|v| v.price.clone())
        .or_else(|| product.map(|p| p.base_price.clone()))
}

/// Exact total over (unit price, quantity) pairs. All arithmetic stays in
/// `BigDecimal`; nothing passes through floating point.
pub fn cart_total<'a, I>(lines: I) -> BigDecimal
where
    I: IntoIterator<Item = (&'a BigDecimal, i32)>,
{
    lines
        .into_iter()
        .fold(BigDecimal::from(0), |acc, (price, quantity)| {
            acc + price * BigDecimal::from(quantity)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        assert!(ensure_valid_quantity(0).is_err());
        assert!(ensure_valid_quantity(-3).is_err());
        assert!(ensure_valid_quantity(1).is_ok());
        assert!(ensure_valid_quantity(40).is_ok());
    }

    #[test]
    fn total_sums_lines_exactly() {
        let base = dec("100");
        let variant = dec("150");
        let total = cart_total([(&base, 2), (&variant, 1)]);
        assert_eq!(total, dec("350"));
    }

    #[test]
    fn total_does_not_drift_on_cents() {
        let price = dec("0.10");
        let total = cart_total([(&price, 3)]);
        assert_eq!(total, dec("0.30"));
    }

    #[test]
    fn total_of_empty_cart_is_zero() {
        let no_lines: [(&BigDecimal, i32); 0] = [];
        assert_eq!(cart_total(no_lines), BigDecimal::from(0));
    }

    #[test]
    fn variant_price_beats_base_price() {
        use chrono::Utc;

        let product = Product {
            id: 1,
            category_id: 1,
            name: "lamp".to_owned(),
            description: None,
            base_price: dec("100"),
            image: None,
            created_at: Utc::now().naive_utc(),
        };
        let variant = ProductVariant {
            id: 2,
            product_id: 1,
            color: "green".to_owned(),
            description: None,
            price: dec("150"),
            image: None,
            created_at: Utc::now().naive_utc(),
        };

        assert_eq!(
            line_unit_price(Some(&product), Some(&variant)),
            Some(dec("150"))
        );
        assert_eq!(line_unit_price(Some(&product), None), Some(dec("100")));
        assert_eq!(line_unit_price(None, Some(&variant)), Some(dec("150")));
        assert_eq!(line_unit_price(None, None), None);
    }
}

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use storefront::schema::{product_variants, products};
use validator::Validate;

use crate::utils::error::ApiError;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub base_price: BigDecimal,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Validate)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub category_id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub base_price: BigDecimal,
    pub image: Option<String>,
}

#[derive(AsChangeset, Deserialize)]
#[diesel(table_name = products)]
pub struct UpdateProduct {
    pub category_id: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<BigDecimal>,
    pub image: Option<String>,
}

impl UpdateProduct {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.base_price.is_none()
            && self.image.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = product_variants)]
#[diesel(belongs_to(Product))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductVariant {
    pub id: i32,
    pub product_id: i32,
    pub color: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Validate)]
#[diesel(table_name = product_variants)]
pub struct NewProductVariant {
    pub product_id: i32,
    #[validate(length(min = 1, max = 50))]
    pub color: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub image: Option<String>,
}

#[derive(AsChangeset, Deserialize)]
#[diesel(table_name = product_variants)]
pub struct UpdateProductVariant {
    pub color: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub image: Option<String>,
}

impl UpdateProductVariant {
    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image.is_none()
    }
}

#[derive(Serialize)]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    pub search: Option<String>,
}

/// Reference to either a product or a specific variant of one. Carts and
/// wishlists store lines against exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRef {
    Product(i32),
    Variant(i32),
}

impl LineRef {
    pub fn from_ids(product: Option<i32>, variant: Option<i32>) -> Result<Self, ApiError> {
        match (product, variant) {
            (None, None) => Err(ApiError::Validation(
                "provide either product or variant".to_owned(),
            )),
            (Some(_), Some(_)) => Err(ApiError::Validation(
                "provide either product or variant, not both".to_owned(),
            )),
            (Some(id), None) => Ok(LineRef::Product(id)),
            (None, Some(id)) => Ok(LineRef::Variant(id)),
        }
    }

    pub fn product_id(&self) -> Option<i32> {
        match self {
            LineRef::Product(id) => Some(*id),
            LineRef::Variant(_) => None,
        }
    }

    pub fn variant_id(&self) -> Option<i32> {
        match self {
            LineRef::Product(_) => None,
            LineRef::Variant(id) => Some(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_ref_requires_exactly_one_reference() {
        assert!(LineRef::from_ids(None, None).is_err());
        assert!(LineRef::from_ids(Some(1), Some(2)).is_err());
        assert_eq!(LineRef::from_ids(Some(7), None).unwrap(), LineRef::Product(7));
        assert_eq!(LineRef::from_ids(None, Some(9)).unwrap(), LineRef::Variant(9));
    }

    #[test]
    fn line_ref_splits_back_into_column_values() {
        let product = LineRef::Product(7);
        assert_eq!(product.product_id(), Some(7));
        assert_eq!(product.variant_id(), None);

        let variant = LineRef::Variant(9);
        assert_eq!(variant.product_id(), None);
        assert_eq!(variant.variant_id(), Some(9));
    }
}

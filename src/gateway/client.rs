use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use crate::config::GatewayConfig;
use crate::utils::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Client for the external payment gateway. Holds the shared secret, so
/// callback signature checks live here as well.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

impl GatewayClient {
    pub fn new(cfg: &GatewayConfig) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| format!("failed to build gateway http client: {}", e))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            key_id: cfg.key_id.clone(),
            key_secret: cfg.key_secret.clone(),
            currency: cfg.currency.clone(),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Creates an order at the gateway for `amount_minor`, given in the
    /// smallest currency unit. Any transport failure, timeout or non-2xx
    /// response surfaces as `ApiError::Gateway`.
    pub async fn create_order(
        &self,
        amount_minor: i64,
        receipt: &str,
    ) -> Result<GatewayOrder, ApiError> {
        let url = format!("{}/v1/orders", self.base_url);

        let res = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount_minor,
                "currency": self.currency,
                "receipt": receipt,
                "payment_capture": 1,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Gateway("order creation timed out".to_owned())
                } else {
                    ApiError::Gateway(format!("order creation failed: {}", e))
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(%status, body, "gateway rejected order creation");
            return Err(ApiError::Gateway(format!(
                "order creation rejected with status {}",
                status
            )));
        }

        let order = res
            .json::<GatewayOrder>()
            .await
            .map_err(|e| ApiError::Gateway(format!("malformed order response: {}", e)))?;

        tracing::debug!(
            gateway_order_id = %order.id,
            amount = order.amount,
            currency = %order.currency,
            "gateway order created"
        );

        Ok(order)
    }

    /// Checks a payment callback signature: hex-encoded HMAC-SHA256 over
    /// `"{order_ref}|{payment_ref}"` keyed with the gateway secret. The
    /// comparison runs in constant time.
    pub fn verify_signature(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool {
        verify_signature(&self.key_secret, order_ref, payment_ref, signature)
    }
}

fn verify_signature(secret: &str, order_ref: &str, payment_ref: &str, signature: &str) -> bool {
    let Ok(supplied) = hex::decode(signature) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(format!("{}|{}", order_ref, payment_ref).as_bytes());

    mac.verify_slice(&supplied).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, order_ref: &str, payment_ref: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}|{}", order_ref, payment_ref).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_signature_from_matching_secret() {
        let sig = sign("s3cret", "order_abc", "pay_def");
        assert!(verify_signature("s3cret", "order_abc", "pay_def", &sig));
    }

    #[test]
    fn rejects_signature_from_other_secret() {
        let sig = sign("wrong", "order_abc", "pay_def");
        assert!(!verify_signature("s3cret", "order_abc", "pay_def", &sig));
    }

    #[test]
    fn rejects_signature_for_other_payment() {
        let sig = sign("s3cret", "order_abc", "pay_def");
        assert!(!verify_signature("s3cret", "order_abc", "pay_other", &sig));
    }

    #[test]
    fn rejects_garbage_signature() {
        assert!(!verify_signature("s3cret", "order_abc", "pay_def", "not-hex"));
        assert!(!verify_signature("s3cret", "order_abc", "pay_def", ""));
    }
}

use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

/// Minimal Razorpay client built on reqwest.
pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorEnvelope {
    error: RazorpayErrorDetails,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetails {
    code: Option<String>,
    description: Option<String>,
    field: Option<String>,
}

impl RazorpayClient {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id,
            key_secret,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (error_code, error_description, error_field) =
            match serde_json::from_str::<RazorpayErrorEnvelope>(&body) {
                Ok(envelope) => (
                    envelope.error.code,
                    envelope.error.description,
                    envelope.error.field,
                ),
                Err(_) => (None, None, None),
            };

        error!(
            status = %status,
            gateway_error_code = ?error_code,
            gateway_error_field = ?error_field,
            gateway_error_description = ?error_description,
            response_body = %body,
            context = %context,
            "razorpay api request failed"
        );

        anyhow::bail!("Razorpay API request failed: {} (status {})", context, status);
    }

    /// Creates a gateway order and returns its id. Amount is in minor
    /// currency units (paise). https://razorpay.com/docs/api/orders/create/
    pub async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<String> {
        let body = json!({
            "amount": amount_minor,
            "currency": currency,
            "receipt": receipt,
        });

        let resp = self
            .http
            .post("https://api.razorpay.com/v1/orders")
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create order").await?;

        #[derive(Deserialize)]
        struct OrderResp {
            id: String,
        }

        let parsed: OrderResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// Checks the checkout callback signature:
    /// `HMAC-SHA256(key_secret, "{order_id}|{payment_id}")`, hex encoded.
    /// https://razorpay.com/docs/payments/payment-gateway/web-integration/standard/build-integration/#verify-signature
    pub fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool> {
        let payload = format!("{gateway_order_id}|{gateway_payment_id}");
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())?;
        mac.update(payload.as_bytes());
        let expected = mac.finalize().into_bytes();

        let provided = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };

        Ok(expected[..] == provided[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_signature_computed_with_the_shared_secret() {
        let client = RazorpayClient::new("rzp_test_key".to_string(), "shhh".to_string());
        let signature = sign("shhh", "order_abc|pay_xyz");

        let valid = client
            .verify_payment_signature("order_abc", "pay_xyz", &signature)
            .unwrap();

        assert!(valid);
    }

    #[test]
    fn rejects_a_tampered_signature() {
        let client = RazorpayClient::new("rzp_test_key".to_string(), "shhh".to_string());
        let mut signature = sign("shhh", "order_abc|pay_xyz");
        signature.replace_range(0..2, "00");

        let valid = client
            .verify_payment_signature("order_abc", "pay_xyz", &signature)
            .unwrap();

        assert!(!valid);
    }

    #[test]
    fn rejects_a_signature_for_a_different_payment() {
        let client = RazorpayClient::new("rzp_test_key".to_string(), "shhh".to_string());
        let signature = sign("shhh", "order_abc|pay_other");

        let valid = client
            .verify_payment_signature("order_abc", "pay_xyz", &signature)
            .unwrap();

        assert!(!valid);
    }

    #[test]
    fn rejects_garbage_that_is_not_hex() {
        let client = RazorpayClient::new("rzp_test_key".to_string(), "shhh".to_string());

        let valid = client
            .verify_payment_signature("order_abc", "pay_xyz", "not-hex-at-all")
            .unwrap();

        assert!(!valid);
    }
}

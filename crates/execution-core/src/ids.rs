//! Identifier and clock helpers.

use uuid::Uuid;

/// Prefix for client order ids generated by this gateway.
pub const CLIENT_ORDER_ID_PREFIX: &str = "gw";

/// Generate `{prefix}_{uuid}` with the v4 UUID in simple (hyphen-free) form.
///
/// With a two-letter prefix the result is 35 characters, inside the
/// exchange's 36-character limit.
pub fn generate_client_order_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().as_simple())
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_client_order_id() {
        let id1 = generate_client_order_id(CLIENT_ORDER_ID_PREFIX);
        let id2 = generate_client_order_id(CLIENT_ORDER_ID_PREFIX);

        assert!(id1.starts_with("gw_"));
        assert_eq!(id1.len(), 35);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_now_ms_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_ms() > 1_577_836_800_000);
    }
}

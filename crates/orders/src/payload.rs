//! Typed coercion of loose webhook order payloads.
//!
//! Marketplace webhooks are JSON with no schema guarantees. This module pins
//! down exactly which fields are read and what the default is when a field is
//! missing, instead of coercing ad hoc at each use site.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// One raw line item from the payload's `line_items` array.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePayload {
    pub external_id: String,
    pub sku: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// A coerced order payload.
///
/// Fields that the materializer defaults are kept optional here so the
/// default rule lives in one place (the materializer), not in parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPayload {
    pub external_id: String,
    pub display_name: Option<String>,
    pub currency: Option<String>,
    pub total_price: Option<f64>,
    pub external_created_at: Option<DateTime<Utc>>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub line_items: Vec<LinePayload>,
}

impl OrderPayload {
    /// Coerce a raw payload.
    ///
    /// Returns `None` when the payload carries no usable external order id
    /// (absent, non-scalar, or blank). That is intentional noise tolerance,
    /// not an error: such deliveries are silently discarded.
    pub fn parse(value: &Value) -> Option<Self> {
        let external_id = coerce_id(value.get("id"))?;

        let line_items = value
            .get("line_items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_line).collect())
            .unwrap_or_default();

        Some(Self {
            external_id,
            display_name: string_field(value, "name"),
            currency: string_field(value, "currency"),
            total_price: number_field(value, "total_price"),
            external_created_at: value
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            financial_status: string_field(value, "financial_status"),
            fulfillment_status: string_field(value, "fulfillment_status"),
            line_items,
        })
    }
}

fn parse_line(value: &Value) -> Option<LinePayload> {
    // Line items without an id are dropped the same way orders without one are.
    let external_id = coerce_id(value.get("id"))?;
    let sku = string_field(value, "sku").unwrap_or_default();
    let title = string_field(value, "title").unwrap_or_else(|| sku.clone());

    Some(LinePayload {
        external_id,
        sku,
        title,
        quantity: value
            .get("quantity")
            .and_then(Value::as_u64)
            .map(|q| q as u32)
            .unwrap_or(1),
        unit_price: number_field(value, "price").unwrap_or(0.0),
    })
}

/// External ids arrive as numbers or strings depending on the marketplace.
fn coerce_id(value: Option<&Value>) -> Option<String> {
    let id = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if id.is_empty() { None } else { Some(id) }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Money fields arrive as JSON numbers or decimal strings.
fn number_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_a_full_payload() {
        let payload = json!({
            "id": 1001,
            "name": "#1001",
            "currency": "EUR",
            "total_price": "199.99",
            "created_at": "2024-05-01T12:00:00Z",
            "financial_status": "paid",
            "line_items": [
                {"id": 1, "sku": "ABC", "title": "Widget", "quantity": 2, "price": "99.99"},
            ],
        });

        let parsed = OrderPayload::parse(&payload).unwrap();
        assert_eq!(parsed.external_id, "1001");
        assert_eq!(parsed.display_name.as_deref(), Some("#1001"));
        assert_eq!(parsed.currency.as_deref(), Some("EUR"));
        assert_eq!(parsed.total_price, Some(199.99));
        assert_eq!(parsed.financial_status.as_deref(), Some("paid"));
        assert_eq!(parsed.fulfillment_status, None);
        assert_eq!(parsed.line_items.len(), 1);

        let line = &parsed.line_items[0];
        assert_eq!(line.external_id, "1");
        assert_eq!(line.sku, "ABC");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price, 99.99);
    }

    #[test]
    fn external_id_accepts_number_or_string() {
        assert_eq!(
            OrderPayload::parse(&json!({"id": 42})).unwrap().external_id,
            "42"
        );
        assert_eq!(
            OrderPayload::parse(&json!({"id": " 42 "})).unwrap().external_id,
            "42"
        );
    }

    #[test]
    fn missing_or_blank_id_yields_none() {
        assert!(OrderPayload::parse(&json!({})).is_none());
        assert!(OrderPayload::parse(&json!({"id": ""})).is_none());
        assert!(OrderPayload::parse(&json!({"id": "   "})).is_none());
        assert!(OrderPayload::parse(&json!({"id": null})).is_none());
        assert!(OrderPayload::parse(&json!({"id": []})).is_none());
    }

    #[test]
    fn line_items_without_id_are_dropped() {
        let payload = json!({
            "id": 1001,
            "line_items": [
                {"sku": "NO-ID"},
                {"id": 2, "sku": "ABC"},
            ],
        });

        let parsed = OrderPayload::parse(&payload).unwrap();
        assert_eq!(parsed.line_items.len(), 1);
        assert_eq!(parsed.line_items[0].sku, "ABC");
    }

    #[test]
    fn line_defaults_apply() {
        let payload = json!({
            "id": 1001,
            "line_items": [{"id": 1, "sku": "ABC"}],
        });

        let line = &OrderPayload::parse(&payload).unwrap().line_items[0];
        assert_eq!(line.quantity, 1);
        assert_eq!(line.unit_price, 0.0);
        assert_eq!(line.title, "ABC");
    }

    #[test]
    fn unparseable_timestamp_is_dropped() {
        let payload = json!({"id": 1, "created_at": "yesterday-ish"});
        let parsed = OrderPayload::parse(&payload).unwrap();
        assert_eq!(parsed.external_created_at, None);
    }
}

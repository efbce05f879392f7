//! Proof documents and the JSON helpers used to read them.
//!
//! Fields in federation documents may be a bare URI or an embedded object
//! carrying an `id`, and `type`/`@context` may be a single value or an array.
//! The helpers here normalise both shapes.

use serde_json::Value;
use url::Url;

pub const ACTIVITYSTREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
pub const QUOTE_AUTHORIZATION_TYPE: &str = "QuoteAuthorization";

/// A bare string, or the `id` of an embedded object.
pub fn value_or_id(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(uri) => Some(uri),
        Value::Object(object) => object.get("id").and_then(Value::as_str),
        _ => None,
    }
}

/// True when `value` is `needle`, or an array containing it.
pub fn equals_or_includes(value: Option<&Value>, needle: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == needle,
        Some(Value::Array(items)) => items.iter().any(|item| item.as_str() == Some(needle)),
        _ => false,
    }
}

/// Parse a raw body into a JSON object, optionally requiring its `id` to be
/// `compare_id`. Anything else yields `None`.
pub fn body_to_json(body: &[u8], compare_id: Option<&str>) -> Option<Value> {
    let json: Value = serde_json::from_slice(body).ok()?;
    if !json.is_object() {
        return None;
    }
    if let Some(expected) = compare_id {
        if json.get("id").and_then(Value::as_str) != Some(expected) {
            return None;
        }
    }
    Some(json)
}

/// Whether two URIs share scheme-default-aware host and port. Unparseable or
/// host-less URIs never match.
pub fn same_authority(a: &str, b: &str) -> bool {
    let (Ok(a), Ok(b)) = (Url::parse(a), Url::parse(b)) else {
        return false;
    };

    match (a.host_str(), b.host_str()) {
        (Some(host_a), Some(host_b)) => {
            host_a.eq_ignore_ascii_case(host_b) && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProofDocument {
    raw: Value,
}

impl ProofDocument {
    /// Only JSON objects can be proof documents.
    pub fn new(raw: Value) -> Option<Self> {
        raw.is_object().then_some(Self { raw })
    }
    pub fn id(&self) -> Option<&str> {
        value_or_id(self.raw.get("id"))
    }
    pub fn attributed_to(&self) -> Option<&str> {
        value_or_id(self.raw.get("attributedTo"))
    }
    pub fn interacting_object(&self) -> Option<&str> {
        value_or_id(self.raw.get("interactingObject"))
    }
    pub fn interaction_target(&self) -> Option<&str> {
        value_or_id(self.raw.get("interactionTarget"))
    }
    pub fn declares_type(&self, kind: &str) -> bool {
        equals_or_includes(self.raw.get("type"), kind)
    }
    pub fn has_supported_context(&self, supported: &[String]) -> bool {
        let context = self.raw.get("@context");
        supported
            .iter()
            .any(|candidate| equals_or_includes(context, candidate))
    }
    pub fn digest(&self) -> anyhow::Result<String> {
        crate::utils::proof_digest(&self.raw)
    }
    pub fn as_value(&self) -> &Value {
        &self.raw
    }
}

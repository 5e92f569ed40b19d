//! Request ID middleware helpers for Tower-compatible stacks.
//!
//! The generator layer must sit outside the propagation layer so freshly minted
//! identifiers are copied onto the response.

use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the per-request correlation identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Factory for the `x-request-id` generator layer.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that copies the request's `x-request-id` header onto the response.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Extract the request identifier from a header lookup, defaulting to empty.
#[must_use]
pub fn request_id_or_empty(value: Option<&[u8]>) -> String {
    value
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_layers_can_be_constructed() {
        let _set_layer = set_request_id_layer();
        let _prop_layer = propagate_request_id_layer();
    }

    #[test]
    fn request_id_or_empty_handles_missing_and_invalid_values() {
        assert_eq!(request_id_or_empty(Some(b"abc-123")), "abc-123");
        assert_eq!(request_id_or_empty(Some(&[0xff, 0xfe])), "");
        assert_eq!(request_id_or_empty(None), "");
    }
}

use std::sync::Arc;

use serde::Serialize;

/// Serialize an outbound frame into a shareable text payload.
pub fn encode<T: Serialize>(frame: &T) -> Arc<String> {
    let json = serde_json::to_string(frame).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize outbound frame");
        r#"{"error":"Failed to encode message"}"#.to_string()
    });
    Arc::new(json)
}

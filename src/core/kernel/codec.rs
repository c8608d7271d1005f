use crate::core::errors::GeminiError;
use crate::core::types::{ControlMessage, ControlType, Subscription};
use serde_json::Value;

/// Encode a V2 control message.
///
/// Subscriptions are sent verbatim: no merging or de-duplication.
pub fn encode_control(kind: ControlType, subscriptions: &[Subscription]) -> Result<String, GeminiError> {
    let message = ControlMessage {
        kind,
        subscriptions: subscriptions.to_vec(),
    };
    Ok(serde_json::to_string(&message)?)
}

/// Parse an inbound text frame.
///
/// Parse failures come back as [`GeminiError::MalformedFrame`] so the relay can
/// emit them as events instead of tearing the socket down.
pub fn decode_frame(raw: &str) -> Result<Value, GeminiError> {
    serde_json::from_str(raw).map_err(GeminiError::MalformedFrame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_subscribe() {
        let subs = vec![
            Subscription::new("l2", &["BTCUSD", "ETHUSD"]),
            Subscription::new("candles_1m", &["BTCUSD"]),
        ];
        let text = encode_control(ControlType::Subscribe, &subs).unwrap();
        assert_eq!(
            text,
            r#"{"type":"subscribe","subscriptions":[{"name":"l2","symbols":["BTCUSD","ETHUSD"]},{"name":"candles_1m","symbols":["BTCUSD"]}]}"#
        );
    }

    #[test]
    fn test_encode_unsubscribe_keeps_duplicates() {
        let subs = vec![
            Subscription::new("l2", &["BTCUSD"]),
            Subscription::new("l2", &["BTCUSD"]),
        ];
        let text = encode_control(ControlType::Unsubscribe, &subs).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "unsubscribe");
        assert_eq!(value["subscriptions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_decode_frame() {
        let value = decode_frame(r#"{"type":"heartbeat","socket_sequence":3}"#).unwrap();
        assert_eq!(value["socket_sequence"], 3);

        let err = decode_frame("not json").unwrap_err();
        assert!(matches!(err, GeminiError::MalformedFrame(_)));
    }
}

//! ---
//! cm_section: "02-chaos-client"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Wire shapes of the chaos API and their mapping to events."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ChaosError, Result};
use crate::strategy::Strategy;

/// Only event type accepted by the on-demand termination endpoint.
pub const EVENT_TYPE: &str = "CHAOS_TERMINATION";
/// Only group type accepted by the on-demand termination endpoint.
pub const GROUP_TYPE: &str = "ASG";

/// A chaos event reported by Chaos Monkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChaosEvent {
    /// Identifier of the instance that was broken.
    pub instance_id: String,
    /// Group containing the instance.
    pub group_name: String,
    /// Region of the instance. Empty when the server does not report one.
    pub region: String,
    /// Strategy used to break the instance.
    pub strategy: Strategy,
    /// When the event was triggered, truncated to whole seconds.
    pub triggered_at: DateTime<Utc>,
}

/// Body of `POST /simianarmy/api/v1/chaos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest<'a> {
    pub event_type: &'static str,
    pub group_type: &'static str,
    pub group_name: &'a str,
    /// Left out of the payload when empty so the server applies its default.
    #[serde(skip_serializing_if = "str::is_empty")]
    pub chaos_type: &'a str,
}

impl<'a> TriggerRequest<'a> {
    pub fn new(group: &'a str, strategy: &'a Strategy) -> Self {
        Self {
            event_type: EVENT_TYPE,
            group_type: GROUP_TYPE,
            group_name: group,
            chaos_type: strategy.as_str(),
        }
    }
}

/// Event object returned by both the trigger and the list endpoints.
///
/// Every field is optional on the wire; absent keys and `null`s decode to
/// empty strings or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerResponse {
    #[serde(deserialize_with = "nullable")]
    pub monkey_type: String,
    #[serde(deserialize_with = "nullable")]
    pub event_id: String,
    #[serde(deserialize_with = "nullable")]
    pub event_type: String,
    /// Milliseconds since the Unix epoch.
    #[serde(deserialize_with = "nullable")]
    pub event_time: i64,
    #[serde(deserialize_with = "nullable")]
    pub region: String,
    #[serde(deserialize_with = "nullable")]
    pub group_type: String,
    #[serde(deserialize_with = "nullable")]
    pub group_name: String,
    #[serde(deserialize_with = "nullable")]
    pub chaos_type: String,
}

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Map a wire response onto a [`ChaosEvent`].
///
/// `eventTime` is integer-divided by 1000, so sub-second precision is dropped
/// rather than rounded.
pub fn to_event(response: TriggerResponse) -> Result<ChaosEvent> {
    let seconds = response.event_time / 1000;
    let triggered_at = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        ChaosError::Decode(serde_json::Error::custom(format!(
            "eventTime {} is out of range",
            response.event_time
        )))
    })?;
    Ok(ChaosEvent {
        instance_id: response.event_id,
        group_name: response.group_name,
        region: response.region,
        strategy: Strategy::new(response.chaos_type),
        triggered_at,
    })
}

pub fn encode_trigger(group: &str, strategy: &Strategy) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&TriggerRequest::new(group, strategy))?)
}

pub fn decode_event(body: &[u8]) -> Result<ChaosEvent> {
    to_event(serde_json::from_slice(body)?)
}

/// Decode a JSON array of events, keeping server order. A `null` body is
/// treated as an empty list.
pub fn decode_events(body: &[u8]) -> Result<Vec<ChaosEvent>> {
    let responses: Option<Vec<TriggerResponse>> = serde_json::from_slice(body)?;
    responses
        .unwrap_or_default()
        .into_iter()
        .map(to_event)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const NEW_EVENT: &str = r#"{
        "monkeyType": "CHAOS",
        "eventId": "i-12345678",
        "eventType": "CHAOS_TERMINATION",
        "eventTime": 1460116927834,
        "region": "eu-west-1",
        "groupType": "ASG",
        "groupName": "SomeAutoScalingGroup",
        "chaosType": "ShutdownInstance"
    }"#;

    #[test]
    fn trigger_payload_includes_strategy() {
        let body = encode_trigger("web", &Strategy::BURN_IO).unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "eventType": "CHAOS_TERMINATION",
                "groupType": "ASG",
                "groupName": "web",
                "chaosType": "BurnIo",
            })
        );
    }

    #[test]
    fn empty_strategy_omits_chaos_type_key() {
        let body = encode_trigger("web", &Strategy::default()).unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("chaosType"));
        assert_eq!(object.len(), 3);
    }

    #[test]
    fn event_time_is_truncated_to_seconds() {
        let event = decode_event(NEW_EVENT.as_bytes()).unwrap();
        assert_eq!(event.triggered_at.timestamp(), 1_460_116_927);
        assert_eq!(event.triggered_at.timestamp_subsec_nanos(), 0);
        assert_eq!(event.triggered_at.to_rfc3339(), "2016-04-08T12:02:07+00:00");
    }

    #[test]
    fn fields_are_mapped_from_wire_names() {
        let event = decode_event(NEW_EVENT.as_bytes()).unwrap();
        assert_eq!(event.instance_id, "i-12345678");
        assert_eq!(event.group_name, "SomeAutoScalingGroup");
        assert_eq!(event.region, "eu-west-1");
        assert_eq!(event.strategy, Strategy::SHUTDOWN_INSTANCE);
    }

    #[test]
    fn missing_and_null_fields_decode_to_defaults() {
        let event = decode_event(br#"{"eventId":"i-1","region":null}"#).unwrap();
        assert_eq!(event.instance_id, "i-1");
        assert_eq!(event.region, "");
        assert_eq!(event.group_name, "");
        assert!(event.strategy.is_empty());
        assert_eq!(event.triggered_at.timestamp(), 0);

        let event = decode_event(b"{}").unwrap();
        assert_eq!(event.instance_id, "");
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = decode_event(b"{not json").unwrap_err();
        assert!(matches!(err, ChaosError::Decode(_)));
        let err = decode_events(br#"{"eventId":"i-1"}"#).unwrap_err();
        assert!(matches!(err, ChaosError::Decode(_)));
    }

    #[test]
    fn out_of_range_event_time_is_a_decode_error() {
        let err = decode_event(format!(r#"{{"eventTime":{}}}"#, i64::MAX).as_bytes()).unwrap_err();
        assert!(matches!(err, ChaosError::Decode(_)));
    }

    #[test]
    fn event_list_keeps_order_and_accepts_empty_or_null() {
        let events = decode_events(
            br#"[{"eventId":"i-2","eventTime":2000},{"eventId":"i-1","eventTime":1000}]"#,
        )
        .unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.instance_id.as_str()).collect();
        assert_eq!(ids, ["i-2", "i-1"]);

        assert!(decode_events(b"[]").unwrap().is_empty());
        assert!(decode_events(b"null").unwrap().is_empty());
    }
}

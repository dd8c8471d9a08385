//! Record → event parsing.
//!
//! `parse_record` never panics. Callers skip anything that comes back as an
//! error and continue with the next record.

use serde_json::Value;

use super::events::{EventKind, EventPayload, RecordError, StreamEvent, ThoughtSlice};
use super::payloads::{RawRecord, ThoughtPayload, WrappedSources};
use crate::models::{id_from_value, Citation};

/// Parse one complete record into a typed event.
///
/// An SSE-style `data:` prefix is tolerated so the same parser works behind
/// proxies that re-frame the NDJSON body.
pub fn parse_record(record: &str) -> Result<StreamEvent, RecordError> {
    let body = record.trim();
    let body = body
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(body);

    let raw: RawRecord = serde_json::from_str(body)
        .map_err(|e| RecordError::malformed(format!("invalid JSON: {}", e)))?;

    let type_name = raw
        .kind
        .as_deref()
        .ok_or_else(|| RecordError::malformed("missing type"))?;
    let kind = EventKind::from_wire(type_name)
        .ok_or_else(|| RecordError::UnrecognizedKind(type_name.to_string()))?;

    let message_id = raw
        .msg_id
        .as_ref()
        .and_then(id_from_value)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RecordError::malformed("missing msg_id"))?;

    let thread_id = raw
        .thread_id
        .as_ref()
        .and_then(id_from_value)
        .filter(|id| !id.is_empty());

    let payload = match kind {
        EventKind::ThoughtChunk => EventPayload::Thought(parse_thought(raw.content)?),
        EventKind::SourceListBatch => EventPayload::Sources(parse_sources(raw.content)?),
        EventKind::FinalAnswerChunk => EventPayload::AnswerText(parse_text(raw.content)?),
        EventKind::EndOfThinking => EventPayload::EndOfThinking,
        EventKind::Error => EventPayload::Error(render_error(raw.content)),
    };

    Ok(StreamEvent {
        message_id,
        thread_id,
        payload,
    })
}

/// Decode a thought payload that may arrive as an object or as a string
/// holding a JSON object.
fn parse_thought(content: Value) -> Result<ThoughtSlice, RecordError> {
    let payload: ThoughtPayload = match content {
        Value::String(encoded) => serde_json::from_str(&encoded)
            .map_err(|e| RecordError::malformed(format!("thought content: {}", e)))?,
        Value::Object(_) => serde_json::from_value(content)
            .map_err(|e| RecordError::malformed(format!("thought content: {}", e)))?,
        _ => return Err(RecordError::malformed("thought content must be an object")),
    };

    let sub_id = payload
        .sub_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RecordError::malformed("thought chunk without sub_id"))?;

    Ok(ThoughtSlice {
        sub_id,
        tool_name: payload.tool_name.unwrap_or_default(),
        tool_type: payload.tool_type.unwrap_or_default(),
        description: payload.description.unwrap_or_default(),
    })
}

fn parse_sources(content: Value) -> Result<Vec<Citation>, RecordError> {
    let content = match content {
        Value::String(encoded) => serde_json::from_str(&encoded)
            .map_err(|e| RecordError::malformed(format!("source list: {}", e)))?,
        other => other,
    };

    match content {
        Value::Array(_) => serde_json::from_value(content)
            .map_err(|e| RecordError::malformed(format!("source list: {}", e))),
        Value::Object(_) => serde_json::from_value::<WrappedSources>(content)
            .map(|wrapped| wrapped.sources)
            .map_err(|e| RecordError::malformed(format!("source list: {}", e))),
        Value::Null => Ok(Vec::new()),
        _ => Err(RecordError::malformed("source list must be an array")),
    }
}

fn parse_text(content: Value) -> Result<String, RecordError> {
    match content {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        _ => Err(RecordError::malformed("answer content must be a string")),
    }
}

/// Error payloads are shown verbatim; structured ones as their JSON text.
fn render_error(content: Value) -> String {
    match content {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer_chunk() {
        let event =
            parse_record(r#"{"content":"Hello","type":"final_answer","thread_id":"t1","msg_id":"m2"}"#)
                .unwrap();
        assert_eq!(event.message_id, "m2");
        assert_eq!(event.thread_id.as_deref(), Some("t1"));
        assert_eq!(event.payload, EventPayload::AnswerText("Hello".to_string()));
    }

    #[test]
    fn test_parse_numeric_ids() {
        let event =
            parse_record(r#"{"content":"x","type":"final_answer","thread_id":5,"msg_id":42}"#)
                .unwrap();
        assert_eq!(event.message_id, "42");
        assert_eq!(event.thread_id.as_deref(), Some("5"));
    }

    #[test]
    fn test_parse_thought_from_encoded_string() {
        let record = r#"{"type":"thought_chunk","msg_id":"m1","content":"{\"sub_id\":\"t1\",\"tool_name\":\"web_search\",\"tool_type\":\"search\",\"description\":\"making\"}"}"#;
        let event = parse_record(record).unwrap();
        assert_eq!(
            event.payload,
            EventPayload::Thought(ThoughtSlice {
                sub_id: "t1".to_string(),
                tool_name: "web_search".to_string(),
                tool_type: "search".to_string(),
                description: "making".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_thought_from_object_with_aliases() {
        let record =
            r#"{"type":"thought","msg_id":"m1","content":{"subId":"t2","toolName":"calc","content":" progress"}}"#;
        let event = parse_record(record).unwrap();
        match event.payload {
            EventPayload::Thought(slice) => {
                assert_eq!(slice.sub_id, "t2");
                assert_eq!(slice.tool_name, "calc");
                assert_eq!(slice.tool_type, "");
                assert_eq!(slice.description, " progress");
            }
            other => panic!("Expected thought payload, got {:?}", other),
        }
    }

    #[test]
    fn test_thought_without_sub_id_is_malformed() {
        let record = r#"{"type":"thought_chunk","msg_id":"m1","content":{"description":"x"}}"#;
        assert!(parse_record(record).unwrap_err().is_malformed());
    }

    #[test]
    fn test_parse_sources_array_and_wrapped() {
        let record = r#"{"type":"source_list","msg_id":"m1","content":[{"id":"c1","url":"https://a.test"},{"id":2}]}"#;
        match parse_record(record).unwrap().payload {
            EventPayload::Sources(citations) => {
                assert_eq!(citations.len(), 2);
                assert_eq!(citations[1].id.as_deref(), Some("2"));
            }
            other => panic!("Expected sources payload, got {:?}", other),
        }

        let record =
            r#"{"type":"sources","msg_id":"m1","content":"{\"citations\":[{\"title\":\"T\"}]}"}"#;
        match parse_record(record).unwrap().payload {
            EventPayload::Sources(citations) => {
                assert_eq!(citations[0].title.as_deref(), Some("T"));
            }
            other => panic!("Expected sources payload, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_end_and_error() {
        let end = parse_record(r#"{"type":"end_of_thinking","msg_id":"m1","content":""}"#).unwrap();
        assert_eq!(end.payload, EventPayload::EndOfThinking);

        let err = parse_record(r#"{"type":"error","msg_id":"m3","content":"rate limited"}"#).unwrap();
        assert_eq!(err.payload, EventPayload::Error("rate limited".to_string()));

        let err = parse_record(r#"{"type":"error","msg_id":"m3","content":{"code":429}}"#).unwrap();
        assert_eq!(err.payload, EventPayload::Error(r#"{"code":429}"#.to_string()));
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = parse_record("this is not json").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_missing_msg_id_is_malformed() {
        let err = parse_record(r#"{"type":"final_answer","content":"x"}"#).unwrap_err();
        assert_eq!(err, RecordError::malformed("missing msg_id"));
    }

    #[test]
    fn test_unknown_type_is_not_malformed() {
        let err = parse_record(r#"{"type":"usage","content":{"tokens":10}}"#).unwrap_err();
        assert_eq!(err, RecordError::UnrecognizedKind("usage".to_string()));
    }

    #[test]
    fn test_answer_with_object_content_is_malformed() {
        let err =
            parse_record(r#"{"type":"final_answer","msg_id":"m1","content":{"x":1}}"#).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_data_prefix_is_tolerated() {
        let event =
            parse_record(r#"data: {"type":"final_answer","msg_id":"m1","content":"hi"}"#).unwrap();
        assert_eq!(event.payload, EventPayload::AnswerText("hi".to_string()));
    }
}

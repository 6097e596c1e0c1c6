use serde_json::json;

use llm_demos::callbacks::TokenUsageRecorder;
use llm_demos::models::{ChatResponse, Message, UsageMap};
use llm_demos::providers::{anthropic, openai};

fn openai_payload() -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o-mini",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi"}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 34, "total_tokens": 46}
    })
}

#[test]
fn recorder_reads_openai_usage() {
    let response = openai::parse_response(&openai_payload()).unwrap();
    let mut recorder = TokenUsageRecorder::new();
    recorder.record_completion(&response);
    assert_eq!(recorder.format_usage(), " [Tokens: 12 in, 34 out, 46 total]");
    assert_eq!(recorder.record().raw.len(), 3);
}

#[test]
fn recorder_reads_adapted_anthropic_usage() {
    let payload = json!({
        "model": "claude-3-5-haiku-20241022",
        "content": [{"type": "text", "text": "Hi"}],
        "usage": {"input_tokens": 20, "output_tokens": 5}
    });
    let response = anthropic::parse_response(&payload).unwrap();
    let mut recorder = TokenUsageRecorder::new();
    recorder.record_completion(&response);
    assert_eq!(recorder.format_usage(), " [Tokens: 20 in, 5 out, 25 total]");
    assert!(recorder.record().raw.contains_key("input_tokens"));
}

#[test]
fn response_without_usage_is_a_no_op() {
    let mut recorder = TokenUsageRecorder::new();
    recorder.record_completion(&ChatResponse::new(Message::ai("no usage"), "m"));
    assert_eq!(recorder.format_usage(), "");

    let first = openai::parse_response(&openai_payload()).unwrap();
    recorder.record_completion(&first);
    recorder.record_completion(&ChatResponse::new(Message::ai("no usage"), "m"));
    assert_eq!(recorder.format_usage(), " [Tokens: 12 in, 34 out, 46 total]");
}

#[test]
fn reset_between_requests() {
    let mut recorder = TokenUsageRecorder::new();
    let usage: UsageMap = json!({"total_tokens": 9}).as_object().cloned().unwrap();
    recorder.record_completion(&usage);
    assert_eq!(recorder.format_usage(), " [Tokens: 0 in, 0 out, 9 total]");
    recorder.reset();
    assert_eq!(recorder.format_usage(), "");
}

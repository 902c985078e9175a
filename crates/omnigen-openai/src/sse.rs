// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for Chat Completions streaming responses.
//!
//! The Chat Completions stream is a sequence of unnamed SSE events whose
//! `data` field holds one JSON chunk, closed by the literal sentinel
//! `data: [DONE]`. Parsed with the `eventsource-stream` crate for SSE
//! protocol compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use omnigen_core::ProviderFailure;

use crate::types::ChatCompletionChunk;

/// Typed events from the Chat Completions streaming protocol.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// One incremental completion chunk.
    Chunk(ChatCompletionChunk),
    /// The `[DONE]` sentinel; the server closes the connection after it.
    Done,
}

/// Parses a reqwest streaming response into a stream of typed [`StreamEvent`]s.
///
/// Each SSE data payload is deserialized as a [`ChatCompletionChunk`];
/// undecodable payloads surface as parse failures in the stream rather
/// than ending it.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderFailure>> + Send>> {
    let byte_stream = response.bytes_stream();
    let event_stream = byte_stream.eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                if event.data.trim() == "[DONE]" {
                    return Some(Ok(StreamEvent::Done));
                }
                Some(
                    serde_json::from_str::<ChatCompletionChunk>(&event.data)
                        .map(StreamEvent::Chunk)
                        .map_err(|e| {
                            ProviderFailure::parse(format!("failed to parse stream chunk: {e}"))
                        }),
                )
            }
            Err(e) => Some(Err(ProviderFailure::transport(format!(
                "SSE stream error: {e}"
            )))),
        }
    });

    Box::pin(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    /// Helper: serve raw SSE text through wiremock to get a real
    /// reqwest::Response with a streaming body.
    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parse_content_chunk() {
        let sse = "data: {\"id\":\"chatcmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hello\"},\"finish_reason\":null}]}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);

        let event = stream.next().await.unwrap().unwrap();
        match event {
            StreamEvent::Chunk(chunk) => {
                assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hello"));
            }
            other => panic!("expected Chunk, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parse_done_sentinel() {
        let sse = "data: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);

        let event = stream.next().await.unwrap().unwrap();
        assert!(matches!(event, StreamEvent::Done));
    }

    #[tokio::test]
    async fn parse_final_usage_chunk() {
        let sse = "data: {\"id\":\"chatcmpl-1\",\"choices\":[],\"usage\":{\"prompt_tokens\":12,\"completion_tokens\":7,\"total_tokens\":19}}\n\ndata: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);

        let event = stream.next().await.unwrap().unwrap();
        match event {
            StreamEvent::Chunk(chunk) => {
                assert_eq!(chunk.usage.unwrap().completion_tokens, 7);
            }
            other => panic!("expected Chunk, got {other:?}"),
        }
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            StreamEvent::Done
        ));
    }

    #[tokio::test]
    async fn malformed_chunk_is_parse_failure() {
        let sse = "data: {not valid json}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);

        let failure = stream.next().await.unwrap().unwrap_err();
        assert_eq!(failure.error_code, "PARSE_ERROR");
    }

    #[tokio::test]
    async fn chunks_arrive_in_order() {
        let sse = concat!(
            "data: {\"id\":\"c\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n",
            "data: {\"id\":\"c\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
            "data: {\"id\":\"c\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let response = mock_sse_response(sse).await;
        let stream = parse_sse_stream(response);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 4);

        let mut text = String::new();
        for event in &events[..3] {
            if let Ok(StreamEvent::Chunk(chunk)) = event
                && let Some(content) = chunk.choices.first().and_then(|c| c.delta.content.as_deref())
            {
                text.push_str(content);
            }
        }
        assert_eq!(text, "Hello");
        assert!(matches!(events[3], Ok(StreamEvent::Done)));
    }
}

use std::io::{BufRead, BufReader};
use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::{Client, Response}; // we are using blocking API here to make sync calls
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{
    base::{CompletionRequest, FragmentStream, Provider},
    configs::base::ProviderConfig,
    configs::deepseek::DeepSeekProviderConfig,
    types::fragment::StreamEvent,
    utils::{
        check_openai_context_length_error, chunk_to_fragment, messages_to_openai_spec,
        tools_to_openai_spec,
    },
};
use crate::errors::ProviderError;

pub struct DeepSeekProvider {
    client: Client,
    config: DeepSeekProviderConfig,
}

impl DeepSeekProvider {
    pub fn new(config: DeepSeekProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn build_payload(request: &CompletionRequest<'_>) -> Result<Value, ProviderError> {
        let mut payload = json!({
            "model": request.model,
            "messages": messages_to_openai_spec(request.messages),
            "stream": true,
            "max_tokens": request.max_tokens,
        });

        if !request.tools.is_empty() {
            let tools_spec = tools_to_openai_spec(request.tools)
                .map_err(|e| ProviderError::Api(e.to_string()))?;
            payload["tools"] = json!(tools_spec);
            payload["tool_choice"] = json!(request.tool_choice.as_str());
        }

        Ok(payload)
    }

    fn post(&self, payload: &Value) -> Result<Response, ProviderError> {
        let url = self.config.endpoint();
        debug!(%url, "opening completion stream");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Accept", "text/event-stream")
            .json(payload)
            .send()?;

        match response.status() {
            StatusCode::OK => Ok(response),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(ProviderError::Server {
                    status: status.as_u16(),
                    body: response.text().unwrap_or_default(),
                })
            }
            status => {
                let body = response.text().unwrap_or_default();
                if status == StatusCode::BAD_REQUEST {
                    let error = serde_json::from_str::<Value>(&body)
                        .ok()
                        .and_then(|v| v.get("error").cloned());
                    if let Some(err) = error.as_ref().and_then(check_openai_context_length_error) {
                        return Err(err);
                    }
                }
                Err(ProviderError::Rejected {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

impl Provider for DeepSeekProvider {
    fn from_env() -> Result<Self> {
        let config = DeepSeekProviderConfig::from_env()?;
        Self::new(config)
    }

    fn stream(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Box<dyn FragmentStream + '_>, ProviderError> {
        let payload = Self::build_payload(request)?;
        let response = self.post(&payload)?;
        Ok(Box::new(SseFragmentStream::new(BufReader::new(response))))
    }
}

/// Reads `data:` lines of a server-sent-event body and decodes each into a fragment.
pub struct SseFragmentStream<R> {
    reader: R,
    finished: bool,
    saw_finish_reason: bool,
}

impl<R: BufRead> SseFragmentStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            finished: false,
            saw_finish_reason: false,
        }
    }

    fn end(&mut self) -> StreamEvent {
        self.finished = true;
        StreamEvent::End
    }
}

impl<R: BufRead> FragmentStream for SseFragmentStream<R> {
    fn next_event(&mut self) -> Result<StreamEvent, ProviderError> {
        if self.finished {
            return Ok(StreamEvent::End);
        }

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                if self.saw_finish_reason {
                    return Ok(self.end());
                }
                self.finished = true;
                return Err(ProviderError::Stream(
                    "connection closed before the reply finished".to_string(),
                ));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(':') {
                continue;
            }
            let Some(data) = trimmed.strip_prefix("data:") else {
                debug!(line = trimmed, "ignoring non-data event line");
                continue;
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                return Ok(self.end());
            }

            match chunk_to_fragment(data) {
                Ok(Some(fragment)) => {
                    if fragment.finish_reason.is_some() {
                        self.saw_finish_reason = true;
                    }
                    return Ok(StreamEvent::Fragment(fragment));
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "completion stream failed");
                    self.finished = true;
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::base::ToolChoice;
    use crate::providers::types::fragment::{Fragment, ToolCallFragment};
    use crate::providers::types::message::Message;
    use crate::providers::types::tool::{Tool, ToolOutput};
    use std::io::Cursor;

    fn stream_of(body: &str) -> SseFragmentStream<Cursor<Vec<u8>>> {
        SseFragmentStream::new(Cursor::new(body.as_bytes().to_vec()))
    }

    fn collect(body: &str) -> Result<Vec<Fragment>, ProviderError> {
        let mut stream = stream_of(body);
        let mut fragments = Vec::new();
        loop {
            match stream.next_event()? {
                StreamEvent::Fragment(fragment) => fragments.push(fragment),
                StreamEvent::End => return Ok(fragments),
            }
        }
    }

    #[test]
    fn test_stream_text_until_done() -> Result<()> {
        let body = concat!(
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let fragments = collect(body)?;
        assert_eq!(fragments, vec![Fragment::text("Hel"), Fragment::text("lo")]);
        Ok(())
    }

    #[test]
    fn test_stream_tool_call_fragments() -> Result<()> {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"read_file\",\"arguments\":\"\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{}\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n",
            "data: [DONE]\n",
        );
        let fragments = collect(body)?;
        assert_eq!(fragments.len(), 3);
        assert_eq!(
            fragments[0].tool_calls,
            vec![ToolCallFragment::new(0, "call_1", "read_file", "")]
        );
        assert_eq!(fragments[1].tool_calls[0].arguments, "{}");
        assert_eq!(fragments[2].finish_reason.as_deref(), Some("tool_calls"));
        Ok(())
    }

    #[test]
    fn test_eof_after_finish_reason_is_a_normal_end() -> Result<()> {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"x\"},\"finish_reason\":\"stop\"}]}\n";
        let fragments = collect(body)?;
        assert_eq!(fragments.len(), 1);
        Ok(())
    }

    #[test]
    fn test_eof_mid_reply_is_an_error() {
        let mut stream = stream_of("data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n");
        assert!(matches!(stream.next_event(), Ok(StreamEvent::Fragment(_))));
        assert!(matches!(stream.next_event(), Err(ProviderError::Stream(_))));
        assert!(matches!(stream.next_event(), Ok(StreamEvent::End)));
    }

    #[test]
    fn test_malformed_chunk_is_an_error() {
        let mut stream = stream_of("data: {oops\n");
        assert!(matches!(stream.next_event(), Err(ProviderError::Decode(_))));
    }

    #[test]
    fn test_payload_offers_tools_only_when_present() -> Result<()> {
        fn noop(_: &str) -> crate::errors::ToolResult<ToolOutput> {
            Ok(ToolOutput::default())
        }
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let tools = vec![Tool::new("read_file", "Read", json!({"type": "object"}), noop)];

        let request = CompletionRequest {
            model: "deepseek-chat",
            messages: &messages,
            tools: &tools,
            tool_choice: ToolChoice::Auto,
            max_tokens: 4000,
        };
        let payload = DeepSeekProvider::build_payload(&request)?;
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["max_tokens"], 4000);
        assert_eq!(payload["tool_choice"], "auto");
        assert_eq!(payload["tools"][0]["function"]["name"], "read_file");
        assert_eq!(payload["messages"].as_array().map(Vec::len), Some(2));

        let request = CompletionRequest {
            tools: &[],
            tool_choice: ToolChoice::None,
            max_tokens: 1000,
            ..request
        };
        let payload = DeepSeekProvider::build_payload(&request)?;
        assert!(payload.get("tools").is_none());
        assert!(payload.get("tool_choice").is_none());
        assert_eq!(payload["max_tokens"], 1000);
        Ok(())
    }
}

//! Model-driven extraction of durable user facts.
//!
//! One low-temperature completion per message. The model is asked for a JSON
//! object describing new facts; anything it returns that does not parse is
//! treated as "nothing new".

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use trinho_core::util::preview;
use trinho_core::{ChatCompletion, ChatMessage, CompletionRequest, FactMap};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Model used for extraction; usually the same as the chat model.
    pub model: String,

    #[serde(default = "ExtractorConfig::default_temperature")]
    pub temperature: f32,

    #[serde(default = "ExtractorConfig::default_max_tokens")]
    pub max_tokens: u32,
}

impl ExtractorConfig {
    const fn default_temperature() -> f32 {
        0.1
    }

    const fn default_max_tokens() -> u32 {
        500
    }

    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: Self::default_temperature(),
            max_tokens: Self::default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    #[serde(default)]
    pub has_new_info: bool,
    #[serde(default)]
    pub updates: FactMap,
    #[serde(default)]
    pub summary: String,
}

impl ExtractionResult {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A flagged result without any usable update counts as nothing new.
    #[must_use]
    fn normalized(self) -> Self {
        if self.has_new_info && !self.updates.is_empty() {
            Self {
                summary: self.summary.trim().to_string(),
                ..self
            }
        } else {
            Self::none()
        }
    }
}

/// Parse the first `{` through the last `}` of a model reply.
#[must_use]
pub fn parse_extraction(raw: &str) -> Option<ExtractionResult> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<ExtractionResult>(&raw[start..=end])
        .ok()
        .map(ExtractionResult::normalized)
}

/// Extraction instructions with the message and current facts embedded.
#[must_use]
pub fn build_extraction_prompt(message: &str, existing: &FactMap) -> String {
    let existing_json = serde_json::to_string(existing).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Bạn là hệ thống trích xuất thông tin cá nhân của người dùng từ tin nhắn.

Tin nhắn của người dùng:
"{message}"

Thông tin đã biết về người dùng:
{existing_json}

Quy tắc:
1. Chỉ lưu các thông tin cá nhân lâu dài: tên, tuổi, nghề nghiệp, nơi sống, gia đình, sở thích, mục tiêu, sức khỏe, hoặc điều người dùng yêu cầu ghi nhớ.
2. Bỏ qua các câu hỏi thông thường, lời chào, yêu cầu tạm thời.
3. Dùng khóa tiếng Việt ngắn gọn (ví dụ: "Tên", "Nghề nghiệp", "Sở thích").
4. Nếu thông tin đã có khóa tương ứng, dùng lại đúng khóa đó để cập nhật.
5. Nếu không có thông tin mới, trả về hasNewInfo: false.

Chỉ trả lời bằng JSON theo đúng định dạng:
{{"hasNewInfo": true, "updates": {{"Khóa": "Giá trị"}}, "summary": "tóm tắt ngắn điều vừa ghi nhớ"}}"#
    )
}

/// Runs the secondary extraction call.
pub struct MemoryExtractor {
    completion: Arc<dyn ChatCompletion>,
    config: ExtractorConfig,
}

impl MemoryExtractor {
    #[must_use]
    pub fn new(completion: Arc<dyn ChatCompletion>, config: ExtractorConfig) -> Self {
        Self { completion, config }
    }

    /// Never fails: call or parse errors yield [`ExtractionResult::none`].
    pub async fn extract(&self, message: &str, existing: &FactMap) -> ExtractionResult {
        let prompt = build_extraction_prompt(message, existing);
        let request = CompletionRequest::new(&self.config.model, vec![ChatMessage::user(prompt)])
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let raw = match self.completion.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Memory extraction call failed: {e}");
                return ExtractionResult::none();
            }
        };

        parse_extraction(&raw).map_or_else(
            || {
                warn!("Unparseable extraction reply: {:?}", preview(&raw, 120));
                ExtractionResult::none()
            },
            |result| {
                debug!(
                    "Extraction: has_new_info={}, updates={}",
                    result.has_new_info,
                    result.updates.len()
                );
                result
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use trinho_core::CompletionError;

    struct FixedReply {
        reply: Result<String, CompletionError>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl FixedReply {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(CompletionError::Transport("connection reset".to_string())),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatCompletion for FixedReply {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(CompletionError::Transport("connection reset".to_string())),
            }
        }
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let raw = "Đây là kết quả:\n```json\n{\"hasNewInfo\": true, \"updates\": {\"Tên\": \"An\"}, \"summary\": \"Tên là An\"}\n```";
        let result = parse_extraction(raw);
        assert_eq!(
            result,
            Some(ExtractionResult {
                has_new_info: true,
                updates: [("Tên", "An")].into_iter().collect(),
                summary: "Tên là An".to_string(),
            })
        );
    }

    #[test]
    fn rejects_missing_or_broken_json() {
        assert_eq!(parse_extraction("không có gì"), None);
        assert_eq!(parse_extraction("} ngược {"), None);
        assert_eq!(parse_extraction("{\"hasNewInfo\": tru"), None);
    }

    #[test]
    fn flagged_without_updates_is_nothing_new() {
        let result = parse_extraction(r#"{"hasNewInfo": true, "updates": {}, "summary": "x"}"#);
        assert_eq!(result, Some(ExtractionResult::none()));
    }

    #[test]
    fn prompt_embeds_message_and_known_facts() {
        let facts: FactMap = [("Tên", "An")].into_iter().collect();
        let prompt = build_extraction_prompt("tôi thích phở", &facts);
        assert!(prompt.contains("\"tôi thích phở\""));
        assert!(prompt.contains(r#"{"Tên":"An"}"#));
        assert!(prompt.contains("hasNewInfo"));
    }

    #[tokio::test]
    async fn extract_uses_low_temperature_request() {
        let fake = FixedReply::ok(
            r#"{"hasNewInfo": true, "updates": {"Nghề nghiệp": "kỹ sư"}, "summary": "Là kỹ sư"}"#,
        );
        let extractor = MemoryExtractor::new(fake.clone(), ExtractorConfig::new("test-model"));

        let result = extractor.extract("tôi là kỹ sư", &FactMap::new()).await;
        assert!(result.has_new_info);
        assert_eq!(result.updates.get("Nghề nghiệp"), Some("kỹ sư"));

        let seen = fake.seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "test-model");
        assert!(seen[0].temperature < 0.5);
        assert_eq!(seen[0].max_tokens, 500);
    }

    #[tokio::test]
    async fn call_failure_yields_none() {
        let extractor =
            MemoryExtractor::new(FixedReply::failing(), ExtractorConfig::new("test-model"));
        let result = extractor.extract("tôi tên là An", &FactMap::new()).await;
        assert_eq!(result, ExtractionResult::none());
    }

    #[tokio::test]
    async fn garbage_reply_yields_none() {
        let extractor = MemoryExtractor::new(
            FixedReply::ok("Xin lỗi, tôi không hiểu."),
            ExtractorConfig::new("test-model"),
        );
        let result = extractor.extract("tôi tên là An", &FactMap::new()).await;
        assert!(!result.has_new_info);
    }
}

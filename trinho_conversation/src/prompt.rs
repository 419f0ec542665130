//! System instruction composition.
//!
//! Sections always appear in the same order: persona, web digest, known user
//! facts. Empty sections are omitted entirely.

use serde::{Deserialize, Serialize};
use trinho_core::FactMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "PersonaConfig::default_name")]
    pub name: String,

    #[serde(default = "PersonaConfig::default_role")]
    pub role: String,

    #[serde(default = "PersonaConfig::default_creator")]
    pub creator: String,

    #[serde(default = "PersonaConfig::default_language_directive")]
    pub language_directive: String,
}

impl PersonaConfig {
    fn default_name() -> String {
        "Trí Nhớ".to_string()
    }

    fn default_role() -> String {
        "trợ lý AI thân thiện".to_string()
    }

    fn default_creator() -> String {
        "nhóm phát triển Trinho".to_string()
    }

    fn default_language_directive() -> String {
        "Luôn trả lời bằng tiếng Việt.".to_string()
    }

    /// The one-sentence base instruction.
    #[must_use]
    pub fn sentence(&self) -> String {
        format!(
            "Bạn là {}, một {} được tạo bởi {}. {}",
            self.name, self.role, self.creator, self.language_directive
        )
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            role: Self::default_role(),
            creator: Self::default_creator(),
            language_directive: Self::default_language_directive(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    persona: PersonaConfig,
}

impl PromptComposer {
    #[must_use]
    pub const fn new(persona: PersonaConfig) -> Self {
        Self { persona }
    }

    #[must_use]
    pub const fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    #[must_use]
    pub fn build_system_prompt(&self, facts: &FactMap, digest: Option<&str>) -> String {
        let mut prompt = self.persona.sentence();

        if let Some(digest) = digest {
            prompt.push_str("\n\n## Thông tin mới nhất từ web\n");
            prompt.push_str(digest);
            prompt.push_str(
                "\n\nNếu thông tin trên web mâu thuẫn với kiến thức sẵn có của bạn, hãy ưu tiên thông tin từ web.",
            );
        }

        if !facts.is_empty() {
            prompt.push_str("\n\n## Thông tin đã biết về người dùng\n");
            prompt.push_str(&facts.to_bullet_list());
            prompt.push_str(
                "\n\nHãy sử dụng những thông tin này một cách tự nhiên khi phù hợp. \
                 Không nhắc lại chúng nếu người dùng không hỏi. \
                 Thể hiện sự thân quen qua giọng điệu và cách xưng hô.",
            );
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_give_bare_persona() {
        let composer = PromptComposer::default();
        assert_eq!(
            composer.build_system_prompt(&FactMap::new(), None),
            composer.persona().sentence()
        );
    }

    #[test]
    fn facts_listed_once_in_order() {
        let composer = PromptComposer::default();
        let facts: FactMap = [("Tên", "An"), ("Nghề nghiệp", "kỹ sư"), ("Thành phố", "Huế")]
            .into_iter()
            .collect();

        let prompt = composer.build_system_prompt(&facts, None);

        let positions: Vec<usize> = ["- Tên: An", "- Nghề nghiệp: kỹ sư", "- Thành phố: Huế"]
            .iter()
            .map(|line| {
                assert_eq!(prompt.matches(line).count(), 1, "{line} should appear once");
                prompt.find(line).unwrap_or(usize::MAX)
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!prompt.contains("từ web"));
    }

    #[test]
    fn digest_comes_before_facts() {
        let composer = PromptComposer::default();
        let facts: FactMap = [("Tên", "An")].into_iter().collect();

        let prompt = composer.build_system_prompt(&facts, Some("Giá vàng hôm nay: 80 triệu"));

        let web = prompt.find("Giá vàng hôm nay").unwrap_or(usize::MAX);
        let user = prompt.find("- Tên: An").unwrap_or(0);
        assert!(prompt.starts_with(&composer.persona().sentence()));
        assert!(web < user);
        assert!(prompt.contains("ưu tiên thông tin từ web"));
    }

    #[test]
    fn persona_is_configurable() {
        let composer = PromptComposer::new(PersonaConfig {
            name: "Mai".to_string(),
            ..PersonaConfig::default()
        });
        assert!(
            composer
                .build_system_prompt(&FactMap::new(), None)
                .starts_with("Bạn là Mai,")
        );
    }
}

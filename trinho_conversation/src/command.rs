//! Memory-management commands that bypass the model.

use serde::{Deserialize, Serialize};
use trinho_core::FactMap;
use trinho_core::util::normalize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default = "CommandConfig::default_show_memory")]
    pub show_memory: Vec<String>,

    #[serde(default = "CommandConfig::default_forget_all")]
    pub forget_all: Vec<String>,

    /// Prefixes followed by the exact fact label to drop.
    #[serde(default = "CommandConfig::default_forget_key_prefixes")]
    pub forget_key_prefixes: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

impl CommandConfig {
    fn default_show_memory() -> Vec<String> {
        strings(&["bạn nhớ gì về tôi", "xem trí nhớ", "/memory", "show memory"])
    }

    fn default_forget_all() -> Vec<String> {
        strings(&["quên hết đi", "xóa trí nhớ", "/forget-all", "forget everything"])
    }

    fn default_forget_key_prefixes() -> Vec<String> {
        strings(&["/forget ", "quên thông tin "])
    }

    /// Classify a message. Exact phrases win over prefixes.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<Command> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }

        if self.show_memory.iter().any(|p| normalize(p) == normalized) {
            return Some(Command::ShowMemory);
        }
        if self.forget_all.iter().any(|p| normalize(p) == normalized) {
            return Some(Command::ForgetAll);
        }

        // Slice the original text so the key keeps its casing.
        let trimmed = text.trim();
        self.forget_key_prefixes.iter().find_map(|prefix| {
            let key = strip_prefix_ignore_case(trimmed, &prefix.to_lowercase())?.trim();
            (!key.is_empty()).then(|| Command::ForgetKey(key.to_string()))
        })
    }
}

/// Case-insensitive prefix strip, counted in chars so it holds when
/// lowercasing changes byte lengths.
fn strip_prefix_ignore_case<'a>(text: &'a str, lowered_prefix: &str) -> Option<&'a str> {
    let wanted = lowered_prefix.chars().count();
    let split = text
        .char_indices()
        .nth(wanted)
        .map_or(text.len(), |(idx, _)| idx);
    (text[..split].to_lowercase() == lowered_prefix).then(|| &text[split..])
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            show_memory: Self::default_show_memory(),
            forget_all: Self::default_forget_all(),
            forget_key_prefixes: Self::default_forget_key_prefixes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ShowMemory,
    ForgetAll,
    ForgetKey(String),
}

impl Command {
    #[must_use]
    pub fn memory_listing(facts: &FactMap) -> String {
        if facts.is_empty() {
            "Mình chưa ghi nhớ thông tin nào về bạn.".to_string()
        } else {
            format!(
                "🧠 Đây là những gì mình nhớ về bạn:\n{}",
                facts.to_bullet_list()
            )
        }
    }

    #[must_use]
    pub fn forget_all_reply() -> String {
        "🗑️ Đã xóa toàn bộ thông tin mình ghi nhớ về bạn.".to_string()
    }

    #[must_use]
    pub fn forget_key_reply(key: &str, removed: bool) -> String {
        if removed {
            format!("🗑️ Đã quên thông tin \"{key}\".")
        } else {
            format!(
                "Không tìm thấy thông tin \"{key}\". Gõ /memory để xem những gì mình đang nhớ."
            )
        }
    }
}

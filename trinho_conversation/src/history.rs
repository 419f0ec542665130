//! Conversation history window.
//!
//! Turns the stored history into the message list of one completion request.

use trinho_core::{ChatMessage, Role};
use trinho_memory::MAX_HISTORY_TURNS;

#[derive(Debug, Clone)]
pub struct HistoryWindow {
    max_messages: usize,
}

impl HistoryWindow {
    #[must_use]
    pub const fn new(max_messages: usize) -> Self {
        Self { max_messages }
    }

    #[must_use]
    pub const fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// The newest `max_messages` turns, oldest first. System entries are
    /// skipped since the caller supplies its own.
    #[must_use]
    pub fn select_messages<'a>(&self, history: &'a [ChatMessage]) -> &'a [ChatMessage] {
        let start = history.len().saturating_sub(self.max_messages);
        &history[start..]
    }

    /// System prompt followed by the selected history. The history already
    /// ends with the incoming user turn.
    #[must_use]
    pub fn build_llm_messages(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        let selected = self.select_messages(history);
        let mut messages = Vec::with_capacity(selected.len() + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(
            selected
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned(),
        );
        messages
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(MAX_HISTORY_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_messages(count: usize) -> Vec<ChatMessage> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("Message {i}"))
                } else {
                    ChatMessage::assistant(format!("Message {i}"))
                }
            })
            .collect()
    }

    #[test]
    fn test_history_window_select() {
        let window = HistoryWindow::new(5);
        let messages = create_test_messages(20);

        let selected = window.select_messages(&messages);

        assert_eq!(selected.len(), 5);
        assert_eq!(selected[0].content, "Message 15");
        assert_eq!(selected[4].content, "Message 19");
    }

    #[test]
    fn test_build_llm_messages() {
        let window = HistoryWindow::default();
        let mut history = create_test_messages(3);
        history.push(ChatMessage::system("stray"));

        let messages = window.build_llm_messages("Bạn là trợ lý.", &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::system("Bạn là trợ lý."));
        assert_eq!(messages[3].content, "Message 2");
    }

    #[test]
    fn test_short_history_kept_whole() {
        let window = HistoryWindow::default();
        let history = create_test_messages(3);
        assert_eq!(window.select_messages(&history).len(), 3);
    }
}

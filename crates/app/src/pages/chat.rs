//! Single chat page: one streaming conversation against the selected
//! provider, persisted to history after every completed exchange.

use serde_json::json;
use services::history::HistoryMode;
use shared::chat::ChatMessage;
use shared::events::{StreamChunk, StreamEvent};
use std::sync::mpsc::{channel, Receiver};

use crate::state::AppState;
use crate::ui;

#[derive(Default)]
pub struct ChatPage {
    /// Visible transcript: user and assistant turns only. The system prompt
    /// is prepended at request time and never shown.
    pub messages: Vec<ChatMessage>,
    pub input: String,
    /// Cumulative text of the response currently streaming in.
    pub pending: Option<String>,
    pub streaming: bool,
    pub rx: Option<Receiver<StreamEvent>>,
    pub error: Option<String>,
    /// History entry backing this conversation, once persisted.
    pub history_id: Option<String>,
}

/// Derive a session name from the opening user message.
pub fn session_name(first_message: &str) -> String {
    let trimmed = first_message.trim();
    let mut name: String = trimmed.chars().take(40).collect();
    if trimmed.chars().count() > 40 {
        name.push('…');
    }
    if name.is_empty() {
        "Untitled chat".to_string()
    } else {
        name
    }
}

impl AppState {
    pub fn poll_chat(&mut self) {
        let Some(rx) = &self.chat.rx else { return };
        while let Ok(event) = rx.try_recv() {
            match event {
                StreamEvent::Fragment(text) => {
                    self.chat.pending = Some(text);
                }
                StreamEvent::Completed(text) => {
                    self.chat.pending = None;
                    self.chat.streaming = false;
                    self.chat.rx = None;
                    if !text.is_empty() {
                        self.chat.messages.push(ChatMessage::assistant(&text));
                    }
                    self.persist_chat();
                    return;
                }
                StreamEvent::Failed(error) => {
                    self.chat.pending = None;
                    self.chat.streaming = false;
                    self.chat.rx = None;
                    self.chat.error = Some(error);
                    return;
                }
            }
        }
    }

    /// Take the input box as a new user turn and spawn the streaming worker.
    /// A send is refused while a response is already streaming.
    pub fn send_chat_message(&mut self) {
        if self.chat.streaming {
            return;
        }
        let text = self.chat.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        if !self.facade.has_chat_key(self.settings.chat_provider) {
            self.chat.error = Some(format!(
                "{} API key not configured. Add one in Settings.",
                self.settings.chat_provider.label()
            ));
            return;
        }
        self.chat.input.clear();
        self.chat.error = None;
        self.chat.messages.push(ChatMessage::user(&text));

        // The user turn is saved before the request so it survives a crash
        // or a failed response.
        self.persist_chat();

        let mut request = vec![ChatMessage::system(&self.settings.system_prompt)];
        request.extend(self.chat.messages.iter().cloned());

        let facade = self.facade.clone();
        let provider = self.settings.chat_provider;
        let model = self.settings.chat_model().to_string();
        let max_tokens = self.settings.max_tokens;
        let temperature = self.settings.temperature;

        let (tx, rx) = channel::<StreamEvent>();
        self.chat.rx = Some(rx);
        self.chat.streaming = true;
        self.chat.pending = Some(String::new());

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(StreamEvent::Failed(format!("runtime error: {e}")));
                    return;
                }
            };
            rt.block_on(async move {
                let (chunk_tx, mut chunk_rx) = tokio::sync::mpsc::unbounded_channel();
                let producer = tokio::spawn(async move {
                    facade
                        .chat_stream(provider, &model, &request, max_tokens, temperature, &chunk_tx)
                        .await
                });

                let mut full = String::new();
                while let Some(chunk) = chunk_rx.recv().await {
                    match chunk {
                        StreamChunk::Text(delta) => {
                            full.push_str(&delta);
                            let _ = tx.send(StreamEvent::Fragment(full.clone()));
                        }
                        StreamChunk::Done => break,
                    }
                }

                match producer.await {
                    Ok(Ok(())) => {
                        let _ = tx.send(StreamEvent::Completed(full));
                    }
                    Ok(Err(e)) => {
                        let _ = tx.send(StreamEvent::Failed(e.to_string()));
                    }
                    Err(e) => {
                        let _ = tx.send(StreamEvent::Failed(format!("worker panicked: {e}")));
                    }
                }
            });
        });
    }

    fn persist_chat(&mut self) {
        let data = json!({
            "messages": self.chat.messages,
            "provider": self.settings.chat_provider.label(),
            "model": self.settings.chat_model(),
        });
        match &self.chat.history_id {
            Some(id) => {
                let id = id.clone();
                if !self.history.update_entry_data(HistoryMode::Chat, &id, data) {
                    // Entry was deleted from the panel mid-conversation.
                    self.chat.history_id = None;
                }
            }
            None => {
                let name = self
                    .chat
                    .messages
                    .iter()
                    .find(|m| m.is_user())
                    .map(|m| session_name(&m.content))
                    .unwrap_or_else(|| "Untitled chat".to_string());
                let entry = self.history.add_entry(HistoryMode::Chat, name, data);
                self.chat.history_id = Some(entry.id);
            }
        }
    }

    /// Forget the loaded session; the next send starts a new history entry.
    pub fn new_chat(&mut self) {
        if self.chat.streaming {
            return;
        }
        self.chat.messages.clear();
        self.chat.pending = None;
        self.chat.error = None;
        self.chat.history_id = None;
    }

    pub fn render_chat(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Chat");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!self.chat.streaming, egui::Button::new("New Chat"))
                    .clicked()
                {
                    self.new_chat();
                }
                ui.label(
                    egui::RichText::new(format!(
                        "{} · {}",
                        self.settings.chat_provider.label(),
                        self.settings.chat_model()
                    ))
                    .weak(),
                );
            });
        });
        ui.separator();

        let input_height = 80.0;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .max_height(ui.available_height() - input_height)
            .show(ui, |ui| {
                for msg in &self.chat.messages {
                    ui::message_bubble(ui, &msg.content, msg.is_user());
                }
                if let Some(pending) = &self.chat.pending {
                    let text = if pending.is_empty() { "…" } else { pending };
                    ui::message_bubble(ui, text, false);
                }
            });

        if let Some(error) = self.chat.error.clone() {
            ui::error_banner(ui, &error, || self.chat.error = None);
        }

        ui.separator();
        let mut send = false;
        ui.horizontal(|ui| {
            let response = ui.add_sized(
                [ui.available_width() - 70.0, 48.0],
                egui::TextEdit::multiline(&mut self.chat.input)
                    .hint_text("Send a message…")
                    .desired_rows(2),
            );
            if response.has_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift)
            {
                send = true;
            }
            if ui
                .add_enabled(!self.chat.streaming, egui::Button::new("Send"))
                .clicked()
            {
                send = true;
            }
        });
        if send {
            self.send_chat_message();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_name_truncates() {
        assert_eq!(session_name("hello"), "hello");
        assert_eq!(session_name("  padded  "), "padded");
        let long = "x".repeat(60);
        let name = session_name(&long);
        assert_eq!(name.chars().count(), 41);
        assert!(name.ends_with('…'));
    }

    #[test]
    fn test_session_name_empty_fallback() {
        assert_eq!(session_name("   "), "Untitled chat");
    }
}

//! Side-by-side comparison: the same prompt goes to two models at once, each
//! streamed by its own worker, with response time and a rough length measure
//! shown under each answer.

use serde_json::json;
use services::history::HistoryMode;
use shared::chat::ChatMessage;
use shared::events::{StreamChunk, StreamEvent};
use shared::settings::{AppSettings, ChatProvider};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};

use crate::state::AppState;
use crate::ui;

/// Whitespace-separated word count. Crude next to a real tokenizer, but it
/// is provider-neutral and good enough to compare answer lengths.
pub fn approx_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

pub struct CompareSide {
    pub provider: ChatProvider,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub pending: Option<String>,
    pub rx: Option<Receiver<StreamEvent>>,
    pub started: Option<Instant>,
    pub elapsed: Option<Duration>,
    pub tokens: Option<usize>,
}

impl CompareSide {
    fn new(provider: ChatProvider, model: &str) -> Self {
        Self {
            provider,
            model: model.to_string(),
            messages: Vec::new(),
            pending: None,
            rx: None,
            started: None,
            elapsed: None,
            tokens: None,
        }
    }

    fn streaming(&self) -> bool {
        self.rx.is_some()
    }
}

pub struct ComparePage {
    pub prompt: String,
    pub sides: [CompareSide; 2],
    pub history_id: Option<String>,
}

impl ComparePage {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            prompt: String::new(),
            sides: [
                CompareSide::new(ChatProvider::OpenAi, &settings.openai_model),
                CompareSide::new(ChatProvider::Gemini, &settings.gemini_model),
            ],
            history_id: None,
        }
    }

    pub fn running(&self) -> bool {
        self.sides.iter().any(CompareSide::streaming)
    }

    /// Drain both side channels. Returns true when a side settled this
    /// pass, so the caller can re-persist the transcripts; each side
    /// settles on its own, independent of the other's progress. A failure
    /// lands in that side's transcript as an inline message.
    fn drain(&mut self) -> bool {
        let mut settled = false;
        for side in &mut self.sides {
            let Some(rx) = &side.rx else { continue };
            while let Ok(event) = rx.try_recv() {
                match event {
                    StreamEvent::Fragment(text) => {
                        side.pending = Some(text);
                    }
                    StreamEvent::Completed(text) => {
                        side.pending = None;
                        side.rx = None;
                        side.elapsed = side.started.map(|t| t.elapsed());
                        side.tokens = Some(approx_tokens(&text));
                        if !text.is_empty() {
                            side.messages.push(ChatMessage::assistant(&text));
                        }
                        settled = true;
                        break;
                    }
                    StreamEvent::Failed(error) => {
                        side.pending = None;
                        side.rx = None;
                        side.elapsed = side.started.map(|t| t.elapsed());
                        side.messages
                            .push(ChatMessage::assistant(format!("Error: {error}")));
                        settled = true;
                        break;
                    }
                }
            }
        }
        settled
    }
}

fn spawn_side_worker(
    facade: std::sync::Arc<providers::facade::ProviderFacade>,
    provider: ChatProvider,
    model: String,
    request: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
) -> Receiver<StreamEvent> {
    let (tx, rx) = channel::<StreamEvent>();
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
    rx
}

impl AppState {
    pub fn poll_compare(&mut self) {
        // Persist on every settled side, not once both finish; a fast
        // side's answer must survive even if the slow side never does.
        if self.compare.drain() {
            self.persist_compare();
        }
    }

    /// Send the prompt to both sides at once.
    pub fn send_compare(&mut self) {
        if self.compare.running() {
            return;
        }
        let prompt = self.compare.prompt.trim().to_string();
        if prompt.is_empty() {
            return;
        }
        self.compare.prompt.clear();

        let system_prompt = self.settings.system_prompt.clone();
        let max_tokens = self.settings.max_tokens;
        let temperature = self.settings.temperature;

        for side in &mut self.compare.sides {
            side.elapsed = None;
            side.tokens = None;
            side.messages.push(ChatMessage::user(&prompt));

            let mut request = vec![ChatMessage::system(&system_prompt)];
            request.extend(side.messages.iter().cloned());

            side.started = Some(Instant::now());
            side.pending = Some(String::new());
            side.rx = Some(spawn_side_worker(
                self.facade.clone(),
                side.provider,
                side.model.clone(),
                request,
                max_tokens,
                temperature,
            ));
        }
    }

    pub fn new_compare(&mut self) {
        if self.compare.running() {
            return;
        }
        for side in &mut self.compare.sides {
            side.messages.clear();
            side.pending = None;
            side.elapsed = None;
            side.tokens = None;
        }
        self.compare.history_id = None;
    }

    fn persist_compare(&mut self) {
        let side_meta = |side: &CompareSide| {
            json!({ "provider": side.provider.label(), "model": side.model })
        };
        let data = json!({
            "messages1": self.compare.sides[0].messages,
            "messages2": self.compare.sides[1].messages,
            "model1": side_meta(&self.compare.sides[0]),
            "model2": side_meta(&self.compare.sides[1]),
        });
        match &self.compare.history_id {
            Some(id) => {
                let id = id.clone();
                if !self.history.update_entry_data(HistoryMode::CompareAi, &id, data) {
                    self.compare.history_id = None;
                }
            }
            None => {
                let name = self.compare.sides[0]
                    .messages
                    .iter()
                    .find(|m| m.is_user())
                    .map(|m| crate::pages::chat::session_name(&m.content))
                    .unwrap_or_else(|| "Untitled comparison".to_string());
                let entry = self.history.add_entry(HistoryMode::CompareAi, name, data);
                self.compare.history_id = Some(entry.id);
            }
        }
    }

    pub fn render_compare(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Compare");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!self.compare.running(), egui::Button::new("New Comparison"))
                    .clicked()
                {
                    self.new_compare();
                }
            });
        });
        ui.separator();

        let running = self.compare.running();
        let column_width = (ui.available_width() - 16.0) / 2.0;
        let column_height = ui.available_height() - 90.0;
        ui.horizontal_top(|ui| {
            for (index, side) in self.compare.sides.iter_mut().enumerate() {
                ui.allocate_ui(egui::vec2(column_width, column_height), |ui| {
                    ui.vertical(|ui| {
                        ui.horizontal(|ui| {
                            egui::ComboBox::from_id_source(("compare_provider", index))
                                .selected_text(side.provider.label())
                                .show_ui(ui, |ui| {
                                    for provider in [ChatProvider::OpenAi, ChatProvider::Gemini] {
                                        if ui
                                            .selectable_value(
                                                &mut side.provider,
                                                provider,
                                                provider.label(),
                                            )
                                            .changed()
                                        {
                                            side.model = provider.models()[0].to_string();
                                        }
                                    }
                                });
                            egui::ComboBox::from_id_source(("compare_model", index))
                                .selected_text(&side.model)
                                .show_ui(ui, |ui| {
                                    for model in side.provider.models() {
                                        ui.selectable_value(
                                            &mut side.model,
                                            model.to_string(),
                                            *model,
                                        );
                                    }
                                });
                        });
                        egui::ScrollArea::vertical()
                            .id_source(("compare_scroll", index))
                            .auto_shrink([false, false])
                            .stick_to_bottom(true)
                            .max_height(column_height - 60.0)
                            .show(ui, |ui| {
                                for msg in &side.messages {
                                    ui::message_bubble(ui, &msg.content, msg.is_user());
                                }
                                if let Some(pending) = &side.pending {
                                    let text = if pending.is_empty() { "…" } else { pending };
                                    ui::message_bubble(ui, text, false);
                                }
                            });
                        if let (Some(elapsed), Some(tokens)) = (side.elapsed, side.tokens) {
                            ui.label(
                                egui::RichText::new(format!(
                                    "{:.1}s · ~{} words",
                                    elapsed.as_secs_f32(),
                                    tokens
                                ))
                                .weak(),
                            );
                        }
                    });
                });
            }
        });

        ui.separator();
        let mut send = false;
        ui.horizontal(|ui| {
            let response = ui.add_sized(
                [ui.available_width() - 70.0, 28.0],
                egui::TextEdit::singleline(&mut self.compare.prompt)
                    .hint_text("Ask both models…"),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send = true;
            }
            if ui.add_enabled(!running, egui::Button::new("Send")).clicked() {
                send = true;
            }
        });
        if send {
            self.send_compare();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_tokens() {
        assert_eq!(approx_tokens(""), 0);
        assert_eq!(approx_tokens("one"), 1);
        assert_eq!(approx_tokens("  spaced   out\nwords here "), 4);
    }

    #[test]
    fn test_new_page_defaults_to_both_providers() {
        let page = ComparePage::new(&AppSettings::default());
        assert_eq!(page.sides[0].provider, ChatProvider::OpenAi);
        assert_eq!(page.sides[0].model, "gpt-4o-mini");
        assert_eq!(page.sides[1].provider, ChatProvider::Gemini);
        assert_eq!(page.sides[1].model, "gemini-2.0-flash");
        assert!(!page.running());
    }

    #[test]
    fn test_side_settles_while_other_still_streams() {
        let mut page = ComparePage::new(&AppSettings::default());
        let (tx0, rx0) = channel();
        let (_tx1, rx1) = channel();
        page.sides[0].rx = Some(rx0);
        page.sides[0].started = Some(Instant::now());
        page.sides[1].rx = Some(rx1);

        tx0.send(StreamEvent::Fragment("hello".to_string())).unwrap();
        assert!(!page.drain());
        assert_eq!(page.sides[0].pending.as_deref(), Some("hello"));

        tx0.send(StreamEvent::Completed("hello world".to_string()))
            .unwrap();
        // The fast side settles and asks for persistence on its own.
        assert!(page.drain());
        assert!(page.sides[0].rx.is_none());
        assert_eq!(page.sides[0].messages.last().unwrap().content, "hello world");
        assert_eq!(page.sides[0].tokens, Some(2));
        assert!(page.running());
    }

    #[test]
    fn test_failed_side_gets_inline_error_message() {
        let mut page = ComparePage::new(&AppSettings::default());
        let (tx0, rx0) = channel();
        let (tx1, rx1) = channel();
        page.sides[0].rx = Some(rx0);
        page.sides[1].rx = Some(rx1);

        tx0.send(StreamEvent::Failed("gemini error: 401".to_string()))
            .unwrap();
        tx1.send(StreamEvent::Completed("fine".to_string())).unwrap();
        assert!(page.drain());

        let failed = page.sides[0].messages.last().unwrap();
        assert_eq!(failed.role, "assistant");
        assert_eq!(failed.content, "Error: gemini error: 401");
        // The healthy side is untouched by the failure.
        assert_eq!(page.sides[1].messages.last().unwrap().content, "fine");
        assert!(!page.running());
    }
}

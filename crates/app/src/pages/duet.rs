//! AI duet page: two personas talk to each other for a fixed number of
//! rounds, driven by one background worker making buffered completions.

use serde_json::json;
use services::history::HistoryMode;
use shared::chat::ChatMessage;
use shared::events::{DuetEvent, DuetTurn};
use shared::settings::Persona;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;

use crate::state::AppState;
use crate::ui;

/// Turn bookkeeping for one exchange. Each persona sees the conversation
/// from its own side: its past turns as `assistant`, the other persona's as
/// `user`, under its own system prompt.
pub struct DuetExchange {
    topic: String,
    persona_one: Persona,
    persona_two: Persona,
    turns: Vec<DuetTurn>,
}

impl DuetExchange {
    pub fn new(topic: impl Into<String>, persona_one: Persona, persona_two: Persona) -> Self {
        Self {
            topic: topic.into(),
            persona_one,
            persona_two,
            turns: Vec::new(),
        }
    }

    fn persona(&self, second: bool) -> &Persona {
        if second {
            &self.persona_two
        } else {
            &self.persona_one
        }
    }

    /// Build the request history for whichever persona speaks next.
    pub fn context_for(&self, second: bool) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system(&self.persona(second).system_prompt),
            ChatMessage::user(format!("Let's discuss: {}", self.topic)),
        ];
        for turn in &self.turns {
            if turn.second_persona == second {
                messages.push(ChatMessage::assistant(&turn.content));
            } else {
                messages.push(ChatMessage::user(&turn.content));
            }
        }
        messages
    }

    pub fn record(&mut self, second: bool, content: impl Into<String>) -> DuetTurn {
        let turn = DuetTurn {
            speaker: self.persona(second).name.clone(),
            content: content.into(),
            second_persona: second,
        };
        self.turns.push(turn.clone());
        turn
    }

    pub fn turns(&self) -> &[DuetTurn] {
        &self.turns
    }
}

pub struct DuetPage {
    pub topic: String,
    pub rounds: u32,
    pub turns: Vec<DuetTurn>,
    pub running: bool,
    /// Cooperative stop flag shared with the worker.
    pub stop: Arc<AtomicBool>,
    /// Set as soon as the user asks to stop; cleared when the worker
    /// actually winds down. Distinguishes "stopping…" from "stopped".
    pub stop_requested: bool,
    pub rx: Option<Receiver<DuetEvent>>,
    pub error: Option<String>,
    pub history_id: Option<String>,
}

impl Default for DuetPage {
    fn default() -> Self {
        Self {
            topic: String::new(),
            rounds: 3,
            turns: Vec::new(),
            running: false,
            stop: Arc::new(AtomicBool::new(false)),
            stop_requested: false,
            rx: None,
            error: None,
            history_id: None,
        }
    }
}

impl AppState {
    pub fn poll_duet(&mut self) {
        while let Some(event) = self
            .duet
            .rx
            .as_ref()
            .and_then(|rx| rx.try_recv().ok())
        {
            match event {
                DuetEvent::Turn(turn) => {
                    self.duet.turns.push(turn);
                    self.persist_duet();
                }
                DuetEvent::Finished => {
                    self.duet.running = false;
                    self.duet.stop_requested = false;
                    self.duet.rx = None;
                    return;
                }
                DuetEvent::Failed(error) => {
                    self.duet.running = false;
                    self.duet.stop_requested = false;
                    self.duet.rx = None;
                    self.duet.error = Some(error);
                    return;
                }
            }
        }
    }

    pub fn start_duet(&mut self) {
        if self.duet.running {
            return;
        }
        let topic = self.duet.topic.trim().to_string();
        if topic.is_empty() {
            return;
        }
        if !self.facade.has_chat_key(self.settings.chat_provider) {
            self.duet.error = Some(format!(
                "{} API key not configured. Add one in Settings.",
                self.settings.chat_provider.label()
            ));
            return;
        }
        self.duet.error = None;
        self.duet.turns.clear();
        self.duet.history_id = None;
        self.duet.running = true;
        self.duet.stop_requested = false;
        self.duet.stop = Arc::new(AtomicBool::new(false));

        let stop = self.duet.stop.clone();
        let facade = self.facade.clone();
        let provider = self.settings.chat_provider;
        let model = self.settings.chat_model().to_string();
        let max_tokens = self.settings.max_tokens;
        let temperature = self.settings.temperature;
        let rounds = self.duet.rounds;
        let mut exchange = DuetExchange::new(
            topic,
            self.settings.persona_one.clone(),
            self.settings.persona_two.clone(),
        );

        let (tx, rx) = channel::<DuetEvent>();
        self.duet.rx = Some(rx);

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(DuetEvent::Failed(format!("runtime error: {e}")));
                    return;
                }
            };
            rt.block_on(async move {
                // Personas alternate, first persona opens every round.
                for turn_index in 0..rounds * 2 {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let second = turn_index % 2 == 1;
                    let context = exchange.context_for(second);
                    let reply = match facade
                        .chat(provider, &model, &context, max_tokens, temperature)
                        .await
                    {
                        Ok(reply) => reply,
                        Err(e) => {
                            let _ = tx.send(DuetEvent::Failed(e.to_string()));
                            return;
                        }
                    };
                    // Drop a reply that finished after a stop request; the
                    // transcript should end at the last turn the user saw.
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let turn = exchange.record(second, reply);
                    let _ = tx.send(DuetEvent::Turn(turn));
                }
                let _ = tx.send(DuetEvent::Finished);
            });
        });
    }

    pub fn stop_duet(&mut self) {
        if self.duet.running && !self.duet.stop_requested {
            self.duet.stop_requested = true;
            self.duet.stop.store(true, Ordering::Relaxed);
        }
    }

    fn persist_duet(&mut self) {
        let data = json!({
            "topic": self.duet.topic.trim(),
            "messages": self.duet.turns,
        });
        match &self.duet.history_id {
            Some(id) => {
                let id = id.clone();
                if !self.history.update_entry_data(HistoryMode::AiToAi, &id, data) {
                    self.duet.history_id = None;
                }
            }
            None => {
                let name = crate::pages::chat::session_name(&self.duet.topic);
                let entry = self.history.add_entry(HistoryMode::AiToAi, name, data);
                self.duet.history_id = Some(entry.id);
            }
        }
    }

    pub fn render_duet(&mut self, ui: &mut egui::Ui) {
        ui.heading("AI Duet");
        ui.label(
            egui::RichText::new(format!(
                "{} and {} discuss a topic of your choice",
                self.settings.persona_one.name, self.settings.persona_two.name
            ))
            .weak(),
        );
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Topic:");
            ui.add_enabled(
                !self.duet.running,
                egui::TextEdit::singleline(&mut self.duet.topic)
                    .hint_text("What should they talk about?")
                    .desired_width(ui.available_width() - 260.0),
            );
            ui.label("Rounds:");
            ui.add_enabled(
                !self.duet.running,
                egui::DragValue::new(&mut self.duet.rounds).clamp_range(1..=10),
            );
            if self.duet.running {
                let stop_label = if self.duet.stop_requested {
                    "Stopping…"
                } else {
                    "Stop"
                };
                if ui
                    .add_enabled(!self.duet.stop_requested, egui::Button::new(stop_label))
                    .clicked()
                {
                    self.stop_duet();
                }
            } else if ui.button("Start").clicked() {
                self.start_duet();
            }
        });

        if let Some(error) = self.duet.error.clone() {
            ui::error_banner(ui, &error, || self.duet.error = None);
        }

        ui.separator();
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for turn in &self.duet.turns {
                    ui::speaker_bubble(ui, &turn.speaker, &turn.content, turn.second_persona);
                }
                if self.duet.running {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(egui::RichText::new("thinking…").weak());
                    });
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personas() -> (Persona, Persona) {
        (
            Persona {
                name: "Aria".to_string(),
                system_prompt: "prompt one".to_string(),
            },
            Persona {
                name: "Basil".to_string(),
                system_prompt: "prompt two".to_string(),
            },
        )
    }

    #[test]
    fn test_opening_context() {
        let (one, two) = personas();
        let exchange = DuetExchange::new("tea", one, two);
        let context = exchange.context_for(false);
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, "system");
        assert_eq!(context[0].content, "prompt one");
        assert_eq!(context[1].content, "Let's discuss: tea");
    }

    #[test]
    fn test_each_persona_sees_own_turns_as_assistant() {
        let (one, two) = personas();
        let mut exchange = DuetExchange::new("tea", one, two);
        exchange.record(false, "first says");
        exchange.record(true, "second says");

        let for_first = exchange.context_for(false);
        assert_eq!(for_first[2].role, "assistant");
        assert_eq!(for_first[3].role, "user");

        let for_second = exchange.context_for(true);
        assert_eq!(for_second[0].content, "prompt two");
        assert_eq!(for_second[2].role, "user");
        assert_eq!(for_second[3].role, "assistant");
    }

    #[test]
    fn test_context_grows_by_one_per_turn() {
        let (one, two) = personas();
        let mut exchange = DuetExchange::new("tea", one, two);
        for i in 0..6 {
            assert_eq!(exchange.context_for(i % 2 == 1).len(), 2 + i);
            exchange.record(i % 2 == 1, format!("turn {i}"));
        }
        assert_eq!(exchange.turns().len(), 6);
    }

    #[test]
    fn test_record_names_speaker() {
        let (one, two) = personas();
        let mut exchange = DuetExchange::new("tea", one, two);
        let turn = exchange.record(true, "hello");
        assert_eq!(turn.speaker, "Basil");
        assert!(turn.second_persona);
    }
}

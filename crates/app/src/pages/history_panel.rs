//! Right-hand history panel for the session-backed pages, with load,
//! inline rename, and delete.

use chrono::{DateTime, Utc};
use services::history::{HistoryEntry, HistoryMode};
use shared::chat::ChatMessage;
use shared::events::DuetTurn;

use crate::state::{AppState, Page};

#[derive(Default)]
pub struct HistoryPanel {
    pub editing_id: Option<String>,
    pub editing_name: String,
}

enum PanelAction {
    Load(String),
    Rename(String, String),
    Delete(String),
}

pub fn relative_time(timestamp: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(timestamp);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

fn mode_for(page: Page) -> Option<HistoryMode> {
    match page {
        Page::Chat => Some(HistoryMode::Chat),
        Page::Duet => Some(HistoryMode::AiToAi),
        Page::Compare => Some(HistoryMode::CompareAi),
        _ => None,
    }
}

impl AppState {
    pub fn render_history_panel(&mut self, ui: &mut egui::Ui) {
        let Some(mode) = mode_for(self.page) else {
            return;
        };
        ui.add_space(8.0);
        ui.strong("History");
        ui.separator();

        // Widget pass only collects; mutations happen after the borrow of
        // the entry list ends.
        let mut action: Option<PanelAction> = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let entries = self.history.entries(mode);
                if entries.is_empty() {
                    ui.label(egui::RichText::new("Nothing saved yet").weak());
                    return;
                }
                for entry in entries {
                    let editing = self.history_panel.editing_id.as_deref() == Some(&entry.id);
                    ui.horizontal(|ui| {
                        if editing {
                            let response = ui.add(
                                egui::TextEdit::singleline(&mut self.history_panel.editing_name)
                                    .desired_width(ui.available_width() - 52.0),
                            );
                            let commit = (response.lost_focus()
                                && ui.input(|i| i.key_pressed(egui::Key::Enter)))
                                || ui.small_button("✔").clicked();
                            if commit {
                                action = Some(PanelAction::Rename(
                                    entry.id.clone(),
                                    self.history_panel.editing_name.clone(),
                                ));
                            }
                            if ui.small_button("✖").clicked() {
                                action = Some(PanelAction::Rename(
                                    entry.id.clone(),
                                    entry.name.clone(),
                                ));
                            }
                        } else {
                            let label = ui
                                .add(
                                    egui::Label::new(&entry.name)
                                        .truncate(true)
                                        .sense(egui::Sense::click()),
                                )
                                .on_hover_text(relative_time(entry.timestamp));
                            if label.clicked() {
                                action = Some(PanelAction::Load(entry.id.clone()));
                            }
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    if ui.small_button("🗑").clicked() {
                                        action = Some(PanelAction::Delete(entry.id.clone()));
                                    }
                                    if ui.small_button("✏").clicked() {
                                        self.history_panel.editing_id = Some(entry.id.clone());
                                        self.history_panel.editing_name = entry.name.clone();
                                    }
                                },
                            );
                        }
                    });
                }
            });

        match action {
            Some(PanelAction::Load(id)) => self.load_history_entry(mode, &id),
            Some(PanelAction::Rename(id, name)) => {
                let trimmed = name.trim();
                if !trimmed.is_empty() {
                    self.history.rename_entry(mode, &id, trimmed);
                }
                self.history_panel.editing_id = None;
                self.history_panel.editing_name.clear();
            }
            Some(PanelAction::Delete(id)) => {
                self.history.delete_entry(mode, &id);
                // Detach the live page if its backing entry just went away.
                if self.chat.history_id.as_deref() == Some(id.as_str()) {
                    self.chat.history_id = None;
                }
                if self.duet.history_id.as_deref() == Some(id.as_str()) {
                    self.duet.history_id = None;
                }
                if self.compare.history_id.as_deref() == Some(id.as_str()) {
                    self.compare.history_id = None;
                }
            }
            None => {}
        }
    }

    fn load_history_entry(&mut self, mode: HistoryMode, id: &str) {
        let Some(entry) = self.history.entry(mode, id).cloned() else {
            return;
        };
        match mode {
            HistoryMode::Chat => self.load_chat_entry(&entry),
            HistoryMode::AiToAi => self.load_duet_entry(&entry),
            HistoryMode::CompareAi => self.load_compare_entry(&entry),
            _ => {}
        }
    }

    fn load_chat_entry(&mut self, entry: &HistoryEntry) {
        if self.chat.streaming {
            return;
        }
        let messages: Vec<ChatMessage> =
            serde_json::from_value(entry.data["messages"].clone()).unwrap_or_default();
        self.chat.messages = messages;
        self.chat.pending = None;
        self.chat.error = None;
        self.chat.history_id = Some(entry.id.clone());
    }

    fn load_duet_entry(&mut self, entry: &HistoryEntry) {
        if self.duet.running {
            return;
        }
        let turns: Vec<DuetTurn> =
            serde_json::from_value(entry.data["messages"].clone()).unwrap_or_default();
        self.duet.topic = entry.data["topic"].as_str().unwrap_or_default().to_string();
        self.duet.turns = turns;
        self.duet.error = None;
        self.duet.history_id = Some(entry.id.clone());
    }

    fn load_compare_entry(&mut self, entry: &HistoryEntry) {
        if self.compare.running() {
            return;
        }
        for (index, key) in ["messages1", "messages2"].iter().enumerate() {
            let messages: Vec<ChatMessage> =
                serde_json::from_value(entry.data[key].clone()).unwrap_or_default();
            let side = &mut self.compare.sides[index];
            side.messages = messages;
            side.pending = None;
            side.elapsed = None;
            side.tokens = None;
        }
        self.compare.history_id = Some(entry.id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(relative_time(now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(5)), "5m ago");
        assert_eq!(relative_time(now - Duration::hours(3)), "3h ago");
        assert_eq!(relative_time(now - Duration::days(2)), "2d ago");
        let old = now - Duration::days(30);
        assert_eq!(relative_time(old), old.format("%Y-%m-%d").to_string());
    }
}

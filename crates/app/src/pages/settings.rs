//! Settings page. Edits happen on a draft copy; nothing takes effect until
//! Save, which persists the file and swaps the provider façade.

use shared::settings::{AppSettings, ChatProvider, Theme, IMAGE_SIZES, OPENAI_MODELS};

use crate::state::AppState;

pub struct SettingsPage {
    pub draft: AppSettings,
    pub status: Option<String>,
}

impl SettingsPage {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            draft: settings.clone(),
            status: None,
        }
    }
}

fn api_key_row(ui: &mut egui::Ui, label: &str, value: &mut String) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(
            egui::TextEdit::singleline(value)
                .password(true)
                .desired_width(320.0),
        );
    });
}

impl AppState {
    pub fn render_settings(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.separator();

        let draft = &mut self.settings_page.draft;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .max_height(ui.available_height() - 48.0)
            .show(ui, |ui| {
                ui.strong("API Keys");
                api_key_row(ui, "OpenAI:", &mut draft.openai_api_key);
                api_key_row(ui, "Gemini:", &mut draft.gemini_api_key);
                api_key_row(ui, "Luma:", &mut draft.luma_api_key);

                ui.add_space(12.0);
                ui.strong("Chat");
                ui.horizontal(|ui| {
                    ui.label("Provider:");
                    egui::ComboBox::from_id_source("settings_provider")
                        .selected_text(draft.chat_provider.label())
                        .show_ui(ui, |ui| {
                            for provider in [ChatProvider::OpenAi, ChatProvider::Gemini] {
                                ui.selectable_value(
                                    &mut draft.chat_provider,
                                    provider,
                                    provider.label(),
                                );
                            }
                        });
                    ui.label("Model:");
                    let (model, models) = match draft.chat_provider {
                        ChatProvider::OpenAi => (&mut draft.openai_model, OPENAI_MODELS),
                        ChatProvider::Gemini => {
                            (&mut draft.gemini_model, ChatProvider::Gemini.models())
                        }
                    };
                    egui::ComboBox::from_id_source("settings_model")
                        .selected_text(model.as_str())
                        .show_ui(ui, |ui| {
                            for candidate in models {
                                ui.selectable_value(model, candidate.to_string(), *candidate);
                            }
                        });
                });
                ui.horizontal(|ui| {
                    ui.label("Max tokens:");
                    ui.add(
                        egui::DragValue::new(&mut draft.max_tokens).clamp_range(64..=16384),
                    );
                    ui.label("Temperature:");
                    ui.add(
                        egui::DragValue::new(&mut draft.temperature)
                            .clamp_range(0.0..=2.0)
                            .speed(0.05),
                    );
                });
                ui.label("System prompt:");
                ui.add(
                    egui::TextEdit::multiline(&mut draft.system_prompt)
                        .desired_rows(2)
                        .desired_width(f32::INFINITY),
                );

                ui.add_space(12.0);
                ui.strong("Images");
                ui.horizontal(|ui| {
                    ui.label("Model:");
                    ui.text_edit_singleline(&mut draft.image_model);
                    ui.label("Size:");
                    egui::ComboBox::from_id_source("settings_image_size")
                        .selected_text(&draft.image_size)
                        .show_ui(ui, |ui| {
                            for size in IMAGE_SIZES {
                                ui.selectable_value(
                                    &mut draft.image_size,
                                    size.to_string(),
                                    *size,
                                );
                            }
                        });
                });

                ui.add_space(12.0);
                ui.strong("Duet Personas");
                for (label, persona) in [
                    ("First persona", &mut draft.persona_one),
                    ("Second persona", &mut draft.persona_two),
                ] {
                    ui.horizontal(|ui| {
                        ui.label(format!("{label} name:"));
                        ui.add(
                            egui::TextEdit::singleline(&mut persona.name).desired_width(160.0),
                        );
                    });
                    ui.add(
                        egui::TextEdit::multiline(&mut persona.system_prompt)
                            .desired_rows(2)
                            .desired_width(f32::INFINITY),
                    );
                }

                ui.add_space(12.0);
                ui.strong("Appearance");
                ui.horizontal(|ui| {
                    ui.label("Theme:");
                    ui.selectable_value(&mut draft.theme, Theme::Dark, "Dark");
                    ui.selectable_value(&mut draft.theme, Theme::Light, "Light");
                    ui.label("Font:");
                    ui.add(
                        egui::TextEdit::singleline(&mut draft.font_family)
                            .desired_width(140.0),
                    );
                });
                ui.checkbox(
                    &mut draft.auto_check_updates,
                    "Check for updates on startup",
                );
            });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Save").clicked() {
                let draft = self.settings_page.draft.clone();
                self.apply_settings(draft);
                self.settings_page.status = Some("Settings saved".to_string());
            }
            if ui.button("Revert").clicked() {
                self.settings_page.draft = self.settings.clone();
                self.settings_page.status = None;
            }
            if let Some(status) = &self.settings_page.status {
                ui.label(egui::RichText::new(status).weak());
            }
        });
    }
}

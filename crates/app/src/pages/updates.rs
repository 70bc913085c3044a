//! Update check page, also triggered once at startup when enabled.

use shared::events::UpdateEvent;
use std::sync::mpsc::{channel, Receiver};

use crate::state::AppState;
use crate::ui;

#[derive(Default)]
pub struct UpdatesPage {
    pub checking: bool,
    pub rx: Option<Receiver<UpdateEvent>>,
    pub result: Option<UpdateEvent>,
}

impl AppState {
    pub fn poll_updates(&mut self) {
        let Some(rx) = &self.updates.rx else { return };
        if let Ok(event) = rx.try_recv() {
            if let UpdateEvent::Available { version, .. } = &event {
                tracing::info!("update available: {version}");
            }
            self.updates.result = Some(event);
            self.updates.checking = false;
            self.updates.rx = None;
        }
    }

    pub fn start_update_check(&mut self) {
        if self.updates.checking {
            return;
        }
        self.updates.checking = true;
        let (tx, rx) = channel::<UpdateEvent>();
        self.updates.rx = Some(rx);

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(UpdateEvent::Failed(format!("runtime error: {e}")));
                    return;
                }
            };
            let event = rt.block_on(services::updater::check_for_update(shared::APP_VERSION));
            let _ = tx.send(event);
        });
    }

    pub fn render_updates(&mut self, ui: &mut egui::Ui) {
        ui.heading("Updates");
        ui.label(egui::RichText::new(format!("Current version: {}", shared::APP_VERSION)).weak());
        ui.separator();

        ui.horizontal(|ui| {
            if self.updates.checking {
                ui.spinner();
                ui.label("Checking…");
            } else if ui.button("Check for updates").clicked() {
                self.start_update_check();
            }
        });

        ui.add_space(8.0);
        let mut clear_error = false;
        match &self.updates.result {
            Some(UpdateEvent::UpToDate) => {
                ui.label("You're on the latest version.");
            }
            Some(UpdateEvent::Available {
                version,
                notes,
                url,
            }) => {
                ui.strong(format!("Version {version} is available"));
                if !notes.is_empty() {
                    egui::ScrollArea::vertical()
                        .max_height(240.0)
                        .show(ui, |ui| {
                            ui.label(notes);
                        });
                }
                if ui.button("View release").clicked() {
                    if let Err(e) = open::that(url) {
                        tracing::warn!("could not open release page: {e}");
                    }
                }
            }
            Some(UpdateEvent::Failed(error)) => {
                let error = error.clone();
                ui::error_banner(ui, &error, || clear_error = true);
            }
            None => {}
        }
        if clear_error {
            self.updates.result = None;
        }
    }
}

//! Video generation page. A job is accepted immediately and then polled in
//! the worker until it finishes, which can take minutes; every status
//! observation is reflected in the UI and written through to history.

use serde_json::json;
use services::history::HistoryMode;
use shared::events::{GenerationStatus, VideoEvent};
use shared::settings::ASPECT_RATIOS;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use crate::state::AppState;
use crate::ui;

const POLL_TIMEOUT: Duration = Duration::from_secs(600);
const POLL_INTERVAL: Duration = Duration::from_secs(10);

pub struct VideoJob {
    pub history_id: String,
    pub generation_id: String,
    pub prompt: String,
    /// Submission parameters, frozen at request time; the page combo may
    /// move on while this job is still polling.
    pub aspect_ratio: String,
    pub looping: bool,
    pub status: GenerationStatus,
    pub url: Option<String>,
    pub error: Option<String>,
}

fn job_data(job: &VideoJob) -> serde_json::Value {
    json!({
        "prompt": job.prompt,
        "aspect_ratio": job.aspect_ratio,
        "loop": job.looping,
        "generation_id": job.generation_id,
        "status": job.status,
        "url": job.url,
        "error": job.error,
    })
}

pub struct VideoPage {
    pub prompt: String,
    pub aspect_ratio: String,
    pub looping: bool,
    pub running: bool,
    /// Session job list, newest first. Only the newest can be non-terminal.
    pub jobs: Vec<VideoJob>,
    pub rx: Option<Receiver<VideoEvent>>,
    pub error: Option<String>,
    pub downloading: bool,
    pub download_rx: Option<Receiver<Result<PathBuf, String>>>,
    pub download_status: Option<String>,
}

impl Default for VideoPage {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: "16:9".to_string(),
            looping: false,
            running: false,
            jobs: Vec::new(),
            rx: None,
            error: None,
            downloading: false,
            download_rx: None,
            download_status: None,
        }
    }
}

impl AppState {
    pub fn poll_video(&mut self) {
        if let Some(rx) = &self.video.download_rx {
            if let Ok(result) = rx.try_recv() {
                self.video.downloading = false;
                self.video.download_rx = None;
                self.video.download_status = Some(match result {
                    Ok(path) => format!("Saved to {}", path.display()),
                    Err(e) => format!("Download failed: {e}"),
                });
            }
        }

        let Some(rx) = &self.video.rx else { return };
        let mut done = false;
        let mut dirty = false;
        while let Ok(event) = rx.try_recv() {
            let Some(job) = self.video.jobs.first_mut() else {
                break;
            };
            match event {
                VideoEvent::Accepted { id } => {
                    job.generation_id = id;
                    dirty = true;
                }
                VideoEvent::Status { status, .. } => {
                    if job.status != status {
                        job.status = status;
                        dirty = true;
                    }
                }
                VideoEvent::Ready { url, .. } => {
                    job.status = GenerationStatus::Completed;
                    job.url = Some(url);
                    dirty = true;
                    done = true;
                }
                VideoEvent::Failed { error, .. } => {
                    job.status = GenerationStatus::Failed;
                    job.error = Some(error);
                    dirty = true;
                    done = true;
                }
            }
        }
        if dirty {
            self.persist_active_video_job();
        }
        if done {
            self.video.running = false;
            self.video.rx = None;
        }
    }

    fn persist_active_video_job(&mut self) {
        let Some(job) = self.video.jobs.first() else {
            return;
        };
        let id = job.history_id.clone();
        let data = job_data(job);
        self.history.update_entry_data(HistoryMode::Video, &id, data);
    }

    pub fn start_video_generation(&mut self) {
        if self.video.running {
            return;
        }
        let prompt = self.video.prompt.trim().to_string();
        if prompt.is_empty() {
            return;
        }
        if !self.facade.has_luma_key() {
            self.video.error =
                Some("luma API key not configured. Add one in Settings.".to_string());
            return;
        }
        self.video.error = None;
        self.video.running = true;

        // History gets a placeholder right away so a crash mid-job still
        // leaves a record with the prompt.
        let mut job = VideoJob {
            history_id: String::new(),
            generation_id: String::new(),
            prompt: prompt.clone(),
            aspect_ratio: self.video.aspect_ratio.clone(),
            looping: self.video.looping,
            status: GenerationStatus::Pending,
            url: None,
            error: None,
        };
        let name = crate::pages::chat::session_name(&prompt);
        let entry = self
            .history
            .add_entry(HistoryMode::Video, name, job_data(&job));
        job.history_id = entry.id;

        let facade = self.facade.clone();
        let aspect_ratio = job.aspect_ratio.clone();
        let looping = job.looping;
        self.video.jobs.insert(0, job);
        let (tx, rx) = channel::<VideoEvent>();
        self.video.rx = Some(rx);

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(VideoEvent::Failed {
                        id: String::new(),
                        error: format!("runtime error: {e}"),
                    });
                    return;
                }
            };
            rt.block_on(async move {
                let handle = facade.generate_video(&prompt, &aspect_ratio, looping).await;
                if handle.status == GenerationStatus::Failed {
                    let _ = tx.send(VideoEvent::Failed {
                        id: handle.id,
                        error: handle.error.unwrap_or_else(|| "generation failed".into()),
                    });
                    return;
                }
                let id = handle.id.clone();
                let _ = tx.send(VideoEvent::Accepted { id: id.clone() });

                let poll_tx = tx.clone();
                let poll_id = id.clone();
                let finished = facade
                    .wait_for_video_completion(&id, POLL_TIMEOUT, POLL_INTERVAL, move |h| {
                        let _ = poll_tx.send(VideoEvent::Status {
                            id: poll_id.clone(),
                            status: h.status,
                        });
                    })
                    .await;

                match finished.status {
                    GenerationStatus::Completed => match finished.url {
                        Some(url) => {
                            let _ = tx.send(VideoEvent::Ready { id, url });
                        }
                        None => {
                            let _ = tx.send(VideoEvent::Failed {
                                id,
                                error: "job completed without a video URL".to_string(),
                            });
                        }
                    },
                    _ => {
                        let _ = tx.send(VideoEvent::Failed {
                            id,
                            error: finished
                                .error
                                .unwrap_or_else(|| "generation failed".into()),
                        });
                    }
                }
            });
        });
    }

    fn download_video(&mut self, url: String) {
        if self.video.downloading {
            return;
        }
        let picked = rfd::FileDialog::new()
            .set_file_name("kaleido-video.mp4")
            .add_filter("MP4 video", &["mp4"])
            .save_file();
        let Some(path) = picked else { return };

        self.video.downloading = true;
        self.video.download_status = None;
        let (tx, rx) = channel();
        self.video.download_rx = Some(rx);

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(Err(e.to_string()));
                    return;
                }
            };
            let result = rt
                .block_on(services::media::download_to(&url, &path))
                .map(|_| path)
                .map_err(|e| e.to_string());
            let _ = tx.send(result);
        });
    }

    pub fn render_video(&mut self, ui: &mut egui::Ui) {
        ui.heading("Video");
        ui.label(egui::RichText::new("Dream Machine text-to-video").weak());
        ui.separator();

        ui.horizontal(|ui| {
            ui.add_enabled(
                !self.video.running,
                egui::TextEdit::singleline(&mut self.video.prompt)
                    .hint_text("Describe a video…")
                    .desired_width(ui.available_width() - 240.0),
            );
            egui::ComboBox::from_id_source("video_aspect")
                .selected_text(&self.video.aspect_ratio)
                .show_ui(ui, |ui| {
                    for ratio in ASPECT_RATIOS {
                        ui.selectable_value(
                            &mut self.video.aspect_ratio,
                            ratio.to_string(),
                            *ratio,
                        );
                    }
                });
            ui.checkbox(&mut self.video.looping, "Loop");
            if self.video.running {
                ui.spinner();
            } else if ui.button("Generate").clicked() {
                self.start_video_generation();
            }
        });

        if let Some(error) = self.video.error.clone() {
            ui::error_banner(ui, &error, || self.video.error = None);
        }
        if let Some(status) = &self.video.download_status {
            ui.label(egui::RichText::new(status).weak());
        }

        ui.separator();
        let mut open_url: Option<String> = None;
        let mut download_url: Option<String> = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for job in &self.video.jobs {
                    ui.group(|ui| {
                        ui.label(&job.prompt);
                        ui.horizontal(|ui| {
                            if !job.status.is_terminal() {
                                ui.spinner();
                            }
                            ui.label(egui::RichText::new(job.status.label()).weak());
                            if let Some(error) = &job.error {
                                ui.colored_label(
                                    egui::Color32::from_rgb(220, 80, 80),
                                    error,
                                );
                            }
                            if let Some(url) = &job.url {
                                if ui.small_button("Open").clicked() {
                                    open_url = Some(url.clone());
                                }
                                let can_download = !self.video.downloading;
                                if ui
                                    .add_enabled(
                                        can_download,
                                        egui::Button::new("Download…").small(),
                                    )
                                    .clicked()
                                {
                                    download_url = Some(url.clone());
                                }
                            }
                        });
                    });
                    ui.add_space(8.0);
                }
            });

        if let Some(url) = open_url {
            if let Err(e) = open::that(&url) {
                self.video.error = Some(format!("could not open video: {e}"));
            }
        }
        if let Some(url) = download_url {
            self.download_video(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_data_shape() {
        let job = VideoJob {
            history_id: "h1".to_string(),
            generation_id: "gen-9".to_string(),
            prompt: "a storm".to_string(),
            aspect_ratio: "9:16".to_string(),
            looping: true,
            status: GenerationStatus::Processing,
            url: None,
            error: None,
        };
        let data = job_data(&job);
        assert_eq!(data["prompt"], "a storm");
        assert_eq!(data["aspect_ratio"], "9:16");
        assert_eq!(data["loop"], true);
        assert_eq!(data["generation_id"], "gen-9");
        assert_eq!(data["status"], "processing");
        assert!(data["url"].is_null());
    }

    #[test]
    fn test_job_keeps_submission_aspect_ratio() {
        let mut page = VideoPage::default();
        page.aspect_ratio = "1:1".to_string();
        let job = VideoJob {
            history_id: "h2".to_string(),
            generation_id: String::new(),
            prompt: "a koi pond".to_string(),
            aspect_ratio: page.aspect_ratio.clone(),
            looping: false,
            status: GenerationStatus::Pending,
            url: None,
            error: None,
        };
        // The page combo moving on must not rewrite the stored job.
        page.aspect_ratio = "16:9".to_string();
        assert_eq!(job_data(&job)["aspect_ratio"], "1:1");
    }
}

//! Image generation page. Results live in a session-local gallery; provider
//! URLs expire quickly, so the worker downloads the bytes immediately and
//! the gallery renders from memory.

use shared::events::ImageEvent;
use std::sync::mpsc::{channel, Receiver, TryRecvError};

use crate::state::AppState;
use crate::ui;

pub struct GalleryImage {
    pub prompt: String,
    pub url: String,
    pub bytes: Vec<u8>,
    pub texture: Option<egui::TextureHandle>,
}

#[derive(Default)]
pub struct ImagesPage {
    pub prompt: String,
    pub count: u32,
    pub generating: bool,
    pub rx: Option<Receiver<ImageEvent>>,
    pub gallery: Vec<GalleryImage>,
    pub error: Option<String>,
}

fn decode_texture(
    ctx: &egui::Context,
    name: &str,
    bytes: &[u8],
) -> Option<egui::TextureHandle> {
    let decoded = image::load_from_memory(bytes).ok()?.to_rgba8();
    let size = [decoded.width() as usize, decoded.height() as usize];
    let color = egui::ColorImage::from_rgba_unmultiplied(size, decoded.as_raw());
    Some(ctx.load_texture(name.to_string(), color, Default::default()))
}

impl AppState {
    pub fn poll_images(&mut self, ctx: &egui::Context) {
        let Some(rx) = &self.images.rx else { return };
        loop {
            match rx.try_recv() {
                Ok(ImageEvent::Generated { prompt, url, bytes }) => {
                    let name = format!("gallery-{}", self.images.gallery.len());
                    let texture = decode_texture(ctx, &name, &bytes);
                    if texture.is_none() {
                        tracing::warn!("could not decode generated image from {url}");
                    }
                    self.images.gallery.insert(
                        0,
                        GalleryImage {
                            prompt,
                            url,
                            bytes,
                            texture,
                        },
                    );
                }
                Ok(ImageEvent::Failed(error)) => {
                    self.images.error = Some(error);
                }
                // Worker finished and the channel drained.
                Err(TryRecvError::Disconnected) => {
                    self.images.generating = false;
                    self.images.rx = None;
                    return;
                }
                Err(TryRecvError::Empty) => return,
            }
        }
    }

    pub fn start_image_generation(&mut self) {
        if self.images.generating {
            return;
        }
        let prompt = self.images.prompt.trim().to_string();
        if prompt.is_empty() {
            return;
        }
        if !self.facade.has_chat_key(shared::settings::ChatProvider::OpenAi) {
            self.images.error =
                Some("openai API key not configured. Add one in Settings.".to_string());
            return;
        }
        self.images.error = None;
        self.images.generating = true;

        let facade = self.facade.clone();
        let model = self.settings.image_model.clone();
        let size = self.settings.image_size.clone();
        let count = self.images.count.max(1);

        let (tx, rx) = channel::<ImageEvent>();
        self.images.rx = Some(rx);

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(ImageEvent::Failed(format!("runtime error: {e}")));
                    return;
                }
            };
            rt.block_on(async move {
                let urls = match facade
                    .generate_image(&prompt, &model, &size, "standard", count)
                    .await
                {
                    Ok(urls) => urls,
                    Err(e) => {
                        let _ = tx.send(ImageEvent::Failed(e.to_string()));
                        return;
                    }
                };
                for url in urls {
                    match services::media::fetch_bytes(&url).await {
                        Ok(bytes) => {
                            let _ = tx.send(ImageEvent::Generated {
                                prompt: prompt.clone(),
                                url,
                                bytes,
                            });
                        }
                        Err(e) => {
                            let _ = tx.send(ImageEvent::Failed(e.to_string()));
                        }
                    }
                }
            });
        });
    }

    pub fn render_images(&mut self, ui: &mut egui::Ui) {
        ui.heading("Images");
        ui.label(
            egui::RichText::new(format!(
                "{} · {}",
                self.settings.image_model, self.settings.image_size
            ))
            .weak(),
        );
        ui.separator();

        if self.images.count == 0 {
            self.images.count = 1;
        }
        ui.horizontal(|ui| {
            ui.add_enabled(
                !self.images.generating,
                egui::TextEdit::singleline(&mut self.images.prompt)
                    .hint_text("Describe an image…")
                    .desired_width(ui.available_width() - 220.0),
            );
            ui.label("Count:");
            ui.add_enabled(
                !self.images.generating,
                egui::DragValue::new(&mut self.images.count).clamp_range(1..=4),
            );
            if self.images.generating {
                ui.spinner();
            } else if ui.button("Generate").clicked() {
                self.start_image_generation();
            }
        });

        if let Some(error) = self.images.error.clone() {
            ui::error_banner(ui, &error, || self.images.error = None);
        }

        ui.separator();
        let mut save_request: Option<usize> = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (index, item) in self.images.gallery.iter().enumerate() {
                    ui.group(|ui| {
                        if let Some(texture) = &item.texture {
                            let max_width = ui.available_width().min(480.0);
                            let aspect =
                                texture.size()[1] as f32 / texture.size()[0] as f32;
                            ui.image((
                                texture.id(),
                                egui::vec2(max_width, max_width * aspect),
                            ));
                        } else {
                            ui.label("(could not decode image)");
                        }
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new(&item.prompt).weak());
                            if ui.small_button("Save…").clicked() {
                                save_request = Some(index);
                            }
                        });
                    });
                    ui.add_space(8.0);
                }
            });

        if let Some(index) = save_request {
            self.save_gallery_image(index);
        }
    }

    fn save_gallery_image(&mut self, index: usize) {
        let Some(item) = self.images.gallery.get(index) else {
            return;
        };
        let picked = rfd::FileDialog::new()
            .set_file_name("kaleido-image.png")
            .add_filter("PNG image", &["png"])
            .save_file();
        if let Some(path) = picked {
            if let Err(e) = std::fs::write(&path, &item.bytes) {
                self.images.error = Some(format!("failed to save image: {e}"));
            }
        }
    }
}

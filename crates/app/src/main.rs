use eframe::egui;
use parking_lot::Mutex;
use shared::settings::Theme;
use std::sync::Arc;

mod pages;
mod state;
mod ui;

use state::{AppState, Page};

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([900.0, 600.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "Kaleido",
        options,
        Box::new(|_cc| {
            Box::new(KaleidoApp {
                state: Arc::new(Mutex::new(AppState::default())),
            })
        }),
    )
}

struct KaleidoApp {
    state: Arc<Mutex<AppState>>,
}

/// Resolve the configured font family name against the families egui ships
/// with. Anything that isn't a monospace request renders proportional.
fn font_family(name: &str) -> egui::FontFamily {
    let name = name.trim();
    if name.eq_ignore_ascii_case("monospace") || name.eq_ignore_ascii_case("mono") {
        egui::FontFamily::Monospace
    } else {
        egui::FontFamily::Proportional
    }
}

impl eframe::App for KaleidoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut s = self.state.lock();

        // Drain worker channels (non-blocking), then keep repainting while
        // anything is still running so the next frame polls again.
        s.poll(ctx);
        if s.any_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        let mut style = (*ctx.style()).clone();
        style.visuals = match s.settings.theme {
            Theme::Dark => {
                let mut visuals = egui::Visuals::dark();
                visuals.panel_fill = egui::Color32::from_rgb(28, 28, 33);
                visuals
            }
            Theme::Light => egui::Visuals::light(),
        };
        style.visuals.window_rounding = egui::Rounding::same(10.0);
        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        let family = font_family(&s.settings.font_family);
        for font_id in style.text_styles.values_mut() {
            font_id.family = family.clone();
        }
        ctx.set_style(style);

        egui::SidePanel::left("nav")
            .resizable(false)
            .exact_width(150.0)
            .show(ctx, |ui| {
                ui.add_space(12.0);
                ui.heading("Kaleido");
                ui.add_space(12.0);
                for page in Page::ALL {
                    if ui
                        .selectable_label(s.page == *page, page.label())
                        .clicked()
                    {
                        s.page = *page;
                    }
                }
                ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                    ui.add_space(8.0);
                    ui.label(egui::RichText::new(format!("v{}", shared::APP_VERSION)).weak());
                });
            });

        if s.page.has_history() {
            egui::SidePanel::right("history")
                .resizable(true)
                .default_width(220.0)
                .show(ctx, |ui| {
                    s.render_history_panel(ui);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| match s.page {
            Page::Chat => s.render_chat(ui),
            Page::Duet => s.render_duet(ui),
            Page::Compare => s.render_compare(ui),
            Page::Images => s.render_images(ui),
            Page::Video => s.render_video(ui),
            Page::Settings => s.render_settings(ui),
            Page::Feedback => s.render_feedback(ui),
            Page::Updates => s.render_updates(ui),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_family_mapping() {
        assert_eq!(font_family("Monospace"), egui::FontFamily::Monospace);
        assert_eq!(font_family(" mono "), egui::FontFamily::Monospace);
        assert_eq!(font_family("Inter"), egui::FontFamily::Proportional);
        assert_eq!(font_family(""), egui::FontFamily::Proportional);
    }
}

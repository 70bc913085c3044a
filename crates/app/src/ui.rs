//! Small rendering helpers shared by the pages.

/// Chat bubble; user turns align right, assistant turns left.
pub fn message_bubble(ui: &mut egui::Ui, content: &str, from_user: bool) {
    let (fill, layout) = if from_user {
        (
            egui::Color32::from_rgb(45, 85, 135),
            egui::Layout::right_to_left(egui::Align::Min),
        )
    } else {
        (
            egui::Color32::from_rgb(55, 55, 62),
            egui::Layout::left_to_right(egui::Align::Min),
        )
    };
    ui.with_layout(layout, |ui| {
        egui::Frame::none()
            .fill(fill)
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::symmetric(10.0, 8.0))
            .show(ui, |ui| {
                ui.set_max_width(ui.available_width() * 0.8);
                ui.label(egui::RichText::new(content).color(egui::Color32::WHITE));
            });
    });
    ui.add_space(6.0);
}

/// Duet bubble with the speaking persona's name above it.
pub fn speaker_bubble(ui: &mut egui::Ui, speaker: &str, content: &str, align_right: bool) {
    let layout = if align_right {
        egui::Layout::right_to_left(egui::Align::Min)
    } else {
        egui::Layout::left_to_right(egui::Align::Min)
    };
    ui.with_layout(layout, |ui| {
        ui.label(egui::RichText::new(speaker).strong().small());
    });
    message_bubble(ui, content, align_right);
}

/// Dismissible error strip.
pub fn error_banner(ui: &mut egui::Ui, message: &str, on_dismiss: impl FnOnce()) {
    egui::Frame::none()
        .fill(egui::Color32::from_rgb(70, 30, 30))
        .rounding(egui::Rounding::same(6.0))
        .inner_margin(egui::Margin::symmetric(8.0, 6.0))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::from_rgb(240, 160, 160), message);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("✖").clicked() {
                        on_dismiss();
                    }
                });
            });
        });
}

//! Feedback page: prefills a GitHub issue in the user's browser.

use crate::state::AppState;

const ISSUES_URL: &str = "https://github.com/kaleido-app/kaleido/issues/new";

/// Build the prefilled new-issue URL.
pub fn feedback_url(title: &str, body: &str) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("title", title)
        .append_pair("body", body)
        .finish();
    format!("{ISSUES_URL}?{query}")
}

#[derive(Default)]
pub struct FeedbackPage {
    pub title: String,
    pub body: String,
    pub status: Option<String>,
}

impl AppState {
    pub fn render_feedback(&mut self, ui: &mut egui::Ui) {
        ui.heading("Feedback");
        ui.label(
            egui::RichText::new("Found a bug or have an idea? This opens a prefilled GitHub issue in your browser.")
                .weak(),
        );
        ui.separator();

        ui.label("Title:");
        ui.text_edit_singleline(&mut self.feedback.title);
        ui.add_space(4.0);
        ui.label("Details:");
        ui.add(
            egui::TextEdit::multiline(&mut self.feedback.body)
                .desired_rows(8)
                .desired_width(f32::INFINITY),
        );

        ui.add_space(8.0);
        let ready = !self.feedback.title.trim().is_empty();
        if ui
            .add_enabled(ready, egui::Button::new("Open issue in browser"))
            .clicked()
        {
            let body = format!(
                "{}\n\n---\nKaleido {}",
                self.feedback.body.trim(),
                shared::APP_VERSION
            );
            let url = feedback_url(self.feedback.title.trim(), &body);
            self.feedback.status = Some(match open::that(&url) {
                Ok(()) => "Opened in browser".to_string(),
                Err(e) => format!("Could not open browser: {e}"),
            });
        }
        if let Some(status) = &self.feedback.status {
            ui.label(egui::RichText::new(status).weak());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_url_encodes_fields() {
        let url = feedback_url("crash on save", "steps:\n1. open & close");
        assert!(url.starts_with("https://github.com/kaleido-app/kaleido/issues/new?"));
        assert!(url.contains("title=crash+on+save"));
        // Ampersand in the body must not split the query.
        assert!(url.contains("%26"));
        assert_eq!(url.matches("body=").count(), 1);
    }
}

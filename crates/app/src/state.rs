use providers::facade::ProviderFacade;
use services::history::HistoryStore;
use shared::settings::AppSettings;
use std::path::PathBuf;
use std::sync::Arc;

use crate::pages::chat::ChatPage;
use crate::pages::compare::ComparePage;
use crate::pages::duet::DuetPage;
use crate::pages::feedback::FeedbackPage;
use crate::pages::history_panel::HistoryPanel;
use crate::pages::images::ImagesPage;
use crate::pages::settings::SettingsPage;
use crate::pages::updates::UpdatesPage;
use crate::pages::video::VideoPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Chat,
    Duet,
    Compare,
    Images,
    Video,
    Settings,
    Feedback,
    Updates,
}

impl Page {
    pub const ALL: &'static [Page] = &[
        Page::Chat,
        Page::Duet,
        Page::Compare,
        Page::Images,
        Page::Video,
        Page::Settings,
        Page::Feedback,
        Page::Updates,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Page::Chat => "Chat",
            Page::Duet => "AI Duet",
            Page::Compare => "Compare",
            Page::Images => "Images",
            Page::Video => "Video",
            Page::Settings => "Settings",
            Page::Feedback => "Feedback",
            Page::Updates => "Updates",
        }
    }

    /// Pages with saved sessions get the history side panel.
    pub fn has_history(self) -> bool {
        matches!(self, Page::Chat | Page::Duet | Page::Compare)
    }
}

pub struct AppState {
    pub settings: AppSettings,
    pub settings_path: Option<PathBuf>,
    /// Swapped wholesale when settings change; workers keep the Arc they
    /// started with, so mid-flight requests finish on the old credentials.
    pub facade: Arc<ProviderFacade>,
    pub history: HistoryStore,

    pub page: Page,
    pub chat: ChatPage,
    pub duet: DuetPage,
    pub compare: ComparePage,
    pub images: ImagesPage,
    pub video: VideoPage,
    pub settings_page: SettingsPage,
    pub feedback: FeedbackPage,
    pub updates: UpdatesPage,
    pub history_panel: HistoryPanel,
}

impl Default for AppState {
    fn default() -> Self {
        let settings_path = AppSettings::default_path();
        let settings = AppSettings::load_or_default(settings_path.as_deref());
        let facade = Arc::new(ProviderFacade::from_settings(&settings));
        let settings_page = SettingsPage::new(&settings);
        let mut state = Self {
            facade,
            history: HistoryStore::open(None),
            page: Page::Chat,
            chat: ChatPage::default(),
            duet: DuetPage::default(),
            compare: ComparePage::new(&settings),
            images: ImagesPage::default(),
            video: VideoPage::default(),
            settings_page,
            feedback: FeedbackPage::default(),
            updates: UpdatesPage::default(),
            history_panel: HistoryPanel::default(),
            settings_path,
            settings,
        };
        if state.settings.auto_check_updates {
            state.start_update_check();
        }
        state
    }
}

impl AppState {
    /// Persist new settings and rebuild the provider façade. The old façade
    /// stays alive inside any worker still holding its Arc.
    pub fn apply_settings(&mut self, settings: AppSettings) {
        self.settings = settings;
        self.settings.save(self.settings_path.as_deref());
        self.facade = Arc::new(ProviderFacade::from_settings(&self.settings));
        tracing::info!("settings saved, provider facade rebuilt");
    }

    /// Drain every worker channel; called once per frame.
    pub fn poll(&mut self, ctx: &egui::Context) {
        self.poll_chat();
        self.poll_duet();
        self.poll_compare();
        self.poll_images(ctx);
        self.poll_video();
        self.poll_updates();
    }

    /// True while any background worker is running, which keeps the frame
    /// loop repainting so polls keep happening.
    pub fn any_busy(&self) -> bool {
        self.chat.streaming
            || self.duet.running
            || self.compare.running()
            || self.images.generating
            || self.video.running
            || self.video.downloading
            || self.updates.checking
    }
}

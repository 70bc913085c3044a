pub mod chat;
pub mod compare;
pub mod duet;
pub mod feedback;
pub mod history_panel;
pub mod images;
pub mod settings;
pub mod updates;
pub mod video;

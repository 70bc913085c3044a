//! Application services that sit between the UI and the outside world:
//! the on-disk history store, release checks, and media downloads.

pub mod history;
pub mod media;
pub mod updater;

pub mod convert;
pub mod prefs;
pub mod rate;
pub mod ui;

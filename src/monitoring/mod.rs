pub mod console_display;
pub mod path_report;

pub mod iced_ui;
pub mod map_canvas;

pub use iced_ui::run_iced_app;

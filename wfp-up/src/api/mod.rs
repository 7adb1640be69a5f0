//! HTTP API handlers for wfp-up

pub mod health;
pub mod ui;
pub mod upload;

pub use health::health_routes;
pub use ui::serve_index;
pub use upload::{create_peaks, upload_page};

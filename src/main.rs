//! Furniture Viewer
//!
//! Builds a chair, coffee table or floor lamp from primitive shapes and
//! renders it with wgpu. Drag rotates the model, pinch or mouse wheel zooms,
//! and the bottom panel swaps furniture and color.

mod app;
mod config;
mod model;
mod render;
mod scene;
mod transform;
mod ui;

use app::AppError;
use config::ViewerConfig;

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = ViewerConfig::from_env()?;
    app::run(config)
}

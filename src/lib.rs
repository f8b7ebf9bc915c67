pub mod bitmap_face;
pub mod config;
pub mod deadline;
pub mod duration;
pub mod encoding;
pub mod engine;
pub mod error_codes;
pub mod font_assets;
pub mod layout;
pub mod logging;
pub mod palette;
pub mod renderer;
pub mod schema;
pub mod server;

//! Gorium - keeps a Minecraft mods folder in sync with Modrinth
//!
//! - Fingerprints the mods folder and looks the hashes up on the registry
//! - Resolves the newest version compatible with a game version and loader
//! - Reconciles installed against latest and swaps outdated files
//! - Profiles pin a folder to a game version and loader

pub mod app;
pub mod config;
pub mod profiles;
pub mod registry;
pub mod sync;

pub use app::App;
pub use config::Config;

//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//! - Plain variables shared with the rest of the platform (PORT, JWT_SECRET,
//!   DATABASE_URL, CORS_ORIGIN)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signal_server::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Server will listen on {}", settings.server_addr());
//! ```

mod settings;

pub use settings::*;

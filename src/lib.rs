// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

pub mod cache;
pub mod config;
pub mod diagnosis;
pub mod probe;
pub mod server;
pub mod types;
pub mod utils;

pub use config::*;
pub use diagnosis::*;
pub use types::*;

pub mod factory;
pub mod inmem;
pub mod null;
pub mod redis;
pub mod sqlite;
pub mod types;


pub use factory::*;
pub use types::*;

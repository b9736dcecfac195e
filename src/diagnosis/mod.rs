mod classify;
mod collaborators;
mod controller;
mod messages;
mod output;
mod url;


pub use classify::*;
pub use collaborators::*;
pub use controller::*;
pub use output::*;
pub use url::*;

pub mod content;
pub mod status;

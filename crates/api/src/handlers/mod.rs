pub mod bulk;
pub mod content;
pub mod versions;

pub mod fs;
pub mod path;
pub mod text;

pub mod cluster;
pub mod engine;
pub mod exif;
pub mod extract;
pub mod hash;
pub mod organize;
pub mod tagging;

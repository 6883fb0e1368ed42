pub mod extractors;
pub mod info;

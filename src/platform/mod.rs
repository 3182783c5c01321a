pub mod icon_extractor;
pub mod trash;

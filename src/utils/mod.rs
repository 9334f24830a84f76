pub mod data;
pub mod export;
pub mod merge;

pub mod export;
pub mod posts;

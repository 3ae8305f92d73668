pub mod batch;
pub mod config;
pub mod errors;
pub mod models;
pub mod oauth;
pub mod retention;
pub mod sweeper;
pub mod twitter_api;

pub const TIMELINE_PAGE_SIZE: u32 = 200; // Largest page the timeline endpoint serves

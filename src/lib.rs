#![forbid(unsafe_code)]

pub mod blocks;
pub mod cli;
pub mod client;
pub mod export;
pub mod extras;
pub mod generator;
pub mod logging;
pub mod naturalize;
pub mod patch;
pub mod prompts;
pub mod storage;
pub mod store;
pub mod treatment;

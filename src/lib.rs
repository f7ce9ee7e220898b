#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod export;
pub mod formats;
pub mod gemini;
pub mod generate;
pub mod logging;
pub mod normalize;
pub mod playback;
pub mod prompt;
pub mod speech;
pub mod viewer;

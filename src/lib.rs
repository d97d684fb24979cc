use anyhow::Result;

pub mod alerts;
pub mod archive;
pub mod compose;
pub mod error;
pub mod generate;
pub mod lookup;
pub mod mastodon;
pub mod relay;
pub mod sanitize;
pub mod types;

pub const APP_NAME: &str = "coctbots";

pub fn set_up_logger(calling_module: &'static str, verbose: bool) -> Result<()> {
    jluszcz_rust_utils::set_up_logger(APP_NAME, calling_module, verbose)
}

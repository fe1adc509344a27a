//! Command implementations

pub mod cache;
pub mod cat;
pub mod path;
pub mod stream;

use npm_readfile::GlobalContext;

/// Prefix addresses without a scheme with the configured registry.
pub fn expand_address(address: &str, ctx: &GlobalContext) -> String {
    if address.contains("://") {
        return address.to_string();
    }

    let registry = &ctx.config().registry.url;
    format!(
        "{}/{}",
        registry.trim_end_matches('/'),
        address.trim_start_matches('/')
    )
}

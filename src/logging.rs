use env_logger::{Builder, Env, WriteStyle};
use log::info;

/// Initialize logging to stderr. `RUST_LOG` overrides the default `info` level.
pub fn initialize_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_module_path(true)
        .write_style(WriteStyle::Auto)
        .init();

    info!("Logging system initialized");
}

/// Masks a secret for logging, keeping two characters at each end.
pub fn mask(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}***{tail}")
}

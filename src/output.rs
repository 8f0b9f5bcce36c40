//! # Output Configuration
//!
//! Rendering policy for the `scoped-repo` CLI: whether scenario results get
//! colors and emoji markers, and the helpers that apply that choice.
//!
//! Color is decided once per invocation from the `--color` flag and, in
//! `auto` mode, from the environment:
//! - `NO_COLOR` set (any value) disables colors (https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE` set to a non-zero value forces colors on a non-TTY
//! - `TERM=dumb` disables colors
//!
//! Otherwise the terminal's own capabilities decide.

use console::{style, Term};
use std::env;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Build the configuration from the `--color` flag value (`always`,
    /// `never` or `auto`). Unknown values behave like `auto`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_ascii_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => color_from_env(),
        };
        Self { use_color }
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

fn color_from_env() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    let var_is = |name: &str, pred: fn(&str) -> bool| env::var(name).is_ok_and(|v| pred(&v));
    if var_is("CLICOLOR", |v| v == "0") || var_is("TERM", |v| v == "dumb") {
        return false;
    }
    if var_is("CLICOLOR_FORCE", |v| !v.is_empty() && v != "0") {
        return true;
    }
    Term::stdout().features().colors_supported()
}

/// `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Pass/fail marker for one scenario step.
pub fn status(config: &OutputConfig, passed: bool) -> String {
    let label = if passed { "PASS" } else { "FAIL" };
    if !config.use_color {
        return label.to_string();
    }
    let styled = style(label).bold().force_styling(true);
    if passed {
        styled.green().to_string()
    } else {
        styled.red().to_string()
    }
}

/// Dims secondary text such as step details.
pub fn dim(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).dim().force_styling(true).to_string()
    } else {
        text.to_string()
    }
}

//! Console output icons.

use console::{style, StyledObject};

/// Green ✓.
pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

/// Cyan →.
pub fn info() -> StyledObject<&'static str> {
    style("→").cyan()
}

/// Yellow !.
pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow()
}

/// Red ✗.
pub fn error() -> StyledObject<&'static str> {
    style("✗").red()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icons_render_symbols() {
        console::set_colors_enabled(false);
        assert_eq!(success().to_string(), "✓");
        assert_eq!(info().to_string(), "→");
        assert_eq!(warn().to_string(), "!");
        assert_eq!(error().to_string(), "✗");
    }
}

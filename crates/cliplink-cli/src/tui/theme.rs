//! Dashboard color themes.

use ratatui::style::Color;

/// Colors used by the dashboard.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Theme name
    pub name: String,

    /// Title and key hints
    pub accent: Color,
    /// Connected status and "sync on"
    pub success: Color,
    /// Searching status and "sync off"
    pub error: Color,

    /// `[Local]` tag
    pub local_tag: Color,
    /// `[Remote]` tag
    pub remote_tag: Color,

    /// Clip content
    pub text_primary: Color,
    /// Timestamps, dividers and footer text
    pub text_muted: Color,
}

impl Theme {
    /// Create the dark theme.
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            accent: Color::Cyan,
            success: Color::Green,
            error: Color::Red,
            local_tag: Color::Yellow,
            remote_tag: Color::Cyan,
            text_primary: Color::White,
            text_muted: Color::DarkGray,
        }
    }

    /// Create the light theme.
    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            accent: Color::Blue,
            success: Color::Rgb(0, 128, 0),
            error: Color::Rgb(180, 0, 0),
            local_tag: Color::Rgb(160, 100, 0),
            remote_tag: Color::Rgb(0, 110, 140),
            text_primary: Color::Black,
            text_muted: Color::Gray,
        }
    }

    /// Create a theme by name. Unknown names fall back to dark.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Theme::from_name("LIGHT").name, "light");
        assert_eq!(Theme::from_name("dark").name, "dark");
        assert_eq!(Theme::from_name("neon").name, "dark");
    }
}

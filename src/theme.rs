use serde::{Deserialize, Serialize};

use crate::context::FontStyle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_style: FontStyle,
    pub big_font_size: f32,
    pub small_font_size: f32,
    pub text_color: String,
    pub line_color: String,
    pub line_width: f32,
    pub background: String,
}

impl Theme {
    /// Segoe UI 16/11 px, black ink on white.
    pub fn classic() -> Self {
        Self {
            font_family: "Segoe UI".to_string(),
            font_style: FontStyle::Regular,
            big_font_size: 16.0,
            small_font_size: 11.0,
            text_color: "#000000".to_string(),
            line_color: "#000000".to_string(),
            line_width: 1.0,
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_style: FontStyle::Regular,
            big_font_size: 15.0,
            small_font_size: 12.0,
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            line_width: 1.4,
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "classic" | "default" => Some(Self::classic()),
            "modern" => Some(Self::modern()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

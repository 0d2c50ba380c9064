//! Design tokens
//!
//! A [`DesignTokens`] value is built once at startup and handed to whatever
//! renders styles. Presets differ only in corner radii and shadows.

use std::fmt::Write;

use serde::Deserialize;
use serde::Serialize;

/// Color palette as CSS color strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colors {
    pub primary: String,
    pub primary_foreground: String,
    pub secondary: String,
    pub background: String,
    pub surface: String,
    pub text: String,
    pub text_muted: String,
    pub border: String,
    pub success: String,
    pub warning: String,
    pub danger: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            primary: "#2563eb".into(),
            primary_foreground: "#ffffff".into(),
            secondary: "#64748b".into(),
            background: "#f8fafc".into(),
            surface: "#ffffff".into(),
            text: "#0f172a".into(),
            text_muted: "#64748b".into(),
            border: "#e2e8f0".into(),
            success: "#16a34a".into(),
            warning: "#d97706".into(),
            danger: "#dc2626".into(),
        }
    }
}

/// Spacing scale in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spacing {
    pub xs: u16,
    pub sm: u16,
    pub md: u16,
    pub lg: u16,
    pub xl: u16,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            xs: 4,
            sm: 8,
            md: 16,
            lg: 24,
            xl: 32,
        }
    }
}

/// Corner radii in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Radius {
    pub sm: u16,
    pub md: u16,
    pub lg: u16,
    pub full: u16,
}

/// Box shadows as CSS values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shadows {
    pub sm: String,
    pub md: String,
    pub lg: String,
}

/// Named token presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Sharp,
    Rounded,
}

/// The full set of design tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignTokens {
    pub colors: Colors,
    pub spacing: Spacing,
    pub radius: Radius,
    pub shadows: Shadows,
}

impl Default for DesignTokens {
    fn default() -> Self {
        Self::rounded()
    }
}

impl DesignTokens {
    /// Square corners and flat, hard-edged shadows.
    pub fn sharp() -> Self {
        Self {
            colors: Colors::default(),
            spacing: Spacing::default(),
            radius: Radius {
                sm: 0,
                md: 0,
                lg: 0,
                full: 0,
            },
            shadows: Shadows {
                sm: "none".into(),
                md: "0 1px 0 0 rgba(15, 23, 42, 0.12)".into(),
                lg: "0 2px 0 0 rgba(15, 23, 42, 0.16)".into(),
            },
        }
    }

    /// Soft corners and diffuse shadows.
    pub fn rounded() -> Self {
        Self {
            colors: Colors::default(),
            spacing: Spacing::default(),
            radius: Radius {
                sm: 4,
                md: 8,
                lg: 12,
                full: 9999,
            },
            shadows: Shadows {
                sm: "0 1px 2px 0 rgba(15, 23, 42, 0.05)".into(),
                md: "0 4px 6px -1px rgba(15, 23, 42, 0.10)".into(),
                lg: "0 10px 15px -3px rgba(15, 23, 42, 0.10)".into(),
            },
        }
    }

    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Sharp => Self::sharp(),
            Preset::Rounded => Self::rounded(),
        }
    }

    /// Switches shape tokens to a preset, keeping colors and spacing.
    pub fn with_preset(self, preset: Preset) -> Self {
        let shape = Self::preset(preset);
        Self {
            radius: shape.radius,
            shadows: shape.shadows,
            ..self
        }
    }

    pub fn with_colors(mut self, colors: Colors) -> Self {
        self.colors = colors;
        self
    }

    /// Every token as a `(--name, value)` pair, in a fixed order.
    pub fn css_variables(&self) -> Vec<(String, String)> {
        let c = &self.colors;
        let colors = [
            ("primary", &c.primary),
            ("primary-foreground", &c.primary_foreground),
            ("secondary", &c.secondary),
            ("background", &c.background),
            ("surface", &c.surface),
            ("text", &c.text),
            ("text-muted", &c.text_muted),
            ("border", &c.border),
            ("success", &c.success),
            ("warning", &c.warning),
            ("danger", &c.danger),
        ];
        let s = &self.spacing;
        let spacing = [("xs", s.xs), ("sm", s.sm), ("md", s.md), ("lg", s.lg), ("xl", s.xl)];
        let r = &self.radius;
        let radius = [("sm", r.sm), ("md", r.md), ("lg", r.lg), ("full", r.full)];
        let sh = &self.shadows;
        let shadows = [("sm", &sh.sm), ("md", &sh.md), ("lg", &sh.lg)];

        let mut vars = Vec::new();
        vars.extend(colors.iter().map(|(k, v)| (format!("--color-{k}"), v.to_string())));
        vars.extend(spacing.iter().map(|(k, v)| (format!("--spacing-{k}"), format!("{v}px"))));
        vars.extend(radius.iter().map(|(k, v)| (format!("--radius-{k}"), format!("{v}px"))));
        vars.extend(shadows.iter().map(|(k, v)| (format!("--shadow-{k}"), v.to_string())));
        vars
    }

    /// A `:root { ... }` block declaring every token.
    pub fn to_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in self.css_variables() {
            let _ = writeln!(css, "  {name}: {value};");
        }
        css.push('}');
        css
    }
}

//! Spacing, alignment, and margin configuration

use serde::Deserialize;

use crate::error::{DiagramError, Result};
use crate::layout::types::{HAlign, VAlign};

/// Tunable layout values, adjustable from a `settings:` block or a profile
/// file. Shape blocks with their own spec get a copy, so their overrides
/// stay local.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Width given to a column of spaces between elements.
    pub horizontal_spacer: f64,
    /// Height given to a blank row between elements.
    pub vertical_spacer: f64,
    /// Default per-character width for text elements without explicit sizes.
    pub text_width: f64,
    /// Default height for text elements without explicit sizes.
    pub text_height: f64,
    pub grid_align: HAlign,
    pub grid_valign: VAlign,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            horizontal_spacer: 20.0,
            vertical_spacer: 20.0,
            text_width: 5.0,
            text_height: 30.0,
            grid_align: HAlign::Center,
            grid_valign: VAlign::Middle,
        }
    }
}

impl Settings {
    pub fn set(&mut self, key: &str, value: &str, line: usize) -> Result<()> {
        match key {
            "horizontal-spacer" => self.horizontal_spacer = parse_number(key, value, line)?,
            "vertical-spacer" => self.vertical_spacer = parse_number(key, value, line)?,
            "text-width" => self.text_width = parse_number(key, value, line)?,
            "text-height" => self.text_height = parse_number(key, value, line)?,
            "grid-align" => self.grid_align = HAlign::from_words(&[value]),
            "grid-valign" => self.grid_valign = VAlign::from_words(&[value]),
            other => {
                return Err(DiagramError::invalid_spec(
                    format!("Unknown setting: {other}"),
                    line,
                ))
            }
        }
        Ok(())
    }
}

/// Whitespace around the default layer of the top-level diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Margin {
            top: 30.0,
            right: 30.0,
            bottom: 30.0,
            left: 30.0,
        }
    }
}

impl Margin {
    /// Nested shape layouts carry no margin of their own.
    pub fn zero() -> Self {
        Margin {
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        }
    }

    pub fn set(&mut self, side: &str, value: &str, line: usize) -> Result<()> {
        let v = parse_number(side, value, line)?;
        match side {
            "top" => self.top = v,
            "right" => self.right = v,
            "bottom" => self.bottom = v,
            "left" => self.left = v,
            other => {
                return Err(DiagramError::invalid_spec(
                    format!("Unknown margin side: {other}"),
                    line,
                ))
            }
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str, line: usize) -> Result<f64> {
    value.parse::<f64>().map_err(|_| {
        DiagramError::invalid_spec(format!("Value for '{key}' is not a number: {value}"), line)
    })
}

/// Settings overrides loaded from a TOML profile file. Absent keys keep
/// their in-file or default values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SettingsProfile {
    pub horizontal_spacer: Option<f64>,
    pub vertical_spacer: Option<f64>,
    pub text_width: Option<f64>,
    pub text_height: Option<f64>,
    pub grid_align: Option<String>,
    pub grid_valign: Option<String>,
    pub margin: Option<MarginProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarginProfile {
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
}

impl SettingsProfile {
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| DiagramError::invalid_spec(format!("Invalid settings profile: {e}"), 0))
    }

    pub fn apply(&self, settings: &mut Settings, margin: &mut Margin) {
        if let Some(v) = self.horizontal_spacer {
            settings.horizontal_spacer = v;
        }
        if let Some(v) = self.vertical_spacer {
            settings.vertical_spacer = v;
        }
        if let Some(v) = self.text_width {
            settings.text_width = v;
        }
        if let Some(v) = self.text_height {
            settings.text_height = v;
        }
        if let Some(v) = &self.grid_align {
            settings.grid_align = HAlign::from_words(&[v.as_str()]);
        }
        if let Some(v) = &self.grid_valign {
            settings.grid_valign = VAlign::from_words(&[v.as_str()]);
        }
        if let Some(m) = &self.margin {
            if let Some(v) = m.top {
                margin.top = v;
            }
            if let Some(v) = m.right {
                margin.right = v;
            }
            if let Some(v) = m.bottom {
                margin.bottom = v;
            }
            if let Some(v) = m.left {
                margin.left = v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_defaults() {
        let s = Settings::default();
        assert_eq!(s.horizontal_spacer, 20.0);
        assert_eq!(s.vertical_spacer, 20.0);
        assert_eq!(s.text_width, 5.0);
        assert_eq!(s.text_height, 30.0);
        assert_eq!(s.grid_align, HAlign::Center);
        assert_eq!(s.grid_valign, VAlign::Middle);
    }

    #[test]
    fn test_settings_set() {
        let mut s = Settings::default();
        s.set("horizontal-spacer", "35", 1).unwrap();
        s.set("grid-align", "left", 2).unwrap();
        assert_eq!(s.horizontal_spacer, 35.0);
        assert_eq!(s.grid_align, HAlign::Left);
    }

    #[test]
    fn test_settings_set_rejects_bad_number() {
        let mut s = Settings::default();
        let err = s.set("text-width", "wide", 7).unwrap_err();
        assert_eq!(err.line, 7);
    }

    #[test]
    fn test_margin_set() {
        let mut m = Margin::default();
        m.set("left", "12.5", 3).unwrap();
        assert_eq!(m.left, 12.5);
        assert_eq!(m.top, 30.0);
    }

    #[test]
    fn test_profile_overrides() {
        let profile = SettingsProfile::from_toml(
            "horizontal-spacer = 40\ngrid-valign = \"top\"\n\n[margin]\ntop = 5\n",
        )
        .unwrap();
        let mut s = Settings::default();
        let mut m = Margin::default();
        profile.apply(&mut s, &mut m);
        assert_eq!(s.horizontal_spacer, 40.0);
        assert_eq!(s.grid_valign, VAlign::Top);
        assert_eq!(m.top, 5.0);
        assert_eq!(m.left, 30.0);
    }

    #[test]
    fn test_profile_rejects_unknown_keys() {
        assert!(SettingsProfile::from_toml("spacer = 1\n").is_err());
    }
}

//! Game settings
//!
//! Difficulty, per-level formation settings and playfield size.
//! Persisted as JSON next to the executable.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::SHOOTING_VARIANCE;
use crate::error::ConfigError;

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "medium" | "med" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Flat bonus added to every enemy's point value
    pub fn point_modifier(&self) -> i32 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Normal => 1,
            Difficulty::Hard => 2,
        }
    }
}

/// Formation settings for one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationSettings {
    /// Columns in the formation
    pub formation_width: u32,
    /// Rows in the formation
    pub formation_height: u32,
    /// Ticks between formation steps at full strength (minus the minimum)
    pub base_speed: i32,
    /// Milliseconds between volleys, before variance
    pub shooting_frequency: u64,
}

impl Default for FormationSettings {
    fn default() -> Self {
        Self {
            formation_width: 5,
            formation_height: 4,
            base_speed: 60,
            shooting_frequency: 2500,
        }
    }
}

impl FormationSettings {
    /// Widest formation the progression will produce
    pub const MAX_WIDTH: u32 = 14;
    /// Tallest formation the progression will produce
    pub const MAX_HEIGHT: u32 = 10;
    /// Shortest shooting interval the progression will produce
    pub const MIN_SHOOTING_FREQUENCY: u64 = 100;

    /// Random spread applied to each shooting interval (+/-)
    pub fn shooting_variance(&self) -> u64 {
        (self.shooting_frequency as f32 * SHOOTING_VARIANCE) as u64
    }

    /// Settings for `level`, derived from the previous level's settings
    pub fn for_level(&self, level: u32, difficulty: Difficulty) -> Self {
        let mut next = *self;

        let grows = (difficulty == Difficulty::Easy && level % 3 == 0 && level < 5)
            || (level % 2 == 0 && level >= 5);
        if grows {
            let increment = if level >= 5 && difficulty == Difficulty::Hard { 2 } else { 1 };
            if next.formation_width == next.formation_height {
                next.formation_width = (next.formation_width + increment).min(Self::MAX_WIDTH);
            } else {
                next.formation_height = (next.formation_height + increment).min(Self::MAX_HEIGHT);
            }
        }

        let speed_decrement = match difficulty {
            Difficulty::Easy => 10,
            Difficulty::Normal if level >= 5 => 20,
            Difficulty::Normal => 10,
            Difficulty::Hard => 20,
        };
        next.base_speed = (next.base_speed - speed_decrement).max(0);

        let frequency_decrement = match difficulty {
            Difficulty::Easy => 100,
            Difficulty::Normal if level >= 5 => 300,
            Difficulty::Normal => 200,
            Difficulty::Hard if level >= 5 => 400,
            Difficulty::Hard => 300,
        };
        next.shooting_frequency = next
            .shooting_frequency
            .saturating_sub(frequency_decrement)
            .max(Self::MIN_SHOOTING_FREQUENCY);

        next
    }
}

/// Playfield dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: i32,
    pub height: i32,
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: 448,
            height: 520,
        }
    }
}

/// Complete game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub difficulty: Difficulty,
    /// Level 1 formation; later levels derive from it
    pub formation: FormationSettings,
    pub playfield: Playfield,
    /// Run seed for reproducibility
    #[serde(default)]
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            formation: FormationSettings::default(),
            playfield: Playfield::default(),
            seed: 0,
        }
    }
}

impl Settings {
    /// Formation settings for `level` (1-based), applying the progression per level
    pub fn formation_for_level(&self, level: u32) -> FormationSettings {
        (2..=level).fold(self.formation, |settings, lvl| {
            settings.for_level(lvl, self.difficulty)
        })
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.playfield.width <= 0 || self.playfield.height <= 0 {
            return Err(ConfigError::Invalid {
                field: "playfield",
                reason: format!(
                    "dimensions must be positive, got {}x{}",
                    self.playfield.width, self.playfield.height
                ),
            });
        }
        if self.formation.shooting_frequency == 0 {
            return Err(ConfigError::Invalid {
                field: "formation.shooting_frequency",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.formation.base_speed < 0 {
            return Err(ConfigError::Invalid {
                field: "formation.base_speed",
                reason: format!("must not be negative, got {}", self.formation.base_speed),
            });
        }
        Ok(())
    }

    /// Load settings from a JSON file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load_from(path.as_ref()) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("Using default settings ({err})");
                Self::default()
            }
        }
    }

    /// Save settings to a JSON file
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("med"), Some(Difficulty::Normal));
        assert_eq!(Difficulty::from_str("nightmare"), None);
        assert_eq!(Difficulty::Easy.as_str(), "Easy");
    }

    #[test]
    fn test_shooting_variance_is_a_fifth() {
        let settings = FormationSettings {
            shooting_frequency: 2000,
            ..Default::default()
        };
        assert_eq!(settings.shooting_variance(), 400);
    }

    #[test]
    fn test_progression_grows_square_formation_wide() {
        let base = FormationSettings {
            formation_width: 5,
            formation_height: 5,
            base_speed: 60,
            shooting_frequency: 2000,
        };
        let next = base.for_level(6, Difficulty::Hard);
        assert_eq!(next.formation_width, 7);
        assert_eq!(next.formation_height, 5);
        assert_eq!(next.base_speed, 40);
        assert_eq!(next.shooting_frequency, 1600);
    }

    #[test]
    fn test_progression_grows_tall_when_not_square() {
        let base = FormationSettings {
            formation_width: 6,
            formation_height: 4,
            base_speed: 60,
            shooting_frequency: 2000,
        };
        let next = base.for_level(3, Difficulty::Easy);
        assert_eq!(next.formation_width, 6);
        assert_eq!(next.formation_height, 5);
    }

    #[test]
    fn test_progression_floors() {
        let base = FormationSettings {
            formation_width: 14,
            formation_height: 14,
            base_speed: 5,
            shooting_frequency: 150,
        };
        let next = base.for_level(8, Difficulty::Hard);
        assert_eq!(next.formation_width, 14);
        assert_eq!(next.base_speed, 0);
        assert_eq!(next.shooting_frequency, FormationSettings::MIN_SHOOTING_FREQUENCY);
    }

    #[test]
    fn test_formation_for_level_one_is_base() {
        let settings = Settings::default();
        assert_eq!(settings.formation_for_level(1), settings.formation);
        assert_ne!(settings.formation_for_level(4), settings.formation);
    }

    #[test]
    fn test_validate_rejects_zero_frequency() {
        let mut settings = Settings::default();
        settings.formation.shooting_frequency = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "formation.shooting_frequency", .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("invaders_settings_{}.json", std::process::id()));
        let settings = Settings {
            difficulty: Difficulty::Hard,
            seed: 42,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let settings = Settings::load_or_default("/nonexistent/invaders/settings.json");
        assert_eq!(settings, Settings::default());
        assert!(matches!(
            Settings::load_from("/nonexistent/invaders/settings.json"),
            Err(ConfigError::Io(_))
        ));
    }
}

//! Volume mixer
//!
//! Turns a track's or voice's own volume into the value sent to the voice,
//! applying master and category sliders and the category mute flag.

use jb_core::{Category, clamp01};
use serde::{Deserialize, Serialize};

/// Process-wide volume state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSettings {
    pub master: f32,
    pub music: f32,
    pub sfx: f32,
    pub music_muted: bool,
    pub sfx_muted: bool,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            music: 1.0,
            sfx: 1.0,
            music_muted: false,
            sfx_muted: false,
        }
    }
}

impl VolumeSettings {
    /// Output volume for `volume` played in `category`
    #[inline]
    pub fn effective(&self, category: Category, volume: f32) -> f32 {
        if self.is_muted(category) {
            return 0.0;
        }
        clamp01(self.master * self.category_volume(category) * volume)
    }

    #[inline]
    pub fn category_volume(&self, category: Category) -> f32 {
        match category {
            Category::Music => self.music,
            Category::Sfx => self.sfx,
        }
    }

    #[inline]
    pub fn is_muted(&self, category: Category) -> bool {
        match category {
            Category::Music => self.music_muted,
            Category::Sfx => self.sfx_muted,
        }
    }

    pub fn set_master(&mut self, volume: f32) {
        self.master = clamp01(volume);
    }

    pub fn set_category_volume(&mut self, category: Category, volume: f32) {
        let volume = clamp01(volume);
        match category {
            Category::Music => self.music = volume,
            Category::Sfx => self.sfx = volume,
        }
    }

    /// Flip the mute flag, returning the new state
    pub fn toggle_mute(&mut self, category: Category) -> bool {
        let flag = match category {
            Category::Music => &mut self.music_muted,
            Category::Sfx => &mut self.sfx_muted,
        };
        *flag = !*flag;
        *flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_multiplies_factors() {
        let mut settings = VolumeSettings::default();
        settings.set_master(0.5);
        settings.set_category_volume(Category::Music, 0.5);

        assert!((settings.effective(Category::Music, 0.8) - 0.2).abs() < 1e-6);
        assert!((settings.effective(Category::Sfx, 0.8) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_mute_wins() {
        let mut settings = VolumeSettings::default();
        assert!(settings.toggle_mute(Category::Music));
        assert_eq!(settings.effective(Category::Music, 1.0), 0.0);
        assert_eq!(settings.effective(Category::Sfx, 1.0), 1.0);

        assert!(!settings.toggle_mute(Category::Music));
        assert_eq!(settings.effective(Category::Music, 1.0), 1.0);
    }

    #[test]
    fn test_setters_clamp() {
        let mut settings = VolumeSettings::default();
        settings.set_master(3.0);
        settings.set_category_volume(Category::Sfx, -1.0);
        assert_eq!(settings.master, 1.0);
        assert_eq!(settings.sfx, 0.0);

        settings.set_master(f32::NAN);
        assert_eq!(settings.master, 0.0);
    }

    #[test]
    fn test_effective_clamps_track_volume() {
        let settings = VolumeSettings::default();
        assert_eq!(settings.effective(Category::Music, 4.0), 1.0);
        assert_eq!(settings.effective(Category::Music, -4.0), 0.0);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Auto-comment settings and coverage increase records.

use serde::{Deserialize, Serialize};

/// Default comment template, as seeded by the backend.
pub const DEFAULT_COMMENT_TEMPLATE: &str = "Your coverage of {city} is {coverage}%!";

/// Per-user auto-comment and feature configuration.
///
/// Updated read-modify-write: load, change a copy, send the whole object back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentSettings {
    pub user_id: u64,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub running_enabled: bool,
    #[serde(default)]
    pub cycling_enabled: bool,
    #[serde(default)]
    pub walking_enabled: bool,
    #[serde(default)]
    pub hiking_enabled: bool,
    #[serde(default)]
    pub ebiking_enabled: bool,
    #[serde(default)]
    pub skiing_enabled: bool,
    #[serde(default = "default_template")]
    pub comment_template: String,
    /// Minimum coverage increase (percentage points) worth a comment
    #[serde(default)]
    pub min_coverage_increase: f64,
    /// Feature flag: show the custom areas section
    #[serde(default)]
    pub custom_areas_enabled: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn default_template() -> String {
    DEFAULT_COMMENT_TEMPLATE.to_string()
}

/// Activity-type toggles in [`CommentSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityGroup {
    Running,
    Cycling,
    Walking,
    Hiking,
    EBiking,
    Skiing,
}

impl ActivityGroup {
    /// Map a Strava activity/sport type onto its toggle.
    pub fn from_activity_type(activity_type: &str) -> Option<Self> {
        match activity_type {
            "Run" | "VirtualRun" | "TrailRun" => Some(Self::Running),
            "Ride" | "VirtualRide" | "MountainBikeRide" | "GravelRide" => Some(Self::Cycling),
            "Walk" => Some(Self::Walking),
            "Hike" => Some(Self::Hiking),
            "EBikeRide" | "EMountainBikeRide" => Some(Self::EBiking),
            "AlpineSki" | "BackcountrySki" | "NordicSki" => Some(Self::Skiing),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "Running & Virtual Running",
            Self::Cycling => "Cycling & Virtual Cycling",
            Self::Walking => "Walking",
            Self::Hiking => "Hiking",
            Self::EBiking => "E-Biking",
            Self::Skiing => "Skiing & Ski Touring",
        }
    }
}

impl CommentSettings {
    pub fn group_enabled(&self, group: ActivityGroup) -> bool {
        match group {
            ActivityGroup::Running => self.running_enabled,
            ActivityGroup::Cycling => self.cycling_enabled,
            ActivityGroup::Walking => self.walking_enabled,
            ActivityGroup::Hiking => self.hiking_enabled,
            ActivityGroup::EBiking => self.ebiking_enabled,
            ActivityGroup::Skiing => self.skiing_enabled,
        }
    }

    pub fn set_group_enabled(&mut self, group: ActivityGroup, enabled: bool) {
        let flag = match group {
            ActivityGroup::Running => &mut self.running_enabled,
            ActivityGroup::Cycling => &mut self.cycling_enabled,
            ActivityGroup::Walking => &mut self.walking_enabled,
            ActivityGroup::Hiking => &mut self.hiking_enabled,
            ActivityGroup::EBiking => &mut self.ebiking_enabled,
            ActivityGroup::Skiing => &mut self.skiing_enabled,
        };
        *flag = enabled;
    }

    /// Whether an activity of this type would get an automatic comment.
    pub fn allows_activity_type(&self, activity_type: &str) -> bool {
        self.enabled
            && ActivityGroup::from_activity_type(activity_type)
                .is_some_and(|group| self.group_enabled(group))
    }

    /// Whether a coverage increase clears the configured threshold.
    pub fn qualifies(&self, increase: &CoverageIncrease) -> bool {
        self.allows_activity_type(&increase.activity_type)
            && increase.increase >= self.min_coverage_increase
    }

    /// Fill in the `{city}` and `{coverage}` placeholders.
    pub fn render_comment(&self, city: &str, coverage: f64) -> String {
        self.comment_template
            .replace("{city}", city)
            .replace("{coverage}", &format!("{:.1}", coverage))
    }
}

/// A coverage gain caused by one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageIncrease {
    pub user_id: u64,
    pub activity_id: u64,
    pub city_id: u64,
    pub city_name: String,
    pub previous_coverage: f64,
    pub new_coverage: f64,
    pub increase: f64,
    pub activity_type: String,
    pub activity_date: String,
}

/// `GET /api/comments/settings/{user}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SettingsEnvelope {
    pub settings: CommentSettings,
}

/// `GET /api/comments/coverage-increases/{user}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IncreasesEnvelope {
    #[serde(default)]
    pub increases: Vec<CoverageIncrease>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CommentSettings {
        serde_json::from_value(serde_json::json!({
            "user_id": 42,
            "enabled": true,
            "running_enabled": true,
            "cycling_enabled": false,
            "min_coverage_increase": 0.5
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let s = settings();
        assert_eq!(s.comment_template, DEFAULT_COMMENT_TEMPLATE);
        assert!(!s.custom_areas_enabled);
    }

    #[test]
    fn test_activity_type_toggles() {
        let mut s = settings();
        assert!(s.allows_activity_type("VirtualRun"));
        assert!(!s.allows_activity_type("Ride"));
        assert!(!s.allows_activity_type("Kitesurf"));

        s.set_group_enabled(ActivityGroup::Cycling, true);
        assert!(s.allows_activity_type("Ride"));

        s.enabled = false;
        assert!(!s.allows_activity_type("Run"));
    }

    #[test]
    fn test_threshold_and_render() {
        let s = settings();
        let increase = CoverageIncrease {
            user_id: 42,
            activity_id: 1,
            city_id: 7,
            city_name: "Sheffield".to_string(),
            previous_coverage: 10.0,
            new_coverage: 10.3,
            increase: 0.3,
            activity_type: "Run".to_string(),
            activity_date: "2024-06-01".to_string(),
        };
        assert!(!s.qualifies(&increase));
        assert!(s.qualifies(&CoverageIncrease {
            increase: 0.6,
            ..increase
        }));

        assert_eq!(
            s.render_comment("Sheffield", 12.345),
            "Your coverage of Sheffield is 12.3%!"
        );
    }
}

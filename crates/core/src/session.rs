//! Per-dialogue session state.
//!
//! A [`Session`] lives only in memory, keyed by the transport-assigned
//! session identifier. It records which [`Stage`] of the registration
//! dialogue the caller is at and the data collected so far.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::RegistrationRecord;

/// The steps of the registration dialogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    MainMenu,
    EnterName,
    SelectCounty,
    EnterCustomCounty,
    SelectCrop,
    EnterCustomCrop,
    EnterFarmSize,
    ConfirmRegistration,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::MainMenu => "MAIN_MENU",
            Stage::EnterName => "ENTER_NAME",
            Stage::SelectCounty => "SELECT_COUNTY",
            Stage::EnterCustomCounty => "ENTER_CUSTOM_COUNTY",
            Stage::SelectCrop => "SELECT_CROP",
            Stage::EnterCustomCrop => "ENTER_CUSTOM_CROP",
            Stage::EnterFarmSize => "ENTER_FARM_SIZE",
            Stage::ConfirmRegistration => "CONFIRM_REGISTRATION",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registration being assembled one stage at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,

    /// Farm size in acres
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_size: Option<f64>,
}

impl PendingRegistration {
    /// Whether every field required for a registration is present.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.county.is_some() && self.crop.is_some() && self.farm_size.is_some()
    }

    /// Build the final record, or `None` if any field is still missing.
    pub fn to_record(
        &self,
        end_user_id: &str,
        registered_at: DateTime<FixedOffset>,
    ) -> Option<RegistrationRecord> {
        Some(RegistrationRecord {
            name: self.name.clone()?,
            county: self.county.clone()?,
            crop: self.crop.clone()?,
            farm_size: self.farm_size?,
            end_user_id: end_user_id.to_string(),
            registered_at,
        })
    }
}

/// Ephemeral state of one USSD dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier assigned by the transport
    pub session_id: String,

    /// The caller (phone number); fixed once the session exists
    pub end_user_id: String,

    pub stage: Stage,

    /// Data collected by the stages passed so far
    #[serde(default)]
    pub pending: PendingRegistration,

    pub created_at: DateTime<Utc>,

    /// Bumped on every request touching this session
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session at the main menu.
    pub fn new(session_id: impl Into<String>, end_user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            end_user_id: end_user_id.into(),
            stage: Stage::MainMenu,
            pending: PendingRegistration::default(),
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Back to the main menu with nothing collected.
    pub fn restart(&mut self) {
        self.stage = Stage::MainMenu;
        self.pending = PendingRegistration::default();
    }

    /// Time since the last request, in milliseconds.
    pub fn idle_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_activity_at).num_milliseconds()
    }

    /// Time since creation, in milliseconds.
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn complete_pending() -> PendingRegistration {
        PendingRegistration {
            name: Some("Jane Wanjiru".into()),
            county: Some("Nairobi".into()),
            crop: Some("Maize".into()),
            farm_size: Some(3.5),
        }
    }

    #[test]
    fn new_session_starts_at_main_menu() {
        let now = Utc::now();
        let session = Session::new("ATUid_1", "+254700000001", now);
        assert_eq!(session.stage, Stage::MainMenu);
        assert_eq!(session.pending, PendingRegistration::default());
        assert_eq!(session.created_at, session.last_activity_at);
    }

    #[test]
    fn stage_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Stage::ConfirmRegistration).unwrap();
        assert_eq!(json, "\"CONFIRM_REGISTRATION\"");
        assert_eq!(Stage::EnterCustomCounty.to_string(), "ENTER_CUSTOM_COUNTY");
    }

    #[test]
    fn pending_is_complete_only_with_all_fields() {
        let mut pending = complete_pending();
        assert!(pending.is_complete());
        pending.crop = None;
        assert!(!pending.is_complete());
    }

    #[test]
    fn to_record_requires_every_field() {
        let registered_at = Utc::now().fixed_offset();
        assert!(complete_pending().to_record("+254700000001", registered_at).is_some());

        let partial = PendingRegistration {
            farm_size: None,
            ..complete_pending()
        };
        assert!(partial.to_record("+254700000001", registered_at).is_none());
    }

    #[test]
    fn restart_clears_collected_data() {
        let mut session = Session::new("s", "u", Utc::now());
        session.stage = Stage::EnterFarmSize;
        session.pending = complete_pending();
        session.restart();
        assert_eq!(session.stage, Stage::MainMenu);
        assert!(session.pending.name.is_none());
    }

    #[test]
    fn idle_and_age_are_measured_from_timestamps() {
        let now = Utc::now();
        let mut session = Session::new("s", "u", now - Duration::seconds(10));
        session.touch(now - Duration::seconds(4));
        assert_eq!(session.age_ms(now), 10_000);
        assert_eq!(session.idle_ms(now), 4_000);
    }

    #[test]
    fn pending_skips_missing_fields_in_json() {
        let pending = PendingRegistration {
            name: Some("Jane".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Jane"}));
    }
}

//! Stage engine: the registration dialogue state machine.
//!
//! Each request is matched against an explicit rule keyed on the session's
//! current [`Stage`] and the input level:
//!
//! | stage                  | level     |
//! |------------------------|-----------|
//! | `MAIN_MENU`            | exactly 1 |
//! | `ENTER_NAME`           | exactly 2 |
//! | `SELECT_COUNTY`        | exactly 3 |
//! | `ENTER_CUSTOM_COUNTY`  | exactly 4 |
//! | `SELECT_CROP` onward   | any ≥ 1   |
//!
//! The stages from `SELECT_CROP` on carry no exact level because the farm
//! size prompt may repeat any number of times. Anything that matches no rule
//! goes through [`StageEngine::recover`].
//!
//! Every path ends in exactly one [`Outcome`]: a directive plus whether the
//! session is kept or deleted. Only the farm size stage re-prompts; every
//! other invalid input ends the dialogue.

use chrono::{FixedOffset, Utc};
use shamba_core::{DecodedInput, Directive, Registry, Session, Stage};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::menus;

/// What happens to the session after this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Save,
    Delete,
}

/// The engine's result for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub directive: Directive,
    pub disposition: Disposition,
}

impl Outcome {
    fn proceed(message: String) -> Self {
        Self {
            directive: Directive::proceed(message),
            disposition: Disposition::Save,
        }
    }

    fn end(message: String) -> Self {
        Self {
            directive: Directive::terminate(message),
            disposition: Disposition::Delete,
        }
    }
}

/// The registration state machine.
pub struct StageEngine {
    registry: Arc<dyn Registry>,
    timezone: FixedOffset,
}

impl StageEngine {
    /// `timezone` is the reference zone stamped on new registrations.
    pub fn new(registry: Arc<dyn Registry>, timezone: FixedOffset) -> Self {
        Self { registry, timezone }
    }

    /// Advance `session` by one request.
    ///
    /// `raw_text` is the undecoded cumulative text; an empty one always
    /// means the dialogue is (re)starting.
    pub async fn advance(&self, session: &mut Session, input: &DecodedInput, raw_text: &str) -> Outcome {
        let outcome = self.transition(session, input, raw_text).await;
        reject_empty_message(outcome, session, input.level)
    }

    async fn transition(&self, session: &mut Session, input: &DecodedInput, raw_text: &str) -> Outcome {
        if raw_text.is_empty() {
            session.restart();
            return Outcome::proceed(menus::main_menu());
        }

        match (session.stage, input.level) {
            (Stage::MainMenu, 1) => self.main_menu(session, input).await,
            (Stage::EnterName, 2) => Self::enter_name(session, input),
            (Stage::SelectCounty, 3) => Self::select_county(session, input),
            (Stage::EnterCustomCounty, 4) => Self::enter_custom_county(session, input),
            (Stage::SelectCrop, 1..) => Self::select_crop(session, input),
            (Stage::EnterCustomCrop, 1..) => Self::enter_custom_crop(session, input),
            (Stage::EnterFarmSize, 1..) => Self::enter_farm_size(session, input),
            (Stage::ConfirmRegistration, 1..) => self.confirm(session, input).await,
            _ => self.recover(session, input).await,
        }
    }

    async fn main_menu(&self, session: &mut Session, input: &DecodedInput) -> Outcome {
        match input.latest.as_str() {
            menus::REGISTER => {
                session.stage = Stage::EnterName;
                Outcome::proceed(menus::name_prompt())
            }
            menus::CHECK_STATUS => self.check_status(session).await,
            menus::EXIT => Outcome::end(menus::goodbye()),
            _ => Outcome::end(menus::invalid_option()),
        }
    }

    async fn check_status(&self, session: &Session) -> Outcome {
        match self.registry.get(&session.end_user_id).await {
            Ok(Some(record)) => Outcome::end(menus::status_details(&record)),
            Ok(None) => Outcome::end(menus::not_registered()),
            Err(e) => {
                error!(end_user_id = %session.end_user_id, error = %e, "Registry lookup failed");
                Outcome::end(menus::system_error())
            }
        }
    }

    fn enter_name(session: &mut Session, input: &DecodedInput) -> Outcome {
        session.pending.name = Some(input.latest.clone());
        session.stage = Stage::SelectCounty;
        Outcome::proceed(menus::county_menu())
    }

    fn select_county(session: &mut Session, input: &DecodedInput) -> Outcome {
        if input.latest == menus::OTHER_COUNTY {
            session.stage = Stage::EnterCustomCounty;
            return Outcome::proceed(menus::custom_county_prompt());
        }

        match menus::county_for(&input.latest) {
            Some(county) => {
                session.pending.county = Some(county.to_string());
                session.stage = Stage::SelectCrop;
                Outcome::proceed(menus::crop_menu())
            }
            None => Outcome::end(menus::invalid_county()),
        }
    }

    fn enter_custom_county(session: &mut Session, input: &DecodedInput) -> Outcome {
        session.pending.county = Some(input.latest.clone());
        session.stage = Stage::SelectCrop;
        Outcome::proceed(menus::crop_menu())
    }

    fn select_crop(session: &mut Session, input: &DecodedInput) -> Outcome {
        if input.latest == menus::OTHER_CROP {
            session.stage = Stage::EnterCustomCrop;
            return Outcome::proceed(menus::custom_crop_prompt());
        }

        match menus::crop_for(&input.latest) {
            Some(crop) => {
                session.pending.crop = Some(crop.to_string());
                session.stage = Stage::EnterFarmSize;
                Outcome::proceed(menus::farm_size_prompt())
            }
            None => Outcome::end(menus::invalid_crop()),
        }
    }

    fn enter_custom_crop(session: &mut Session, input: &DecodedInput) -> Outcome {
        session.pending.crop = Some(input.latest.clone());
        session.stage = Stage::EnterFarmSize;
        Outcome::proceed(menus::farm_size_prompt())
    }

    fn enter_farm_size(session: &mut Session, input: &DecodedInput) -> Outcome {
        let Some(farm_size) = parse_farm_size(&input.latest) else {
            debug!(session_id = %session.session_id, input = %input.latest, "Rejected farm size");
            return Outcome::proceed(menus::farm_size_retry());
        };

        session.pending.farm_size = Some(farm_size);

        let pending = &session.pending;
        match (&pending.name, &pending.county, &pending.crop) {
            (Some(name), Some(county), Some(crop)) => {
                let message = menus::confirmation(name, county, crop, farm_size);
                session.stage = Stage::ConfirmRegistration;
                Outcome::proceed(message)
            }
            _ => {
                error!(
                    session_id = %session.session_id,
                    pending = ?session.pending,
                    "Reached farm size with incomplete registration data"
                );
                Outcome::end(menus::system_error())
            }
        }
    }

    async fn confirm(&self, session: &mut Session, input: &DecodedInput) -> Outcome {
        match input.latest.as_str() {
            menus::CONFIRM => self.register(session).await,
            menus::CANCEL => {
                info!(session_id = %session.session_id, "Registration cancelled by caller");
                Outcome::end(menus::registration_cancelled())
            }
            _ => Outcome::end(menus::invalid_confirmation()),
        }
    }

    async fn register(&self, session: &Session) -> Outcome {
        let registered_at = Utc::now().with_timezone(&self.timezone);
        let Some(record) = session.pending.to_record(&session.end_user_id, registered_at) else {
            error!(
                session_id = %session.session_id,
                pending = ?session.pending,
                "Confirmation reached with incomplete registration data"
            );
            return Outcome::end(menus::system_error());
        };

        let name = record.name.clone();
        match self.registry.put(record).await {
            Ok(()) => {
                info!(
                    end_user_id = %session.end_user_id,
                    registry = self.registry.name(),
                    "Farmer registered"
                );
                Outcome::end(menus::registration_success(&name))
            }
            Err(e) => {
                error!(end_user_id = %session.end_user_id, error = %e, "Registry write failed");
                Outcome::end(menus::system_error())
            }
        }
    }

    /// Handle a stage/level combination no rule covers.
    ///
    /// A first-level main menu choice restarts the dialogue and is applied
    /// as such; an empty level shows the menu again; anything else ends
    /// the dialogue.
    async fn recover(&self, session: &mut Session, input: &DecodedInput) -> Outcome {
        warn!(
            session_id = %session.session_id,
            stage = %session.stage,
            level = input.level,
            "No rule for stage and input level, recovering"
        );

        if input.level == 1 && input.is_one_of(&[menus::REGISTER, menus::CHECK_STATUS, menus::EXIT]) {
            session.restart();
            return self.main_menu(session, input).await;
        }

        if input.level == 0 {
            session.restart();
            return Outcome::proceed(menus::main_menu());
        }

        Outcome::end(menus::system_error())
    }
}

/// Replace an outcome whose message is blank with a terminal system error.
fn reject_empty_message(outcome: Outcome, session: &Session, level: usize) -> Outcome {
    if !outcome.directive.message.trim().is_empty() {
        return outcome;
    }

    error!(
        session_id = %session.session_id,
        stage = %session.stage,
        level,
        "Stage engine produced an empty message"
    );
    Outcome::end(menus::system_error())
}

/// Parse a farm size in plain decimal notation (`3`, `2.5`, `.75`).
///
/// Signs, exponents, decimal commas and non-positive values are rejected.
pub fn parse_farm_size(raw: &str) -> Option<f64> {
    let raw = raw.trim();

    let mut digits = 0;
    let mut dots = 0;
    for c in raw.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }

    let value: f64 = raw.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

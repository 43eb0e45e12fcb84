//! Registration reducer.
//!
//! Commands express what the user (or the host) asked for, events record the
//! transition that happened. A rejected command leaves [`RegistrationState`]
//! untouched and records the reason in `last_error`.

use super::state::{RegistrationModel, RegistrationState, TicketBitmap, TicketImage};
use crate::error::{RegistrationError, TicketError};
use crate::ticket::TicketRenderer;
use crate::types::{Event, TicketId};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use universe_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer, smallvec};

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the registration controller
#[derive(Clone, Debug)]
pub enum RegistrationAction {
    // Commands
    /// Open an event screen; always resets to `NotRegistered`
    SelectEvent {
        /// Event being viewed
        event: Event,
    },

    /// Ask to attend the selected event
    Register,

    /// Host approval carrying the issued ticket
    Approve {
        /// Raw ticket id, validated before use
        ticket_id: String,
    },

    /// Debug shortcut: issue a ticket for the selected event and approve it
    SimulateApproval,

    /// Withdraw the registration or give up the ticket
    Revoke,

    /// Render the ticket image again after a failure
    RetryTicketRender,

    // Events
    /// The viewed event changed
    EventSelected {
        /// Event being viewed
        event: Event,
    },

    /// A registration request was recorded
    RegistrationRequested {
        /// When the request was made
        requested_at: DateTime<Utc>,
    },

    /// The registration was approved
    RegistrationApproved {
        /// Issued ticket
        ticket: TicketId,
        /// When approval arrived
        approved_at: DateTime<Utc>,
    },

    /// The registration was withdrawn
    RegistrationRevoked,

    /// A ticket render finished
    TicketRendered {
        /// Ticket that was rendered
        ticket: TicketId,
        /// Rendered image or the reason it is unavailable
        result: Result<TicketBitmap, TicketError>,
    },

    /// A command was not applied
    TransitionRejected {
        /// Why
        error: RegistrationError,
    },
}

impl RegistrationAction {
    /// Whether this action expresses intent
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::SelectEvent { .. }
                | Self::Register
                | Self::Approve { .. }
                | Self::SimulateApproval
                | Self::Revoke
                | Self::RetryTicketRender
        )
    }

    /// Whether this action records something that happened
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }
}

// ============================================================================
// Environment
// ============================================================================

/// How strictly transitions are guarded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strictness {
    /// `register` only from `NotRegistered`, `approve` only from `Registered`
    #[default]
    Strict,
    /// Any state may register or be approved
    Lenient,
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(other.to_string()),
        }
    }
}

/// Source of the numeric suffix in issued ticket ids
pub trait SuffixSource: Send + Sync {
    /// Next suffix
    fn next_suffix(&self) -> u32;
}

/// Random four-digit suffixes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self) -> u32 {
        rand::thread_rng().gen_range(1000..=9999)
    }
}

/// Always the same suffix
#[derive(Debug, Clone, Copy)]
pub struct FixedSuffix(pub u32);

impl SuffixSource for FixedSuffix {
    fn next_suffix(&self) -> u32 {
        self.0
    }
}

/// Environment dependencies for the registration reducer
#[derive(Clone)]
pub struct RegistrationEnvironment {
    /// Clock for request and approval timestamps
    pub clock: Arc<dyn Clock>,
    /// Ticket renderer; without one the ticket image stays `Absent`
    pub renderer: Option<Arc<dyn TicketRenderer>>,
    /// Suffixes for tickets issued by `SimulateApproval`
    pub suffixes: Arc<dyn SuffixSource>,
    /// Prefix for issued tickets
    pub ticket_prefix: String,
    /// Transition guarding
    pub strictness: Strictness,
    /// Whether `SimulateApproval` is honoured
    pub allow_simulated_approval: bool,
}

impl RegistrationEnvironment {
    /// Strict environment with random suffixes, the `UV` prefix, no renderer
    /// and simulated approval disabled
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            renderer: None,
            suffixes: Arc::new(RandomSuffix),
            ticket_prefix: "UV".to_string(),
            strictness: Strictness::Strict,
            allow_simulated_approval: false,
        }
    }

    /// Render tickets with `renderer`
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TicketRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Draw ticket suffixes from `suffixes`
    #[must_use]
    pub fn with_suffixes(mut self, suffixes: Arc<dyn SuffixSource>) -> Self {
        self.suffixes = suffixes;
        self
    }

    /// Prefix issued tickets with `prefix`
    #[must_use]
    pub fn with_ticket_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ticket_prefix = prefix.into();
        self
    }

    /// Guard transitions with `strictness`
    #[must_use]
    pub const fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Enable or disable the debug approval shortcut
    #[must_use]
    pub const fn with_simulated_approval(mut self, allow: bool) -> Self {
        self.allow_simulated_approval = allow;
        self
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the registration controller
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistrationReducer;

type Effects = SmallVec<[Effect<RegistrationAction>; 4]>;

impl RegistrationReducer {
    /// Creates a new `RegistrationReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_register(
        state: &RegistrationModel,
        env: &RegistrationEnvironment,
    ) -> Result<(), RegistrationError> {
        if env.strictness == Strictness::Strict && state.state != RegistrationState::NotRegistered
        {
            return Err(RegistrationError::InvalidTransition {
                from: state.state.stage(),
                action: "register".to_string(),
            });
        }
        Ok(())
    }

    fn validate_approve(
        state: &RegistrationModel,
        env: &RegistrationEnvironment,
    ) -> Result<(), RegistrationError> {
        if env.strictness == Strictness::Strict && !state.state.is_registered() {
            return Err(RegistrationError::InvalidTransition {
                from: state.state.stage(),
                action: "approve".to_string(),
            });
        }
        Ok(())
    }

    fn issue_simulated_ticket(
        state: &RegistrationModel,
        env: &RegistrationEnvironment,
    ) -> Result<TicketId, RegistrationError> {
        if !env.allow_simulated_approval {
            return Err(RegistrationError::SimulatedApprovalDisabled);
        }
        let event = state
            .event
            .as_ref()
            .ok_or(RegistrationError::NoEventSelected)?;
        Self::validate_approve(state, env)?;
        Ok(TicketId::issue(
            &env.ticket_prefix,
            &event.id,
            env.suffixes.next_suffix(),
        ))
    }

    /// Applies an event to state
    fn apply_event(state: &mut RegistrationModel, action: &RegistrationAction) {
        match action {
            RegistrationAction::EventSelected { event } => {
                *state = RegistrationModel::for_event(event.clone());
            },
            RegistrationAction::RegistrationRequested { requested_at } => {
                state.state = RegistrationState::Registered;
                state.ticket_image = TicketImage::Absent;
                state.registered_at = Some(*requested_at);
                state.approved_at = None;
                state.last_error = None;
            },
            RegistrationAction::RegistrationApproved {
                ticket,
                approved_at,
            } => {
                state.state = RegistrationState::Going {
                    ticket: ticket.clone(),
                };
                state.ticket_image = TicketImage::Absent;
                state.approved_at = Some(*approved_at);
                state.last_error = None;
            },
            RegistrationAction::RegistrationRevoked => {
                state.state = RegistrationState::NotRegistered;
                state.ticket_image = TicketImage::Absent;
                state.registered_at = None;
                state.approved_at = None;
                state.last_error = None;
            },
            RegistrationAction::TicketRendered { ticket, result } => {
                if state.state.ticket() != Some(ticket) {
                    tracing::debug!(ticket = %ticket, "Ignoring render for a ticket no longer held");
                    return;
                }
                state.ticket_image = match result {
                    Ok(bitmap) => TicketImage::Ready(bitmap.clone()),
                    Err(error) => TicketImage::Unavailable {
                        reason: error.to_string(),
                    },
                };
            },
            RegistrationAction::TransitionRejected { error } => {
                state.last_error = Some(error.clone());
            },
            // Commands are not applied to state
            RegistrationAction::SelectEvent { .. }
            | RegistrationAction::Register
            | RegistrationAction::Approve { .. }
            | RegistrationAction::SimulateApproval
            | RegistrationAction::Revoke
            | RegistrationAction::RetryTicketRender => {},
        }
    }

    fn reject(state: &mut RegistrationModel, error: RegistrationError) -> Effects {
        tracing::warn!(%error, from = %state.state.stage(), "Registration command rejected");
        Self::apply_event(state, &RegistrationAction::TransitionRejected { error });
        SmallVec::new()
    }

    fn approve(
        state: &mut RegistrationModel,
        ticket: TicketId,
        env: &RegistrationEnvironment,
    ) -> Effects {
        tracing::info!(
            event_id = ?state.event.as_ref().map(|e| e.id.to_string()),
            ticket = %ticket,
            "Registration approved"
        );
        let event = RegistrationAction::RegistrationApproved {
            ticket,
            approved_at: env.clock.now(),
        };
        Self::apply_event(state, &event);
        Self::render_ticket(state, env)
    }

    /// Starts rendering the held ticket, if there is one and a renderer
    fn render_ticket(state: &mut RegistrationModel, env: &RegistrationEnvironment) -> Effects {
        let (Some(renderer), Some(ticket)) = (env.renderer.clone(), state.state.ticket().cloned())
        else {
            return SmallVec::new();
        };

        state.ticket_image = TicketImage::Pending;
        smallvec![Effect::future(async move {
            let result = renderer.render(&ticket).map(TicketBitmap::from);
            Some(RegistrationAction::TicketRendered { ticket, result })
        })]
    }
}

impl Reducer for RegistrationReducer {
    type State = RegistrationModel;
    type Action = RegistrationAction;
    type Environment = RegistrationEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            // ========== Commands ==========
            RegistrationAction::SelectEvent { event } => {
                tracing::debug!(event_id = %event.id, "Event selected");
                Self::apply_event(state, &RegistrationAction::EventSelected { event });
                SmallVec::new()
            },

            RegistrationAction::Register => {
                if let Err(error) = Self::validate_register(state, env) {
                    return Self::reject(state, error);
                }
                tracing::info!(
                    event_id = ?state.event.as_ref().map(|e| e.id.to_string()),
                    "Registration requested"
                );
                let event = RegistrationAction::RegistrationRequested {
                    requested_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                SmallVec::new()
            },

            RegistrationAction::Approve { ticket_id } => {
                let ticket = match TicketId::parse(&ticket_id)
                    .and_then(|ticket| Self::validate_approve(state, env).map(|()| ticket))
                {
                    Ok(ticket) => ticket,
                    Err(error) => return Self::reject(state, error),
                };
                Self::approve(state, ticket, env)
            },

            RegistrationAction::SimulateApproval => {
                match Self::issue_simulated_ticket(state, env) {
                    Ok(ticket) => Self::approve(state, ticket, env),
                    Err(error) => Self::reject(state, error),
                }
            },

            RegistrationAction::Revoke => {
                tracing::info!(from = %state.state.stage(), "Registration revoked");
                Self::apply_event(state, &RegistrationAction::RegistrationRevoked);
                SmallVec::new()
            },

            RegistrationAction::RetryTicketRender => {
                if !state.state.is_going() {
                    return Self::reject(
                        state,
                        RegistrationError::InvalidTransition {
                            from: state.state.stage(),
                            action: "retry ticket render".to_string(),
                        },
                    );
                }
                Self::render_ticket(state, env)
            },

            // ========== Events ==========
            RegistrationAction::RegistrationApproved { .. } => {
                Self::apply_event(state, &action);
                Self::render_ticket(state, env)
            },

            RegistrationAction::TicketRendered { ref result, .. } => {
                if let Err(error) = result {
                    tracing::warn!(%error, "Ticket image unavailable");
                }
                Self::apply_event(state, &action);
                SmallVec::new()
            },

            RegistrationAction::EventSelected { .. }
            | RegistrationAction::RegistrationRequested { .. }
            | RegistrationAction::RegistrationRevoked
            | RegistrationAction::TransitionRejected { .. } => {
                Self::apply_event(state, &action);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::registration::RegistrationStage;
    use image::RgbaImage;
    use crate::types::EventId;
    use universe_testing::{ReducerTest, assertions, test_clock};

    struct FailingRenderer;

    impl TicketRenderer for FailingRenderer {
        fn render(&self, _ticket: &TicketId) -> Result<RgbaImage, TicketError> {
            Err(TicketError::EncodingFailed("no capacity".to_string()))
        }
    }

    fn create_test_env() -> RegistrationEnvironment {
        RegistrationEnvironment::new(Arc::new(test_clock()))
    }

    fn workshop() -> Event {
        Event {
            id: EventId::new("1"),
            title: "Tech Workshop".to_string(),
            date: "Today".to_string(),
            time: "2:00 PM".to_string(),
            location: "Room 301".to_string(),
            attendees: 45,
            category: "Workshop".to_string(),
            is_live: true,
            host_community_id: None,
        }
    }

    fn going(ticket: &str) -> RegistrationModel {
        RegistrationModel {
            event: Some(workshop()),
            state: RegistrationState::Going {
                ticket: TicketId::parse(ticket).unwrap(),
            },
            ..RegistrationModel::default()
        }
    }

    #[test]
    fn register_from_not_registered() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env())
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Register)
            .then_state(|model| {
                assert_eq!(model.state, RegistrationState::Registered);
                assert_eq!(model.registered_at, Some(test_clock().now()));
                assert!(model.last_error.is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn strict_register_twice_is_rejected() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env())
            .given_state(going("UV-1-9942"))
            .when_action(RegistrationAction::Register)
            .then_state(|model| {
                assert_eq!(model.state.stage(), RegistrationStage::Going);
                assert_eq!(
                    model.last_error,
                    Some(RegistrationError::InvalidTransition {
                        from: RegistrationStage::Going,
                        action: "register".to_string(),
                    })
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn lenient_register_from_going() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env().with_strictness(Strictness::Lenient))
            .given_state(going("UV-1-9942"))
            .when_action(RegistrationAction::Register)
            .then_state(|model| {
                assert_eq!(model.state, RegistrationState::Registered);
                assert!(model.approved_at.is_none());
            })
            .run();
    }

    #[test]
    fn approve_from_registered() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env())
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Register)
            .when_action(RegistrationAction::Approve {
                ticket_id: "UV-1-9942".to_string(),
            })
            .then_state(|model| {
                assert_eq!(
                    model.state,
                    RegistrationState::Going {
                        ticket: TicketId::parse("UV-1-9942").unwrap()
                    }
                );
                assert_eq!(model.approved_at, Some(test_clock().now()));
                // No renderer configured
                assert!(matches!(model.ticket_image, TicketImage::Absent));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn strict_approve_without_registering_is_rejected() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env())
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Approve {
                ticket_id: "UV-1-9942".to_string(),
            })
            .then_state(|model| {
                assert_eq!(model.state, RegistrationState::NotRegistered);
                assert!(matches!(
                    model.last_error,
                    Some(RegistrationError::InvalidTransition { .. })
                ));
            })
            .run();
    }

    #[test]
    fn lenient_approve_from_not_registered() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env().with_strictness(Strictness::Lenient))
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Approve {
                ticket_id: "UV-1-9942".to_string(),
            })
            .then_state(|model| assert!(model.state.is_going()))
            .run();
    }

    #[test]
    fn approve_with_empty_ticket_is_rejected_in_any_mode() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env().with_strictness(Strictness::Lenient))
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Register)
            .when_action(RegistrationAction::Approve {
                ticket_id: "  ".to_string(),
            })
            .then_state(|model| {
                assert_eq!(model.state, RegistrationState::Registered);
                assert_eq!(model.last_error, Some(RegistrationError::EmptyTicketId));
            })
            .run();
    }

    #[test]
    fn approve_starts_render_when_renderer_present() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env().with_renderer(Arc::new(FailingRenderer)))
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Register)
            .when_action(RegistrationAction::Approve {
                ticket_id: "UV-1-9942".to_string(),
            })
            .then_state(|model| assert!(matches!(model.ticket_image, TicketImage::Pending)))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn failed_render_marks_ticket_unavailable() {
        let ticket = TicketId::parse("UV-1-9942").unwrap();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env())
            .given_state(going("UV-1-9942"))
            .when_action(RegistrationAction::TicketRendered {
                ticket,
                result: Err(TicketError::EncodingFailed("too long".to_string())),
            })
            .then_state(|model| {
                assert!(model.ticket_image.is_unavailable());
                assert!(model.state.is_going());
            })
            .run();
    }

    #[test]
    fn stale_render_is_ignored() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env())
            .given_state(going("UV-1-9942"))
            .when_action(RegistrationAction::TicketRendered {
                ticket: TicketId::parse("UV-1-0000").unwrap(),
                result: Ok(RgbaImage::new(4, 4).into()),
            })
            .then_state(|model| assert!(matches!(model.ticket_image, TicketImage::Absent)))
            .run();
    }

    #[test]
    fn rendered_action_debug_omits_pixels() {
        let action = RegistrationAction::TicketRendered {
            ticket: TicketId::parse("UV-1-9942").unwrap(),
            result: Ok(RgbaImage::new(512, 512).into()),
        };

        let logged = format!("{action:?}");

        assert!(logged.contains("TicketBitmap(512x512)"));
        assert!(logged.len() < 200);
    }

    #[test]
    fn retry_requires_a_ticket() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env().with_renderer(Arc::new(FailingRenderer)))
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::RetryTicketRender)
            .then_state(|model| {
                assert!(matches!(
                    model.last_error,
                    Some(RegistrationError::InvalidTransition { .. })
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn revoke_from_any_state() {
        for start in [
            RegistrationModel::for_event(workshop()),
            RegistrationModel {
                state: RegistrationState::Registered,
                ..RegistrationModel::for_event(workshop())
            },
            going("X"),
        ] {
            ReducerTest::new(RegistrationReducer::new())
                .with_env(create_test_env())
                .given_state(start)
                .when_action(RegistrationAction::Revoke)
                .then_state(|model| {
                    assert_eq!(model.state, RegistrationState::NotRegistered);
                    assert!(matches!(model.ticket_image, TicketImage::Absent));
                })
                .run();
        }
    }

    #[test]
    fn simulate_approval_issues_prefixed_ticket() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(
                create_test_env()
                    .with_simulated_approval(true)
                    .with_suffixes(Arc::new(FixedSuffix(9942))),
            )
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Register)
            .when_action(RegistrationAction::SimulateApproval)
            .then_state(|model| {
                assert_eq!(model.state.ticket().map(TicketId::as_str), Some("UV-1-9942"));
            })
            .run();
    }

    #[test]
    fn simulate_approval_disabled_by_default() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env())
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Register)
            .when_action(RegistrationAction::SimulateApproval)
            .then_state(|model| {
                assert_eq!(model.state, RegistrationState::Registered);
                assert_eq!(
                    model.last_error,
                    Some(RegistrationError::SimulatedApprovalDisabled)
                );
            })
            .run();
    }

    #[test]
    fn simulate_approval_needs_an_event() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env().with_simulated_approval(true))
            .given_state(RegistrationModel::default())
            .when_action(RegistrationAction::Register)
            .when_action(RegistrationAction::SimulateApproval)
            .then_state(|model| {
                assert_eq!(model.last_error, Some(RegistrationError::NoEventSelected));
            })
            .run();
    }

    #[test]
    fn accepted_command_clears_last_error() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(create_test_env())
            .given_state(RegistrationModel::for_event(workshop()))
            .when_action(RegistrationAction::Approve {
                ticket_id: "UV-1-9942".to_string(),
            })
            .when_action(RegistrationAction::Register)
            .then_state(|model| assert!(model.last_error.is_none()))
            .run();
    }

    #[test]
    fn command_and_event_classification() {
        assert!(RegistrationAction::Register.is_command());
        assert!(RegistrationAction::RegistrationRevoked.is_event());
    }

    #[test]
    fn parses_strictness() {
        assert_eq!("Lenient".parse(), Ok(Strictness::Lenient));
        assert!("loose".parse::<Strictness>().is_err());
    }
}

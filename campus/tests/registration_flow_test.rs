//! End-to-end registration flows through the controller.
//!
//! Run with: `cargo test --test registration_flow_test`

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use campus::error::{RegistrationError, TicketError};
use campus::registration::{
    FixedSuffix, RegistrationAction, RegistrationController, RegistrationEnvironment,
    RegistrationStage, RegistrationState, Strictness, TicketImage,
};
use campus::ticket::{
    BLACK, CodecConfig, MAX_TICKET_SIZE, RenderProfile, TicketCodec, TicketRenderer,
};
use campus::{TicketId, seed};
use image::RgbaImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use universe_core::environment::Clock;
use universe_runtime::StoreError;
use universe_testing::test_clock;

fn renderer() -> Arc<RenderProfile> {
    Arc::new(RenderProfile::new(TicketCodec::default(), 512, BLACK))
}

fn controller() -> RegistrationController {
    RegistrationController::new(
        RegistrationEnvironment::new(Arc::new(test_clock())).with_renderer(renderer()),
    )
}

fn going(ticket: &str) -> RegistrationState {
    RegistrationState::Going {
        ticket: TicketId::parse(ticket).unwrap(),
    }
}

/// Fails until switched on, then draws like the real profile
struct FlakyRenderer {
    working: AtomicBool,
}

impl TicketRenderer for FlakyRenderer {
    fn render(&self, ticket: &TicketId) -> Result<RgbaImage, TicketError> {
        if self.working.load(Ordering::SeqCst) {
            renderer().render(ticket)
        } else {
            Err(TicketError::EncodingFailed("renderer offline".to_string()))
        }
    }
}

#[tokio::test]
async fn register_then_approve_renders_ticket() {
    let controller = controller();
    let workshop = seed::events()[0].clone();

    controller.select_event(workshop).await.unwrap();
    assert_eq!(controller.state().await, RegistrationState::NotRegistered);

    controller.register().await.unwrap();
    assert_eq!(controller.state().await, RegistrationState::Registered);

    controller.approve("UV-1-9942").await.unwrap();
    assert_eq!(controller.state().await, going("UV-1-9942"));

    let model = controller.model().await;
    let image = model.ticket_image.image().unwrap();
    assert_eq!(image.dimensions(), (512, 512));
    assert_eq!(
        TicketCodec::default().decode(image).as_deref(),
        Some("UV-1-9942")
    );
    assert_eq!(model.approved_at, Some(test_clock().now()));
}

#[tokio::test]
async fn revoke_from_going_returns_to_not_registered() {
    let controller = RegistrationController::with_model(
        campus::registration::RegistrationModel {
            state: going("X"),
            ..Default::default()
        },
        RegistrationEnvironment::new(Arc::new(test_clock())),
    );

    controller.revoke().await.unwrap();

    assert_eq!(controller.state().await, RegistrationState::NotRegistered);
    assert!(matches!(controller.ticket_image().await, TicketImage::Absent));
}

#[tokio::test]
async fn selecting_another_event_discards_the_ticket() {
    let controller = controller();
    let events = seed::events();

    controller.select_event(events[0].clone()).await.unwrap();
    controller.register().await.unwrap();
    controller.approve("T1").await.unwrap();
    assert_eq!(controller.state().await, going("T1"));

    controller.select_event(events[1].clone()).await.unwrap();

    let model = controller.model().await;
    assert_eq!(model.state, RegistrationState::NotRegistered);
    assert!(matches!(model.ticket_image, TicketImage::Absent));
    assert_eq!(model.event.unwrap().id, events[1].id);
}

#[tokio::test]
async fn strict_mode_rejects_out_of_order_commands() {
    let controller = controller();
    controller
        .select_event(seed::events()[2].clone())
        .await
        .unwrap();

    controller.approve("UV-3-1111").await.unwrap();
    let model = controller.model().await;
    assert_eq!(model.state, RegistrationState::NotRegistered);
    assert_eq!(
        model.last_error,
        Some(RegistrationError::InvalidTransition {
            from: RegistrationStage::NotRegistered,
            action: "approve".to_string(),
        })
    );

    controller.register().await.unwrap();
    controller.register().await.unwrap();
    let model = controller.model().await;
    assert_eq!(model.state, RegistrationState::Registered);
    assert_eq!(
        model.last_error.map(|e| e.to_string()).as_deref(),
        Some("cannot register while registered")
    );
}

#[tokio::test]
async fn lenient_mode_allows_any_order() {
    let controller = RegistrationController::new(
        RegistrationEnvironment::new(Arc::new(test_clock()))
            .with_strictness(Strictness::Lenient),
    );

    controller.approve("UV-9-0001").await.unwrap();
    assert_eq!(controller.state().await, going("UV-9-0001"));

    controller.register().await.unwrap();
    assert_eq!(controller.state().await, RegistrationState::Registered);
}

#[tokio::test]
async fn simulated_approval_issues_ticket_for_selected_event() {
    let controller = RegistrationController::new(
        RegistrationEnvironment::new(Arc::new(test_clock()))
            .with_renderer(renderer())
            .with_simulated_approval(true)
            .with_suffixes(Arc::new(FixedSuffix(9942))),
    );

    controller
        .select_event(seed::events()[0].clone())
        .await
        .unwrap();
    controller.register().await.unwrap();
    controller.simulate_approval().await.unwrap();

    assert_eq!(controller.state().await, going("UV-1-9942"));
    assert!(controller.ticket_image().await.image().is_some());
}

#[tokio::test]
async fn failed_render_is_unavailable_until_retried() {
    let flaky = Arc::new(FlakyRenderer {
        working: AtomicBool::new(false),
    });
    let controller = RegistrationController::new(
        RegistrationEnvironment::new(Arc::new(test_clock())).with_renderer(flaky.clone()),
    );

    controller.register().await.unwrap();
    controller.approve("UV-1-9942").await.unwrap();

    // Still going; only the image is missing
    assert!(controller.state().await.is_going());
    assert!(controller.ticket_image().await.is_unavailable());

    flaky.working.store(true, Ordering::SeqCst);
    controller.retry_ticket().await.unwrap();

    assert!(controller.ticket_image().await.image().is_some());
}

#[tokio::test]
async fn unrenderable_profile_leaves_ticket_unavailable() {
    let wide_margin = TicketCodec::new(CodecConfig {
        margin: u32::MAX,
        ..CodecConfig::default()
    });
    let profiles = [
        RenderProfile::new(TicketCodec::default(), MAX_TICKET_SIZE + 1, BLACK),
        RenderProfile::new(TicketCodec::default(), u32::MAX, BLACK),
        RenderProfile::new(wide_margin, 512, BLACK),
    ];

    for profile in profiles {
        let controller = RegistrationController::new(
            RegistrationEnvironment::new(Arc::new(test_clock())).with_renderer(Arc::new(profile)),
        );

        controller.register().await.unwrap();
        controller.approve("UV-1-9942").await.unwrap();

        assert_eq!(controller.state().await, going("UV-1-9942"));
        assert!(controller.ticket_image().await.is_unavailable());

        // Retrying with the same profile fails the same way
        controller.retry_ticket().await.unwrap();
        assert!(controller.ticket_image().await.is_unavailable());
    }
}

#[tokio::test]
async fn observers_see_commands_and_feedback() {
    let controller = controller();
    let mut actions = controller.subscribe();

    controller.register().await.unwrap();
    controller.approve("UV-1-9942").await.unwrap();

    let mut seen = Vec::new();
    while let Ok(action) = actions.try_recv() {
        seen.push(action);
    }

    assert!(matches!(seen[0], RegistrationAction::Register));
    assert!(matches!(seen[1], RegistrationAction::Approve { .. }));
    assert!(matches!(
        seen[2],
        RegistrationAction::TicketRendered { result: Ok(_), .. }
    ));
}

#[tokio::test]
async fn commands_after_shutdown_fail() {
    let controller = controller();
    controller.shutdown();

    assert_eq!(
        controller.register().await,
        Err(StoreError::ShutdownInProgress)
    );
}

//! Campus demo.
//!
//! Walks one attendee through registration, renders their ticket to a PNG,
//! then scans it back at a check-in desk.

use campus::{
    Catalog, CatalogState, CheckInDesk, CheckInState, Config, RegistrationController, TicketImage,
    catalog::CatalogEnvironment,
    check_in::CheckInEnvironment,
    seed,
    ticket::{decode_frames, scan},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use universe_core::environment::{Clock, SystemClock, UuidGenerator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus=debug,universe_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::try_from_env()?;
    info!(
        prefix = %config.registration.ticket_prefix,
        strictness = ?config.registration.strictness,
        size = config.ticket.size,
        "Configuration loaded"
    );

    // Catalog
    let catalog = Catalog::new(
        seed::catalog(),
        CatalogEnvironment::new(Arc::new(UuidGenerator)),
    );
    let threshold = config.catalog.trending_threshold;
    let trending = catalog
        .query(|c| serde_json::to_string_pretty(&c.trending_events(threshold)))
        .await?;
    let unread = catalog.query(CatalogState::unread_count).await;
    info!(unread, "Catalog ready");
    println!("Trending events:\n{trending}");

    let Some(event) = catalog.query(|c| c.events.first().cloned()).await else {
        warn!("Catalog is empty");
        return Ok(());
    };

    // Attendee side
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let controller = RegistrationController::new(config.registration_environment(Arc::clone(&clock)));

    controller.select_event(event.clone()).await?;
    controller.register().await?;
    if config.registration.allow_simulated_approval {
        controller.simulate_approval().await?;
    } else {
        controller
            .approve(format!("{}-{}-9942", config.registration.ticket_prefix, event.id))
            .await?;
    }

    let model = controller.model().await;
    let Some(ticket) = model.state.ticket().cloned() else {
        warn!(state = ?model.state, error = ?model.last_error, "Registration was not approved");
        return Ok(());
    };

    let image = match model.ticket_image {
        TicketImage::Ready(image) => image,
        TicketImage::Unavailable { reason } => {
            warn!(%reason, "Ticket could not be rendered");
            return Ok(());
        },
        TicketImage::Absent | TicketImage::Pending => {
            warn!("Ticket image missing");
            return Ok(());
        },
    };
    image.save(&config.ticket.output)?;
    info!(ticket = %ticket, path = %config.ticket.output.display(), "Ticket written");

    // Host side: a camera that sees the ticket in several frames in a row
    let desk = CheckInDesk::new(
        CheckInState::for_event(event, None),
        CheckInEnvironment::new(clock),
    );
    let frames = futures::stream::iter(vec![(*image).clone(); 3]);
    let reads = scan(decode_frames(config.codec(), frames), config.scan.dedup);
    let admitted = desk.run(reads).await?;

    info!(admitted, tickets = ?desk.admitted().await, "Check-in finished");
    Ok(())
}

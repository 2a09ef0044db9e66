//! Zonewarden Engine - Main entry point.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zonewarden_engine::infrastructure::http::{self, IngressState};
use zonewarden_engine::settings::Settings;
use zonewarden_engine::use_cases::countdown::{schedule_from_minutes, WarCountdowns};
use zonewarden_engine::use_cases::roster::{GroupEventWatcher, RosterConfig, RosterLookup};
use zonewarden_engine::use_cases::scanner::{ReconciliationScanner, ScannerConfig};
use zonewarden_engine::use_cases::tag_lookup::{
    spawn_backfill_worker, TagLookup, TagLookupConfig,
};
use zonewarden_engine::use_cases::walker::WalkerConfig;
use zonewarden_engine::use_cases::war_tracker::WarTracker;
use zonewarden_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zonewarden_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Zonewarden Engine");

    let settings = Settings::from_env();
    let app = Arc::new(App::new(settings.clone())?);
    let shutdown = CancellationToken::new();

    let walker = WalkerConfig {
        max_pages: settings.walker_max_pages,
        ..WalkerConfig::default()
    };

    // Tag backfill for the primary identity, fed by the war tracker.
    let primary_lookup = Arc::new(TagLookup::new(
        app.actions.clone(),
        app.primary.clone(),
        app.tags.clone(),
        TagLookupConfig {
            walker: walker.clone(),
            ..TagLookupConfig::default()
        },
    ));
    let (backfill_tx, _backfill_worker) =
        spawn_backfill_worker(primary_lookup, shutdown.clone());

    // War tracking over the primary chat stream.
    let tracker = Arc::new(WarTracker::new(
        app.zones.clone(),
        app.tags.clone(),
        app.wars.clone(),
        app.clock.clone(),
        backfill_tx,
    ));
    let war_events = tracker.subscribe();
    tokio::spawn(tracker.clone().run(app.primary.clone(), shutdown.clone()));

    // War countdown announcements.
    let (announce_tx, mut announce_rx) = mpsc::channel::<String>(16);
    let countdowns = Arc::new(WarCountdowns::new(
        schedule_from_minutes(&settings.war_countdown_minutes),
        announce_tx,
    ));
    tokio::spawn(countdowns.run(war_events, shutdown.clone()));
    tokio::spawn(async move {
        while let Some(message) = announce_rx.recv().await {
            tracing::info!(%message, "war countdown");
        }
    });

    // Roster refresh on group event lines.
    if settings.home_group.is_empty() {
        tracing::warn!("HOME_GROUP not set, roster lookups disabled");
    } else {
        let roster = Arc::new(RosterLookup::new(
            app.actions.clone(),
            app.primary.clone(),
            RosterConfig {
                walker: walker.clone(),
                ..RosterConfig::default()
            },
        ));
        let watcher = GroupEventWatcher::new(roster, settings.home_group.clone());
        tokio::spawn(watcher.run(app.primary.clone(), shutdown.clone()));
    }

    // Reconciliation scanning with the probe identity.
    if settings.scanner_enabled {
        let probe_lookup = Arc::new(TagLookup::new(
            app.probe_actions.clone(),
            app.probe.clone(),
            app.tags.clone(),
            TagLookupConfig {
                walker,
                ..TagLookupConfig::default()
            },
        ));
        let scanner = Arc::new(ReconciliationScanner::new(
            app.probe_actions.clone(),
            app.probe.clone(),
            app.zones.clone(),
            probe_lookup,
            app.clock.clone(),
            ScannerConfig {
                drift_tolerance: settings.drift_tolerance(),
                ..ScannerConfig::default()
            },
        ));
        tokio::spawn(scanner.run(shutdown.clone()));
    } else {
        tracing::info!("reconciliation scanner disabled");
    }

    // Inbound notification routes.
    let router = http::router(IngressState {
        primary: app.primary.clone(),
        probe: app.probe.clone(),
    });
    let bind = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "listening for bridge notifications");

    let shutdown_on_signal = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown_on_signal.cancel();
        })
        .await?;

    shutdown.cancel();
    Ok(())
}

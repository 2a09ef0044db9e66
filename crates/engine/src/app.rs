//! Application composition.

use std::sync::Arc;

use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::correlator::Correlator;
use crate::infrastructure::http::HttpActionClient;
use crate::infrastructure::ports::{ActionPort, ClockPort, StoreError};
use crate::settings::Settings;
use crate::stores::{self, GroupTagResolver, WarBoard, ZoneStore};

/// Main application state: stores, per-identity correlators, and bridge
/// clients, constructed once at startup and passed by handle everywhere.
pub struct App {
    pub settings: Settings,
    pub clock: Arc<dyn ClockPort>,
    pub zones: ZoneStore,
    pub tags: GroupTagResolver,
    pub wars: WarBoard,
    /// Event stream + waiter registry of the primary bot identity.
    pub primary: Arc<Correlator>,
    /// Event stream + waiter registry of the scanner probe identity.
    pub probe: Arc<Correlator>,
    pub actions: Arc<dyn ActionPort>,
    pub probe_actions: Arc<dyn ActionPort>,
}

impl App {
    pub fn new(settings: Settings) -> Result<Self, StoreError> {
        let (zones, tags, wars) = stores::open(
            settings.state_path(),
            settings.positions_path(),
            settings.cycle(),
        )?;
        let actions: Arc<dyn ActionPort> = Arc::new(HttpActionClient::new(settings.bridge_url()));
        let probe_actions: Arc<dyn ActionPort> =
            Arc::new(HttpActionClient::new(settings.scanner_bridge_url()));

        Ok(Self {
            settings,
            clock: Arc::new(SystemClock::new()),
            zones,
            tags,
            wars,
            primary: Arc::new(Correlator::new()),
            probe: Arc::new(Correlator::new()),
            actions,
            probe_actions,
        })
    }
}

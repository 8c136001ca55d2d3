//! # Quest Session
//!
//! The quest-direction state machine and its screen-scoped runtime state.
//!
//! ## Lifecycle
//!
//! ```text
//! loading ──area check──▶ inAreaPending ──┬──▶ browsing
//!    │                    notInAreaPending ├──▶ choosePlace ──confirm──▶ active
//!    │                                     └──start from here──────────▶ active
//!    └──permission denied──▶ browsing
//! ```
//!
//! Three asynchronous sources feed a session: the quest fetch, the location
//! stream and user taps. They may arrive in any order. The area check runs
//! the first time both a location and non-degenerate bounds are known while
//! still `loading`, and never again.
//!
//! A session is single-owner (`&mut self`). Hosts feeding it from callbacks
//! share it as a [`SharedSession`].

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use log::{debug, info, warn};
use serde::Serialize;

use crate::camera::{CameraCommand, CameraController};
use crate::config::{MapConfig, QuestConfig};
use crate::directions::DirectionsRequest;
use crate::error::{OptionExt, QuestError, Result};
use crate::geo_utils::{expand_bounds, haversine_distance};
use crate::location::{watch_location, LocationSource, LocationWatcher};
use crate::model::{Quest, Waypoint};
use crate::pulse::{PulseAnimation, PulseFrame};
use crate::selection::{BottomSheetView, CalloutView, Presentation};
use crate::shapes::{LayerStyles, MapShapes};
use crate::spatial::WaypointIndex;
use crate::{Bounds, GeoPoint};

/// Lifecycle state of the quest direction screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum QuestState {
    /// Waiting for the quest and a first location fix
    Loading,
    /// The user is inside the quest zone; asking how to start
    InAreaPending,
    /// The user is outside the quest zone; asking how to start
    NotInAreaPending,
    /// Free exploration of the quest map
    Browsing,
    /// Picking a starting waypoint
    ChoosePlace,
    /// Walking the quest towards a destination
    Active,
}

impl QuestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestState::Loading => "loading",
            QuestState::InAreaPending => "inAreaPending",
            QuestState::NotInAreaPending => "notInAreaPending",
            QuestState::Browsing => "browsing",
            QuestState::ChoosePlace => "choosePlace",
            QuestState::Active => "active",
        }
    }

    /// One of the two "how do you want to start?" states.
    pub fn is_pending(&self) -> bool {
        matches!(self, QuestState::InAreaPending | QuestState::NotInAreaPending)
    }
}

impl fmt::Display for QuestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition that took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct StateChange {
    pub from: QuestState,
    pub to: QuestState,
}

/// Snapshot of the runtime state for the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct QuestRuntimeState {
    pub state: QuestState,
    pub user_location: Option<GeoPoint>,
    pub selected_place: Option<CalloutView>,
    pub bottom_sheet_place: Option<BottomSheetView>,
    pub destination_index: Option<u32>,
    pub destination_id: Option<String>,
    pub finished: bool,
    pub closed: bool,
}

/// Session shared between the location callback and the UI thread.
pub type SharedSession = Arc<Mutex<QuestSession>>;

/// Runtime of one quest direction screen.
pub struct QuestSession {
    quest_id: String,
    config: QuestConfig,
    state: QuestState,

    // Quest and its derivations
    quest: Option<Quest>,
    quest_revision: u64,
    bounds: Bounds,
    index: Option<WaypointIndex>,

    // Live inputs
    user_location: Option<GeoPoint>,
    location_denied: bool,
    watcher: Option<LocationWatcher>,

    // Presentation
    presentation: Presentation,
    destination: Option<usize>,
    finished: bool,
    pulse: PulseAnimation,
    shapes: MapShapes,
    camera: CameraController,
    pending_camera: Vec<CameraCommand>,

    closed: bool,
}

impl QuestSession {
    /// Create a session for `quest_id` with the default map settings.
    pub fn new(quest_id: &str, config: QuestConfig) -> Self {
        Self::with_map_config(quest_id, config, MapConfig::default())
    }

    pub fn with_map_config(quest_id: &str, config: QuestConfig, map_config: MapConfig) -> Self {
        let pulse = PulseAnimation::new(config.pulse);
        Self {
            quest_id: quest_id.to_string(),
            config,
            state: QuestState::Loading,
            quest: None,
            quest_revision: 0,
            bounds: Bounds::ZERO,
            index: None,
            user_location: None,
            location_denied: false,
            watcher: None,
            presentation: Presentation::None,
            destination: None,
            finished: false,
            pulse,
            shapes: MapShapes::new(),
            camera: CameraController::new(map_config),
            pending_camera: Vec::new(),
            closed: false,
        }
    }

    /// Wrap a session for sharing with location callbacks.
    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn quest_id(&self) -> &str {
        &self.quest_id
    }

    pub fn config(&self) -> &QuestConfig {
        &self.config
    }

    /// Map SDK settings (access token, style) for the rendering layer.
    pub fn map_config(&self) -> &MapConfig {
        self.camera.config()
    }

    pub fn state(&self) -> QuestState {
        self.state
    }

    pub fn quest(&self) -> Option<&Quest> {
        self.quest.as_ref()
    }

    /// Bounds of the loaded quest, `Bounds::ZERO` until it loads.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn user_location(&self) -> Option<GeoPoint> {
        self.user_location
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Place shown in a marker callout.
    pub fn selected_place(&self) -> Option<&CalloutView> {
        self.presentation.callout()
    }

    /// Waypoint shown in the bottom sheet.
    pub fn bottom_sheet_place(&self) -> Option<&BottomSheetView> {
        self.presentation.bottom_sheet()
    }

    pub fn is_bottom_sheet_open(&self) -> bool {
        self.presentation.is_bottom_sheet_open()
    }

    pub fn destination_index(&self) -> Option<usize> {
        self.destination
    }

    pub fn destination(&self) -> Option<&Waypoint> {
        let quest = self.quest.as_ref()?;
        quest.waypoints.get(self.destination?)
    }

    /// Every waypoint has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_location_tracking(&self) -> bool {
        self.watcher.as_ref().is_some_and(LocationWatcher::is_active)
    }

    pub fn snapshot(&self) -> QuestRuntimeState {
        QuestRuntimeState {
            state: self.state,
            user_location: self.user_location,
            selected_place: self.selected_place().cloned(),
            bottom_sheet_place: self.bottom_sheet_place().cloned(),
            destination_index: self.destination.map(|i| i as u32),
            destination_id: self.destination().map(|w| w.id().to_string()),
            finished: self.finished,
            closed: self.closed,
        }
    }

    // ========================================================================
    // Asynchronous inputs
    // ========================================================================

    /// The quest fetch resolved. Ignored once the session is closed.
    pub fn on_quest_loaded(&mut self, quest: Quest) -> Result<Option<StateChange>> {
        if self.closed {
            debug!(
                "[QuestSession] Discarding quest {} that arrived after close",
                quest.id
            );
            return Ok(None);
        }
        quest.validate()?;

        self.bounds = quest.bounds();
        self.index = Some(WaypointIndex::new(&quest.points()));
        if self.destination.map_or(true, |d| d >= quest.waypoints.len()) {
            self.destination = Some(0);
        }
        self.quest_revision += 1;
        info!(
            "[QuestSession] Quest {} loaded: {} waypoints, revision {}",
            quest.id,
            quest.waypoints.len(),
            self.quest_revision
        );
        self.quest = Some(quest);

        if let Some(command) = self.camera.on_bounds_changed(&self.bounds) {
            self.pending_camera.push(command);
        }

        Ok(self.evaluate_area())
    }

    /// A location fix arrived.
    pub fn on_location(&mut self, point: GeoPoint) -> Result<Option<StateChange>> {
        if self.closed {
            return Ok(None);
        }
        if !point.is_finite() {
            debug!("[QuestSession] Ignoring non-finite fix {:?}", point);
            return Ok(None);
        }

        self.user_location = Some(point);
        self.location_denied = false;

        let change = self.evaluate_area();
        if self.state == QuestState::Active {
            self.check_arrival(&point);
        }
        Ok(change)
    }

    /// Foreground location was refused. Browsing and manual selection keep
    /// working; the automatic area check never runs.
    pub fn on_location_permission_denied(&mut self) -> Option<StateChange> {
        if self.closed {
            return None;
        }
        warn!(
            "[QuestSession] Location permission denied for quest {}",
            self.quest_id
        );
        self.location_denied = true;
        self.evaluate_area()
    }

    /// Decide the entry state. Runs at most once: the `Loading` guard makes
    /// every later call a no-op.
    fn evaluate_area(&mut self) -> Option<StateChange> {
        if self.state != QuestState::Loading || self.quest.is_none() || self.bounds.is_degenerate()
        {
            return None;
        }

        match self.user_location {
            Some(location) => {
                let zone = expand_bounds(&self.bounds, self.config.area_margin_degrees);
                if zone.contains(&location) {
                    info!("[QuestSession] User is inside the quest zone");
                    Some(self.transition(QuestState::InAreaPending))
                } else {
                    info!("[QuestSession] User is outside the quest zone");
                    Some(self.transition(QuestState::NotInAreaPending))
                }
            }
            None if self.location_denied && self.config.browse_without_location => {
                info!("[QuestSession] No location available, falling back to browsing");
                Some(self.transition(QuestState::Browsing))
            }
            None => None,
        }
    }

    fn transition(&mut self, to: QuestState) -> StateChange {
        let from = self.state;
        self.state = to;

        if to == QuestState::ChoosePlace {
            self.pulse.start(Instant::now());
        } else if from == QuestState::ChoosePlace {
            self.pulse.stop();
        }

        info!("[QuestSession] {} -> {}", from, to);
        StateChange { from, to }
    }

    fn invalid(&self, action: &str) -> QuestError {
        warn!(
            "[QuestSession] Rejected '{}' in state {}",
            action, self.state
        );
        QuestError::InvalidTransition {
            from: self.state.to_string(),
            action: action.to_string(),
        }
    }

    // ========================================================================
    // User actions
    // ========================================================================

    /// "Let me just browse the quest map".
    pub fn browse(&mut self) -> Result<StateChange> {
        if !self.state.is_pending() {
            return Err(self.invalid("browse"));
        }
        Ok(self.transition(QuestState::Browsing))
    }

    /// "Let me choose where to start". Only offered inside the zone.
    pub fn choose_starting_place(&mut self) -> Result<StateChange> {
        if self.state != QuestState::InAreaPending {
            return Err(self.invalid("choose_starting_place"));
        }
        self.presentation = Presentation::None;
        Ok(self.transition(QuestState::ChoosePlace))
    }

    /// "Let's start from here": begin at the first waypoint.
    pub fn start_from_here(&mut self) -> Result<StateChange> {
        if !self.state.is_pending() {
            return Err(self.invalid("start_from_here"));
        }
        self.destination = Some(0);
        self.finished = false;
        self.presentation = Presentation::None;
        Ok(self.transition(QuestState::Active))
    }

    /// "Get me to the starting point". No state change; the host opens the
    /// returned link in the external maps app.
    pub fn directions_to_start(&self) -> Result<DirectionsRequest> {
        let start = self
            .quest
            .as_ref()
            .and_then(Quest::start)
            .ok_or_else(|| self.invalid("directions_to_start"))?;
        info!(
            "[QuestSession] Directions to starting point {}",
            start.id()
        );
        Ok(DirectionsRequest::walking_to(
            start.geopoint(),
            self.user_location,
        ))
    }

    /// Pick a waypoint while choosing a starting place (map tap or list).
    /// Opens the bottom sheet for it.
    pub fn choose_waypoint(&mut self, waypoint_id: &str) -> Result<()> {
        if self.state != QuestState::ChoosePlace {
            return Err(self.invalid("choose_waypoint"));
        }
        let view = {
            let (index, waypoint) = self.find_waypoint(waypoint_id)?;
            BottomSheetView::for_waypoint(index, waypoint)
        };
        self.presentation = Presentation::BottomSheet(view);
        Ok(())
    }

    /// Confirm "start from here" in the bottom sheet.
    pub fn confirm_start_from_sheet(&mut self) -> Result<StateChange> {
        if self.state != QuestState::ChoosePlace {
            return Err(self.invalid("confirm_start_from_sheet"));
        }
        let index = match &self.presentation {
            Presentation::BottomSheet(view) => view.waypoint_index as usize,
            _ => return Err(self.invalid("confirm_start_from_sheet")),
        };

        self.destination = Some(index);
        self.finished = false;
        self.presentation = Presentation::None;
        let change = self.transition(QuestState::Active);
        info!(
            "[QuestSession] Starting from waypoint {} ({})",
            index,
            self.destination().map(Waypoint::id).unwrap_or_default()
        );
        Ok(change)
    }

    /// A map feature was tapped. While choosing a place this opens the bottom
    /// sheet; otherwise it shows a callout. Never changes the state.
    pub fn on_feature_tap(&mut self, waypoint_id: &str) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let presentation = {
            let (index, waypoint) = self.find_waypoint(waypoint_id)?;
            if self.state == QuestState::ChoosePlace {
                Presentation::BottomSheet(BottomSheetView::for_waypoint(index, waypoint))
            } else {
                Presentation::Callout(CalloutView::for_waypoint(waypoint))
            }
        };
        self.presentation = presentation;
        Ok(())
    }

    /// A press on the map at `point`. Selects the nearest waypoint within the
    /// tap tolerance, or dismisses the current overlay.
    pub fn on_map_press(&mut self, point: GeoPoint) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let hit = self.index.as_ref().and_then(|index| {
            index
                .within_meters(&point, self.config.tap_tolerance_meters)
                .first()
                .copied()
        });
        let hit_id = hit.and_then(|i| {
            self.quest
                .as_ref()
                .and_then(|q| q.waypoints.get(i))
                .map(|w| w.id().to_string())
        });

        match hit_id {
            Some(id) => self.on_feature_tap(&id),
            None => {
                self.dismiss_presentation();
                Ok(())
            }
        }
    }

    /// Close the callout or bottom sheet.
    pub fn dismiss_presentation(&mut self) {
        self.presentation = Presentation::None;
    }

    /// Move to the next waypoint. Returns the new destination index, or
    /// `None` when the last waypoint was the destination.
    pub fn advance_destination(&mut self) -> Result<Option<usize>> {
        if self.state != QuestState::Active || self.finished {
            return Err(self.invalid("advance_destination"));
        }
        let len = self
            .quest
            .as_ref()
            .map(|q| q.waypoints.len())
            .ok_or_internal("active session without a quest")?;
        let current = self.destination.unwrap_or(0);

        if current + 1 < len {
            self.destination = Some(current + 1);
            info!(
                "[QuestSession] Next destination {} ({})",
                current + 1,
                self.destination().map(Waypoint::id).unwrap_or_default()
            );
            Ok(Some(current + 1))
        } else {
            self.finished = true;
            info!("[QuestSession] Quest {} finished", self.quest_id);
            Ok(None)
        }
    }

    fn check_arrival(&mut self, location: &GeoPoint) {
        if self.finished {
            return;
        }
        let Some(destination) = self.destination().map(Waypoint::geopoint) else {
            return;
        };
        let distance = haversine_distance(location, &destination);
        if distance > self.config.arrival_radius_meters {
            return;
        }

        info!(
            "[QuestSession] Arrived at destination {:?} ({:.0}m)",
            self.destination, distance
        );
        if self.config.auto_advance {
            if let Err(e) = self.advance_destination() {
                warn!("[QuestSession] Auto-advance failed: {}", e);
            }
        }
    }

    /// The choose-place list: waypoints closest to the user first, or in
    /// path order while no fix is known.
    pub fn waypoints_by_distance(&self) -> Vec<&Waypoint> {
        let Some(quest) = &self.quest else {
            return Vec::new();
        };
        match (&self.index, self.user_location) {
            (Some(index), Some(location)) => index
                .by_distance(&location)
                .into_iter()
                .filter_map(|i| quest.waypoints.get(i))
                .collect(),
            _ => quest.waypoints.iter().collect(),
        }
    }

    fn find_waypoint(&self, waypoint_id: &str) -> Result<(usize, &Waypoint)> {
        self.quest
            .as_ref()
            .and_then(|q| q.waypoint(waypoint_id))
            .ok_or_unknown_waypoint(waypoint_id)
    }

    /// The user left the screen. Stops location updates; every later input
    /// is ignored.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Some(mut watcher) = self.watcher.take() {
            watcher.unsubscribe();
        }
        self.pulse.stop();
        self.presentation = Presentation::None;
        self.pending_camera.clear();
        self.closed = true;
        info!("[QuestSession] Closed session for quest {}", self.quest_id);
    }

    // ========================================================================
    // Map presentation
    // ========================================================================

    /// Shapes for the current quest and destination, recomputed only when
    /// those changed.
    pub fn shapes(&mut self) -> &MapShapes {
        self.shapes
            .update(self.quest_revision, self.quest.as_ref(), self.destination);
        &self.shapes
    }

    /// Layer styles with the pulse applied while choosing a place.
    pub fn layer_styles(&self, now: Instant) -> LayerStyles {
        LayerStyles::default().with_pulse(self.pulse_frame(now))
    }

    pub fn pulse_frame(&self, now: Instant) -> PulseFrame {
        self.pulse.frame_at(now)
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulse.is_running()
    }

    /// The map camera is mounted.
    pub fn on_camera_ready(&mut self) {
        if let Some(command) = self.camera.on_camera_ready(&self.bounds) {
            self.pending_camera.push(command);
        }
    }

    /// Camera commands produced by lifecycle events, oldest first.
    pub fn take_camera_commands(&mut self) -> Vec<CameraCommand> {
        std::mem::take(&mut self.pending_camera)
    }

    pub fn fit_to_zone(&self) -> Option<CameraCommand> {
        self.camera.fit_to_zone(&self.bounds)
    }

    pub fn fly_to_user(&self) -> Option<CameraCommand> {
        self.camera.fly_to_user(self.user_location)
    }

    pub fn fly_to_destination(&self) -> Option<CameraCommand> {
        self.camera
            .fly_to_destination(self.destination().map(Waypoint::geopoint))
    }
}

impl fmt::Debug for QuestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestSession")
            .field("quest_id", &self.quest_id)
            .field("state", &self.state)
            .field("quest_revision", &self.quest_revision)
            .field("destination", &self.destination)
            .field("closed", &self.closed)
            .finish()
    }
}

// ============================================================================
// Location wiring
// ============================================================================

/// Subscribe `session` to `source`.
///
/// Fixes are forwarded through a weak reference, so a dropped session never
/// receives updates. On permission denial the session is told and falls back
/// to browsing once the quest is loaded; the denial is still returned.
pub fn start_location_updates<S>(session: &SharedSession, source: &S) -> Result<()>
where
    S: LocationSource + ?Sized,
{
    let weak: Weak<Mutex<QuestSession>> = Arc::downgrade(session);

    let result = watch_location(source, move |point| {
        let Some(session) = weak.upgrade() else {
            return;
        };
        let Ok(mut guard) = session.lock() else {
            return;
        };
        if let Err(e) = guard.on_location(point) {
            warn!("[QuestSession] Location update failed: {}", e);
        }
    });

    let mut guard = session.lock().map_err(|_| QuestError::Internal {
        message: "session lock poisoned".to_string(),
    })?;
    match result {
        Ok(watcher) => {
            if guard.closed {
                // Closed while subscribing; drop the watcher right away
                return Ok(());
            }
            guard.watcher = Some(watcher);
            Ok(())
        }
        Err(QuestError::PermissionDenied) => {
            guard.on_location_permission_denied();
            Err(QuestError::PermissionDenied)
        }
        Err(e) => Err(e),
    }
}

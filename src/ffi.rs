//! FFI bindings for mobile platforms (iOS/Android).
//!
//! Sessions live in a process-wide registry and are addressed by an opaque
//! handle, so the UI layer never holds Rust state directly. The platform owns
//! the location API and forwards fixes and the permission outcome here.
//! Map sources, layer styles and camera commands cross the boundary as JSON.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use log::{info, warn};
use once_cell::sync::Lazy;

use crate::session::{QuestRuntimeState, QuestSession, SharedSession, StateChange};
use crate::{
    init_logging, GeoPoint, MapConfig, PermissionStatus, PulseFrame, Quest, QuestConfig, Result,
};

// ============================================================================
// Session Registry
// ============================================================================

static SESSIONS: Lazy<Mutex<HashMap<u64, SharedSession>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Run `f` against the session behind `handle`. `None` if the handle is
/// unknown.
fn with_session<F, R>(handle: u64, f: F) -> Option<R>
where
    F: FnOnce(&mut QuestSession) -> R,
{
    let session = SESSIONS.lock().ok()?.get(&handle).cloned()?;
    let mut guard = session.lock().ok()?;
    Some(f(&mut guard))
}

/// Log a rejected call and turn it into `None`.
fn log_err<T>(action: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("[QuestDirectionRust] {} failed: {}", action, e);
            None
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a session for a quest. Returns its handle.
#[uniffi::export]
pub fn quest_session_create(quest_id: String, config: QuestConfig, map_config: MapConfig) -> u64 {
    init_logging();
    let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    let session = QuestSession::with_map_config(&quest_id, config, map_config).shared();
    if let Ok(mut sessions) = SESSIONS.lock() {
        sessions.insert(handle, session);
    }
    info!(
        "[QuestDirectionRust] Created session {} for quest {}",
        handle, quest_id
    );
    handle
}

/// Fetch the session's quest from the content backend (blocking).
/// Returns false if the fetch failed; the session stays `loading`.
#[cfg(feature = "http")]
#[uniffi::export]
pub fn quest_session_load(handle: u64, content_config: crate::ContentConfig) -> bool {
    init_logging();
    let Some(quest_id) = with_session(handle, |s| s.quest_id().to_string()) else {
        return false;
    };

    // The fetch runs without holding the session lock
    let quest = match crate::http::load_quest_sync(content_config, &quest_id) {
        Ok(quest) => quest,
        Err(e) => {
            warn!(
                "[QuestDirectionRust] Failed to load quest {}: {}",
                quest_id, e
            );
            return false;
        }
    };
    with_session(handle, |s| log_err("load", s.on_quest_loaded(quest)).is_some())
        .unwrap_or(false)
}

/// Hand over a quest the platform fetched itself, as backend JSON.
#[uniffi::export]
pub fn quest_session_set_quest_json(handle: u64, quest_json: String) -> bool {
    let quest: Quest = match serde_json::from_str(&quest_json) {
        Ok(quest) => quest,
        Err(e) => {
            warn!("[QuestDirectionRust] Invalid quest JSON: {}", e);
            return false;
        }
    };
    with_session(handle, |s| log_err("set_quest", s.on_quest_loaded(quest)).is_some())
        .unwrap_or(false)
}

/// Close the session and drop it from the registry.
#[uniffi::export]
pub fn quest_session_close(handle: u64) {
    let removed = SESSIONS.lock().ok().and_then(|mut s| s.remove(&handle));
    let Some(session) = removed else {
        return;
    };
    let Ok(mut guard) = session.lock() else {
        return;
    };
    guard.close();
}

/// Map SDK settings the session was created with (access token, style).
#[uniffi::export]
pub fn quest_session_map_config(handle: u64) -> Option<MapConfig> {
    with_session(handle, |s| s.map_config().clone())
}

/// Current runtime state.
#[uniffi::export]
pub fn quest_session_state(handle: u64) -> Option<QuestRuntimeState> {
    with_session(handle, |s| s.snapshot())
}

// ============================================================================
// Location
// ============================================================================

#[uniffi::export]
pub fn quest_session_on_location(
    handle: u64,
    latitude: f64,
    longitude: f64,
) -> Option<StateChange> {
    with_session(handle, |s| {
        log_err("on_location", s.on_location(GeoPoint::new(latitude, longitude))).flatten()
    })
    .flatten()
}

#[uniffi::export]
pub fn quest_session_on_permission(handle: u64, status: PermissionStatus) -> Option<StateChange> {
    match status {
        PermissionStatus::Granted => None,
        PermissionStatus::Denied => {
            with_session(handle, |s| s.on_location_permission_denied()).flatten()
        }
    }
}

// ============================================================================
// User Actions
// ============================================================================

#[uniffi::export]
pub fn quest_session_browse(handle: u64) -> Option<StateChange> {
    with_session(handle, |s| log_err("browse", s.browse())).flatten()
}

#[uniffi::export]
pub fn quest_session_choose_starting_place(handle: u64) -> Option<StateChange> {
    with_session(handle, |s| log_err("choose_starting_place", s.choose_starting_place())).flatten()
}

#[uniffi::export]
pub fn quest_session_start_from_here(handle: u64) -> Option<StateChange> {
    with_session(handle, |s| log_err("start_from_here", s.start_from_here())).flatten()
}

/// Maps URL with walking directions to the first waypoint.
#[uniffi::export]
pub fn quest_session_directions_url(handle: u64) -> Option<String> {
    with_session(handle, |s| {
        log_err("directions_to_start", s.directions_to_start()).map(|r| r.url())
    })
    .flatten()
}

#[uniffi::export]
pub fn quest_session_choose_waypoint(handle: u64, waypoint_id: String) -> bool {
    with_session(handle, |s| {
        log_err("choose_waypoint", s.choose_waypoint(&waypoint_id)).is_some()
    })
    .unwrap_or(false)
}

#[uniffi::export]
pub fn quest_session_confirm_start(handle: u64) -> Option<StateChange> {
    with_session(handle, |s| log_err("confirm_start", s.confirm_start_from_sheet())).flatten()
}

#[uniffi::export]
pub fn quest_session_on_feature_tap(handle: u64, waypoint_id: String) -> bool {
    with_session(handle, |s| {
        log_err("on_feature_tap", s.on_feature_tap(&waypoint_id)).is_some()
    })
    .unwrap_or(false)
}

#[uniffi::export]
pub fn quest_session_on_map_press(handle: u64, latitude: f64, longitude: f64) {
    with_session(handle, |s| {
        log_err("on_map_press", s.on_map_press(GeoPoint::new(latitude, longitude)))
    });
}

#[uniffi::export]
pub fn quest_session_dismiss(handle: u64) {
    with_session(handle, |s| s.dismiss_presentation());
}

/// Move to the next waypoint. Returns the new destination index, or `None`
/// when the quest is finished or the call was rejected.
#[uniffi::export]
pub fn quest_session_advance(handle: u64) -> Option<u32> {
    with_session(handle, |s| log_err("advance_destination", s.advance_destination()))
        .flatten()
        .flatten()
        .map(|i| i as u32)
}

/// Waypoint IDs for the choose-place list, closest first.
#[uniffi::export]
pub fn quest_session_waypoints_by_distance(handle: u64) -> Vec<String> {
    with_session(handle, |s| {
        s.waypoints_by_distance()
            .iter()
            .map(|w| w.id().to_string())
            .collect()
    })
    .unwrap_or_default()
}

// ============================================================================
// Map Presentation
// ============================================================================

/// Map sources as JSON: `{ "extremities", "places", "walk-line", "destination" }`.
#[uniffi::export]
pub fn quest_session_shapes_json(handle: u64) -> String {
    with_session(handle, |s| s.shapes().to_json()).unwrap_or_default()
}

/// Layer styles as JSON, with the current pulse frame applied.
#[uniffi::export]
pub fn quest_session_layer_styles_json(handle: u64) -> String {
    with_session(handle, |s| {
        serde_json::to_string(&s.layer_styles(Instant::now())).unwrap_or_default()
    })
    .unwrap_or_default()
}

/// Pulse frame for the current tick.
#[uniffi::export]
pub fn quest_session_pulse_frame(handle: u64) -> Option<PulseFrame> {
    with_session(handle, |s| s.pulse_frame(Instant::now()))
}

#[uniffi::export]
pub fn quest_session_on_camera_ready(handle: u64) {
    with_session(handle, |s| s.on_camera_ready());
}

/// Drain queued camera commands as a JSON array.
#[uniffi::export]
pub fn quest_session_take_camera_commands_json(handle: u64) -> String {
    with_session(handle, |s| {
        serde_json::to_string(&s.take_camera_commands()).unwrap_or_default()
    })
    .unwrap_or_else(|| "[]".to_string())
}

#[uniffi::export]
pub fn quest_session_fit_to_zone_json(handle: u64) -> Option<String> {
    with_session(handle, |s| s.fit_to_zone())
        .flatten()
        .and_then(|c| serde_json::to_string(&c).ok())
}

#[uniffi::export]
pub fn quest_session_fly_to_user_json(handle: u64) -> Option<String> {
    with_session(handle, |s| s.fly_to_user())
        .flatten()
        .and_then(|c| serde_json::to_string(&c).ok())
}

#[uniffi::export]
pub fn quest_session_fly_to_destination_json(handle: u64) -> Option<String> {
    with_session(handle, |s| s.fly_to_destination())
        .flatten()
        .and_then(|c| serde_json::to_string(&c).ok())
}

//! Device location stream.
//!
//! The platform location API is abstracted behind [`LocationSource`]. The
//! consumer only ever needs the latest fix, so updates are delivered straight
//! to the callback with no buffering.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::error::{QuestError, Result};
use crate::GeoPoint;

/// Outcome of a foreground location permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Callback invoked with every location fix.
pub type LocationCallback = Arc<dyn Fn(GeoPoint) + Send + Sync>;

/// Handle to a live subscription on a location source.
pub trait LocationSubscription: Send {
    /// Stop delivering updates. Calling it twice is harmless.
    fn unsubscribe(&mut self);
}

/// Platform location API.
pub trait LocationSource {
    fn request_foreground_permission(&self) -> PermissionStatus;

    fn subscribe(&self, on_update: LocationCallback) -> Box<dyn LocationSubscription>;
}

/// An active location subscription. Unsubscribes when dropped.
pub struct LocationWatcher {
    subscription: Option<Box<dyn LocationSubscription>>,
}

impl LocationWatcher {
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            debug!("[LocationWatcher] Unsubscribed");
        }
    }
}

impl Drop for LocationWatcher {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for LocationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationWatcher")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Ask for foreground permission and subscribe to the location stream.
///
/// Fails with `PermissionDenied` when access is refused; the caller keeps
/// working without live position. Fixes with NaN or infinite coordinates
/// are dropped before reaching `on_update`.
pub fn watch_location<S, F>(source: &S, on_update: F) -> Result<LocationWatcher>
where
    S: LocationSource + ?Sized,
    F: Fn(GeoPoint) + Send + Sync + 'static,
{
    if source.request_foreground_permission() == PermissionStatus::Denied {
        warn!("[LocationWatcher] Foreground location permission denied");
        return Err(QuestError::PermissionDenied);
    }

    let callback: LocationCallback = Arc::new(move |point: GeoPoint| {
        if point.is_finite() {
            on_update(point);
        } else {
            debug!("[LocationWatcher] Dropping invalid fix {:?}", point);
        }
    });

    info!("[LocationWatcher] Subscribed to location updates");
    Ok(LocationWatcher {
        subscription: Some(source.subscribe(callback)),
    })
}

// ============================================================================
// Simulated Source
// ============================================================================

#[derive(Default)]
struct SimulatedInner {
    subscribers: HashMap<u64, LocationCallback>,
    next_id: u64,
}

/// In-process location source. `push` delivers a fix to every live
/// subscriber; used for tests and desktop runs without a GPS.
#[derive(Clone)]
pub struct SimulatedLocationSource {
    permission: PermissionStatus,
    inner: Arc<Mutex<SimulatedInner>>,
}

impl SimulatedLocationSource {
    pub fn new(permission: PermissionStatus) -> Self {
        Self {
            permission,
            inner: Arc::new(Mutex::new(SimulatedInner::default())),
        }
    }

    /// Deliver a fix. Callbacks run outside the internal lock so they may
    /// subscribe or unsubscribe.
    pub fn push(&self, point: GeoPoint) {
        let callbacks: Vec<LocationCallback> = match self.inner.lock() {
            Ok(inner) => inner.subscribers.values().cloned().collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(point);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().map(|i| i.subscribers.len()).unwrap_or(0)
    }
}

impl Default for SimulatedLocationSource {
    fn default() -> Self {
        Self::new(PermissionStatus::Granted)
    }
}

impl LocationSource for SimulatedLocationSource {
    fn request_foreground_permission(&self) -> PermissionStatus {
        self.permission
    }

    fn subscribe(&self, on_update: LocationCallback) -> Box<dyn LocationSubscription> {
        let id = match self.inner.lock() {
            Ok(mut inner) => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.subscribers.insert(id, on_update);
                id
            }
            Err(_) => u64::MAX,
        };
        Box::new(SimulatedSubscription {
            inner: Arc::clone(&self.inner),
            id,
        })
    }
}

struct SimulatedSubscription {
    inner: Arc<Mutex<SimulatedInner>>,
    id: u64,
}

impl LocationSubscription for SimulatedSubscription {
    fn unsubscribe(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.subscribers.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<GeoPoint>>>, impl Fn(GeoPoint) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |p| sink.lock().unwrap().push(p))
    }

    #[test]
    fn test_permission_denied() {
        let source = SimulatedLocationSource::new(PermissionStatus::Denied);
        let (_, on_update) = recorder();
        let err = watch_location(&source, on_update).unwrap_err();
        assert_eq!(err, QuestError::PermissionDenied);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn test_updates_are_delivered() {
        let source = SimulatedLocationSource::default();
        let (seen, on_update) = recorder();
        let watcher = watch_location(&source, on_update).unwrap();
        assert!(watcher.is_active());

        source.push(GeoPoint::new(35.7119, 139.7953));
        source.push(GeoPoint::new(35.7120, 139.7954));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], GeoPoint::new(35.7120, 139.7954));
    }

    #[test]
    fn test_non_finite_fixes_are_dropped() {
        let source = SimulatedLocationSource::default();
        let (seen, on_update) = recorder();
        let _watcher = watch_location(&source, on_update).unwrap();

        source.push(GeoPoint::new(f64::NAN, 139.0));
        source.push(GeoPoint::new(35.0, f64::INFINITY));
        assert!(seen.lock().unwrap().is_empty());

        // Out-of-range but finite fixes are forwarded as reported
        source.push(GeoPoint::new(100.0, 100.0));
        assert_eq!(*seen.lock().unwrap(), vec![GeoPoint::new(100.0, 100.0)]);
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let source = SimulatedLocationSource::default();
        let (seen, on_update) = recorder();
        let watcher = watch_location(&source, on_update).unwrap();
        assert_eq!(source.subscriber_count(), 1);

        drop(watcher);
        assert_eq!(source.subscriber_count(), 0);

        source.push(GeoPoint::new(35.0, 139.0));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let source = SimulatedLocationSource::default();
        let (_, on_update) = recorder();
        let mut watcher = watch_location(&source, on_update).unwrap();
        watcher.unsubscribe();
        watcher.unsubscribe();
        assert!(!watcher.is_active());
        assert_eq!(source.subscriber_count(), 0);
    }
}

//! Device location source.
//!
//! The platform delivers fixes through callbacks; [`DeviceLocation`] is the
//! seam those callbacks push into. Consumers only see the latest fix through
//! [`LocationProvider::current_coordinates`], which starts at
//! [`Coordinates::SENTINEL`] until the first fix arrives.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{model::Coordinates, updates::Updates};

/// Outcome of [`LocationProvider::request_updates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStatus {
    Started,
    AlreadyActive,
    /// No location permission. Coordinates stay at the sentinel.
    PermissionDenied,
}

pub trait LocationProvider: Send + Sync + Debug {
    fn has_permission(&self) -> bool;

    /// Start receiving fixes. Idempotent.
    fn request_updates(&self) -> LocationStatus;

    /// Latest fix first, then each new one.
    fn current_coordinates(&self) -> Updates<Coordinates>;

    /// Stop receiving fixes. Idempotent.
    fn stop_updates(&self);
}

#[derive(Debug)]
pub struct DeviceLocation {
    permission: AtomicBool,
    active: AtomicBool,
    fixed_position: Option<Coordinates>,
    tx: watch::Sender<Coordinates>,
}

impl DeviceLocation {
    pub fn new(permission_granted: bool) -> Self {
        let (tx, _) = watch::channel(Coordinates::SENTINEL);
        Self {
            permission: AtomicBool::new(permission_granted),
            active: AtomicBool::new(false),
            fixed_position: None,
            tx,
        }
    }

    /// A source with permission that reports `position` as soon as updates start.
    pub fn with_fixed_position(position: Coordinates) -> Self {
        Self {
            fixed_position: Some(position),
            ..Self::new(true)
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
        if !granted {
            self.stop_updates();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Platform callback for a new fix. Dropped unless updates are active.
    /// Returns whether subscribers were notified.
    pub fn report_fix(&self, position: Coordinates) -> bool {
        if !self.is_active() {
            debug!(%position, "location fix ignored, updates not active");
            return false;
        }
        self.publish(position)
    }

    fn publish(&self, position: Coordinates) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == position {
                false
            } else {
                *current = position;
                true
            }
        })
    }
}

impl LocationProvider for DeviceLocation {
    fn has_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn request_updates(&self) -> LocationStatus {
        if !self.has_permission() {
            warn!("location permission not granted");
            return LocationStatus::PermissionDenied;
        }
        if self.active.swap(true, Ordering::SeqCst) {
            return LocationStatus::AlreadyActive;
        }

        info!("location updates started");
        if let Some(position) = self.fixed_position {
            self.publish(position);
        }
        LocationStatus::Started
    }

    fn current_coordinates(&self) -> Updates<Coordinates> {
        Updates::new(self.tx.subscribe())
    }

    fn stop_updates(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("location updates stopped");
        }
    }
}

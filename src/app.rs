//! Application context.
//!
//! `ScanContext` is the explicit, startup-constructed object every request
//! handler receives: the camera registry, the motion link with its lazy
//! reconnect, and the runtime-tunable motion parameters. There are no
//! ambient singletons anywhere in the crate.

use crate::camera::registry::{CameraDescriptor, CameraRegistry};
use crate::config::{Anchor, Settings};
use crate::error::{BenchError, BenchResult};
use crate::hardware::camera::CameraProvider;
use crate::hardware::transport::MotionTransport;
use crate::motion::gcode::MoveTarget;
use crate::motion::MotionLink;
use crate::scan::ScanOrchestrator;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Produces a fresh transport for each (re)connection attempt.
pub type TransportFactory = Box<dyn Fn() -> BenchResult<Box<dyn MotionTransport>> + Send + Sync>;

/// Factory opening the serial port named in the motion settings.
#[cfg(feature = "motion_serial")]
pub fn serial_transport_factory(motion: &crate::config::MotionSettings) -> TransportFactory {
    let port = motion.port.clone();
    let baud = motion.baud;
    Box::new(move || {
        let transport = crate::hardware::serial::SerialTransport::open(&port, baud)?;
        Ok(Box::new(transport) as Box<dyn MotionTransport>)
    })
}

/// Runtime-adjustable motion parameters.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct MotionTuning {
    pub feed_xy: u32,
    pub feed_z: u32,
    #[serde(with = "humantime_serde")]
    pub settle: Duration,
    pub anchor: Anchor,
}

/// Partial update to [`MotionTuning`]; unset fields keep their value.
#[derive(Clone, Copy, Debug, Default)]
pub struct TuningUpdate {
    pub feed_xy: Option<u32>,
    pub feed_z: Option<u32>,
    pub settle: Option<Duration>,
}

/// Liveness/status snapshot for the HTTP layer.
#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub link_connected: bool,
    pub cameras: Vec<CameraDescriptor>,
    pub tuning: MotionTuning,
}

pub struct ScanContext {
    settings: Settings,
    registry: Arc<CameraRegistry>,
    link: Arc<MotionLink>,
    transport_factory: TransportFactory,
    tuning: RwLock<MotionTuning>,
}

impl ScanContext {
    /// Build the context: enumerate cameras, start their sessions, and
    /// prepare the (not yet connected) motion link.
    pub async fn initialize(
        settings: Settings,
        provider: &dyn CameraProvider,
        transport_factory: TransportFactory,
    ) -> BenchResult<Self> {
        let registry = Arc::new(CameraRegistry::initialize(provider).await?);
        let link = Arc::new(MotionLink::with_ack_timeout(settings.motion.ack_timeout));
        let tuning = MotionTuning {
            feed_xy: settings.motion.feed_xy,
            feed_z: settings.motion.feed_z,
            settle: settings.motion.settle,
            anchor: settings.motion.anchor,
        };

        info!("Scan context initialized");
        Ok(Self {
            settings,
            registry,
            link,
            transport_factory,
            tuning: RwLock::new(tuning),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<CameraRegistry> {
        &self.registry
    }

    pub fn link(&self) -> &Arc<MotionLink> {
        &self.link
    }

    /// Connect the motion link if it is not already up.
    pub async fn ensure_link(&self) -> BenchResult<()> {
        if self.link.is_connected().await {
            return Ok(());
        }
        let transport = (self.transport_factory)()?;
        self.link.connect(transport).await
    }

    /// An orchestrator bound to this context's current settle default.
    pub async fn orchestrator(&self) -> ScanOrchestrator {
        let settle = self.tuning.read().await.settle;
        ScanOrchestrator::new(self.link.clone(), self.registry.clone(), settle)
    }

    /// A move target seeded with the currently tuned feed rates.
    pub async fn move_target(
        &self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    ) -> MoveTarget {
        let tuning = self.tuning().await;
        MoveTarget {
            x,
            y,
            z,
            feed_xy: tuning.feed_xy,
            feed_z: tuning.feed_z,
            ..MoveTarget::default()
        }
    }

    pub async fn tuning(&self) -> MotionTuning {
        *self.tuning.read().await
    }

    /// Apply a clamped tuning update and return the result. Feed rates are
    /// floored at 1; a zero settle is allowed (captures immediately).
    pub async fn update_tuning(&self, update: TuningUpdate) -> MotionTuning {
        let mut tuning = self.tuning.write().await;
        if let Some(feed_xy) = update.feed_xy {
            tuning.feed_xy = feed_xy.max(1);
        }
        if let Some(feed_z) = update.feed_z {
            tuning.feed_z = feed_z.max(1);
        }
        if let Some(settle) = update.settle {
            tuning.settle = settle;
        }
        *tuning
    }

    /// Re-anchor the stage: declare the current physical position to be the
    /// given logical coordinates and remember them as the scan center.
    pub async fn set_center(&self, anchor: Anchor) -> BenchResult<()> {
        self.ensure_link().await?;
        self.link.set_origin(anchor.x, anchor.y, anchor.z).await?;
        self.tuning.write().await.anchor = anchor;
        info!(
            "Scan center set to ({}, {}, {})",
            anchor.x, anchor.y, anchor.z
        );
        Ok(())
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            link_connected: self.link.is_connected().await,
            cameras: self.registry.list(),
            tuning: self.tuning().await,
        }
    }

    /// Health snapshot as JSON, ready for the HTTP layer.
    pub async fn health_json(&self) -> serde_json::Value {
        serde_json::to_value(self.health().await).unwrap_or(serde_json::Value::Null)
    }

    /// Disconnect the link and stop every camera session, aggregating
    /// failures so each part gets its shutdown attempt.
    pub async fn shutdown(&self) -> BenchResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.link.disconnect().await {
            warn!("motion link disconnect failed: {}", e);
            errors.push(e);
        }
        match self.registry.stop_all().await {
            Ok(()) => {}
            Err(BenchError::ShutdownFailed(mut session_errors)) => {
                errors.append(&mut session_errors)
            }
            Err(e) => errors.push(e),
        }

        if errors.is_empty() {
            info!("Scan context shut down");
            Ok(())
        } else {
            Err(BenchError::ShutdownFailed(errors))
        }
    }
}

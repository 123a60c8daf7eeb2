//! Camera discovery and session ownership.
//!
//! The registry enumerates cameras once at startup, builds one session per
//! device, and owns them for the process lifetime. Ids are index-derived and
//! stable; labels come from device identity with a generated fallback, made
//! unique so persisted capture names never collide across sessions.

use crate::camera::session::CameraSession;
use crate::error::{BenchError, BenchResult};
use crate::hardware::camera::CameraProvider;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Listing entry for one session.
#[derive(Clone, Debug, Serialize)]
pub struct CameraDescriptor {
    pub id: String,
    pub label: String,
    pub index: usize,
}

pub struct CameraRegistry {
    sessions: Vec<Arc<CameraSession>>,
}

impl CameraRegistry {
    /// Enumerate cameras and start a session for each.
    ///
    /// Startup is fail-fast: if any camera cannot start, sessions already
    /// running are stopped best-effort and the error propagates.
    pub async fn initialize(provider: &dyn CameraProvider) -> BenchResult<Self> {
        let devices = provider.enumerate()?;

        let mut sessions: Vec<Arc<CameraSession>> = Vec::with_capacity(devices.len());
        let mut labels_seen = HashSet::new();

        for (index, device) in devices.into_iter().enumerate() {
            let id = format!("cam{}", index);
            let mut label = device
                .identity()
                .model
                .unwrap_or_else(|| format!("camera_{}", index));
            if !labels_seen.insert(label.clone()) {
                // Same model twice on the bus; keep file names distinct.
                label = format!("{}_{}", label, index);
                labels_seen.insert(label.clone());
            }

            match CameraSession::start(id, label, index, device).await {
                Ok(session) => sessions.push(Arc::new(session)),
                Err(e) => {
                    for session in &sessions {
                        if let Err(stop_err) = session.stop().await {
                            warn!(
                                "stopping '{}' during failed startup: {}",
                                session.id(),
                                stop_err
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }

        info!("Camera registry started {} session(s)", sessions.len());
        Ok(Self { sessions })
    }

    pub fn list(&self) -> Vec<CameraDescriptor> {
        self.sessions
            .iter()
            .map(|s| CameraDescriptor {
                id: s.id().to_string(),
                label: s.label().to_string(),
                index: s.index(),
            })
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn get(&self, id: &str) -> BenchResult<Arc<CameraSession>> {
        self.sessions
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| BenchError::CameraNotFound(id.to_string()))
    }

    /// Stop every session. A failure in one never prevents attempting the
    /// others; failures are aggregated.
    pub async fn stop_all(&self) -> BenchResult<()> {
        let mut errors = Vec::new();
        for session in &self.sessions {
            if let Err(e) = session.stop().await {
                warn!("failed to stop '{}': {}", session.id(), e);
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BenchError::ShutdownFailed(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{MockCameraFleet, MockCameraSpec};

    #[tokio::test]
    async fn ids_are_index_derived_and_labels_fall_back() {
        let fleet = MockCameraFleet::new(vec![
            MockCameraSpec::with_model("imx708"),
            MockCameraSpec::default(),
        ]);
        let registry = CameraRegistry::initialize(&fleet).await.unwrap();

        let listed = registry.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "cam0");
        assert_eq!(listed[0].label, "imx708");
        assert_eq!(listed[1].id, "cam1");
        assert_eq!(listed[1].label, "camera_1");

        registry.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_models_get_unique_labels() {
        let fleet = MockCameraFleet::new(vec![
            MockCameraSpec::with_model("imx708"),
            MockCameraSpec::with_model("imx708"),
        ]);
        let registry = CameraRegistry::initialize(&fleet).await.unwrap();

        let listed = registry.list();
        assert_eq!(listed[0].label, "imx708");
        assert_eq!(listed[1].label, "imx708_1");

        registry.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let fleet = MockCameraFleet::new(vec![MockCameraSpec::default()]);
        let registry = CameraRegistry::initialize(&fleet).await.unwrap();

        assert!(matches!(
            registry.get("cam9"),
            Err(BenchError::CameraNotFound(_))
        ));

        registry.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn enumeration_failure_propagates() {
        let result = CameraRegistry::initialize(&MockCameraFleet::unavailable()).await;
        assert!(matches!(result, Err(BenchError::DeviceUnavailable(_))));
    }
}

//! Simulated device platform.
//!
//! Stands in for a real location stack so the demo binary can exercise the
//! full flow on a workstation: the permission dialog answers itself after a
//! short pause, the provider walks a position around a starting point, and
//! the host prints every prompt it is asked to show.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use locwatch::{
    AccuracyTier, BoxFuture, HostActionError, HostActions, LocationFix, LocationProvider,
    PermissionGateway, PermissionLevel, ProviderError, RegistrationId, ResolutionToken,
    RetryHandle, SettingsCheckError, UpdateRequest,
};

/// How long the simulated user takes to answer a dialog.
const USER_THINK_TIME: Duration = Duration::from_millis(750);

/// Permission gateway whose "user" answers every request after a pause.
pub struct SimPermissions {
    granted: Arc<AtomicBool>,
    deny: bool,
}

impl SimPermissions {
    pub fn new(deny: bool) -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(false)),
            deny,
        }
    }
}

impl PermissionGateway for SimPermissions {
    fn is_granted(&self, _level: PermissionLevel) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn was_denied(&self, _level: PermissionLevel) -> bool {
        false
    }

    fn should_show_rationale(&self, _level: PermissionLevel) -> bool {
        false
    }

    fn request_permission(&self, level: PermissionLevel, request_id: u32) {
        info!(?level, request_id, "permission dialog opened");
        let grant = !self.deny;
        let granted = self.granted.clone();
        tokio::spawn(async move {
            tokio::time::sleep(USER_THINK_TIME).await;
            if grant {
                granted.store(true, Ordering::SeqCst);
            }
            info!(request_id, grant, "permission dialog answered");
            if let Ok(instance) = locwatch::instance() {
                instance.on_permission_result(request_id, grant);
            }
        });
    }
}

/// Location provider that synthesizes a wandering position.
pub struct SimProvider {
    settings_enabled: Arc<AtomicBool>,
    last_fix: Arc<Mutex<Option<LocationFix>>>,
    next_id: AtomicU64,
    next_token: AtomicU64,
    generators: Mutex<HashMap<RegistrationId, JoinHandle<()>>>,
}

impl SimProvider {
    pub fn new(settings_enabled: Arc<AtomicBool>) -> Self {
        Self {
            settings_enabled,
            last_fix: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
            next_token: AtomicU64::new(1),
            generators: Mutex::new(HashMap::new()),
        }
    }
}

/// Positional noise per accuracy tier, in degrees.
fn jitter(accuracy: AccuracyTier) -> f64 {
    match accuracy {
        AccuracyTier::HighAccuracy => 0.00005,
        AccuracyTier::BalancedPower => 0.0005,
        AccuracyTier::LowPower => 0.005,
        AccuracyTier::NoPower => 0.02,
    }
}

impl LocationProvider for SimProvider {
    fn check_settings(
        &self,
        _accuracy: AccuracyTier,
    ) -> BoxFuture<'_, Result<(), SettingsCheckError>> {
        let result = if self.settings_enabled.load(Ordering::SeqCst) {
            Ok(())
        } else {
            let token = ResolutionToken::new(self.next_token.fetch_add(1, Ordering::SeqCst));
            Err(SettingsCheckError::ResolutionRequired(token))
        };
        Box::pin(async move { result })
    }

    fn last_known_fix(&self) -> BoxFuture<'_, Option<LocationFix>> {
        let fix = self.last_fix.lock().clone();
        Box::pin(async move { fix })
    }

    fn request_updates(
        &self,
        request: UpdateRequest,
        fixes: tokio::sync::mpsc::Sender<LocationFix>,
    ) -> Result<RegistrationId, ProviderError> {
        if !self.settings_enabled.load(Ordering::SeqCst) {
            return Err(ProviderError::new("device location is disabled"));
        }

        let id = RegistrationId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let interval = Duration::from_millis(request.interval_ms);
        let noise = jitter(request.accuracy);
        let last_fix = self.last_fix.clone();

        let handle = tokio::spawn(async move {
            // Start where the previous registration left off, or in Hamburg.
            let (mut lat, mut lon) = match &*last_fix.lock() {
                Some(fix) => (fix.latitude, fix.longitude),
                None => (53.5511, 9.9937),
            };
            let mut step = 0u64;
            loop {
                tokio::time::sleep(interval).await;
                step += 1;
                lat += noise * ((step % 7) as f64 - 3.0);
                lon += noise * ((step % 5) as f64 - 2.0);
                let fix = LocationFix::new(lat, lon, 6.0);
                *last_fix.lock() = Some(fix.clone());
                if fixes.send(fix).await.is_err() {
                    break;
                }
            }
        });
        self.generators.lock().insert(id, handle);
        Ok(id)
    }

    fn cancel_updates(&self, registration: RegistrationId) {
        if let Some(handle) = self.generators.lock().remove(&registration) {
            handle.abort();
        }
    }
}

/// Host that prints prompts and answers them like a cooperative user.
pub struct SimHost {
    settings_enabled: Arc<AtomicBool>,
}

impl SimHost {
    pub fn new(settings_enabled: Arc<AtomicBool>) -> Self {
        Self { settings_enabled }
    }
}

impl HostActions for SimHost {
    fn show_permission_rationale(&self, message: &str) -> Result<(), HostActionError> {
        info!(message, "rationale shown");
        Ok(())
    }

    fn launch_resolution(
        &self,
        token: ResolutionToken,
        request_id: u32,
    ) -> Result<(), HostActionError> {
        info!(token = token.id(), request_id, "resolution flow launched");
        let settings_enabled = self.settings_enabled.clone();
        tokio::spawn(async move {
            tokio::time::sleep(USER_THINK_TIME).await;
            settings_enabled.store(true, Ordering::SeqCst);
            info!("user enabled location in the resolution flow");
            if let Ok(instance) = locwatch::instance() {
                instance.on_resolution_result(true);
            }
        });
        Ok(())
    }

    fn show_enable_location_message(
        &self,
        message: &str,
        retry: RetryHandle,
    ) -> Result<(), HostActionError> {
        info!(message, "enable-location message shown");
        let settings_enabled = self.settings_enabled.clone();
        tokio::spawn(async move {
            tokio::time::sleep(USER_THINK_TIME).await;
            settings_enabled.store(true, Ordering::SeqCst);
            info!("user enabled location by hand, retrying");
            retry.retry();
        });
        Ok(())
    }
}

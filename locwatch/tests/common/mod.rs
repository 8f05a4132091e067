//! Shared scripted platform fakes for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

use locwatch::{
    BoxFuture, Configuration, HostActionError, HostActions, LocationFix, LocationProvider,
    LocationStatus, LocationUpdates, Locwatch, PermissionGateway, PermissionLevel,
    PermissionStatus, PermissionUpdates, Platform, ProviderError, RegistrationId,
    ResolutionToken, RetryHandle, SettingsCheckError, UpdateRequest,
};

/// Token id every scripted resolution-required failure carries.
pub const SCRIPTED_TOKEN_ID: u64 = 42;

// ============================================================================
// Permission gateway fake
// ============================================================================

#[derive(Default)]
pub struct FakePermissions {
    pub granted: AtomicBool,
    pub denied: AtomicBool,
    pub rationale: AtomicBool,
    pub requests: Mutex<Vec<(PermissionLevel, u32)>>,
}

impl FakePermissions {
    pub fn last_request_id(&self) -> u32 {
        self.requests
            .lock()
            .unwrap()
            .last()
            .expect("no permission request recorded")
            .1
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl PermissionGateway for FakePermissions {
    fn is_granted(&self, _level: PermissionLevel) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn was_denied(&self, _level: PermissionLevel) -> bool {
        self.denied.load(Ordering::SeqCst)
    }

    fn should_show_rationale(&self, _level: PermissionLevel) -> bool {
        self.rationale.load(Ordering::SeqCst)
    }

    fn request_permission(&self, level: PermissionLevel, request_id: u32) {
        self.requests.lock().unwrap().push((level, request_id));
    }
}

// ============================================================================
// Location provider fake
// ============================================================================

#[derive(Clone, Copy, Debug)]
pub enum SettingsMode {
    Satisfied,
    ResolutionRequired,
    ResolutionUnavailable,
    Transient,
}

pub struct FakeProvider {
    pub settings_mode: Mutex<SettingsMode>,
    pub settings_checks: AtomicUsize,
    pub last_fix: Mutex<Option<LocationFix>>,
    pub cancelled: Mutex<Vec<RegistrationId>>,
    pub fail_registration: AtomicBool,
    next_registration: AtomicU64,
    active: Mutex<Vec<ActiveRegistration>>,
}

pub struct ActiveRegistration {
    pub id: RegistrationId,
    pub request: UpdateRequest,
    pub fixes: mpsc::Sender<LocationFix>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            settings_mode: Mutex::new(SettingsMode::Satisfied),
            settings_checks: AtomicUsize::new(0),
            last_fix: Mutex::new(None),
            cancelled: Mutex::new(Vec::new()),
            fail_registration: AtomicBool::new(false),
            next_registration: AtomicU64::new(1),
            active: Mutex::new(Vec::new()),
        }
    }
}

impl FakeProvider {
    pub fn set_settings_mode(&self, mode: SettingsMode) {
        *self.settings_mode.lock().unwrap() = mode;
    }

    pub fn set_last_fix(&self, fix: Option<LocationFix>) {
        *self.last_fix.lock().unwrap() = fix;
    }

    pub fn live_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn live_request(&self) -> UpdateRequest {
        self.active
            .lock()
            .unwrap()
            .last()
            .expect("no live registration")
            .request
    }

    pub fn live_id(&self) -> RegistrationId {
        self.active.lock().unwrap().last().expect("no live registration").id
    }

    /// Sender for the current registration, to push fixes from the test.
    pub fn fix_sender(&self) -> mpsc::Sender<LocationFix> {
        self.active
            .lock()
            .unwrap()
            .last()
            .expect("no live registration")
            .fixes
            .clone()
    }

    pub async fn push_fix(&self, fix: LocationFix) {
        self.fix_sender().send(fix).await.expect("fix channel closed");
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.lock().unwrap().len()
    }
}

impl LocationProvider for FakeProvider {
    fn check_settings(
        &self,
        _accuracy: locwatch::AccuracyTier,
    ) -> BoxFuture<'_, Result<(), SettingsCheckError>> {
        self.settings_checks.fetch_add(1, Ordering::SeqCst);
        let result = match *self.settings_mode.lock().unwrap() {
            SettingsMode::Satisfied => Ok(()),
            SettingsMode::ResolutionRequired => Err(SettingsCheckError::ResolutionRequired(
                ResolutionToken::new(SCRIPTED_TOKEN_ID),
            )),
            SettingsMode::ResolutionUnavailable => Err(SettingsCheckError::ResolutionUnavailable),
            SettingsMode::Transient => {
                Err(SettingsCheckError::Transient("scripted outage".into()))
            }
        };
        Box::pin(async move { result })
    }

    fn last_known_fix(&self) -> BoxFuture<'_, Option<LocationFix>> {
        let fix = self.last_fix.lock().unwrap().clone();
        Box::pin(async move { fix })
    }

    fn request_updates(
        &self,
        request: UpdateRequest,
        fixes: mpsc::Sender<LocationFix>,
    ) -> Result<RegistrationId, ProviderError> {
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(ProviderError::new("scripted registration failure"));
        }
        let id = RegistrationId::new(self.next_registration.fetch_add(1, Ordering::SeqCst));
        self.active.lock().unwrap().push(ActiveRegistration {
            id,
            request,
            fixes,
        });
        Ok(id)
    }

    fn cancel_updates(&self, registration: RegistrationId) {
        self.cancelled.lock().unwrap().push(registration);
        self.active
            .lock()
            .unwrap()
            .retain(|reg| reg.id != registration);
    }
}

// ============================================================================
// Host fake
// ============================================================================

#[derive(Default)]
pub struct FakeHost {
    pub rationales: AtomicUsize,
    pub resolutions: Mutex<Vec<(ResolutionToken, u32)>>,
    pub enable_messages: Mutex<Vec<RetryHandle>>,
}

impl HostActions for FakeHost {
    fn show_permission_rationale(&self, _message: &str) -> Result<(), HostActionError> {
        self.rationales.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn launch_resolution(
        &self,
        token: ResolutionToken,
        request_id: u32,
    ) -> Result<(), HostActionError> {
        self.resolutions.lock().unwrap().push((token, request_id));
        Ok(())
    }

    fn show_enable_location_message(
        &self,
        _message: &str,
        retry: RetryHandle,
    ) -> Result<(), HostActionError> {
        self.enable_messages.lock().unwrap().push(retry);
        Ok(())
    }
}

// ============================================================================
// Harness and helpers
// ============================================================================

pub struct Harness {
    pub watch: Locwatch,
    pub permissions: Arc<FakePermissions>,
    pub provider: Arc<FakeProvider>,
}

pub fn harness(config: Configuration) -> Harness {
    let permissions = Arc::new(FakePermissions::default());
    let provider = Arc::new(FakeProvider::default());
    let watch = Locwatch::new(
        config,
        Platform {
            permissions: permissions.clone(),
            provider: provider.clone(),
        },
    );
    Harness {
        watch,
        permissions,
        provider,
    }
}

pub fn granted_harness() -> Harness {
    let h = harness(Configuration::default());
    h.permissions.granted.store(true, Ordering::SeqCst);
    h
}

/// Await the next location status, failing loudly on a stall.
pub async fn next_location(updates: &mut LocationUpdates) -> LocationStatus {
    timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("timed out waiting for location status")
        .expect("location stream closed")
}

/// Await the next permission status, failing loudly on a stall.
pub async fn next_permission(updates: &mut PermissionUpdates) -> PermissionStatus {
    timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("timed out waiting for permission status")
        .expect("permission stream closed")
}

/// Drain statuses until one matches, failing loudly on a stall.
pub async fn location_until<F>(updates: &mut LocationUpdates, mut matches: F) -> LocationStatus
where
    F: FnMut(&LocationStatus) -> bool,
{
    loop {
        let status = next_location(updates).await;
        if matches(&status) {
            return status;
        }
    }
}

/// Poll until `condition` holds, failing loudly after two seconds.
pub async fn wait_until<F>(description: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            Instant::now() < deadline,
            "condition not met in time: {description}"
        );
        sleep(Duration::from_millis(10)).await;
    }
}

/// Give the coordinator time to process anything outstanding.
pub async fn settle() {
    sleep(Duration::from_millis(100)).await;
}

//! Permission state machine.
//!
//! Tracks the approval state of the configured location permission and
//! drives the platform permission primitives. Binding a foreground host
//! re-evaluates the grant from scratch, so "terminal" states like
//! `PermissionDenied` are re-entered whenever a new host comes to the
//! front and the device still reports a denial.
//!
//! Every emitted status goes to the replay-latest permission subject; the
//! coordinator watches for `PermissionGranted` emissions to re-check
//! acquisition.

use tracing::debug;

use crate::config::Configuration;
use crate::host::HostSlot;
use crate::platform::PermissionGateway;
use crate::stream::Subject;

/// Permission lifecycle state.
///
/// Declaration order is the severity ordering the machine compares
/// against: a status earlier in the list may still escalate to a rationale
/// or an active request, while `RequestingPermission` and
/// `PermissionGranted` may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionStatus {
    /// Initial state, never observed through the stream.
    Unknown,
    /// The user explicitly denied the permission.
    PermissionDenied,
    /// A rationale should be shown before re-requesting.
    ShouldShowRationale,
    /// Not granted and never explicitly denied: a plain request will do.
    HasNoPermission,
    /// The request dialog is up; the result has not arrived yet.
    RequestingPermission,
    /// Granted. Acquisition can proceed.
    PermissionGranted,
}

/// State machine for one permission level.
pub(crate) struct PermissionMachine {
    status: PermissionStatus,
    subject: Subject<PermissionStatus>,
    pending_request: Option<u32>,
    next_request_id: u32,
}

impl PermissionMachine {
    pub(crate) fn new(subject: Subject<PermissionStatus>) -> Self {
        Self {
            status: PermissionStatus::Unknown,
            subject,
            pending_request: None,
            next_request_id: 1,
        }
    }

    /// Current status. `Unknown` until the first host bind.
    pub(crate) fn status(&self) -> PermissionStatus {
        self.status
    }

    /// Re-evaluate the grant for a freshly bound host.
    ///
    /// Emits the evaluated status, then — unless a request is already in
    /// flight or the permission is granted — escalates: a rationale when
    /// the platform asks for one, otherwise a direct request when
    /// automatic prompting is configured.
    pub(crate) fn on_host_bound(
        &mut self,
        gateway: &dyn PermissionGateway,
        host: &HostSlot,
        config: &Configuration,
    ) {
        let level = config.permission_level;
        if gateway.is_granted(level) {
            self.set_status(PermissionStatus::PermissionGranted);
        } else if gateway.was_denied(level) {
            self.set_status(PermissionStatus::PermissionDenied);
        } else {
            self.set_status(PermissionStatus::HasNoPermission);
        }

        if self.status < PermissionStatus::RequestingPermission {
            if gateway.should_show_rationale(level) {
                self.set_status(PermissionStatus::ShouldShowRationale);
                if config.auto_permission_prompt {
                    let message = config.permission_message.clone();
                    host.with_live(|h| h.show_permission_rationale(&message));
                }
            } else if config.auto_permission_prompt {
                self.request_permission(gateway, config);
            }
        }
    }

    /// Ingest a permission request outcome.
    ///
    /// Results carrying an id other than the pending one are stale and
    /// ignored.
    pub(crate) fn on_permission_result(
        &mut self,
        request_id: u32,
        granted: bool,
        host: &HostSlot,
        config: &Configuration,
    ) {
        if self.pending_request != Some(request_id) {
            debug!(request_id, "ignoring permission result with unknown request id");
            return;
        }
        self.pending_request = None;

        if granted {
            self.set_status(PermissionStatus::PermissionGranted);
        } else {
            self.set_status(PermissionStatus::PermissionDenied);
            if config.auto_permission_prompt {
                let message = config.permission_message.clone();
                host.with_live(|h| h.show_permission_rationale(&message));
            }
        }
    }

    fn request_permission(&mut self, gateway: &dyn PermissionGateway, config: &Configuration) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_request = Some(request_id);
        self.set_status(PermissionStatus::RequestingPermission);
        gateway.request_permission(config.permission_level, request_id);
    }

    fn set_status(&mut self, status: PermissionStatus) {
        debug!(?status, "permission status");
        self.status = status;
        self.subject.publish(status);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::config::PermissionLevel;

    #[derive(Default)]
    struct ScriptedGateway {
        granted: AtomicBool,
        denied: AtomicBool,
        rationale: AtomicBool,
        requests: Mutex<Vec<u32>>,
    }

    impl PermissionGateway for ScriptedGateway {
        fn is_granted(&self, _level: PermissionLevel) -> bool {
            self.granted.load(Ordering::SeqCst)
        }

        fn was_denied(&self, _level: PermissionLevel) -> bool {
            self.denied.load(Ordering::SeqCst)
        }

        fn should_show_rationale(&self, _level: PermissionLevel) -> bool {
            self.rationale.load(Ordering::SeqCst)
        }

        fn request_permission(&self, _level: PermissionLevel, request_id: u32) {
            self.requests.lock().unwrap().push(request_id);
        }
    }

    fn machine() -> (PermissionMachine, Subject<PermissionStatus>) {
        let subject = Subject::new();
        (PermissionMachine::new(subject.clone()), subject)
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<PermissionStatus>) -> Vec<PermissionStatus> {
        let mut out = Vec::new();
        while let Ok(status) = rx.try_recv() {
            out.push(status);
        }
        out
    }

    #[test]
    fn test_severity_ordering_matches_declaration() {
        assert!(PermissionStatus::Unknown < PermissionStatus::PermissionDenied);
        assert!(PermissionStatus::PermissionDenied < PermissionStatus::RequestingPermission);
        assert!(PermissionStatus::ShouldShowRationale < PermissionStatus::RequestingPermission);
        assert!(PermissionStatus::HasNoPermission < PermissionStatus::RequestingPermission);
        assert!(PermissionStatus::RequestingPermission < PermissionStatus::PermissionGranted);
    }

    #[test]
    fn test_fresh_bind_without_permission_requests_it() {
        let (mut machine, subject) = machine();
        let mut rx = subject.subscribe();
        let gateway = ScriptedGateway::default();
        let config = Configuration::default();

        machine.on_host_bound(&gateway, &HostSlot::default(), &config);

        assert_eq!(
            drain(&mut rx),
            vec![
                PermissionStatus::HasNoPermission,
                PermissionStatus::RequestingPermission
            ]
        );
        assert_eq!(gateway.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_granted_bind_emits_granted_only() {
        let (mut machine, subject) = machine();
        let mut rx = subject.subscribe();
        let gateway = ScriptedGateway::default();
        gateway.granted.store(true, Ordering::SeqCst);

        machine.on_host_bound(&gateway, &HostSlot::default(), &Configuration::default());

        assert_eq!(drain(&mut rx), vec![PermissionStatus::PermissionGranted]);
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_denied_with_rationale_emits_should_show() {
        let (mut machine, subject) = machine();
        let mut rx = subject.subscribe();
        let gateway = ScriptedGateway::default();
        gateway.denied.store(true, Ordering::SeqCst);
        gateway.rationale.store(true, Ordering::SeqCst);

        machine.on_host_bound(&gateway, &HostSlot::default(), &Configuration::default());

        assert_eq!(
            drain(&mut rx),
            vec![
                PermissionStatus::PermissionDenied,
                PermissionStatus::ShouldShowRationale
            ]
        );
        // Rationale path never fires a platform request.
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_auto_prompt_disabled_stops_at_evaluation() {
        let (mut machine, subject) = machine();
        let mut rx = subject.subscribe();
        let gateway = ScriptedGateway::default();
        let config = Configuration::builder()
            .disable_auto_permission_prompt()
            .build()
            .unwrap();

        machine.on_host_bound(&gateway, &HostSlot::default(), &config);

        assert_eq!(drain(&mut rx), vec![PermissionStatus::HasNoPermission]);
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_matching_result_grants() {
        let (mut machine, subject) = machine();
        let gateway = ScriptedGateway::default();
        let config = Configuration::default();

        machine.on_host_bound(&gateway, &HostSlot::default(), &config);
        let request_id = gateway.requests.lock().unwrap()[0];

        let mut rx = subject.subscribe();
        machine.on_permission_result(request_id, true, &HostSlot::default(), &config);
        assert_eq!(machine.status(), PermissionStatus::PermissionGranted);
        // Replay of RequestingPermission, then the grant.
        assert_eq!(
            drain(&mut rx),
            vec![
                PermissionStatus::RequestingPermission,
                PermissionStatus::PermissionGranted
            ]
        );
    }

    #[test]
    fn test_denied_result_emits_denied() {
        let (mut machine, _subject) = machine();
        let gateway = ScriptedGateway::default();
        let config = Configuration::default();

        machine.on_host_bound(&gateway, &HostSlot::default(), &config);
        let request_id = gateway.requests.lock().unwrap()[0];

        machine.on_permission_result(request_id, false, &HostSlot::default(), &config);
        assert_eq!(machine.status(), PermissionStatus::PermissionDenied);
    }

    #[test]
    fn test_stale_result_ignored() {
        let (mut machine, _subject) = machine();
        let gateway = ScriptedGateway::default();
        let config = Configuration::default();

        machine.on_host_bound(&gateway, &HostSlot::default(), &config);
        machine.on_permission_result(0xdead, true, &HostSlot::default(), &config);

        assert_eq!(machine.status(), PermissionStatus::RequestingPermission);
    }

    #[test]
    fn test_result_consumed_once() {
        let (mut machine, _subject) = machine();
        let gateway = ScriptedGateway::default();
        let config = Configuration::default();

        machine.on_host_bound(&gateway, &HostSlot::default(), &config);
        let request_id = gateway.requests.lock().unwrap()[0];

        machine.on_permission_result(request_id, false, &HostSlot::default(), &config);
        // Same id again is now stale.
        machine.on_permission_result(request_id, true, &HostSlot::default(), &config);
        assert_eq!(machine.status(), PermissionStatus::PermissionDenied);
    }
}

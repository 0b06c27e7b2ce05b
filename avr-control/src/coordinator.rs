//! Zone routing and state reconciliation
//!
//! The coordinator owns every zone store. Inbound frames are routed by the
//! `Z<digit>` marker (no marker means the main zone); secondary-zone
//! shorthand replies are remapped to their canonical command form before
//! the store dispatches them. After every connect or power transition the
//! coordinator re-queries all auto-update features and runs a bounded
//! verification cycle to catch answers the receiver dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use avr_protocol::Frame;
use avr_state::{
    ChangeEvent, CommandBridge, FeatureTag, FeatureValue, Flag, ModelProfile, StatusTracker, Zone,
    ZoneStateStore,
};
use parking_lot::Mutex;

use crate::error::Result;
use crate::queue::CommandQueue;
use crate::supervisor::{sleep_cancellable, ConnectionEvents};
use crate::transport::ReceiveFrames;

/// Polling interval while waiting for the outbound queue to drain.
const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded attempt count for the queue-drain poll.
const DRAIN_ATTEMPTS: u32 = 50;

/// Quiescence delay before each verification pass.
const QUIESCENCE_DELAY: Duration = Duration::from_secs(1);

/// Verification passes per reconciliation. Deliberately bounded: a receiver
/// that answers slowly a third time stays undefined until the next
/// reconnect or manual query.
const CHECK_PASSES: u32 = 2;

/// Optional seed for selection vocabularies, fed by the HTTP side channel.
/// The TCP protocol stays authoritative for all values.
pub trait VocabularySeed: Send + Sync {
    /// Input source tokens the receiver is configured with.
    fn input_sources(&self) -> Vec<String>;
    /// User-assigned name for a zone, if any.
    fn zone_name(&self, zone: Zone) -> Option<String>;
}

struct Checker {
    cancel: Arc<AtomicBool>,
    _handle: JoinHandle<()>,
}

/// Owns all zone stores and the reconciliation lifecycle.
pub struct ReceiverCoordinator {
    bridge: Arc<CommandBridge>,
    status: Arc<StatusTracker>,
    stores: Arc<Mutex<Vec<ZoneStateStore>>>,
    queue: Mutex<Option<Arc<CommandQueue>>>,
    checker: Mutex<Option<Checker>>,
    zone_names: Mutex<Vec<(Zone, String)>>,
}

impl ReceiverCoordinator {
    pub fn new(
        profile: ModelProfile,
        bridge: Arc<CommandBridge>,
        status: Arc<StatusTracker>,
    ) -> Self {
        let stores = profile.build_stores(&bridge);
        Self {
            bridge,
            status,
            stores: Arc::new(Mutex::new(stores)),
            queue: Mutex::new(None),
            checker: Mutex::new(None),
            zone_names: Mutex::new(Vec::new()),
        }
    }

    /// Rebuild the zone stores for a different receiver model. Drops all
    /// state and listeners; callers re-register after reconfiguring.
    pub fn reconfigure(&self, profile: ModelProfile) {
        self.stop_checker();
        let mut stores = self.stores.lock();
        for store in stores.iter_mut() {
            store.clear_state_and_listener();
        }
        *stores = profile.build_stores(&self.bridge);
        self.zone_names.lock().clear();
    }

    /// Zones active under the current profile.
    pub fn zones(&self) -> Vec<Zone> {
        self.stores.lock().iter().map(|s| s.zone()).collect()
    }

    // ========================================================================
    // Inbound routing
    // ========================================================================

    /// Route one inbound frame to its zone and apply status-flag fallout.
    pub fn received(&self, mut frame: Frame) {
        let event = match Zone::from_marker(frame.active()) {
            Some(zone) => {
                frame.advance(2);
                let mut stores = self.stores.lock();
                let Some(store) = stores.iter_mut().find(|s| s.zone() == zone) else {
                    tracing::info!("frame for inactive {}: {:?}", zone.id(), frame);
                    return;
                };
                let mut canonical = remap_shorthand(store, frame);
                store.update(&mut canonical)
            }
            None => {
                let mut stores = self.stores.lock();
                stores[0].update(&mut frame)
            }
        };
        if let Some(event) = event {
            self.apply_status(&event);
        }
    }

    /// Status-flag side effects of a feature change. A main-zone power edge
    /// also triggers a fresh reconciliation.
    fn apply_status(&self, event: &ChangeEvent) {
        match (event.zone, event.tag) {
            (Zone::Main, FeatureTag::Power) => {
                if let Some(on) = event.value.as_switch() {
                    if self.status.set(Flag::Power, on) {
                        self.reconcile();
                    }
                }
            }
            (zone, FeatureTag::MainZone) => {
                if let Some(on) = event.value.as_switch() {
                    self.status.set(zone.status_flag(), on);
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Re-query every auto-update feature and start the verification cycle.
    pub fn reconcile(&self) {
        {
            let mut stores = self.stores.lock();
            for store in stores.iter_mut() {
                store.init_state(|_| true);
            }
        }
        self.start_checker();
    }

    fn start_checker(&self) {
        let mut slot = self.checker.lock();
        // at most one checker; the old one must be cancelled before the new
        // one starts so the cycles never overlap
        if let Some(previous) = slot.take() {
            previous.cancel.store(true, Ordering::Relaxed);
        }
        let cancel = Arc::new(AtomicBool::new(false));
        let stores = self.stores.clone();
        let queue = self.queue.lock().clone();
        let handle = {
            let cancel = cancel.clone();
            thread::Builder::new()
                .name("avr-checker".into())
                .spawn(move || run_check_cycle(stores, queue, cancel))
                .expect("spawn reconciliation checker")
        };
        *slot = Some(Checker {
            cancel,
            _handle: handle,
        });
    }

    fn stop_checker(&self) {
        if let Some(checker) = self.checker.lock().take() {
            checker.cancel.store(true, Ordering::Relaxed);
        }
    }

    // ========================================================================
    // Outbound API (GUI-facing)
    // ========================================================================

    fn with_store<R>(&self, zone: Zone, f: impl FnOnce(&mut ZoneStateStore) -> R) -> Result<R> {
        let mut stores = self.stores.lock();
        match stores.iter_mut().find(|s| s.zone() == zone) {
            Some(store) => Ok(f(store)),
            None => Err(avr_state::StateError::ZoneInactive(zone).into()),
        }
    }

    pub fn query(&self, zone: Zone, tag: FeatureTag) -> Result<()> {
        Ok(self.with_store(zone, |s| s.query(tag))??)
    }

    pub fn set_switch(&self, zone: Zone, tag: FeatureTag, on: bool) -> Result<()> {
        Ok(self.with_store(zone, |s| s.set_switch(tag, on))??)
    }

    pub fn switch(&self, zone: Zone, tag: FeatureTag) -> Result<()> {
        Ok(self.with_store(zone, |s| s.switch(tag))??)
    }

    pub fn select(&self, zone: Zone, tag: FeatureTag, token: &str) -> Result<()> {
        Ok(self.with_store(zone, |s| s.select(tag, token))??)
    }

    pub fn set_level(&self, zone: Zone, tag: FeatureTag, value: i32) -> Result<()> {
        Ok(self.with_store(zone, |s| s.set_level(tag, value))??)
    }

    pub fn set_channel_level(
        &self,
        zone: Zone,
        tag: FeatureTag,
        key: &str,
        value: i32,
    ) -> Result<()> {
        Ok(self.with_store(zone, |s| s.set_channel_level(tag, key, value))??)
    }

    pub fn set_volume(&self, zone: Zone, tag: FeatureTag, tenths: i32) -> Result<()> {
        Ok(self.with_store(zone, |s| s.set_volume(tag, tenths))??)
    }

    pub fn value(&self, zone: Zone, tag: FeatureTag) -> Result<FeatureValue> {
        Ok(self.with_store(zone, |s| s.value(tag))??)
    }

    pub fn is_defined(&self, zone: Zone, tag: FeatureTag) -> Result<bool> {
        Ok(self.with_store(zone, |s| s.is_defined(tag))??)
    }

    pub fn vocabulary(&self, zone: Zone, tag: FeatureTag) -> Result<Vec<String>> {
        Ok(self.with_store(zone, |s| s.vocabulary(tag))??)
    }

    pub fn register_listener(
        &self,
        zone: Zone,
        tag: FeatureTag,
        tx: Sender<ChangeEvent>,
    ) -> Result<()> {
        Ok(self.with_store(zone, |s| s.register_listener(tag, tx))??)
    }

    pub fn unregister_listener(&self, zone: Zone, tag: FeatureTag) -> Result<()> {
        self.with_store(zone, |s| s.unregister_listener(tag))
    }

    /// Send a raw command line, used for macro playback.
    pub fn send_raw(&self, line: &str) {
        self.bridge.send(line);
    }

    // ========================================================================
    // Side channel
    // ========================================================================

    /// Merge side-channel data into the selection vocabularies and zone
    /// names. Best-effort; an empty seed changes nothing.
    pub fn apply_vocabulary_seed(&self, seed: &dyn VocabularySeed) {
        let inputs = seed.input_sources();
        if !inputs.is_empty() {
            let mut stores = self.stores.lock();
            for store in stores.iter_mut() {
                let _ = store.seed_vocabulary(FeatureTag::InputSource, inputs.clone());
            }
        }
        let mut names = self.zone_names.lock();
        names.clear();
        for &zone in Zone::active(4) {
            if let Some(name) = seed.zone_name(zone) {
                names.push((zone, name));
            }
        }
    }

    /// Display label for a zone: the seeded name when one exists.
    pub fn zone_label(&self, zone: Zone) -> String {
        self.zone_names
            .lock()
            .iter()
            .find(|(z, _)| *z == zone)
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| zone.display_name().to_string())
    }
}

impl ReceiveFrames for ReceiverCoordinator {
    fn received(&self, frame: Frame) {
        ReceiverCoordinator::received(self, frame);
    }
}

impl ConnectionEvents for ReceiverCoordinator {
    fn connection_established(&self, queue: &Arc<CommandQueue>) {
        *self.queue.lock() = Some(queue.clone());
        self.reconcile();
    }

    fn connection_lost(&self) {
        self.stop_checker();
        self.queue.lock().take();
        let mut stores = self.stores.lock();
        for store in stores.iter_mut() {
            store.reset_state(|_| true);
        }
    }
}

/// Rewrite a secondary-zone shorthand reply into its canonical form.
///
/// Receivers answer zone-encoded commands with the bare value after the
/// zone marker (`Z250`, `Z2ON`, `Z2TUNER`). The priority order is fixed:
/// numeric, then ON/OFF/STANDBY, then `QUICK`-prefixed, then
/// `SOURCE`-prefixed, then a known input name, then the literal line.
fn remap_shorthand(store: &ZoneStateStore, frame: Frame) -> Frame {
    if frame.is_number() {
        return Frame::from(format!("MV{}", frame.text()).as_str());
    }
    let text = frame.text();
    let token = text.trim();
    match token {
        "ON" => return Frame::from("ZMON"),
        "OFF" | "STANDBY" => return Frame::from("ZMOFF"),
        _ => {}
    }
    if token.starts_with("QUICK") {
        return Frame::from(format!("MS{}", token).as_str());
    }
    if token.starts_with("SOURCE") {
        return Frame::from(format!("SI{}", token).as_str());
    }
    let known_input = store
        .vocabulary(FeatureTag::InputSource)
        .map(|vocab| vocab.iter().any(|t| t == token))
        .unwrap_or(false);
    if known_input {
        return Frame::from(format!("SI{}", token).as_str());
    }
    frame
}

fn run_check_cycle(
    stores: Arc<Mutex<Vec<ZoneStateStore>>>,
    queue: Option<Arc<CommandQueue>>,
    cancel: Arc<AtomicBool>,
) {
    for pass in 1..=CHECK_PASSES {
        if let Some(queue) = &queue {
            let mut attempts = 0;
            while !queue.is_empty() && attempts < DRAIN_ATTEMPTS {
                if !sleep_cancellable(DRAIN_INTERVAL, &cancel) {
                    return;
                }
                attempts += 1;
            }
        }
        if !sleep_cancellable(QUIESCENCE_DELAY, &cancel) {
            return;
        }
        let missing: usize = {
            let stores = stores.lock();
            stores.iter().map(|s| s.check_defined(|_| true)).sum()
        };
        tracing::debug!("verification pass {} re-queried {} features", pass, missing);
    }
}

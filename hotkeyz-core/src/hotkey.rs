//! Global hotkey registry, trigger queue and key-release watch.
//!
//! # Locking
//!
//! Two locks, always taken in this order:
//!
//! 1. `control` -- serializes every call that reaches the backend (listener
//!    start/stop, bind/unbind, key tracking).  Held across those calls.
//! 2. `Shared::table` -- the registration table, the trigger queue and the
//!    key-watch state.  Never held across a backend call.
//!
//! The listener thread only ever takes the table lock (through
//! [`TriggerSink`]), so a caller blocked on a bind reply while holding
//! `control` can never deadlock against it.  A registration is inserted into
//! the table before `register` returns, so the listener's next match sees it.
//!
//! # Waiting
//!
//! `wait_next_trigger` blocks on a condition variable; each trigger wakes one
//! waiter and is popped by exactly one caller.  A waiter is only released by
//! a trigger (or process exit); use the `_timeout` variants to bound a wait.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;

use crate::backend::HotkeyBackend;
use crate::errors::{HotkeyError, InputError, OsError};
use crate::keys::{HotkeyChord, Modifiers, VirtualKey};

/// Default depth of the trigger queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Process-unique hotkey id.  Issued from 1 upwards and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HotkeyId(u32);

impl HotkeyId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HotkeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct HotkeyRegistration {
    pub id: HotkeyId,
    pub chord: HotkeyChord,
    pub registered_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub hotkey_id: HotkeyId,
}

/// Lifecycle of the process-wide listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListenerPhase {
    /// Never started.
    Idle,
    Listening,
    /// Stopped after the last user went away; restarts on demand.
    Stopped,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct Table {
    by_chord: HashMap<HotkeyChord, HotkeyId>,
    by_id: HashMap<HotkeyId, HotkeyRegistration>,
    queue: VecDeque<TriggerEvent>,
    capacity: usize,
    overflow: u64,
    /// Physical keys currently held, exactly as reported by the listener
    /// while tracking (`LSHIFT`, never `SHIFT`).
    keys_down: HashSet<VirtualKey>,
    tracking: bool,
}

impl Table {
    fn is_held(&self, key: VirtualKey) -> bool {
        self.keys_down.iter().any(|down| key.covers(*down))
    }

    fn push(&mut self, event: TriggerEvent) {
        if self.queue.len() >= self.capacity {
            if let Some(dropped) = self.queue.pop_front() {
                self.overflow += 1;
                warn!(
                    "trigger queue full ({}), dropped trigger for hotkey {}",
                    self.capacity, dropped.hotkey_id
                );
            }
        }
        self.queue.push_back(event);
    }
}

struct Shared {
    table: Mutex<Table>,
    trigger_ready: Condvar,
    keys_changed: Condvar,
}

/// Handle through which the listener thread reports OS notifications.
///
/// Cheap to clone; every method takes the table lock briefly.
#[derive(Clone)]
pub struct TriggerSink {
    shared: Arc<Shared>,
}

impl TriggerSink {
    /// A registered chord's key combination was pressed.  Returns whether it
    /// matched an active registration (and was queued).
    pub fn hotkey_pressed(&self, modifiers: Modifiers, key: VirtualKey) -> bool {
        let chord = HotkeyChord::new(modifiers, key);
        let mut table = self.shared.table.lock();
        let Some(&hotkey_id) = table.by_chord.get(&chord) else {
            debug!("ignoring notification for unregistered chord {chord}");
            return false;
        };
        table.push(TriggerEvent { hotkey_id });
        drop(table);
        self.shared.trigger_ready.notify_one();
        true
    }

    pub fn key_pressed(&self, key: VirtualKey) {
        let mut table = self.shared.table.lock();
        if table.tracking {
            table.keys_down.insert(key);
        }
    }

    pub fn key_released(&self, key: VirtualKey) {
        let mut table = self.shared.table.lock();
        if table.tracking && table.keys_down.remove(&key) {
            drop(table);
            self.shared.keys_changed.notify_all();
        }
    }
}

impl fmt::Debug for TriggerSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerSink").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Control {
    phase: ListenerPhase,
    next_id: u32,
    key_watchers: usize,
}

/// Owner of all hotkey registrations and of the listener lifecycle.
pub struct HotkeyRegistry<B: HotkeyBackend + ?Sized> {
    backend: Arc<B>,
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl<B: HotkeyBackend + ?Sized> HotkeyRegistry<B> {
    /// `capacity` is the trigger queue depth (at least 1).
    pub fn new(backend: Arc<B>, capacity: usize) -> Self {
        Self {
            backend,
            shared: Arc::new(Shared {
                table: Mutex::new(Table {
                    by_chord: HashMap::new(),
                    by_id: HashMap::new(),
                    queue: VecDeque::with_capacity(capacity.max(1)),
                    capacity: capacity.max(1),
                    overflow: 0,
                    keys_down: HashSet::new(),
                    tracking: false,
                }),
                trigger_ready: Condvar::new(),
                keys_changed: Condvar::new(),
            }),
            control: Mutex::new(Control {
                phase: ListenerPhase::Idle,
                next_id: 1,
                key_watchers: 0,
            }),
        }
    }

    /// Sink handed to the backend when the listener starts.
    pub fn sink(&self) -> TriggerSink {
        TriggerSink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Register `chord` as a global hotkey.
    pub fn register(&self, chord: HotkeyChord) -> Result<HotkeyId, HotkeyError> {
        let mut control = self.control.lock();

        if self.shared.table.lock().by_chord.contains_key(&chord) {
            return Err(HotkeyError::AlreadyRegistered(chord));
        }

        self.ensure_listening(&mut control)
            .map_err(HotkeyError::OsRejected)?;

        let id = HotkeyId(control.next_id);
        control.next_id += 1;

        if let Err(source) = self.backend.bind(id, &chord) {
            warn!("OS rejected hotkey {chord}: {source}");
            self.stop_if_unused(&mut control);
            return Err(HotkeyError::OsRejected(source));
        }

        let registration = HotkeyRegistration {
            id,
            chord,
            registered_at: Instant::now(),
        };
        let mut table = self.shared.table.lock();
        table.by_chord.insert(chord, id);
        table.by_id.insert(id, registration);
        drop(table);

        debug!("registered hotkey {id} for {chord}");
        Ok(id)
    }

    /// Remove a registration.  Unknown or already removed ids are ignored.
    ///
    /// Triggers of `id` still waiting in the queue are discarded.
    pub fn unregister(&self, id: HotkeyId) {
        let mut control = self.control.lock();

        let removed = {
            let mut table = self.shared.table.lock();
            let removed = table.by_id.remove(&id);
            if let Some(registration) = &removed {
                table.by_chord.remove(&registration.chord);
                table.queue.retain(|event| event.hotkey_id != id);
            }
            removed
        };

        match removed {
            Some(registration) => {
                self.backend.unbind(id);
                debug!("unregistered hotkey {id} ({})", registration.chord);
                self.stop_if_unused(&mut control);
            }
            None => debug!("unregister of unknown hotkey {id} ignored"),
        }
    }

    /// Block until some registered hotkey fires and return its id.
    pub fn wait_next_trigger(&self) -> HotkeyId {
        let mut table = self.shared.table.lock();
        loop {
            if let Some(event) = table.queue.pop_front() {
                return event.hotkey_id;
            }
            self.shared.trigger_ready.wait(&mut table);
        }
    }

    /// Like [`wait_next_trigger`](Self::wait_next_trigger), giving up after
    /// `timeout`.
    pub fn wait_next_trigger_timeout(&self, timeout: Duration) -> Option<HotkeyId> {
        let deadline = Instant::now() + timeout;
        let mut table = self.shared.table.lock();
        loop {
            if let Some(event) = table.queue.pop_front() {
                return Some(event.hotkey_id);
            }
            if self
                .shared
                .trigger_ready
                .wait_until(&mut table, deadline)
                .timed_out()
            {
                return table.queue.pop_front().map(|event| event.hotkey_id);
            }
        }
    }

    /// Block until every key in `keys` is released.  A generic modifier
    /// (`SHIFT`) waits for both of its sides.
    pub fn wait_keys_up(&self, keys: &[VirtualKey]) -> Result<(), InputError> {
        self.wait_released(keys, None).map(|_| ())
    }

    /// Returns `Ok(false)` if some key was still held after `timeout`.
    pub fn wait_keys_up_timeout(
        &self,
        keys: &[VirtualKey],
        timeout: Duration,
    ) -> Result<bool, InputError> {
        self.wait_released(keys, Some(Instant::now() + timeout))
    }

    pub fn registration(&self, id: HotkeyId) -> Result<HotkeyRegistration, HotkeyError> {
        self.shared
            .table
            .lock()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(HotkeyError::UnknownId(id))
    }

    /// Snapshot of the active registrations, ordered by id.
    pub fn registrations(&self) -> Vec<HotkeyRegistration> {
        let mut registrations: Vec<_> = self.shared.table.lock().by_id.values().cloned().collect();
        registrations.sort_by_key(|r| r.id);
        registrations
    }

    /// Triggers dropped because the queue was full.
    pub fn overflow_count(&self) -> u64 {
        self.shared.table.lock().overflow
    }

    /// Triggers waiting for a consumer.
    pub fn pending_triggers(&self) -> usize {
        self.shared.table.lock().queue.len()
    }

    pub fn listener_phase(&self) -> ListenerPhase {
        self.control.lock().phase
    }

    // -- internals -----------------------------------------------------------

    fn ensure_listening(&self, control: &mut MutexGuard<'_, Control>) -> Result<(), OsError> {
        if control.phase != ListenerPhase::Listening {
            self.backend.start_listener(self.sink())?;
            debug!("hotkey listener started");
            control.phase = ListenerPhase::Listening;
        }
        Ok(())
    }

    fn stop_if_unused(&self, control: &mut MutexGuard<'_, Control>) {
        if control.phase != ListenerPhase::Listening || control.key_watchers > 0 {
            return;
        }
        if !self.shared.table.lock().by_id.is_empty() {
            return;
        }
        self.backend.stop_listener();
        control.phase = ListenerPhase::Stopped;
        debug!("hotkey listener stopped");
    }

    fn wait_released(
        &self,
        keys: &[VirtualKey],
        deadline: Option<Instant>,
    ) -> Result<bool, InputError> {
        let mut physical: Vec<VirtualKey> =
            keys.iter().flat_map(|k| k.physical_keys()).collect();
        physical.sort_unstable();
        physical.dedup();

        if physical.iter().all(|k| !self.backend.is_key_down(*k)) {
            return Ok(true);
        }

        self.acquire_key_watch()?;

        let released = {
            let mut table = self.shared.table.lock();
            // Seed after tracking is on: any release from here on is either
            // visible to is_key_down or queued behind this lock.
            for key in &physical {
                if self.backend.is_key_down(*key) {
                    table.keys_down.insert(*key);
                } else {
                    table.keys_down.remove(key);
                }
            }

            loop {
                if keys.iter().all(|k| !table.is_held(*k)) {
                    break true;
                }
                match deadline {
                    None => self.shared.keys_changed.wait(&mut table),
                    Some(deadline) => {
                        if self
                            .shared
                            .keys_changed
                            .wait_until(&mut table, deadline)
                            .timed_out()
                        {
                            break keys.iter().all(|k| !table.is_held(*k));
                        }
                    }
                }
            }
        };

        self.release_key_watch();
        Ok(released)
    }

    fn acquire_key_watch(&self) -> Result<(), InputError> {
        let mut control = self.control.lock();
        self.ensure_listening(&mut control)
            .map_err(InputError::WatchUnavailable)?;

        if control.key_watchers == 0 {
            if let Err(source) = self.backend.track_keys(true) {
                self.stop_if_unused(&mut control);
                return Err(InputError::WatchUnavailable(source));
            }
            self.shared.table.lock().tracking = true;
        }
        control.key_watchers += 1;
        Ok(())
    }

    fn release_key_watch(&self) {
        let mut control = self.control.lock();
        control.key_watchers = control.key_watchers.saturating_sub(1);
        if control.key_watchers > 0 {
            return;
        }

        {
            let mut table = self.shared.table.lock();
            table.tracking = false;
            table.keys_down.clear();
        }
        if let Err(err) = self.backend.track_keys(false) {
            warn!("failed to stop key tracking: {err}");
        }
        self.stop_if_unused(&mut control);
    }
}

impl<B: HotkeyBackend + ?Sized> Drop for HotkeyRegistry<B> {
    fn drop(&mut self) {
        let control = self.control.get_mut();
        if control.phase == ListenerPhase::Listening {
            self.backend.stop_listener();
            control.phase = ListenerPhase::Stopped;
        }
    }
}

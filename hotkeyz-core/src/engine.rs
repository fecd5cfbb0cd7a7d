//! Engine facade: one platform, one synthesizer, one hotkey registry and
//! one window locator, wired together.
//!
//! Text arguments are parsed with the platform's keyboard layout, so on
//! Windows `"@"` types whatever key produces `@` in the active locale.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::backend::Platform;
use crate::errors::{HotkeyzError, ParseError};
use crate::hotkey::{HotkeyId, HotkeyRegistry, DEFAULT_QUEUE_CAPACITY};
use crate::input::Synthesizer;
use crate::keys::{HotkeyChord, KeySequence};
use crate::parser;
use crate::platform::System;
use crate::window::WindowLocator;

/// Environment variable overriding [`EngineConfig::trigger_queue_capacity`].
pub const QUEUE_CAPACITY_ENV: &str = "HOTKEYZ_TRIGGER_QUEUE_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Triggers buffered for `wait_hotkey` before the oldest is dropped.
    pub trigger_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trigger_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `HOTKEYZ_TRIGGER_QUEUE_CAPACITY` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(QUEUE_CAPACITY_ENV) {
            match parse_capacity(&raw) {
                Some(capacity) => config.trigger_queue_capacity = capacity,
                None => warn!("ignoring {QUEUE_CAPACITY_ENV}={raw:?}: expected a positive integer"),
            }
        }
        config
    }
}

fn parse_capacity(raw: &str) -> Option<usize> {
    raw.trim().parse().ok().filter(|n| *n > 0)
}

pub struct Engine<P: Platform> {
    platform: Arc<P>,
    input: Synthesizer<P>,
    hotkeys: HotkeyRegistry<P>,
    windows: WindowLocator<P>,
}

impl Engine<System> {
    /// Engine on the current target's OS backend.
    pub fn system(config: &EngineConfig) -> Self {
        Self::new(Arc::new(System::new()), config)
    }
}

impl<P: Platform> Engine<P> {
    pub fn new(platform: Arc<P>, config: &EngineConfig) -> Self {
        debug!(
            "engine created (trigger queue capacity {})",
            config.trigger_queue_capacity
        );
        Self {
            input: Synthesizer::new(Arc::clone(&platform)),
            hotkeys: HotkeyRegistry::new(Arc::clone(&platform), config.trigger_queue_capacity),
            windows: WindowLocator::new(Arc::clone(&platform)),
            platform,
        }
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn input(&self) -> &Synthesizer<P> {
        &self.input
    }

    pub fn hotkeys(&self) -> &HotkeyRegistry<P> {
        &self.hotkeys
    }

    pub fn windows(&self) -> &WindowLocator<P> {
        &self.windows
    }

    pub fn parse_sequence(&self, text: &str) -> Result<KeySequence, ParseError> {
        parser::parse_sequence_with(text, self.platform.layout())
    }

    pub fn parse_chord(&self, text: &str) -> Result<HotkeyChord, ParseError> {
        parser::parse_chord_with(text, self.platform.layout())
    }

    /// Parse `text` and type it.  Nothing is sent if parsing fails.
    pub fn type_text(&self, text: &str) -> Result<(), HotkeyzError> {
        let seq = self.parse_sequence(text)?;
        self.input.type_sequence(&seq)?;
        Ok(())
    }

    /// Block until every key named in `text` (modifiers included) is up.
    pub fn wait_keys_up(&self, text: &str) -> Result<(), HotkeyzError> {
        let seq = self.parse_sequence(text)?;
        self.hotkeys.wait_keys_up(&seq.keys())?;
        Ok(())
    }

    /// Returns `Ok(false)` if some key was still held after `timeout`.
    pub fn wait_keys_up_timeout(&self, text: &str, timeout: Duration) -> Result<bool, HotkeyzError> {
        let seq = self.parse_sequence(text)?;
        Ok(self.hotkeys.wait_keys_up_timeout(&seq.keys(), timeout)?)
    }

    pub fn register_hotkey(&self, text: &str) -> Result<HotkeyId, HotkeyzError> {
        let chord = self.parse_chord(text)?;
        Ok(self.hotkeys.register(chord)?)
    }

    pub fn unregister_hotkey(&self, id: HotkeyId) {
        self.hotkeys.unregister(id);
    }

    pub fn wait_hotkey(&self) -> HotkeyId {
        self.hotkeys.wait_next_trigger()
    }

    pub fn wait_hotkey_timeout(&self, timeout: Duration) -> Option<HotkeyId> {
        self.hotkeys.wait_next_trigger_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::KeyEvent;
    use crate::errors::HotkeyError;
    use crate::keys::VirtualKey;
    use crate::testing::MockPlatform;
    use std::thread;

    fn engine() -> (Arc<MockPlatform>, Engine<MockPlatform>) {
        let platform = Arc::new(MockPlatform::default());
        let engine = Engine::new(Arc::clone(&platform), &EngineConfig::default());
        (platform, engine)
    }

    #[test]
    fn test_config_defaults_and_deserialize() {
        assert_eq!(
            EngineConfig::default().trigger_queue_capacity,
            DEFAULT_QUEUE_CAPACITY
        );
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        let config: EngineConfig =
            serde_json::from_str(r#"{"trigger_queue_capacity": 8}"#).unwrap();
        assert_eq!(config.trigger_queue_capacity, 8);
    }

    #[test]
    fn test_parse_capacity() {
        assert_eq!(parse_capacity(" 16 "), Some(16));
        assert_eq!(parse_capacity("0"), None);
        assert_eq!(parse_capacity("lots"), None);
    }

    #[test]
    fn test_parse_error_sends_nothing() {
        let (platform, engine) = engine();
        assert!(matches!(
            engine.type_text("ok<ctrl+"),
            Err(HotkeyzError::Parse(ParseError::MalformedChord(_)))
        ));
        assert!(platform.key_batches().is_empty());
    }

    #[test]
    fn test_type_text() {
        let (platform, engine) = engine();
        engine.type_text("<ctrl+a>x").unwrap();
        let batches = platform.key_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[1],
            vec![KeyEvent::down(VirtualKey(b'X')), KeyEvent::up(VirtualKey(b'X'))]
        );
    }

    #[test]
    fn test_hotkey_round_trip() {
        let (platform, engine) = engine();
        let id = engine.register_hotkey("<ctrl+y>").unwrap();
        assert!(matches!(
            engine.register_hotkey("<Y + Ctrl>"),
            Err(HotkeyzError::Hotkey(HotkeyError::AlreadyRegistered(_)))
        ));
        assert!(platform.simulate_hotkey(&engine.parse_chord("<ctrl+y>").unwrap()));
        assert_eq!(engine.wait_hotkey(), id);
        engine.unregister_hotkey(id);
        assert_eq!(engine.wait_hotkey_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_wait_keys_up_includes_modifiers() {
        let (platform, engine) = engine();
        let engine = Arc::new(engine);
        platform.hold_key(VirtualKey::RCONTROL);

        let waiter = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.wait_keys_up_timeout("<ctrl+y>", Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(50));
        platform.release_key(VirtualKey::RCONTROL);

        assert!(waiter.join().unwrap().unwrap());
    }
}

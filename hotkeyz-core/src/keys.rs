//! Key identities: virtual keys, modifier sets, tokens, sequences, chords.
//!
//! Virtual-key values are the Win32 `VK_*` codes.  They are plain data here;
//! only the platform backend ever hands them to the OS.

use std::fmt;

use serde::Serialize;

use crate::layout::UsLayout;

/// Win32 virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VirtualKey(pub u8);

impl VirtualKey {
    pub const BACK: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const RETURN: Self = Self(0x0D);
    pub const SHIFT: Self = Self(0x10);
    pub const CONTROL: Self = Self(0x11);
    pub const MENU: Self = Self(0x12);
    pub const ESCAPE: Self = Self(0x1B);
    pub const SPACE: Self = Self(0x20);
    pub const LWIN: Self = Self(0x5B);
    pub const RWIN: Self = Self(0x5C);
    pub const LSHIFT: Self = Self(0xA0);
    pub const RSHIFT: Self = Self(0xA1);
    pub const LCONTROL: Self = Self(0xA2);
    pub const RCONTROL: Self = Self(0xA3);
    pub const LMENU: Self = Self(0xA4);
    pub const RMENU: Self = Self(0xA5);

    pub const fn code(self) -> u8 {
        self.0
    }

    /// Collapse side-specific modifier keys onto their generic key.
    ///
    /// `RWIN` maps to `LWIN` because Win32 has no generic Windows key.
    pub const fn generic(self) -> Self {
        match self {
            Self::LSHIFT | Self::RSHIFT => Self::SHIFT,
            Self::LCONTROL | Self::RCONTROL => Self::CONTROL,
            Self::LMENU | Self::RMENU => Self::MENU,
            Self::RWIN => Self::LWIN,
            other => other,
        }
    }

    /// Whether `physical`, as reported by the OS, counts as this key being
    /// held.  A generic modifier is held while either of its sides is.
    pub fn covers(self, physical: VirtualKey) -> bool {
        physical == self || physical.generic() == self
    }

    /// Keys whose state decides whether this key is held: both sides of a
    /// generic modifier (and of the Windows key), otherwise the key itself.
    pub fn physical_keys(self) -> impl Iterator<Item = VirtualKey> {
        let sides = match self {
            Self::SHIFT => Some([Self::LSHIFT, Self::RSHIFT]),
            Self::CONTROL => Some([Self::LCONTROL, Self::RCONTROL]),
            Self::MENU => Some([Self::LMENU, Self::RMENU]),
            Self::LWIN => Some([Self::LWIN, Self::RWIN]),
            _ => None,
        };
        let single = if sides.is_none() { Some(self) } else { None };
        sides.into_iter().flatten().chain(single)
    }

    /// Canonical name from the key-name table, if the key has one.
    pub fn name(self) -> Option<&'static str> {
        KEY_NAMES
            .iter()
            .find(|(_, code)| *code == self.0)
            .map(|(name, _)| *name)
    }

    /// Look up a lowercase key name (`"enter"`, `"f5"`, `"numpad0"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        KEY_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, code)| Self(*code))
    }

    /// Text label used by `Display`: table name, US character, or `0xNN`.
    fn label(self) -> String {
        if let Some(name) = self.name() {
            return name.to_owned();
        }
        match UsLayout::char_for_key(self, false) {
            Some(ch) => ch.to_ascii_lowercase().to_string(),
            None => format!("0x{:02x}", self.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// One modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Meta,
}

impl Modifier {
    /// Canonical order used when pressing and displaying modifiers.
    pub const ALL: [Modifier; 4] = [Modifier::Ctrl, Modifier::Alt, Modifier::Shift, Modifier::Meta];

    /// Parse a lowercase modifier name.  Side-specific names are accepted
    /// and collapse onto the generic modifier.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ctrl" | "control" | "lctrl" | "rctrl" => Some(Self::Ctrl),
            "alt" | "menu" | "lalt" | "ralt" => Some(Self::Alt),
            "shift" | "lshift" | "rshift" => Some(Self::Shift),
            "win" | "lwin" | "rwin" | "meta" | "super" | "cmd" => Some(Self::Meta),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
            Self::Meta => "win",
        }
    }

    /// Virtual key pressed to apply this modifier.
    pub const fn key(self) -> VirtualKey {
        match self {
            Self::Ctrl => VirtualKey::CONTROL,
            Self::Alt => VirtualKey::MENU,
            Self::Shift => VirtualKey::SHIFT,
            Self::Meta => VirtualKey::LWIN,
        }
    }

    /// Bit value, identical to the Win32 `MOD_*` flags.
    const fn bit(self) -> u8 {
        match self {
            Self::Alt => 0x1,
            Self::Ctrl => 0x2,
            Self::Shift => 0x4,
            Self::Meta => 0x8,
        }
    }
}

/// Set of modifiers.  Stored as `MOD_*` bits, so equality and hashing do not
/// depend on the order the modifiers were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Self = Self(0);

    /// Build from Win32 `MOD_*` bits; unknown bits (e.g. `MOD_NOREPEAT`)
    /// are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        Self((bits & 0xF) as u8)
    }

    pub const fn bits(self) -> u32 {
        self.0 as u32
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    /// Add `modifier`; returns `false` if it was already present.
    pub fn insert(&mut self, modifier: Modifier) -> bool {
        let present = self.contains(modifier);
        self.0 |= modifier.bit();
        !present
    }

    pub const fn with(self, modifier: Modifier) -> Self {
        Self(self.0 | modifier.bit())
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Modifiers in canonical order (ctrl, alt, shift, win).
    pub fn iter(self) -> impl DoubleEndedIterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

// ---------------------------------------------------------------------------
// Tokens, sequences, chords
// ---------------------------------------------------------------------------

/// One base key plus the modifiers held while it is tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyToken {
    pub key: VirtualKey,
    pub modifiers: Modifiers,
}

impl KeyToken {
    pub const fn new(key: VirtualKey) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub const fn with_modifiers(key: VirtualKey, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    fn fmt_group(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for modifier in self.modifiers.iter() {
            write!(f, "{}+", modifier.name())?;
        }
        write!(f, "{}>", group_label(self.key, !self.modifiers.is_empty()))
    }
}

/// Label of `key` inside a `<...>` group.  `-` is a group separator, and
/// next to modifiers a modifier name would be read as one more modifier, so
/// those are spelled out.
fn group_label(key: VirtualKey, with_modifiers: bool) -> String {
    let label = key.label();
    if label == "-" {
        "minus".to_owned()
    } else if with_modifiers && Modifier::from_name(&label).is_some() {
        format!("0x{:02x}", key.0)
    } else {
        label
    }
}

impl fmt::Display for KeyToken {
    /// Shortest text that parses back to this token: a bare character when
    /// the US layout produces it, otherwise a `<mods+key>` group.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bare = if self.modifiers.is_empty() {
            UsLayout::char_for_key(self.key, false)
        } else if self.modifiers == Modifiers::NONE.with(Modifier::Shift) {
            UsLayout::char_for_key(self.key, true)
        } else {
            None
        };

        match bare {
            Some('<') => f.write_str("<lt>"),
            Some(ch) => write!(f, "{ch}"),
            None => self.fmt_group(f),
        }
    }
}

/// One step of a key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyStep {
    /// Press and release a key with its modifiers held around it.
    Tap(KeyToken),
    /// Press a key and leave it down (`<win+>`).
    Press(VirtualKey),
    /// Release a key pressed earlier (`<win->`).
    Release(VirtualKey),
}

impl KeyStep {
    /// Keys this step presses or releases, modifier keys included.
    fn keys(&self) -> impl Iterator<Item = VirtualKey> {
        let (key, modifiers) = match *self {
            Self::Tap(token) => (token.key, token.modifiers),
            Self::Press(key) | Self::Release(key) => (key, Modifiers::NONE),
        };
        modifiers
            .iter()
            .map(Modifier::key)
            .chain(std::iter::once(key.generic()))
    }
}

impl From<KeyToken> for KeyStep {
    fn from(token: KeyToken) -> Self {
        Self::Tap(token)
    }
}

impl fmt::Display for KeyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tap(token) => token.fmt(f),
            Self::Press(key) => write!(f, "<{}+>", group_label(*key, false)),
            Self::Release(key) => write!(f, "<{}->", group_label(*key, false)),
        }
    }
}

/// Non-empty, ordered list of steps to synthesize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySequence(Vec<KeyStep>);

impl KeySequence {
    /// Returns `None` for an empty step list.
    pub fn new(steps: Vec<KeyStep>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self(steps))
        }
    }

    pub fn steps(&self) -> &[KeyStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyStep> {
        self.0.iter()
    }

    /// Every distinct key the sequence touches, base keys and modifier keys
    /// alike, normalized with [`VirtualKey::generic`].
    pub fn keys(&self) -> Vec<VirtualKey> {
        let mut keys: Vec<VirtualKey> = self.0.iter().flat_map(KeyStep::keys).collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

impl<'a> IntoIterator for &'a KeySequence {
    type Item = &'a KeyStep;
    type IntoIter = std::slice::Iter<'a, KeyStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|step| write!(f, "{step}"))
    }
}

/// Trigger combination for a global hotkey: a modifier set and one base key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyChord(KeyToken);

impl HotkeyChord {
    pub const fn new(modifiers: Modifiers, key: VirtualKey) -> Self {
        Self(KeyToken::with_modifiers(key.generic(), modifiers))
    }

    pub const fn key(&self) -> VirtualKey {
        self.0.key
    }

    pub const fn modifiers(&self) -> Modifiers {
        self.0.modifiers
    }

    pub const fn token(&self) -> KeyToken {
        self.0
    }
}

impl From<KeyToken> for HotkeyChord {
    fn from(token: KeyToken) -> Self {
        Self::new(token.modifiers, token.key)
    }
}

impl fmt::Display for HotkeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_group(f)
    }
}

// ---------------------------------------------------------------------------
// Key-name table
// ---------------------------------------------------------------------------

/// Lowercase key names.  When several names share a code, the first one is
/// the canonical name used for display.
const KEY_NAMES: &[(&str, u8)] = &[
    ("backspace", 0x08),
    ("bs", 0x08),
    ("tab", 0x09),
    ("clear", 0x0C),
    ("enter", 0x0D),
    ("return", 0x0D),
    ("shift", 0x10),
    ("ctrl", 0x11),
    ("alt", 0x12),
    ("pause", 0x13),
    ("caps", 0x14),
    ("capslock", 0x14),
    ("kana", 0x15),
    ("hangul", 0x15),
    ("ime_on", 0x16),
    ("junja", 0x17),
    ("final", 0x18),
    ("hanja", 0x19),
    ("kanji", 0x19),
    ("ime_off", 0x1A),
    ("esc", 0x1B),
    ("escape", 0x1B),
    ("convert", 0x1C),
    ("nonconvert", 0x1D),
    ("accept", 0x1E),
    ("modechange", 0x1F),
    ("space", 0x20),
    ("pageup", 0x21),
    ("pagedown", 0x22),
    ("end", 0x23),
    ("home", 0x24),
    ("left", 0x25),
    ("up", 0x26),
    ("right", 0x27),
    ("down", 0x28),
    ("select", 0x29),
    ("print", 0x2A),
    ("execute", 0x2B),
    ("printscreen", 0x2C),
    ("ps", 0x2C),
    ("insert", 0x2D),
    ("ins", 0x2D),
    ("delete", 0x2E),
    ("del", 0x2E),
    ("help", 0x2F),
    ("win", 0x5B),
    ("lwin", 0x5B),
    ("rwin", 0x5C),
    ("apps", 0x5D),
    ("sleep", 0x5F),
    ("numpad0", 0x60),
    ("numpad1", 0x61),
    ("numpad2", 0x62),
    ("numpad3", 0x63),
    ("numpad4", 0x64),
    ("numpad5", 0x65),
    ("numpad6", 0x66),
    ("numpad7", 0x67),
    ("numpad8", 0x68),
    ("numpad9", 0x69),
    ("multiply", 0x6A),
    ("add", 0x6B),
    ("separator", 0x6C),
    ("subtract", 0x6D),
    ("decimal", 0x6E),
    ("divide", 0x6F),
    ("f1", 0x70),
    ("f2", 0x71),
    ("f3", 0x72),
    ("f4", 0x73),
    ("f5", 0x74),
    ("f6", 0x75),
    ("f7", 0x76),
    ("f8", 0x77),
    ("f9", 0x78),
    ("f10", 0x79),
    ("f11", 0x7A),
    ("f12", 0x7B),
    ("f13", 0x7C),
    ("f14", 0x7D),
    ("f15", 0x7E),
    ("f16", 0x7F),
    ("f17", 0x80),
    ("f18", 0x81),
    ("f19", 0x82),
    ("f20", 0x83),
    ("f21", 0x84),
    ("f22", 0x85),
    ("f23", 0x86),
    ("f24", 0x87),
    ("numlock", 0x90),
    ("scroll", 0x91),
    ("lshift", 0xA0),
    ("rshift", 0xA1),
    ("lctrl", 0xA2),
    ("rctrl", 0xA3),
    ("lalt", 0xA4),
    ("ralt", 0xA5),
    ("browser_back", 0xA6),
    ("browser_forward", 0xA7),
    ("browser_refresh", 0xA8),
    ("browser_stop", 0xA9),
    ("browser_search", 0xAA),
    ("browser_favorites", 0xAB),
    ("browser_home", 0xAC),
    ("volume_mute", 0xAD),
    ("volume_down", 0xAE),
    ("volume_up", 0xAF),
    ("media_next_track", 0xB0),
    ("media_prev_track", 0xB1),
    ("media_stop", 0xB2),
    ("media_play_pause", 0xB3),
    ("launch_mail", 0xB4),
    ("launch_media_select", 0xB5),
    ("launch_app1", 0xB6),
    ("launch_app2", 0xB7),
    ("attn", 0xF6),
    ("crsel", 0xF7),
    ("exsel", 0xF8),
    ("ereof", 0xF9),
    ("play", 0xFA),
    ("zoom", 0xFB),
    ("pa1", 0xFD),
    ("oem_clear", 0xFE),
];

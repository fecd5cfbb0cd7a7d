//! Character-to-key mapping.
//!
//! The parser never asks the OS which key produces a character; it asks a
//! [`KeyboardLayout`].  [`UsLayout`] is a fixed table and is what parsing
//! uses by default.  The Win32 backend supplies a layout backed by
//! `VkKeyScanW`, which follows the active input locale.

use crate::keys::{KeyToken, Modifier, Modifiers, VirtualKey};

pub trait KeyboardLayout: Send + Sync {
    /// Key (plus any implied modifiers, usually shift) that types `ch`.
    fn token_for_char(&self, ch: char) -> Option<KeyToken>;
}

/// US QWERTY layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsLayout;

/// OEM punctuation keys: (vk, unshifted, shifted).
const OEM_KEYS: &[(u8, char, char)] = &[
    (0xBA, ';', ':'),
    (0xBB, '=', '+'),
    (0xBC, ',', '<'),
    (0xBD, '-', '_'),
    (0xBE, '.', '>'),
    (0xBF, '/', '?'),
    (0xC0, '`', '~'),
    (0xDB, '[', '{'),
    (0xDC, '\\', '|'),
    (0xDD, ']', '}'),
    (0xDE, '\'', '"'),
];

/// Characters on the digit row with shift held, indexed by digit.
const SHIFTED_DIGITS: [char; 10] = [')', '!', '@', '#', '$', '%', '^', '&', '*', '('];

impl UsLayout {
    /// `(key, shift)` producing `ch`.
    pub fn key_for_char(ch: char) -> Option<(VirtualKey, bool)> {
        match ch {
            'a'..='z' => Some((VirtualKey(ch.to_ascii_uppercase() as u8), false)),
            'A'..='Z' => Some((VirtualKey(ch as u8), true)),
            '0'..='9' => Some((VirtualKey(ch as u8), false)),
            ' ' => Some((VirtualKey::SPACE, false)),
            '\n' | '\r' => Some((VirtualKey::RETURN, false)),
            '\t' => Some((VirtualKey::TAB, false)),
            _ => {
                if let Some(digit) = SHIFTED_DIGITS.iter().position(|c| *c == ch) {
                    return Some((VirtualKey(b'0' + digit as u8), true));
                }
                OEM_KEYS.iter().find_map(|&(vk, plain, shifted)| {
                    if ch == plain {
                        Some((VirtualKey(vk), false))
                    } else if ch == shifted {
                        Some((VirtualKey(vk), true))
                    } else {
                        None
                    }
                })
            }
        }
    }

    /// Printable ASCII character typed by `key` (with or without shift).
    pub fn char_for_key(key: VirtualKey, shift: bool) -> Option<char> {
        let code = key.code();
        match code {
            b'A'..=b'Z' => Some(if shift {
                code as char
            } else {
                code.to_ascii_lowercase() as char
            }),
            b'0'..=b'9' => Some(if shift {
                SHIFTED_DIGITS[(code - b'0') as usize]
            } else {
                code as char
            }),
            0x20 if !shift => Some(' '),
            _ => OEM_KEYS
                .iter()
                .find(|(vk, _, _)| *vk == code)
                .map(|&(_, plain, shifted)| if shift { shifted } else { plain }),
        }
    }
}

impl KeyboardLayout for UsLayout {
    fn token_for_char(&self, ch: char) -> Option<KeyToken> {
        Self::key_for_char(ch).map(|(key, shift)| {
            let modifiers = if shift {
                Modifiers::NONE.with(Modifier::Shift)
            } else {
                Modifiers::NONE
            };
            KeyToken::with_modifiers(key, modifiers)
        })
    }
}

//! Key-spec mini-language.
//!
//! ```text
//! sequence := ( char | group | hold )+
//! group    := '<' part ( '+' part )* '>'
//! hold     := '<' ( part ( '+' | '-' ) )+ '>'
//! part     := modifier | key-name | escape | single-char | 0xNN
//! ```
//!
//! Plain characters become one tap each through a [`KeyboardLayout`].
//! A group is one tap: every modifier part is collected into the
//! modifier set, and exactly one part must name the base key.  Parts are
//! trimmed and matched case-insensitively, so `<Ctrl + Y>` == `<y+ctrl>`.
//!
//! A group whose every part is followed by a separator is a hold group:
//! `+` presses the key and leaves it down, `-` releases it, so
//! `<alt+><tab><tab><alt->` cycles two windows.  Keys still held when the
//! sequence ends stay down.  Hold groups exist only in sequences.
//!
//! Escapes `lt`, `gt`, `plus` and `minus` stand for `< > + -`.  Inside a
//! sequence, a group holding a single modifier name (`<win>`) taps that
//! modifier key; in a hotkey chord that is an error.
//!
//! Parsing is pure: no OS calls happen here.

use crate::errors::ParseError;
use crate::keys::{HotkeyChord, KeySequence, KeyStep, KeyToken, Modifier, Modifiers, VirtualKey};
use crate::layout::{KeyboardLayout, UsLayout};

const GROUP_OPEN: char = '<';
const GROUP_CLOSE: char = '>';
const PART_SEPARATOR: char = '+';
const RELEASE_MARK: char = '-';

const ESCAPES: &[(&str, char)] = &[("lt", '<'), ("gt", '>'), ("plus", '+'), ("minus", '-')];

/// Parse text to type, using the US layout.
pub fn parse_sequence(text: &str) -> Result<KeySequence, ParseError> {
    parse_sequence_with(text, &UsLayout)
}

/// Parse a `<mod+key>` hotkey chord, using the US layout.
pub fn parse_chord(text: &str) -> Result<HotkeyChord, ParseError> {
    parse_chord_with(text, &UsLayout)
}

pub fn parse_sequence_with(
    text: &str,
    layout: &dyn KeyboardLayout,
) -> Result<KeySequence, ParseError> {
    let mut steps = Vec::with_capacity(text.len());
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if ch == GROUP_OPEN {
            let close = rest.find(GROUP_CLOSE).ok_or_else(|| {
                ParseError::MalformedChord(format!("missing `>` after `{rest}`"))
            })?;
            let body = &rest[1..close];
            if is_hold_group(body) {
                steps.extend(parse_hold_group(body, layout)?);
            } else {
                steps.push(KeyStep::Tap(parse_group(body, layout, true)?));
            }
            rest = &rest[close + 1..];
            continue;
        }

        rest = &rest[ch.len_utf8()..];
        // "\r\n" types a single Enter.
        if ch == '\r' && rest.starts_with('\n') {
            continue;
        }
        let token = layout
            .token_for_char(ch)
            .ok_or_else(|| ParseError::UnknownToken(ch.to_string()))?;
        steps.push(KeyStep::Tap(token));
    }

    KeySequence::new(steps).ok_or(ParseError::Empty)
}

pub fn parse_chord_with(
    text: &str,
    layout: &dyn KeyboardLayout,
) -> Result<HotkeyChord, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let body = text
        .strip_prefix(GROUP_OPEN)
        .and_then(|t| t.strip_suffix(GROUP_CLOSE))
        .ok_or_else(|| {
            ParseError::MalformedChord(format!("`{text}` is not of the form <mod+key>"))
        })?;
    if body.contains(GROUP_OPEN) || body.contains(GROUP_CLOSE) {
        return Err(ParseError::MalformedChord(format!(
            "`{text}` contains more than one group"
        )));
    }

    parse_group(body, layout, false).map(HotkeyChord::from)
}

/// Parse the inside of one `<...>` group into a token.
fn parse_group(
    body: &str,
    layout: &dyn KeyboardLayout,
    allow_lone_modifier: bool,
) -> Result<KeyToken, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::MalformedChord("empty key group `<>`".into()));
    }

    let parts: Vec<String> = body
        .split(PART_SEPARATOR)
        .map(|part| part.trim().to_lowercase())
        .collect();
    let lone = parts.len() == 1;

    let mut modifiers = Modifiers::NONE;
    let mut base: Option<KeyToken> = None;

    for part in &parts {
        if part.is_empty() {
            return Err(ParseError::MalformedChord(format!(
                "empty key name in `<{body}>`"
            )));
        }

        if let Some(modifier) = Modifier::from_name(part) {
            if lone && allow_lone_modifier {
                let key = VirtualKey::from_name(part).unwrap_or(modifier.key());
                return Ok(KeyToken::new(key));
            }
            if !modifiers.insert(modifier) {
                return Err(ParseError::MalformedChord(format!(
                    "modifier `{part}` repeated in `<{body}>`"
                )));
            }
            continue;
        }

        let token = resolve_key(part, layout)?;
        if base.replace(token).is_some() {
            return Err(ParseError::MalformedChord(format!(
                "more than one base key in `<{body}>`"
            )));
        }
    }

    let base = base.ok_or_else(|| {
        ParseError::MalformedChord(format!("no base key in `<{body}>`"))
    })?;
    Ok(KeyToken::with_modifiers(
        base.key,
        modifiers.union(base.modifiers),
    ))
}

/// `<->` and `<+>` name a single character; anything longer ending in a
/// separator holds or releases keys.
fn is_hold_group(body: &str) -> bool {
    let body = body.trim();
    body.len() > 1 && body.ends_with([PART_SEPARATOR, RELEASE_MARK])
}

fn parse_hold_group(body: &str, layout: &dyn KeyboardLayout) -> Result<Vec<KeyStep>, ParseError> {
    let mut steps = Vec::new();
    let mut rest = body.trim();

    while let Some(at) = rest.find([PART_SEPARATOR, RELEASE_MARK]) {
        let part = rest[..at].trim().to_lowercase();
        if part.is_empty() {
            return Err(ParseError::MalformedChord(format!(
                "empty key name in `<{body}>`"
            )));
        }
        let key = resolve_held_key(&part, layout)?;
        steps.push(if rest[at..].starts_with(PART_SEPARATOR) {
            KeyStep::Press(key)
        } else {
            KeyStep::Release(key)
        });
        rest = &rest[at + 1..];
    }

    Ok(steps)
}

/// Key pressed or released by a hold group.  Modifiers a character would
/// need (the shift of `!`) are not applied.
fn resolve_held_key(part: &str, layout: &dyn KeyboardLayout) -> Result<VirtualKey, ParseError> {
    if let Some(key) = VirtualKey::from_name(part) {
        return Ok(key);
    }
    if let Some(modifier) = Modifier::from_name(part) {
        return Ok(modifier.key());
    }
    resolve_key(part, layout).map(|token| token.key)
}

/// Resolve one lowercase, non-modifier part to a key.
fn resolve_key(part: &str, layout: &dyn KeyboardLayout) -> Result<KeyToken, ParseError> {
    if let Some(key) = VirtualKey::from_name(part) {
        return Ok(KeyToken::new(key));
    }

    let unknown = || ParseError::UnknownToken(part.to_owned());

    if let Some(&(_, ch)) = ESCAPES.iter().find(|(name, _)| *name == part) {
        return layout.token_for_char(ch).ok_or_else(unknown);
    }

    if let Some(hex) = part.strip_prefix("0x") {
        return match u8::from_str_radix(hex, 16) {
            Ok(code) if code != 0 => Ok(KeyToken::new(VirtualKey(code))),
            _ => Err(unknown()),
        };
    }

    let mut chars = part.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => layout.token_for_char(ch).ok_or_else(unknown),
        _ => Err(unknown()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift() -> Modifiers {
        Modifiers::NONE.with(Modifier::Shift)
    }

    fn ctrl() -> Modifiers {
        Modifiers::NONE.with(Modifier::Ctrl)
    }

    fn tap(token: KeyToken) -> KeyStep {
        KeyStep::Tap(token)
    }

    #[test]
    fn test_chord_ctrl_y() {
        let chord = parse_chord("<ctrl+y>").unwrap();
        assert_eq!(chord.modifiers(), ctrl());
        assert_eq!(chord.key(), VirtualKey(b'Y'));
    }

    #[test]
    fn test_chord_is_order_and_case_insensitive() {
        let a = parse_chord("<ctrl+y>").unwrap();
        assert_eq!(parse_chord("<y+ctrl>").unwrap(), a);
        assert_eq!(parse_chord("  <CTRL + Y>  ").unwrap(), a);
        assert_eq!(parse_chord("<lctrl+y>").unwrap(), a);
    }

    #[test]
    fn test_chord_empty() {
        assert_eq!(parse_chord(""), Err(ParseError::Empty));
        assert_eq!(parse_chord("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_chord_trailing_separator_is_malformed() {
        assert!(matches!(
            parse_chord("<ctrl+>"),
            Err(ParseError::MalformedChord(_))
        ));
    }

    #[test]
    fn test_chord_base_key_count() {
        assert!(matches!(
            parse_chord("<ctrl+shift>"),
            Err(ParseError::MalformedChord(_))
        ));
        assert!(matches!(
            parse_chord("<ctrl+a+b>"),
            Err(ParseError::MalformedChord(_))
        ));
        assert!(matches!(parse_chord("<>"), Err(ParseError::MalformedChord(_))));
    }

    #[test]
    fn test_chord_lone_modifier_is_malformed() {
        assert!(matches!(
            parse_chord("<ctrl>"),
            Err(ParseError::MalformedChord(_))
        ));
    }

    #[test]
    fn test_chord_duplicate_modifier() {
        assert!(matches!(
            parse_chord("<ctrl+lctrl+y>"),
            Err(ParseError::MalformedChord(_))
        ));
    }

    #[test]
    fn test_chord_requires_brackets() {
        assert!(matches!(
            parse_chord("ctrl+y"),
            Err(ParseError::MalformedChord(_))
        ));
        assert!(matches!(
            parse_chord("<ctrl+y><alt+x>"),
            Err(ParseError::MalformedChord(_))
        ));
    }

    #[test]
    fn test_chord_unknown_names() {
        assert_eq!(
            parse_chord("<hyper+y>"),
            Err(ParseError::UnknownToken("hyper".into()))
        );
        assert_eq!(
            parse_chord("<ctrl+banana>"),
            Err(ParseError::UnknownToken("banana".into()))
        );
    }

    #[test]
    fn test_chord_shifted_char_implies_shift() {
        let chord = parse_chord("<ctrl+!>").unwrap();
        assert_eq!(chord.modifiers(), ctrl().union(shift()));
        assert_eq!(chord.key(), VirtualKey(b'1'));
    }

    #[test]
    fn test_chord_named_and_hex_keys() {
        assert_eq!(parse_chord("<alt+f4>").unwrap().key(), VirtualKey(0x73));
        assert_eq!(parse_chord("<win+0x44>").unwrap().key(), VirtualKey(0x44));
        assert_eq!(
            parse_chord("<ctrl+0x00>"),
            Err(ParseError::UnknownToken("0x00".into()))
        );
    }

    #[test]
    fn test_sequence_plain_text() {
        let seq = parse_sequence("aBc").unwrap();
        assert_eq!(
            seq.steps(),
            [
                tap(KeyToken::new(VirtualKey(b'A'))),
                tap(KeyToken::with_modifiers(VirtualKey(b'B'), shift())),
                tap(KeyToken::new(VirtualKey(b'C'))),
            ]
        );
    }

    #[test]
    fn test_sequence_mixes_groups_and_text() {
        let seq = parse_sequence("<ctrl+a>hi<enter>").unwrap();
        let steps = seq.steps();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], tap(KeyToken::with_modifiers(VirtualKey(b'A'), ctrl())));
        assert_eq!(steps[3], tap(KeyToken::new(VirtualKey::RETURN)));
    }

    #[test]
    fn test_sequence_escapes_and_lone_modifier() {
        let seq = parse_sequence("<lt><win><minus>").unwrap();
        assert_eq!(
            seq.steps(),
            [
                tap(KeyToken::with_modifiers(VirtualKey(0xBC), shift())),
                tap(KeyToken::new(VirtualKey::LWIN)),
                tap(KeyToken::new(VirtualKey(0xBD))),
            ]
        );
    }

    #[test]
    fn test_sequence_crlf_is_one_enter() {
        let seq = parse_sequence("a\r\nb").unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.steps()[1], tap(KeyToken::new(VirtualKey::RETURN)));
    }

    #[test]
    fn test_sequence_errors() {
        assert_eq!(parse_sequence(""), Err(ParseError::Empty));
        assert_eq!(parse_sequence("é"), Err(ParseError::UnknownToken("é".into())));
        assert!(matches!(
            parse_sequence("abc<ctrl+c"),
            Err(ParseError::MalformedChord(_))
        ));
        assert!(matches!(
            parse_sequence("<ctrl++>"),
            Err(ParseError::MalformedChord(_))
        ));
    }

    #[test]
    fn test_sequence_hold_and_release() {
        let seq = parse_sequence("<win+>23<win->").unwrap();
        assert_eq!(
            seq.steps(),
            [
                KeyStep::Press(VirtualKey::LWIN),
                tap(KeyToken::new(VirtualKey(b'2'))),
                tap(KeyToken::new(VirtualKey(b'3'))),
                KeyStep::Release(VirtualKey::LWIN),
            ]
        );
    }

    #[test]
    fn test_hold_group_with_several_keys() {
        let seq = parse_sequence("<ctrl+shift+><shift-ctrl->").unwrap();
        assert_eq!(
            seq.steps(),
            [
                KeyStep::Press(VirtualKey::CONTROL),
                KeyStep::Press(VirtualKey::SHIFT),
                KeyStep::Release(VirtualKey::SHIFT),
                KeyStep::Release(VirtualKey::CONTROL),
            ]
        );
        // Shift implied by `!` is not held.
        let seq = parse_sequence("<! + >").unwrap();
        assert_eq!(seq.steps(), [KeyStep::Press(VirtualKey(b'1'))]);
    }

    #[test]
    fn test_single_separator_groups_are_characters() {
        let seq = parse_sequence("<->").unwrap();
        assert_eq!(seq.steps(), [tap(KeyToken::new(VirtualKey(0xBD)))]);
        assert_eq!(
            parse_sequence("<ctrl+->"),
            Err(ParseError::MalformedChord("empty key name in `<ctrl+->`".into()))
        );
    }

    #[test]
    fn test_hold_group_unknown_key() {
        assert_eq!(
            parse_sequence("<hyper+>"),
            Err(ParseError::UnknownToken("hyper".into()))
        );
    }

    #[test]
    fn test_chord_rejects_hold_group() {
        assert!(matches!(
            parse_chord("<alt+>"),
            Err(ParseError::MalformedChord(_))
        ));
    }

    #[test]
    fn test_stray_close_is_a_character() {
        let seq = parse_sequence("a>b").unwrap();
        assert_eq!(
            seq.steps()[1],
            tap(KeyToken::with_modifiers(VirtualKey(0xBE), shift()))
        );
    }

    #[test]
    fn test_round_trip_printable_ascii() {
        let text: String = (0x20u8..0x7F).map(char::from).collect();
        let seq = parse_sequence(&text).unwrap();
        let reparsed = parse_sequence(&seq.to_string()).unwrap();
        assert_eq!(reparsed, seq);
    }

    #[test]
    fn test_round_trip_groups() {
        for text in [
            "<ctrl+shift+1>",
            "<alt+f4>x<enter>",
            "<win>d<ctrl+minus>",
            "<0x07>",
            "<alt+><tab><tab><alt->",
            "<minus+><minus->",
            "<ctrl+0x10>",
        ] {
            let seq = parse_sequence(text).unwrap();
            assert_eq!(parse_sequence(&seq.to_string()).unwrap(), seq, "{text}");
        }
    }

    #[test]
    fn test_round_trip_chord_display() {
        let chord = parse_chord("<shift+alt+pagedown>").unwrap();
        assert_eq!(chord.to_string(), "<alt+shift+pagedown>");
        assert_eq!(parse_chord(&chord.to_string()).unwrap(), chord);
    }
}

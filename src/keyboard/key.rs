//! Keys recognized on a raw terminal and the byte sequences they produce.

// =============================================================================
// Public Interface
// =============================================================================

/// The keys `tether` tells apart. Anything else is `Unclassified` and keeps
/// its raw bytes in the [`KeyEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Enter,
    Esc,
    Space,
    Tab,
    CtrlA,
    CtrlB,
    CtrlC,
    Delete,
    CtrlBackslash,
    Backspace,
    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
    Unclassified,
}

impl KeyType {
    /// The canonical bytes a terminal sends for this key. Empty for
    /// `Unclassified`, whose bytes live in the event.
    pub fn sequence(self) -> &'static [u8] {
        KEY_TABLE
            .iter()
            .find(|entry| entry.1 == self)
            .map(|entry| entry.0)
            .unwrap_or(&[])
    }
}

/// One decoded keystroke.
///
/// Either `kind` is a named key and `raw` is empty, or `kind` is
/// `Unclassified` and `raw` holds the bytes read. The default value, with no
/// `kind` at all, means no key could be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: Option<KeyType>,
    pub raw: Vec<u8>,
}

impl KeyEvent {
    pub fn named(kind: KeyType) -> Self {
        KeyEvent {
            kind: Some(kind),
            raw: Vec::new(),
        }
    }

    pub fn unclassified(raw: Vec<u8>) -> Self {
        KeyEvent {
            kind: Some(KeyType::Unclassified),
            raw,
        }
    }

    /// `true` for the empty event returned when nothing could be read.
    pub fn is_none(&self) -> bool {
        self.kind.is_none()
    }

    /// The bytes to forward for this key, e.g. to a serial line.
    pub fn bytes(&self) -> &[u8] {
        match self.kind {
            Some(KeyType::Unclassified) | None => &self.raw,
            Some(kind) => kind.sequence(),
        }
    }
}

/// Decode everything returned by one raw terminal read.
///
/// The whole read must match a known sequence exactly, a known sequence
/// followed by more bytes is `Unclassified`.
pub fn decode(bytes: &[u8]) -> KeyEvent {
    if bytes.is_empty() {
        return KeyEvent::default();
    }
    KEY_TABLE
        .iter()
        .find(|entry| entry.0 == bytes)
        .map_or_else(
            || KeyEvent::unclassified(bytes.to_vec()),
            |entry| KeyEvent::named(entry.1),
        )
}

// =============================================================================
// Private stuff
// =============================================================================

/// Sequences are disjoint, so the first match is the only match. When a key
/// has several sequences the first one listed is its canonical one.
const KEY_TABLE: &[(&[u8], KeyType)] = &[
    (&[13], KeyType::Enter),
    (&[10], KeyType::Enter),
    (&[27], KeyType::Esc),
    (&[32], KeyType::Space),
    (&[9], KeyType::Tab),
    (&[1], KeyType::CtrlA),
    (&[2], KeyType::CtrlB),
    (&[3], KeyType::CtrlC),
    (&[28], KeyType::CtrlBackslash),
    (&[8], KeyType::Backspace),
    (&[127], KeyType::Backspace),
    (&[27, 91, 51, 126], KeyType::Delete),
    (&[27, 91, 65], KeyType::UpArrow),
    (&[27, 91, 66], KeyType::DownArrow),
    (&[27, 91, 67], KeyType::RightArrow),
    (&[27, 91, 68], KeyType::LeftArrow),
];

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_sequence() {
        let expected: &[(&[u8], KeyType)] = &[
            (&[13], KeyType::Enter),
            (&[10], KeyType::Enter),
            (&[27], KeyType::Esc),
            (&[32], KeyType::Space),
            (&[9], KeyType::Tab),
            (&[1], KeyType::CtrlA),
            (&[2], KeyType::CtrlB),
            (&[3], KeyType::CtrlC),
            (&[28], KeyType::CtrlBackslash),
            (&[8], KeyType::Backspace),
            (&[127], KeyType::Backspace),
            (&[27, 91, 51, 126], KeyType::Delete),
            (&[27, 91, 65], KeyType::UpArrow),
            (&[27, 91, 66], KeyType::DownArrow),
            (&[27, 91, 67], KeyType::RightArrow),
            (&[27, 91, 68], KeyType::LeftArrow),
        ];
        for (bytes, kind) in expected {
            let key = decode(bytes);
            assert_eq!(key.kind, Some(*kind), "decoding {:?}", bytes);
            assert!(key.raw.is_empty(), "decoding {:?}", bytes);
        }
    }

    #[test]
    fn printable_input_is_unclassified() {
        let key = decode(&[104, 105]);
        assert_eq!(key.kind, Some(KeyType::Unclassified));
        assert_eq!(key.raw, vec![104, 105]);
    }

    #[test]
    fn prefix_of_a_sequence_is_not_a_match() {
        assert_eq!(decode(&[27, 91]), KeyEvent::unclassified(vec![27, 91]));
        assert_eq!(
            decode(&[27, 91, 65, 27, 91, 65]).kind,
            Some(KeyType::Unclassified)
        );
    }

    #[test]
    fn nothing_read_is_no_key() {
        assert!(decode(&[]).is_none());
    }

    #[test]
    fn canonical_sequences() {
        assert_eq!(KeyType::Enter.sequence(), &[13]);
        assert_eq!(KeyType::Backspace.sequence(), &[8]);
        assert_eq!(KeyType::Delete.sequence(), &[27, 91, 51, 126]);
        assert!(KeyType::Unclassified.sequence().is_empty());
    }

    #[test]
    fn bytes_to_forward() {
        assert_eq!(KeyEvent::named(KeyType::LeftArrow).bytes(), &[27, 91, 68]);
        assert_eq!(KeyEvent::unclassified(b"ok".to_vec()).bytes(), b"ok");
        assert!(KeyEvent::default().bytes().is_empty());
    }
}

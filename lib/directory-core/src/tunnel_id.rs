//! Tunnel identifier codec

use std::fmt;
use uuid::Uuid;

/// Marker prepended to the textual form of a private tunnel ID
pub const PRIVATE_MARKER: char = '$';

/// Opaque 16-byte tunnel identifier with a private flag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TunnelId {
    bytes: [u8; 16],
    private: bool,
}

impl TunnelId {
    /// Parse a tunnel token.
    ///
    /// Returns `None` for an empty token, a token that does not decode to a
    /// UUID, or a token that decodes to the all-zero ID. Callers treat `None`
    /// the same as "no tunnel given".
    pub fn parse(token: &str) -> Option<Self> {
        let (private, rest) = match token.strip_prefix(PRIVATE_MARKER) {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        if rest.is_empty() {
            return None;
        }

        let uuid = Uuid::parse_str(rest).ok()?;
        let id = Self {
            bytes: *uuid.as_bytes(),
            private,
        };
        if id.is_zero() {
            return None;
        }
        Some(id)
    }

    /// True iff every byte of the payload is zero
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    pub fn is_private(&self) -> bool {
        self.private
    }
}

impl fmt::Display for TunnelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.private {
            write!(f, "{}", PRIVATE_MARKER)?;
        }
        write!(f, "{}", Uuid::from_bytes(self.bytes).hyphenated())
    }
}

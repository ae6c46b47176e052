use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Formatting active on a span.
    ///
    /// Bits that no named flag covers are kept as-is so a value read from a
    /// surface hint attribute survives a round trip through the model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FormatFlags: u32 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const CODE = 1 << 4;
    }
}

impl FormatFlags {
    /// Parse the numeric hint attribute a surface attaches to styled runs.
    ///
    /// Anything unparsable means "no formatting".
    pub fn from_hint(hint: Option<&str>) -> Self {
        hint.and_then(|raw| raw.trim().parse::<u32>().ok())
            .map(Self::from_bits_retain)
            .unwrap_or_default()
    }

    /// Value for the surface hint attribute
    pub fn to_hint(self) -> String {
        self.bits().to_string()
    }
}

/// Unit a reveal slice is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextUnit {
    /// Unicode scalar values.
    #[default]
    CodePoint,
    /// UTF-8 bytes, rounded up to the next char boundary so a multi-byte
    /// character is never split.
    Byte,
}

impl TextUnit {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "codepoint" | "code_point" | "char" | "chars" => Some(TextUnit::CodePoint),
            "byte" | "bytes" => Some(TextUnit::Byte),
            _ => None,
        }
    }

    /// Number of units in `text`.
    pub fn count(&self, text: &str) -> usize {
        match self {
            TextUnit::CodePoint => text.chars().count(),
            TextUnit::Byte => text.len(),
        }
    }
}

/// Position inside one payload being revealed.
///
/// Each call to [`next_slice`](Self::next_slice) yields the next `step`
/// units; [`rest`](Self::rest) yields everything not yet emitted. The
/// cursor only moves forward, so no slice is ever produced twice.
#[derive(Debug, Clone)]
pub struct RevealCursor<'a> {
    text: &'a str,
    offset: usize,
    step: usize,
    unit: TextUnit,
}

impl<'a> RevealCursor<'a> {
    pub fn new(text: &'a str, step: usize, unit: TextUnit) -> Self {
        Self {
            text,
            offset: 0,
            step: step.max(1),
            unit,
        }
    }

    /// Byte offset of the next unemitted unit.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_done(&self) -> bool {
        self.offset >= self.text.len()
    }

    /// Slices a fully paced reveal of the remainder would take.
    pub fn remaining_slices(&self) -> usize {
        self.unit.count(&self.text[self.offset..]).div_ceil(self.step)
    }

    pub fn next_slice(&mut self) -> Option<&'a str> {
        if self.is_done() {
            return None;
        }
        let rest = &self.text[self.offset..];
        let len = match self.unit {
            TextUnit::CodePoint => rest
                .char_indices()
                .nth(self.step)
                .map(|(idx, _)| idx)
                .unwrap_or(rest.len()),
            TextUnit::Byte => {
                let mut end = self.step.min(rest.len());
                while !rest.is_char_boundary(end) {
                    end += 1;
                }
                end
            }
        };
        self.offset += len;
        Some(&rest[..len])
    }

    pub fn rest(&mut self) -> Option<&'a str> {
        if self.is_done() {
            return None;
        }
        let rest = &self.text[self.offset..];
        self.offset = self.text.len();
        Some(rest)
    }
}

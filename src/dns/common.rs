use super::WireError;
use super::name::{MAX_LABEL_LEN, MAX_NAME_WIRE_LEN, Name};

/// How many compression pointers a single name may chase. Targets must also
/// point strictly backwards, so this is a second bound on top of that rule.
const MAX_POINTER_FOLLOWS: usize = 8;

/// A bounds-checked view into the record stream.
///
/// `pos..end` is the window the current field may read from; compression
/// pointers are resolved against the full buffer so names can reference
/// earlier records.
pub(crate) struct WireCursor<'a> {
    pub(crate) buf: &'a [u8],
    pub(crate) pos: usize,
    pub(crate) end: usize,
}

impl<'a> WireCursor<'a> {
    pub(crate) fn over(buf: &'a [u8]) -> Self {
        WireCursor { buf, pos: 0, end: buf.len() }
    }

    pub(crate) fn window(buf: &'a [u8], pos: usize, end: usize) -> Self {
        WireCursor { buf, pos, end }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, WireError> {
        if self.remaining() < 1 {
            return Err(WireError::Truncated);
        }
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, WireError> {
        if self.remaining() < 2 {
            return Err(WireError::Truncated);
        }
        let v = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, WireError> {
        if self.remaining() < 4 {
            return Err(WireError::Truncated);
        }
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(u32::from_be_bytes(bytes))
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < len {
            return Err(WireError::Truncated);
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub(crate) fn take_rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..self.end];
        self.pos = self.end;
        bytes
    }

    /// Reads a wire-format name starting at the cursor.
    ///
    /// Inline labels must stay inside the cursor's window. A compression
    /// pointer must target a strictly earlier offset in the buffer than the
    /// pointer itself, which rules out loops and forward references; the
    /// number of pointer follows is capped as well. The cursor advances past
    /// the name as it appeared in the window (i.e. to just after the first
    /// pointer, when one is present).
    pub(crate) fn read_name(&mut self) -> Result<Name, WireError> {
        let mut labels = Vec::new();
        let mut wire_len = 1usize;
        let mut pos = self.pos;
        // Until the first pointer we are confined to the window; afterwards
        // label reads may range over the whole earlier buffer.
        let mut limit = self.end;
        let mut resume: Option<usize> = None;
        let mut follows = 0;

        loop {
            if pos >= limit {
                return Err(WireError::Truncated);
            }
            let len = self.buf[pos] as usize;
            if len & 0xc0 == 0xc0 {
                if pos + 1 >= limit {
                    return Err(WireError::Truncated);
                }
                let target = ((len & 0x3f) << 8) | self.buf[pos + 1] as usize;
                if target >= pos {
                    return Err(WireError::BadPointer);
                }
                follows += 1;
                if follows > MAX_POINTER_FOLLOWS {
                    return Err(WireError::BadPointer);
                }
                if resume.is_none() {
                    resume = Some(pos + 2);
                }
                pos = target;
                limit = self.buf.len();
                continue;
            }
            if len & 0xc0 != 0 {
                // The 0b01/0b10 length prefixes are reserved.
                return Err(WireError::InvalidLabel);
            }
            if len == 0 {
                pos += 1;
                break;
            }
            if len > MAX_LABEL_LEN {
                return Err(WireError::InvalidLabel);
            }
            if pos + 1 + len > limit {
                return Err(WireError::Truncated);
            }
            wire_len += 1 + len;
            if wire_len > MAX_NAME_WIRE_LEN {
                return Err(WireError::InvalidName);
            }
            let label = std::str::from_utf8(&self.buf[pos + 1..pos + 1 + len])
                .map_err(|_| WireError::InvalidLabel)?;
            labels.push(label.to_owned());
            pos += 1 + len;
        }

        self.pos = resume.unwrap_or(pos);
        Name::from_labels(labels)
    }
}

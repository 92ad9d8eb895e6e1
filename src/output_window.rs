use std::cmp::min;

// Standard DEFLATE (RFC 1951) needs a window going back 32 KiB: the
// longest match distance is 32768 and the longest match length is 258,
// both comfortably inside one window, so (unlike Deflate64) we don't
// need extra headroom for in-flight writes.
pub(crate) const WINDOW_SIZE: usize = 32768;
const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// Maintains a circular window of decompressed output. Doubles as the
/// history buffer length/distance back-references copy from, and as the
/// staging area a checkpoint's dictionary is sliced out of.
#[derive(Debug)]
pub(crate) struct OutputWindow {
    window: Box<[u8; WINDOW_SIZE]>,
    end: usize,
    bytes_used: usize,
}

impl OutputWindow {
    pub fn new() -> Self {
        Self {
            window: Box::new([0; WINDOW_SIZE]),
            end: 0,
            bytes_used: 0,
        }
    }

    #[inline(always)]
    pub fn write(&mut self, b: u8) {
        debug_assert!(self.bytes_used < WINDOW_SIZE, "window is full");
        self.window[self.end] = b;
        self.end = (self.end + 1) & WINDOW_MASK;
        self.bytes_used += 1;
    }

    #[inline(always)]
    pub fn write_length_distance(&mut self, length: usize, distance: usize) {
        debug_assert!(self.bytes_used + length <= WINDOW_SIZE, "not enough space");
        self.bytes_used += length;
        let mut from = self.end.wrapping_sub(distance) & WINDOW_MASK;
        let mut to = self.end;
        for _ in 0..length {
            self.window[to] = self.window[from];
            to = (to + 1) & WINDOW_MASK;
            from = (from + 1) & WINDOW_MASK;
        }
        self.end = to;
    }

    /// Copy up to `length` bytes straight from `input`, used for stored
    /// (uncompressed) blocks.
    pub fn copy_from(&mut self, input: &mut crate::bitreader::InputBuffer<'_>, length: usize) -> usize {
        let length = min(min(length, WINDOW_SIZE - self.bytes_used), input.available_bytes());
        let tail_len = WINDOW_SIZE - self.end;
        let copied = if length > tail_len {
            let mut copied = input.copy_to(&mut self.window[self.end..][..tail_len]);
            if copied == tail_len {
                copied += input.copy_to(&mut self.window[..length - tail_len]);
            }
            copied
        } else {
            input.copy_to(&mut self.window[self.end..][..length])
        };
        self.end = (self.end + copied) & WINDOW_MASK;
        self.bytes_used += copied;
        copied
    }

    pub fn free_bytes(&self) -> usize {
        WINDOW_SIZE - self.bytes_used
    }

    pub fn available_bytes(&self) -> usize {
        self.bytes_used
    }

    /// Drain up to `output.len()` decompressed bytes into `output`,
    /// returning the number of bytes actually copied.
    pub fn copy_to(&mut self, output: &mut [u8]) -> usize {
        let copied = min(output.len(), self.bytes_used);
        if copied == 0 {
            return 0;
        }
        let start = (self.end + WINDOW_SIZE - self.bytes_used) & WINDOW_MASK;
        if start + copied <= WINDOW_SIZE {
            output[..copied].copy_from_slice(&self.window[start..start + copied]);
        } else {
            let first = WINDOW_SIZE - start;
            output[..first].copy_from_slice(&self.window[start..]);
            output[first..copied].copy_from_slice(&self.window[..copied - first]);
        }
        self.bytes_used -= copied;
        copied
    }

    /// Return the most recent `min(WINDOW_SIZE, total_output_written)`
    /// bytes of history as up to two contiguous slices (wrap-around
    /// splits it into two). Used to build a checkpoint's dictionary.
    pub fn get_checkpoint_data(&self, total_output_written: u64) -> (&[u8], &[u8]) {
        let history_needed = min(WINDOW_SIZE as u64, total_output_written) as usize;
        let data_len = history_needed.max(self.bytes_used);
        let start = (self.end + WINDOW_SIZE - data_len) & WINDOW_MASK;
        if data_len <= WINDOW_SIZE - start {
            (&self.window[start..start + data_len], &[])
        } else {
            (&self.window[start..], &self.window[..self.end])
        }
    }

    /// Reinitialize the window from a previously captured dictionary, as
    /// when resuming decompression from a checkpoint. The dictionary
    /// becomes pure history: nothing in it is "available" to drain.
    pub fn restore_from_dict(&mut self, dict: &[u8]) {
        debug_assert!(dict.len() <= WINDOW_SIZE);
        self.window[..dict.len()].copy_from_slice(dict);
        self.window[dict.len()..].fill(0);
        self.end = dict.len() & WINDOW_MASK;
        self.bytes_used = 0;
    }
}

impl Default for OutputWindow {
    fn default() -> Self {
        Self::new()
    }
}

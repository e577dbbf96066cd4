use std::collections::VecDeque;
use std::sync::Mutex;

/// Byte buffer that keeps only the most recent `cap` bytes.
pub struct RingBytes {
    inner: Mutex<VecDeque<u8>>,
    cap: usize,
    dropped: Mutex<u64>,
}

impl RingBytes {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap.min(64 * 1024))),
            cap,
            dropped: Mutex::new(0),
        }
    }

    pub fn push(&self, data: &[u8]) {
        let mut g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut lost = 0u64;
        let data = if data.len() > self.cap {
            lost += (data.len() - self.cap) as u64;
            &data[data.len() - self.cap..]
        } else {
            data
        };
        let overflow = g.len().saturating_add(data.len()).saturating_sub(self.cap);
        if overflow > 0 {
            g.drain(..overflow);
            lost += overflow as u64;
        }
        g.extend(data);
        if lost > 0 {
            *self.dropped.lock().unwrap_or_else(|e| e.into_inner()) += lost;
        }
    }

    pub fn push_line(&self, line: &str) {
        self.push(line.as_bytes());
        self.push(b"\n");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes evicted from the front so far.
    pub fn dropped(&self) -> u64 {
        *self.dropped.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut vec = Vec::with_capacity(g.len());
        vec.extend(g.iter().copied());
        vec
    }

    /// Eviction may split a UTF-8 sequence at the front; that prefix is replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_tail_and_counts_evictions() {
        let ring = RingBytes::new(8);
        ring.push(b"hello");
        ring.push(b"world");
        assert_eq!(ring.to_bytes(), b"lloworld".to_vec());
        assert_eq!(ring.dropped(), 2);
    }

    #[test]
    fn oversized_push_keeps_last_cap_bytes() {
        let ring = RingBytes::new(4);
        ring.push(b"abcdefgh");
        assert_eq!(ring.to_string_lossy(), "efgh");
        assert_eq!(ring.dropped(), 4);
    }

    #[test]
    fn push_line_appends_newline() {
        let ring = RingBytes::new(64);
        ring.push_line("a");
        ring.push_line("b");
        assert_eq!(ring.to_string_lossy(), "a\nb\n");
    }
}

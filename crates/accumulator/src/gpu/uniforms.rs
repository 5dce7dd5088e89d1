use bytemuck::{Pod, Zeroable};

/// Size in bytes of the largest uniform record (`width`, `height`,
/// `frame_index`).
pub const FRAME_UNIFORM_SIZE: usize = 12;

/// Byte layout of the uniform block the display program expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformLayout {
    /// `width`, `height`, `frame_index`: three little-endian `u32`, 12 bytes.
    Frame,
    /// `width`, `height`: two little-endian `u32`, 8 bytes.
    Viewport,
}

impl UniformLayout {
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Frame => FRAME_UNIFORM_SIZE,
            Self::Viewport => 8,
        }
    }
}

/// GPU mirror of [`UniformState`]. Fields are stored little-endian.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
struct GpuUniforms {
    width: u32,
    height: u32,
    frame_index: u32,
}

const _: () = assert!(std::mem::size_of::<GpuUniforms>() == FRAME_UNIFORM_SIZE);

/// Snapshot of the values the display program sees for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformState {
    pub width: u32,
    pub height: u32,
    pub frame_index: u32,
}

impl UniformState {
    /// Serializes the snapshot; callers upload `&bytes[..layout.byte_len()]`.
    pub fn encode(&self) -> [u8; FRAME_UNIFORM_SIZE] {
        bytemuck::cast(GpuUniforms {
            width: self.width.to_le(),
            height: self.height.to_le(),
            frame_index: self.frame_index.to_le(),
        })
    }

    /// Reads a snapshot back from raw uniform bytes. The viewport layout has
    /// no frame counter and decodes it as zero.
    pub fn decode(bytes: &[u8], layout: UniformLayout) -> Option<Self> {
        let len = layout.byte_len();
        if bytes.len() < len {
            return None;
        }
        let mut padded = [0u8; FRAME_UNIFORM_SIZE];
        padded[..len].copy_from_slice(&bytes[..len]);
        let raw: GpuUniforms = bytemuck::pod_read_unaligned(&padded);
        Some(Self {
            width: u32::from_le(raw.width),
            height: u32::from_le(raw.height),
            frame_index: u32::from_le(raw.frame_index),
        })
    }
}

/// Owns the frame counter and viewport size for one accumulation run.
#[derive(Debug, Clone)]
pub(crate) struct UniformTracker {
    width: u32,
    height: u32,
    frames: u32,
}

impl UniformTracker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frames: 0,
        }
    }

    /// Returns the snapshot for the frame about to render, then counts it.
    ///
    /// The snapshot's `frame_index` is the number of frames already rendered
    /// in this run, so the first frame after a reset sees zero history. The
    /// counter wraps at `u32::MAX`; since that value is odd, parity keeps
    /// alternating and the wrapped frame simply restarts accumulation.
    pub fn advance(&mut self) -> UniformState {
        let snapshot = self.current();
        self.frames = self.frames.wrapping_add(1);
        snapshot
    }

    /// Snapshot the next call to [`advance`](Self::advance) will return.
    pub fn current(&self) -> UniformState {
        UniformState {
            width: self.width,
            height: self.height,
            frame_index: self.frames,
        }
    }

    /// Frames counted since the last reset.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout_is_three_packed_little_endian_words() {
        let state = UniformState {
            width: 0x0102_0304,
            height: 600,
            frame_index: 7,
        };
        let bytes = state.encode();
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..8], &600u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &7u32.to_le_bytes());
    }

    #[test]
    fn viewport_layout_drops_the_frame_counter() {
        let state = UniformState {
            width: 320,
            height: 200,
            frame_index: 41,
        };
        let bytes = state.encode();
        let decoded = UniformState::decode(&bytes[..8], UniformLayout::Viewport).unwrap();
        assert_eq!(decoded.width, 320);
        assert_eq!(decoded.height, 200);
        assert_eq!(decoded.frame_index, 0);
        assert!(UniformState::decode(&bytes[..8], UniformLayout::Frame).is_none());
    }

    #[test]
    fn advance_hands_out_consecutive_indices() {
        let mut tracker = UniformTracker::new(64, 32);
        let indices: Vec<u32> = (0..4).map(|_| tracker.advance().frame_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(tracker.frames(), 4);
    }

    #[test]
    fn resize_restarts_the_run() {
        let mut tracker = UniformTracker::new(100, 100);
        for _ in 0..10 {
            tracker.advance();
        }
        tracker.resize(200, 150);
        assert_eq!(
            tracker.advance(),
            UniformState {
                width: 200,
                height: 150,
                frame_index: 0
            }
        );
    }

    #[test]
    fn counter_wraps_with_alternating_parity() {
        let mut tracker = UniformTracker::new(1, 1);
        tracker.frames = u32::MAX - 1;
        let last_even = tracker.advance().frame_index;
        let last_odd = tracker.advance().frame_index;
        let wrapped = tracker.advance().frame_index;
        assert_eq!(last_even % 2, 0);
        assert_eq!(last_odd % 2, 1);
        assert_eq!(wrapped, 0);
    }
}

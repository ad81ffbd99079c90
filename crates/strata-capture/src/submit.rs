/// Hardware engine a submit was queued to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EngineType {
    Universal = 0,
    Compute = 1,
    Dma = 2,
    Timer = 3,
    Other = 4,
}

impl EngineType {
    /// All engine types, in the order engine nodes are laid out under the
    /// hierarchy root.
    pub const ALL: [EngineType; 5] = [
        EngineType::Universal,
        EngineType::Compute,
        EngineType::Dma,
        EngineType::Timer,
        EngineType::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EngineType::Universal => "Universal",
            EngineType::Compute => "Compute",
            EngineType::Dma => "DMA",
            EngineType::Timer => "Timer",
            EngineType::Other => "Other",
        }
    }

    /// Whether submits on this engine carry a decodable PM4 stream.
    pub fn is_decodable(self) -> bool {
        matches!(
            self,
            EngineType::Universal | EngineType::Compute | EngineType::Dma
        )
    }
}

/// Software queue a submit was issued from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QueueType {
    Universal = 0,
    Compute = 1,
    Dma = 2,
    Other = 3,
}

impl QueueType {
    pub fn name(self) -> &'static str {
        match self {
            QueueType::Universal => "Universal",
            QueueType::Compute => "Compute",
            QueueType::Dma => "DMA",
            QueueType::Other => "Other",
        }
    }
}

/// One indirect buffer referenced by a submit: a contiguous run of 32-bit
/// PM4 words in the simulated GPU virtual address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndirectBufferInfo {
    pub va_addr: u64,
    pub size_in_dwords: u32,
    /// The capture does not contain this buffer's memory. The walk still
    /// reports the buffer, but yields no packets from it.
    pub skip: bool,
}

/// A batch of indirect buffers queued to a hardware engine.
#[derive(Clone, Debug)]
pub struct SubmitInfo {
    engine_type: EngineType,
    queue_type: QueueType,
    engine_index: u8,
    is_dummy: bool,
    indirect_buffers: Vec<IndirectBufferInfo>,
}

impl SubmitInfo {
    pub fn new(
        engine_type: EngineType,
        queue_type: QueueType,
        engine_index: u8,
        is_dummy: bool,
        indirect_buffers: Vec<IndirectBufferInfo>,
    ) -> Self {
        Self {
            engine_type,
            queue_type,
            engine_index,
            is_dummy,
            indirect_buffers,
        }
    }

    pub fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    pub fn engine_index(&self) -> u8 {
        self.engine_index
    }

    pub fn is_dummy(&self) -> bool {
        self.is_dummy
    }

    pub fn num_indirect_buffers(&self) -> u32 {
        self.indirect_buffers.len() as u32
    }

    pub fn indirect_buffers(&self) -> &[IndirectBufferInfo] {
        &self.indirect_buffers
    }
}

//! PM4 header bit layouts.
//!
//! Every packet starts with one 32-bit header word whose top nibble selects
//! the packet class. Only two classes carry payload this crate interprets:
//!
//! - type-4 (`0x4`): register write burst. `count` payload dwords are written
//!   to consecutive register offsets starting at `offset`.
//! - type-7 (`0x7`): opcode packet. `count` payload dwords interpreted per
//!   opcode.
//!
//! Both headers protect their variable fields with odd-parity bits; encode
//! always produces valid parity, decode only checks the type nibble (captured
//! streams with bad parity are reported by the hardware, not by tooling).

/// Sentinel opcode for packets that carry none (type-4 register writes).
pub const NO_OPCODE: u8 = u8::MAX;

/// Header classification by bits [31:28].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pm4Type {
    Type4,
    Type7,
    /// Anything else; the walk skips one dword.
    Other,
}

impl Pm4Type {
    pub fn classify(header: u32) -> Pm4Type {
        match header >> 28 {
            0x4 => Pm4Type::Type4,
            0x7 => Pm4Type::Type7,
            _ => Pm4Type::Other,
        }
    }
}

/// Returns 1 when `value` has an even number of set bits, making overall
/// parity odd once the bit is appended.
fn odd_parity(value: u32) -> u32 {
    (value.count_ones() & 1) ^ 1
}

/// Type-7 header: opcode packet.
///
/// Layout: count [14:0], count parity [15], opcode [22:16], opcode parity
/// [23], type [31:28] = 7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Type7Header {
    pub opcode: u8,
    /// Number of payload dwords following the header.
    pub count: u16,
}

impl Type7Header {
    pub fn decode(header: u32) -> Option<Type7Header> {
        if header >> 28 != 0x7 {
            return None;
        }
        Some(Type7Header {
            opcode: ((header >> 16) & 0x7f) as u8,
            count: (header & 0x7fff) as u16,
        })
    }

    pub fn encode(self) -> u32 {
        let count = u32::from(self.count) & 0x7fff;
        let opcode = u32::from(self.opcode) & 0x7f;
        (0x7 << 28)
            | count
            | (odd_parity(count) << 15)
            | (opcode << 16)
            | (odd_parity(opcode) << 23)
    }
}

/// Type-4 header: register write burst.
///
/// Layout: count [6:0], count parity [7], register offset [25:8], offset
/// parity [27], type [31:28] = 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Type4Header {
    /// First register offset written.
    pub offset: u32,
    /// Number of consecutive registers (= payload dwords) written.
    pub count: u8,
}

impl Type4Header {
    pub fn decode(header: u32) -> Option<Type4Header> {
        if header >> 28 != 0x4 {
            return None;
        }
        Some(Type4Header {
            offset: (header >> 8) & 0x3ffff,
            count: (header & 0x7f) as u8,
        })
    }

    pub fn encode(self) -> u32 {
        let count = u32::from(self.count) & 0x7f;
        let offset = self.offset & 0x3ffff;
        (0x4 << 28)
            | count
            | (odd_parity(count) << 7)
            | (offset << 8)
            | (odd_parity(offset) << 27)
    }
}

/// Type-7 opcodes the walk and the hierarchy builder interpret themselves.
/// Everything else is decoded purely through the packet catalog.
pub mod opcodes {
    pub const CP_NOP: u8 = 0x10;

    pub const CP_DRAW_AUTO: u8 = 0x24;
    pub const CP_DRAW_INDIRECT: u8 = 0x28;
    pub const CP_DRAW_INDX_INDIRECT: u8 = 0x29;
    pub const CP_DRAW_INDIRECT_MULTI: u8 = 0x2a;
    pub const CP_DRAW_INDX_OFFSET: u8 = 0x38;

    /// Nested transfer, prefetch-disabled variant. Returns to the caller.
    pub const CP_INDIRECT_BUFFER_PFD: u8 = 0x37;
    /// Nested transfer. Returns to the caller.
    pub const CP_INDIRECT_BUFFER: u8 = 0x3f;
    /// Tail transfer. Does not return; daisy-chains replace the current
    /// buffer.
    pub const CP_INDIRECT_BUFFER_CHAIN: u8 = 0x57;
}

/// Whether `opcode` retires an event run: a draw, dispatch, or DMA on the
/// GPU timeline.
pub fn is_draw_dispatch_dma(opcode: u8) -> bool {
    matches!(
        opcode,
        opcodes::CP_DRAW_INDX_OFFSET
            | opcodes::CP_DRAW_INDIRECT
            | opcodes::CP_DRAW_INDX_INDIRECT
            | opcodes::CP_DRAW_INDIRECT_MULTI
            | opcodes::CP_DRAW_AUTO
    )
}

/// Synchronization classification of a packet run.
///
/// Classification is catalog-driven in a future revision; the current
/// classifier never reports anything but [`SyncType::None`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SyncType {
    None = 0,
    WaitForIdle = 1,
    CacheFlush = 2,
    Timestamp = 3,
}

/// Cache maintenance operations a sync packet can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOp {
    /// Do nothing.
    Nop,
    /// Flush and invalidate L1 and L2 data.
    WbInvL1L2,
    /// Flush and invalidate non-coherent L2 data.
    WbInvL2Nc,
    /// Flush non-coherent L2 data.
    WbL2Nc,
    /// Invalidate non-coherent L2 data.
    InvL2Nc,
    /// Invalidate L1 data.
    InvL1,
}

/// Classifies the cache operation a coherency-control word requests.
// TODO: translate the coherency-control encoding once the relevant register
// description lands in the catalog tables.
pub fn classify_cache_op(_coher_cntl: u32) -> CacheOp {
    CacheOp::Nop
}

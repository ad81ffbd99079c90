//! `strata-pm4` decodes the PM4 command-packet protocol used by Adreno-class
//! GPUs and drives capture walks over it.
//!
//! The crate has three layers:
//! - [`packet`]: header bit layouts for type-4 (register write burst) and
//!   type-7 (opcode packet) headers, plus the opcode constants the walk
//!   itself needs to understand (indirect-buffer transfers, draws).
//! - [`catalog`]: the read-only packet/register schema contract consumed
//!   during field decode. Production catalogs are generated from GPU
//!   description tables; [`catalog::StaticCatalog`] is the in-memory
//!   implementation used by tests and small tools.
//! - [`emulate`]: the stream walker. It classifies headers, recurses into
//!   nested and called indirect buffers, follows chain transfers with
//!   tail-call semantics, and reports everything it sees to an
//!   [`emulate::EmulatorHandler`].

pub mod catalog;
pub mod emulate;
pub mod packet;

pub use catalog::{PacketCatalog, PacketField, PacketInfo, RegField, RegInfo, StaticCatalog};
pub use emulate::{EmulateError, EmulatorHandler, IbType, Pm4Emulator};
pub use packet::{
    is_draw_dispatch_dma, CacheOp, Pm4Type, SyncType, Type4Header, Type7Header, NO_OPCODE,
};

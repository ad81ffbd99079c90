//! PM4 stream walker.
//!
//! [`Pm4Emulator`] walks the indirect buffers of one submit in program
//! order and reports every buffer transition and packet to an
//! [`EmulatorHandler`]. It interprets just enough of the protocol to follow
//! control flow:
//!
//! - type-7 `CP_INDIRECT_BUFFER`/`CP_INDIRECT_BUFFER_PFD` packets nest: the
//!   walk descends into the target and resumes after the packet.
//! - type-7 `CP_INDIRECT_BUFFER_CHAIN` packets are tail transfers: the
//!   remainder of the current buffer is abandoned. A daisy-chain produces an
//!   `on_ib_start` per transition but a single `on_ib_end` at the end of the
//!   final chain — handlers that track nesting must drain the whole chain
//!   run on that one callback.
//!
//! Headers that are neither type-4 nor type-7 are skipped silently, one
//! dword at a time. Any callback returning `false` aborts the walk.

use strata_capture::{IndirectBufferInfo, MemoryError, MemoryView};
use thiserror::Error;

use crate::packet::{opcodes, Pm4Type, Type4Header, Type7Header};

/// How a buffer was entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IbType {
    /// Referenced directly by the submit.
    Normal = 0,
    /// Entered through a nested transfer; the walk returns to the caller.
    Call = 1,
    /// Entered through a tail transfer; the walk never returns.
    Chain = 2,
}

/// Receiver for walk events.
///
/// A `false` return from any callback aborts the walk with
/// [`EmulateError::Aborted`].
pub trait EmulatorHandler {
    fn on_ib_start(
        &mut self,
        submit_index: u32,
        ib_index: u32,
        ib: &IndirectBufferInfo,
        kind: IbType,
    ) -> bool;

    fn on_packet(
        &mut self,
        mem: &dyn MemoryView,
        submit_index: u32,
        ib_index: u32,
        va: u64,
        pm4_type: Pm4Type,
        header: u32,
    ) -> bool;

    fn on_ib_end(&mut self, submit_index: u32, ib_index: u32, ib: &IndirectBufferInfo) -> bool;
}

#[derive(Debug, Error)]
pub enum EmulateError {
    #[error("walk aborted by handler: submit={submit_index} va=0x{va:x}")]
    Aborted { submit_index: u32, va: u64 },

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("indirect-buffer transfer payload truncated: submit={submit_index} va=0x{va:x}")]
    TruncatedTransfer { submit_index: u32, va: u64 },

    #[error("indirect-buffer nesting exceeds {max_depth} levels: submit={submit_index} va=0x{va:x}")]
    NestingTooDeep {
        submit_index: u32,
        va: u64,
        max_depth: usize,
    },
}

/// Hardware command processors support a small fixed number of IB levels;
/// anything deeper in a capture is a malformed stream, not real nesting.
const MAX_IB_DEPTH: usize = 8;

/// Walks PM4 indirect buffers and drives an [`EmulatorHandler`].
#[derive(Debug, Default)]
pub struct Pm4Emulator;

impl Pm4Emulator {
    pub fn new() -> Self {
        Self
    }

    /// Walks all indirect buffers of one submit in emission order.
    pub fn execute_submit(
        &self,
        handler: &mut dyn EmulatorHandler,
        mem: &dyn MemoryView,
        submit_index: u32,
        ibs: &[IndirectBufferInfo],
    ) -> Result<(), EmulateError> {
        for (ib_index, ib) in ibs.iter().enumerate() {
            self.execute_ib(
                handler,
                mem,
                submit_index,
                ib_index as u32,
                *ib,
                IbType::Normal,
                0,
            )?;
        }
        Ok(())
    }

    fn execute_ib(
        &self,
        handler: &mut dyn EmulatorHandler,
        mem: &dyn MemoryView,
        submit_index: u32,
        ib_index: u32,
        ib: IndirectBufferInfo,
        kind: IbType,
        depth: usize,
    ) -> Result<(), EmulateError> {
        if depth >= MAX_IB_DEPTH {
            return Err(EmulateError::NestingTooDeep {
                submit_index,
                va: ib.va_addr,
                max_depth: MAX_IB_DEPTH,
            });
        }

        // `cur` tracks the buffer currently being walked; chains replace it
        // without returning, so the end callback below reports the terminal
        // buffer of a chain run.
        let mut cur = ib;
        if !handler.on_ib_start(submit_index, ib_index, &cur, kind) {
            return Err(EmulateError::Aborted {
                submit_index,
                va: cur.va_addr,
            });
        }

        if !cur.skip {
            let mut va = cur.va_addr;
            let mut remaining = u64::from(cur.size_in_dwords);
            'walk: loop {
                while remaining > 0 {
                    let header = mem.read_dword(submit_index, va)?;

                    let span = if let Some(h7) = Type7Header::decode(header) {
                        if !handler.on_packet(mem, submit_index, ib_index, va, Pm4Type::Type7, header)
                        {
                            return Err(EmulateError::Aborted { submit_index, va });
                        }
                        match h7.opcode {
                            opcodes::CP_INDIRECT_BUFFER | opcodes::CP_INDIRECT_BUFFER_PFD => {
                                let target = read_transfer(mem, submit_index, va, h7)?;
                                self.execute_ib(
                                    handler,
                                    mem,
                                    submit_index,
                                    ib_index,
                                    target,
                                    IbType::Call,
                                    depth + 1,
                                )?;
                            }
                            opcodes::CP_INDIRECT_BUFFER_CHAIN => {
                                let target = read_transfer(mem, submit_index, va, h7)?;
                                if !handler.on_ib_start(
                                    submit_index,
                                    ib_index,
                                    &target,
                                    IbType::Chain,
                                ) {
                                    return Err(EmulateError::Aborted { submit_index, va });
                                }
                                cur = target;
                                if cur.skip {
                                    break 'walk;
                                }
                                va = cur.va_addr;
                                remaining = u64::from(cur.size_in_dwords);
                                continue 'walk;
                            }
                            _ => {}
                        }
                        1 + u64::from(h7.count)
                    } else if let Some(h4) = Type4Header::decode(header) {
                        if !handler.on_packet(mem, submit_index, ib_index, va, Pm4Type::Type4, header)
                        {
                            return Err(EmulateError::Aborted { submit_index, va });
                        }
                        1 + u64::from(h4.count)
                    } else {
                        // Padding or a legacy header class; not a packet.
                        1
                    };

                    if span > remaining {
                        tracing::warn!(
                            submit_index,
                            va,
                            header,
                            "packet spans past the end of its indirect buffer"
                        );
                        break 'walk;
                    }
                    va += span * 4;
                    remaining -= span;
                }
                break;
            }
        }

        if !handler.on_ib_end(submit_index, ib_index, &cur) {
            return Err(EmulateError::Aborted {
                submit_index,
                va: cur.va_addr,
            });
        }
        Ok(())
    }
}

/// Reads the `{ addr_lo, addr_hi, size_in_dwords }` payload of an
/// indirect-buffer transfer packet and prechecks the target's presence.
fn read_transfer(
    mem: &dyn MemoryView,
    submit_index: u32,
    va: u64,
    header: Type7Header,
) -> Result<IndirectBufferInfo, EmulateError> {
    if header.count < 3 {
        return Err(EmulateError::TruncatedTransfer { submit_index, va });
    }
    let addr_lo = mem.read_dword(submit_index, va + 4)?;
    let addr_hi = mem.read_dword(submit_index, va + 8)?;
    let size_in_dwords = mem.read_dword(submit_index, va + 12)? & 0xf_ffff;

    let va_addr = (u64::from(addr_hi) << 32) | u64::from(addr_lo);
    let skip = !mem.is_valid(submit_index, va_addr, u64::from(size_in_dwords) * 4);
    Ok(IndirectBufferInfo {
        va_addr,
        size_in_dwords,
        skip,
    })
}

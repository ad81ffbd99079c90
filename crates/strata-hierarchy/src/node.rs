//! Append-only arena of typed nodes.
//!
//! Nodes are immutable once created and indexed densely; all views reference
//! them by index. Each node carries a type tag, a one-line description, a
//! per-type auxiliary payload, and an opaque metadata blob (empty for most
//! node types).

use strata_capture::EngineType;
use strata_pm4::{IbType, SyncType};

use crate::topology::NodeIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Root,
    Engine,
    Submit,
    Ib,
    Marker,
    DrawDispatchDma,
    Sync,
    Packet,
    Reg,
    Field,
    PostambleState,
    Present,
}

/// What produced a marker node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    /// Paired begin/end debug-label range.
    BeginEnd,
    /// Injected API-call metadata; `id` is the call id from the capture
    /// layer's call table.
    ApiMetadata,
    /// Pipeline barrier.
    Barrier,
}

/// Per-type auxiliary payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeAux {
    None,
    Submit {
        engine_type: EngineType,
        submit_index: u32,
    },
    Ib {
        ib_type: IbType,
        ib_index: u8,
        size_in_dwords: u32,
        fully_captured: bool,
    },
    Packet {
        /// GPU virtual address of the packet header. 48 bits.
        addr: u64,
        /// [`strata_pm4::NO_OPCODE`] for type-4 packets.
        opcode: u8,
        is_ce_packet: bool,
    },
    RegField {
        is_ce_packet: bool,
    },
    Event {
        event_id: u32,
    },
    Marker {
        kind: MarkerKind,
        id: u32,
    },
    Sync {
        sync_type: SyncType,
        sync_info: u32,
    },
}

impl NodeAux {
    pub fn packet(addr: u64, opcode: u8, is_ce_packet: bool) -> NodeAux {
        assert_eq!(
            addr,
            addr & 0x0000_ffff_ffff_ffff,
            "packet addresses are 48-bit"
        );
        NodeAux::Packet {
            addr,
            opcode,
            is_ce_packet,
        }
    }

    pub fn ib(ib_type: IbType, ib_index: u32, size_in_dwords: u32, fully_captured: bool) -> NodeAux {
        assert!(
            ib_index <= u32::from(u8::MAX),
            "ib index {ib_index} out of representable range"
        );
        NodeAux::Ib {
            ib_type,
            ib_index: ib_index as u8,
            size_in_dwords,
            fully_captured,
        }
    }
}

/// Parallel-array node arena. Every array has identical length; `add`
/// enforces this and returns the new node's index.
#[derive(Debug, Default)]
pub struct NodeStore {
    types: Vec<NodeType>,
    descriptions: Vec<String>,
    aux: Vec<NodeAux>,
    metadata: Vec<Vec<u8>>,
    /// Indices of event nodes (draw/dispatch/DMA/sync), ascending.
    event_node_indices: Vec<NodeIndex>,
}

impl NodeStore {
    pub fn add(
        &mut self,
        node_type: NodeType,
        desc: impl Into<String>,
        aux: NodeAux,
        metadata: &[u8],
    ) -> NodeIndex {
        debug_assert_eq!(self.types.len(), self.descriptions.len());
        debug_assert_eq!(self.types.len(), self.aux.len());
        debug_assert_eq!(self.types.len(), self.metadata.len());

        let index = self.types.len() as NodeIndex;
        self.types.push(node_type);
        self.descriptions.push(desc.into());
        self.aux.push(aux);
        self.metadata.push(metadata.to_vec());
        index
    }

    pub fn len(&self) -> u64 {
        self.types.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn node_type(&self, node: NodeIndex) -> NodeType {
        self.types[node as usize]
    }

    pub fn desc(&self, node: NodeIndex) -> &str {
        &self.descriptions[node as usize]
    }

    pub fn aux(&self, node: NodeIndex) -> NodeAux {
        self.aux[node as usize]
    }

    pub fn metadata(&self, node: NodeIndex) -> &[u8] {
        &self.metadata[node as usize]
    }

    /// Records `node` as an event node. Nodes are created in walk order, so
    /// the list stays sorted by construction.
    pub fn append_event_index(&mut self, node: NodeIndex) {
        debug_assert!(self.event_node_indices.last().is_none_or(|&last| last < node));
        self.event_node_indices.push(node);
    }

    /// 1-based rank of `node` among event nodes, or 0 when `node` is not an
    /// event node.
    pub fn event_index(&self, node: NodeIndex) -> usize {
        match self.event_node_indices.binary_search(&node) {
            Ok(pos) => pos + 1,
            Err(_) => 0,
        }
    }

    pub fn event_node_indices(&self) -> &[NodeIndex] {
        &self.event_node_indices
    }
}

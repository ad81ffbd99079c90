//! The built result: one node arena plus six frozen views over it.

use strata_capture::EngineType;
use strata_pm4::{IbType, SyncType};

use crate::node::{MarkerKind, NodeAux, NodeStore, NodeType};
use crate::topology::{NodeIndex, Topology};

/// One of the simultaneous tree views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ViewKind {
    /// Root → engine → submit → nested IBs; packets shared under submit/IB.
    Engine = 0,
    /// Root → submit → IBs sorted by ib-index; packets shared as in `Engine`.
    Submit = 1,
    /// Root → submit → events owning their preceding packet runs.
    AllEvent = 2,
    /// `AllEvent` minus events, postamble state, and barrier markers.
    VulkanCall = 3,
    /// `VulkanCall` minus non-event API markers; their shared packets
    /// accumulate onto the next retained event marker.
    VulkanEvent = 4,
    /// Internal sibling of `AllEvent` driven by the internal marker stack.
    Rgp = 5,
}

impl ViewKind {
    pub const COUNT: usize = 6;

    pub const ALL: [ViewKind; ViewKind::COUNT] = [
        ViewKind::Engine,
        ViewKind::Submit,
        ViewKind::AllEvent,
        ViewKind::VulkanCall,
        ViewKind::VulkanEvent,
        ViewKind::Rgp,
    ];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Immutable command hierarchy handed out after a build.
///
/// All aux accessors assert the node's type; calling them on the wrong node
/// type is a programming error, not a recoverable condition.
#[derive(Debug)]
pub struct CommandHierarchy {
    nodes: NodeStore,
    topologies: [Topology; ViewKind::COUNT],
    metadata_version: u32,
}

impl CommandHierarchy {
    pub(crate) fn new(
        nodes: NodeStore,
        topologies: [Topology; ViewKind::COUNT],
        metadata_version: u32,
    ) -> Self {
        Self {
            nodes,
            topologies,
            metadata_version,
        }
    }

    pub fn topology(&self, view: ViewKind) -> &Topology {
        &self.topologies[view.index()]
    }

    pub fn engine_topology(&self) -> &Topology {
        self.topology(ViewKind::Engine)
    }

    pub fn submit_topology(&self) -> &Topology {
        self.topology(ViewKind::Submit)
    }

    pub fn all_event_topology(&self) -> &Topology {
        self.topology(ViewKind::AllEvent)
    }

    pub fn vulkan_call_topology(&self) -> &Topology {
        self.topology(ViewKind::VulkanCall)
    }

    pub fn vulkan_event_topology(&self) -> &Topology {
        self.topology(ViewKind::VulkanEvent)
    }

    pub fn rgp_topology(&self) -> &Topology {
        self.topology(ViewKind::Rgp)
    }

    pub fn num_nodes(&self) -> u64 {
        self.nodes.len()
    }

    pub fn node_type(&self, node: NodeIndex) -> NodeType {
        self.nodes.node_type(node)
    }

    pub fn desc(&self, node: NodeIndex) -> &str {
        self.nodes.desc(node)
    }

    pub fn aux(&self, node: NodeIndex) -> NodeAux {
        self.nodes.aux(node)
    }

    pub fn metadata(&self, node: NodeIndex) -> &[u8] {
        self.nodes.metadata(node)
    }

    /// 1-based rank of `node` among event nodes, or 0.
    pub fn event_index(&self, node: NodeIndex) -> usize {
        self.nodes.event_index(node)
    }

    pub fn event_node_indices(&self) -> &[NodeIndex] {
        self.nodes.event_node_indices()
    }

    /// Capture-layer metadata version carried through from the capture.
    pub fn metadata_version(&self) -> u32 {
        self.metadata_version
    }

    pub fn submit_engine_type(&self, node: NodeIndex) -> EngineType {
        match self.nodes.aux(node) {
            NodeAux::Submit { engine_type, .. } => engine_type,
            aux => panic!("node {node} is not a submit node (aux: {aux:?})"),
        }
    }

    pub fn submit_index(&self, node: NodeIndex) -> u32 {
        match self.nodes.aux(node) {
            NodeAux::Submit { submit_index, .. } => submit_index,
            aux => panic!("node {node} is not a submit node (aux: {aux:?})"),
        }
    }

    pub fn ib_index(&self, node: NodeIndex) -> u8 {
        match self.nodes.aux(node) {
            NodeAux::Ib { ib_index, .. } => ib_index,
            aux => panic!("node {node} is not an IB node (aux: {aux:?})"),
        }
    }

    pub fn ib_type(&self, node: NodeIndex) -> IbType {
        match self.nodes.aux(node) {
            NodeAux::Ib { ib_type, .. } => ib_type,
            aux => panic!("node {node} is not an IB node (aux: {aux:?})"),
        }
    }

    pub fn ib_size_in_dwords(&self, node: NodeIndex) -> u32 {
        match self.nodes.aux(node) {
            NodeAux::Ib { size_in_dwords, .. } => size_in_dwords,
            aux => panic!("node {node} is not an IB node (aux: {aux:?})"),
        }
    }

    pub fn ib_fully_captured(&self, node: NodeIndex) -> bool {
        match self.nodes.aux(node) {
            NodeAux::Ib { fully_captured, .. } => fully_captured,
            aux => panic!("node {node} is not an IB node (aux: {aux:?})"),
        }
    }

    pub fn marker_kind(&self, node: NodeIndex) -> MarkerKind {
        match self.nodes.aux(node) {
            NodeAux::Marker { kind, .. } => kind,
            aux => panic!("node {node} is not a marker node (aux: {aux:?})"),
        }
    }

    pub fn marker_id(&self, node: NodeIndex) -> u32 {
        match self.nodes.aux(node) {
            NodeAux::Marker { id, .. } => id,
            aux => panic!("node {node} is not a marker node (aux: {aux:?})"),
        }
    }

    pub fn event_id(&self, node: NodeIndex) -> u32 {
        match self.nodes.aux(node) {
            NodeAux::Event { event_id } => event_id,
            aux => panic!("node {node} is not an event node (aux: {aux:?})"),
        }
    }

    pub fn packet_addr(&self, node: NodeIndex) -> u64 {
        match self.nodes.aux(node) {
            NodeAux::Packet { addr, .. } => addr,
            aux => panic!("node {node} is not a packet node (aux: {aux:?})"),
        }
    }

    pub fn packet_opcode(&self, node: NodeIndex) -> u8 {
        match self.nodes.aux(node) {
            NodeAux::Packet { opcode, .. } => opcode,
            aux => panic!("node {node} is not a packet node (aux: {aux:?})"),
        }
    }

    pub fn packet_is_ce(&self, node: NodeIndex) -> bool {
        match self.nodes.aux(node) {
            NodeAux::Packet { is_ce_packet, .. } => is_ce_packet,
            aux => panic!("node {node} is not a packet node (aux: {aux:?})"),
        }
    }

    pub fn reg_field_is_ce(&self, node: NodeIndex) -> bool {
        match self.nodes.aux(node) {
            NodeAux::RegField { is_ce_packet } => is_ce_packet,
            aux => panic!("node {node} is not a reg/field node (aux: {aux:?})"),
        }
    }

    pub fn sync_type(&self, node: NodeIndex) -> SyncType {
        match self.nodes.aux(node) {
            NodeAux::Sync { sync_type, .. } => sync_type,
            aux => panic!("node {node} is not a sync node (aux: {aux:?})"),
        }
    }

    pub fn sync_info(&self, node: NodeIndex) -> u32 {
        match self.nodes.aux(node) {
            NodeAux::Sync { sync_info, .. } => sync_info,
            aux => panic!("node {node} is not a sync node (aux: {aux:?})"),
        }
    }
}

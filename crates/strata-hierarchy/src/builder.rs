//! Emulator-driven construction of a [`CommandHierarchy`].
//!
//! [`HierarchyBuilder`] receives the PM4 walk callbacks and records nodes
//! plus per-view pending adjacency. The pending tables are plain
//! `Vec<Vec<NodeIndex>>`s so edges can be appended out of order and the
//! submit view's IB children re-sorted at submit close; [`finish`] derives
//! the projected views and compresses everything into frozen [`Topology`]
//! instances.
//!
//! [`finish`]: HierarchyBuilder::finish

use std::collections::HashMap;

use strata_capture::{
    Capture, EngineType, IndirectBufferInfo, MemoryView, PresentInfo, QueueType, SubmitInfo,
    VecMemoryView,
};
use strata_pm4::catalog::{PacketCatalog, PacketInfo, RegField};
use strata_pm4::packet::{is_draw_dispatch_dma, opcodes, Pm4Type, SyncType, Type4Header, Type7Header, NO_OPCODE};
use strata_pm4::{EmulateError, EmulatorHandler, IbType, Pm4Emulator};
use thiserror::Error;

use crate::hierarchy::{CommandHierarchy, ViewKind};
use crate::node::{MarkerKind, NodeAux, NodeStore, NodeType};
use crate::topology::{NodeIndex, Topology, NONE, ROOT};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to decode command stream: {0}")]
    Decode(#[from] EmulateError),

    #[error("no packet schema for opcode 0x{opcode:02x}")]
    CatalogMiss { opcode: u8 },

    #[error("engine type {engine_type:?} does not carry a decodable command stream")]
    UnsupportedEngine { engine_type: EngineType },
}

/// Builds the full hierarchy for a capture.
pub fn create_trees(
    capture: &Capture,
    catalog: &dyn PacketCatalog,
    flatten_chain_nodes: bool,
) -> Result<CommandHierarchy, BuildError> {
    let mut builder = HierarchyBuilder::new(catalog, flatten_chain_nodes, &EngineType::ALL);
    builder.set_metadata_version(capture.metadata_version());
    builder.set_presents((0..capture.num_presents()).map(|i| *capture.present_info(i)).collect());

    let emulator = Pm4Emulator::new();
    for submit_index in 0..capture.num_submits() {
        let submit = capture.submit_info(submit_index);
        builder.on_submit_start(submit_index, submit);

        // Dummy submits and non-decodable engines keep their submit node but
        // are not walked.
        if submit.is_dummy() || !submit.engine_type().is_decodable() {
            builder.on_submit_end(submit_index, submit);
            continue;
        }

        tracing::debug!(
            submit_index,
            num_ibs = submit.num_indirect_buffers(),
            "walking submit"
        );
        if let Err(err) = emulator.execute_submit(
            &mut builder,
            capture.memory(),
            submit_index,
            submit.indirect_buffers(),
        ) {
            return Err(builder.take_error(err));
        }
        builder.on_submit_end(submit_index, submit);
    }

    Ok(builder.finish())
}

/// Builds a hierarchy for a single raw command stream.
///
/// The stream is wrapped in a synthetic single-submit capture whose address
/// space is the buffer itself (addresses are offsets). No presents, no
/// marker data; chain flattening is forced off.
pub fn create_trees_from_stream(
    command_dwords: &[u32],
    engine_type: EngineType,
    queue_type: QueueType,
    catalog: &dyn PacketCatalog,
) -> Result<CommandHierarchy, BuildError> {
    let mem = VecMemoryView::from_dwords(command_dwords);
    let ib = IndirectBufferInfo {
        va_addr: 0,
        size_in_dwords: command_dwords.len() as u32,
        skip: false,
    };
    let submit = SubmitInfo::new(engine_type, queue_type, 0, false, vec![ib]);

    let mut builder = HierarchyBuilder::new(catalog, false, &[engine_type]);
    builder.on_submit_start(0, &submit);

    if !engine_type.is_decodable() {
        return Err(BuildError::UnsupportedEngine { engine_type });
    }

    let emulator = Pm4Emulator::new();
    if let Err(err) = emulator.execute_submit(&mut builder, &mem, 0, submit.indirect_buffers()) {
        return Err(builder.take_error(err));
    }
    builder.on_submit_end(0, &submit);

    Ok(builder.finish())
}

/// Per-view pending adjacency: primary and shared child lists per node.
#[derive(Debug, Default)]
struct PendingView {
    children: Vec<Vec<NodeIndex>>,
    shared: Vec<Vec<NodeIndex>>,
}

impl PendingView {
    fn add_node(&mut self) {
        self.children.push(Vec::new());
        self.shared.push(Vec::new());
    }
}

/// Run of packets seen since the last event boundary.
#[derive(Debug, Default)]
struct PacketRun {
    opcodes: Vec<Option<u8>>,
    addrs: Vec<u64>,
    nodes: Vec<NodeIndex>,
}

impl PacketRun {
    fn push(&mut self, opcode: Option<u8>, addr: u64, node: NodeIndex) {
        self.opcodes.push(opcode);
        self.addrs.push(addr);
        self.nodes.push(node);
    }

    fn clear(&mut self) {
        self.opcodes.clear();
        self.addrs.clear();
        self.nodes.clear();
    }

    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Views that carry field/register children of packet nodes.
const PACKET_DETAIL_VIEWS: [ViewKind; 4] = [
    ViewKind::Engine,
    ViewKind::Submit,
    ViewKind::AllEvent,
    ViewKind::Rgp,
];

pub struct HierarchyBuilder<'a> {
    catalog: &'a dyn PacketCatalog,
    flatten_chain_nodes: bool,

    nodes: NodeStore,
    pending: [PendingView; ViewKind::COUNT],
    engine_nodes: Vec<(EngineType, NodeIndex)>,
    presents: Vec<PresentInfo>,
    metadata_version: u32,

    cur_submit: NodeIndex,
    num_events: u32,
    ib_stack: Vec<NodeIndex>,
    packets: PacketRun,
    marker_stack: Vec<NodeIndex>,
    internal_marker_stack: Vec<NodeIndex>,
    cmd_begin_packets: Vec<NodeIndex>,
    cmd_begin_events: Vec<NodeIndex>,
    event_parent_info: HashMap<(ViewKind, NodeIndex), NodeIndex>,

    pending_error: Option<BuildError>,
}

impl<'a> HierarchyBuilder<'a> {
    /// Creates a builder seeded with the root node and one engine node per
    /// entry of `engines`, attached under root in the engine view.
    pub fn new(
        catalog: &'a dyn PacketCatalog,
        flatten_chain_nodes: bool,
        engines: &[EngineType],
    ) -> Self {
        let mut builder = Self {
            catalog,
            flatten_chain_nodes,
            nodes: NodeStore::default(),
            pending: Default::default(),
            engine_nodes: Vec::new(),
            presents: Vec::new(),
            metadata_version: 0,
            cur_submit: NONE,
            num_events: 0,
            ib_stack: Vec::new(),
            packets: PacketRun::default(),
            marker_stack: Vec::new(),
            internal_marker_stack: Vec::new(),
            cmd_begin_packets: Vec::new(),
            cmd_begin_events: Vec::new(),
            event_parent_info: HashMap::new(),
            pending_error: None,
        };

        let root = builder.add_node(NodeType::Root, "", NodeAux::None, &[]);
        assert_eq!(root, ROOT);
        for &engine_type in engines {
            let node = builder.add_node(NodeType::Engine, engine_type.name(), NodeAux::None, &[]);
            builder.add_child(ViewKind::Engine, ROOT, node);
            builder.engine_nodes.push((engine_type, node));
        }
        builder
    }

    pub fn set_presents(&mut self, presents: Vec<PresentInfo>) {
        self.presents = presents;
    }

    pub fn set_metadata_version(&mut self, version: u32) {
        self.metadata_version = version;
    }

    /// Opens a submit: creates its node and attaches it under the matching
    /// engine node (engine view) and under root (all other primary views).
    pub fn on_submit_start(&mut self, submit_index: u32, submit: &SubmitInfo) {
        let desc = format!(
            "Submit: {}, Num IBs: {}, Engine: {}, Queue: {}, Engine Index: {}, Dummy Submit: {}",
            submit_index,
            submit.num_indirect_buffers(),
            submit.engine_type().name(),
            submit.queue_type().name(),
            submit.engine_index(),
            submit.is_dummy() as u32,
        );
        let aux = NodeAux::Submit {
            engine_type: submit.engine_type(),
            submit_index,
        };
        let submit_node = self.add_node(NodeType::Submit, desc, aux, &[]);

        let engine_node = self.engine_node(submit.engine_type());
        self.add_child(ViewKind::Engine, engine_node, submit_node);
        self.add_child(ViewKind::Submit, ROOT, submit_node);
        self.add_child(ViewKind::AllEvent, ROOT, submit_node);
        self.add_child(ViewKind::Rgp, ROOT, submit_node);
        self.cur_submit = submit_node;
    }

    /// Closes a submit: sorts the submit view's IB children by ib-index,
    /// normalizes residual state into a postamble node, drops unmatched
    /// markers, and attaches any presents recorded after this submit.
    pub fn on_submit_end(&mut self, submit_index: u32, _submit: &SubmitInfo) {
        // IBs were inserted in emulation order; the submit view presents
        // them in ib-index order. Stable sort keeps insertion order for
        // equal indices.
        let submit_slot = self.cur_submit as usize;
        let mut children =
            std::mem::take(&mut self.pending[ViewKind::Submit.index()].children[submit_slot]);
        children.sort_by_key(|&child| match self.nodes.aux(child) {
            NodeAux::Ib { ib_index, .. } => ib_index,
            aux => panic!("submit-view child is not an IB node (aux: {aux:?})"),
        });
        self.pending[ViewKind::Submit.index()].children[submit_slot] = children;

        // Unmatched begin markers at end-of-submit are dropped silently.
        self.marker_stack.clear();
        self.internal_marker_stack.clear();

        if !self.packets.is_empty() {
            let title = if self.pending[ViewKind::AllEvent.index()].children[submit_slot].is_empty()
            {
                "Postamble State"
            } else {
                "State"
            };
            let postamble = self.add_node(NodeType::PostambleState, title, NodeAux::None, &[]);

            let run = std::mem::take(&mut self.packets.nodes);
            for &packet in &run {
                self.add_shared_child(ViewKind::AllEvent, postamble, packet);
                self.add_shared_child(ViewKind::Rgp, postamble, packet);
            }
            self.packets.clear();

            self.add_child(ViewKind::AllEvent, self.cur_submit, postamble);
            self.add_child(ViewKind::Rgp, self.cur_submit, postamble);
        }

        let presents: Vec<(usize, PresentInfo)> = self
            .presents
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| p.submit_index == submit_index)
            .collect();
        for (present_index, present) in presents {
            let desc = match present.surface {
                Some(surface) => format!(
                    "Present: {}, FullScreen: {}, Engine: {}, Queue: {}, SurfaceAddr: 0x{:x}, SurfaceSize: {}",
                    present_index,
                    surface.full_screen as u32,
                    surface.engine_type.name(),
                    surface.queue_type.name(),
                    surface.surface_addr,
                    surface.surface_size,
                ),
                None => format!("Present: {present_index}"),
            };
            let node = self.add_node(NodeType::Present, desc, NodeAux::None, &[]);
            self.add_child(ViewKind::AllEvent, ROOT, node);
            self.add_child(ViewKind::Rgp, ROOT, node);
        }

        self.cur_submit = NONE;
        self.ib_stack.clear();
    }

    /// Freezes all pending adjacency into topologies, deriving the two
    /// projected views first.
    pub fn finish(mut self) -> CommandHierarchy {
        self.project_vulkan_call();
        self.project_vulkan_event();

        let num_nodes = self.nodes.len();
        let mut topologies: [Topology; ViewKind::COUNT] = Default::default();
        for view in ViewKind::ALL {
            let pending = &self.pending[view.index()];
            let topology = &mut topologies[view.index()];
            topology.set_size(num_nodes);
            for node in 0..num_nodes {
                topology.add_children(node, &pending.children[node as usize]);
                topology.add_shared_children(node, &pending.shared[node as usize]);
            }
        }

        self.event_parent_info.clear();
        CommandHierarchy::new(self.nodes, topologies, self.metadata_version)
    }

    fn take_error(&mut self, err: EmulateError) -> BuildError {
        self.pending_error.take().unwrap_or(BuildError::Decode(err))
    }

    fn add_node(
        &mut self,
        node_type: NodeType,
        desc: impl Into<String>,
        aux: NodeAux,
        metadata: &[u8],
    ) -> NodeIndex {
        let index = self.nodes.add(node_type, desc, aux, metadata);
        for pending in &mut self.pending {
            debug_assert_eq!(pending.children.len() as u64, index);
            pending.add_node();
        }
        index
    }

    fn add_child(&mut self, view: ViewKind, parent: NodeIndex, child: NodeIndex) {
        self.pending[view.index()].children[parent as usize].push(child);
    }

    fn add_shared_child(&mut self, view: ViewKind, parent: NodeIndex, child: NodeIndex) {
        self.pending[view.index()].shared[parent as usize].push(child);
    }

    fn engine_node(&self, engine_type: EngineType) -> NodeIndex {
        self.engine_nodes
            .iter()
            .find(|(et, _)| *et == engine_type)
            .map(|(_, node)| *node)
            .unwrap_or_else(|| panic!("no engine node for {engine_type:?}"))
    }

    fn ib_type_of(&self, node: NodeIndex) -> IbType {
        match self.nodes.aux(node) {
            NodeAux::Ib { ib_type, .. } => ib_type,
            aux => panic!("node {node} is not an IB node (aux: {aux:?})"),
        }
    }

    /// Classifies the buffered packet run as a synchronization event.
    ///
    /// Always [`SyncType::None`] until a catalog-driven classifier for the
    /// sync packet patterns is specified.
    fn detect_sync(&self, _mem: &dyn MemoryView, _submit_index: u32) -> SyncType {
        SyncType::None
    }

    /// Creates a packet node with its field/register children. Returns the
    /// build error to surface when the catalog or the capture memory cannot
    /// describe the packet.
    fn add_packet_node(
        &mut self,
        mem: &dyn MemoryView,
        submit_index: u32,
        va: u64,
        is_ce_packet: bool,
        pm4_type: Pm4Type,
        header: u32,
    ) -> Result<NodeIndex, BuildError> {
        let catalog = self.catalog;
        match pm4_type {
            Pm4Type::Type7 => {
                let type7 = Type7Header::decode(header)
                    .expect("emulator reported a type-7 packet without a type-7 header");
                let name = catalog
                    .opcode_name(type7.opcode)
                    .ok_or(BuildError::CatalogMiss {
                        opcode: type7.opcode,
                    })?;
                let info = catalog
                    .packet_info(type7.opcode)
                    .ok_or(BuildError::CatalogMiss {
                        opcode: type7.opcode,
                    })?;

                let desc = format!("{name} 0x{header:x}");
                let aux = NodeAux::packet(va, type7.opcode, is_ce_packet);
                let packet_node = self.add_node(NodeType::Packet, desc, aux, &[]);

                self.append_packet_field_nodes(
                    mem,
                    submit_index,
                    va,
                    is_ce_packet,
                    type7,
                    info,
                    packet_node,
                )?;
                Ok(packet_node)
            }
            Pm4Type::Type4 => {
                let type4 = Type4Header::decode(header)
                    .expect("emulator reported a type-4 packet without a type-4 header");
                let desc = format!("TYPE4 REGWRITE 0x{header:x}");
                let aux = NodeAux::packet(va, NO_OPCODE, is_ce_packet);
                let packet_node = self.add_node(NodeType::Packet, desc, aux, &[]);

                self.append_reg_nodes(mem, submit_index, va, type4, packet_node)?;
                Ok(packet_node)
            }
            Pm4Type::Other => unreachable!("emulator only reports type-4/type-7 packets"),
        }
    }

    /// Decodes a type-7 payload against its catalog schema, one field node
    /// per covered bit range and raw dword nodes for any payload past the
    /// last described field.
    #[allow(clippy::too_many_arguments)]
    fn append_packet_field_nodes(
        &mut self,
        mem: &dyn MemoryView,
        submit_index: u32,
        va: u64,
        is_ce_packet: bool,
        type7: Type7Header,
        info: &PacketInfo,
        packet_node: NodeIndex,
    ) -> Result<(), BuildError> {
        let catalog = self.catalog;
        let count = u32::from(type7.count);
        let aux = NodeAux::RegField { is_ce_packet };

        let mut end_dword: Option<u32> = None;
        for field in &info.fields {
            end_dword = Some(field.dword_offset);
            // Some packets end early and do not use all schema fields.
            if field.dword_offset > count {
                break;
            }

            let dword_va = va + u64::from(field.dword_offset) * 4;
            let dword = mem
                .read_dword(submit_index, dword_va)
                .map_err(EmulateError::from)?;
            let value = (dword & field.bit_mask) >> field.bit_shift;

            let desc = match field.enum_handle.and_then(|h| catalog.enum_name(h, value)) {
                Some(enum_name) => format!("{}: {}", field.name, enum_name),
                None => format!("{}: 0x{value:x}", field.name),
            };
            let field_node = self.add_node(NodeType::Field, desc, aux, &[]);
            for view in PACKET_DETAIL_VIEWS {
                self.add_child(view, packet_node, field_node);
            }
        }

        // Payload dwords past the last described field surface as raw
        // values rather than disappearing.
        if let Some(end_dword) = end_dword {
            if end_dword < count {
                for i in end_dword + 1..=count {
                    let dword = mem
                        .read_dword(submit_index, va + u64::from(i) * 4)
                        .map_err(EmulateError::from)?;
                    let desc = format!("(DWORD {i}): 0x{dword:x}");
                    let field_node = self.add_node(NodeType::Field, desc, aux, &[]);
                    for view in PACKET_DETAIL_VIEWS {
                        self.add_child(view, packet_node, field_node);
                    }
                }
            }
        }
        Ok(())
    }

    /// Expands a type-4 register write burst: one register node per written
    /// offset, each with its decoded bit-field children.
    fn append_reg_nodes(
        &mut self,
        mem: &dyn MemoryView,
        submit_index: u32,
        va: u64,
        type4: Type4Header,
        packet_node: NodeIndex,
    ) -> Result<(), BuildError> {
        let mut reg_addr = type4.offset;
        for i in 0..u32::from(type4.count) {
            let reg_va = va + 4 + u64::from(i) * 4;
            let value = mem
                .read_dword(submit_index, reg_va)
                .map_err(EmulateError::from)?;

            let reg_node = self.add_register_node(reg_addr, value);
            for view in PACKET_DETAIL_VIEWS {
                self.add_child(view, packet_node, reg_node);
            }
            reg_addr += 1;
        }
        Ok(())
    }

    fn add_register_node(&mut self, reg_addr: u32, value: u32) -> NodeIndex {
        let catalog = self.catalog;
        let (name, fields): (&str, &[RegField]) = match catalog.reg_info(reg_addr) {
            Some(info) => (info.name.as_str(), &info.fields),
            // A miss here is survivable: the write is still shown, just
            // without field decomposition.
            None => ("Unknown", &[]),
        };

        let aux = NodeAux::RegField {
            is_ce_packet: false,
        };
        let desc = format!("{name}: 0x{value:x}");
        let reg_node = self.add_node(NodeType::Reg, desc, aux, &[]);

        for field in fields {
            let field_value = (value & field.mask) >> field.shift;
            let desc = format!("{}: 0x{field_value:x}", field.name);
            let field_node = self.add_node(NodeType::Field, desc, aux, &[]);
            for view in PACKET_DETAIL_VIEWS {
                self.add_child(view, reg_node, field_node);
            }
        }
        reg_node
    }

    /// Closes the current event run under a new event node: the buffered
    /// packets become the event's shared children, and the event parents to
    /// the innermost open marker (else the submit).
    fn close_event_run(&mut self, sync_type: SyncType, opcode: Option<u8>) {
        let event_node = if sync_type != SyncType::None {
            let desc = match sync_type {
                SyncType::None => unreachable!(),
                SyncType::WaitForIdle => "WaitForIdle",
                SyncType::CacheFlush => "CacheFlush",
                SyncType::Timestamp => "Timestamp",
            };
            self.num_events += 1;
            self.add_node(
                NodeType::Sync,
                desc,
                NodeAux::Sync {
                    sync_type,
                    sync_info: 0,
                },
                &[],
            )
        } else {
            let opcode = opcode.expect("draw/dispatch events always carry an opcode");
            let desc = draw_event_description(opcode);
            let event_id = self.num_events;
            self.num_events += 1;
            self.add_node(NodeType::DrawDispatchDma, desc, NodeAux::Event { event_id }, &[])
        };
        self.nodes.append_event_index(event_node);
        self.cmd_begin_events.push(event_node);

        let run = std::mem::take(&mut self.packets.nodes);
        for &packet in &run {
            self.add_shared_child(ViewKind::AllEvent, event_node, packet);
            self.add_shared_child(ViewKind::Rgp, event_node, packet);
        }
        self.packets.clear();

        let mut parent = self.marker_stack.last().copied().unwrap_or(self.cur_submit);
        self.add_child(ViewKind::AllEvent, parent, event_node);
        self.event_parent_info
            .insert((ViewKind::AllEvent, event_node), parent);

        if let Some(&top) = self.internal_marker_stack.last() {
            parent = top;
        }
        self.add_child(ViewKind::Rgp, parent, event_node);
        self.event_parent_info
            .insert((ViewKind::Rgp, event_node), parent);
    }

    // ----- projection post-pass ---------------------------------------------

    /// The call view drops event, postamble, and barrier-marker nodes from
    /// the event view; shared children carry over verbatim.
    fn vulkan_call_filters_out(&self, node: NodeIndex) -> bool {
        match self.nodes.node_type(node) {
            NodeType::DrawDispatchDma | NodeType::Sync | NodeType::PostambleState => true,
            NodeType::Marker => matches!(
                self.nodes.aux(node),
                NodeAux::Marker {
                    kind: MarkerKind::Barrier,
                    ..
                }
            ),
            _ => false,
        }
    }

    fn project_vulkan_call(&mut self) {
        let num_nodes = self.nodes.len();
        for node in 0..num_nodes {
            if self.vulkan_call_filters_out(node) {
                continue;
            }
            let kept: Vec<NodeIndex> = self.pending[ViewKind::AllEvent.index()].children
                [node as usize]
                .iter()
                .copied()
                .filter(|&child| !self.vulkan_call_filters_out(child))
                .collect();
            self.pending[ViewKind::VulkanCall.index()].children[node as usize] = kept;

            let shared = self.pending[ViewKind::AllEvent.index()].shared[node as usize].clone();
            self.pending[ViewKind::VulkanCall.index()].shared[node as usize] = shared;
        }
    }

    /// The event view drops non-event API markers from the call view. A
    /// skipped marker's shared children accumulate onto the next retained
    /// sibling — unless that sibling is not an API event either, in which
    /// case the accumulation is discarded rather than misattributed.
    fn project_vulkan_event(&mut self) {
        let num_nodes = self.nodes.len();
        for node in 0..num_nodes {
            if self.is_non_event_api_marker(node) {
                continue;
            }
            let children = self.pending[ViewKind::VulkanCall.index()].children[node as usize].clone();
            let mut acc_shared: Vec<NodeIndex> = Vec::new();
            for child in children {
                let shared =
                    self.pending[ViewKind::VulkanCall.index()].shared[child as usize].clone();
                acc_shared.extend_from_slice(&shared);
                if self.is_non_event_api_marker(child) {
                    continue;
                }
                if !self.is_event_api_marker(child) {
                    acc_shared.clear();
                }
                self.pending[ViewKind::VulkanEvent.index()].children[node as usize].push(child);
                let assigned = if acc_shared.is_empty() {
                    shared
                } else {
                    std::mem::take(&mut acc_shared)
                };
                self.pending[ViewKind::VulkanEvent.index()].shared[child as usize] = assigned;
                acc_shared.clear();
            }
        }
    }

    fn marker_api_call_id(&self, node: NodeIndex) -> Option<u32> {
        match (self.nodes.node_type(node), self.nodes.aux(node)) {
            (
                NodeType::Marker,
                NodeAux::Marker {
                    kind: MarkerKind::ApiMetadata,
                    id,
                },
            ) => Some(id),
            _ => None,
        }
    }

    fn is_event_api_marker(&self, node: NodeIndex) -> bool {
        self.marker_api_call_id(node).is_some_and(is_event_api_call)
    }

    fn is_non_event_api_marker(&self, node: NodeIndex) -> bool {
        self.marker_api_call_id(node)
            .is_some_and(|id| !is_event_api_call(id))
    }
}

impl EmulatorHandler for HierarchyBuilder<'_> {
    fn on_ib_start(
        &mut self,
        _submit_index: u32,
        ib_index: u32,
        ib: &IndirectBufferInfo,
        kind: IbType,
    ) -> bool {
        debug_assert_ne!(self.cur_submit, NONE);

        let label = match kind {
            IbType::Normal => format!("IB: {ib_index}"),
            IbType::Call => "Call IB".to_string(),
            IbType::Chain => "Chain IB".to_string(),
        };
        let mut desc = format!(
            "{label}, Address: 0x{:x}, Size (DWORDS): {}",
            ib.va_addr, ib.size_in_dwords
        );
        if ib.skip {
            desc.push_str(", NOT CAPTURED");
        }

        let aux = NodeAux::ib(kind, ib_index, ib.size_in_dwords, !ib.skip);
        let ib_node = self.add_node(NodeType::Ib, desc, aux, &[]);

        let mut parent = self.ib_stack.last().copied().unwrap_or(self.cur_submit);
        if self.flatten_chain_nodes && kind == IbType::Chain {
            // Chains do not nest on the hardware either; parent to the
            // nearest enclosing non-chain IB.
            for &node in self.ib_stack.iter().rev() {
                if self.ib_type_of(node) != IbType::Chain {
                    parent = node;
                    break;
                }
            }
        }
        self.add_child(ViewKind::Engine, parent, ib_node);
        self.add_child(ViewKind::Submit, parent, ib_node);

        self.ib_stack.push(ib_node);
        self.cmd_begin_packets.clear();
        self.cmd_begin_events.clear();
        true
    }

    fn on_packet(
        &mut self,
        mem: &dyn MemoryView,
        submit_index: u32,
        _ib_index: u32,
        va: u64,
        pm4_type: Pm4Type,
        header: u32,
    ) -> bool {
        let packet_node = match self.add_packet_node(mem, submit_index, va, false, pm4_type, header)
        {
            Ok(node) => node,
            Err(err) => {
                self.pending_error = Some(err);
                return false;
            }
        };

        self.add_shared_child(ViewKind::Engine, self.cur_submit, packet_node);
        self.add_shared_child(ViewKind::Submit, self.cur_submit, packet_node);
        self.add_shared_child(ViewKind::AllEvent, self.cur_submit, packet_node);
        self.add_shared_child(ViewKind::Rgp, self.cur_submit, packet_node);

        let ib_top = *self
            .ib_stack
            .last()
            .expect("packet reported outside any indirect buffer");
        self.add_shared_child(ViewKind::Engine, ib_top, packet_node);
        self.add_shared_child(ViewKind::Submit, ib_top, packet_node);

        let opcode = match pm4_type {
            Pm4Type::Type7 => Some(((header >> 16) & 0x7f) as u8),
            _ => None,
        };
        self.packets.push(opcode, va, packet_node);
        self.cmd_begin_packets.push(packet_node);

        let sync_type = self.detect_sync(mem, submit_index);
        let is_event = opcode.map(is_draw_dispatch_dma).unwrap_or(false);
        if sync_type != SyncType::None || is_event {
            self.close_event_run(sync_type, opcode);
        } else {
            // State packets also surface under every open marker range.
            let markers: Vec<NodeIndex> = self.marker_stack.clone();
            for marker in markers {
                self.add_shared_child(ViewKind::AllEvent, marker, packet_node);
            }
            let markers: Vec<NodeIndex> = self.internal_marker_stack.clone();
            for marker in markers {
                self.add_shared_child(ViewKind::Rgp, marker, packet_node);
            }
        }
        true
    }

    fn on_ib_end(&mut self, _submit_index: u32, _ib_index: u32, _ib: &IndirectBufferInfo) -> bool {
        // The emulator reports one end for an entire chain run; pop every
        // consecutive chain entry before the IB that started the run.
        debug_assert!(!self.ib_stack.is_empty());
        while self
            .ib_stack
            .last()
            .is_some_and(|&top| self.ib_type_of(top) == IbType::Chain)
        {
            self.ib_stack.pop();
        }
        self.ib_stack
            .pop()
            .expect("indirect-buffer stack underflow");

        self.cmd_begin_packets.clear();
        self.cmd_begin_events.clear();
        true
    }
}

fn draw_event_description(opcode: u8) -> &'static str {
    match opcode {
        opcodes::CP_DRAW_INDX_OFFSET => "DrawIndexOffset",
        opcodes::CP_DRAW_INDIRECT => "DrawIndirect",
        opcodes::CP_DRAW_INDX_INDIRECT => "DrawIndexIndirect",
        opcodes::CP_DRAW_INDIRECT_MULTI => "DrawIndirectMulti",
        opcodes::CP_DRAW_AUTO => "DrawAuto",
        _ => unreachable!("opcode 0x{opcode:02x} is not a draw/dispatch/DMA event"),
    }
}

// API-call markers split into calls that produce events on the GPU timeline
// (draws, dispatches, copies, clears, barriers) and state-setting calls that
// do not.
// TODO: route this through the capture layer's call-id table once API-call
// markers are injected during the walk.
fn is_event_api_call(_call_id: u32) -> bool {
    false
}

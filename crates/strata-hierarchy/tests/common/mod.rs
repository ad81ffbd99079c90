//! Shared fixtures: a hand-built packet catalog, PM4 stream builders, and
//! structural checks used across the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;

use strata_capture::{
    Capture, EngineType, IndirectBufferInfo, QueueType, SubmitInfo, VecMemoryView,
};
use strata_hierarchy::{CommandHierarchy, NodeIndex, NodeType, Topology, ViewKind, NONE, ROOT};
use strata_pm4::packet::opcodes;
use strata_pm4::{PacketField, StaticCatalog, Type4Header, Type7Header};

pub const GRAS_CL_CLIP_CNTL: u32 = 0x8000;

pub fn pkt7(opcode: u8, count: u16) -> u32 {
    Type7Header { opcode, count }.encode()
}

pub fn pkt4(offset: u32, count: u8) -> u32 {
    Type4Header { offset, count }.encode()
}

fn field(
    name: &str,
    dword_offset: u32,
    bit_mask: u32,
    bit_shift: u32,
    enum_handle: Option<u32>,
) -> PacketField {
    PacketField {
        name: name.to_string(),
        dword_offset,
        bit_mask,
        bit_shift,
        enum_handle,
    }
}

/// Catalog covering the opcodes the tests emit.
pub fn test_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();

    let prim_type = catalog.add_enum([
        (0, "POINTLIST".to_string()),
        (1, "LINELIST".to_string()),
        (4, "TRILIST".to_string()),
    ]);

    catalog.add_packet(opcodes::CP_NOP, "CP_NOP", vec![]);
    catalog.add_packet(opcodes::CP_DRAW_AUTO, "CP_DRAW_AUTO", vec![]);
    catalog.add_packet(
        opcodes::CP_DRAW_INDX_OFFSET,
        "CP_DRAW_INDX_OFFSET",
        vec![
            field("PRIM_TYPE", 1, 0x0000_003f, 0, Some(prim_type)),
            field("SOURCE_SELECT", 1, 0x0000_00c0, 6, None),
            field("NUM_INDICES", 2, 0xffff_ffff, 0, None),
        ],
    );

    let transfer_fields = vec![
        field("IB_BASE_LO", 1, 0xffff_ffff, 0, None),
        field("IB_BASE_HI", 2, 0xffff_ffff, 0, None),
        field("IB_SIZE", 3, 0x000f_ffff, 0, None),
    ];
    catalog.add_packet(
        opcodes::CP_INDIRECT_BUFFER,
        "CP_INDIRECT_BUFFER",
        transfer_fields.clone(),
    );
    catalog.add_packet(
        opcodes::CP_INDIRECT_BUFFER_CHAIN,
        "CP_INDIRECT_BUFFER_CHAIN",
        transfer_fields,
    );

    catalog.add_reg(
        GRAS_CL_CLIP_CNTL,
        "GRAS_CL_CLIP_CNTL",
        vec![
            strata_pm4::RegField {
                name: "CLIP_DISABLE".to_string(),
                mask: 0x1,
                shift: 0,
            },
            strata_pm4::RegField {
                name: "ZNEAR_CLIP_DISABLE".to_string(),
                mask: 0x2,
                shift: 1,
            },
        ],
    );

    catalog
}

pub fn ib(va_addr: u64, size_in_dwords: u32) -> IndirectBufferInfo {
    IndirectBufferInfo {
        va_addr,
        size_in_dwords,
        skip: false,
    }
}

/// Single-submit capture on the universal engine whose address space is the
/// given dword buffer.
pub fn capture_from_dwords(dwords: &[u32], ibs: Vec<IndirectBufferInfo>) -> Capture {
    let submit = SubmitInfo::new(EngineType::Universal, QueueType::Universal, 0, false, ibs);
    Capture::new(Box::new(VecMemoryView::from_dwords(dwords)), vec![submit])
}

pub fn nodes_of_type(hierarchy: &CommandHierarchy, node_type: NodeType) -> Vec<NodeIndex> {
    (0..hierarchy.num_nodes())
        .filter(|&node| hierarchy.node_type(node) == node_type)
        .collect()
}

pub fn primary_children(topology: &Topology, node: NodeIndex) -> Vec<NodeIndex> {
    (0..topology.num_children(node))
        .map(|i| topology.child_at(node, i))
        .collect()
}

pub fn shared_children(topology: &Topology, node: NodeIndex) -> Vec<NodeIndex> {
    (0..topology.num_shared_children(node))
        .map(|i| topology.shared_child_at(node, i))
        .collect()
}

/// Pre-order sequence of the primary tree.
pub fn preorder(topology: &Topology) -> Vec<NodeIndex> {
    let mut order = vec![ROOT];
    let mut node = ROOT;
    loop {
        node = topology.next_in_preorder(node);
        if node == NONE {
            break;
        }
        order.push(node);
    }
    order
}

/// Every node with a primary parent must appear at its recorded child
/// position in that parent's child list.
pub fn check_parent_back_links(topology: &Topology) {
    for node in 0..topology.num_nodes() {
        let parent = topology.parent_of(node);
        if parent == NONE {
            continue;
        }
        let child_index = topology.child_index_of(node);
        assert_ne!(child_index, NONE);
        assert_eq!(
            topology.child_at(parent, child_index),
            node,
            "node {node} missing from parent {parent} at child index {child_index}"
        );
    }
}

/// Nodes reachable from root following both primary and shared edges.
pub fn reachable_from_root(topology: &Topology) -> HashSet<NodeIndex> {
    let mut seen = HashSet::from([ROOT]);
    let mut stack = vec![ROOT];
    while let Some(node) = stack.pop() {
        for child in primary_children(topology, node)
            .into_iter()
            .chain(shared_children(topology, node))
        {
            if seen.insert(child) {
                stack.push(child);
            }
        }
    }
    seen
}

/// Checks the structural guarantees that must hold for every successful
/// build, regardless of stream content.
pub fn check_build_invariants(hierarchy: &CommandHierarchy) {
    let num_nodes = hierarchy.num_nodes();

    for view in ViewKind::ALL {
        let topology = hierarchy.topology(view);
        // Node indices are shared across views.
        assert_eq!(topology.num_nodes(), num_nodes);
        check_parent_back_links(topology);
    }

    // The raw views cover every node that belongs to them: everything
    // except the synthetic event-view node types (and, in the submit view,
    // the engine grouping nodes).
    for view in [ViewKind::Engine, ViewKind::Submit] {
        let reachable = reachable_from_root(hierarchy.topology(view));
        for node in 0..num_nodes {
            let node_type = hierarchy.node_type(node);
            let expected = !matches!(
                node_type,
                NodeType::DrawDispatchDma
                    | NodeType::Sync
                    | NodeType::PostambleState
                    | NodeType::Present
                    | NodeType::Marker
            ) && !(view == ViewKind::Submit && node_type == NodeType::Engine);
            assert_eq!(
                reachable.contains(&node),
                expected,
                "node {node} ({node_type:?}) reachability in {view:?}"
            );
        }
    }

    // Submit-view IB children are sorted by ib-index.
    for submit in nodes_of_type(hierarchy, NodeType::Submit) {
        let children = primary_children(hierarchy.submit_topology(), submit);
        let indices: Vec<u8> = children.iter().map(|&c| hierarchy.ib_index(c)).collect();
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(indices, sorted, "submit {submit} IB children out of order");
    }

    // The event list is ascending and matches the event-typed nodes in
    // creation order.
    let events: Vec<NodeIndex> = (0..num_nodes)
        .filter(|&node| {
            matches!(
                hierarchy.node_type(node),
                NodeType::DrawDispatchDma | NodeType::Sync
            )
        })
        .collect();
    assert_eq!(hierarchy.event_node_indices(), events.as_slice());
    for (rank, &event) in events.iter().enumerate() {
        assert_eq!(hierarchy.event_index(event), rank + 1);
    }

    // In the event view, each packet is owned by exactly one event or
    // postamble node.
    let mut owners: Vec<u32> = vec![0; num_nodes as usize];
    for node in 0..num_nodes {
        if matches!(
            hierarchy.node_type(node),
            NodeType::DrawDispatchDma | NodeType::Sync | NodeType::PostambleState
        ) {
            for shared in shared_children(hierarchy.all_event_topology(), node) {
                owners[shared as usize] += 1;
            }
        }
    }
    for node in 0..num_nodes {
        if hierarchy.node_type(node) == NodeType::Packet {
            assert_eq!(
                owners[node as usize], 1,
                "packet {node} owned by {} event/postamble nodes",
                owners[node as usize]
            );
        }
    }

    // The call view never contains filtered node types.
    for node in 0..num_nodes {
        for child in primary_children(hierarchy.vulkan_call_topology(), node) {
            assert!(
                !matches!(
                    hierarchy.node_type(child),
                    NodeType::DrawDispatchDma | NodeType::Sync | NodeType::PostambleState
                ),
                "filtered node {child} survived in the call view"
            );
        }
    }
}

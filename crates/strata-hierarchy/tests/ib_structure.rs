//! Indirect-buffer structure: nesting, call/chain transfers, ib-index
//! ordering, and skip handling.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use strata_capture::{
    Capture, EngineType, IndirectBufferInfo, QueueType, SubmitInfo, VecMemoryView,
};
use strata_hierarchy::{create_trees, HierarchyBuilder, NodeType, ROOT};
use strata_pm4::packet::opcodes;
use strata_pm4::{EmulatorHandler, IbType, Pm4Type};

/// IB0 chains to IB1 which chains to IB2 (terminal).
fn chained_capture() -> Capture {
    let dwords = [
        pkt7(opcodes::CP_INDIRECT_BUFFER_CHAIN, 3),
        8 * 4,
        0,
        4,
        0,
        0,
        0,
        0,
        pkt7(opcodes::CP_INDIRECT_BUFFER_CHAIN, 3), // IB1 at 0x20
        16 * 4,
        0,
        1,
        0,
        0,
        0,
        0,
        pkt7(opcodes::CP_NOP, 0), // IB2 at 0x40
    ];
    capture_from_dwords(&dwords, vec![ib(0, 4)])
}

#[test]
fn chain_run_nests_without_flattening() {
    let catalog = test_catalog();
    let hierarchy = create_trees(&chained_capture(), &catalog, false).expect("build failed");

    let ibs = nodes_of_type(&hierarchy, NodeType::Ib);
    assert_eq!(ibs.len(), 3);
    let (ib0, ib1, ib2) = (ibs[0], ibs[1], ibs[2]);
    assert_eq!(hierarchy.ib_type(ib0), IbType::Normal);
    assert_eq!(hierarchy.ib_type(ib1), IbType::Chain);
    assert_eq!(hierarchy.ib_type(ib2), IbType::Chain);

    assert_eq!(hierarchy.desc(ib0), "IB: 0, Address: 0x0, Size (DWORDS): 4");
    assert_eq!(
        hierarchy.desc(ib1),
        "Chain IB, Address: 0x20, Size (DWORDS): 4"
    );
    assert_eq!(
        hierarchy.desc(ib2),
        "Chain IB, Address: 0x40, Size (DWORDS): 1"
    );

    // Each chain nests under its predecessor.
    let engine = hierarchy.engine_topology();
    let submit = nodes_of_type(&hierarchy, NodeType::Submit)[0];
    assert_eq!(primary_children(engine, submit), vec![ib0]);
    assert_eq!(primary_children(engine, ib0), vec![ib1]);
    assert_eq!(primary_children(engine, ib1), vec![ib2]);

    // Every packet is shared under both its buffer and the submit.
    let packets = nodes_of_type(&hierarchy, NodeType::Packet);
    assert_eq!(packets.len(), 3);
    assert_eq!(shared_children(engine, ib0), vec![packets[0]]);
    assert_eq!(shared_children(engine, ib1), vec![packets[1]]);
    assert_eq!(shared_children(engine, ib2), vec![packets[2]]);
    assert_eq!(shared_children(engine, submit), packets);

    check_build_invariants(&hierarchy);
}

#[test]
fn chain_run_flattens_onto_nearest_non_chain_ancestor() {
    let catalog = test_catalog();
    let hierarchy = create_trees(&chained_capture(), &catalog, true).expect("build failed");

    let ibs = nodes_of_type(&hierarchy, NodeType::Ib);
    let (ib0, ib1, ib2) = (ibs[0], ibs[1], ibs[2]);

    let engine = hierarchy.engine_topology();
    assert_eq!(primary_children(engine, ib0), vec![ib1, ib2]);
    assert_eq!(primary_children(engine, ib1), Vec::<u64>::new());

    let submit_view = hierarchy.submit_topology();
    assert_eq!(primary_children(submit_view, ib0), vec![ib1, ib2]);

    check_build_invariants(&hierarchy);
}

#[test]
fn call_transfer_returns_to_the_caller() {
    let dwords = [
        pkt7(opcodes::CP_INDIRECT_BUFFER, 3),
        8 * 4,
        0,
        1,
        pkt7(opcodes::CP_NOP, 0), // resumes here after the call
        0,
        0,
        0,
        pkt7(opcodes::CP_NOP, 0), // call target at 0x20
    ];
    let catalog = test_catalog();
    let hierarchy =
        create_trees(&capture_from_dwords(&dwords, vec![ib(0, 5)]), &catalog, false)
            .expect("build failed");

    let ibs = nodes_of_type(&hierarchy, NodeType::Ib);
    assert_eq!(ibs.len(), 2);
    let (outer, called) = (ibs[0], ibs[1]);
    assert_eq!(hierarchy.ib_type(called), IbType::Call);
    assert_eq!(
        hierarchy.desc(called),
        "Call IB, Address: 0x20, Size (DWORDS): 1"
    );

    let engine = hierarchy.engine_topology();
    assert_eq!(primary_children(engine, outer), vec![called]);

    // Transfer packet and post-return packet belong to the outer buffer;
    // the called buffer owns only its own packet.
    let packets = nodes_of_type(&hierarchy, NodeType::Packet);
    assert_eq!(packets.len(), 3);
    assert_eq!(shared_children(engine, outer), vec![packets[0], packets[2]]);
    assert_eq!(shared_children(engine, called), vec![packets[1]]);

    check_build_invariants(&hierarchy);
}

#[test]
fn submit_view_sorts_ibs_by_index() {
    // Drive the builder seam directly so the IBs arrive out of ib-index
    // order, the way an engine-ordered walk can deliver them.
    let catalog = test_catalog();
    let mut builder = HierarchyBuilder::new(&catalog, false, &EngineType::ALL);
    let info = ib(0, 1);
    let submit = SubmitInfo::new(
        EngineType::Universal,
        QueueType::Universal,
        0,
        false,
        vec![info; 3],
    );
    let mem = VecMemoryView::from_dwords(&[pkt7(opcodes::CP_NOP, 0)]);

    builder.on_submit_start(0, &submit);
    for &ib_index in &[1u32, 0, 2] {
        assert!(builder.on_ib_start(0, ib_index, &info, IbType::Normal));
        assert!(builder.on_packet(&mem, 0, ib_index, 0, Pm4Type::Type7, pkt7(opcodes::CP_NOP, 0)));
        assert!(builder.on_ib_end(0, ib_index, &info));
    }
    builder.on_submit_end(0, &submit);
    let hierarchy = builder.finish();

    let submit_node = nodes_of_type(&hierarchy, NodeType::Submit)[0];
    let emission_order: Vec<u8> = primary_children(hierarchy.engine_topology(), submit_node)
        .iter()
        .map(|&node| hierarchy.ib_index(node))
        .collect();
    assert_eq!(emission_order, vec![1, 0, 2]);

    let sorted_order: Vec<u8> = primary_children(hierarchy.submit_topology(), submit_node)
        .iter()
        .map(|&node| hierarchy.ib_index(node))
        .collect();
    assert_eq!(sorted_order, vec![0, 1, 2]);

    check_build_invariants(&hierarchy);
}

#[test]
fn dummy_submit_keeps_its_node_but_is_not_walked() {
    let submit = SubmitInfo::new(EngineType::Universal, QueueType::Universal, 0, true, vec![]);
    let capture = Capture::new(Box::new(VecMemoryView::from_dwords(&[])), vec![submit]);
    let catalog = test_catalog();
    let hierarchy = create_trees(&capture, &catalog, false).expect("build failed");

    let submits = nodes_of_type(&hierarchy, NodeType::Submit);
    assert_eq!(submits.len(), 1);
    let submit_node = submits[0];
    assert_eq!(
        hierarchy.desc(submit_node),
        "Submit: 0, Num IBs: 0, Engine: Universal, Queue: Universal, Engine Index: 0, Dummy Submit: 1"
    );

    assert!(nodes_of_type(&hierarchy, NodeType::Ib).is_empty());
    assert!(nodes_of_type(&hierarchy, NodeType::Packet).is_empty());
    assert!(hierarchy.event_node_indices().is_empty());

    // Attached under its engine and under root, with no children anywhere.
    let engine = hierarchy.engine_topology();
    assert_eq!(engine.parent_of(submit_node), 1);
    assert_eq!(primary_children(engine, submit_node), Vec::<u64>::new());
    assert_eq!(
        primary_children(hierarchy.all_event_topology(), ROOT),
        vec![submit_node]
    );

    check_build_invariants(&hierarchy);
}

#[test]
fn non_decodable_engine_is_not_walked() {
    let dwords = [pkt7(opcodes::CP_NOP, 0)];
    let submit = SubmitInfo::new(
        EngineType::Timer,
        QueueType::Other,
        2,
        false,
        vec![ib(0, 1)],
    );
    let capture = Capture::new(
        Box::new(VecMemoryView::from_dwords(&dwords)),
        vec![submit],
    );
    let catalog = test_catalog();
    let hierarchy = create_trees(&capture, &catalog, false).expect("build failed");

    let submit_node = nodes_of_type(&hierarchy, NodeType::Submit)[0];
    assert_eq!(hierarchy.submit_engine_type(submit_node), EngineType::Timer);
    assert!(nodes_of_type(&hierarchy, NodeType::Ib).is_empty());
    assert!(nodes_of_type(&hierarchy, NodeType::Packet).is_empty());

    check_build_invariants(&hierarchy);
}

#[test]
fn uncaptured_ib_is_reported_without_packets() {
    let capture = capture_from_dwords(
        &[pkt7(opcodes::CP_NOP, 0)],
        vec![IndirectBufferInfo {
            va_addr: 0,
            size_in_dwords: 4,
            skip: true,
        }],
    );
    let catalog = test_catalog();
    let hierarchy = create_trees(&capture, &catalog, false).expect("build failed");

    let ibs = nodes_of_type(&hierarchy, NodeType::Ib);
    assert_eq!(ibs.len(), 1);
    assert_eq!(
        hierarchy.desc(ibs[0]),
        "IB: 0, Address: 0x0, Size (DWORDS): 4, NOT CAPTURED"
    );
    assert!(!hierarchy.ib_fully_captured(ibs[0]));
    assert!(nodes_of_type(&hierarchy, NodeType::Packet).is_empty());

    check_build_invariants(&hierarchy);
}

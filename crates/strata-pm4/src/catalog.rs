//! Read-only packet/register schema lookup.
//!
//! Field decode needs to know, per opcode, which named bit ranges live in
//! which payload dword, and per register offset, the register's name and bit
//! fields. Production builds load these tables from generated GPU
//! descriptions; the contract here is deliberately small so those tables
//! stay external to the analysis core.

use std::collections::HashMap;

/// One named bit range of a type-7 packet payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketField {
    pub name: String,
    /// Dword index within the packet. The header is dword 0, so payload
    /// fields start at 1.
    pub dword_offset: u32,
    pub bit_mask: u32,
    pub bit_shift: u32,
    /// When set, field values render through [`PacketCatalog::enum_name`].
    pub enum_handle: Option<u32>,
}

/// Ordered field schema of a type-7 packet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PacketInfo {
    pub fields: Vec<PacketField>,
}

/// One named bit range of a register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegField {
    pub name: String,
    pub mask: u32,
    pub shift: u32,
}

/// Name and field schema of a register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegInfo {
    pub name: String,
    pub fields: Vec<RegField>,
}

/// Opcode → packet schema, register offset → register schema, enum handle →
/// value names. Stable for the duration of a build; never mutated by the
/// analysis core.
pub trait PacketCatalog {
    fn packet_info(&self, opcode: u8) -> Option<&PacketInfo>;
    fn reg_info(&self, reg_addr: u32) -> Option<&RegInfo>;
    fn enum_name(&self, enum_handle: u32, value: u32) -> Option<&str>;
    fn opcode_name(&self, opcode: u8) -> Option<&str>;
}

/// In-memory catalog populated by hand.
///
/// Backs tests and the standalone entry point the same way production builds
/// are backed by generated tables.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    packets: HashMap<u8, (String, PacketInfo)>,
    regs: HashMap<u32, RegInfo>,
    enums: Vec<HashMap<u32, String>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a packet schema. Replaces any previous entry for `opcode`.
    pub fn add_packet(
        &mut self,
        opcode: u8,
        name: impl Into<String>,
        fields: Vec<PacketField>,
    ) -> &mut Self {
        self.packets
            .insert(opcode, (name.into(), PacketInfo { fields }));
        self
    }

    /// Registers a register schema. Replaces any previous entry for `reg_addr`.
    pub fn add_reg(
        &mut self,
        reg_addr: u32,
        name: impl Into<String>,
        fields: Vec<RegField>,
    ) -> &mut Self {
        self.regs.insert(
            reg_addr,
            RegInfo {
                name: name.into(),
                fields,
            },
        );
        self
    }

    /// Registers an enumeration and returns its handle.
    pub fn add_enum(&mut self, values: impl IntoIterator<Item = (u32, String)>) -> u32 {
        let handle = self.enums.len() as u32;
        self.enums.push(values.into_iter().collect());
        handle
    }
}

impl PacketCatalog for StaticCatalog {
    fn packet_info(&self, opcode: u8) -> Option<&PacketInfo> {
        self.packets.get(&opcode).map(|(_, info)| info)
    }

    fn reg_info(&self, reg_addr: u32) -> Option<&RegInfo> {
        self.regs.get(&reg_addr)
    }

    fn enum_name(&self, enum_handle: u32, value: u32) -> Option<&str> {
        self.enums
            .get(enum_handle as usize)?
            .get(&value)
            .map(String::as_str)
    }

    fn opcode_name(&self, opcode: u8) -> Option<&str> {
        self.packets.get(&opcode).map(|(name, _)| name.as_str())
    }
}

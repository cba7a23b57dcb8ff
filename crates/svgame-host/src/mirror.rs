//! Entity and client record mirrors
//!
//! The module owns two arrays of records in its memory. Both sides agree on
//! a host-visible prefix ([`SharedEntity`], [`PlayerStateHeader`]) and on the
//! stride between records; whatever follows the prefix is the module's
//! private tail and is handed out only as an untyped byte span.
//!
//! All index/address arithmetic lives in [`StrideTable`]. Call sites never
//! compute `base + n * stride` themselves.

use svgame_abi::layout::{PlayerStateHeader, SharedEntity};
use svgame_abi::MAX_GENTITIES;

use crate::error::TrapError;
use crate::memory::{ModuleAddr, ModuleMemory};

/// Which record array a table describes; selects the error variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Entity,
    Client,
}

/// Typed mapping between record indices and module addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrideTable {
    kind: RecordKind,
    base: ModuleAddr,
    stride: usize,
    capacity: usize,
}

impl StrideTable {
    /// Validate declared parameters against `memory` and build a table.
    ///
    /// The stride must hold `header` bytes and the whole array must lie inside
    /// module memory. After this, per-call translation only checks the index.
    pub fn new(
        kind: RecordKind,
        memory: &ModuleMemory,
        base: ModuleAddr,
        stride: i32,
        capacity: usize,
        header: usize,
    ) -> Result<Self, TrapError> {
        if stride < 0 || (stride as usize) < header {
            return Err(TrapError::BadStride { stride, header });
        }
        let stride = stride as usize;
        let span = stride.checked_mul(capacity).ok_or(TrapError::OutOfBounds {
            addr: base,
            len: usize::MAX,
            memory_size: memory.len(),
        })?;
        if !memory.contains(base, span) {
            return Err(TrapError::OutOfBounds {
                addr: base,
                len: span,
                memory_size: memory.len(),
            });
        }
        Ok(Self {
            kind,
            base,
            stride,
            capacity,
        })
    }

    pub fn base(&self) -> ModuleAddr {
        self.base
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn bad_index(&self, index: i64) -> TrapError {
        match self.kind {
            RecordKind::Entity => TrapError::BadEntityIndex {
                index,
                capacity: self.capacity,
            },
            RecordKind::Client => TrapError::BadClientIndex {
                index,
                capacity: self.capacity,
            },
        }
    }

    fn misaligned(&self, addr: ModuleAddr) -> TrapError {
        match self.kind {
            RecordKind::Entity => TrapError::MisalignedEntityAddress { addr },
            RecordKind::Client => TrapError::MisalignedClientAddress { addr },
        }
    }

    /// `base + index * stride`, valid only for `index < capacity`.
    pub fn index_to_address(&self, index: usize) -> Result<ModuleAddr, TrapError> {
        if index >= self.capacity {
            return Err(self.bad_index(index as i64));
        }
        // Cannot overflow: the whole array was checked against memory size.
        Ok(self.base + (index * self.stride) as u32)
    }

    /// `(addr - base) / stride`; the address must sit exactly on a record.
    pub fn address_to_index(&self, addr: ModuleAddr) -> Result<usize, TrapError> {
        if addr < self.base {
            return Err(self.misaligned(addr));
        }
        let offset = (addr - self.base) as usize;
        if offset % self.stride != 0 {
            return Err(self.misaligned(addr));
        }
        let index = offset / self.stride;
        if index >= self.capacity {
            return Err(self.bad_index(index as i64));
        }
        Ok(index)
    }

    /// Whole record `index`: shared prefix plus private tail.
    pub fn record<'m>(&self, memory: &'m ModuleMemory, index: usize) -> Result<&'m [u8], TrapError> {
        let addr = self.index_to_address(index)?;
        memory.translate(addr, self.stride)
    }

    pub fn record_mut<'m>(
        &self,
        memory: &'m mut ModuleMemory,
        index: usize,
    ) -> Result<&'m mut [u8], TrapError> {
        let addr = self.index_to_address(index)?;
        memory.translate_mut(addr, self.stride)
    }
}

/// Entity record array located by the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityMirror {
    table: StrideTable,
}

impl EntityMirror {
    pub fn table(&self) -> &StrideTable {
        &self.table
    }

    pub fn num_entities(&self) -> usize {
        self.table.capacity()
    }

    pub fn index_to_address(&self, index: usize) -> Result<ModuleAddr, TrapError> {
        self.table.index_to_address(index)
    }

    pub fn address_to_index(&self, addr: ModuleAddr) -> Result<usize, TrapError> {
        self.table.address_to_index(addr)
    }

    pub fn read_shared(&self, memory: &ModuleMemory, index: usize) -> Result<SharedEntity, TrapError> {
        let record = self.table.record(memory, index)?;
        SharedEntity::decode(record).ok_or(TrapError::BadStride {
            stride: self.table.stride() as i32,
            header: SharedEntity::SIZE,
        })
    }

    /// Write the shared prefix only; the tail is left untouched.
    pub fn write_shared(
        &self,
        memory: &mut ModuleMemory,
        index: usize,
        ent: &SharedEntity,
    ) -> Result<(), TrapError> {
        let record = self.table.record_mut(memory, index)?;
        ent.encode(record);
        Ok(())
    }

    /// The module-private tail of record `index`, never interpreted.
    pub fn tail<'m>(&self, memory: &'m ModuleMemory, index: usize) -> Result<&'m [u8], TrapError> {
        Ok(&self.table.record(memory, index)?[SharedEntity::SIZE..])
    }
}

/// Client record array located by the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientMirror {
    table: StrideTable,
}

impl ClientMirror {
    pub fn table(&self) -> &StrideTable {
        &self.table
    }

    pub fn index_to_address(&self, index: usize) -> Result<ModuleAddr, TrapError> {
        self.table.index_to_address(index)
    }

    pub fn address_to_index(&self, addr: ModuleAddr) -> Result<usize, TrapError> {
        self.table.address_to_index(addr)
    }

    pub fn read_header(&self, memory: &ModuleMemory, index: usize) -> Result<PlayerStateHeader, TrapError> {
        let record = self.table.record(memory, index)?;
        PlayerStateHeader::decode(record).ok_or(TrapError::BadStride {
            stride: self.table.stride() as i32,
            header: PlayerStateHeader::SIZE,
        })
    }

    pub fn tail<'m>(&self, memory: &'m ModuleMemory, index: usize) -> Result<&'m [u8], TrapError> {
        Ok(&self.table.record(memory, index)?[PlayerStateHeader::SIZE..])
    }
}

/// Record arrays declared by the module for the current session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameData {
    entities: Option<EntityMirror>,
    clients: Option<ClientMirror>,
}

impl GameData {
    /// Establish both mirrors from a locate request.
    ///
    /// May be issued again as the module spawns more entities; each request
    /// is validated in full and replaces the previous tables.
    #[allow(clippy::too_many_arguments)]
    pub fn locate(
        &mut self,
        memory: &ModuleMemory,
        entity_base: ModuleAddr,
        num_entities: i32,
        entity_stride: i32,
        client_base: ModuleAddr,
        client_stride: i32,
        max_clients: usize,
    ) -> Result<(), TrapError> {
        if num_entities < 0 || num_entities as usize > MAX_GENTITIES {
            return Err(TrapError::BadRecordCount {
                count: num_entities,
                max: MAX_GENTITIES,
            });
        }
        let entities = StrideTable::new(
            RecordKind::Entity,
            memory,
            entity_base,
            entity_stride,
            num_entities as usize,
            SharedEntity::SIZE,
        )?;
        let clients = StrideTable::new(
            RecordKind::Client,
            memory,
            client_base,
            client_stride,
            max_clients,
            PlayerStateHeader::SIZE,
        )?;
        self.entities = Some(EntityMirror { table: entities });
        self.clients = Some(ClientMirror { table: clients });
        Ok(())
    }

    pub fn entities(&self) -> Result<&EntityMirror, TrapError> {
        self.entities.as_ref().ok_or(TrapError::NotLocated)
    }

    pub fn clients(&self) -> Result<&ClientMirror, TrapError> {
        self.clients.as_ref().ok_or(TrapError::NotLocated)
    }

    pub fn is_located(&self) -> bool {
        self.entities.is_some()
    }

    /// Forget the tables; they refer to a discarded instance's memory.
    pub fn clear(&mut self) {
        self.entities = None;
        self.clients = None;
    }
}

//! World linkage, collision queries, visibility and area portals.
//!
//! Geometry lives entirely behind the HAL. These handlers resolve entity
//! records through the [`EntityMirror`](crate::mirror::EntityMirror), keep
//! the host shadow in step, and copy results back into module memory.

use svgame_abi::layout::{put_i32, TraceResult, Vec3};
use svgame_abi::{INLINE_MODEL_MARKER, MAX_GENTITIES};
use svgame_hal::ServerHal;

use crate::dispatch::TrapDispatcher;
use crate::error::{TrapError, TrapResult};
use crate::memory::{ModuleAddr, ModuleMemory, NULL_ADDR};
use crate::state::ServerEntity;

impl<H: ServerHal> TrapDispatcher<'_, H> {
    /// Link an entity into the world and record its area membership.
    pub(crate) fn handle_link_entity(&mut self, mem: &mut ModuleMemory, ent: ModuleAddr) -> Result<TrapResult, TrapError> {
        let entities = *self.data.entities()?;
        let index = entities.address_to_index(ent)?;
        let mut shared = entities.read_shared(mem, index)?;

        let link = self.hal.link_entity(index, &shared);
        shared.linked = true;
        shared.link_count = shared.link_count.wrapping_add(1);
        shared.absmin = link.absmin;
        shared.absmax = link.absmax;
        entities.write_shared(mem, index, &shared)?;

        self.server.sv_entities[index] = ServerEntity {
            linked: true,
            area_num: link.area_num,
            area_num2: link.area_num2,
            clusters: link.clusters,
        };
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_unlink_entity(&mut self, mem: &mut ModuleMemory, ent: ModuleAddr) -> Result<TrapResult, TrapError> {
        let entities = *self.data.entities()?;
        let index = entities.address_to_index(ent)?;
        let mut shared = entities.read_shared(mem, index)?;

        self.hal.unlink_entity(index);
        shared.linked = false;
        entities.write_shared(mem, index, &shared)?;
        self.server.sv_entities[index] = ServerEntity::default();
        Ok(TrapResult::Ok(0))
    }

    /// Fill `list` with up to `max_count` entity numbers; returns the count.
    pub(crate) fn handle_entities_in_box(
        &mut self,
        mem: &mut ModuleMemory,
        mins: ModuleAddr,
        maxs: ModuleAddr,
        list: ModuleAddr,
        max_count: i32,
    ) -> Result<TrapResult, TrapError> {
        let mins = mem.read_vec3(mins)?;
        let maxs = mem.read_vec3(maxs)?;
        let max_count = max_count.max(0) as usize;

        let mut found = self.hal.entities_in_box(&mins, &maxs, max_count);
        found.truncate(max_count);

        let out = mem.translate_mut(list, found.len() * 4)?;
        for (i, number) in found.iter().enumerate() {
            put_i32(out, i * 4, *number);
        }
        Ok(TrapResult::Ok(found.len() as i32))
    }

    pub(crate) fn handle_entity_contact(
        &mut self,
        mem: &ModuleMemory,
        mins: ModuleAddr,
        maxs: ModuleAddr,
        ent: ModuleAddr,
        capsule: bool,
    ) -> Result<TrapResult, TrapError> {
        let mins = mem.read_vec3(mins)?;
        let maxs = mem.read_vec3(maxs)?;
        let entities = self.data.entities()?;
        let shared = entities.read_shared(mem, entities.address_to_index(ent)?)?;
        Ok(TrapResult::Ok(self.hal.entity_contact(&mins, &maxs, &shared, capsule) as i32))
    }

    /// Swept-box trace. Null `mins`/`maxs` mean a point trace.
    pub(crate) fn handle_trace(
        &mut self,
        mem: &mut ModuleMemory,
        results: ModuleAddr,
        [start, mins, maxs, end]: [ModuleAddr; 4],
        pass_entity: i32,
        content_mask: i32,
        capsule: bool,
    ) -> Result<TrapResult, TrapError> {
        let start = mem.read_vec3(start)?;
        let mins = mem.read_vec3_or_zero(mins)?;
        let maxs = mem.read_vec3_or_zero(maxs)?;
        let end = mem.read_vec3(end)?;

        let trace = self
            .hal
            .trace(&start, &mins, &maxs, &end, pass_entity, content_mask, capsule);
        trace.encode(mem.translate_mut(results, TraceResult::SIZE)?);
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_point_contents(
        &mut self,
        mem: &ModuleMemory,
        point: ModuleAddr,
        pass_entity: i32,
    ) -> Result<TrapResult, TrapError> {
        let point = mem.read_vec3(point)?;
        Ok(TrapResult::Ok(self.hal.point_contents(&point, pass_entity)))
    }

    /// Attach inline model `*N` to an entity and link it.
    ///
    /// A name without the marker is fatal; a non-numeric tail parses as 0.
    pub(crate) fn handle_set_brush_model(
        &mut self,
        mem: &mut ModuleMemory,
        ent: ModuleAddr,
        name: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        if name == NULL_ADDR {
            return Err(TrapError::NotBrushModel {
                name: String::from("NULL"),
            });
        }
        let name = mem.read_str(name)?;
        let Some(tail) = name.strip_prefix(INLINE_MODEL_MARKER) else {
            return Err(TrapError::NotBrushModel { name });
        };
        let model_index = atoi(tail);
        let (mins, maxs) = self
            .hal
            .inline_model_bounds(model_index)
            .ok_or(TrapError::BadInlineModel { index: model_index })?;

        let entities = *self.data.entities()?;
        let index = entities.address_to_index(ent)?;
        let mut shared = entities.read_shared(mem, index)?;
        shared.model_index = model_index;
        shared.mins = mins;
        shared.maxs = maxs;
        shared.bmodel = true;
        // Brush contents are unknown to the host.
        shared.contents = -1;
        entities.write_shared(mem, index, &shared)?;

        self.handle_link_entity(mem, ent)
    }

    /// Potentially-visible-set test between two points.
    ///
    /// With portals considered, the points' areas must also be connected, so
    /// a closed door blocks sight.
    pub(crate) fn handle_in_pvs(
        &mut self,
        mem: &ModuleMemory,
        p1: ModuleAddr,
        p2: ModuleAddr,
        ignore_portals: bool,
    ) -> Result<TrapResult, TrapError> {
        let p1 = mem.read_vec3(p1)?;
        let p2 = mem.read_vec3(p2)?;
        Ok(TrapResult::Ok(self.in_pvs(&p1, &p2, ignore_portals) as i32))
    }

    fn in_pvs(&self, p1: &Vec3, p2: &Vec3, ignore_portals: bool) -> bool {
        let leaf1 = self.hal.point_leafnum(p1);
        let area1 = self.hal.leaf_area(leaf1);
        let mask = self.hal.cluster_pvs(self.hal.leaf_cluster(leaf1));

        let leaf2 = self.hal.point_leafnum(p2);
        let cluster2 = self.hal.leaf_cluster(leaf2);
        let area2 = self.hal.leaf_area(leaf2);

        if let Some(mask) = mask {
            if !cluster_visible(&mask, cluster2) {
                return false;
            }
        }
        ignore_portals || self.hal.areas_connected(area1, area2)
    }

    /// Open or close the portal an entity (a door) sits in.
    ///
    /// The shadow is found by the record's identity number; entities that
    /// touch a single area have no portal and are left alone.
    pub(crate) fn handle_adjust_area_portal_state(
        &mut self,
        mem: &ModuleMemory,
        ent: ModuleAddr,
        open: bool,
    ) -> Result<TrapResult, TrapError> {
        let entities = self.data.entities()?;
        let number = entities.read_shared(mem, entities.address_to_index(ent)?)?.number;
        let shadow = usize::try_from(number)
            .ok()
            .and_then(|n| self.server.sv_entities.get(n))
            .ok_or(TrapError::BadEntityIndex {
                index: number as i64,
                capacity: MAX_GENTITIES,
            })?;
        if shadow.area_num2 == -1 {
            return Ok(TrapResult::Ok(0));
        }
        self.hal
            .adjust_area_portal_state(shadow.area_num, shadow.area_num2, open);
        Ok(TrapResult::Ok(0))
    }
}

/// Whether `cluster`'s bit is set in a PVS row. Negative or out-of-row
/// clusters are never visible.
fn cluster_visible(mask: &[u8], cluster: i32) -> bool {
    usize::try_from(cluster)
        .ok()
        .and_then(|c| mask.get(c >> 3).map(|byte| byte & (1 << (c & 7)) != 0))
        .unwrap_or(false)
}

/// Parse a leading decimal integer the way C's `atoi` does.
///
/// Leading whitespace and one sign are accepted; parsing stops at the first
/// non-digit. No digits at all yields 0.
pub fn atoi(text: &str) -> i32 {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, d| acc.wrapping_mul(10).wrapping_add((d - b'0') as i32));
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

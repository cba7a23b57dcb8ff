//! Fixed-layout records shared across the boundary
//!
//! Both sides agree on these byte layouts. Every record is little-endian with
//! explicit offsets; no struct is ever transmuted from module memory. Entity
//! and client records only fix a *prefix* (the shared header): the module may
//! append any private tail, and the host never interprets it.
//!
//! `decode` returns `None` when the slice is shorter than `SIZE`; `encode`
//! writes exactly `SIZE` bytes and returns `false` when `out` is too short.

use alloc::string::String;
use alloc::vec::Vec;

/// Three-component vector as laid out in module memory.
pub type Vec3 = [f32; 3];

// ============================================================================
// Little-endian field helpers
// ============================================================================

/// Read an `i32` at `offset`. The caller guarantees the bounds.
#[inline]
pub fn get_i32(buf: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

/// Write an `i32` at `offset`. The caller guarantees the bounds.
#[inline]
pub fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn get_f32(buf: &[u8], offset: usize) -> f32 {
    f32::from_bits(get_i32(buf, offset) as u32)
}

#[inline]
pub fn put_f32(buf: &mut [u8], offset: usize, value: f32) {
    put_i32(buf, offset, value.to_bits() as i32);
}

#[inline]
pub fn get_vec3(buf: &[u8], offset: usize) -> Vec3 {
    [
        get_f32(buf, offset),
        get_f32(buf, offset + 4),
        get_f32(buf, offset + 8),
    ]
}

#[inline]
pub fn put_vec3(buf: &mut [u8], offset: usize, value: &Vec3) {
    for (i, component) in value.iter().enumerate() {
        put_f32(buf, offset + i * 4, *component);
    }
}

/// Read a NUL-terminated string stored in a fixed-size field.
fn get_fixed_str(buf: &[u8], offset: usize, len: usize) -> String {
    let field = &buf[offset..offset + len];
    let end = field.iter().position(|b| *b == 0).unwrap_or(len);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Write a string into a fixed-size field, truncating and NUL-terminating.
fn put_fixed_str(buf: &mut [u8], offset: usize, len: usize, value: &str) {
    let field = &mut buf[offset..offset + len];
    field.fill(0);
    let copy = core::cmp::min(value.len(), len.saturating_sub(1));
    field[..copy].copy_from_slice(&value.as_bytes()[..copy]);
}

// ============================================================================
// Shared entity header
// ============================================================================

/// Host-visible prefix of every entity record.
///
/// ```text
/// offset  field            offset  field
///  0      number            60     bmodel
///  4      e_type            64     mins[3]
///  8      e_flags           76     maxs[3]
/// 12      origin[3]         88     contents
/// 24      angles[3]         92     absmin[3]
/// 36      model_index      104     absmax[3]
/// 40      solid            116     current_origin[3]
/// 44      linked           128     current_angles[3]
/// 48      link_count       140     owner_num
/// 52      sv_flags         144     event_time
/// 56      single_client
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SharedEntity {
    /// Identity number; equals the record's index in the entity array
    pub number: i32,
    pub e_type: i32,
    pub e_flags: i32,
    pub origin: Vec3,
    pub angles: Vec3,
    /// Model reference (inline model index for brush entities)
    pub model_index: i32,
    pub solid: i32,
    pub linked: bool,
    pub link_count: i32,
    pub sv_flags: i32,
    pub single_client: i32,
    pub bmodel: bool,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub contents: i32,
    pub absmin: Vec3,
    pub absmax: Vec3,
    pub current_origin: Vec3,
    pub current_angles: Vec3,
    pub owner_num: i32,
    pub event_time: i32,
}

impl SharedEntity {
    pub const SIZE: usize = 148;

    pub const OFF_NUMBER: usize = 0;
    pub const OFF_MODEL_INDEX: usize = 36;
    pub const OFF_LINKED: usize = 44;
    pub const OFF_LINK_COUNT: usize = 48;
    pub const OFF_BMODEL: usize = 60;
    pub const OFF_MINS: usize = 64;
    pub const OFF_MAXS: usize = 76;
    pub const OFF_CONTENTS: usize = 88;
    pub const OFF_ABSMIN: usize = 92;
    pub const OFF_ABSMAX: usize = 104;

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..Self::SIZE)?;
        Some(Self {
            number: get_i32(b, 0),
            e_type: get_i32(b, 4),
            e_flags: get_i32(b, 8),
            origin: get_vec3(b, 12),
            angles: get_vec3(b, 24),
            model_index: get_i32(b, 36),
            solid: get_i32(b, 40),
            linked: get_i32(b, 44) != 0,
            link_count: get_i32(b, 48),
            sv_flags: get_i32(b, 52),
            single_client: get_i32(b, 56),
            bmodel: get_i32(b, 60) != 0,
            mins: get_vec3(b, 64),
            maxs: get_vec3(b, 76),
            contents: get_i32(b, 88),
            absmin: get_vec3(b, 92),
            absmax: get_vec3(b, 104),
            current_origin: get_vec3(b, 116),
            current_angles: get_vec3(b, 128),
            owner_num: get_i32(b, 140),
            event_time: get_i32(b, 144),
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> bool {
        let Some(b) = out.get_mut(..Self::SIZE) else {
            return false;
        };
        put_i32(b, 0, self.number);
        put_i32(b, 4, self.e_type);
        put_i32(b, 8, self.e_flags);
        put_vec3(b, 12, &self.origin);
        put_vec3(b, 24, &self.angles);
        put_i32(b, 36, self.model_index);
        put_i32(b, 40, self.solid);
        put_i32(b, 44, self.linked as i32);
        put_i32(b, 48, self.link_count);
        put_i32(b, 52, self.sv_flags);
        put_i32(b, 56, self.single_client);
        put_i32(b, 60, self.bmodel as i32);
        put_vec3(b, 64, &self.mins);
        put_vec3(b, 76, &self.maxs);
        put_i32(b, 88, self.contents);
        put_vec3(b, 92, &self.absmin);
        put_vec3(b, 104, &self.absmax);
        put_vec3(b, 116, &self.current_origin);
        put_vec3(b, 128, &self.current_angles);
        put_i32(b, 140, self.owner_num);
        put_i32(b, 144, self.event_time);
        true
    }
}

// ============================================================================
// Shared client header
// ============================================================================

/// Host-visible prefix of every client (player state) record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerStateHeader {
    pub command_time: i32,
    pub pm_type: i32,
    pub pm_flags: i32,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub view_angles: Vec3,
    pub client_num: i32,
}

impl PlayerStateHeader {
    pub const SIZE: usize = 52;

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..Self::SIZE)?;
        Some(Self {
            command_time: get_i32(b, 0),
            pm_type: get_i32(b, 4),
            pm_flags: get_i32(b, 8),
            origin: get_vec3(b, 12),
            velocity: get_vec3(b, 24),
            view_angles: get_vec3(b, 36),
            client_num: get_i32(b, 48),
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> bool {
        let Some(b) = out.get_mut(..Self::SIZE) else {
            return false;
        };
        put_i32(b, 0, self.command_time);
        put_i32(b, 4, self.pm_type);
        put_i32(b, 8, self.pm_flags);
        put_vec3(b, 12, &self.origin);
        put_vec3(b, 24, &self.velocity);
        put_vec3(b, 36, &self.view_angles);
        put_i32(b, 48, self.client_num);
        true
    }
}

// ============================================================================
// Input command
// ============================================================================

/// A client's input command for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserCmd {
    pub server_time: i32,
    pub angles: [i32; 3],
    pub buttons: u8,
    pub wbuttons: u8,
    pub weapon: u8,
    pub flags: u8,
    pub forward_move: i8,
    pub right_move: i8,
    pub up_move: i8,
    pub ident_client: u8,
}

impl UserCmd {
    pub const SIZE: usize = 24;

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..Self::SIZE)?;
        Some(Self {
            server_time: get_i32(b, 0),
            angles: [get_i32(b, 4), get_i32(b, 8), get_i32(b, 12)],
            buttons: b[16],
            wbuttons: b[17],
            weapon: b[18],
            flags: b[19],
            forward_move: b[20] as i8,
            right_move: b[21] as i8,
            up_move: b[22] as i8,
            ident_client: b[23],
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> bool {
        let Some(b) = out.get_mut(..Self::SIZE) else {
            return false;
        };
        put_i32(b, 0, self.server_time);
        for (i, angle) in self.angles.iter().enumerate() {
            put_i32(b, 4 + i * 4, *angle);
        }
        b[16] = self.buttons;
        b[17] = self.wbuttons;
        b[18] = self.weapon;
        b[19] = self.flags;
        b[20] = self.forward_move as u8;
        b[21] = self.right_move as u8;
        b[22] = self.up_move as u8;
        b[23] = self.ident_client;
        true
    }
}

// ============================================================================
// Trace result
// ============================================================================

/// Result of a swept-box trace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceResult {
    pub all_solid: bool,
    pub start_solid: bool,
    pub fraction: f32,
    pub end_pos: Vec3,
    pub plane_normal: Vec3,
    pub plane_dist: f32,
    pub plane_type: u8,
    pub plane_signbits: u8,
    pub surface_flags: i32,
    pub contents: i32,
    pub entity_num: i32,
}

impl TraceResult {
    pub const SIZE: usize = 56;

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..Self::SIZE)?;
        Some(Self {
            all_solid: get_i32(b, 0) != 0,
            start_solid: get_i32(b, 4) != 0,
            fraction: get_f32(b, 8),
            end_pos: get_vec3(b, 12),
            plane_normal: get_vec3(b, 24),
            plane_dist: get_f32(b, 36),
            plane_type: b[40],
            plane_signbits: b[41],
            surface_flags: get_i32(b, 44),
            contents: get_i32(b, 48),
            entity_num: get_i32(b, 52),
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> bool {
        let Some(b) = out.get_mut(..Self::SIZE) else {
            return false;
        };
        put_i32(b, 0, self.all_solid as i32);
        put_i32(b, 4, self.start_solid as i32);
        put_f32(b, 8, self.fraction);
        put_vec3(b, 12, &self.end_pos);
        put_vec3(b, 24, &self.plane_normal);
        put_f32(b, 36, self.plane_dist);
        b[40] = self.plane_type;
        b[41] = self.plane_signbits;
        b[42] = 0;
        b[43] = 0;
        put_i32(b, 44, self.surface_flags);
        put_i32(b, 48, self.contents);
        put_i32(b, 52, self.entity_num);
        true
    }
}

// ============================================================================
// Module cvar record
// ============================================================================

/// Module-side mirror of a console variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VmCvar {
    pub handle: i32,
    pub modification_count: i32,
    pub value: f32,
    pub integer: i32,
    pub string: String,
}

impl VmCvar {
    pub const SIZE: usize = 16 + crate::MAX_CVAR_VALUE_STRING;
    pub const OFF_HANDLE: usize = 0;
    pub const OFF_MODIFICATION_COUNT: usize = 4;

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..Self::SIZE)?;
        Some(Self {
            handle: get_i32(b, 0),
            modification_count: get_i32(b, 4),
            value: get_f32(b, 8),
            integer: get_i32(b, 12),
            string: get_fixed_str(b, 16, crate::MAX_CVAR_VALUE_STRING),
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> bool {
        let Some(b) = out.get_mut(..Self::SIZE) else {
            return false;
        };
        put_i32(b, 0, self.handle);
        put_i32(b, 4, self.modification_count);
        put_f32(b, 8, self.value);
        put_i32(b, 12, self.integer);
        put_fixed_str(b, 16, crate::MAX_CVAR_VALUE_STRING, &self.string);
        true
    }
}

// ============================================================================
// Orientation (tag lookup result)
// ============================================================================

/// An attachment point: origin plus a 3x3 axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Orientation {
    pub origin: Vec3,
    pub axis: [Vec3; 3],
}

impl Orientation {
    pub const SIZE: usize = 48;

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..Self::SIZE)?;
        Some(Self {
            origin: get_vec3(b, 0),
            axis: [get_vec3(b, 12), get_vec3(b, 24), get_vec3(b, 36)],
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> bool {
        let Some(b) = out.get_mut(..Self::SIZE) else {
            return false;
        };
        put_vec3(b, 0, &self.origin);
        for (i, row) in self.axis.iter().enumerate() {
            put_vec3(b, 12 + i * 12, row);
        }
        true
    }
}

// ============================================================================
// Broken-down wall-clock time
// ============================================================================

/// Calendar fields filled by the real-time trap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QTime {
    pub sec: i32,
    pub min: i32,
    pub hour: i32,
    pub mday: i32,
    pub mon: i32,
    pub year: i32,
    pub wday: i32,
    pub yday: i32,
    pub isdst: i32,
}

impl QTime {
    pub const SIZE: usize = 36;

    pub fn encode(&self, out: &mut [u8]) -> bool {
        let Some(b) = out.get_mut(..Self::SIZE) else {
            return false;
        };
        let fields = [
            self.sec, self.min, self.hour, self.mday, self.mon, self.year, self.wday, self.yday,
            self.isdst,
        ];
        for (i, field) in fields.iter().enumerate() {
            put_i32(b, i * 4, *field);
        }
        true
    }
}

// ============================================================================
// Bot script parser token
// ============================================================================

/// Longest string held by a parser token.
pub const PC_TOKEN_STRING: usize = 1024;

/// A token read from a bot script source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PcToken {
    pub token_type: i32,
    pub subtype: i32,
    pub int_value: i32,
    pub float_value: f32,
    pub string: String,
}

impl PcToken {
    pub const SIZE: usize = 16 + PC_TOKEN_STRING;

    pub fn encode(&self, out: &mut [u8]) -> bool {
        let Some(b) = out.get_mut(..Self::SIZE) else {
            return false;
        };
        put_i32(b, 0, self.token_type);
        put_i32(b, 4, self.subtype);
        put_i32(b, 8, self.int_value);
        put_f32(b, 12, self.float_value);
        put_fixed_str(b, 16, PC_TOKEN_STRING, &self.string);
        true
    }
}

/// Decode `count` vectors stored back to back, as used by debug polygons.
pub fn decode_vec3_array(bytes: &[u8], count: usize) -> Option<Vec<Vec3>> {
    let needed = count.checked_mul(12)?;
    let b = bytes.get(..needed)?;
    Some((0..count).map(|i| get_vec3(b, i * 12)).collect())
}

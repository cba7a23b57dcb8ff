//! Address translation for module-relative references.
//!
//! Every module instance owns one linear memory. Module addresses are byte
//! offsets into it. [`ModuleMemory`] is the only place that turns such an
//! address into host-accessible bytes, and it does so only when the whole
//! range `[addr, addr+len)` lies inside the memory. Anything else is a fatal
//! boundary error.
//!
//! The call channel is integer-only, so floats cross it as raw bit patterns;
//! see [`float_arg`] and [`float_result`].

use svgame_abi::layout::{self, Vec3};

use crate::error::TrapError;

/// A module-relative address.
pub type ModuleAddr = u32;

/// The null module reference used for optional out-parameters.
pub const NULL_ADDR: ModuleAddr = 0;

/// Reinterpret a 32-bit argument as the float whose bits it carries.
#[inline]
pub fn float_arg(bits: i32) -> f32 {
    f32::from_bits(bits as u32)
}

/// Reinterpret a float as the 32-bit pattern returned over the channel.
#[inline]
pub fn float_result(value: f32) -> i32 {
    value.to_bits() as i32
}

/// Interpret an argument as a module address.
#[inline]
pub fn addr_arg(arg: i32) -> ModuleAddr {
    arg as u32
}

/// Linear memory of one module instance.
#[derive(Clone, Debug, Default)]
pub struct ModuleMemory {
    bytes: Vec<u8>,
}

impl ModuleMemory {
    /// Zero-filled memory of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether `[addr, addr+len)` lies inside this memory.
    pub fn contains(&self, addr: ModuleAddr, len: usize) -> bool {
        (addr as usize)
            .checked_add(len)
            .is_some_and(|end| end <= self.bytes.len())
    }

    fn range(&self, addr: ModuleAddr, len: usize) -> Result<core::ops::Range<usize>, TrapError> {
        if !self.contains(addr, len) {
            return Err(TrapError::OutOfBounds {
                addr,
                len,
                memory_size: self.bytes.len(),
            });
        }
        let start = addr as usize;
        Ok(start..start + len)
    }

    /// Translate a module range into host bytes.
    pub fn translate(&self, addr: ModuleAddr, len: usize) -> Result<&[u8], TrapError> {
        let range = self.range(addr, len)?;
        Ok(&self.bytes[range])
    }

    /// Translate a module range into mutable host bytes.
    pub fn translate_mut(&mut self, addr: ModuleAddr, len: usize) -> Result<&mut [u8], TrapError> {
        let range = self.range(addr, len)?;
        Ok(&mut self.bytes[range])
    }

    /// Translate with a length taken from a module argument.
    pub fn translate_len(&self, addr: ModuleAddr, len: i32) -> Result<&[u8], TrapError> {
        if len < 0 {
            return Err(TrapError::NegativeLength { length: len });
        }
        self.translate(addr, len as usize)
    }

    pub fn read_i32(&self, addr: ModuleAddr) -> Result<i32, TrapError> {
        Ok(layout::get_i32(self.translate(addr, 4)?, 0))
    }

    pub fn write_i32(&mut self, addr: ModuleAddr, value: i32) -> Result<(), TrapError> {
        layout::put_i32(self.translate_mut(addr, 4)?, 0, value);
        Ok(())
    }

    pub fn read_f32(&self, addr: ModuleAddr) -> Result<f32, TrapError> {
        Ok(layout::get_f32(self.translate(addr, 4)?, 0))
    }

    pub fn read_vec3(&self, addr: ModuleAddr) -> Result<Vec3, TrapError> {
        Ok(layout::get_vec3(self.translate(addr, 12)?, 0))
    }

    /// Read a vector, or the zero vector for the null reference.
    pub fn read_vec3_or_zero(&self, addr: ModuleAddr) -> Result<Vec3, TrapError> {
        if addr == NULL_ADDR {
            return Ok([0.0; 3]);
        }
        self.read_vec3(addr)
    }

    pub fn write_vec3(&mut self, addr: ModuleAddr, value: &Vec3) -> Result<(), TrapError> {
        layout::put_vec3(self.translate_mut(addr, 12)?, 0, value);
        Ok(())
    }

    /// Length of the NUL-terminated string at `addr`, excluding the terminator.
    pub fn strlen(&self, addr: ModuleAddr) -> Result<usize, TrapError> {
        let tail = self.translate(addr, self.bytes.len().saturating_sub(addr as usize))?;
        tail.iter()
            .position(|b| *b == 0)
            .ok_or(TrapError::UnterminatedString { addr })
    }

    /// Read the NUL-terminated string at `addr`.
    ///
    /// Non-UTF-8 bytes are replaced rather than rejected; module strings are
    /// byte strings and the host only displays or forwards them.
    pub fn read_str(&self, addr: ModuleAddr) -> Result<String, TrapError> {
        let len = self.strlen(addr)?;
        let bytes = self.translate(addr, len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Bounded copy of `value` into a module buffer of `size` bytes.
    ///
    /// Copies at most `size - 1` bytes and always NUL-terminates. A size
    /// below 1 writes nothing.
    pub fn write_str(&mut self, addr: ModuleAddr, size: i32, value: &str) -> Result<(), TrapError> {
        if size < 1 {
            return Ok(());
        }
        let buf = self.translate_mut(addr, size as usize)?;
        let copy = core::cmp::min(value.len(), buf.len() - 1);
        buf[..copy].copy_from_slice(&value.as_bytes()[..copy]);
        buf[copy] = 0;
        Ok(())
    }

    /// Fill `len` bytes at `addr` with `value`.
    pub fn fill(&mut self, addr: ModuleAddr, value: u8, len: i32) -> Result<(), TrapError> {
        if len < 0 {
            return Err(TrapError::NegativeLength { length: len });
        }
        self.translate_mut(addr, len as usize)?.fill(value);
        Ok(())
    }

    /// Copy `len` bytes from `src` to `dst`; overlapping ranges are allowed.
    pub fn copy_within(&mut self, dst: ModuleAddr, src: ModuleAddr, len: i32) -> Result<(), TrapError> {
        if len < 0 {
            return Err(TrapError::NegativeLength { length: len });
        }
        let src_range = self.range(src, len as usize)?;
        let dst_range = self.range(dst, len as usize)?;
        self.bytes.copy_within(src_range, dst_range.start);
        Ok(())
    }

    /// Raw view of the whole memory.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

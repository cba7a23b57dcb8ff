//! Raw memory and vector math helpers offered to the module.

use svgame_abi::layout::{get_f32, put_f32, Vec3};
use svgame_hal::ServerHal;

use crate::dispatch::TrapDispatcher;
use crate::error::{TrapError, TrapResult};
use crate::memory::{ModuleAddr, ModuleMemory, NULL_ADDR};

type Matrix3 = [[f32; 3]; 3];

const MATRIX_SIZE: usize = 36;

impl<H: ServerHal> TrapDispatcher<'_, H> {
    /// Returns `dst`, as the C routine does.
    pub(crate) fn handle_memset(
        &mut self,
        mem: &mut ModuleMemory,
        dst: ModuleAddr,
        value: i32,
        len: i32,
    ) -> Result<TrapResult, TrapError> {
        mem.fill(dst, value as u8, len)?;
        Ok(TrapResult::Ok(dst as i32))
    }

    pub(crate) fn handle_memcpy(
        &mut self,
        mem: &mut ModuleMemory,
        dst: ModuleAddr,
        src: ModuleAddr,
        len: i32,
    ) -> Result<TrapResult, TrapError> {
        mem.copy_within(dst, src, len)?;
        Ok(TrapResult::Ok(dst as i32))
    }

    /// Copy at most `len` bytes of a string, zero-padding the rest of `dst`.
    ///
    /// Like the C routine, `dst` is not terminated when `src` is `len` bytes
    /// or longer.
    pub(crate) fn handle_strncpy(
        &mut self,
        mem: &mut ModuleMemory,
        dst: ModuleAddr,
        src: ModuleAddr,
        len: i32,
    ) -> Result<TrapResult, TrapError> {
        if len < 0 {
            return Err(TrapError::NegativeLength { length: len });
        }
        let n = len as usize;
        let available = mem.len().saturating_sub(src as usize).min(n);
        let source = mem.translate(src, available)?;
        let copied = match source.iter().position(|b| *b == 0) {
            Some(nul) => nul,
            None if available == n => n,
            None => return Err(TrapError::UnterminatedString { addr: src }),
        };
        let bytes = source[..copied].to_vec();

        let out = mem.translate_mut(dst, n)?;
        out[..copied].copy_from_slice(&bytes);
        out[copied..].fill(0);
        Ok(TrapResult::Ok(dst as i32))
    }

    pub(crate) fn handle_matrix_multiply(
        &mut self,
        mem: &mut ModuleMemory,
        in1: ModuleAddr,
        in2: ModuleAddr,
        out: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let a = read_matrix(mem, in1)?;
        let b = read_matrix(mem, in2)?;
        write_matrix(mem, out, &matrix_multiply(&a, &b))?;
        Ok(TrapResult::Ok(0))
    }

    /// Basis vectors for a set of Euler angles; null outputs are skipped.
    pub(crate) fn handle_angle_vectors(
        &mut self,
        mem: &mut ModuleMemory,
        angles: ModuleAddr,
        forward: ModuleAddr,
        right: ModuleAddr,
        up: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let basis = angle_vectors(&mem.read_vec3(angles)?);
        for (addr, v) in [forward, right, up].into_iter().zip(basis.iter()) {
            if addr != NULL_ADDR {
                mem.write_vec3(addr, v)?;
            }
        }
        Ok(TrapResult::Ok(0))
    }

    pub(crate) fn handle_perpendicular_vector(
        &mut self,
        mem: &mut ModuleMemory,
        dst: ModuleAddr,
        src: ModuleAddr,
    ) -> Result<TrapResult, TrapError> {
        let perp = perpendicular_vector(&mem.read_vec3(src)?);
        mem.write_vec3(dst, &perp)?;
        Ok(TrapResult::Ok(0))
    }
}

fn read_matrix(mem: &ModuleMemory, addr: ModuleAddr) -> Result<Matrix3, TrapError> {
    let b = mem.translate(addr, MATRIX_SIZE)?;
    let mut m = [[0.0; 3]; 3];
    for (i, row) in m.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = get_f32(b, (i * 3 + j) * 4);
        }
    }
    Ok(m)
}

fn write_matrix(mem: &mut ModuleMemory, addr: ModuleAddr, m: &Matrix3) -> Result<(), TrapError> {
    let b = mem.translate_mut(addr, MATRIX_SIZE)?;
    for (i, row) in m.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            put_f32(b, (i * 3 + j) * 4, *cell);
        }
    }
    Ok(())
}

fn matrix_multiply(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Forward, right and up vectors for (pitch, yaw, roll) in degrees.
fn angle_vectors(angles: &Vec3) -> [Vec3; 3] {
    let (sp, cp) = angles[0].to_radians().sin_cos();
    let (sy, cy) = angles[1].to_radians().sin_cos();
    let (sr, cr) = angles[2].to_radians().sin_cos();

    let forward = [cp * cy, cp * sy, -sp];
    let right = [
        -sr * sp * cy + cr * sy,
        -sr * sp * sy - cr * cy,
        -sr * cp,
    ];
    let up = [cr * sp * cy + sr * sy, cr * sp * sy - sr * cy, cr * cp];
    [forward, right, up]
}

fn dot(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// A unit vector perpendicular to `src`.
///
/// `src` need not be unit length; it is normalized first. Projects the axis
/// along the smallest component of `src` onto the plane normal to `src`. A
/// zero `src` yields the x axis.
fn perpendicular_vector(src: &Vec3) -> Vec3 {
    let n = normalize(*src);
    let mut pos = 0;
    let mut min_elem = 1.0f32;
    for (i, c) in n.iter().enumerate() {
        if c.abs() < min_elem {
            pos = i;
            min_elem = c.abs();
        }
    }
    let mut axis = [0.0f32; 3];
    axis[pos] = 1.0;

    let d = dot(&n, &axis);
    normalize(core::array::from_fn(|i| axis[i] - d * n[i]))
}

fn normalize(mut v: Vec3) -> Vec3 {
    let length = dot(&v, &v).sqrt();
    if length != 0.0 {
        for c in &mut v {
            *c /= length;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixture::Fixture;
    use svgame_abi::trap;

    fn assert_close(a: &Vec3, b: &Vec3) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_angle_vectors_at_rest() {
        let [forward, right, up] = angle_vectors(&[0.0, 0.0, 0.0]);
        assert_close(&forward, &[1.0, 0.0, 0.0]);
        assert_close(&right, &[0.0, -1.0, 0.0]);
        assert_close(&up, &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_angle_vectors_yaw_quarter_turn() {
        let [forward, right, _] = angle_vectors(&[0.0, 90.0, 0.0]);
        assert_close(&forward, &[0.0, 1.0, 0.0]);
        assert_close(&right, &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_perpendicular_is_unit_and_orthogonal() {
        for src in [[0.0, 0.0, 1.0], [1.0, 2.0, 3.0], [-0.3, 0.9, 0.1]] {
            let perp = perpendicular_vector(&src);
            assert!(dot(&perp, &src).abs() < 1e-5);
            assert!((dot(&perp, &perp) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_perpendicular_ignores_source_length() {
        let short = perpendicular_vector(&[0.0, 0.6, 0.8]);
        let long = perpendicular_vector(&[0.0, 60.0, 80.0]);
        assert_close(&short, &long);
        assert_close(&short, &[1.0, 0.0, 0.0]);
        assert_close(&perpendicular_vector(&[0.0, 0.0, 0.0]), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_matrix_multiply_by_identity() {
        let id = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let m = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        assert_eq!(matrix_multiply(&m, &id), m);
        assert_eq!(matrix_multiply(&id, &m), m);
    }

    #[test]
    fn test_strncpy_pads_with_zeros() {
        let mut fx = Fixture::new();
        fx.put_str(100, "abc");
        fx.mem.fill(200, 0xFF, 8).unwrap();
        assert_eq!(fx.trap(trap::TRAP_STRNCPY, &[200, 100, 6]), TrapResult::Ok(200));
        assert_eq!(fx.mem.translate(200, 8).unwrap(), b"abc\0\0\0\xFF\xFF");
    }

    #[test]
    fn test_strncpy_truncates_without_terminator() {
        let mut fx = Fixture::new();
        fx.put_str(100, "abcdef");
        fx.mem.fill(200, 0xFF, 4).unwrap();
        fx.trap(trap::TRAP_STRNCPY, &[200, 100, 3]);
        assert_eq!(fx.mem.translate(200, 4).unwrap(), b"abc\xFF");
    }

    #[test]
    fn test_memcpy_out_of_bounds_is_fatal() {
        let mut fx = Fixture::new();
        let size = fx.mem.len() as i32;
        assert!(fx.trap(trap::TRAP_MEMCPY, &[size - 2, 0, 4]).is_fatal());
        assert_eq!(fx.trap(trap::TRAP_MEMSET, &[64, 7, 4]), TrapResult::Ok(64));
        assert_eq!(fx.mem.translate(64, 4).unwrap(), [7, 7, 7, 7]);
    }
}

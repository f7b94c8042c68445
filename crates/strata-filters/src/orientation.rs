//! Quaternion misorientation under crystal symmetry
//!
//! Quaternions are stored vector-first, `[x, y, z, w]`, matching the layout of
//! the per-feature average orientation arrays.

use std::f64::consts::FRAC_1_SQRT_2;
use std::ops::Mul;

/// Crystal structure code marking an unindexed ensemble
pub const UNKNOWN_CRYSTAL_STRUCTURE: u32 = 999;

/// Unit quaternion, vector part first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// From one `[x, y, z, w]` tuple, normalized
    #[must_use]
    pub fn from_tuple(tuple: &[f32]) -> Option<Self> {
        let [x, y, z, w] = <[f32; 4]>::try_from(tuple).ok()?;
        Self::new(f64::from(x), f64::from(y), f64::from(z), f64::from(w)).normalized()
    }

    /// `None` for a zero quaternion
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let norm = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        (norm > f64::EPSILON).then(|| Self::new(self.x / norm, self.y / norm, self.z / norm, self.w / norm))
    }

    #[inline]
    #[must_use]
    pub const fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotation angle in radians, folded into `[0, π]`
    #[must_use]
    pub fn angle(self) -> f64 {
        2.0 * self.w.abs().min(1.0).acos()
    }
}

impl Mul for Quat {
    type Output = Self;

    fn mul(self, q: Self) -> Self {
        let p = self;
        Self::new(
            p.w * q.x + p.x * q.w + p.y * q.z - p.z * q.y,
            p.w * q.y - p.x * q.z + p.y * q.w + p.z * q.x,
            p.w * q.z + p.x * q.y - p.y * q.x + p.z * q.w,
            p.w * q.w - p.x * q.x - p.y * q.y - p.z * q.z,
        )
    }
}

/// Laue classes with a rotational symmetry table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaueClass {
    /// 6/mmm
    HexagonalHigh,
    /// m-3m
    CubicHigh,
    /// -1
    Triclinic,
    /// 2/m, b unique
    Monoclinic,
    /// mmm
    Orthorhombic,
    /// 4/mmm
    TetragonalHigh,
}

impl LaueClass {
    /// Map a stored crystal structure code; `None` for classes without a table
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::HexagonalHigh),
            1 => Some(Self::CubicHigh),
            4 => Some(Self::Triclinic),
            5 => Some(Self::Monoclinic),
            6 => Some(Self::Orthorhombic),
            8 => Some(Self::TetragonalHigh),
            _ => None,
        }
    }

    /// Rotational symmetry operators, identity first
    #[must_use]
    pub fn symmetry_ops(self) -> Vec<Quat> {
        let r = FRAC_1_SQRT_2;
        match self {
            Self::Triclinic => vec![Quat::IDENTITY],
            Self::Monoclinic => vec![Quat::IDENTITY, Quat::new(0.0, 1.0, 0.0, 0.0)],
            Self::Orthorhombic => vec![
                Quat::IDENTITY,
                Quat::new(1.0, 0.0, 0.0, 0.0),
                Quat::new(0.0, 1.0, 0.0, 0.0),
                Quat::new(0.0, 0.0, 1.0, 0.0),
            ],
            Self::TetragonalHigh => {
                let mut ops = about_z(4);
                ops.extend(in_plane_diads(4));
                ops
            }
            Self::HexagonalHigh => {
                let mut ops = about_z(6);
                ops.extend(in_plane_diads(6));
                ops
            }
            Self::CubicHigh => {
                let mut ops = vec![
                    Quat::IDENTITY,
                    Quat::new(1.0, 0.0, 0.0, 0.0),
                    Quat::new(0.0, 1.0, 0.0, 0.0),
                    Quat::new(0.0, 0.0, 1.0, 0.0),
                    Quat::new(r, 0.0, 0.0, r),
                    Quat::new(-r, 0.0, 0.0, r),
                    Quat::new(0.0, r, 0.0, r),
                    Quat::new(0.0, -r, 0.0, r),
                    Quat::new(0.0, 0.0, r, r),
                    Quat::new(0.0, 0.0, -r, r),
                    Quat::new(r, r, 0.0, 0.0),
                    Quat::new(r, -r, 0.0, 0.0),
                    Quat::new(0.0, r, r, 0.0),
                    Quat::new(0.0, r, -r, 0.0),
                    Quat::new(r, 0.0, r, 0.0),
                    Quat::new(r, 0.0, -r, 0.0),
                ];
                for sx in [0.5, -0.5] {
                    for sy in [0.5, -0.5] {
                        for sz in [0.5, -0.5] {
                            ops.push(Quat::new(sx, sy, sz, 0.5));
                        }
                    }
                }
                ops
            }
        }
    }
}

/// Smallest rotation angle, in degrees, taking `q1` to `q2` under `ops`
#[must_use]
pub fn misorientation_deg(ops: &[Quat], q1: Quat, q2: Quat) -> f64 {
    let delta = q1.conjugate() * q2;
    ops.iter()
        .map(|op| (delta * *op).angle())
        .fold(f64::INFINITY, f64::min)
        .to_degrees()
}

/// `n`-fold rotations about z
#[allow(clippy::cast_precision_loss)]
fn about_z(n: usize) -> Vec<Quat> {
    (0..n)
        .map(|k| {
            let half = std::f64::consts::PI * k as f64 / n as f64;
            Quat::new(0.0, 0.0, half.sin(), half.cos())
        })
        .collect()
}

/// Two-fold axes in the basal plane, `n` of them evenly spaced over 180°
#[allow(clippy::cast_precision_loss)]
fn in_plane_diads(n: usize) -> Vec<Quat> {
    (0..n)
        .map(|k| {
            let phi = std::f64::consts::PI * k as f64 / n as f64;
            Quat::new(phi.cos(), phi.sin(), 0.0, 0.0)
        })
        .collect()
}

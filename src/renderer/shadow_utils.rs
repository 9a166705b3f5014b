//! Shadow Utilities
//!
//! Pure math for cascaded shadow maps, kept free of scene state so it can
//! be tested in isolation.
//!
//! - Cascade split computation (Practical Split Scheme)
//! - Light view construction
//! - Texel snapping of light-space bounds
//! - Orthographic cascade projection and the texture-space bias

use glam::{DMat4, DVec3, DVec4};

use crate::scene::bounds::Aabb;

/// Maximum cascade count per shadowed light.
pub const MAX_CASCADES: usize = 4;

/// Maps clip space `[-1, 1]` to texture space `[0, 1]` on every axis.
pub const SHADOW_BIAS: DMat4 = DMat4::from_cols(
    DVec4::new(0.5, 0.0, 0.0, 0.0),
    DVec4::new(0.0, 0.5, 0.0, 0.0),
    DVec4::new(0.0, 0.0, 0.5, 0.0),
    DVec4::new(0.5, 0.5, 0.5, 1.0),
);

// ============================================================================
// Cascade Split Computation
// ============================================================================

/// Computes cascade far distances using the Practical Split Scheme.
///
/// `lambda` blends between uniform (`0.0`) and logarithmic (`1.0`)
/// distribution. The last used split is always exactly `far`. A
/// non-positive `near` has no logarithmic form and falls back to uniform.
#[must_use]
pub fn compute_cascade_splits(
    cascade_count: usize,
    near: f64,
    far: f64,
    lambda: f64,
) -> [f64; MAX_CASCADES] {
    let mut splits = [0.0; MAX_CASCADES];
    let n = cascade_count.min(MAX_CASCADES);

    for (i, split) in splits.iter_mut().enumerate().take(n) {
        let p = (i + 1) as f64 / n as f64;
        let uni_split = near + (far - near) * p;
        let log_split = if near > 0.0 {
            near * (far / near).powf(p)
        } else {
            uni_split
        };
        *split = lambda * log_split + (1.0 - lambda) * uni_split;
    }

    if n > 0 {
        splits[n - 1] = far;
    }

    splits
}

// ============================================================================
// Light View
// ============================================================================

/// View matrix of a light at `position` looking at the world origin.
///
/// Falls back to `+X` as the up vector when the light is (almost) straight
/// above or below the origin. A light sitting on the origin is treated as
/// one unit above it, looking down.
#[must_use]
pub fn light_view_matrix(position: DVec3) -> DMat4 {
    let (eye, dir) = match (-position).try_normalize() {
        Some(dir) => (position, dir),
        None => {
            log::warn!("Shadowed light sits on the origin, placing it one unit above");
            (DVec3::Y, DVec3::NEG_Y)
        }
    };
    let up = if dir.y.abs() > 0.99 {
        log::warn!("Light direction is nearly vertical, using +X as shadow up vector");
        DVec3::X
    } else {
        DVec3::Y
    };
    DMat4::look_at_rh(eye, DVec3::ZERO, up)
}

// ============================================================================
// Texel Snapping & Projection
// ============================================================================

/// Snaps the X/Y extent of a light-space box outward to multiples of its
/// own texel size (`extent / shadow_map_size`). Z is left untouched.
///
/// A zero-sized axis is not snapped.
#[must_use]
pub fn snap_to_texels(bounds: &Aabb, shadow_map_size: u32) -> Aabb {
    if bounds.is_empty() || shadow_map_size == 0 {
        return *bounds;
    }
    let mut snapped = *bounds;
    let texel = bounds.size() / f64::from(shadow_map_size);

    if texel.x > 0.0 {
        snapped.min.x = (bounds.min.x / texel.x).floor() * texel.x;
        snapped.max.x = (bounds.max.x / texel.x).ceil() * texel.x;
    }
    if texel.y > 0.0 {
        snapped.min.y = (bounds.min.y / texel.y).floor() * texel.y;
        snapped.max.y = (bounds.max.y / texel.y).ceil() * texel.y;
    }
    snapped
}

/// Orthographic projection enclosing a light-space box.
///
/// Right-handed light space looks down `-Z`, so `max.z` is the near side.
/// An empty box yields the unit cube projection.
#[must_use]
pub fn cascade_projection(light_space_bounds: &Aabb, shadow_map_size: u32) -> DMat4 {
    if light_space_bounds.is_empty() {
        return DMat4::orthographic_rh_gl(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
    }
    let b = snap_to_texels(light_space_bounds, shadow_map_size);
    DMat4::orthographic_rh_gl(b.min.x, b.max.x, b.min.y, b.max.y, -b.max.z, -b.min.z)
}

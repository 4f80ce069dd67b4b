// vim: noet

/*
 * Coverage helpers for particles.
 *
 * Pixel (x, y) is the unit square from (x, y) to (x+1, y+1). The x axis runs
 * along the LEDs of a string, y across the strings.
 */

use std::ops::Range;

const SUBSAMPLES: usize = 4;

/// Indices of the pixels touched by the interval `lo..hi`, clipped to `0..limit`.
pub fn span(lo: f32, hi: f32, limit: usize) -> Range<usize>
{
	let start = (lo.floor().max(0.0) as usize).min(limit);
	let end   = (hi.ceil().max(0.0) as usize).min(limit);

	start .. end.max(start)
}

/// Fraction of pixel (px, py) inside the axis-aligned box.
pub fn box_coverage(px: usize, py: usize, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32
{
	let (px, py) = (px as f32, py as f32);

	let w = (x_max.min(px + 1.0) - x_min.max(px)).max(0.0);
	let h = (y_max.min(py + 1.0) - y_min.max(py)).max(0.0);

	w * h
}

/// Fraction of pixel (px, py) whose distance to (cx, cy) lies in `inner..=outer`.
/// A disk is a ring with `inner == 0`.
pub fn ring_coverage(px: usize, py: usize, cx: f32, cy: f32, inner: f32, outer: f32) -> f32
{
	let step = 1.0 / SUBSAMPLES as f32;
	let inner2 = inner.max(0.0).powi(2);
	let outer2 = outer.powi(2);

	let mut hits = 0;
	for i in 0..SUBSAMPLES {
		let dx = px as f32 + (i as f32 + 0.5) * step - cx;
		for j in 0..SUBSAMPLES {
			let dy = py as f32 + (j as f32 + 0.5) * step - cy;
			let d2 = dx * dx + dy * dy;
			if d2 >= inner2 && d2 <= outer2 {
				hits += 1;
			}
		}
	}

	hits as f32 / (SUBSAMPLES * SUBSAMPLES) as f32
}

// vim: noet

/*
 * Mapping between the logical pixel order used by the renderers and the
 * order in which the pixels are shifted out along the strips.
 *
 * With the daisy-chained wiring two strings share one data line: current
 * runs up every even string and comes back down an odd string. For a 4x4
 * matrix (x = string, y = led) the LEDs light in this order:
 *
 *   0,0 2,0 0,1 2,1
 *   0,2 2,2 0,3 2,3
 *   1,3 3,3 1,2 3,2
 *   1,1 3,1 1,0 3,0
 *
 * so the first half of the wire order holds the even strings walking
 * upwards and the second half the odd strings walking downwards.
 */

use std::fmt;
use std::error::Error as StdError;

use crate::frame::{Geometry, LogicalFrame, PhysicalFrame};

type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, PartialEq)]
pub enum LayoutError
{
	UnsupportedGeometry,
	Collision { physical: usize },
	Missing { physical: usize },
	NotInvertible { logical: usize },
}

impl fmt::Display for LayoutError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			LayoutError::UnsupportedGeometry => write!(f, "layout needs at least one string and one LED"),
			LayoutError::Collision { physical } => write!(f, "physical pixel {} is addressed twice", physical),
			LayoutError::Missing { physical } => write!(f, "physical pixel {} is never addressed", physical),
			LayoutError::NotInvertible { logical } => write!(f, "logical pixel {} does not map back onto itself", logical),
		}
	}
}

impl StdError for LayoutError {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutTransform
{
	/// wire order equals the logical order
	Identity,
	/// even strings forward, odd strings reversed from the midpoint on
	DaisyChain,
}

impl LayoutTransform
{
	/// Physical pixel index of a logical pixel index.
	pub fn physical_index(&self, g: &Geometry, logical: usize) -> usize
	{
		match self {
			LayoutTransform::Identity => logical,
			LayoutTransform::DaisyChain => {
				let (string, led) = g.coords(logical);
				let forward = forward_strings(g);
				let reverse = g.string_count - forward;

				if string % 2 == 0 {
					led * forward + string / 2
				} else {
					forward * g.led_count + (g.led_count - 1 - led) * reverse + string / 2
				}
			}
		}
	}

	/// Inverse of [`physical_index`](Self::physical_index).
	pub fn logical_index(&self, g: &Geometry, physical: usize) -> usize
	{
		match self {
			LayoutTransform::Identity => physical,
			LayoutTransform::DaisyChain => {
				let forward = forward_strings(g);
				let reverse = g.string_count - forward;
				let midpoint = forward * g.led_count;

				if physical < midpoint {
					let led = physical / forward;
					let string = 2 * (physical % forward);
					g.pixel_index(string, led)
				} else {
					let r = physical - midpoint;
					let led = g.led_count - 1 - r / reverse;
					let string = 2 * (r % reverse) + 1;
					g.pixel_index(string, led)
				}
			}
		}
	}

	/// Copies `src` into `dst` in wire order.
	pub fn apply(&self, src: &LogicalFrame, dst: &mut PhysicalFrame)
	{
		debug_assert_eq!(src.geometry(), dst.geometry());

		let g = *src.geometry();
		let bpp = g.bytes_per_pixel;
		let src = src.as_bytes();
		let dst = dst.as_bytes_mut();

		match self {
			LayoutTransform::Identity => dst.copy_from_slice(src),
			LayoutTransform::DaisyChain => {
				for (physical, out) in dst.chunks_exact_mut(bpp).enumerate() {
					let logical = self.logical_index(&g, physical) * bpp;
					out.copy_from_slice(&src[logical .. logical + bpp]);
				}
			}
		}
	}

	/// Checks that the mapping is a bijection over the whole frame.
	pub fn validate(&self, g: &Geometry) -> Result<()>
	{
		if g.string_count == 0 || g.led_count == 0 {
			return Err(LayoutError::UnsupportedGeometry);
		}

		let n = g.pixel_count();
		let mut seen = vec![false; n];

		for logical in 0..n {
			let physical = self.physical_index(g, logical);
			if physical >= n {
				return Err(LayoutError::Missing { physical });
			}
			if seen[physical] {
				return Err(LayoutError::Collision { physical });
			}
			seen[physical] = true;

			if self.logical_index(g, physical) != logical {
				return Err(LayoutError::NotInvertible { logical });
			}
		}

		match seen.iter().position(|s| !s) {
			Some(physical) => Err(LayoutError::Missing { physical }),
			None => Ok(()),
		}
	}
}

fn forward_strings(g: &Geometry) -> usize
{
	(g.string_count + 1) / 2
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::color::{ChannelOrder, Color};

	fn geometry(string_count: usize, led_count: usize) -> Geometry
	{
		Geometry {
			string_count,
			led_count,
			bytes_per_pixel: 3,
			channel_order: ChannelOrder::RGB,
		}
	}

	#[test]
	fn daisy_chain_matches_wiring_diagram()
	{
		let g = geometry(4, 4);
		let wire_order: Vec<usize> = (0..16)
			.map(|p| LayoutTransform::DaisyChain.logical_index(&g, p))
			.collect();

		assert_eq!(wire_order, vec![
			0x0, 0x2, 0x4, 0x6,
			0x8, 0xa, 0xc, 0xe,
			0xd, 0xf, 0x9, 0xb,
			0x5, 0x7, 0x1, 0x3,
		]);
	}

	#[test]
	fn transforms_are_bijections()
	{
		for &(s, l) in &[(1, 1), (1, 7), (2, 5), (3, 4), (4, 4), (5, 3), (24, 118)] {
			let g = geometry(s, l);

			for layout in &[LayoutTransform::Identity, LayoutTransform::DaisyChain] {
				assert_eq!(layout.validate(&g), Ok(()), "{:?} {}x{}", layout, s, l);
			}
		}
	}

	#[test]
	fn apply_moves_whole_pixels()
	{
		let g = geometry(4, 4);
		let mut src = LogicalFrame::new(g);
		for led in 0..4 {
			for string in 0..4 {
				let idx = g.pixel_index(string, led) as u8;
				src.set(string, led, Color::new(idx, idx + 100, idx + 200));
			}
		}

		let mut dst = PhysicalFrame::new(g);
		LayoutTransform::DaisyChain.apply(&src, &mut dst);

		// physical slot 8 holds logical (1, 3)
		assert_eq!(&dst.as_bytes()[24..27], &[13, 113, 213]);
		// physical slot 1 holds logical (2, 0)
		assert_eq!(&dst.as_bytes()[3..6], &[2, 102, 202]);

		let mut same = PhysicalFrame::new(g);
		LayoutTransform::Identity.apply(&src, &mut same);
		assert_eq!(same.as_bytes(), src.as_bytes());
	}
}

// vim: noet

use crate::color::{ChannelOrder, Color};

/*
 * Shape of one frame: `string_count` strings of `led_count` LEDs each.
 */
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry
{
	pub string_count:    usize,
	pub led_count:       usize,
	pub bytes_per_pixel: usize,
	pub channel_order:   ChannelOrder,
}

impl Geometry
{
	pub fn pixel_count(&self) -> usize
	{
		self.string_count * self.led_count
	}

	pub fn frame_bytes(&self) -> usize
	{
		self.pixel_count() * self.bytes_per_pixel
	}

	/// Pixel index of `(string, led)` in logical order. Strings vary fastest.
	pub fn pixel_index(&self, string: usize, led: usize) -> usize
	{
		string + self.string_count * led
	}

	pub fn byte_offset(&self, string: usize, led: usize) -> usize
	{
		self.bytes_per_pixel * self.pixel_index(string, led)
	}

	pub fn coords(&self, pixel_index: usize) -> (usize, usize)
	{
		(pixel_index % self.string_count, pixel_index / self.string_count)
	}
}

/*
 * Pixels in the order the renderers think about them.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalFrame
{
	geometry: Geometry,
	data:     Vec<u8>,
}

impl LogicalFrame
{
	pub fn new(geometry: Geometry) -> LogicalFrame
	{
		LogicalFrame {
			geometry,
			data: vec![0; geometry.frame_bytes()],
		}
	}

	pub fn geometry(&self) -> &Geometry
	{
		&self.geometry
	}

	pub fn as_bytes(&self) -> &[u8]
	{
		&self.data
	}

	pub fn as_bytes_mut(&mut self) -> &mut [u8]
	{
		&mut self.data
	}

	pub fn clear(&mut self)
	{
		self.data.fill(0);
	}

	pub fn fill(&mut self, c: Color)
	{
		let bpp   = self.geometry.bytes_per_pixel;
		let order = self.geometry.channel_order;

		for px in self.data.chunks_exact_mut(bpp) {
			order.write(px, c);
		}
	}

	pub fn pixel_mut(&mut self, string: usize, led: usize) -> &mut [u8]
	{
		let bpp = self.geometry.bytes_per_pixel;
		let offset = self.geometry.byte_offset(string, led);

		&mut self.data[offset .. offset + bpp]
	}

	pub fn set(&mut self, string: usize, led: usize, c: Color)
	{
		let order = self.geometry.channel_order;
		order.write(self.pixel_mut(string, led), c);
	}

	pub fn get(&self, string: usize, led: usize) -> Color
	{
		let offset = self.geometry.byte_offset(string, led);
		self.geometry.channel_order.read(&self.data[offset ..])
	}

	/// Adds `rgb` scaled by `coverage`, saturating at 255.
	pub fn blend(&mut self, string: usize, led: usize, rgb: [f32; 3], coverage: f32)
	{
		let order = self.geometry.channel_order;
		let scaled = [rgb[0] * coverage, rgb[1] * coverage, rgb[2] * coverage];

		order.add(self.pixel_mut(string, led), scaled);
	}
}

/*
 * Pixels in the order the daisy chain shifts them out.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalFrame
{
	geometry: Geometry,
	data:     Vec<u8>,
}

impl PhysicalFrame
{
	pub fn new(geometry: Geometry) -> PhysicalFrame
	{
		PhysicalFrame {
			geometry,
			data: vec![0; geometry.frame_bytes()],
		}
	}

	pub fn geometry(&self) -> &Geometry
	{
		&self.geometry
	}

	pub fn as_bytes(&self) -> &[u8]
	{
		&self.data
	}

	pub fn as_bytes_mut(&mut self) -> &mut [u8]
	{
		&mut self.data
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn geometry() -> Geometry
	{
		Geometry {
			string_count:    4,
			led_count:       3,
			bytes_per_pixel: 3,
			channel_order:   ChannelOrder::BRG,
		}
	}

	#[test]
	fn offsets_are_unique_and_dense()
	{
		let g = geometry();
		let mut seen = vec![false; g.frame_bytes()];

		for led in 0..g.led_count {
			for string in 0..g.string_count {
				let offset = g.byte_offset(string, led);
				for b in offset .. offset + g.bytes_per_pixel {
					assert!(!seen[b], "byte {} used twice", b);
					seen[b] = true;
				}
				assert_eq!(g.coords(g.pixel_index(string, led)), (string, led));
			}
		}

		assert!(seen.iter().all(|&s| s));
	}

	#[test]
	fn set_uses_channel_order()
	{
		let mut f = LogicalFrame::new(geometry());
		f.set(1, 2, Color::new(0x11, 0x22, 0x33));

		let offset = 3 * (1 + 4 * 2);
		assert_eq!(&f.as_bytes()[offset .. offset + 3], &[0x33, 0x11, 0x22]);
		assert_eq!(f.get(1, 2), Color::new(0x11, 0x22, 0x33));
	}

	#[test]
	fn blend_saturates()
	{
		let mut f = LogicalFrame::new(geometry());
		f.set(0, 0, Color::new(200, 10, 0));
		f.blend(0, 0, [100.0, 20.0, 8.0], 0.5);

		assert_eq!(f.get(0, 0), Color::new(250, 20, 4));

		f.blend(0, 0, [100.0, 0.0, 0.0], 1.0);
		assert_eq!(f.get(0, 0).r, 255);
	}

	#[test]
	fn fill_and_clear()
	{
		let mut f = LogicalFrame::new(geometry());
		f.fill(Color::gray(7));
		assert!(f.as_bytes().iter().all(|&b| b == 7));

		f.clear();
		assert!(f.as_bytes().iter().all(|&b| b == 0));
	}
}

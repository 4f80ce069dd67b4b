// vim: noet

/*
 * Test patterns for checking the wiring. Not meant to look nice.
 */

use crate::animation::Animation;
use crate::color::Color;
use crate::frame::LogicalFrame;

const TEST_LEVEL: u8 = 0x20;
const STRIPE_PERIOD: u64 = 8;
const STRIPE_SPEED: u64 = 4;

/// A single pixel walking through the frame in logical order.
pub struct Sequence;

impl Sequence
{
	pub fn new() -> Sequence
	{
		Sequence
	}

	pub fn lit_pixel(frame_index: u64, pixel_count: usize) -> usize
	{
		(frame_index % pixel_count as u64) as usize
	}
}

impl Animation for Sequence
{
	fn name(&self) -> &'static str
	{
		"sequence"
	}

	fn init(&mut self)
	{
	}

	fn render(&mut self, frame_index: u64, out: &mut LogicalFrame)
	{
		let g = *out.geometry();
		let (string, led) = g.coords(Sequence::lit_pixel(frame_index, g.pixel_count()));

		out.clear();
		out.set(string, led, Color::gray(TEST_LEVEL));
	}
}

/// Diagonal stripes moving by half a period per frame.
pub struct Stripes;

impl Stripes
{
	pub fn new() -> Stripes
	{
		Stripes
	}
}

impl Animation for Stripes
{
	fn name(&self) -> &'static str
	{
		"default"
	}

	fn init(&mut self)
	{
	}

	fn render(&mut self, frame_index: u64, out: &mut LogicalFrame)
	{
		let g = *out.geometry();
		let shift = (STRIPE_SPEED * (frame_index % STRIPE_PERIOD)) % STRIPE_PERIOD;

		out.clear();
		for led in 0..g.led_count {
			for string in 0..g.string_count {
				if (led as u64 + string as u64 + shift) % STRIPE_PERIOD == 0 {
					out.set(string, led, Color::gray(TEST_LEVEL));
				}
			}
		}
	}
}

// vim: noet

use rand::Rng;
use rand::rngs::StdRng;

use crate::animation::{Animation, AnimationError};
use crate::animation::raster::{span, ring_coverage};
use crate::color::ColorRamp;
use crate::frame::{Geometry, LogicalFrame};

pub const NUM_DROPS     : usize = 12;
pub const GROWTH_RATE   : f32 = 0.2;
pub const BURN_RATE_MIN : f32 = GROWTH_RATE * 0.8;
pub const BURN_RATE_MAX : f32 = GROWTH_RATE * 1.5;
pub const MAX_AGE       : f32 = 8.0;
pub const THICKNESS     : f32 = 0.5;

// age, r, g, b
const COLOR_MAP: &[(f32, u8, u8, u8)] = &[
	(0.0, 0x00, 0x00, 0x40), // blue
	(4.0, 0x00, 0x20, 0x10), // soft green
	(8.0, 0x00, 0x00, 0x00), // black
];

/*
 * A rain drop hitting the matrix: a ring that grows until it has burnt out.
 * x runs along the LEDs, y across the strings.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Droplet
{
	pub x:         f32,
	pub y:         f32,
	pub radius:    f32,
	pub age:       f32,
	pub burn_rate: f32,
}

impl Droplet
{
	pub fn spawn(rng: &mut StdRng, g: &Geometry) -> Droplet
	{
		let mut d = Droplet { x: 0.0, y: 0.0, radius: 0.0, age: 0.0, burn_rate: 0.0 };
		d.reset(rng, g);
		d
	}

	pub fn reset(&mut self, rng: &mut StdRng, g: &Geometry)
	{
		self.age = 0.0;
		self.radius = 0.0;
		self.burn_rate = rng.gen_range(BURN_RATE_MIN..BURN_RATE_MAX);
		self.x = rng.gen_range(0.0..g.led_count as f32);
		self.y = rng.gen_range(0.0..g.string_count as f32);
	}

	pub fn update(&mut self, rng: &mut StdRng, g: &Geometry)
	{
		self.radius += GROWTH_RATE;
		self.age += self.burn_rate;

		if self.age > MAX_AGE {
			self.reset(rng, g);
		}
	}

	pub fn render(&self, ramp: &ColorRamp, out: &mut LogicalFrame)
	{
		let g = *out.geometry();
		let rgb = ramp.interpolate(self.age);

		let inner = self.radius - THICKNESS / 2.0;
		let outer = self.radius + THICKNESS / 2.0;

		for x in span(self.x - outer, self.x + outer, g.led_count) {
			for y in span(self.y - outer, self.y + outer, g.string_count) {
				let coverage = ring_coverage(x, y, self.x, self.y, inner, outer);
				if coverage > 0.0 {
					out.blend(y, x, rgb, coverage);
				}
			}
		}
	}
}

pub struct Drops
{
	geometry: Geometry,
	ramp:     ColorRamp,
	drops:    Vec<Droplet>,
	rng:      StdRng,
}

impl Drops
{
	pub fn new(geometry: Geometry, rng: StdRng) -> Result<Drops, AnimationError>
	{
		Ok(Drops {
			geometry,
			ramp:  ColorRamp::new(COLOR_MAP)?,
			drops: Vec::with_capacity(NUM_DROPS),
			rng,
		})
	}
}

impl Animation for Drops
{
	fn name(&self) -> &'static str
	{
		"drops"
	}

	fn init(&mut self)
	{
		self.drops.clear();
		for _i in 0 .. NUM_DROPS {
			self.drops.push(Droplet::spawn(&mut self.rng, &self.geometry));
		}
	}

	fn render(&mut self, _frame_index: u64, out: &mut LogicalFrame)
	{
		for d in self.drops.iter_mut() {
			d.update(&mut self.rng, &self.geometry);
		}

		out.clear();
		for d in self.drops.iter() {
			d.render(&self.ramp, out);
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use rand::SeedableRng;
	use crate::color::ChannelOrder;

	fn geometry() -> Geometry
	{
		Geometry { string_count: 8, led_count: 16, bytes_per_pixel: 3, channel_order: ChannelOrder::BRG }
	}

	#[test]
	fn burnt_out_drop_is_reborn()
	{
		let g = geometry();
		let mut rng = StdRng::seed_from_u64(1);
		let mut d = Droplet::spawn(&mut rng, &g);
		d.age = MAX_AGE;
		d.radius = 3.0;

		let mut expected_rng = rng.clone();
		let expected = Droplet::spawn(&mut expected_rng, &g);

		d.update(&mut rng, &g);
		assert_eq!(d.age, 0.0);
		assert_eq!(d.radius, 0.0);
		assert_eq!(d, expected);
	}

	#[test]
	fn young_drop_grows()
	{
		let g = geometry();
		let mut rng = StdRng::seed_from_u64(2);
		let mut d = Droplet::spawn(&mut rng, &g);
		let before = d.clone();

		d.update(&mut rng, &g);
		assert_eq!(d.radius, GROWTH_RATE);
		assert_eq!(d.age, before.burn_rate);
		assert_eq!(d.x, before.x);
		assert!(d.burn_rate >= BURN_RATE_MIN && d.burn_rate < BURN_RATE_MAX);
	}

	#[test]
	fn rings_at_the_border_stay_inside()
	{
		let g = geometry();
		let ramp = ColorRamp::new(COLOR_MAP).unwrap();
		let mut out = LogicalFrame::new(g);

		for &(x, y) in &[(0.0, 0.0), (15.9, 7.9), (-3.0, 4.0), (20.0, -2.0)] {
			let d = Droplet { x, y, radius: 5.0, age: 0.0, burn_rate: 0.2 };
			d.render(&ramp, &mut out);
		}

		assert_eq!(out.as_bytes().len(), g.frame_bytes());
		assert!(out.as_bytes().iter().any(|&b| b != 0));
	}

	#[test]
	fn new_drop_is_blue()
	{
		let g = geometry();
		let ramp = ColorRamp::new(COLOR_MAP).unwrap();
		let mut out = LogicalFrame::new(g);

		let d = Droplet { x: 8.0, y: 4.0, radius: 2.0, age: 0.0, burn_rate: 0.2 };
		d.render(&ramp, &mut out);

		// (x = 10, y = 4) sits right on the ring
		let c = out.get(4, 10);
		assert!(c.b > 0);
		assert_eq!((c.r, c.g), (0, 0));
		// the centre is dark
		assert_eq!(out.get(4, 8).b, 0);
	}
}

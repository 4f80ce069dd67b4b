// vim: noet

use rand::Rng;
use rand::rngs::StdRng;

use crate::animation::{Animation, AnimationError};
use crate::animation::raster::{span, box_coverage};
use crate::color::ColorRamp;
use crate::frame::{Geometry, LogicalFrame};

pub const NUM_PARTICLES : usize = 10;

const Y_START_MIN   : f32 =  0.5;
const Y_START_MAX   : f32 =  2.5;
const X_MIN_VEL     : f32 =  0.6;
const X_MAX_VEL     : f32 =  1.2;
const Y_MIN_VEL     : f32 = -0.02;
const Y_MAX_VEL     : f32 =  0.02;
const BURN_RATE_MIN : f32 =  0.070;
const BURN_RATE_MAX : f32 =  0.120;
// half the edge length
const SIZE_MIN      : f32 =  0.4;
const SIZE_MAX      : f32 =  4.0;

pub const AGE_MAX   : f32 =  6.0;

// age, r, g, b
const COLOR_MAP: &[(f32, u8, u8, u8)] = &[
	(0.0, 0x00, 0x00, 0x00), // black
	(1.0, 0x00, 0x00, 0x20), // soft blue
	(1.5, 0x00, 0x00, 0x00), // black
	(2.0, 0x40, 0x00, 0x00), // red
	(3.0, 0x80, 0x80, 0x00), // bright yellow
	(4.0, 0x40, 0x10, 0x00), // dark orange
	(6.0, 0x00, 0x00, 0x00), // black
];

/*
 * A square of burning gas travelling along the strings.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Ember
{
	pub x_min:     f32,
	pub x_max:     f32,
	pub y_min:     f32,
	pub y_max:     f32,
	pub x_vel:     f32,
	pub y_vel:     f32,
	pub burn_rate: f32,
	pub age:       f32,
}

impl Ember
{
	pub fn spawn(rng: &mut StdRng) -> Ember
	{
		let mut e = Ember {
			x_min: 0.0, x_max: 0.0, y_min: 0.0, y_max: 0.0,
			x_vel: 0.0, y_vel: 0.0, burn_rate: 0.0, age: 0.0,
		};
		e.reset(rng);
		e
	}

	pub fn reset(&mut self, rng: &mut StdRng)
	{
		let size = rng.gen_range(SIZE_MIN..SIZE_MAX);
		let y = rng.gen_range(Y_START_MIN..Y_START_MAX);

		self.x_min = -size;
		self.x_max = size;
		self.y_min = y - size;
		self.y_max = y + size;
		self.x_vel = rng.gen_range(X_MIN_VEL..X_MAX_VEL);
		self.y_vel = rng.gen_range(Y_MIN_VEL..Y_MAX_VEL);
		self.burn_rate = rng.gen_range(BURN_RATE_MIN..BURN_RATE_MAX);
		self.age = 0.0;
	}

	pub fn out_of_bounds(&self, g: &Geometry) -> bool
	{
		self.y_max < 0.0
			|| self.y_min > g.string_count as f32
			|| self.x_min > g.led_count as f32
	}

	pub fn update(&mut self, rng: &mut StdRng, g: &Geometry)
	{
		self.x_min += self.x_vel;
		self.x_max += self.x_vel;
		self.y_min += self.y_vel;
		self.y_max += self.y_vel;
		self.age += self.burn_rate;

		if self.out_of_bounds(g) || self.age > AGE_MAX {
			self.reset(rng);
		}
	}

	pub fn render(&self, ramp: &ColorRamp, out: &mut LogicalFrame)
	{
		let g = *out.geometry();
		let rgb = ramp.interpolate(self.age);

		for x in span(self.x_min, self.x_max, g.led_count) {
			for y in span(self.y_min, self.y_max, g.string_count) {
				let coverage = box_coverage(x, y, self.x_min, self.x_max, self.y_min, self.y_max);
				if coverage > 0.0 {
					out.blend(y, x, rgb, coverage);
				}
			}
		}
	}
}

pub struct Flame
{
	geometry:  Geometry,
	ramp:      ColorRamp,
	particles: Vec<Ember>,
	rng:       StdRng,
}

impl Flame
{
	pub fn new(geometry: Geometry, rng: StdRng) -> Result<Flame, AnimationError>
	{
		Ok(Flame {
			geometry,
			ramp:      ColorRamp::new(COLOR_MAP)?,
			particles: Vec::with_capacity(NUM_PARTICLES),
			rng,
		})
	}
}

impl Animation for Flame
{
	fn name(&self) -> &'static str
	{
		"flame"
	}

	fn init(&mut self)
	{
		self.particles.clear();
		for _i in 0 .. NUM_PARTICLES {
			self.particles.push(Ember::spawn(&mut self.rng));
		}
	}

	fn render(&mut self, _frame_index: u64, out: &mut LogicalFrame)
	{
		out.clear();

		for p in self.particles.iter_mut() {
			p.update(&mut self.rng, &self.geometry);
			p.render(&self.ramp, out);
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use rand::SeedableRng;
	use crate::color::{ChannelOrder, Color};

	fn geometry() -> Geometry
	{
		Geometry { string_count: 6, led_count: 30, bytes_per_pixel: 3, channel_order: ChannelOrder::RGB }
	}

	fn ember(x_min: f32, x_max: f32, y_min: f32, y_max: f32, age: f32) -> Ember
	{
		Ember { x_min, x_max, y_min, y_max, x_vel: 0.0, y_vel: 0.0, burn_rate: 0.1, age }
	}

	#[test]
	fn old_ember_is_reborn()
	{
		let g = geometry();
		let mut rng = StdRng::seed_from_u64(3);
		let mut e = ember(4.0, 6.0, 1.0, 3.0, AGE_MAX);

		let mut expected_rng = rng.clone();
		let expected = Ember::spawn(&mut expected_rng);

		e.update(&mut rng, &g);
		assert_eq!(e.age, 0.0);
		assert_eq!(e, expected);
	}

	#[test]
	fn ember_leaving_the_matrix_is_reborn()
	{
		let g = geometry();
		let mut rng = StdRng::seed_from_u64(4);

		let mut e = ember(30.5, 32.0, 1.0, 3.0, 1.0);
		e.update(&mut rng, &g);
		assert_eq!(e.age, 0.0);
		assert!(e.x_max > 0.0 && e.x_min < 0.0);

		let mut e = ember(3.0, 5.0, -3.0, -0.5, 1.0);
		e.update(&mut rng, &g);
		assert_eq!(e.age, 0.0);
	}

	#[test]
	fn coverage_weights_the_edges()
	{
		let g = geometry();
		let ramp = ColorRamp::new(COLOR_MAP).unwrap();
		let mut out = LogicalFrame::new(g);

		// bright yellow, covering x 2..4.5 and y 1..2
		ember(2.0, 4.5, 1.0, 2.0, 3.0).render(&ramp, &mut out);

		assert_eq!(out.get(1, 2), Color::new(0x80, 0x80, 0));
		assert_eq!(out.get(1, 3), Color::new(0x80, 0x80, 0));
		assert_eq!(out.get(1, 4), Color::new(0x40, 0x40, 0));
		assert_eq!(out.get(1, 5), Color::BLACK);
		assert_eq!(out.get(0, 2), Color::BLACK);
		assert_eq!(out.get(2, 2), Color::BLACK);
	}

	#[test]
	fn overlapping_embers_saturate()
	{
		let g = geometry();
		let ramp = ColorRamp::new(COLOR_MAP).unwrap();
		let mut out = LogicalFrame::new(g);

		for _i in 0..3 {
			ember(0.0, 1.0, 0.0, 1.0, 3.0).render(&ramp, &mut out);
		}

		assert_eq!(out.get(0, 0), Color::new(0xff, 0xff, 0));
	}

	#[test]
	fn partially_visible_embers_are_clipped()
	{
		let g = geometry();
		let ramp = ColorRamp::new(COLOR_MAP).unwrap();
		let mut out = LogicalFrame::new(g);

		ember(-4.0, 1.5, -2.0, 8.0, 3.0).render(&ramp, &mut out);
		ember(28.5, 34.0, 5.5, 9.0, 3.0).render(&ramp, &mut out);

		assert_eq!(out.get(0, 0), Color::new(0x80, 0x80, 0));
		assert_eq!(out.get(5, 1), Color::new(0x40, 0x40, 0));
		assert_eq!(out.get(5, 29), Color::new(0x40, 0x40, 0));
		assert_eq!(out.get(5, 28), Color::new(0x20, 0x20, 0));
	}
}

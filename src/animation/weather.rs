// vim: noet

/*
 * Weather simulation. The sky colour and the sun follow the time of day,
 * which is derived from the frame counter alone.
 */

use crate::animation::{Animation, AnimationError};
use crate::animation::raster::{span, ring_coverage};
use crate::color::ColorRamp;
use crate::frame::LogicalFrame;
use crate::frame::Geometry;

const HOURS_PER_DAY : f64 = 24.0;
const SUNRISE       : f32 =  6.0;
const SUNSET        : f32 = 20.0;
const SUN_RADIUS    : f32 =  2.0;

// hour, r, g, b
const SKY_BG_MAP: &[(f32, u8, u8, u8)] = &[
	( 0.0, 0x01, 0x01, 0x06), // "Cetacean Blue"
	( 4.0, 0x01, 0x02, 0x09),
	( 6.0, 0x07, 0x05, 0x0C), // "Regalia"
	( 7.0, 0x10, 0x09, 0x0B), // dusty rose
	( 8.0, 0x13, 0x11, 0x0C), // straw yellow
	( 8.5, 0x17, 0x16, 0x13), // pale cream
	( 9.0, 0x17, 0x18, 0x19), // light gray-blue
	( 9.5, 0x19, 0x1D, 0x22), // medium blue
	(10.0, 0x12, 0x23, 0x2B), // medium blue
	(11.0, 0x00, 0x27, 0x39), // deep day blue
	(16.0, 0x12, 0x23, 0x2B), // medium blue
	(17.0, 0x1F, 0x1B, 0x0E), // "Shandy"
	(18.0, 0x21, 0x14, 0x0B), // "Sandy Brown"
	(18.5, 0x1C, 0x0A, 0x09), // "Sunset Orange"
	(19.0, 0x0C, 0x09, 0x0F), // "English Violet"
	(20.0, 0x04, 0x07, 0x0E), // "Space Cadet"
	(21.0, 0x01, 0x03, 0x08), // "Maastricht Blue"
	(24.0, 0x01, 0x01, 0x06), // "Cetacean Blue"
];

const SUN_MAP: &[(f32, u8, u8, u8)] = &[
	( 6.0, 0x30, 0x08, 0x00),
	( 8.0, 0x40, 0x30, 0x10),
	(13.0, 0x50, 0x48, 0x30),
	(18.0, 0x40, 0x30, 0x10),
	(20.0, 0x30, 0x08, 0x00),
];

pub struct Weather
{
	frames_per_hour: f32,
	sky:             ColorRamp,
	sun:             ColorRamp,
}

impl Weather
{
	pub fn new(frames_per_hour: f32) -> Result<Weather, AnimationError>
	{
		if !(frames_per_hour.is_finite() && frames_per_hour > 0.0) {
			return Err(AnimationError::InvalidParameter(format!("{} frames per hour", frames_per_hour)));
		}

		Ok(Weather {
			frames_per_hour,
			sky: ColorRamp::new(SKY_BG_MAP)?,
			sun: ColorRamp::new(SUN_MAP)?,
		})
	}

	/// Simulated hour of the day in `0.0..24.0`.
	pub fn hour(&self, frame_index: u64) -> f32
	{
		((frame_index as f64 / self.frames_per_hour as f64) % HOURS_PER_DAY) as f32
	}

	/// Centre of the sun in (led, string) coordinates, `None` at night.
	pub fn sun_position(&self, hour: f32, g: &Geometry) -> Option<(f32, f32)>
	{
		if !(SUNRISE..=SUNSET).contains(&hour) {
			return None;
		}

		let progress = (hour - SUNRISE) / (SUNSET - SUNRISE);
		Some((progress * g.led_count as f32, g.string_count as f32 / 2.0))
	}
}

impl Animation for Weather
{
	fn name(&self) -> &'static str
	{
		"weather"
	}

	fn init(&mut self)
	{
	}

	fn render(&mut self, frame_index: u64, out: &mut LogicalFrame)
	{
		let g = *out.geometry();
		let hour = self.hour(frame_index);

		out.fill(self.sky.color_at(hour));

		if let Some((cx, cy)) = self.sun_position(hour, &g) {
			let rgb = self.sun.interpolate(hour);

			for x in span(cx - SUN_RADIUS, cx + SUN_RADIUS, g.led_count) {
				for y in span(cy - SUN_RADIUS, cy + SUN_RADIUS, g.string_count) {
					let coverage = ring_coverage(x, y, cx, cy, 0.0, SUN_RADIUS);
					if coverage > 0.0 {
						out.blend(y, x, rgb, coverage);
					}
				}
			}
		}
	}
}

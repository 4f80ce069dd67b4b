// vim: noet

use std::fmt;
use std::error::Error as StdError;
use std::str::FromStr;

/////////// Helper Structs ////////////

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Color
{
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Color
{
	pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

	pub const fn new(r: u8, g: u8, b: u8) -> Color
	{
		Color { r, g, b }
	}

	pub fn gray(v: u8) -> Color
	{
		Color { r: v, g: v, b: v }
	}

	/// Approximate a black body of `temperature` Kelvin at the given intensity.
	pub fn from_temperature(temperature: f32, intensity: f32) -> Color
	{
		let k = 5.352 * (-0.001 * temperature).exp();

		Color {
			r: to_channel(intensity),
			g: to_channel(intensity * (1.0 - k / 2.0)),
			b: to_channel(intensity * (1.0 - k)),
		}
	}
}

fn to_channel(v: f32) -> u8
{
	v.round().clamp(0.0, 255.0) as u8
}

/////////// Colour strings ////////////

#[derive(Debug, PartialEq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "cannot parse colour '{}', expected #rrggbb or r,g,b", self.0)
	}
}

impl StdError for ColorParseError {}

impl FromStr for Color
{
	type Err = ColorParseError;

	/// Accepts `#rrggbb`, `rrggbb` and `r,g,b` with decimal channels.
	fn from_str(s: &str) -> Result<Color, ColorParseError>
	{
		let err = || ColorParseError(s.to_string());
		let t = s.trim();

		if t.contains(',') {
			let mut channels = t.split(',').map(|c| c.trim().parse::<u8>());

			let color = match (channels.next(), channels.next(), channels.next(), channels.next()) {
				(Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => Color { r, g, b },
				_ => return Err(err()),
			};

			return Ok(color);
		}

		let hex = t.strip_prefix('#').unwrap_or(t);
		if hex.len() != 6 || !hex.is_ascii() {
			return Err(err());
		}

		let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());

		Ok(Color {
			r: channel(0)?,
			g: channel(2)?,
			b: channel(4)?,
		})
	}
}

/////////// Channel order ////////////

/*
 * Byte position of each channel inside a pixel. This differs between
 * hardware revisions.
 */
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelOrder
{
	pub r: usize,
	pub g: usize,
	pub b: usize,
}

impl ChannelOrder
{
	pub const BRG: ChannelOrder = ChannelOrder { b: 0, r: 1, g: 2 };
	pub const BGR: ChannelOrder = ChannelOrder { b: 0, g: 1, r: 2 };
	pub const RGB: ChannelOrder = ChannelOrder { r: 0, g: 1, b: 2 };

	pub fn write(&self, pixel: &mut [u8], c: Color)
	{
		pixel[self.r] = c.r;
		pixel[self.g] = c.g;
		pixel[self.b] = c.b;
	}

	pub fn read(&self, pixel: &[u8]) -> Color
	{
		Color {
			r: pixel[self.r],
			g: pixel[self.g],
			b: pixel[self.b],
		}
	}

	/// Adds `rgb` to the pixel, saturating every channel at 255.
	pub fn add(&self, pixel: &mut [u8], rgb: [f32; 3])
	{
		for (idx, v) in [self.r, self.g, self.b].iter().zip(rgb.iter()) {
			let sum = pixel[*idx] as f32 + v.round();
			pixel[*idx] = sum.clamp(0.0, 255.0) as u8;
		}
	}
}

/////////// Colour ramp ////////////

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Breakpoint
{
	pub key:   f32,
	pub color: Color,
}

#[derive(Debug, PartialEq)]
pub enum RampError
{
	Empty,
	NotIncreasing(usize),
}

impl fmt::Display for RampError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			RampError::Empty => write!(f, "colour ramp needs at least one breakpoint"),
			RampError::NotIncreasing(i) => write!(f, "colour ramp key at index {} is not larger than its predecessor", i),
		}
	}
}

impl StdError for RampError {}

/*
 * Piecewise-linear colour lookup. Keys outside the table clamp to the first
 * or last breakpoint.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct ColorRamp
{
	points: Vec<Breakpoint>,
}

impl ColorRamp
{
	/// Builds a ramp from `(key, r, g, b)` rows with strictly increasing keys.
	pub fn new(table: &[(f32, u8, u8, u8)]) -> Result<ColorRamp, RampError>
	{
		if table.is_empty() {
			return Err(RampError::Empty);
		}

		for i in 1..table.len() {
			// NaN keys fail here too
			if !(table[i].0 > table[i - 1].0) {
				return Err(RampError::NotIncreasing(i));
			}
		}

		let points = table.iter()
			.map(|&(key, r, g, b)| Breakpoint { key, color: Color { r, g, b } })
			.collect();

		Ok(ColorRamp { points })
	}

	/// Unrounded channel values in the order r, g, b.
	pub fn interpolate(&self, key: f32) -> [f32; 3]
	{
		let first = &self.points[0];
		let last  = &self.points[self.points.len() - 1];

		if !(key > first.key) {
			return channels(first.color);
		}
		if key >= last.key {
			return channels(last.color);
		}

		// first breakpoint with a key above the query; index 0 is excluded above
		let upper = self.points.partition_point(|p| p.key <= key);
		let lo = &self.points[upper - 1];
		let hi = &self.points[upper];

		let t = (key - lo.key) / (hi.key - lo.key);
		let a = channels(lo.color);
		let b = channels(hi.color);

		[
			a[0] + t * (b[0] - a[0]),
			a[1] + t * (b[1] - a[1]),
			a[2] + t * (b[2] - a[2]),
		]
	}

	pub fn color_at(&self, key: f32) -> Color
	{
		let c = self.interpolate(key);

		Color {
			r: to_channel(c[0]),
			g: to_channel(c[1]),
			b: to_channel(c[2]),
		}
	}
}

fn channels(c: Color) -> [f32; 3]
{
	[c.r as f32, c.g as f32, c.b as f32]
}

// vim: noet

use log::info;

use crate::animation::{Animation, AnimationError, AnimationParams};
use crate::color::Color;
use crate::frame::LogicalFrame;

/// Solid colour. No animation.
pub struct Solid
{
	color: Color,
}

impl Solid
{
	pub fn new(color: Color) -> Solid
	{
		Solid { color }
	}

	/// A colour temperature takes precedence over an explicit colour.
	pub fn from_params(params: &AnimationParams) -> Result<Solid, AnimationError>
	{
		let color = match params.temperature {
			Some(t) => {
				if !(t.is_finite() && t > 0.0) {
					return Err(AnimationError::InvalidParameter(format!("colour temperature {} K", t)));
				}
				if !(params.intensity.is_finite() && params.intensity >= 0.0) {
					return Err(AnimationError::InvalidParameter(format!("intensity {}", params.intensity)));
				}

				Color::from_temperature(t, params.intensity)
			},
			None => params.color.unwrap_or(Color::BLACK),
		};

		info!("Setting color to rgb({},{},{})", color.r, color.g, color.b);

		Ok(Solid::new(color))
	}

	pub fn color(&self) -> Color
	{
		self.color
	}
}

impl Animation for Solid
{
	fn name(&self) -> &'static str
	{
		"solid"
	}

	fn init(&mut self)
	{
	}

	fn render(&mut self, _frame_index: u64, out: &mut LogicalFrame)
	{
		out.fill(self.color);
	}

	fn set_color(&mut self, color: Color)
	{
		self.color = color;
	}
}

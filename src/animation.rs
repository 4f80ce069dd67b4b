// vim: noet

use std::fmt;
use std::error::Error as StdError;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::color::{Color, RampError};
use crate::frame::{Geometry, LogicalFrame};

pub mod raster;
pub mod sequence;
pub mod solid;
pub mod drops;
pub mod flame;
pub mod weather;

type Result<T> = std::result::Result<T, AnimationError>;

/////////// Error Type and Implementation ////////////

#[derive(Debug, PartialEq)]
pub enum AnimationError
{
	UnknownVariant(String),
	InvalidParameter(String),
}

impl fmt::Display for AnimationError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			AnimationError::UnknownVariant(s) =>
				write!(f, "unknown animation '{}' (known: {})", s, names().collect::<Vec<_>>().join(", ")),
			AnimationError::InvalidParameter(s) => write!(f, "invalid animation parameter: {}", s),
		}
	}
}

impl StdError for AnimationError {}

impl From<RampError> for AnimationError
{
	fn from(e: RampError) -> AnimationError
	{
		AnimationError::InvalidParameter(e.to_string())
	}
}

/////////// Parameters ////////////

/// Everything the front-end can tell an animation before it starts.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationParams
{
	pub color:           Option<Color>,
	pub temperature:     Option<f32>,
	pub intensity:       f32,
	pub seed:            Option<u64>,
	pub frames_per_hour: f32,
}

impl Default for AnimationParams
{
	fn default() -> AnimationParams
	{
		AnimationParams {
			color:           None,
			temperature:     None,
			intensity:       32.0,
			seed:            None,
			frames_per_hour: 60.0,
		}
	}
}

impl AnimationParams
{
	pub fn rng(&self) -> StdRng
	{
		match self.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None       => StdRng::from_entropy(),
		}
	}
}

/////////// Animation Trait ////////////

pub trait Animation {
	fn name(&self) -> &'static str;

	/// Resets all internal state. Called once before the first frame.
	fn init(&mut self);

	/// Overwrites every pixel of `out` with frame number `frame_index`.
	fn render(&mut self, frame_index: u64, out: &mut LogicalFrame);

	/// New target colour from an external controller. Ignored by most animations.
	fn set_color(&mut self, _color: Color)
	{
	}
}

/////////// Registry ////////////

type Constructor = fn(&AnimationParams, Geometry) -> Result<Box<dyn Animation>>;

pub struct Entry
{
	pub name:        &'static str,
	pub description: &'static str,
	constructor:     Constructor,
}

pub static REGISTRY: &[Entry] = &[
	Entry {
		name: "default",
		description: "diagonal test stripes",
		constructor: |_, _| Ok(Box::new(sequence::Stripes::new())),
	},
	Entry {
		name: "sequence",
		description: "one lit pixel walking through the logical frame",
		constructor: |_, _| Ok(Box::new(sequence::Sequence::new())),
	},
	Entry {
		name: "solid",
		description: "single colour, from RGB or colour temperature",
		constructor: |p, _| Ok(Box::new(solid::Solid::from_params(p)?)),
	},
	Entry {
		name: "drops",
		description: "expanding rings of rain drops",
		constructor: |p, g| Ok(Box::new(drops::Drops::new(g, p.rng())?)),
	},
	Entry {
		name: "flame",
		description: "flame particles rising along the strings",
		constructor: |p, g| Ok(Box::new(flame::Flame::new(g, p.rng())?)),
	},
	Entry {
		name: "weather",
		description: "sky colour and sun over a simulated day",
		constructor: |p, _| Ok(Box::new(weather::Weather::new(p.frames_per_hour)?)),
	},
];

pub fn names() -> impl Iterator<Item = &'static str>
{
	REGISTRY.iter().map(|e| e.name)
}

/// Looks up `name` and builds the animation. Bad parameters fail here, never per frame.
pub fn create(name: &str, params: &AnimationParams, geometry: Geometry) -> Result<Box<dyn Animation>>
{
	let entry = REGISTRY.iter()
		.find(|e| e.name == name)
		.ok_or_else(|| AnimationError::UnknownVariant(name.to_string()))?;

	(entry.constructor)(params, geometry)
}

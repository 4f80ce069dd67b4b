// vim: noet

use std::fmt;
use std::error::Error as StdError;
use std::time::Duration;

use crate::color::ChannelOrder;
use crate::frame::Geometry;
use crate::layout::LayoutTransform;

// register window of the FPGA, mapped from /dev/mem
pub const FPGA_REGS_BASE: u64   = 0x100_0000;
pub const FPGA_REGS_SIZE: usize = 0x2000;

// frame buffer window exported by the ledfb kernel driver
pub const FIFO_DATA_SIZE: usize = 0x4000;

// depth of the LED FIFO in 16-bit words. The empty count register tops out
// one below that, a drained FIFO reads 8191.
pub const FIFO_CAPACITY_WORDS: usize = 8192;

pub const REGS_DEVICE: &str = "/dev/mem";
pub const FB_DEVICE:   &str = "/dev/ledfb";

// geometry of the first matrix. Needs to match the FPGA build.
pub const LED_COUNT:       usize = 118;
pub const STRING_COUNT:    usize = 24;
pub const BYTES_PER_PIXEL: usize = 3;

// FIFO polling
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);
pub const SETTLE_TIME:   Duration = Duration::from_millis(10);

// blanking on shutdown never waits longer than this for FIFO space
pub const BLANK_WAIT_LIMIT: Duration = Duration::from_millis(500);

// log FIFO statistics every n frames
pub const STATS_INTERVAL: u64 = 100;

type Result<T> = std::result::Result<T, ConfigError>;

/////////// Error Type and Implementation ////////////

#[derive(Debug, PartialEq)]
pub enum ConfigError
{
	UnknownRevision(String),
	ZeroDimension,
	FrameTooLarge { frame_bytes: usize, window_bytes: usize },
	FrameExceedsFifo { frame_words: usize, capacity_words: usize },
	InvalidThreshold { threshold: usize, max_empty: usize },
	UnsupportedWiring(String),
	RegisterOutsideWindow(usize),
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ConfigError::UnknownRevision(s) => write!(f, "unknown hardware revision '{}' (known: {})", s, REVISIONS.join(", ")),
			ConfigError::ZeroDimension => write!(f, "string count, LED count and bytes per pixel must be non-zero"),
			ConfigError::FrameTooLarge { frame_bytes, window_bytes } =>
				write!(f, "frame of {} bytes does not fit the {} byte frame buffer window", frame_bytes, window_bytes),
			ConfigError::FrameExceedsFifo { frame_words, capacity_words } =>
				write!(f, "frame of {} words can never fit a FIFO of {} words", frame_words, capacity_words),
			ConfigError::InvalidThreshold { threshold, max_empty } =>
				write!(f, "FIFO threshold {} must be in 1..={}, the largest empty count the FIFO reports", threshold, max_empty),
			ConfigError::UnsupportedWiring(s) => write!(f, "unsupported wiring: {}", s),
			ConfigError::RegisterOutsideWindow(r) => write!(f, "register 0x{:x} lies outside the register window", r),
		}
	}
}

impl StdError for ConfigError {}

/////////// Register map ////////////

/*
 * Register offsets in 16-bit words from the start of the register window.
 */
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RegisterMap
{
	pub id:               usize,
	pub scratch:          usize,
	pub reset_status:     usize,
	pub fifo_status:      usize,
	pub fifo_empty_count: usize,
	pub hblank:           usize,
}

impl Default for RegisterMap
{
	fn default() -> RegisterMap
	{
		RegisterMap {
			id:               0x0,
			scratch:          0x1,
			reset_status:     0x2,
			fifo_status:      0x8,
			fifo_empty_count: 0x9,
			hblank:           0xa,
		}
	}
}

impl RegisterMap
{
	pub fn all(&self) -> [usize; 6]
	{
		[self.id, self.scratch, self.reset_status, self.fifo_status, self.fifo_empty_count, self.hblank]
	}
}

/////////// Poll policy ////////////

/// How long and how often to wait on the FIFO.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PollPolicy
{
	/// sleep between two reads of the empty count
	pub interval: Duration,
	/// `None` waits forever
	pub max_wait: Option<Duration>,
	/// pause after the blank frame so the hardware can shift it out
	pub settle: Duration,
}

impl Default for PollPolicy
{
	fn default() -> PollPolicy
	{
		PollPolicy {
			interval: POLL_INTERVAL,
			max_wait: None,
			settle:   SETTLE_TIME,
		}
	}
}

impl PollPolicy
{
	/// No sleeping at all. Used with the simulated device.
	pub fn immediate() -> PollPolicy
	{
		PollPolicy {
			interval: Duration::ZERO,
			max_wait: None,
			settle:   Duration::ZERO,
		}
	}

	pub fn for_blanking(&self) -> PollPolicy
	{
		let limit = match self.max_wait {
			Some(w) => w.min(BLANK_WAIT_LIMIT),
			None    => BLANK_WAIT_LIMIT,
		};

		PollPolicy {
			max_wait: Some(limit),
			..*self
		}
	}
}

/////////// Hardware revisions ////////////

pub const REVISIONS: &[&str] = &["rev1", "rev2"];

#[derive(Clone, Debug, PartialEq)]
pub struct HardwareConfig
{
	pub name:            &'static str,
	pub string_count:    usize,
	pub led_count:       usize,
	pub bytes_per_pixel: usize,
	pub channel_order:   ChannelOrder,
	pub layout:          LayoutTransform,

	pub regs_base:   u64,
	pub regs_size:   usize,
	pub registers:   RegisterMap,
	pub fb_size:     usize,
	pub expected_id: Option<u16>,

	pub fifo_capacity_words: usize,
	/// empty count required before a commit, `None` derives it from the frame size
	pub fifo_threshold: Option<usize>,

	pub regs_device: String,
	pub fb_device:   String,
}

impl HardwareConfig
{
	/// Two strips per string, daisy-chained so every other run is reversed.
	pub fn rev1() -> HardwareConfig
	{
		HardwareConfig {
			name:            "rev1",
			string_count:    STRING_COUNT,
			led_count:       LED_COUNT,
			bytes_per_pixel: BYTES_PER_PIXEL,
			channel_order:   ChannelOrder::BRG,
			layout:          LayoutTransform::DaisyChain,

			regs_base:   FPGA_REGS_BASE,
			regs_size:   FPGA_REGS_SIZE,
			registers:   RegisterMap::default(),
			fb_size:     FIFO_DATA_SIZE,
			expected_id: None,

			fifo_capacity_words: FIFO_CAPACITY_WORDS,
			fifo_threshold:      None,

			regs_device: REGS_DEVICE.to_string(),
			fb_device:   FB_DEVICE.to_string(),
		}
	}

	/// Row-major wiring, green and red swapped compared to rev1.
	pub fn rev2() -> HardwareConfig
	{
		HardwareConfig {
			name:          "rev2",
			channel_order: ChannelOrder::BGR,
			layout:        LayoutTransform::Identity,
			..HardwareConfig::rev1()
		}
	}

	pub fn by_name(name: &str) -> Result<HardwareConfig>
	{
		match name {
			"rev1" => Ok(HardwareConfig::rev1()),
			"rev2" => Ok(HardwareConfig::rev2()),
			_      => Err(ConfigError::UnknownRevision(name.to_string())),
		}
	}

	pub fn geometry(&self) -> Geometry
	{
		Geometry {
			string_count:    self.string_count,
			led_count:       self.led_count,
			bytes_per_pixel: self.bytes_per_pixel,
			channel_order:   self.channel_order,
		}
	}

	pub fn frame_bytes(&self) -> usize
	{
		self.string_count * self.led_count * self.bytes_per_pixel
	}

	/// Size of a frame in FIFO words, rounded up.
	pub fn frame_words(&self) -> usize
	{
		(self.frame_bytes() + 1) / 2
	}

	pub fn threshold(&self) -> usize
	{
		self.fifo_threshold.unwrap_or_else(|| self.frame_words())
	}

	/// Empty count of a fully drained FIFO.
	pub fn max_empty_count(&self) -> usize
	{
		self.fifo_capacity_words.saturating_sub(1)
	}

	pub fn validate(&self) -> Result<()>
	{
		if self.string_count == 0 || self.led_count == 0 || self.bytes_per_pixel == 0 {
			return Err(ConfigError::ZeroDimension);
		}

		if self.bytes_per_pixel < 3 {
			return Err(ConfigError::UnsupportedWiring(
				format!("{} bytes per pixel cannot hold three colour channels", self.bytes_per_pixel)));
		}

		if self.frame_bytes() > self.fb_size {
			return Err(ConfigError::FrameTooLarge {
				frame_bytes:  self.frame_bytes(),
				window_bytes: self.fb_size,
			});
		}

		if self.frame_words() > self.fifo_capacity_words {
			return Err(ConfigError::FrameExceedsFifo {
				frame_words:    self.frame_words(),
				capacity_words: self.fifo_capacity_words,
			});
		}

		let threshold = self.threshold();
		if threshold == 0 || threshold > self.max_empty_count() {
			return Err(ConfigError::InvalidThreshold {
				threshold,
				max_empty: self.max_empty_count(),
			});
		}

		if let Some(reg) = self.registers.all().into_iter().find(|&r| 2 * r + 2 > self.regs_size) {
			return Err(ConfigError::RegisterOutsideWindow(reg));
		}

		self.layout.validate(&self.geometry())
			.map_err(|e| ConfigError::UnsupportedWiring(e.to_string()))?;

		Ok(())
	}
}

// vim: noet

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ledstream::animation::{self, AnimationParams, REGISTRY};
use ledstream::color::Color;
use ledstream::config::{HardwareConfig, PollPolicy};
use ledstream::driver::FifoDriver;
use ledstream::driver::capture::CaptureFramebuffer;
use ledstream::driver::mapped::HardwareDriver;
use ledstream::driver::sim::SimRegisters;
use ledstream::stream::StreamLoop;

#[derive(Parser, Debug)]
#[command(version, about = "Streams animations to the FPGA LED matrix")]
struct Args
{
	/// animation to play, see --list
	#[arg(default_value = "default")]
	animation: String,

	/// print the available animations and exit
	#[arg(long)]
	list: bool,

	#[arg(long, short, default_value_t = 0)]
	red: u8,
	#[arg(long, short, default_value_t = 0)]
	green: u8,
	#[arg(long, short, default_value_t = 0)]
	blue: u8,

	/// colour as #rrggbb or r,g,b, overrides --red/--green/--blue
	#[arg(long)]
	color: Option<String>,

	/// colour temperature in Kelvin, overrides any RGB colour
	#[arg(long)]
	temp: Option<f32>,

	/// brightness used with --temp
	#[arg(long, short, default_value_t = 32.0)]
	intensity: f32,

	/// seed for the particle animations
	#[arg(long)]
	seed: Option<u64>,

	/// frames per simulated hour (weather)
	#[arg(long, default_value_t = 60.0)]
	frames_per_hour: f32,

	/// leave the LEDs as they are on exit
	#[arg(long)]
	no_blank: bool,

	/// stop after this many frames, 0 streams forever
	#[arg(long, default_value_t = 0)]
	frames: u64,

	/// render this many frames without hardware and report the frame rate
	#[arg(long)]
	benchmark: Option<u64>,

	/// stream into an in-memory device instead of /dev/mem and /dev/ledfb
	#[arg(long)]
	simulate: bool,

	/// with --simulate, append every frame to this file
	#[arg(long, requires = "simulate")]
	capture: Option<String>,

	/// hardware revision, rev1 or rev2
	#[arg(long, default_value = "rev1")]
	revision: String,

	#[arg(long)]
	strings: Option<usize>,
	#[arg(long)]
	leds: Option<usize>,

	/// free FIFO words required before a commit
	#[arg(long)]
	fifo_threshold: Option<usize>,
}

impl Args
{
	fn hardware(&self) -> Result<HardwareConfig>
	{
		let mut hw = HardwareConfig::by_name(&self.revision)?;

		if let Some(s) = self.strings {
			hw.string_count = s;
		}
		if let Some(l) = self.leds {
			hw.led_count = l;
		}
		if self.fifo_threshold.is_some() {
			hw.fifo_threshold = self.fifo_threshold;
		}

		hw.validate().context("invalid hardware configuration")?;

		Ok(hw)
	}

	fn params(&self) -> Result<AnimationParams>
	{
		let color = match &self.color {
			Some(s) => s.parse::<Color>()?,
			None    => Color::new(self.red, self.green, self.blue),
		};

		Ok(AnimationParams {
			color:           Some(color),
			temperature:     self.temp,
			intensity:       self.intensity,
			seed:            self.seed,
			frames_per_hour: self.frames_per_hour,
		})
	}
}

fn list_animations()
{
	for entry in REGISTRY {
		println!("{:10} {}", entry.name, entry.description);
	}
}

fn main() -> Result<()>
{
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let args = Args::parse();

	if args.list {
		list_animations();
		return Ok(());
	}

	let hw = args.hardware()?;
	let anim = animation::create(&args.animation, &args.params()?, hw.geometry())?;
	let mut player = StreamLoop::new(anim, &hw);

	if let Some(n) = args.benchmark {
		player.benchmark(n);
		return Ok(());
	}

	let cancel = Arc::new(AtomicBool::new(false));
	{
		let cancel = cancel.clone();
		ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))
			.context("cannot install the signal handler")?;
	}

	let limit = if args.frames == 0 { None } else { Some(args.frames) };
	let policy = PollPolicy::default();

	info!("Playing '{}' on {} ({} strings x {} LEDs)", args.animation, hw.name, hw.string_count, hw.led_count);

	let summary = if args.simulate {
		let out: Box<dyn Write> = match &args.capture {
			Some(path) => Box::new(BufWriter::new(
					File::create(path).with_context(|| format!("cannot create {}", path))?)),
			None => Box::new(io::sink()),
		};

		let fb = CaptureFramebuffer::new(hw.fb_size, out);
		let mut driver = FifoDriver::new(SimRegisters::new(&hw), fb, &hw, PollPolicy::immediate(), cancel.clone());
		driver.log_startup(hw.expected_id);
		driver.set_blank_on_close(!args.no_blank);

		player.stream(driver, &cancel, limit)?
	} else {
		let mut driver = HardwareDriver::open(&hw, policy, cancel.clone())
			.context("cannot open the LED hardware")?;
		driver.log_startup(hw.expected_id);
		driver.set_blank_on_close(!args.no_blank);

		player.stream(driver, &cancel, limit)?
	};

	info!("Streamed {} frames, {:?} spent waiting for the FIFO", summary.frames, summary.stats.wait_time);

	Ok(())
}

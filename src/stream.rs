// vim: noet

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::animation::Animation;
use crate::color::Color;
use crate::config::{HardwareConfig, STATS_INTERVAL};
use crate::driver::{CommitStats, DriverError, FifoDriver, FrameBufferDevice, RegisterWindow};
use crate::frame::{LogicalFrame, PhysicalFrame};
use crate::layout::LayoutTransform;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BenchmarkReport
{
	pub frames:  u64,
	pub elapsed: Duration,
}

impl BenchmarkReport
{
	pub fn us_per_frame(&self) -> f64
	{
		if self.frames == 0 {
			return 0.0;
		}
		self.elapsed.as_secs_f64() * 1e6 / self.frames as f64
	}

	pub fn hz(&self) -> f64
	{
		let us = self.us_per_frame();
		if us > 0.0 { 1e6 / us } else { f64::INFINITY }
	}
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StreamSummary
{
	pub frames: u64,
	pub stats:  CommitStats,
}

/*
 * Render -> layout -> commit, one frame at a time. Nothing runs in parallel,
 * so a frame is never touched while the hardware reads it.
 */
pub struct StreamLoop
{
	animation:   Box<dyn Animation>,
	layout:      LayoutTransform,
	logical:     LogicalFrame,
	physical:    PhysicalFrame,
	frame_index: u64,
}

impl StreamLoop
{
	pub fn new(mut animation: Box<dyn Animation>, hw: &HardwareConfig) -> StreamLoop
	{
		let geometry = hw.geometry();
		animation.init();

		StreamLoop {
			animation,
			layout:      hw.layout,
			logical:     LogicalFrame::new(geometry),
			physical:    PhysicalFrame::new(geometry),
			frame_index: 0,
		}
	}

	pub fn frame_index(&self) -> u64
	{
		self.frame_index
	}

	pub fn logical(&self) -> &LogicalFrame
	{
		&self.logical
	}

	/// Renders the current frame and brings it into wire order.
	pub fn render_frame(&mut self) -> &PhysicalFrame
	{
		self.animation.render(self.frame_index, &mut self.logical);
		self.layout.apply(&self.logical, &mut self.physical);

		&self.physical
	}

	/// Colour from an external controller. Garbage is logged and ignored.
	pub fn apply_color(&mut self, text: &str) -> bool
	{
		match text.parse::<Color>() {
			Ok(c) => {
				self.animation.set_color(c);
				true
			},
			Err(e) => {
				warn!("{}, keeping the current colour", e);
				false
			}
		}
	}

	/// Renders `frames` frames without touching any hardware.
	pub fn benchmark(&mut self, frames: u64) -> BenchmarkReport
	{
		let start = Instant::now();

		for _i in 0..frames {
			self.render_frame();
			self.frame_index += 1;
		}

		let report = BenchmarkReport { frames, elapsed: start.elapsed() };

		info!("Animation: {} Frames: {}", self.animation.name(), frames);
		info!("System time: {:0.2} us per frame, {:0.2} Hz", report.us_per_frame(), report.hz());

		report
	}

	/*
	 * Streams until `cancel` is set or `limit` frames went out. The driver is
	 * blanked and closed on every way out of here; a panic reaches the same
	 * path through its Drop.
	 */
	pub fn stream<R, F>(&mut self, mut driver: FifoDriver<R, F>, cancel: &AtomicBool, limit: Option<u64>)
		-> Result<StreamSummary, DriverError>
		where R: RegisterWindow, F: FrameBufferDevice
	{
		let mut result = Ok(());
		let mut frames = 0;

		loop {
			if cancel.load(Ordering::SeqCst) {
				info!("Exiting...");
				break;
			}

			if limit.map_or(false, |l| frames >= l) {
				break;
			}

			self.render_frame();

			match driver.commit(&self.physical) {
				Ok(()) => {},
				Err(DriverError::Cancelled) => {
					info!("Exiting...");
					break;
				},
				Err(e) => {
					error!("{}", e);
					result = Err(e);
					break;
				}
			}

			self.frame_index += 1;
			frames += 1;

			if frames % STATS_INTERVAL == 0 {
				let stats = driver.stats();
				debug!("frame {}: empty count {}, {} sleeps, {:?} waiting",
					self.frame_index, driver.empty_count(), stats.sleeps, stats.wait_time);
			}
		}

		let stats = driver.stats();
		driver.blank_and_close();

		result.map(|()| StreamSummary { frames, stats })
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use std::sync::Arc;
	use crate::animation::{self, AnimationParams};
	use crate::config::PollPolicy;
	use crate::driver::sim::{DeviceEvent, DeviceLog, SimFramebuffer, SimRegisters};

	fn hw() -> HardwareConfig
	{
		HardwareConfig { string_count: 4, led_count: 4, ..HardwareConfig::rev1() }
	}

	fn sim_driver(hw: &HardwareConfig, cancel: Arc<AtomicBool>) -> (FifoDriver<SimRegisters, SimFramebuffer>, DeviceLog)
	{
		let log = DeviceLog::default();
		let fb = SimFramebuffer::new(hw.fb_size, log.clone());
		(FifoDriver::new(SimRegisters::new(hw), fb, hw, PollPolicy::immediate(), cancel), log)
	}

	fn stream_loop(name: &str, hw: &HardwareConfig) -> StreamLoop
	{
		let anim = animation::create(name, &AnimationParams::default(), hw.geometry()).unwrap();
		StreamLoop::new(anim, hw)
	}

	#[test]
	fn streams_limited_frames_then_blanks()
	{
		let hw = hw();
		let cancel = Arc::new(AtomicBool::new(false));
		let (driver, log) = sim_driver(&hw, cancel.clone());
		let mut sl = stream_loop("sequence", &hw);

		let summary = sl.stream(driver, &cancel, Some(3)).unwrap();
		assert_eq!(summary.frames, 3);
		assert_eq!(sl.frame_index(), 3);

		let transfers = log.transfers();
		assert_eq!(transfers.len(), 4);
		// frame 1 lights logical (1, 0), second to last on the daisy chain
		assert_eq!(&transfers[1][42..45], &[0x20, 0x20, 0x20]);
		assert!(transfers[3].iter().all(|&b| b == 0));
		assert_eq!(log.events().last(), Some(&DeviceEvent::Released));
	}

	#[test]
	fn cancelled_before_start_still_blanks()
	{
		let hw = hw();
		let cancel = Arc::new(AtomicBool::new(true));
		let (driver, log) = sim_driver(&hw, cancel.clone());
		let mut sl = stream_loop("solid", &hw);

		let summary = sl.stream(driver, &cancel, None).unwrap();
		assert_eq!(summary.frames, 0);
		assert_eq!(log.events(), vec![DeviceEvent::Transfer(vec![0; 48]), DeviceEvent::Released]);
	}

	#[test]
	fn benchmark_commits_nothing()
	{
		let hw = hw();
		let mut sl = stream_loop("flame", &hw);

		let report = sl.benchmark(25);
		assert_eq!(report.frames, 25);
		assert_eq!(sl.frame_index(), 25);
		assert!(report.hz() > 0.0);
	}

	#[test]
	fn bad_colour_keeps_the_old_one()
	{
		let hw = hw();
		let mut sl = stream_loop("solid", &hw);

		assert!(sl.apply_color("#204060"));
		sl.render_frame();
		assert_eq!(sl.logical().get(2, 3), Color::new(0x20, 0x40, 0x60));

		assert!(!sl.apply_color("not a colour"));
		sl.render_frame();
		assert_eq!(sl.logical().get(2, 3), Color::new(0x20, 0x40, 0x60));
	}
}

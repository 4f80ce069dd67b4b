// vim: noet

/*
 * Frame transfer to the FPGA.
 *
 * Two windows are involved: the register window (device ID, FIFO status and
 * the number of free FIFO words) and the frame buffer exported by the ledfb
 * kernel driver. A commit waits until the FIFO has room for a whole frame,
 * copies the frame into the frame buffer and asks the driver to shift it
 * into the FIFO. There is no acknowledgement, only the empty count.
 *
 * Lifecycle: Open -> Streaming -> Blanking -> Closed. Blanking runs exactly
 * once, from blank_and_close() or from Drop, whichever comes first.
 */

use std::fmt;
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{HardwareConfig, PollPolicy, RegisterMap};
use crate::frame::PhysicalFrame;

pub mod mapped;
pub mod sim;
pub mod capture;

type Result<T> = std::result::Result<T, DriverError>;

/////////// Error Type and Implementation ////////////

#[derive(Debug)]
pub enum DriverError
{
	DeviceUnavailable { path: String, source: io::Error },
	DeviceBusy(String),
	CommitFailed(io::Error),
	FrameSize { expected: usize, actual: usize },
	FifoTimeout(Duration),
	Cancelled,
}

impl fmt::Display for DriverError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			DriverError::DeviceUnavailable { path, source } => write!(f, "cannot open {}: {}", path, source),
			DriverError::DeviceBusy(path) => write!(f, "{} is in use by another process", path),
			DriverError::CommitFailed(e) => write!(f, "frame transfer failed: {}", e),
			DriverError::FrameSize { expected, actual } =>
				write!(f, "frame has {} bytes, the device expects {}", actual, expected),
			DriverError::FifoTimeout(d) => write!(f, "FIFO did not drain within {:?}", d),
			DriverError::Cancelled => write!(f, "cancelled while waiting for the FIFO"),
		}
	}
}

impl StdError for DriverError {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		match self {
			DriverError::DeviceUnavailable { source, .. } => Some(source),
			DriverError::CommitFailed(e) => Some(e),
			_ => None,
		}
	}
}

/////////// Device traits ////////////

/// 16-bit register window. Offsets are in words.
pub trait RegisterWindow
{
	fn read(&mut self, reg: usize) -> u16;
	fn write(&mut self, reg: usize, value: u16);
}

/// Memory the hardware streams frames from.
pub trait FrameBufferDevice
{
	fn buffer(&mut self) -> &mut [u8];

	/// Starts streaming the first `len` bytes of the buffer into the FIFO.
	fn transfer(&mut self, len: usize) -> io::Result<()>;
}

/////////// Driver ////////////

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriverState
{
	Open,
	Streaming,
	Blanking,
	Closed,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CommitStats
{
	pub frames:    u64,
	pub sleeps:    u64,
	pub wait_time: Duration,
}

pub struct FifoDriver<R: RegisterWindow, F: FrameBufferDevice>
{
	regs: R,
	fb:   F,

	registers:   RegisterMap,
	frame_bytes: usize,
	threshold:   usize,
	policy:      PollPolicy,
	cancel:      Arc<AtomicBool>,

	blank_on_close: bool,
	state:          DriverState,
	stats:          CommitStats,
}

impl<R: RegisterWindow, F: FrameBufferDevice> FifoDriver<R, F>
{
	pub fn new(regs: R, fb: F, hw: &HardwareConfig, policy: PollPolicy, cancel: Arc<AtomicBool>) -> FifoDriver<R, F>
	{
		FifoDriver {
			regs,
			fb,
			registers:   hw.registers,
			frame_bytes: hw.frame_bytes(),
			threshold:   hw.threshold(),
			policy,
			cancel,
			blank_on_close: true,
			state:          DriverState::Open,
			stats:          CommitStats::default(),
		}
	}

	pub fn set_blank_on_close(&mut self, blank: bool)
	{
		self.blank_on_close = blank;
	}

	pub fn state(&self) -> DriverState
	{
		self.state
	}

	pub fn stats(&self) -> CommitStats
	{
		self.stats
	}

	pub fn read_id(&mut self) -> u32
	{
		self.regs.read(self.registers.id) as u32
	}

	pub fn reset_status(&mut self) -> u16
	{
		self.regs.read(self.registers.reset_status)
	}

	pub fn fifo_status(&mut self) -> u16
	{
		// first read returns the latched value
		self.regs.read(self.registers.fifo_status);
		self.regs.read(self.registers.fifo_status)
	}

	pub fn empty_count(&mut self) -> usize
	{
		self.regs.read(self.registers.fifo_empty_count);
		self.regs.read(self.registers.fifo_empty_count) as usize
	}

	pub fn hblank(&mut self) -> bool
	{
		self.regs.read(self.registers.hblank) != 0
	}

	pub fn scratch_test(&mut self, pattern: u16) -> bool
	{
		self.regs.write(self.registers.scratch, pattern);
		self.regs.read(self.registers.scratch) == pattern
	}

	/// Logs the diagnostic registers. A wrong ID is reported, not fatal.
	pub fn log_startup(&mut self, expected_id: Option<u16>)
	{
		let id = self.read_id();
		info!("Initialized. ID = 0x{:04x}", id);

		if let Some(expected) = expected_id {
			if id != expected as u32 {
				warn!("unexpected FPGA ID 0x{:04x}, expected 0x{:04x}", id, expected);
			}
		}

		if !self.scratch_test(0xa55a) || !self.scratch_test(0x5aa5) {
			warn!("scratch register does not read back, register window looks wrong");
		}

		let reset = self.reset_status();
		let empty = self.empty_count();
		debug!("Reset status: 0x{:04x} hblank: {}", reset, self.hblank());
		info!("Initial empty count is {}", empty);
		info!("Frame size is {}", self.frame_bytes);
	}

	/*
	 * Blocks until the FIFO has `threshold` free words. Only the streaming
	 * path can be cancelled, blanking has to get through.
	 */
	fn wait_for_space(&mut self, policy: PollPolicy, cancellable: bool) -> Result<()>
	{
		let start = Instant::now();

		// discard the latched value
		self.regs.read(self.registers.fifo_empty_count);

		loop {
			let empty = self.regs.read(self.registers.fifo_empty_count) as usize;
			if empty >= self.threshold {
				break;
			}

			if cancellable && self.cancel.load(Ordering::SeqCst) {
				self.stats.wait_time += start.elapsed();
				return Err(DriverError::Cancelled);
			}

			if let Some(max_wait) = policy.max_wait {
				if start.elapsed() >= max_wait {
					self.stats.wait_time += start.elapsed();
					return Err(DriverError::FifoTimeout(max_wait));
				}
			}

			sleep(policy.interval);
			self.stats.sleeps += 1;
		}

		self.stats.wait_time += start.elapsed();
		Ok(())
	}

	/// Waits for FIFO space, then hands the whole frame to the hardware.
	pub fn commit(&mut self, frame: &PhysicalFrame) -> Result<()>
	{
		let data = frame.as_bytes();
		if data.len() != self.frame_bytes {
			return Err(DriverError::FrameSize { expected: self.frame_bytes, actual: data.len() });
		}

		self.wait_for_space(self.policy, true)?;

		self.fb.buffer()[..self.frame_bytes].copy_from_slice(data);
		self.fb.transfer(self.frame_bytes).map_err(DriverError::CommitFailed)?;

		self.state = DriverState::Streaming;
		self.stats.frames += 1;

		Ok(())
	}

	/// Turns all LEDs off and releases both windows. Errors are logged only.
	pub fn blank_and_close(mut self)
	{
		self.shutdown();
	}

	fn shutdown(&mut self)
	{
		if self.state == DriverState::Closed {
			return;
		}

		if self.blank_on_close {
			self.state = DriverState::Blanking;
			self.blank();
		}

		let status = self.fifo_status();
		let empty = self.empty_count();
		info!("FIFO status: 0x{:04x} empty: {}", status, empty);
		info!("{} frames committed, {} sleeps, {:?} waiting for the FIFO",
			self.stats.frames, self.stats.sleeps, self.stats.wait_time);

		self.state = DriverState::Closed;
	}

	fn blank(&mut self)
	{
		let len = self.frame_bytes;
		self.fb.buffer()[..len].fill(0);

		if let Err(e) = self.wait_for_space(self.policy.for_blanking(), false) {
			warn!("blanking without FIFO headroom: {}", e);
		}

		match self.fb.transfer(len) {
			Ok(()) => self.stats.frames += 1,
			Err(e) => warn!("could not send blank frame: {}", e),
		}

		// let the hardware shift the last frame out before the windows go away
		sleep(self.policy.settle);
	}
}

impl<R: RegisterWindow, F: FrameBufferDevice> Drop for FifoDriver<R, F>
{
	fn drop(&mut self)
	{
		self.shutdown();
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::driver::sim::{DeviceEvent, DeviceLog, SimFramebuffer, SimRegisters};
	use crate::frame::Geometry;
	use crate::color::ChannelOrder;

	fn hw(threshold: usize) -> HardwareConfig
	{
		HardwareConfig {
			string_count: 4,
			led_count: 4,
			fifo_threshold: Some(threshold),
			..HardwareConfig::rev1()
		}
	}

	fn geometry() -> Geometry
	{
		Geometry { string_count: 4, led_count: 4, bytes_per_pixel: 3, channel_order: ChannelOrder::BRG }
	}

	fn driver(script: &[u16], threshold: usize, policy: PollPolicy)
		-> (FifoDriver<SimRegisters, SimFramebuffer>, DeviceLog, Arc<AtomicBool>)
	{
		let hw = hw(threshold);
		let log = DeviceLog::default();
		let cancel = Arc::new(AtomicBool::new(false));

		let mut regs = SimRegisters::new(&hw);
		regs.script_empty_counts(script);
		let fb = SimFramebuffer::new(hw.fb_size, log.clone());

		(FifoDriver::new(regs, fb, &hw, policy, cancel.clone()), log, cancel)
	}

	#[test]
	fn commit_waits_for_headroom()
	{
		let (mut drv, log, _cancel) = driver(&[100, 100, 2048, 2048], 2048, PollPolicy::immediate());
		let mut frame = PhysicalFrame::new(geometry());
		frame.as_bytes_mut()[0] = 0x42;

		drv.commit(&frame).unwrap();

		assert_eq!(drv.stats().sleeps, 1);
		assert_eq!(drv.stats().frames, 1);
		assert_eq!(drv.state(), DriverState::Streaming);
		assert_eq!(log.transfers(), vec![frame.as_bytes().to_vec()]);
	}

	#[test]
	fn commit_without_waiting_when_fifo_is_empty()
	{
		let (mut drv, log, _cancel) = driver(&[], 2048, PollPolicy::immediate());
		let frame = PhysicalFrame::new(geometry());

		drv.commit(&frame).unwrap();
		drv.commit(&frame).unwrap();

		assert_eq!(drv.stats().sleeps, 0);
		assert_eq!(log.transfers().len(), 2);
	}

	#[test]
	fn wrong_frame_size_is_rejected()
	{
		let (mut drv, log, _cancel) = driver(&[], 16, PollPolicy::immediate());
		let frame = PhysicalFrame::new(Geometry { led_count: 5, ..geometry() });

		assert!(matches!(drv.commit(&frame), Err(DriverError::FrameSize { expected: 48, actual: 60 })));
		assert!(log.transfers().is_empty());
	}

	#[test]
	fn full_fifo_times_out_with_bounded_policy()
	{
		let policy = PollPolicy { max_wait: Some(Duration::ZERO), ..PollPolicy::immediate() };
		let (mut drv, log, _cancel) = driver(&[100; 8], 2048, policy);

		assert!(matches!(drv.commit(&PhysicalFrame::new(geometry())), Err(DriverError::FifoTimeout(_))));
		assert!(log.transfers().is_empty());
	}

	#[test]
	fn cancel_before_wait_still_blanks()
	{
		let (mut drv, log, cancel) = driver(&[100, 100, 100], 2048, PollPolicy::immediate());
		cancel.store(true, Ordering::SeqCst);

		let mut frame = PhysicalFrame::new(geometry());
		frame.as_bytes_mut().fill(0x10);

		assert!(matches!(drv.commit(&frame), Err(DriverError::Cancelled)));
		drv.blank_and_close();

		let events = log.events();
		assert_eq!(events.len(), 2);
		assert_eq!(events[0], DeviceEvent::Transfer(vec![0; 48]));
		assert_eq!(events[1], DeviceEvent::Released);
	}

	#[test]
	fn cancel_raised_while_polling()
	{
		let policy = PollPolicy { interval: Duration::from_millis(1), max_wait: None, settle: Duration::ZERO };
		let (mut drv, log, cancel) = driver(&[100; 2000], 2048, policy);

		let raiser = {
			let cancel = cancel.clone();
			std::thread::spawn(move || {
				sleep(Duration::from_millis(20));
				cancel.store(true, Ordering::SeqCst);
			})
		};

		let mut frame = PhysicalFrame::new(geometry());
		frame.as_bytes_mut().fill(0x10);

		assert!(matches!(drv.commit(&frame), Err(DriverError::Cancelled)));
		raiser.join().unwrap();
		assert!(drv.stats().sleeps > 0);

		// the FIFO is still full, blanking gives up waiting and sends anyway
		drv.blank_and_close();
		assert_eq!(log.events(), vec![DeviceEvent::Transfer(vec![0; 48]), DeviceEvent::Released]);
	}

	#[test]
	fn blank_is_last_before_release()
	{
		let (mut drv, log, _cancel) = driver(&[], 16, PollPolicy::immediate());
		let mut frame = PhysicalFrame::new(geometry());
		frame.as_bytes_mut().fill(0xff);

		drv.commit(&frame).unwrap();
		drv.blank_and_close();

		let events = log.events();
		assert_eq!(events.last(), Some(&DeviceEvent::Released));
		assert_eq!(events[events.len() - 2], DeviceEvent::Transfer(vec![0; 48]));
		assert_eq!(log.transfers()[0], vec![0xff; 48]);
	}

	#[test]
	fn dropping_the_driver_blanks_once()
	{
		let (drv, log, _cancel) = driver(&[], 16, PollPolicy::immediate());
		drop(drv);

		assert_eq!(log.events(), vec![DeviceEvent::Transfer(vec![0; 48]), DeviceEvent::Released]);
	}

	#[test]
	fn no_blank_only_releases()
	{
		let (mut drv, log, _cancel) = driver(&[], 16, PollPolicy::immediate());
		drv.set_blank_on_close(false);
		drv.commit(&PhysicalFrame::new(geometry())).unwrap();
		drv.blank_and_close();

		assert_eq!(log.events().len(), 2);
		assert_eq!(log.events()[1], DeviceEvent::Released);
	}

	#[test]
	fn diagnostics_read_registers()
	{
		let (mut drv, _log, _cancel) = driver(&[], 16, PollPolicy::immediate());

		assert_eq!(drv.read_id(), sim::SIM_ID as u32);
		assert!(drv.scratch_test(0xa55a));
		assert_eq!(drv.empty_count(), hw(16).max_empty_count());
		assert!(!drv.hblank());
	}
}

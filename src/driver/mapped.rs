// vim: noet

/*
 * The real hardware: registers through /dev/mem, frames through /dev/ledfb.
 */

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::ptr::{read_volatile, write_volatile};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use memmap2::{MmapMut, MmapOptions};
use nix::fcntl::{Flock, FlockArg, OFlag};
use nix::ioctl_write_int_bad;

use crate::config::{HardwareConfig, PollPolicy};
use crate::driver::{DriverError, FifoDriver, FrameBufferDevice, RegisterWindow};

// the ledfb driver takes the number of bytes to send as the argument
const FB_IOC_FLUSH: u32 = 0;
ioctl_write_int_bad!(flush_buffer, FB_IOC_FLUSH);

fn unavailable(path: &str) -> impl FnOnce(io::Error) -> DriverError + '_
{
	move |source| DriverError::DeviceUnavailable { path: path.to_string(), source }
}

pub struct MappedRegisters
{
	mmap: MmapMut,
	// keeps the descriptor open for as long as the mapping lives
	_file: File,
}

impl MappedRegisters
{
	pub fn open(path: &str, base: u64, size: usize) -> Result<MappedRegisters, DriverError>
	{
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.custom_flags(OFlag::O_SYNC.bits())
			.open(path)
			.map_err(unavailable(path))?;

		let mmap = unsafe {
			MmapOptions::new()
				.offset(base)
				.len(size)
				.map_mut(&file)
		}.map_err(unavailable(path))?;

		Ok(MappedRegisters { mmap, _file: file })
	}

	fn word_ptr(&mut self, reg: usize) -> *mut u16
	{
		assert!(2 * reg + 2 <= self.mmap.len(), "register 0x{:x} outside the window", reg);
		unsafe { self.mmap.as_mut_ptr().add(2 * reg) as *mut u16 }
	}
}

impl RegisterWindow for MappedRegisters
{
	fn read(&mut self, reg: usize) -> u16
	{
		let p = self.word_ptr(reg);
		unsafe { read_volatile(p) }
	}

	fn write(&mut self, reg: usize, value: u16)
	{
		let p = self.word_ptr(reg);
		unsafe { write_volatile(p, value) }
	}
}

pub struct LedFramebuffer
{
	mmap: MmapMut,
	// exclusive lock, the hardware has no arbitration between writers
	file: Flock<File>,
}

impl LedFramebuffer
{
	pub fn open(path: &str, size: usize) -> Result<LedFramebuffer, DriverError>
	{
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.open(path)
			.map_err(unavailable(path))?;

		let file = Flock::lock(file, FlockArg::LockExclusiveNonblock)
			.map_err(|_| DriverError::DeviceBusy(path.to_string()))?;

		let mmap = unsafe {
			MmapOptions::new()
				.offset(0)
				.len(size)
				.map_mut(&*file)
		}.map_err(unavailable(path))?;

		Ok(LedFramebuffer { mmap, file })
	}
}

impl FrameBufferDevice for LedFramebuffer
{
	fn buffer(&mut self) -> &mut [u8]
	{
		&mut self.mmap[..]
	}

	fn transfer(&mut self, len: usize) -> io::Result<()>
	{
		let len = i32::try_from(len)
			.map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "transfer length too large"))?;

		unsafe { flush_buffer(self.file.as_raw_fd(), len) }?;
		Ok(())
	}
}

pub type HardwareDriver = FifoDriver<MappedRegisters, LedFramebuffer>;

impl HardwareDriver
{
	/// Maps both windows. Fails if either device is missing, busy or not mappable.
	pub fn open(hw: &HardwareConfig, policy: PollPolicy, cancel: Arc<AtomicBool>) -> Result<HardwareDriver, DriverError>
	{
		let regs = MappedRegisters::open(&hw.regs_device, hw.regs_base, hw.regs_size)?;
		let fb = LedFramebuffer::open(&hw.fb_device, hw.fb_size)?;

		Ok(FifoDriver::new(regs, fb, hw, policy, cancel))
	}
}

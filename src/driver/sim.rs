// vim: noet

/*
 * In-memory stand-ins for the FPGA. Used by --simulate and by the tests.
 */

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};

use crate::config::{HardwareConfig, RegisterMap};
use crate::driver::{FrameBufferDevice, RegisterWindow};

pub const SIM_ID: u16 = 0x4c45;

/// Register window backed by a byte image of the real window.
pub struct SimRegisters
{
	window:    Vec<u8>,
	registers: RegisterMap,
	script:    VecDeque<u16>,
}

impl SimRegisters
{
	pub fn new(hw: &HardwareConfig) -> SimRegisters
	{
		let mut s = SimRegisters {
			window:    vec![0; hw.regs_size],
			registers: hw.registers,
			script:    VecDeque::new(),
		};

		s.store(hw.registers.id, SIM_ID);
		s.store(hw.registers.fifo_empty_count, hw.max_empty_count().min(u16::MAX as usize) as u16);

		s
	}

	/// Successive reads of the empty count return these values, then the stored one.
	pub fn script_empty_counts(&mut self, counts: &[u16])
	{
		self.script.extend(counts.iter().copied());
	}

	fn store(&mut self, reg: usize, value: u16)
	{
		LittleEndian::write_u16(&mut self.window[2 * reg ..], value);
	}
}

impl RegisterWindow for SimRegisters
{
	fn read(&mut self, reg: usize) -> u16
	{
		if reg == self.registers.fifo_empty_count {
			if let Some(v) = self.script.pop_front() {
				return v;
			}
		}

		LittleEndian::read_u16(&self.window[2 * reg ..])
	}

	fn write(&mut self, reg: usize, value: u16)
	{
		// only scratch and reset are writable on the real thing
		if reg == self.registers.scratch || reg == self.registers.reset_status {
			self.store(reg, value);
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent
{
	Transfer(Vec<u8>),
	Released,
}

/// Everything that happened to a simulated frame buffer, shared with the test.
#[derive(Clone, Default)]
pub struct DeviceLog
{
	events: Rc<RefCell<Vec<DeviceEvent>>>,
}

impl DeviceLog
{
	pub fn events(&self) -> Vec<DeviceEvent>
	{
		self.events.borrow().clone()
	}

	pub fn transfers(&self) -> Vec<Vec<u8>>
	{
		self.events.borrow().iter()
			.filter_map(|e| match e {
				DeviceEvent::Transfer(data) => Some(data.clone()),
				DeviceEvent::Released => None,
			})
			.collect()
	}

	pub fn last_transfer(&self) -> Option<Vec<u8>>
	{
		self.transfers().pop()
	}

	fn push(&self, e: DeviceEvent)
	{
		self.events.borrow_mut().push(e);
	}
}

pub struct SimFramebuffer
{
	buf: Vec<u8>,
	log: DeviceLog,
}

impl SimFramebuffer
{
	pub fn new(size: usize, log: DeviceLog) -> SimFramebuffer
	{
		SimFramebuffer {
			buf: vec![0; size],
			log,
		}
	}
}

impl FrameBufferDevice for SimFramebuffer
{
	fn buffer(&mut self) -> &mut [u8]
	{
		&mut self.buf
	}

	fn transfer(&mut self, len: usize) -> io::Result<()>
	{
		if len == 0 || len > self.buf.len() {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid transfer length"));
		}

		self.log.push(DeviceEvent::Transfer(self.buf[..len].to_vec()));
		Ok(())
	}
}

impl Drop for SimFramebuffer
{
	fn drop(&mut self)
	{
		self.log.push(DeviceEvent::Released);
	}
}

// vim: noet

/*
 * Frame buffer that appends every transferred frame to a stream instead of
 * driving LEDs. Each record is the frame length as u32 little endian followed
 * by the frame bytes.
 */

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::driver::FrameBufferDevice;

pub struct CaptureFramebuffer<W: Write>
{
	buf: Vec<u8>,
	out: W,
}

impl<W: Write> CaptureFramebuffer<W>
{
	pub fn new(size: usize, out: W) -> CaptureFramebuffer<W>
	{
		CaptureFramebuffer {
			buf: vec![0; size],
			out,
		}
	}
}

impl<W: Write> FrameBufferDevice for CaptureFramebuffer<W>
{
	fn buffer(&mut self) -> &mut [u8]
	{
		&mut self.buf
	}

	fn transfer(&mut self, len: usize) -> io::Result<()>
	{
		if len > self.buf.len() {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, "transfer longer than the frame buffer"));
		}

		self.out.write_u32::<LittleEndian>(len as u32)?;
		self.out.write_all(&self.buf[..len])?;
		self.out.flush()
	}
}

/// Reads back a capture stream until EOF.
pub fn read_frames<R: Read>(mut input: R) -> io::Result<Vec<Vec<u8>>>
{
	let mut frames = Vec::new();

	loop {
		let len = match input.read_u32::<LittleEndian>() {
			Ok(len) => len as usize,
			Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
			Err(e) => return Err(e),
		};

		let mut frame = vec![0; len];
		input.read_exact(&mut frame)?;
		frames.push(frame);
	}

	Ok(frames)
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn frames_are_length_prefixed()
	{
		let mut fb = CaptureFramebuffer::new(6, Vec::new());

		fb.buffer().copy_from_slice(&[1, 2, 3, 4, 5, 6]);
		fb.transfer(6).unwrap();
		fb.buffer().fill(0);
		fb.transfer(3).unwrap();

		assert_eq!(&fb.out[..4], &[6, 0, 0, 0]);

		let frames = read_frames(&fb.out[..]).unwrap();
		assert_eq!(frames, vec![vec![1, 2, 3, 4, 5, 6], vec![0, 0, 0]]);
	}

	#[test]
	fn truncated_capture_is_an_error()
	{
		let data = [4u8, 0, 0, 0, 1, 2];
		assert!(read_frames(&data[..]).is_err());
	}
}

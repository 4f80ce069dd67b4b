// vim: noet

/*
 * Frame pipeline for the FPGA LED matrix: animations render a logical frame,
 * the layout brings it into wiring order and the FIFO driver hands it to the
 * hardware.
 */

pub mod animation;
pub mod color;
pub mod config;
pub mod driver;
pub mod frame;
pub mod layout;
pub mod stream;

// Serial module - serialport-backed link opener
pub mod client;

pub use client::SerialOpener;

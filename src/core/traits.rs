//! Collaborator seams.
//!
//! The core never touches a radio. It builds complete injectable frames and
//! hands them to a [`RawFrameSink`]; captured frames come back as plain byte
//! slices.

use std::io;

/// Something that injects raw radio frames.
///
/// A pcap injection handle in production; a `Vec` or a loopback medium in
/// tests.
pub trait RawFrameSink {
    /// Inject one frame (radiotap header included).
    fn send_raw_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

impl RawFrameSink for Vec<Vec<u8>> {
    fn send_raw_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.push(frame.to_vec());
        Ok(())
    }
}

impl<S: RawFrameSink + ?Sized> RawFrameSink for &mut S {
    fn send_raw_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).send_raw_frame(frame)
    }
}

impl<S: RawFrameSink + ?Sized> RawFrameSink for Box<S> {
    fn send_raw_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).send_raw_frame(frame)
    }
}

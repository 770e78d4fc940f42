//! One-shot report from the daemon side back to the launcher.
//!
//! The launcher blocks on the read end of a pipe until the daemon reports
//! either its pid (ready) or the step that failed and its errno. If every
//! write end closes first, the daemon side died without reporting.
//!
//! Frame: `[tag: u8][stage: u8][value: i32 little-endian]`.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::OwnedFd;

use nix::unistd::Pid;

use crate::error::{DetachStage, LaunchError};

const FRAME_LEN: usize = 6;
const TAG_READY: u8 = b'R';
const TAG_FAILED: u8 = b'F';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Report {
    Ready(Pid),
    Failed { stage: DetachStage, errno: i32 },
}

impl Report {
    fn encode(self) -> [u8; FRAME_LEN] {
        let (tag, stage, value) = match self {
            Self::Ready(pid) => (TAG_READY, 0, pid.as_raw()),
            Self::Failed { stage, errno } => (TAG_FAILED, stage.code(), errno),
        };
        let v = value.to_le_bytes();
        [tag, stage, v[0], v[1], v[2], v[3]]
    }

    fn decode(frame: [u8; FRAME_LEN]) -> Option<Self> {
        let value = i32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]]);
        match frame[0] {
            TAG_READY if value > 0 => Some(Self::Ready(Pid::from_raw(value))),
            TAG_FAILED => DetachStage::from_code(frame[1]).map(|stage| Self::Failed {
                stage,
                errno: value,
            }),
            _ => None,
        }
    }

    pub(crate) fn into_result(self) -> Result<Pid, LaunchError> {
        match self {
            Self::Ready(pid) => Ok(pid),
            Self::Failed { stage, errno } => Err(LaunchError::detach(
                stage,
                io::Error::from_raw_os_error(errno),
            )),
        }
    }
}

/// Write end, owned by the daemon side.
pub(crate) struct Reporter(File);

impl Reporter {
    pub(crate) fn new(fd: OwnedFd) -> Self {
        Self(File::from(fd))
    }

    /// Send the report and close the pipe.
    pub(crate) fn send(mut self, report: Report) -> io::Result<()> {
        self.0.write_all(&report.encode())
    }
}

/// Block until the daemon side reports.
pub(crate) fn receive(fd: OwnedFd) -> Result<Report, LaunchError> {
    let mut file = File::from(fd);
    let mut frame = [0u8; FRAME_LEN];

    match file.read_exact(&mut frame) {
        Ok(()) => Report::decode(frame).ok_or(LaunchError::HandshakeLost),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(LaunchError::HandshakeLost),
        Err(e) => Err(LaunchError::detach(DetachStage::Pipe, e)),
    }
}

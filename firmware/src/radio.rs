//! [`PeerLink`] over the UART-attached radio module.
//!
//! Requests are written as frames and the call then waits for the module's
//! own completion frame: `Reply`/`SendFailed` for direct messages and
//! `TransferQueued`/`TransferFailed` for store-and-forward payloads. Link
//! notices that arrive while waiting are parked in an inbox and handed out
//! by [`RadioLink::next_notice`].

use alert_core::delivery::{LinkError, PeerLink};
use alert_core::link::{
    FrameAccumulator, LinkNotice, LinkStatus, MAX_FRAME_LEN, RadioEvent, RadioRequest,
};
use alert_core::wire::Envelope;
use embedded_io_async::{Read, Write};
use heapless::Deque;

/// Notices buffered while a request is outstanding.
pub const NOTICE_INBOX_DEPTH: usize = 4;

const READ_CHUNK: usize = 64;

pub struct RadioLink<IO> {
    io: IO,
    frames: FrameAccumulator,
    status: LinkStatus,
    inbox: Deque<LinkNotice, NOTICE_INBOX_DEPTH>,
    dropped_notices: u32,
}

impl<IO> RadioLink<IO>
where
    IO: Read + Write,
{
    pub const fn new(io: IO) -> Self {
        Self {
            io,
            frames: FrameAccumulator::new(),
            status: LinkStatus {
                paired: false,
                reachable: false,
            },
            inbox: Deque::new(),
            dropped_notices: 0,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// Notices lost because the inbox was full.
    pub fn dropped_notices(&self) -> u32 {
        self.dropped_notices
    }

    /// Removes a notice parked during an earlier request.
    pub fn take_parked(&mut self) -> Option<LinkNotice> {
        self.inbox.pop_front()
    }

    /// Waits for the next unsolicited notice from the radio.
    ///
    /// Dropping the returned future is safe: bytes already read stay in the
    /// frame accumulator.
    pub async fn next_notice(&mut self) -> Result<LinkNotice, LinkError> {
        if let Some(notice) = self.inbox.pop_front() {
            return Ok(notice);
        }

        loop {
            match self.read_event().await? {
                RadioEvent::Notice(notice) => return Ok(notice),
                other => log_stray_event(&other),
            }
        }
    }

    async fn request(&mut self, request: &RadioRequest) -> Result<(), LinkError> {
        let frame = request.to_frame().map_err(|_| LinkError::Transport)?;
        let mut out = [0u8; MAX_FRAME_LEN];
        let len = frame.encode(&mut out).map_err(|_| LinkError::Transport)?;
        self.io
            .write_all(&out[..len])
            .await
            .map_err(|_| LinkError::Transport)?;
        self.io.flush().await.map_err(|_| LinkError::Transport)
    }

    async fn read_event(&mut self) -> Result<RadioEvent, LinkError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            while let Some(result) = self.frames.next_frame() {
                let decoded = result.and_then(|frame| RadioEvent::from_frame(&frame));
                match decoded {
                    Ok(event) => {
                        if let RadioEvent::Notice(LinkNotice::Status(status)) = &event {
                            self.status = *status;
                        }
                        return Ok(event);
                    }
                    Err(error) => log_frame_error(error),
                }
            }

            let count = self
                .io
                .read(&mut chunk)
                .await
                .map_err(|_| LinkError::Transport)?;
            if count == 0 {
                return Err(LinkError::Transport);
            }
            self.frames.push(&chunk[..count]);
        }
    }

    fn park(&mut self, notice: LinkNotice) {
        if self.inbox.push_back(notice).is_err() {
            self.dropped_notices = self.dropped_notices.saturating_add(1);
        }
    }
}

impl<IO> PeerLink for RadioLink<IO>
where
    IO: Read + Write,
{
    fn is_paired(&self) -> bool {
        self.status.paired
    }

    fn is_reachable(&self) -> bool {
        self.status.paired && self.status.reachable
    }

    async fn send_message(&mut self, message: &Envelope) -> Result<Envelope, LinkError> {
        self.request(&RadioRequest::Message(message.clone())).await?;
        loop {
            match self.read_event().await? {
                RadioEvent::Reply(reply) => return Ok(reply),
                RadioEvent::SendFailed(error) => return Err(error),
                RadioEvent::Notice(notice) => self.park(notice),
                other => log_stray_event(&other),
            }
        }
    }

    async fn transfer(&mut self, payload: &Envelope) -> Result<(), LinkError> {
        self.request(&RadioRequest::Transfer(payload.clone())).await?;
        loop {
            match self.read_event().await? {
                RadioEvent::TransferQueued => return Ok(()),
                RadioEvent::TransferFailed(error) => return Err(error),
                RadioEvent::Notice(notice) => self.park(notice),
                other => log_stray_event(&other),
            }
        }
    }
}

#[cfg(target_os = "none")]
fn log_stray_event(event: &RadioEvent) {
    let kind = match event {
        RadioEvent::Reply(_) => "reply",
        RadioEvent::SendFailed(_) => "send-failed",
        RadioEvent::TransferQueued => "transfer-queued",
        RadioEvent::TransferFailed(_) => "transfer-failed",
        RadioEvent::Notice(_) => "notice",
    };
    defmt::warn!("radio: ignoring unexpected {} frame", kind);
}

#[cfg(not(target_os = "none"))]
fn log_stray_event(event: &RadioEvent) {
    println!("radio: ignoring unexpected frame {event:?}");
}

#[cfg(target_os = "none")]
fn log_frame_error(error: alert_core::link::FrameError) {
    defmt::warn!("radio: dropped frame ({})", defmt::Display2Format(&error));
}

#[cfg(not(target_os = "none"))]
fn log_frame_error(error: alert_core::link::FrameError) {
    println!("radio: dropped frame ({error})");
}

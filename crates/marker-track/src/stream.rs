//! Length-prefixed frame transport over TCP.
//!
//! Each message is a 4-byte big-endian signed length followed by the payload.
//! Payloads longer than `i32::MAX` bytes are sent with a length of `-1`
//! followed by an 8-byte big-endian unsigned length.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{
    Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use marker_track_core::{wire_frame_len, BgrFrame, FrameError};

use crate::slot::{frame_slot, FrameSlot, SlotPublisher};
use crate::source::{FrameSource, NextFrame};

const LONG_LENGTH_MARKER: i32 = -1;

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid message length prefix {0}")]
    InvalidLength(i64),
    #[error("message of {len} bytes exceeds the limit of {max} bytes")]
    MessageTooLarge { len: u64, max: u64 },
    #[error("address {0:?} did not resolve")]
    Unresolved(String),
}

/// Write one length-prefixed message.
pub fn write_message<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    match i32::try_from(payload.len()) {
        Ok(len) => w.write_all(&len.to_be_bytes())?,
        Err(_) => {
            w.write_all(&LONG_LENGTH_MARKER.to_be_bytes())?;
            w.write_all(&(payload.len() as u64).to_be_bytes())?;
        }
    }
    w.write_all(payload)?;
    w.flush()
}

/// Read one length-prefixed message of at most `max_len` bytes.
///
/// Returns `Ok(None)` on a clean end of stream before the next header.
pub fn read_message<R: Read>(r: &mut R, max_len: u64) -> Result<Option<Vec<u8>>, StreamError> {
    let mut head = [0u8; 4];
    match r.read_exact(&mut head) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = match i32::from_be_bytes(head) {
        LONG_LENGTH_MARKER => {
            let mut long = [0u8; 8];
            r.read_exact(&mut long)?;
            u64::from_be_bytes(long)
        }
        n if n < 0 => return Err(StreamError::InvalidLength(n as i64)),
        n => n as u64,
    };
    if len > max_len {
        return Err(StreamError::MessageTooLarge { len, max: max_len });
    }
    let mut payload = vec![0u8; len as usize];
    r.read_exact(&mut payload)?;
    Ok(Some(payload))
}

fn resolve(address: &str) -> Result<SocketAddr, StreamError> {
    address
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| StreamError::Unresolved(address.to_string()))
}

/// Handle that breaks a blocked [`StreamFrameSource`] read from another
/// thread. Once interrupted the source stays disconnected.
#[derive(Clone, Debug, Default)]
pub struct StreamInterrupt {
    inner: Arc<Mutex<InterruptState>>,
}

#[derive(Debug, Default)]
struct InterruptState {
    interrupted: bool,
    conn: Option<TcpStream>,
}

impl StreamInterrupt {
    fn lock(&self) -> MutexGuard<'_, InterruptState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shut down the current connection, if any, and refuse new ones.
    pub fn interrupt(&self) {
        let mut state = self.lock();
        state.interrupted = true;
        if let Some(conn) = state.conn.take() {
            if let Err(e) = conn.shutdown(Shutdown::Both) {
                log::debug!("frame stream shutdown: {e}");
            }
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.lock().interrupted
    }

    /// Track `conn` so that [`Self::interrupt`] can reach it; `false` when
    /// already interrupted.
    fn watch(&self, conn: &TcpStream) -> bool {
        let mut state = self.lock();
        if state.interrupted {
            return false;
        }
        state.conn = match conn.try_clone() {
            Ok(clone) => Some(clone),
            Err(e) => {
                log::warn!("frame stream cannot be interrupted: {e}");
                None
            }
        };
        true
    }

    fn forget(&self) {
        self.lock().conn = None;
    }
}

/// Byte-stream client that connects lazily and reconnects after a drop.
///
/// Connection failures and end of stream are reported as
/// [`NextFrame::NotAvailable`]; the next call tries again. A length prefix
/// that cannot describe a frame is fatal.
pub struct StreamFrameSource {
    address: String,
    width: usize,
    height: usize,
    frame_len: usize,
    max_len: u64,
    conn: Option<TcpStream>,
    interrupt: StreamInterrupt,
}

impl StreamFrameSource {
    pub fn new(address: impl Into<String>, width: usize, height: usize) -> Self {
        let frame_len = wire_frame_len(width, height).unwrap_or(usize::MAX);
        // Oversized messages are still read so that a wrong frame size
        // surfaces as a malformed frame; only absurd lengths are refused.
        let max_len = frame_len.checked_mul(16).map_or(u64::MAX, |n| n as u64);
        Self {
            address: address.into(),
            width,
            height,
            frame_len,
            max_len,
            conn: None,
            interrupt: StreamInterrupt::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn interrupt_handle(&self) -> StreamInterrupt {
        self.interrupt.clone()
    }

    fn disconnect(&mut self) {
        self.conn = None;
        self.interrupt.forget();
    }

    /// Next raw message, or `None` while not connected or after the peer
    /// went away.
    pub fn next_blob(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if self.conn.is_none() {
            if self.interrupt.is_interrupted() {
                return Ok(None);
            }
            match resolve(&self.address).and_then(|a| Ok(TcpStream::connect(a)?)) {
                Ok(stream) => {
                    if !self.interrupt.watch(&stream) {
                        return Ok(None);
                    }
                    log::info!("connected to frame stream at {}", self.address);
                    self.conn = Some(stream);
                }
                Err(e) => {
                    log::debug!("frame stream {} unavailable: {e}", self.address);
                    return Ok(None);
                }
            }
        }
        let Some(stream) = self.conn.as_mut() else {
            return Ok(None);
        };
        match read_message(stream, self.max_len) {
            Ok(Some(blob)) => Ok(Some(blob)),
            Ok(None) => {
                log::info!("frame stream {} closed", self.address);
                self.disconnect();
                Ok(None)
            }
            Err(StreamError::MessageTooLarge { len, .. }) => {
                self.disconnect();
                Err(FrameError::MalformedFrame {
                    expected: self.frame_len,
                    got: usize::try_from(len).unwrap_or(usize::MAX),
                })
            }
            Err(StreamError::InvalidLength(prefix)) => {
                self.disconnect();
                Err(FrameError::InvalidLengthPrefix(prefix))
            }
            Err(e) => {
                log::warn!("frame stream {} dropped: {e}", self.address);
                self.disconnect();
                Ok(None)
            }
        }
    }
}

impl FrameSource for StreamFrameSource {
    fn next_frame(&mut self) -> Result<NextFrame, FrameError> {
        match self.next_blob()? {
            Some(blob) => {
                BgrFrame::from_f32_le_bytes(self.width, self.height, &blob).map(NextFrame::Frame)
            }
            None => Ok(NextFrame::NotAvailable),
        }
    }
}

/// Background thread draining a [`StreamFrameSource`] into a slot.
pub struct StreamReader {
    interrupt: StreamInterrupt,
    handle: Option<JoinHandle<Result<(), FrameError>>>,
}

impl StreamReader {
    /// Interrupt the reader, even inside a blocked read, and wait for it.
    ///
    /// Returns the fatal error that ended the reader early, if any. The
    /// reader's publisher is dropped on exit, which closes the slot and ends
    /// the tracking loop.
    pub fn stop(mut self) -> Result<(), FrameError> {
        self.interrupt.interrupt();
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(result)) => result,
            Some(Err(_)) => {
                log::error!("stream reader thread panicked");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Spawn a reader thread feeding raw frame blobs into a fresh slot.
///
/// While the stream is unavailable the thread sleeps `retry` between
/// connection attempts. A malformed length prefix ends the thread and is
/// returned by [`StreamReader::stop`].
pub fn spawn_stream_reader(
    mut source: StreamFrameSource,
    retry: Duration,
) -> io::Result<(StreamReader, FrameSlot<Vec<u8>>)> {
    let (publisher, slot) = frame_slot();
    let interrupt = source.interrupt_handle();
    let handle = thread::Builder::new()
        .name("frame-stream-reader".into())
        .spawn(move || {
            while !source.interrupt.is_interrupted() {
                match source.next_blob() {
                    Ok(Some(blob)) => {
                        if publisher.publish(blob) {
                            log::trace!("dropped an unprocessed frame");
                        }
                    }
                    Ok(None) => thread::sleep(retry),
                    Err(e) => {
                        log::error!("frame stream reader stopped: {e}");
                        return Err(e);
                    }
                }
            }
            Ok(())
        })?;
    Ok((
        StreamReader {
            interrupt,
            handle: Some(handle),
        },
        slot,
    ))
}

const CLIENT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Producer side of the stream: accepts one client at a time and sends it
/// the newest published frame blob.
///
/// Dropping the server disconnects the client, stops listening and joins
/// the serve thread.
pub struct FrameServer {
    local_addr: SocketAddr,
    publisher: Option<SlotPublisher<Vec<u8>>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameServer {
    pub fn bind(address: &str) -> Result<Self, StreamError> {
        let listener = TcpListener::bind(resolve(address)?)?;
        let local_addr = listener.local_addr()?;
        let (publisher, slot) = frame_slot();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("frame-server".into())
            .spawn(move || serve(listener, slot, &flag))?;
        log::info!("serving frames on {local_addr}");
        Ok(Self {
            local_addr,
            publisher: Some(publisher),
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Offer a blob to the connected client, replacing any unsent one.
    pub fn publish(&self, blob: Vec<u8>) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(blob);
        }
    }
}

impl Drop for FrameServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // closes the slot, ending a connected client's session
        self.publisher = None;
        // wakes a pending accept
        let mut wake = self.local_addr;
        if wake.ip().is_unspecified() {
            wake.set_ip(match wake {
                SocketAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
            });
        }
        let _ = TcpStream::connect(wake);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("frame server thread panicked");
            }
        }
    }
}

fn serve(listener: TcpListener, slot: FrameSlot<Vec<u8>>, shutdown: &AtomicBool) {
    loop {
        let accepted = listener.accept();
        if shutdown.load(Ordering::Relaxed) {
            log::debug!("frame server shutting down");
            return;
        }
        let (mut client, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("accept failed: {e}");
                continue;
            }
        };
        log::info!("frame client {peer} connected");
        if let Err(e) = client.set_write_timeout(Some(CLIENT_WRITE_TIMEOUT)) {
            log::debug!("frame client {peer}: no write timeout: {e}");
        }
        loop {
            let Some(blob) = slot.take() else {
                log::debug!("frame server shutting down");
                return;
            };
            if let Err(e) = write_message(&mut client, &blob) {
                log::info!("frame client {peer} disconnected: {e}");
                break;
            }
        }
    }
}

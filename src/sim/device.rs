//! Output devices connected to the Simulator.
//!
//! The only way an LS-8 program communicates with the outside world
//! is the `PRN` instruction, which sends a register's value to the
//! simulator's output device.
//!
//! The core type here is [`OutputDevice`], a device which can be connected to the Simulator
//! with [`Simulator::set_output`].
//!
//! This module also provides some output devices:
//! - [`StdoutDisplay`]: Prints each value in decimal on its own line in standard output (the default).
//! - [`BufferedDisplay`]: Writes each value to an output buffer.
//! - [`ChannelDisplay`]: Sends each value through a channel.
//!
//! [`Simulator::set_output`]: super::Simulator::set_output

use std::io::Write;
use std::sync::{Arc, RwLock, RwLockWriteGuard, TryLockError};
use std::thread::JoinHandle;

use crossbeam_channel as cbc;

/// A device which accepts the output of `PRN`.
pub trait OutputDevice: Send + 'static {
    /// Sends a value to this device.
    ///
    /// This returns whether the output was accepted.
    fn print(&mut self, value: u8) -> bool;

    /// Resets the device (e.g., by clearing its output).
    fn reset(&mut self) {}
}
impl dyn OutputDevice {} // assert OutputDevice is dyn safe

/// Prints each value in decimal on its own line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutDisplay;
impl OutputDevice for StdoutDisplay {
    fn print(&mut self, value: u8) -> bool {
        writeln!(std::io::stdout().lock(), "{value}").is_ok()
    }
}

/// A display that delegates its output to a buffer.
///
/// Cloning this display shares the buffer,
/// so one clone can be handed to the simulator while another reads its output.
///
/// Note that if a lock guard is acquired from the buffer,
/// the display cannot accept output while the guard is held.
#[derive(Debug, Default, Clone)]
pub struct BufferedDisplay {
    buffer: Arc<RwLock<Vec<u8>>>
}
impl BufferedDisplay {
    /// Creates a new display, wrapping it around a given buffer.
    pub fn new(buffer: Arc<RwLock<Vec<u8>>>) -> Self {
        Self { buffer }
    }

    /// Gets a reference to the internal buffer of this display.
    pub fn get_buffer(&self) -> &Arc<RwLock<Vec<u8>>> {
        &self.buffer
    }

    fn try_output(&self) -> Option<RwLockWriteGuard<'_, Vec<u8>>> {
        match self.buffer.try_write() {
            Ok(g) => Some(g),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}
impl OutputDevice for BufferedDisplay {
    fn print(&mut self, value: u8) -> bool {
        match self.try_output() {
            Some(mut out) => {
                out.push(value);
                true
            },
            None => false,
        }
    }

    fn reset(&mut self) {
        if let Some(mut out) = self.try_output() {
            out.clear();
        }
    }
}

/// A helper struct for [`ChannelDisplay::with_writer`],
/// indicating the writer is closed and no more values should be sent to it.
#[derive(Clone, Copy, Default, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stop;

/// A display that sends each value through a channel.
///
/// This allows another thread to consume a program's output while the program is running.
#[derive(Debug)]
pub struct ChannelDisplay {
    write_data: cbc::Sender<u8>,
    write_handler: Option<JoinHandle<()>>
}
impl ChannelDisplay {
    /// Creates a new channel display, as well as the receiver which receives its output.
    pub fn unbounded() -> (Self, cbc::Receiver<u8>) {
        let (tx, rx) = cbc::unbounded();
        (Self { write_data: tx, write_handler: None }, rx)
    }

    /// Creates a new channel display with the given writer.
    ///
    /// This calls the writer function on a separate thread every time a value is printed.
    /// Once the writer returns [`Stop`], the display stops accepting output.
    pub fn with_writer(mut writer: impl FnMut(u8) -> Result<(), Stop> + Send + 'static) -> Self {
        let (write_tx, write_rx) = cbc::unbounded::<u8>();

        let write_handler = std::thread::spawn(move || {
            for value in write_rx {
                let Ok(()) = writer(value) else { return };
            }
        });

        Self { write_data: write_tx, write_handler: Some(write_handler) }
    }

    /// Closes this display, waiting for the writer (if there is one) to finish writing all output.
    pub fn close(self) {
        let Self { write_data, write_handler } = self;
        drop(write_data);

        if let Some(handler) = write_handler {
            // A panicking writer has nothing left to flush.
            let _ = handler.join();
        }
    }
}
impl OutputDevice for ChannelDisplay {
    fn print(&mut self, value: u8) -> bool {
        self.write_data.send(value).is_ok()
    }
}

/// The output device slot of the simulator.
pub(super) struct OutputHandle(Box<dyn OutputDevice>);
impl OutputHandle {
    pub(super) fn new(dev: impl OutputDevice) -> Self {
        Self(Box::new(dev))
    }
    pub(super) fn print(&mut self, value: u8) -> bool {
        self.0.print(value)
    }
    pub(super) fn reset(&mut self) {
        self.0.reset()
    }
}
impl Default for OutputHandle {
    fn default() -> Self {
        Self::new(StdoutDisplay)
    }
}
impl std::fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{BufferedDisplay, ChannelDisplay, OutputDevice, Stop};

    #[test]
    fn test_buffered_display() {
        let display = BufferedDisplay::default();
        let mut dev = display.clone();

        assert!(dev.print(8));
        assert!(dev.print(72));
        assert_eq!(&*display.get_buffer().read().unwrap(), &[8, 72]);

        // Output is refused while a lock is held.
        {
            let _guard = display.get_buffer().read().unwrap();
            assert!(!dev.print(1));
        }

        dev.reset();
        assert!(display.get_buffer().read().unwrap().is_empty());
    }

    #[test]
    fn test_channel_display() {
        let (mut dev, rx) = ChannelDisplay::unbounded();
        assert!(dev.print(1));
        assert!(dev.print(2));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), [1, 2]);

        drop(rx);
        assert!(!dev.print(3));
    }

    #[test]
    fn test_channel_display_writer() {
        let seen = Arc::new(Mutex::new(vec![]));
        let sink = Arc::clone(&seen);

        let mut dev = ChannelDisplay::with_writer(move |value| {
            let mut sink = sink.lock().map_err(|_| Stop)?;
            sink.push(value);
            match sink.len() < 2 {
                true  => Ok(()),
                false => Err(Stop),
            }
        });
        assert!(dev.print(10));
        assert!(dev.print(20));
        dev.close();

        assert_eq!(&*seen.lock().unwrap(), &[10, 20]);
    }
}

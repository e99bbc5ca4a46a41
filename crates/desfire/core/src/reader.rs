//! Exclusive ownership of an opened reader

use tracing::{debug, info, warn};

use crate::transport::{Reader, ReaderDriver, TransportError};
use crate::{Error, Result};

/// An opened reader, owned for the lifetime of the handle
///
/// The reader is released exactly once, either by [`ReaderHandle::close`] or
/// when the handle is dropped.
#[derive(Debug)]
pub struct ReaderHandle<R: Reader> {
    reader: Option<R>,
}

impl<R: Reader> ReaderHandle<R> {
    /// Open the first reader the driver can open
    ///
    /// Devices that fail to open are skipped; fails with
    /// [`Error::ReaderUnavailable`] when none is listed or none opens.
    pub fn open_first<D>(driver: &D) -> Result<Self>
    where
        D: ReaderDriver<Reader = R>,
    {
        let devices = driver.list_devices().map_err(Error::ReaderUnavailable)?;
        if devices.is_empty() {
            return Err(Error::ReaderUnavailable(TransportError::other(
                "no device found",
            )));
        }

        let mut last_error = TransportError::Device;
        for device in &devices {
            match driver.open(device) {
                Ok(reader) => {
                    info!(device = %device, "Opened reader");
                    return Ok(Self::from_reader(reader));
                }
                Err(e) => {
                    warn!(device = %device, error = %e, "Failed to open reader");
                    last_error = e;
                }
            }
        }

        Err(Error::ReaderUnavailable(last_error))
    }

    /// Open a specific reader by connection string
    pub fn open<D>(driver: &D, device: &str) -> Result<Self>
    where
        D: ReaderDriver<Reader = R>,
    {
        let reader = driver.open(device).map_err(Error::ReaderUnavailable)?;
        info!(device = %device, "Opened reader");
        Ok(Self::from_reader(reader))
    }

    /// Take ownership of an already opened reader
    pub const fn from_reader(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    /// Connection string of the reader, if still open
    pub fn name(&self) -> Option<&str> {
        self.reader.as_ref().map(|reader| reader.name())
    }

    /// Check if the reader is still open
    pub const fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Borrow the open reader
    pub(crate) fn reader_mut(&mut self) -> Result<&mut R> {
        self.reader
            .as_mut()
            .ok_or(Error::ReaderUnavailable(TransportError::Closed))
    }

    /// Release the reader; closing an already closed handle does nothing
    pub fn close(&mut self) -> Result<()> {
        match self.reader.take() {
            Some(mut reader) => {
                debug!(device = reader.name(), "Closing reader");
                reader.close().map_err(Error::ReaderUnavailable)
            }
            None => Ok(()),
        }
    }
}

impl<R: Reader> Drop for ReaderHandle<R> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close reader");
        }
    }
}

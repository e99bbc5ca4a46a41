//! Simulated reader driver and readers

use std::collections::BTreeMap;

use nexum_desfire::{Reader, ReaderDriver, TransportError};
use tracing::debug;

use crate::tag::SimulatedTag;

#[derive(Debug, Clone)]
enum Device {
    Available(Vec<SimulatedTag>),
    Broken,
}

/// Driver for a set of in-memory readers
///
/// Readers are listed in name order. An opened reader shares its tags with the
/// driver, so a tag removed through any handle drops out of its listing.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    devices: BTreeMap<String, Device>,
}

impl SimulatedDriver {
    /// Create a driver without readers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reader with the given tags in its field
    pub fn with_reader(mut self, name: impl Into<String>, tags: Vec<SimulatedTag>) -> Self {
        self.devices.insert(name.into(), Device::Available(tags));
        self
    }

    /// Add a reader that is listed but fails to open
    pub fn with_broken_reader(mut self, name: impl Into<String>) -> Self {
        self.devices.insert(name.into(), Device::Broken);
        self
    }
}

impl ReaderDriver for SimulatedDriver {
    type Reader = SimulatedReader;

    fn list_devices(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.devices.keys().cloned().collect())
    }

    fn open(&self, device: &str) -> Result<Self::Reader, TransportError> {
        match self.devices.get(device) {
            Some(Device::Available(tags)) => Ok(SimulatedReader {
                name: device.to_string(),
                tags: tags.clone(),
                closed: false,
            }),
            Some(Device::Broken) => Err(TransportError::Device),
            None => Err(TransportError::other(format!("unknown device {device}"))),
        }
    }
}

/// An opened simulated reader
#[derive(Debug)]
pub struct SimulatedReader {
    name: String,
    tags: Vec<SimulatedTag>,
    closed: bool,
}

impl SimulatedReader {
    /// Check if the reader was closed
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Reader for SimulatedReader {
    type Tag = SimulatedTag;

    fn name(&self) -> &str {
        &self.name
    }

    fn list_tags(&mut self) -> Result<Vec<Self::Tag>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let tags: Vec<SimulatedTag> = self
            .tags
            .iter()
            .filter(|tag| tag.is_present())
            .cloned()
            .collect();
        debug!(reader = %self.name, count = tags.len(), "Listed tags");
        Ok(tags)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}

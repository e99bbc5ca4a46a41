//! Card responses: a DESFire status code and an optional payload

use std::fmt;

use bytes::Bytes;

/// DESFire status code returned with every response
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(u8);

impl Status {
    /// Successful operation
    pub const OPERATION_OK: Self = Self(0x00);
    /// No changes done to backup files
    pub const NO_CHANGES: Self = Self(0x0C);
    /// Insufficient NV-memory to complete the command
    pub const OUT_OF_EEPROM: Self = Self(0x0E);
    /// Command code not supported
    pub const ILLEGAL_COMMAND: Self = Self(0x1C);
    /// CRC or MAC does not match data
    pub const INTEGRITY_ERROR: Self = Self(0x1E);
    /// Invalid key number specified
    pub const NO_SUCH_KEY: Self = Self(0x40);
    /// Length of command string invalid
    pub const LENGTH_ERROR: Self = Self(0x7E);
    /// Current configuration or status does not allow the command
    pub const PERMISSION_DENIED: Self = Self(0x9D);
    /// Value of the parameter(s) invalid
    pub const PARAMETER_ERROR: Self = Self(0x9E);
    /// Requested application not present
    pub const APPLICATION_NOT_FOUND: Self = Self(0xA0);
    /// Current authentication status does not allow the command
    pub const AUTHENTICATION_ERROR: Self = Self(0xAE);
    /// Additional data frame is expected to be sent
    pub const ADDITIONAL_FRAME: Self = Self(0xAF);
    /// Previous command was not fully completed
    pub const COMMAND_ABORTED: Self = Self(0xCA);
    /// Application or file already exists
    pub const DUPLICATE_ERROR: Self = Self(0xDE);

    /// Create a status from its code
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Raw status code
    pub const fn code(&self) -> u8 {
        self.0
    }

    /// Check if this status indicates success
    pub const fn is_success(&self) -> bool {
        self.0 == Self::OPERATION_OK.0
    }

    /// Get a description of this status
    pub const fn description(&self) -> &'static str {
        match self.0 {
            0x00 => "Successful operation",
            0x0C => "No changes done to backup files",
            0x0E => "Insufficient NV-memory",
            0x1C => "Illegal command code",
            0x1E => "Integrity error",
            0x40 => "No such key",
            0x7E => "Length error",
            0x9D => "Permission denied",
            0x9E => "Parameter error",
            0xA0 => "Application not found",
            0xA1 => "Application integrity error",
            0xAE => "Authentication error",
            0xAF => "Additional frame expected",
            0xBE => "Boundary error",
            0xC1 => "PICC integrity error",
            0xCA => "Command aborted",
            0xCD => "PICC disabled",
            0xCE => "Count error",
            0xDE => "Duplicate error",
            0xEE => "EEPROM error",
            0xF0 => "File not found",
            0xF1 => "File integrity error",
            _ => "Unknown status",
        }
    }
}

impl From<u8> for Status {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} ({})", self.0, self.description())
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status({:#04x})", self.0)
    }
}

/// Response to a [`Command`](crate::Command)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data
    payload: Option<Bytes>,
    /// Status code
    status: Status,
}

impl Response {
    /// Create a success response
    pub const fn success(payload: Option<Bytes>) -> Self {
        Self {
            payload,
            status: Status::OPERATION_OK,
        }
    }

    /// Create an error response from a status
    pub fn error(status: impl Into<Status>) -> Self {
        Self {
            payload: None,
            status: status.into(),
        }
    }

    /// Response payload
    pub const fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Status code
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert to the payload on success, or the status on failure
    pub fn into_result(self) -> Result<Option<Bytes>, Status> {
        if self.is_success() {
            Ok(self.payload)
        } else {
            Err(self.status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_into_result() {
        let ok = Response::success(Some(Bytes::from_static(&[0x0F, 0x01])));
        assert!(ok.is_success());
        assert_eq!(
            ok.into_result().unwrap().as_deref(),
            Some(&[0x0F, 0x01][..])
        );

        let denied = Response::error(Status::PERMISSION_DENIED);
        assert_eq!(denied.status().code(), 0x9D);
        assert_eq!(denied.into_result(), Err(Status::PERMISSION_DENIED));
    }

    #[test]
    fn test_status_description() {
        assert_eq!(Status::OPERATION_OK.description(), "Successful operation");
        assert_eq!(
            Status::APPLICATION_NOT_FOUND.to_string(),
            "A0 (Application not found)"
        );
        assert_eq!(Status::new(0x77).description(), "Unknown status");
    }
}

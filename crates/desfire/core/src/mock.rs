//! Scripted reader and tag transports for unit tests

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::directory::TagDirectory;
use crate::reader::ReaderHandle;
use crate::session::CardSession;
use crate::transport::{Reader, TagTransport, TransportError};
use crate::{Command, Response, TagType, Uid, VersionInfo};

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    connects: usize,
    disconnects: usize,
    connect_error: Option<TransportError>,
    version_error: Option<TransportError>,
    responses: VecDeque<Result<Response, TransportError>>,
    commands: Vec<&'static str>,
}

/// Tag transport answering from a queue of scripted responses
///
/// Clones share their state, so a test can keep a clone to script responses
/// and inspect the command log after the original was moved into a session.
/// Commands without a scripted response succeed with an empty payload.
#[derive(Debug, Clone)]
pub(crate) struct MockTag {
    uid: Uid,
    tag_type: TagType,
    state: Arc<Mutex<MockState>>,
}

impl MockTag {
    pub(crate) fn desfire(uid: impl Into<Uid>) -> Self {
        Self::other(uid, TagType::DesFire)
    }

    pub(crate) fn other(uid: impl Into<Uid>, tag_type: TagType) -> Self {
        Self {
            uid: uid.into(),
            tag_type,
            state: Arc::default(),
        }
    }

    pub(crate) fn push_response(&self, response: Response) {
        self.state().responses.push_back(Ok(response));
    }

    pub(crate) fn push_transport_error(&self, error: TransportError) {
        self.state().responses.push_back(Err(error));
    }

    pub(crate) fn fail_connect(&self, error: TransportError) {
        self.state().connect_error = Some(error);
    }

    pub(crate) fn fail_version(&self, error: TransportError) {
        self.state().version_error = Some(error);
    }

    pub(crate) fn commands(&self) -> Vec<&'static str> {
        self.state().commands.clone()
    }

    pub(crate) fn connects(&self) -> usize {
        self.state().connects
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.state().disconnects
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }
}

impl TagTransport for MockTag {
    fn uid(&self) -> &Uid {
        &self.uid
    }

    fn tag_type(&self) -> TagType {
        self.tag_type
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        if let Some(error) = state.connect_error.clone() {
            return Err(error);
        }
        state.connected = true;
        state.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::Closed);
        }
        state.connected = false;
        state.disconnects += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }

    fn get_version(&mut self) -> Result<VersionInfo, TransportError> {
        let state = self.state();
        if let Some(error) = state.version_error.clone() {
            return Err(error);
        }
        if !state.connected {
            return Err(TransportError::Closed);
        }
        Ok(VersionInfo::default())
    }

    fn do_transmit(&mut self, command: &Command<'_>) -> Result<Response, TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::Closed);
        }
        state.commands.push(command.name());
        state
            .responses
            .pop_front()
            .unwrap_or(Ok(Response::success(None)))
    }
}

/// Reader reporting a fixed set of tags on every listing
#[derive(Debug)]
pub(crate) struct MockReader {
    tags: Vec<MockTag>,
}

impl MockReader {
    pub(crate) const fn new(tags: Vec<MockTag>) -> Self {
        Self { tags }
    }
}

impl Reader for MockReader {
    type Tag = MockTag;

    fn name(&self) -> &str {
        "mock"
    }

    fn list_tags(&mut self) -> Result<Vec<Self::Tag>, TransportError> {
        Ok(self.tags.clone())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A reader with `tag` as the only tag in its field
pub(crate) fn mock_reader(tag: &MockTag) -> ReaderHandle<MockReader> {
    ReaderHandle::from_reader(MockReader::new(vec![tag.clone()]))
}

/// Open a session to the first tag of a mock reader through the directory
pub(crate) fn open_session(reader: &mut ReaderHandle<MockReader>) -> CardSession<'_, MockTag> {
    let uid = reader.reader_mut().unwrap().tags[0].uid().to_string();
    CardSession::open_by_uid(&TagDirectory::default(), reader, &uid).unwrap()
}

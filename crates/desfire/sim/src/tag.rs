//! Tag transport over a simulated card

use std::sync::Arc;

use nexum_desfire::{
    Command, KeyMaterial, KeySlot, Response, Status, TagTransport, TagType, TransportError, Uid,
    VersionInfo,
};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::card::SimulatedCard;
use crate::crypto;

/// Counters of the calls a tag has received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagStats {
    /// Successful card-level connects
    pub connects: usize,
    /// Successful card-level disconnects
    pub disconnects: usize,
    /// Commands transmitted while connected
    pub commands: usize,
}

#[derive(Debug)]
struct TagState {
    card: SimulatedCard,
    connected: bool,
    removed: bool,
    refuse_connect: bool,
    fail_version: bool,
    stats: TagStats,
}

/// A tag in the field of a [`SimulatedReader`](crate::SimulatedReader)
///
/// Clones share the same card, so every handle a reader hands out for the tag
/// sees the same keys, applications and fault settings.
#[derive(Debug, Clone)]
pub struct SimulatedTag {
    uid: Uid,
    tag_type: TagType,
    state: Arc<Mutex<TagState>>,
}

impl SimulatedTag {
    /// A DESFire tag carrying `card`
    pub fn desfire(card: SimulatedCard) -> Self {
        Self::with_type(card, TagType::DesFire)
    }

    /// A tag of another family; it never answers DESFire commands
    pub fn other(uid: impl Into<Uid>, tag_type: TagType) -> Self {
        Self::with_type(SimulatedCard::builder(uid).build(), tag_type)
    }

    fn with_type(card: SimulatedCard, tag_type: TagType) -> Self {
        Self {
            uid: card.uid().clone(),
            tag_type,
            state: Arc::new(Mutex::new(TagState {
                card,
                connected: false,
                removed: false,
                refuse_connect: false,
                fail_version: false,
                stats: TagStats::default(),
            })),
        }
    }

    /// Make card-level connects fail
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.lock().refuse_connect = refuse;
    }

    /// Make version reads fail
    pub fn fail_version(&self, fail: bool) {
        self.state.lock().fail_version = fail;
    }

    /// Take the tag out of the field
    ///
    /// Readers stop listing it and every call on an existing handle fails with
    /// [`TransportError::TagRemoved`].
    pub fn remove(&self) {
        let mut state = self.state.lock();
        state.removed = true;
        state.connected = false;
    }

    /// Check if the tag is still in the field
    pub fn is_present(&self) -> bool {
        !self.state.lock().removed
    }

    /// Call counters
    pub fn stats(&self) -> TagStats {
        self.state.lock().stats
    }

    /// Inspect the simulated card
    pub fn with_card<R>(&self, f: impl FnOnce(&SimulatedCard) -> R) -> R {
        f(&self.state.lock().card)
    }
}

impl TagTransport for SimulatedTag {
    fn uid(&self) -> &Uid {
        &self.uid
    }

    fn tag_type(&self) -> TagType {
        self.tag_type
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.removed {
            return Err(TransportError::TagRemoved);
        }
        if state.refuse_connect {
            debug!(uid = %self.uid, "Refusing connection");
            return Err(TransportError::Connection);
        }

        state.card.reset();
        state.connected = true;
        state.stats.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.removed {
            return Err(TransportError::TagRemoved);
        }
        if !state.connected {
            return Err(TransportError::Closed);
        }

        state.card.reset();
        state.connected = false;
        state.stats.disconnects += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn get_version(&mut self) -> Result<VersionInfo, TransportError> {
        let state = self.state.lock();
        if state.removed {
            return Err(TransportError::TagRemoved);
        }
        if !state.connected {
            return Err(TransportError::Closed);
        }
        if state.fail_version || !self.tag_type.is_desfire() {
            return Err(TransportError::Transmission);
        }
        Ok(*state.card.version())
    }

    fn do_transmit(&mut self, command: &Command<'_>) -> Result<Response, TransportError> {
        let mut state = self.state.lock();
        if state.removed {
            return Err(TransportError::TagRemoved);
        }
        if !state.connected {
            return Err(TransportError::Closed);
        }
        if !self.tag_type.is_desfire() {
            return Err(TransportError::Transmission);
        }
        state.stats.commands += 1;

        match *command {
            Command::Authenticate { slot, key } => authenticate(&mut state.card, slot, key),
            _ => Ok(state.card.execute(command)),
        }
    }
}

/// Reader side of the three-pass mutual authentication
fn authenticate(
    card: &mut SimulatedCard,
    slot: KeySlot,
    key: &KeyMaterial,
) -> Result<Response, TransportError> {
    let challenge = match card.begin_authentication(slot, key.variant()) {
        Ok(challenge) => challenge,
        Err(status) => return Ok(Response::error(status)),
    };

    let (token, rnd_a) = crypto::answer_challenge(key, &challenge)?;
    trace!(slot = %slot, "Sending challenge answer");

    let answer = match card.complete_authentication(&token) {
        Ok(answer) => answer,
        Err(status) => return Ok(Response::error(status)),
    };

    if crypto::verify_answer(key, &rnd_a, &answer)? {
        Ok(Response::success(None))
    } else {
        debug!(slot = %slot, "Card answer does not match the reader challenge");
        Ok(Response::error(Status::AUTHENTICATION_ERROR))
    }
}

#[cfg(test)]
mod tests {
    use nexum_desfire::{Aid, KeySettings};

    use super::*;

    #[test]
    fn test_connect_resets_card_session() {
        let aid = Aid::new(0x00_00_01).unwrap();
        let card = SimulatedCard::builder([0x04, 0x01])
            .with_application(aid, KeySettings::FACTORY_DEFAULT, vec![KeyMaterial::default_aes()])
            .unwrap()
            .build();
        let mut tag = SimulatedTag::desfire(card);

        tag.connect().unwrap();
        assert!(tag.transmit(&Command::SelectApplication { aid }).unwrap().is_success());
        assert_eq!(tag.with_card(SimulatedCard::selected_application), aid);

        tag.disconnect().unwrap();
        tag.connect().unwrap();
        assert_eq!(tag.with_card(SimulatedCard::selected_application), Aid::MASTER);
        assert_eq!(
            tag.stats(),
            TagStats {
                connects: 2,
                disconnects: 1,
                commands: 1
            }
        );
    }

    #[test]
    fn test_authenticate_through_transport() {
        let mut tag = SimulatedTag::desfire(SimulatedCard::builder([0x04, 0x01]).build());
        tag.connect().unwrap();

        let good = KeyMaterial::default_des();
        let bad = KeyMaterial::from_bytes(&[0x42; 8]).unwrap();
        let response = tag
            .transmit(&Command::Authenticate {
                slot: KeySlot::MASTER,
                key: &good,
            })
            .unwrap();
        assert!(response.is_success());

        let response = tag
            .transmit(&Command::Authenticate {
                slot: KeySlot::MASTER,
                key: &bad,
            })
            .unwrap();
        assert_eq!(response.status(), Status::AUTHENTICATION_ERROR);
    }

    #[test]
    fn test_removed_tag() {
        let mut tag = SimulatedTag::desfire(SimulatedCard::builder([0x04, 0x01]).build());
        tag.connect().unwrap();
        tag.remove();

        assert!(!tag.is_present());
        assert!(!tag.is_connected());
        assert_eq!(tag.get_version(), Err(TransportError::TagRemoved));
        assert_eq!(
            tag.transmit(&Command::GetKeySettings),
            Err(TransportError::TagRemoved)
        );
        assert_eq!(tag.disconnect(), Err(TransportError::TagRemoved));
    }

    #[test]
    fn test_other_tag_types_do_not_answer() {
        let mut tag = SimulatedTag::other([0x08, 0x01], TagType::Classic1k);
        tag.connect().unwrap();
        assert_eq!(tag.get_version(), Err(TransportError::Transmission));
    }
}

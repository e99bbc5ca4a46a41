//! In-memory model of a DESFire card
//!
//! The card keeps its own view of the selected application and the
//! authenticated key slot, and enforces the permission rules of the key
//! settings the way a physical card does.

use std::collections::BTreeMap;

use bytes::Bytes;
use nexum_desfire::{
    Aid, ChangeKeyAccess, Command, KeyMaterial, KeySettings, KeySettingsInfo, KeySlot, KeyVariant,
    PartVersion, Response, Status, Uid, VersionInfo,
};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::crypto;

/// Largest number of keys an application may hold
pub const MAX_APPLICATION_KEYS: u8 = 14;

#[derive(Debug, Clone)]
struct Application {
    settings: KeySettings,
    keys: Vec<KeyMaterial>,
}

impl Application {
    /// Check the key count the way CreateApplication does
    fn new(settings: KeySettings, keys: Vec<KeyMaterial>) -> Result<Self, Status> {
        if !matches!(u8::try_from(keys.len()), Ok(1..=MAX_APPLICATION_KEYS)) {
            return Err(Status::PARAMETER_ERROR);
        }
        Ok(Self { settings, keys })
    }

    fn key(&self, slot: KeySlot) -> Result<&KeyMaterial, Status> {
        self.keys
            .get(usize::from(slot.index()))
            .ok_or(Status::NO_SUCH_KEY)
    }

    fn info(&self) -> KeySettingsInfo {
        let aes = self.keys.first().is_some_and(KeyMaterial::is_aes);
        KeySettingsInfo {
            settings: self.settings,
            // At most MAX_APPLICATION_KEYS, checked in Application::new
            max_keys: u8::try_from(self.keys.len()).unwrap_or(MAX_APPLICATION_KEYS),
            key_variant: aes.then_some(KeyVariant::Aes),
        }
    }
}

#[derive(Debug)]
enum CardAuth {
    None,
    Pending {
        slot: KeySlot,
        rnd_b: Zeroizing<Vec<u8>>,
    },
    Authenticated(KeySlot),
}

/// A simulated DESFire card with a card master key and applications
#[derive(Debug)]
pub struct SimulatedCard {
    uid: Uid,
    version: VersionInfo,
    root: Application,
    applications: BTreeMap<Aid, Application>,
    selected: Aid,
    auth: CardAuth,
}

impl SimulatedCard {
    /// Start building a factory-fresh card with the given UID
    pub fn builder(uid: impl Into<Uid>) -> SimulatedCardBuilder {
        SimulatedCardBuilder::new(uid.into())
    }

    /// Card UID
    pub const fn uid(&self) -> &Uid {
        &self.uid
    }

    /// GetVersion information
    pub const fn version(&self) -> &VersionInfo {
        &self.version
    }

    /// Application selected by the card's own session state
    pub const fn selected_application(&self) -> Aid {
        self.selected
    }

    /// Ids of the applications on the card, in ascending order
    pub fn application_ids(&self) -> Vec<Aid> {
        self.applications.keys().copied().collect()
    }

    /// Key settings and key count of an application, or of the card level for [`Aid::MASTER`]
    pub fn key_settings(&self, aid: Aid) -> Option<KeySettingsInfo> {
        self.application(aid).map(Application::info)
    }

    /// Key installed in a slot of an application
    pub fn key(&self, aid: Aid, slot: KeySlot) -> Option<&KeyMaterial> {
        self.application(aid)?.key(slot).ok()
    }

    fn application(&self, aid: Aid) -> Option<&Application> {
        if aid.is_master() {
            Some(&self.root)
        } else {
            self.applications.get(&aid)
        }
    }

    fn current(&self) -> Result<&Application, Status> {
        self.application(self.selected)
            .ok_or(Status::APPLICATION_NOT_FOUND)
    }

    fn current_mut(&mut self) -> Result<&mut Application, Status> {
        if self.selected.is_master() {
            Ok(&mut self.root)
        } else {
            self.applications
                .get_mut(&self.selected)
                .ok_or(Status::APPLICATION_NOT_FOUND)
        }
    }

    const fn authenticated_slot(&self) -> Option<KeySlot> {
        match self.auth {
            CardAuth::Authenticated(slot) => Some(slot),
            _ => None,
        }
    }

    /// Drop the card-side session, as a fresh activation does
    pub(crate) fn reset(&mut self) {
        self.selected = Aid::MASTER;
        self.auth = CardAuth::None;
    }

    /// First pass of the authentication: encrypted challenge for `slot`
    pub(crate) fn begin_authentication(
        &mut self,
        slot: KeySlot,
        variant: KeyVariant,
    ) -> Result<Vec<u8>, Status> {
        self.auth = CardAuth::None;

        let key = self.current()?.key(slot)?;
        if key.variant() != variant {
            debug!(slot = %slot, "Authentication requested with the wrong cipher");
            return Err(Status::AUTHENTICATION_ERROR);
        }

        let rnd_b = crypto::challenge(key);
        let mut challenge = rnd_b.to_vec();
        crypto::encrypt(key, &mut challenge).map_err(|_| Status::INTEGRITY_ERROR)?;

        self.auth = CardAuth::Pending { slot, rnd_b };
        Ok(challenge)
    }

    /// Second pass of the authentication: check the reader token and answer
    pub(crate) fn complete_authentication(&mut self, token: &[u8]) -> Result<Vec<u8>, Status> {
        let CardAuth::Pending { slot, rnd_b } = std::mem::replace(&mut self.auth, CardAuth::None)
        else {
            return Err(Status::COMMAND_ABORTED);
        };

        let key = self.current()?.key(slot)?;
        let block = crypto::block_size(key);
        if token.len() != block * 2 {
            return Err(Status::LENGTH_ERROR);
        }

        let mut plain = Zeroizing::new(token.to_vec());
        crypto::decrypt(key, &mut plain).map_err(|_| Status::INTEGRITY_ERROR)?;
        let (rnd_a, echoed) = plain.split_at(block);
        if echoed != crypto::rotate(&rnd_b).as_slice() {
            debug!(slot = %slot, "Reader failed the challenge");
            return Err(Status::AUTHENTICATION_ERROR);
        }

        let mut answer = crypto::rotate(rnd_a).to_vec();
        crypto::encrypt(key, &mut answer).map_err(|_| Status::INTEGRITY_ERROR)?;

        self.auth = CardAuth::Authenticated(slot);
        trace!(slot = %slot, "Card accepted authentication");
        Ok(answer)
    }

    /// Execute a command other than the authentication handshake
    pub(crate) fn execute(&mut self, command: &Command<'_>) -> Response {
        if matches!(self.auth, CardAuth::Pending { .. }) {
            self.auth = CardAuth::None;
        }

        let result = match *command {
            Command::Authenticate { .. } => Err(Status::ILLEGAL_COMMAND),
            Command::ChangeKey {
                slot,
                old_key,
                new_key,
            } => self.change_key(slot, old_key, new_key),
            Command::GetKeySettings => self.current().and_then(|app| {
                app.info()
                    .to_payload()
                    .map(|payload| Some(Bytes::copy_from_slice(&payload)))
                    .ok_or(Status::INTEGRITY_ERROR)
            }),
            Command::ChangeKeySettings { settings } => self.change_key_settings(settings),
            Command::FormatPicc => self.format(),
            Command::SelectApplication { aid } => self.select(aid),
            Command::CreateApplication {
                aid,
                settings,
                key_count,
                key_variant,
            } => self.create_application(aid, settings, key_count, key_variant),
            Command::GetApplicationIds => self.list_applications(),
        };

        match result {
            Ok(payload) => Response::success(payload),
            Err(status) => Response::error(status),
        }
    }

    fn select(&mut self, aid: Aid) -> Result<Option<Bytes>, Status> {
        self.auth = CardAuth::None;
        if self.application(aid).is_none() {
            return Err(Status::APPLICATION_NOT_FOUND);
        }
        self.selected = aid;
        Ok(None)
    }

    fn change_key(
        &mut self,
        slot: KeySlot,
        old_key: &KeyMaterial,
        new_key: &KeyMaterial,
    ) -> Result<Option<Bytes>, Status> {
        let authenticated = self
            .authenticated_slot()
            .ok_or(Status::AUTHENTICATION_ERROR)?;
        let app = self.current()?;
        let installed = app.key(slot)?;

        let allowed = if slot == KeySlot::MASTER {
            authenticated == KeySlot::MASTER && app.settings.allows_master_key_change()
        } else {
            match app.settings.change_key_access() {
                ChangeKeyAccess::MasterKey => authenticated == KeySlot::MASTER,
                ChangeKeyAccess::Key(key) => authenticated == key,
                ChangeKeyAccess::SameKey => authenticated == slot,
                ChangeKeyAccess::Frozen => false,
            }
        };
        if !allowed {
            return Err(Status::PERMISSION_DENIED);
        }
        if slot != authenticated && installed != old_key {
            return Err(Status::INTEGRITY_ERROR);
        }

        let new_key = new_key.clone();
        self.current_mut()?.keys[usize::from(slot.index())] = new_key;
        if slot == authenticated {
            self.auth = CardAuth::None;
        }
        debug!(slot = %slot, aid = %self.selected, "Key changed");
        Ok(None)
    }

    fn change_key_settings(&mut self, settings: KeySettings) -> Result<Option<Bytes>, Status> {
        let authenticated = self
            .authenticated_slot()
            .ok_or(Status::AUTHENTICATION_ERROR)?;
        let app = self.current_mut()?;
        if authenticated != KeySlot::MASTER || !app.settings.configuration_changeable() {
            return Err(Status::PERMISSION_DENIED);
        }
        app.settings = settings;
        Ok(None)
    }

    fn format(&mut self) -> Result<Option<Bytes>, Status> {
        if !self.selected.is_master() {
            return Err(Status::PERMISSION_DENIED);
        }
        if self.authenticated_slot() != Some(KeySlot::MASTER) {
            return Err(Status::AUTHENTICATION_ERROR);
        }
        self.applications.clear();
        debug!(uid = %self.uid, "Card formatted");
        Ok(None)
    }

    fn create_application(
        &mut self,
        aid: Aid,
        settings: KeySettings,
        key_count: u8,
        key_variant: KeyVariant,
    ) -> Result<Option<Bytes>, Status> {
        if !self.selected.is_master() {
            return Err(Status::PERMISSION_DENIED);
        }
        if !self.root.settings.free_create_delete()
            && self.authenticated_slot() != Some(KeySlot::MASTER)
        {
            return Err(Status::PERMISSION_DENIED);
        }
        if aid.is_master() {
            return Err(Status::PARAMETER_ERROR);
        }

        let key = match key_variant {
            KeyVariant::Des => KeyMaterial::default_des(),
            KeyVariant::Aes => KeyMaterial::default_aes(),
        };
        let application = Application::new(settings, vec![key; usize::from(key_count)])?;
        if self.applications.contains_key(&aid) {
            return Err(Status::DUPLICATE_ERROR);
        }
        self.applications.insert(aid, application);
        debug!(aid = %aid, keys = key_count, "Application created");
        Ok(None)
    }

    fn list_applications(&self) -> Result<Option<Bytes>, Status> {
        if !self.root.settings.free_directory_list()
            && !(self.selected.is_master() && self.authenticated_slot() == Some(KeySlot::MASTER))
        {
            return Err(Status::PERMISSION_DENIED);
        }
        if self.applications.is_empty() {
            return Ok(None);
        }
        let payload: Vec<u8> = self
            .applications
            .keys()
            .flat_map(|aid| aid.to_le_bytes())
            .collect();
        Ok(Some(Bytes::from(payload)))
    }
}

/// Builder for [`SimulatedCard`]
#[derive(Debug)]
pub struct SimulatedCardBuilder {
    uid: Uid,
    version: Option<VersionInfo>,
    master_key: KeyMaterial,
    master_settings: KeySettings,
    applications: BTreeMap<Aid, Application>,
}

impl SimulatedCardBuilder {
    fn new(uid: Uid) -> Self {
        Self {
            uid,
            version: None,
            master_key: KeyMaterial::default_des(),
            master_settings: KeySettings::FACTORY_DEFAULT,
            applications: BTreeMap::new(),
        }
    }

    /// Set the GetVersion information (defaults to an EV1 card)
    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the card master key (defaults to the all-zero DES key)
    pub fn with_master_key(mut self, key: KeyMaterial) -> Self {
        self.master_key = key;
        self
    }

    /// Set the card-level key settings (defaults to the factory settings)
    pub fn with_master_settings(mut self, settings: KeySettings) -> Self {
        self.master_settings = settings;
        self
    }

    /// Add an application with the given keys
    ///
    /// Rejected with the status CreateApplication would return: a parameter
    /// error for the card-level id or a key count outside
    /// `1..=MAX_APPLICATION_KEYS`, a duplicate error for an id already added.
    pub fn with_application(
        mut self,
        aid: Aid,
        settings: KeySettings,
        keys: Vec<KeyMaterial>,
    ) -> Result<Self, Status> {
        if aid.is_master() {
            return Err(Status::PARAMETER_ERROR);
        }
        let application = Application::new(settings, keys)?;
        if self.applications.contains_key(&aid) {
            return Err(Status::DUPLICATE_ERROR);
        }
        self.applications.insert(aid, application);
        Ok(self)
    }

    /// Build the card
    pub fn build(self) -> SimulatedCard {
        let version = self
            .version
            .unwrap_or_else(|| default_version(&self.uid));
        SimulatedCard {
            uid: self.uid,
            version,
            root: Application {
                settings: self.master_settings,
                keys: vec![self.master_key],
            },
            applications: self.applications,
            selected: Aid::MASTER,
            auth: CardAuth::None,
        }
    }
}

/// Version block of a 4k EV1 card
fn default_version(uid: &Uid) -> VersionInfo {
    let part = PartVersion::from_bytes([0x04, 0x01, 0x01, 0x01, 0x00, 0x18, 0x05]);
    let mut card_uid = [0u8; 7];
    for (dst, src) in card_uid.iter_mut().zip(uid.as_bytes()) {
        *dst = *src;
    }
    VersionInfo {
        hardware: part,
        software: part,
        uid: card_uid,
        batch_number: [0xBA, 0x54, 0x00, 0x00, 0x00],
        production_week: 0x21,
        production_year: 0x24,
    }
}

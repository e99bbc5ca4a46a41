//! Application directory of a DESFire card

use tracing::{debug, info, instrument};

use crate::session::CardSession;
use crate::transport::TagTransport;
use crate::{Aid, CardFailure, Command, Error, KeySettings, KeyVariant, Result};

impl<T: TagTransport> CardSession<'_, T> {
    /// List the ids of the applications on the card
    ///
    /// Works without authentication unless the card's key settings require it.
    #[instrument(skip(self), fields(uid = %self.uid()))]
    pub fn list_application_ids(&mut self) -> Result<Vec<Aid>> {
        self.ensure_connected()?;

        let payload = self
            .exchange(&Command::GetApplicationIds)
            .map_err(Error::ApplicationListFailed)?;

        let Some(payload) = payload else {
            return Ok(Vec::new());
        };
        if payload.len() % 3 != 0 {
            return Err(Error::ApplicationListFailed(
                CardFailure::MalformedResponse("application ids are 3 bytes each"),
            ));
        }

        let aids: Vec<Aid> = payload
            .chunks_exact(3)
            .map(|chunk| Aid::from_le_bytes([chunk[0], chunk[1], chunk[2]]))
            .collect();
        debug!(count = aids.len(), "Listed applications");
        Ok(aids)
    }

    /// Create an application with AES key cryptography
    ///
    /// Requires an authenticated session. Whether the card accepts the request
    /// depends on the selected application and the card's key settings.
    #[instrument(skip(self), fields(uid = %self.uid()))]
    pub fn create_application(
        &mut self,
        aid: Aid,
        settings: KeySettings,
        key_count: u8,
    ) -> Result<()> {
        self.ensure_authenticated()?;

        self.exchange(&Command::CreateApplication {
            aid,
            settings,
            key_count,
            key_variant: KeyVariant::Aes,
        })
        .map_err(|source| Error::ApplicationCreateFailed { aid, source })?;

        info!("Application created");
        Ok(())
    }

    /// Erase every application and key on the card
    ///
    /// This cannot be undone. The card only accepts it at card level after
    /// authenticating with the card master key.
    #[instrument(skip(self), fields(uid = %self.uid()))]
    pub fn format(&mut self) -> Result<()> {
        self.ensure_authenticated()?;

        self.exchange(&Command::FormatPicc)
            .map_err(Error::FormatFailed)?;

        info!("Card formatted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use hex_literal::hex;

    use super::*;
    use crate::mock::{MockTag, mock_reader, open_session};
    use crate::{KeyMaterial, KeySlot, Response, Status};

    #[test]
    fn test_list_application_ids() {
        let tag = MockTag::desfire([0x04, 0x01]);
        let mut reader = mock_reader(&tag);
        let mut session = open_session(&mut reader);

        tag.push_response(Response::success(Some(Bytes::copy_from_slice(&hex!(
            "563412 010000"
        )))));
        let aids = session.list_application_ids().unwrap();
        assert_eq!(
            aids,
            vec![Aid::new(0x12_34_56).unwrap(), Aid::new(0x00_00_01).unwrap()]
        );
        assert!(!session.is_authenticated());

        tag.push_response(Response::success(None));
        assert!(session.list_application_ids().unwrap().is_empty());
    }

    #[test]
    fn test_list_application_ids_malformed() {
        let tag = MockTag::desfire([0x04, 0x01]);
        let mut reader = mock_reader(&tag);
        let mut session = open_session(&mut reader);

        tag.push_response(Response::success(Some(Bytes::from_static(&[0x01, 0x02]))));
        assert!(matches!(
            session.list_application_ids(),
            Err(Error::ApplicationListFailed(CardFailure::MalformedResponse(_)))
        ));

        tag.push_response(Response::error(Status::PERMISSION_DENIED));
        let err = session.list_application_ids().unwrap_err();
        assert_eq!(err.card_status(), Some(Status::PERMISSION_DENIED));
    }

    #[test]
    fn test_create_and_format_require_authentication() {
        let tag = MockTag::desfire([0x04, 0x01]);
        let mut reader = mock_reader(&tag);
        let mut session = open_session(&mut reader);
        let aid = Aid::new(0x00_00_2A).unwrap();

        assert!(matches!(
            session.create_application(aid, KeySettings::FACTORY_DEFAULT, 1),
            Err(Error::NotAuthenticated)
        ));
        assert!(matches!(session.format(), Err(Error::NotAuthenticated)));
        assert!(tag.commands().is_empty());

        session.close();
        assert!(matches!(
            session.create_application(aid, KeySettings::FACTORY_DEFAULT, 1),
            Err(Error::NotConnected)
        ));
        assert!(matches!(session.format(), Err(Error::NotConnected)));
        assert!(matches!(
            session.list_application_ids(),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_create_application_rejected() {
        let tag = MockTag::desfire([0x04, 0x01]);
        let mut reader = mock_reader(&tag);
        let mut session = open_session(&mut reader);
        let aid = Aid::new(0x00_00_2A).unwrap();
        session
            .authenticate(KeySlot::MASTER, &KeyMaterial::default_des())
            .unwrap();

        session
            .create_application(aid, KeySettings::FACTORY_DEFAULT, 2)
            .unwrap();

        tag.push_response(Response::error(Status::DUPLICATE_ERROR));
        let err = session
            .create_application(aid, KeySettings::FACTORY_DEFAULT, 2)
            .unwrap_err();
        assert!(matches!(err, Error::ApplicationCreateFailed { aid: failed, .. } if failed == aid));
        assert_eq!(err.card_status(), Some(Status::DUPLICATE_ERROR));
    }

    #[test]
    fn test_format() {
        let tag = MockTag::desfire([0x04, 0x01]);
        let mut reader = mock_reader(&tag);
        let mut session = open_session(&mut reader);
        session
            .authenticate(KeySlot::MASTER, &KeyMaterial::default_des())
            .unwrap();

        session.format().unwrap();
        tag.push_response(Response::error(Status::PERMISSION_DENIED));
        assert!(matches!(
            session.format(),
            Err(Error::FormatFailed(CardFailure::Status(Status::PERMISSION_DENIED)))
        ));
        assert_eq!(tag.commands(), vec!["Authenticate", "FormatPICC", "FormatPICC"]);
    }
}

//! Discovery of DESFire tags present on a reader
//!
//! Every discovered DESFire tag is identified: a card-level connection is opened,
//! the version information is read and the connection is closed again, so
//! enumeration never leaves a card connected or authenticated.

use std::marker::PhantomData;

use tracing::{debug, instrument, warn};

use crate::config::{DirectoryConfig, EnumerationPolicy};
use crate::reader::ReaderHandle;
use crate::transport::{Reader, TagTransport};
use crate::{CardFailure, Error, Result, TagType, Uid, VersionInfo};

/// Immutable identity of a DESFire tag, captured when it was identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagIdentity {
    uid: Uid,
    tag_type: TagType,
    name: String,
    version: VersionInfo,
}

impl TagIdentity {
    /// Create an identity from its parts
    pub fn new(uid: Uid, tag_type: TagType, version: VersionInfo) -> Self {
        Self {
            uid,
            tag_type,
            name: version.friendly_name(),
            version,
        }
    }

    /// Tag UID
    pub const fn uid(&self) -> &Uid {
        &self.uid
    }

    /// Chip family reported by the reader
    pub const fn tag_type(&self) -> TagType {
        self.tag_type
    }

    /// Human-readable chip name, e.g. `Mifare DESFire EV1`
    pub fn friendly_name(&self) -> &str {
        &self.name
    }

    /// GetVersion information
    pub const fn version(&self) -> &VersionInfo {
        &self.version
    }
}

/// An identified tag ready to be claimed by a [`CardSession`](crate::CardSession)
///
/// The handle keeps the reader it was found on mutably borrowed, so the reader
/// can be neither re-enumerated nor closed while the tag is claimed.
#[derive(Debug)]
pub struct TagHandle<'r, T: TagTransport> {
    transport: T,
    identity: TagIdentity,
    reader: PhantomData<&'r mut ()>,
}

impl<T: TagTransport> TagHandle<'_, T> {
    /// Identity captured while probing
    pub const fn identity(&self) -> &TagIdentity {
        &self.identity
    }

    /// Tag UID
    pub const fn uid(&self) -> &Uid {
        self.identity.uid()
    }

    pub(crate) fn into_parts(self) -> (T, TagIdentity) {
        (self.transport, self.identity)
    }
}

/// A DESFire tag that enumeration skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTag {
    /// UID of the tag
    pub uid: Uid,
    /// Why probing failed
    pub reason: CardFailure,
}

/// Result of a scan: the DESFire tags that could be identified and those that could not
#[derive(Debug, Clone, Default)]
pub struct Scan {
    identities: Vec<TagIdentity>,
    skipped: Vec<SkippedTag>,
    present: usize,
}

impl Scan {
    /// Identities of the identified DESFire tags, in reader order
    pub fn identities(&self) -> &[TagIdentity] {
        &self.identities
    }

    /// DESFire tags skipped because probing failed
    pub fn skipped(&self) -> &[SkippedTag] {
        &self.skipped
    }

    /// Number of tags of any type the reader reported
    pub const fn present(&self) -> usize {
        self.present
    }

    /// Consume the scan, keeping only the identities
    pub fn into_identities(self) -> Vec<TagIdentity> {
        self.identities
    }
}

/// Enumerates DESFire tags on a reader and hands out tag handles
#[derive(Debug, Clone, Default)]
pub struct TagDirectory {
    config: DirectoryConfig,
}

impl TagDirectory {
    /// Create a directory with the given configuration
    pub const fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub const fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// List the identities of all reachable DESFire tags
    ///
    /// Fails with [`Error::NoTagsFound`] when the reader reports no tag at all;
    /// an empty vector means tags are present but none is a DESFire tag.
    pub fn enumerate<R: Reader>(&self, reader: &mut ReaderHandle<R>) -> Result<Vec<TagIdentity>> {
        self.scan(reader).map(Scan::into_identities)
    }

    /// Like [`TagDirectory::enumerate`], also reporting the tags that were skipped
    #[instrument(skip_all, fields(policy = ?self.config.policy))]
    pub fn scan<R: Reader>(&self, reader: &mut ReaderHandle<R>) -> Result<Scan> {
        let (tags, present) = discover(reader)?;

        let mut scan = Scan {
            present,
            ..Default::default()
        };

        for mut tag in tags {
            match read_version(&mut tag) {
                Ok(version) => {
                    let identity = TagIdentity::new(tag.uid().clone(), tag.tag_type(), version);
                    debug!(uid = %identity.uid(), name = identity.friendly_name(), "Found tag");
                    scan.identities.push(identity);
                }
                Err(reason) => {
                    let uid = tag.uid().clone();
                    match self.config.policy {
                        EnumerationPolicy::Strict => {
                            return Err(Error::TagUnreachable {
                                uid,
                                source: reason,
                            });
                        }
                        EnumerationPolicy::SkipUnreachable => {
                            warn!(uid = %uid, error = %reason, "Skipping unreachable tag");
                            scan.skipped.push(SkippedTag { uid, reason });
                        }
                    }
                }
            }
        }

        Ok(scan)
    }

    /// Find the DESFire tag whose rendered UID equals `uid` exactly
    ///
    /// The comparison is case-sensitive on the upper-case hex rendering. Fails
    /// with [`Error::TagNotFound`] when no DESFire tag matches and
    /// [`Error::TagUnreachable`] when the match cannot be identified; other tags are
    /// not contacted at all.
    #[instrument(skip(self, reader))]
    pub fn find_by_uid<'r, R: Reader>(
        &self,
        reader: &'r mut ReaderHandle<R>,
        uid: &str,
    ) -> Result<TagHandle<'r, R::Tag>> {
        let (tags, _) = discover(reader)?;

        let mut transport = tags
            .into_iter()
            .find(|tag| tag.uid().matches(uid))
            .ok_or_else(|| Error::TagNotFound(uid.to_string()))?;

        let version = read_version(&mut transport).map_err(|source| Error::TagUnreachable {
            uid: transport.uid().clone(),
            source,
        })?;

        let identity = TagIdentity::new(transport.uid().clone(), transport.tag_type(), version);
        Ok(TagHandle {
            transport,
            identity,
            reader: PhantomData,
        })
    }
}

/// List present tags and keep the DESFire ones, with the total count reported
fn discover<R: Reader>(reader: &mut ReaderHandle<R>) -> Result<(Vec<R::Tag>, usize)> {
    let tags = reader
        .reader_mut()?
        .list_tags()
        .map_err(Error::ReaderUnavailable)?;

    if tags.is_empty() {
        return Err(Error::NoTagsFound);
    }

    let present = tags.len();
    let desfire = tags
        .into_iter()
        .filter(|tag| {
            let keep = tag.tag_type().is_desfire();
            if !keep {
                debug!(uid = %tag.uid(), tag_type = %tag.tag_type(), "Ignoring non-DESFire tag");
            }
            keep
        })
        .collect();

    Ok((desfire, present))
}

/// Connect, read the version and disconnect again
fn read_version<T: TagTransport>(tag: &mut T) -> std::result::Result<VersionInfo, CardFailure> {
    tag.connect()?;
    let version = tag.get_version();
    if let Err(e) = tag.disconnect() {
        debug!(uid = %tag.uid(), error = %e, "Failed to close identification connection");
    }
    Ok(version?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockReader, MockTag};
    use crate::transport::TransportError;

    fn reader_with(tags: Vec<MockTag>) -> ReaderHandle<MockReader> {
        ReaderHandle::from_reader(MockReader::new(tags))
    }

    #[test]
    fn test_enumerate_filters_desfire() {
        let mut reader = reader_with(vec![
            MockTag::desfire([0x04, 0x01]),
            MockTag::other([0x08, 0x02], TagType::Classic1k),
            MockTag::desfire([0x04, 0x03]),
            MockTag::other([0x08, 0x04], TagType::Ultralight),
        ]);

        let scan = TagDirectory::default().scan(&mut reader).unwrap();
        assert_eq!(scan.present(), 4);
        let uids: Vec<String> = scan
            .identities()
            .iter()
            .map(|identity| identity.uid().to_string())
            .collect();
        assert_eq!(uids, vec!["0401", "0403"]);
        assert!(scan.skipped().is_empty());
    }

    #[test]
    fn test_no_tags_vs_no_desfire_tags() {
        let mut empty = reader_with(vec![]);
        assert!(matches!(
            TagDirectory::default().enumerate(&mut empty),
            Err(Error::NoTagsFound)
        ));

        let mut classic_only = reader_with(vec![MockTag::other([0x08, 0x01], TagType::Classic4k)]);
        assert!(TagDirectory::default()
            .enumerate(&mut classic_only)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_identification_closes_connection() {
        let tag = MockTag::desfire([0x04, 0x01]);
        let mut reader = reader_with(vec![tag.clone()]);

        TagDirectory::default().enumerate(&mut reader).unwrap();
        assert_eq!(tag.connects(), 1);
        assert_eq!(tag.disconnects(), 1);
        assert!(!tag.is_connected());
        assert!(tag.commands().is_empty());
    }

    #[test]
    fn test_unreachable_tag_policies() {
        let broken = MockTag::desfire([0x04, 0x02]);
        broken.fail_version(TransportError::TagRemoved);
        let tags = vec![
            MockTag::desfire([0x04, 0x01]),
            broken.clone(),
            MockTag::desfire([0x04, 0x03]),
        ];

        let mut reader = reader_with(tags.clone());
        let scan = TagDirectory::default().scan(&mut reader).unwrap();
        assert_eq!(scan.identities().len(), 2);
        assert_eq!(
            scan.skipped(),
            &[SkippedTag {
                uid: Uid::from([0x04, 0x02]),
                reason: CardFailure::Transport(TransportError::TagRemoved),
            }]
        );
        // The probing connection is closed even though the version read failed
        assert!(!broken.is_connected());

        let mut reader = reader_with(tags);
        let strict = TagDirectory::new(DirectoryConfig::new().strict());
        assert!(matches!(
            strict.enumerate(&mut reader),
            Err(Error::TagUnreachable { uid, .. }) if uid.to_string() == "0402"
        ));
    }

    #[test]
    fn test_find_by_uid_contacts_only_match() {
        let broken = MockTag::desfire([0x04, 0x02]);
        broken.fail_connect(TransportError::Connection);
        let mut reader = reader_with(vec![broken, MockTag::desfire([0x04, 0x03])]);
        let directory = TagDirectory::new(DirectoryConfig::new().strict());

        let handle = directory.find_by_uid(&mut reader, "0403").unwrap();
        assert_eq!(handle.identity().friendly_name(), "Mifare DESFire");
        assert!(matches!(
            directory.find_by_uid(&mut reader, "0402"),
            Err(Error::TagUnreachable {
                source: CardFailure::Transport(TransportError::Connection),
                ..
            })
        ));
    }

    #[test]
    fn test_find_by_uid_is_case_sensitive() {
        let mut reader = reader_with(vec![MockTag::desfire([0x04, 0xAA, 0xBB, 0xCC])]);
        let directory = TagDirectory::default();

        assert!(matches!(
            directory.find_by_uid(&mut reader, "04aabbcc"),
            Err(Error::TagNotFound(uid)) if uid == "04aabbcc"
        ));
        let handle = directory.find_by_uid(&mut reader, "04AABBCC").unwrap();
        assert_eq!(handle.uid().to_string(), "04AABBCC");
    }

    #[test]
    fn test_closed_reader_is_unavailable() {
        let mut reader = reader_with(vec![MockTag::desfire([0x04, 0x01])]);
        reader.close().unwrap();
        reader.close().unwrap();
        assert!(matches!(
            TagDirectory::default().enumerate(&mut reader),
            Err(Error::ReaderUnavailable(_))
        ));
    }
}

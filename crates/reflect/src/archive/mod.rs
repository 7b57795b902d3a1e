//! Binary and XML archives
//!
//! Archives persist object graphs field by field through the Data layer. Both
//! formats share the same state machine: an archive starts closed, is opened
//! for reading or writing, streams instances, and is closed again.
//!
//! ```ignore
//! let ctx = ReflectionContext::new();
//! ctx.register::<Mesh>()?;
//!
//! let bytes = archive::to_binary(&ctx, &[mesh.clone()])?;
//! let loaded = archive::from_binary(&ctx, &bytes)?;
//! ```
//!
//! Containers do not know their wire format: they hand the archive a list of
//! components (Data connected to their items) through the [`Archive`] trait.

mod binary;
mod cache;
mod error;
mod stream;
mod xml;
mod xml_tree;

use std::path::Path;

use bitflags::bitflags;
use tracing::info;

pub use binary::ArchiveBinary;
pub use cache::DataCache;
pub use error::{ArchiveError, ArchiveResult};
pub use stream::ByteStream;
pub use xml::ArchiveXml;
pub use xml_tree::XmlElement;

use crate::context::ReflectionContext;
use crate::data::Data;
use crate::object::ObjectPtr;

/// Version written by this build; newer streams are rejected
pub const CURRENT_VERSION: u32 = 1;

bitflags! {
    /// Options for component and object arrays
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ArchiveFlags: u32 {
        /// Keep null entries in place instead of dropping them
        const SPARSE = 1 << 0;
    }
}

/// Direction an archive was opened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    Read,
    Write,
}

/// Archive state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchiveState {
    Closed,
    Open(ArchiveMode),
}

impl ArchiveState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open(ArchiveMode::Read) => "open for reading",
            Self::Open(ArchiveMode::Write) => "open for writing",
        }
    }

    /// Fail unless the archive is in `expected`
    pub(crate) fn expect(self, expected: ArchiveState) -> ArchiveResult<()> {
        if self == expected {
            Ok(())
        } else {
            Err(ArchiveError::InvalidState {
                state: self.name(),
                expected: expected.name(),
            })
        }
    }
}

/// On-disk format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Binary,
    Xml,
}

impl ArchiveType {
    /// Format for a file extension: `xml`, or `bin`/`dat`/`hrb` for binary
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "xml" => Some(Self::Xml),
            "bin" | "dat" | "hrb" => Some(Self::Binary),
            _ => None,
        }
    }
}

/// Progress notifications raised while streaming top-level instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStatus {
    Starting,
    /// Percentage of the stream processed so far
    Progress(u32),
    Complete,
}

/// Callback receiving [`ArchiveStatus`] updates
pub type StatusCallback = Box<dyn FnMut(ArchiveStatus)>;

/// Operations containers use to archive their items
pub trait Archive<'ctx> {
    fn context(&self) -> &'ctx ReflectionContext;

    fn cache(&mut self) -> &mut DataCache;

    /// Write each Data as a typed component
    fn serialize_components(&mut self, components: &[Box<dyn Data>]) -> ArchiveResult<()>;

    /// Read typed components; with [`ArchiveFlags::SPARSE`], entries that could
    /// not be created stay in place as `None`
    fn deserialize_components(
        &mut self,
        flags: ArchiveFlags,
    ) -> ArchiveResult<Vec<Option<Box<dyn Data>>>>;

    fn serialize_objects(&mut self, objects: &[Option<ObjectPtr>]) -> ArchiveResult<()>;

    /// Read object references; null entries are only kept with [`ArchiveFlags::SPARSE`]
    fn deserialize_objects(&mut self, flags: ArchiveFlags) -> ArchiveResult<Vec<Option<ObjectPtr>>>;
}

/// Write `objects` to a binary buffer
pub fn to_binary(ctx: &ReflectionContext, objects: &[ObjectPtr]) -> ArchiveResult<Vec<u8>> {
    let mut archive = ArchiveBinary::new(ctx);
    archive.open_write()?;
    for object in objects {
        archive.serialize_instance(object)?;
    }
    archive.close()
}

/// Read every object from a binary buffer, skipping nulls and unknown types
pub fn from_binary(ctx: &ReflectionContext, bytes: &[u8]) -> ArchiveResult<Vec<ObjectPtr>> {
    let mut archive = ArchiveBinary::new(ctx);
    archive.open_read(bytes.to_vec())?;
    let mut objects = Vec::new();
    while archive.has_more() {
        if let Some(object) = archive.deserialize_instance()? {
            objects.push(object);
        }
    }
    archive.close()?;
    Ok(objects)
}

/// Write `objects` to an XML document
pub fn to_xml(ctx: &ReflectionContext, objects: &[ObjectPtr]) -> ArchiveResult<String> {
    let mut archive = ArchiveXml::new(ctx);
    archive.open_write()?;
    for object in objects {
        archive.serialize_instance(object)?;
    }
    archive.close()
}

/// Read every object from an XML document, skipping nulls and unknown types
pub fn from_xml(ctx: &ReflectionContext, text: &str) -> ArchiveResult<Vec<ObjectPtr>> {
    let mut archive = ArchiveXml::new(ctx);
    archive.open_read(text)?;
    let mut objects = Vec::new();
    while archive.has_more() {
        if let Some(object) = archive.deserialize_instance()? {
            objects.push(object);
        }
    }
    archive.close()?;
    Ok(objects)
}

fn archive_type(path: &Path) -> ArchiveResult<ArchiveType> {
    ArchiveType::from_path(path).ok_or_else(|| {
        ArchiveError::Stream(format!("Unknown archive extension: {}", path.display()))
    })
}

/// Write `objects` to `path`, picking the format from the extension
pub fn save(ctx: &ReflectionContext, path: &Path, objects: &[ObjectPtr]) -> ArchiveResult<()> {
    match archive_type(path)? {
        ArchiveType::Binary => std::fs::write(path, to_binary(ctx, objects)?)?,
        ArchiveType::Xml => std::fs::write(path, to_xml(ctx, objects)?)?,
    }
    info!("Saved {} objects to {:?}", objects.len(), path);
    Ok(())
}

/// Read every object from `path`, picking the format from the extension
pub fn load(ctx: &ReflectionContext, path: &Path) -> ArchiveResult<Vec<ObjectPtr>> {
    let objects = match archive_type(path)? {
        ArchiveType::Binary => from_binary(ctx, &std::fs::read(path)?)?,
        ArchiveType::Xml => from_xml(ctx, &std::fs::read_to_string(path)?)?,
    };
    info!("Loaded {} objects from {:?}", objects.len(), path);
    Ok(objects)
}

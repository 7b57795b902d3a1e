//! Binary archive
//!
//! Layout, all integers little endian:
//!
//! ```text
//! header   u16 byte order mark (0xFEFF), u32 version, u32 CRC-32 of the body
//! body     u32 count, element*, i32 -1
//! element  string type (empty for null), u32 length, payload
//! payload  u32 field count, field*, i32 -1
//! field    string name, string data class, u32 length, data
//! ```
//!
//! Lengths let readers skip types and fields they do not know.

use std::ptr::NonNull;

use tracing::{debug, trace, warn};

use super::{
    Archive, ArchiveError, ArchiveFlags, ArchiveMode, ArchiveResult, ArchiveState, ArchiveStatus,
    ByteStream, DataCache, StatusCallback, CURRENT_VERSION,
};
use crate::context::ReflectionContext;
use crate::data::{Data, DataFlags};
use crate::object::{address_of, ObjectPtr};
use crate::registry::{Composite, Field, FieldFlags, Reflect};

const BYTE_ORDER_MARK: u16 = 0xFEFF;
const SWAPPED_BYTE_ORDER_MARK: u16 = 0xFFFE;
const CHECKSUM_OFFSET: usize = 6;
const HEADER_LEN: usize = 10;
const TERMINATOR: i32 = -1;

/// Archive reading or writing the binary format
pub struct ArchiveBinary<'ctx> {
    ctx: &'ctx ReflectionContext,
    state: ArchiveState,
    stream: ByteStream,
    version: u32,
    /// Offset of the element count slot while writing
    count_at: usize,
    written: usize,
    total: usize,
    read: usize,
    cache: DataCache,
    /// Objects being written, for cycle detection
    visiting: Vec<(usize, &'static str)>,
    status: Option<StatusCallback>,
}

impl<'ctx> ArchiveBinary<'ctx> {
    pub fn new(ctx: &'ctx ReflectionContext) -> Self {
        Self {
            ctx,
            state: ArchiveState::Closed,
            stream: ByteStream::new(),
            version: CURRENT_VERSION,
            count_at: 0,
            written: 0,
            total: 0,
            read: 0,
            cache: DataCache::new(ctx.config().archive.cache_capacity),
            visiting: Vec::new(),
            status: None,
        }
    }

    /// Receive progress updates
    pub fn on_status(&mut self, callback: impl FnMut(ArchiveStatus) + 'static) {
        self.status = Some(Box::new(callback));
    }

    fn notify(&mut self, status: ArchiveStatus) {
        if let Some(callback) = self.status.as_mut() {
            callback(status);
        }
    }

    /// Current mode, or `None` when closed
    pub fn mode(&self) -> Option<ArchiveMode> {
        match self.state {
            ArchiveState::Closed => None,
            ArchiveState::Open(mode) => Some(mode),
        }
    }

    /// Version of the stream being read, or the one being written
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The underlying byte stream, for Data implementations
    pub fn stream(&mut self) -> &mut ByteStream {
        &mut self.stream
    }

    /// Start a new stream
    #[tracing::instrument(skip_all)]
    pub fn open_write(&mut self) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Closed)?;

        let mut stream = ByteStream::new();
        stream.write_u16(BYTE_ORDER_MARK);
        stream.write_u32(CURRENT_VERSION);
        stream.write_u32(0);
        self.count_at = stream.begin_length();
        self.stream = stream;
        self.version = CURRENT_VERSION;
        self.written = 0;
        self.state = ArchiveState::Open(ArchiveMode::Write);
        self.notify(ArchiveStatus::Starting);
        Ok(())
    }

    /// Validate the header of `bytes` and prepare to read its elements
    #[tracing::instrument(skip_all, fields(len = bytes.len()))]
    pub fn open_read(&mut self, bytes: Vec<u8>) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Closed)?;

        let mut stream = ByteStream::from_bytes(bytes);
        match stream.read_u16()? {
            BYTE_ORDER_MARK => {}
            SWAPPED_BYTE_ORDER_MARK => {
                return Err(ArchiveError::Stream(
                    "Byte order mismatch, stream was written big endian".to_string(),
                ))
            }
            other => {
                return Err(ArchiveError::Stream(format!(
                    "Invalid byte order mark {:#06x}",
                    other
                )))
            }
        }

        let version = stream.read_u32()?;
        if version == 0 || version > CURRENT_VERSION {
            return Err(ArchiveError::Stream(format!(
                "Unsupported version {}, expected at most {}",
                version, CURRENT_VERSION
            )));
        }

        let expected = stream.read_u32()?;
        if self.ctx.config().archive.verify_checksum {
            let actual = crc32fast::hash(&stream.as_bytes()[HEADER_LEN..]);
            if actual != expected {
                return Err(ArchiveError::Checksum { expected, actual });
            }
        }

        let total = stream.read_count(4)?;
        if total == 0 {
            expect_terminator(&mut stream, "element")?;
        }

        debug!("Reading {} elements, version {}", total, version);
        self.stream = stream;
        self.total = total;
        self.version = version;
        self.read = 0;
        self.state = ArchiveState::Open(ArchiveMode::Read);
        self.notify(ArchiveStatus::Starting);
        Ok(())
    }

    /// Whether elements remain to be read
    pub fn has_more(&self) -> bool {
        self.state == ArchiveState::Open(ArchiveMode::Read) && self.read < self.total
    }

    /// Append an object to the stream
    #[tracing::instrument(skip_all)]
    pub fn serialize_instance(&mut self, object: &ObjectPtr) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Open(ArchiveMode::Write))?;
        self.write_object(Some(object))?;
        self.written += 1;
        Ok(())
    }

    /// Append a structure value to the stream
    #[tracing::instrument(skip_all)]
    pub fn serialize_structure<T: Reflect>(&mut self, value: &T) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Open(ArchiveMode::Write))?;
        let composite = T::composite();
        self.stream.write_string(composite.name());
        let at = self.stream.begin_length();
        // SAFETY: `value` is a live `T`, described by `T::composite()`
        unsafe { self.serialize_composite(composite, NonNull::from(value).cast())? };
        self.stream.end_length(at);
        self.written += 1;
        Ok(())
    }

    /// Read the next object
    ///
    /// Null elements and elements of unknown types yield `None`.
    #[tracing::instrument(skip_all)]
    pub fn deserialize_instance(&mut self) -> ArchiveResult<Option<ObjectPtr>> {
        self.begin_element()?;
        let object = self.read_object()?;
        self.end_element()?;
        Ok(object)
    }

    /// Read the next element as a `T` structure
    #[tracing::instrument(skip_all)]
    pub fn deserialize_structure<T: Reflect + Default>(&mut self) -> ArchiveResult<T> {
        self.begin_element()?;
        let composite = T::composite();
        let name = self.stream.read_string()?;
        let known = self
            .ctx
            .registry()
            .get_type(&name)
            .is_some_and(|found| std::ptr::eq(found, composite));
        if name != composite.name() && !known {
            return Err(ArchiveError::TypeInformation(format!(
                "Expected structure {}, found {:?}",
                composite.name(),
                name
            )));
        }

        let length = self.stream.read_u32()? as usize;
        let start = self.stream.position();
        let mut value = T::default();
        // SAFETY: `value` is a live `T`, borrowed exclusively
        unsafe { self.deserialize_composite(composite, NonNull::from(&mut value).cast())? };
        self.check_consumed(composite.name(), start, length)?;
        self.end_element()?;
        Ok(value)
    }

    /// Finish the archive, returning the bytes written (empty after reading)
    #[tracing::instrument(skip_all)]
    pub fn close(&mut self) -> ArchiveResult<Vec<u8>> {
        let bytes = match self.state {
            ArchiveState::Closed => {
                return Err(ArchiveError::InvalidState {
                    state: self.state.name(),
                    expected: "open",
                })
            }
            ArchiveState::Open(ArchiveMode::Write) => {
                self.stream.write_i32(TERMINATOR);
                self.stream.patch_u32(self.count_at, self.written as u32);
                let checksum = crc32fast::hash(&self.stream.as_bytes()[HEADER_LEN..]);
                self.stream.patch_u32(CHECKSUM_OFFSET, checksum);
                debug!("Wrote {} elements, {} bytes", self.written, self.stream.len());
                std::mem::take(&mut self.stream).into_bytes()
            }
            ArchiveState::Open(ArchiveMode::Read) => {
                if self.read < self.total {
                    debug!("Closed after {} of {} elements", self.read, self.total);
                }
                self.stream = ByteStream::new();
                Vec::new()
            }
        };
        self.state = ArchiveState::Closed;
        self.visiting.clear();
        self.cache.clear();
        self.notify(ArchiveStatus::Complete);
        Ok(bytes)
    }

    fn begin_element(&mut self) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Open(ArchiveMode::Read))?;
        if self.read >= self.total {
            return Err(ArchiveError::data_format(format!(
                "Read past the last of {} elements",
                self.total
            )));
        }
        Ok(())
    }

    fn end_element(&mut self) -> ArchiveResult<()> {
        self.read += 1;
        let percent = (self.stream.position() * 100 / self.stream.len().max(1)) as u32;
        self.notify(ArchiveStatus::Progress(percent.min(100)));
        if self.read == self.total {
            self.read_terminator("element")?;
        }
        Ok(())
    }

    fn read_terminator(&mut self, block: &str) -> ArchiveResult<()> {
        expect_terminator(&mut self.stream, block)
    }

    fn check_consumed(&self, what: &str, start: usize, length: usize) -> ArchiveResult<()> {
        let consumed = self.stream.position() - start;
        if consumed != length {
            return Err(ArchiveError::data_format(format!(
                "{} consumed {} bytes, expected {}",
                what, consumed, length
            )));
        }
        Ok(())
    }

    fn write_object(&mut self, object: Option<&ObjectPtr>) -> ArchiveResult<()> {
        let Some(object) = object else {
            self.stream.write_string("");
            return Ok(());
        };

        let address = address_of(object);
        if let Some((_, name)) = self.visiting.iter().find(|(seen, _)| *seen == address) {
            return Err(ArchiveError::CyclicReference(name.to_string()));
        }

        let mut guard = object.write();
        let class = guard.class();
        self.stream.write_string(class.name());
        let at = self.stream.begin_length();

        self.visiting.push((address, class.name()));
        guard.pre_serialize();
        // SAFETY: the write guard keeps the instance alive and unaliased
        let result = unsafe { self.serialize_composite(class, guard.instance_ptr()) };
        guard.post_serialize();
        self.visiting.pop();

        result?;
        self.stream.end_length(at);
        trace!("Wrote {} ({} bytes)", class.name(), self.stream.len() - at - 4);
        Ok(())
    }

    fn read_object(&mut self) -> ArchiveResult<Option<ObjectPtr>> {
        let name = self.stream.read_string()?;
        if name.is_empty() {
            return Ok(None);
        }
        let length = self.stream.read_u32()? as usize;
        let start = self.stream.position();

        let Some(object) = self.ctx.create_instance(&name) else {
            warn!("Unable to create object of type {}, skipping {} bytes", name, length);
            self.stream.skip(length)?;
            return Ok(None);
        };

        {
            let mut guard = object.write();
            let class = guard.class();
            guard.pre_deserialize();
            // SAFETY: the object was just created and is locked exclusively
            unsafe { self.deserialize_composite(class, guard.instance_ptr_mut())? };
            guard.post_deserialize();
        }
        self.check_consumed(&name, start, length)?;
        Ok(Some(object))
    }

    /// Write the fields of the instance at `instance`
    ///
    /// # Safety
    /// `instance` must point to a live instance described by `composite`.
    pub(crate) unsafe fn serialize_composite(
        &mut self,
        composite: &'static Composite,
        instance: NonNull<u8>,
    ) -> ArchiveResult<()> {
        let mut fields: Vec<(&Field, Box<dyn Data>)> = Vec::new();
        for field in composite.fields() {
            if field.flags().contains(FieldFlags::DISCARD) {
                continue;
            }
            let data = self.cache.bind(field, instance);
            if !field.flags().contains(FieldFlags::FORCE) && !data.should_serialize() {
                self.cache.give(data);
                continue;
            }
            fields.push((field, data));
        }

        self.stream.write_u32(fields.len() as u32);
        let mut result = Ok(());
        for (field, data) in fields {
            if result.is_ok() {
                self.stream.write_string(field.name());
                self.stream.write_string(&data.data_class().name());
                let at = self.stream.begin_length();
                result = data.serialize_binary(self);
                self.stream.end_length(at);
            }
            self.cache.give(data);
        }
        result?;
        self.stream.write_i32(TERMINATOR);
        Ok(())
    }

    /// Read fields into the instance at `instance`
    ///
    /// Unknown fields are skipped. A field stored with a different data class
    /// is read into a scratch Data and cast to the declared class.
    ///
    /// # Safety
    /// `instance` must point to a live instance described by `composite`,
    /// borrowed exclusively.
    pub(crate) unsafe fn deserialize_composite(
        &mut self,
        composite: &'static Composite,
        instance: NonNull<u8>,
    ) -> ArchiveResult<()> {
        let ctx = self.ctx;
        let count = self.stream.read_count(12)?;
        for _ in 0..count {
            let name = self.stream.read_string()?;
            let class_name = self.stream.read_string()?;
            let length = self.stream.read_u32()? as usize;
            let start = self.stream.position();

            let Some(field) = composite.find_field(&name) else {
                debug!("Skipping unknown field {}::{}", composite.name(), name);
                self.stream.skip(length)?;
                continue;
            };

            if class_name == field.data_class().name() {
                let mut data = self.cache.bind(field, instance);
                let result = data.deserialize_binary(self);
                self.cache.give(data);
                result?;
            } else {
                let Some(mut latent) = ctx.registry().create_data_by_name(&class_name) else {
                    warn!(
                        "Skipping field {}::{} of unknown class {}",
                        composite.name(),
                        name,
                        class_name
                    );
                    self.stream.skip(length)?;
                    continue;
                };
                latent.deserialize_binary(self)?;

                let mut data = self.cache.bind(field, instance);
                let cast = ctx.cast_value(&*latent, &mut *data, DataFlags::SHALLOW);
                self.cache.give(data);
                if !cast {
                    cast_failed(ctx, composite, field, &class_name)?;
                }
            }
            self.check_consumed(field.name(), start, length)?;
        }
        self.read_terminator("field")
    }
}

/// Handle a stored field value that could not be cast to the declared class
pub(crate) fn cast_failed(
    ctx: &ReflectionContext,
    composite: &Composite,
    field: &Field,
    stored: &str,
) -> ArchiveResult<()> {
    let message = format!(
        "Unable to cast {}::{} from {} to {}",
        composite.name(),
        field.name(),
        stored,
        field.data_class()
    );
    if ctx.config().archive.strict_casts {
        return Err(ArchiveError::DataFormat(message));
    }
    warn!("{}, keeping the current value", message);
    Ok(())
}

impl<'ctx> Archive<'ctx> for ArchiveBinary<'ctx> {
    fn context(&self) -> &'ctx ReflectionContext {
        self.ctx
    }

    fn cache(&mut self) -> &mut DataCache {
        &mut self.cache
    }

    fn serialize_components(&mut self, components: &[Box<dyn Data>]) -> ArchiveResult<()> {
        self.stream.write_u32(components.len() as u32);
        for component in components {
            self.stream.write_string(&component.data_class().name());
            let at = self.stream.begin_length();
            component.serialize_binary(self)?;
            self.stream.end_length(at);
        }
        self.stream.write_i32(TERMINATOR);
        Ok(())
    }

    fn deserialize_components(
        &mut self,
        flags: ArchiveFlags,
    ) -> ArchiveResult<Vec<Option<Box<dyn Data>>>> {
        let sparse = flags.contains(ArchiveFlags::SPARSE);
        let count = self.stream.read_count(4)?;
        let mut components = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.stream.read_string()?;
            if name.is_empty() {
                if sparse {
                    components.push(None);
                }
                continue;
            }
            let length = self.stream.read_u32()? as usize;
            let start = self.stream.position();

            let Some(creator) = self.ctx.registry().data_creator(&name) else {
                warn!("Skipping component of unknown class {} ({} bytes)", name, length);
                self.stream.skip(length)?;
                if sparse {
                    components.push(None);
                }
                continue;
            };

            let mut data = self.cache.take(creator.class, creator.create);
            if let Err(err) = data.deserialize_binary(self) {
                self.cache.give(data);
                return Err(err);
            }
            self.check_consumed(&name, start, length)?;
            components.push(Some(data));
        }
        self.read_terminator("component")?;
        Ok(components)
    }

    fn serialize_objects(&mut self, objects: &[Option<ObjectPtr>]) -> ArchiveResult<()> {
        self.stream.write_u32(objects.len() as u32);
        for object in objects {
            self.write_object(object.as_ref())?;
        }
        self.stream.write_i32(TERMINATOR);
        Ok(())
    }

    fn deserialize_objects(&mut self, flags: ArchiveFlags) -> ArchiveResult<Vec<Option<ObjectPtr>>> {
        let sparse = flags.contains(ArchiveFlags::SPARSE);
        let count = self.stream.read_count(4)?;
        let mut objects = Vec::with_capacity(count);
        for _ in 0..count {
            let object = self.read_object()?;
            if object.is_some() || sparse {
                objects.push(object);
            }
        }
        self.read_terminator("object")?;
        Ok(objects)
    }
}

impl std::fmt::Debug for ArchiveBinary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBinary")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("position", &self.stream.position())
            .field("len", &self.stream.len())
            .finish()
    }
}

fn expect_terminator(stream: &mut ByteStream, block: &str) -> ArchiveResult<()> {
    if stream.read_i32()? != TERMINATOR {
        return Err(ArchiveError::data_format(format!(
            "Unterminated {} block",
            block
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_archive(ctx: &ReflectionContext) -> Vec<u8> {
        let mut archive = ArchiveBinary::new(ctx);
        archive.open_write().unwrap();
        archive.close().unwrap()
    }

    #[test]
    fn test_empty_archive_layout() {
        let ctx = ReflectionContext::new();
        let bytes = empty_archive(&ctx);

        assert_eq!(bytes.len(), HEADER_LEN + 8);
        assert_eq!(&bytes[0..2], &[0xFF, 0xFE]);
        assert_eq!(u32::from_le_bytes(bytes[2..6].try_into().unwrap()), CURRENT_VERSION);
        assert_eq!(&bytes[HEADER_LEN..], &[0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);

        let mut archive = ArchiveBinary::new(&ctx);
        archive.open_read(bytes).unwrap();
        assert!(!archive.has_more());
        archive.close().unwrap();
    }

    #[test]
    fn test_state_machine() {
        let ctx = ReflectionContext::new();
        let mut archive = ArchiveBinary::new(&ctx);
        assert!(matches!(archive.close(), Err(ArchiveError::InvalidState { .. })));
        assert!(matches!(
            archive.deserialize_instance(),
            Err(ArchiveError::InvalidState { .. })
        ));

        archive.open_write().unwrap();
        assert_eq!(archive.mode(), Some(ArchiveMode::Write));
        assert!(matches!(archive.open_write(), Err(ArchiveError::InvalidState { .. })));
        archive.close().unwrap();
        assert_eq!(archive.mode(), None);
    }

    #[test]
    fn test_checksum_mismatch() {
        let ctx = ReflectionContext::new();
        let mut bytes = empty_archive(&ctx);
        bytes[HEADER_LEN] = 1;

        let mut archive = ArchiveBinary::new(&ctx);
        let err = archive.open_read(bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::Checksum { .. }));
        assert_eq!(archive.mode(), None);
    }

    #[test]
    fn test_unterminated_empty_stream_stays_closed() {
        let mut config = crate::config::ReflectConfig::default();
        config.archive.verify_checksum = false;
        let ctx = ReflectionContext::with_config(config);
        let bytes = empty_archive(&ctx);

        let mut archive = ArchiveBinary::new(&ctx);
        let truncated = bytes[..bytes.len() - 4].to_vec();
        assert!(archive.open_read(truncated).is_err());
        assert_eq!(archive.mode(), None);

        let mut corrupt = bytes.clone();
        corrupt[HEADER_LEN + 4] = 0;
        let err = archive.open_read(corrupt).unwrap_err();
        assert!(matches!(err, ArchiveError::DataFormat(_)));
        assert_eq!(archive.mode(), None);
        assert!(!archive.has_more());

        archive.open_read(bytes).unwrap();
        assert_eq!(archive.mode(), Some(ArchiveMode::Read));
        archive.close().unwrap();
    }

    #[test]
    fn test_rejects_swapped_byte_order_and_newer_versions() {
        let ctx = ReflectionContext::new();
        let mut swapped = empty_archive(&ctx);
        swapped[0..2].copy_from_slice(&[0xFE, 0xFF]);
        let err = ArchiveBinary::new(&ctx).open_read(swapped).unwrap_err();
        assert!(matches!(err, ArchiveError::Stream(_)));

        let mut newer = empty_archive(&ctx);
        newer[2..6].copy_from_slice(&(CURRENT_VERSION + 1).to_le_bytes());
        let err = ArchiveBinary::new(&ctx).open_read(newer).unwrap_err();
        assert!(matches!(err, ArchiveError::Stream(_)));
    }

    #[test]
    fn test_status_callbacks() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let ctx = ReflectionContext::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut archive = ArchiveBinary::new(&ctx);
        let sink = seen.clone();
        archive.on_status(move |status| sink.borrow_mut().push(status));
        archive.open_write().unwrap();
        archive.close().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![ArchiveStatus::Starting, ArchiveStatus::Complete]
        );
    }

    #[test]
    fn test_truncated_stream() {
        let ctx = ReflectionContext::new();
        let err = ArchiveBinary::new(&ctx).open_read(vec![0xFF]).unwrap_err();
        assert!(matches!(err, ArchiveError::UnexpectedEof { .. }));
    }
}

//! XML archive
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <Reflect FileFormatVersion="1">
//!   <Object Type="Mesh">
//!     <Field Name="name" Type="String">cube</Field>
//!     <Field Name="tags" Type="StringDynArray"><![CDATA[
//!       "static"
//!       "shadow"
//!     ]]></Field>
//!     <Field Name="material" Type="Pointer">
//!       <Object Type="Material">
//!         ...
//!       </Object>
//!     </Field>
//!   </Object>
//!   <Null/>
//! </Reflect>
//! ```
//!
//! Containers of non-string items write one value per line; set and map items
//! that need their own type information are written as `<Data Type>` elements.

use std::ptr::NonNull;
use std::rc::Rc;

use quick_xml::escape::escape;
use tracing::{debug, warn};

use super::binary::cast_failed;
use super::{
    Archive, ArchiveError, ArchiveFlags, ArchiveMode, ArchiveResult, ArchiveState, ArchiveStatus,
    DataCache, StatusCallback, XmlElement, CURRENT_VERSION,
};
use crate::context::ReflectionContext;
use crate::data::{quote_entry, Data, DataFlags};
use crate::object::{address_of, ObjectPtr};
use crate::registry::{Composite, FieldFlags, Reflect};

const ROOT: &str = "Reflect";
const VERSION_ATTRIBUTE: &str = "FileFormatVersion";
const OBJECT: &str = "Object";
const STRUCTURE: &str = "Structure";
const FIELD: &str = "Field";
const DATA: &str = "Data";
const NULL: &str = "Null";

/// Archive reading or writing the XML format
pub struct ArchiveXml<'ctx> {
    ctx: &'ctx ReflectionContext,
    state: ArchiveState,
    version: u32,
    out: String,
    depth: usize,
    indent_width: usize,
    /// Top-level elements of the document being read
    elements: Vec<Rc<XmlElement>>,
    read: usize,
    /// Elements being read, innermost last
    current: Vec<Rc<XmlElement>>,
    cache: DataCache,
    visiting: Vec<(usize, &'static str)>,
    status: Option<StatusCallback>,
}

impl<'ctx> ArchiveXml<'ctx> {
    pub fn new(ctx: &'ctx ReflectionContext) -> Self {
        let config = &ctx.config().archive;
        Self {
            ctx,
            state: ArchiveState::Closed,
            version: CURRENT_VERSION,
            out: String::new(),
            depth: 0,
            indent_width: config.indent_width,
            elements: Vec::new(),
            read: 0,
            current: Vec::new(),
            cache: DataCache::new(config.cache_capacity),
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

    pub fn mode(&self) -> Option<ArchiveMode> {
        match self.state {
            ArchiveState::Closed => None,
            ArchiveState::Open(mode) => Some(mode),
        }
    }

    /// Version of the document being read, or the one being written
    pub fn version(&self) -> u32 {
        self.version
    }

    #[tracing::instrument(skip_all)]
    pub fn open_write(&mut self) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Closed)?;
        self.out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        self.out
            .push_str(&format!("<{} {}=\"{}\">\n", ROOT, VERSION_ATTRIBUTE, CURRENT_VERSION));
        self.depth = 1;
        self.version = CURRENT_VERSION;
        self.state = ArchiveState::Open(ArchiveMode::Write);
        self.notify(ArchiveStatus::Starting);
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn open_read(&mut self, text: &str) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Closed)?;

        let root = XmlElement::parse(text)?;
        if root.name != ROOT {
            return Err(ArchiveError::Stream(format!(
                "Expected <{}> root element, found <{}>",
                ROOT, root.name
            )));
        }
        let version = match root.attribute(VERSION_ATTRIBUTE) {
            Some(value) => value.trim().parse::<u32>().map_err(|_| {
                ArchiveError::Stream(format!("Invalid {} {:?}", VERSION_ATTRIBUTE, value))
            })?,
            None => CURRENT_VERSION,
        };
        if version == 0 || version > CURRENT_VERSION {
            return Err(ArchiveError::Stream(format!(
                "Unsupported version {}, expected at most {}",
                version, CURRENT_VERSION
            )));
        }

        self.elements = root
            .children
            .iter()
            .filter(|child| matches!(child.name.as_str(), OBJECT | STRUCTURE | NULL))
            .cloned()
            .collect();
        debug!("Reading {} elements, version {}", self.elements.len(), version);
        self.version = version;
        self.read = 0;
        self.current.clear();
        self.state = ArchiveState::Open(ArchiveMode::Read);
        self.notify(ArchiveStatus::Starting);
        Ok(())
    }

    pub fn has_more(&self) -> bool {
        self.state == ArchiveState::Open(ArchiveMode::Read) && self.read < self.elements.len()
    }

    /// Append an object to the document
    #[tracing::instrument(skip_all)]
    pub fn serialize_instance(&mut self, object: &ObjectPtr) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Open(ArchiveMode::Write))?;
        self.write_object(Some(object))
    }

    /// Append a structure value to the document
    #[tracing::instrument(skip_all)]
    pub fn serialize_structure<T: Reflect>(&mut self, value: &T) -> ArchiveResult<()> {
        self.state.expect(ArchiveState::Open(ArchiveMode::Write))?;
        let composite = T::composite();
        self.open_tag(STRUCTURE, &[("Type", composite.name())]);
        // SAFETY: `value` is a live `T`, described by `T::composite()`
        unsafe { self.serialize_composite(composite, NonNull::from(value).cast())? };
        self.close_tag(STRUCTURE);
        Ok(())
    }

    /// Read the next object; `<Null/>` and unknown types yield `None`
    #[tracing::instrument(skip_all)]
    pub fn deserialize_instance(&mut self) -> ArchiveResult<Option<ObjectPtr>> {
        let element = self.next_element()?;
        match element.name.as_str() {
            NULL => Ok(None),
            OBJECT => self.read_object(&element),
            other => Err(ArchiveError::data_format(format!(
                "Expected <{}>, found <{}>",
                OBJECT, other
            ))),
        }
    }

    /// Read the next element as a `T` structure
    #[tracing::instrument(skip_all)]
    pub fn deserialize_structure<T: Reflect + Default>(&mut self) -> ArchiveResult<T> {
        let element = self.next_element()?;
        let composite = T::composite();
        if element.name != STRUCTURE {
            return Err(ArchiveError::data_format(format!(
                "Expected <{}>, found <{}>",
                STRUCTURE, element.name
            )));
        }
        let name = element.attribute("Type").unwrap_or_default();
        let known = self
            .ctx
            .registry()
            .get_type(name)
            .is_some_and(|found| std::ptr::eq(found, composite));
        if name != composite.name() && !known {
            return Err(ArchiveError::TypeInformation(format!(
                "Expected structure {}, found {:?}",
                composite.name(),
                name
            )));
        }

        let mut value = T::default();
        // SAFETY: `value` is a live `T`, borrowed exclusively
        unsafe {
            self.deserialize_composite(composite, NonNull::from(&mut value).cast(), &element)?
        };
        Ok(value)
    }

    /// Finish the archive, returning the document written (empty after reading)
    #[tracing::instrument(skip_all)]
    pub fn close(&mut self) -> ArchiveResult<String> {
        let text = match self.state {
            ArchiveState::Closed => {
                return Err(ArchiveError::InvalidState {
                    state: self.state.name(),
                    expected: "open",
                })
            }
            ArchiveState::Open(ArchiveMode::Write) => {
                self.out.push_str(&format!("</{}>\n", ROOT));
                std::mem::take(&mut self.out)
            }
            ArchiveState::Open(ArchiveMode::Read) => {
                self.elements.clear();
                self.current.clear();
                String::new()
            }
        };
        self.state = ArchiveState::Closed;
        self.depth = 0;
        self.visiting.clear();
        self.cache.clear();
        self.notify(ArchiveStatus::Complete);
        Ok(text)
    }

    fn next_element(&mut self) -> ArchiveResult<Rc<XmlElement>> {
        self.state.expect(ArchiveState::Open(ArchiveMode::Read))?;
        let element = self.elements.get(self.read).cloned().ok_or_else(|| {
            ArchiveError::data_format(format!(
                "Read past the last of {} elements",
                self.elements.len()
            ))
        })?;
        self.read += 1;
        let percent = (self.read * 100 / self.elements.len().max(1)) as u32;
        self.notify(ArchiveStatus::Progress(percent));
        Ok(element)
    }

    // Writing

    fn indent(&mut self) {
        let width = self.depth * self.indent_width;
        self.out.extend(std::iter::repeat(' ').take(width));
    }

    fn start_tag(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attributes {
            self.out.push_str(&format!(" {}=\"{}\"", key, escape(*value)));
        }
        self.out.push('>');
    }

    fn open_tag(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.start_tag(name, attributes);
        self.out.push('\n');
        self.depth += 1;
    }

    fn close_tag(&mut self, name: &str) {
        self.depth -= 1;
        self.indent();
        self.out.push_str(&format!("</{}>\n", name));
    }

    /// Write escaped character data inside the current element
    pub fn write_text(&mut self, text: &str) {
        self.out.push_str(&escape(text));
    }

    /// Start a multi-line body; close it with [`end_block`](Self::end_block)
    pub fn begin_block(&mut self) {
        self.out.push('\n');
        self.depth += 1;
    }

    pub fn end_block(&mut self) {
        self.depth -= 1;
        self.indent();
    }

    /// Write one indented, escaped line inside a block
    pub fn write_line(&mut self, line: &str) {
        self.indent();
        self.write_text(line);
        self.out.push('\n');
    }

    /// Write `lines` as quoted entries of a CDATA section, one per line
    pub fn write_quoted_block(&mut self, lines: &[String]) {
        self.out.push_str("<![CDATA[\n");
        self.depth += 1;
        for line in lines {
            self.indent();
            let quoted = quote_entry(line);
            self.out.push_str(&quoted.replace("]]>", "]]]]><![CDATA[>"));
            self.out.push('\n');
        }
        self.depth -= 1;
        self.indent();
        self.out.push_str("]]>");
    }

    fn write_object(&mut self, object: Option<&ObjectPtr>) -> ArchiveResult<()> {
        let Some(object) = object else {
            self.indent();
            self.out.push_str(&format!("<{}/>\n", NULL));
            return Ok(());
        };

        let address = address_of(object);
        if let Some((_, name)) = self.visiting.iter().find(|(seen, _)| *seen == address) {
            return Err(ArchiveError::CyclicReference(name.to_string()));
        }

        let mut guard = object.write();
        let class = guard.class();
        self.open_tag(OBJECT, &[("Type", class.name())]);

        self.visiting.push((address, class.name()));
        guard.pre_serialize();
        // SAFETY: the write guard keeps the instance alive and unaliased
        let result = unsafe { self.serialize_composite(class, guard.instance_ptr()) };
        guard.post_serialize();
        self.visiting.pop();

        result?;
        self.close_tag(OBJECT);
        Ok(())
    }

    /// Write a `<Field>` element for each archived field of the instance
    ///
    /// # Safety
    /// `instance` must point to a live instance described by `composite`.
    pub(crate) unsafe fn serialize_composite(
        &mut self,
        composite: &'static Composite,
        instance: NonNull<u8>,
    ) -> ArchiveResult<()> {
        for field in composite.fields() {
            if field.flags().contains(FieldFlags::DISCARD) {
                continue;
            }
            let data = self.cache.bind(field, instance);
            if !field.flags().contains(FieldFlags::FORCE) && !data.should_serialize() {
                self.cache.give(data);
                continue;
            }

            let class = data.data_class().name();
            self.start_tag(FIELD, &[("Name", field.name()), ("Type", class.as_str())]);
            let result = data.serialize_xml(self);
            self.cache.give(data);
            result?;
            self.out.push_str(&format!("</{}>\n", FIELD));
        }
        Ok(())
    }

    // Reading

    /// The element being read
    pub fn current(&self) -> ArchiveResult<Rc<XmlElement>> {
        self.current
            .last()
            .cloned()
            .ok_or_else(|| ArchiveError::Xml("No element is being read".to_string()))
    }

    /// Character data of the element being read
    pub fn current_text(&self) -> ArchiveResult<String> {
        Ok(self.current()?.text.clone())
    }

    /// Read `data` from `element`
    fn read_data(&mut self, data: &mut dyn Data, element: &Rc<XmlElement>) -> ArchiveResult<()> {
        self.current.push(element.clone());
        let result = data.deserialize_xml(self);
        self.current.pop();
        result
    }

    fn read_object(&mut self, element: &XmlElement) -> ArchiveResult<Option<ObjectPtr>> {
        let Some(name) = element.attribute("Type") else {
            return Err(ArchiveError::data_format("Object element without a Type"));
        };
        let Some(object) = self.ctx.create_instance(name) else {
            warn!("Unable to create object of type {}, skipping", name);
            return Ok(None);
        };

        {
            let mut guard = object.write();
            let class = guard.class();
            guard.pre_deserialize();
            // SAFETY: the object was just created and is locked exclusively
            unsafe { self.deserialize_composite(class, guard.instance_ptr_mut(), element)? };
            guard.post_deserialize();
        }
        Ok(Some(object))
    }

    /// Read the `<Field>` children of `element` into the instance
    ///
    /// # Safety
    /// `instance` must point to a live instance described by `composite`,
    /// borrowed exclusively.
    pub(crate) unsafe fn deserialize_composite(
        &mut self,
        composite: &'static Composite,
        instance: NonNull<u8>,
        element: &XmlElement,
    ) -> ArchiveResult<()> {
        let ctx = self.ctx;
        for child in element.children_named(FIELD) {
            let Some(name) = child.attribute("Name") else {
                return Err(ArchiveError::data_format(format!(
                    "Field element without a Name in {}",
                    composite.name()
                )));
            };
            let Some(field) = composite.find_field(name) else {
                debug!("Skipping unknown field {}::{}", composite.name(), name);
                continue;
            };

            let stored = child.attribute("Type").unwrap_or_default();
            if stored.is_empty() || stored == field.data_class().name() {
                let mut data = self.cache.bind(field, instance);
                let result = self.read_data(&mut *data, child);
                self.cache.give(data);
                result?;
                continue;
            }

            let Some(mut latent) = ctx.registry().create_data_by_name(stored) else {
                warn!(
                    "Skipping field {}::{} of unknown class {}",
                    composite.name(),
                    name,
                    stored
                );
                continue;
            };
            self.read_data(&mut *latent, child)?;

            let mut data = self.cache.bind(field, instance);
            let cast = ctx.cast_value(&*latent, &mut *data, DataFlags::SHALLOW);
            self.cache.give(data);
            if !cast {
                cast_failed(ctx, composite, field, stored)?;
            }
        }
        Ok(())
    }
}

impl<'ctx> Archive<'ctx> for ArchiveXml<'ctx> {
    fn context(&self) -> &'ctx ReflectionContext {
        self.ctx
    }

    fn cache(&mut self) -> &mut DataCache {
        &mut self.cache
    }

    fn serialize_components(&mut self, components: &[Box<dyn Data>]) -> ArchiveResult<()> {
        self.begin_block();
        for component in components {
            let class = component.data_class().name();
            self.start_tag(DATA, &[("Type", class.as_str())]);
            component.serialize_xml(self)?;
            self.out.push_str(&format!("</{}>\n", DATA));
        }
        self.end_block();
        Ok(())
    }

    fn deserialize_components(
        &mut self,
        flags: ArchiveFlags,
    ) -> ArchiveResult<Vec<Option<Box<dyn Data>>>> {
        let sparse = flags.contains(ArchiveFlags::SPARSE);
        let parent = self.current()?;
        let mut components = Vec::with_capacity(parent.children.len());
        for child in &parent.children {
            let creator = match child.name.as_str() {
                NULL => None,
                DATA => {
                    let name = child.attribute("Type").unwrap_or_default();
                    let creator = self.ctx.registry().data_creator(name);
                    if creator.is_none() {
                        warn!("Skipping component of unknown class {:?}", name);
                    }
                    creator
                }
                _ => continue,
            };
            let Some(creator) = creator else {
                if sparse {
                    components.push(None);
                }
                continue;
            };

            let mut data = self.cache.take(creator.class, creator.create);
            if let Err(err) = self.read_data(&mut *data, child) {
                self.cache.give(data);
                return Err(err);
            }
            components.push(Some(data));
        }
        Ok(components)
    }

    fn serialize_objects(&mut self, objects: &[Option<ObjectPtr>]) -> ArchiveResult<()> {
        self.begin_block();
        for object in objects {
            self.write_object(object.as_ref())?;
        }
        self.end_block();
        Ok(())
    }

    fn deserialize_objects(&mut self, flags: ArchiveFlags) -> ArchiveResult<Vec<Option<ObjectPtr>>> {
        let sparse = flags.contains(ArchiveFlags::SPARSE);
        let parent = self.current()?;
        let mut objects = Vec::with_capacity(parent.children.len());
        for child in &parent.children {
            let object = match child.name.as_str() {
                NULL => None,
                OBJECT => self.read_object(child)?,
                _ => continue,
            };
            if object.is_some() || sparse {
                objects.push(object);
            }
        }
        Ok(objects)
    }
}

impl std::fmt::Debug for ArchiveXml<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveXml")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("depth", &self.depth)
            .field("elements", &self.elements.len())
            .finish()
    }
}

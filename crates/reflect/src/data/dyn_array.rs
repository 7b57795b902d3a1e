//! Growable arrays of scalars

use std::collections::BTreeSet;

use super::container::{move_down, move_up, quoted_lines, text_lines};
use super::{
    create_with, ArrayContainer, ContainerData, ContainerMut, ContainerRef, Data, DataClass,
    DataFlags, DataPtr, DataValue, Scalar, ScalarKind, SimpleData, TypedData,
};
use crate::archive::{ArchiveBinary, ArchiveError, ArchiveResult, ArchiveXml};

/// Data binding for `Vec<T>`
///
/// Items are written inline rather than as components: binary archives store
/// a count followed by the raw items, XML archives one item per line. String
/// items are quoted inside a CDATA block so surrounding whitespace survives,
/// with line breaks and backslashes escaped.
pub struct DynArrayData<T: Scalar> {
    data: DataPtr<Vec<T>>,
}

impl<T: Scalar> Default for DynArrayData<T> {
    fn default() -> Self {
        Self {
            data: DataPtr::default(),
        }
    }
}

impl<T: Scalar> DynArrayData<T> {
    fn parse_lines(text: &str) -> Option<Vec<T>> {
        if T::KIND == ScalarKind::String {
            return quoted_lines(text)?
                .iter()
                .map(|line| T::parse_text(line))
                .collect();
        }
        text_lines(text).map(T::parse_text).collect()
    }
}

impl<T: Scalar> TypedData for DynArrayData<T> {
    type Value = Vec<T>;

    fn with_value(value: Vec<T>) -> Self {
        Self {
            data: DataPtr::new(value),
        }
    }

    fn value(&self) -> &Vec<T> {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut Vec<T> {
        self.data.get_mut()
    }
}

impl<T: Scalar> DataValue for Vec<T> {
    type Data = DynArrayData<T>;

    fn data_class() -> DataClass {
        DataClass::DynArray(T::KIND)
    }
}

impl<T: Scalar> Data for DynArrayData<T> {
    data_plumbing!();

    fn data_class(&self) -> DataClass {
        DataClass::DynArray(T::KIND)
    }

    fn set(&mut self, src: &dyn Data, _flags: DataFlags) -> bool {
        match src.downcast_ref::<Self>() {
            Some(src) => {
                self.data.set(src.data.get().clone());
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn Data) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|other| other.data.get() == self.data.get())
    }

    fn clone_data(&self) -> Box<dyn Data> {
        Box::new(Self::with_value(self.data.get().clone()))
    }

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let items = self.data.get();
        let stream = archive.stream();
        stream.write_u32(items.len() as u32);
        for item in items {
            item.write_binary(stream);
        }
        Ok(())
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let stream = archive.stream();
        let count = stream.read_count(1)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::read_binary(stream)?);
        }
        self.data.set(items);
        Ok(())
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let items = self.data.get();
        if T::KIND == ScalarKind::String {
            let lines: Vec<String> = items.iter().map(|item| text_of(item)).collect();
            archive.write_quoted_block(&lines);
        } else {
            archive.begin_block();
            for item in items {
                archive.write_line(&text_of(item));
            }
            archive.end_block();
        }
        Ok(())
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let text = archive.current_text()?;
        let items = Self::parse_lines(&text).ok_or_else(|| {
            ArchiveError::data_format(format!("Unable to parse {} items", T::KIND))
        })?;
        self.data.set(items);
        Ok(())
    }

    fn to_text(&self) -> String {
        let lines: Vec<String> = self.data.get().iter().map(|item| text_of(item)).collect();
        lines.join("\n")
    }

    fn from_text(&mut self, text: &str) -> bool {
        let items = if T::KIND == ScalarKind::String {
            text.lines().map(T::parse_text).collect()
        } else {
            text_lines(text).map(T::parse_text).collect()
        };
        match items {
            Some(items) => {
                self.data.set(items);
                true
            }
            None => false,
        }
    }

    fn should_serialize(&self) -> bool {
        !self.data.get().is_empty()
    }

    fn as_container(&self) -> Option<ContainerRef<'_>> {
        Some(ContainerRef::Array(self))
    }

    fn as_container_mut(&mut self) -> Option<ContainerMut<'_>> {
        Some(ContainerMut::Array(self))
    }
}

fn text_of<T: Scalar>(item: &T) -> String {
    let mut out = String::new();
    item.write_text(&mut out);
    out
}

impl<T: Scalar> ContainerData for DynArrayData<T> {
    fn len(&self) -> usize {
        self.data.get().len()
    }

    fn clear(&mut self) {
        self.data.get_mut().clear();
    }
}

impl<T: Scalar> ArrayContainer for DynArrayData<T> {
    fn item_class(&self) -> DataClass {
        DataClass::Scalar(T::KIND)
    }

    fn item(&self, index: usize) -> Option<Box<dyn Data>> {
        self.data.get().get(index).cloned().map(create_with)
    }

    fn set_item(&mut self, index: usize, value: &dyn Data) -> bool {
        let Some(value) = value.downcast_ref::<SimpleData<T>>() else {
            return false;
        };
        match self.data.get_mut().get_mut(index) {
            Some(slot) => {
                *slot = value.get().clone();
                true
            }
            None => false,
        }
    }

    fn insert_item(&mut self, index: usize, value: &dyn Data) -> bool {
        let Some(value) = value.downcast_ref::<SimpleData<T>>() else {
            return false;
        };
        let items = self.data.get_mut();
        if index > items.len() {
            return false;
        }
        items.insert(index, value.get().clone());
        true
    }

    fn remove_item(&mut self, index: usize) -> bool {
        let items = self.data.get_mut();
        if index >= items.len() {
            return false;
        }
        items.remove(index);
        true
    }

    fn resize(&mut self, len: usize) {
        self.data.get_mut().resize(len, T::default());
    }

    fn move_up(&mut self, selected: &mut BTreeSet<usize>) {
        move_up(self.data.get_mut(), selected);
    }

    fn move_down(&mut self, selected: &mut BTreeSet<usize>) {
        move_down(self.data.get_mut(), selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip() {
        let mut data = DynArrayData::with_value(vec![1i32, -2, 3]);
        assert_eq!(data.to_text(), "1\n-2\n3");
        assert!(data.from_text("\n  4\n  5\n"));
        assert_eq!(data.value(), &vec![4, 5]);
        assert!(!data.from_text("4\nfive"));
        assert_eq!(data.value(), &vec![4, 5]);
    }

    #[test]
    fn test_array_container_ops() {
        let mut data = DynArrayData::with_value(vec![10u8, 20, 30]);
        assert!(data.insert_item(1, &SimpleData::with_value(15u8)));
        assert!(!data.insert_item(9, &SimpleData::with_value(1u8)));
        assert!(!data.set_item(0, &SimpleData::with_value(1u16)));
        assert!(data.remove_item(3));
        assert_eq!(data.value(), &vec![10, 15, 20]);

        data.resize(5);
        assert_eq!(data.value(), &vec![10, 15, 20, 0, 0]);
        assert_eq!(data.item(1).map(|d| d.to_text()), Some("15".to_string()));
    }

    #[test]
    fn test_string_lines_keep_whitespace() {
        let parsed = DynArrayData::<String>::parse_lines("\n  \" a \"\n  \"b\"\n").unwrap();
        assert_eq!(parsed, vec![" a ".to_string(), "b".to_string()]);
    }
}

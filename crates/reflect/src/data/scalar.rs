//! Scalar values and their Data binding

use std::fmt;
use std::hash::Hash;

use helium_types::{
    Color3, Color4, Guid, HdrColor3, HdrColor4, Matrix3, Matrix4, Path, Tuid, Vector2, Vector3,
    Vector4,
};

use super::{Data, DataClass, DataFlags, DataPtr, DataValue, ScalarKind, TypedData};
use crate::archive::{ArchiveBinary, ArchiveError, ArchiveResult, ArchiveXml, ByteStream};

/// Binary and text encoding of a value
pub trait Writable {
    fn write_binary(&self, stream: &mut ByteStream);

    fn write_text(&self, out: &mut String);
}

/// Binary and text decoding of a value
pub trait Readable: Sized {
    fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self>;

    /// Parse from text; `None` if the text is not a valid value
    fn parse_text(text: &str) -> Option<Self>;
}

/// A leaf value type with a fixed [`ScalarKind`]
pub trait Scalar:
    Readable + Writable + Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const KIND: ScalarKind;
}

/// Scalars usable as set members and map keys
pub trait Key: Scalar + Eq + Hash + Ord {}

impl<T: Scalar + Eq + Hash + Ord> Key for T {}

macro_rules! impl_primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Writable for $ty {
                fn write_binary(&self, stream: &mut ByteStream) {
                    stream.write_bytes(&self.to_le_bytes());
                }

                fn write_text(&self, out: &mut String) {
                    out.push_str(&self.to_string());
                }
            }

            impl Readable for $ty {
                fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self> {
                    Ok(<$ty>::from_le_bytes(stream.read_array()?))
                }

                fn parse_text(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }

            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;
            }
        )*
    };
}

impl_primitive!(
    u8 => UInt8,
    i8 => Int8,
    u16 => UInt16,
    i16 => Int16,
    u32 => UInt32,
    i32 => Int32,
    u64 => UInt64,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
);

impl Writable for bool {
    fn write_binary(&self, stream: &mut ByteStream) {
        stream.write_u8(u8::from(*self));
    }

    fn write_text(&self, out: &mut String) {
        out.push_str(if *self { "true" } else { "false" });
    }
}

impl Readable for bool {
    fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self> {
        Ok(stream.read_u8()? != 0)
    }

    fn parse_text(text: &str) -> Option<Self> {
        match text.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;
}

impl Writable for String {
    fn write_binary(&self, stream: &mut ByteStream) {
        stream.write_string(self);
    }

    fn write_text(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl Readable for String {
    fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self> {
        stream.read_string()
    }

    // Strings keep surrounding whitespace
    fn parse_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;
}

impl Writable for Path {
    fn write_binary(&self, stream: &mut ByteStream) {
        stream.write_string(self.as_str());
    }

    fn write_text(&self, out: &mut String) {
        out.push_str(self.as_str());
    }
}

impl Readable for Path {
    fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self> {
        Ok(Path::new(stream.read_string()?))
    }

    fn parse_text(text: &str) -> Option<Self> {
        Some(Path::new(text.trim()))
    }
}

impl Scalar for Path {
    const KIND: ScalarKind = ScalarKind::Path;
}

impl Writable for Guid {
    fn write_binary(&self, stream: &mut ByteStream) {
        stream.write_bytes(&self.to_bytes());
    }

    fn write_text(&self, out: &mut String) {
        out.push_str(&self.to_string());
    }
}

impl Readable for Guid {
    fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self> {
        Ok(Guid::from_bytes(stream.read_array()?))
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl Scalar for Guid {
    const KIND: ScalarKind = ScalarKind::Guid;
}

impl Writable for Tuid {
    fn write_binary(&self, stream: &mut ByteStream) {
        stream.write_bytes(&self.0.to_le_bytes());
    }

    fn write_text(&self, out: &mut String) {
        out.push_str(&self.to_string());
    }
}

impl Readable for Tuid {
    fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self> {
        Ok(Tuid(u64::from_le_bytes(stream.read_array()?)))
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl Scalar for Tuid {
    const KIND: ScalarKind = ScalarKind::Tuid;
}

// Fixed runs of f32 components
macro_rules! impl_float_run {
    ($($ty:ident, $n:literal, |$v:ident| $to:expr, |$a:ident| $from:expr);* $(;)?) => {
        $(
            impl Writable for $ty {
                fn write_binary(&self, stream: &mut ByteStream) {
                    let $v = *self;
                    let components: [f32; $n] = $to;
                    for c in components {
                        stream.write_f32(c);
                    }
                }

                fn write_text(&self, out: &mut String) {
                    out.push_str(&self.to_string());
                }
            }

            impl Readable for $ty {
                fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self> {
                    let mut $a = [0f32; $n];
                    for c in $a.iter_mut() {
                        *c = stream.read_f32()?;
                    }
                    Ok($from)
                }

                fn parse_text(text: &str) -> Option<Self> {
                    text.parse().ok()
                }
            }

            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$ty;
            }
        )*
    };
}

impl_float_run!(
    Vector2, 2, |v| v.to_array(), |a| Vector2::from_array(a);
    Vector3, 3, |v| v.to_array(), |a| Vector3::from_array(a);
    Vector4, 4, |v| v.to_array(), |a| Vector4::from_array(a);
    Matrix3, 9, |v| v.m, |a| Matrix3::from_array(a);
    Matrix4, 16, |v| v.m, |a| Matrix4::from_array(a);
    HdrColor3, 3, |v| [v.r, v.g, v.b], |a| HdrColor3::new(a[0], a[1], a[2]);
    HdrColor4, 4, |v| [v.r, v.g, v.b, v.a], |a| HdrColor4::new(a[0], a[1], a[2], a[3]);
);

macro_rules! impl_byte_color {
    ($($ty:ident, $n:literal, [$($field:ident),+]);* $(;)?) => {
        $(
            impl Writable for $ty {
                fn write_binary(&self, stream: &mut ByteStream) {
                    stream.write_bytes(&[$(self.$field),+]);
                }

                fn write_text(&self, out: &mut String) {
                    out.push_str(&self.to_string());
                }
            }

            impl Readable for $ty {
                fn read_binary(stream: &mut ByteStream) -> ArchiveResult<Self> {
                    let bytes: [u8; $n] = stream.read_array()?;
                    let mut channels = bytes.into_iter();
                    Ok($ty {
                        $($field: channels.next().unwrap_or_default()),+
                    })
                }

                fn parse_text(text: &str) -> Option<Self> {
                    text.parse().ok()
                }
            }

            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$ty;
            }
        )*
    };
}

impl_byte_color!(
    Color3, 3, [r, g, b];
    Color4, 4, [r, g, b, a];
);

/// Data binding for a single scalar
#[derive(Default)]
pub struct SimpleData<T: Scalar> {
    data: DataPtr<T>,
}

impl<T: Scalar> SimpleData<T> {
    pub fn get(&self) -> &T {
        self.data.get()
    }

    pub fn set_value(&mut self, value: T) {
        self.data.set(value);
    }
}

impl<T: Scalar> TypedData for SimpleData<T> {
    type Value = T;

    fn with_value(value: T) -> Self {
        Self {
            data: DataPtr::new(value),
        }
    }

    fn value(&self) -> &T {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Scalar> DataValue for T {
    type Data = SimpleData<T>;

    fn data_class() -> DataClass {
        DataClass::Scalar(T::KIND)
    }
}

impl<T: Scalar> Data for SimpleData<T> {
    data_plumbing!();

    fn data_class(&self) -> DataClass {
        DataClass::Scalar(T::KIND)
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
        self.data.get().write_binary(archive.stream());
        Ok(())
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let value = T::read_binary(archive.stream())?;
        self.data.set(value);
        Ok(())
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        archive.write_text(&self.to_text());
        Ok(())
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let text = archive.current_text()?;
        let value = T::parse_text(&text).ok_or_else(|| {
            ArchiveError::data_format(format!("Unable to parse {} from {:?}", T::KIND, text))
        })?;
        self.data.set(value);
        Ok(())
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        self.data.get().write_text(&mut out);
        out
    }

    fn from_text(&mut self, text: &str) -> bool {
        match T::parse_text(text) {
            Some(value) => {
                self.data.set(value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_round_trip<T: Scalar>(value: T) -> T {
        let mut stream = ByteStream::new();
        value.write_binary(&mut stream);
        let mut reader = ByteStream::from_bytes(stream.into_bytes());
        let read = T::read_binary(&mut reader).unwrap();
        assert_eq!(reader.remaining(), 0);
        read
    }

    #[test]
    fn test_binary_encoding_preserves_values() {
        assert_eq!(binary_round_trip(-5i16), -5);
        assert_eq!(binary_round_trip(u64::MAX), u64::MAX);
        assert!(binary_round_trip(true));
        assert_eq!(binary_round_trip("héllo".to_string()), "héllo");
        assert_eq!(binary_round_trip(Tuid(0xDEAD)), Tuid(0xDEAD));
        assert_eq!(binary_round_trip(Color4::new(1, 2, 3, 4)), Color4::new(1, 2, 3, 4));
        assert_eq!(binary_round_trip(Matrix4::IDENTITY), Matrix4::IDENTITY);
    }

    #[test]
    fn test_text_parsing() {
        assert_eq!(i32::parse_text(" -12 "), Some(-12));
        assert_eq!(u8::parse_text("256"), None);
        assert_eq!(bool::parse_text("1"), Some(true));
        assert_eq!(bool::parse_text("yes"), None);
        assert_eq!(String::parse_text("  padded "), Some("  padded ".to_string()));
    }

    #[test]
    fn test_from_text_failure_keeps_value() {
        let mut data = SimpleData::with_value(9u32);
        assert!(!data.from_text("nine"));
        assert_eq!(*data.get(), 9);
    }

    #[test]
    fn test_equals_checks_class() {
        let a = SimpleData::with_value(1u32);
        let b = SimpleData::with_value(1u64);
        assert!(!a.equals(&b));
        assert!(a.equals(&SimpleData::with_value(1u32)));
    }
}

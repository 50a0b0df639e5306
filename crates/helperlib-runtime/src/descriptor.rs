// crates/helperlib-runtime/src/descriptor.rs
//! Type descriptors: byte layout of array elements and structured records.

use crate::object::{HostObject, HostRef, ObjectKind};

/// Element type of an array scalar or a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl ScalarType {
    pub fn size(self) -> usize {
        match self {
            ScalarType::Bool | ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => 4,
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => 8,
            ScalarType::Complex64 => 8,
            ScalarType::Complex128 => 16,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, ScalarType::Complex64 | ScalarType::Complex128)
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int8 => "int8",
            ScalarType::Int16 => "int16",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::UInt8 => "uint8",
            ScalarType::UInt16 => "uint16",
            ScalarType::UInt32 => "uint32",
            ScalarType::UInt64 => "uint64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Complex64 => "complex64",
            ScalarType::Complex128 => "complex128",
        }
    }

    /// Value-preserving cast of one element stored at `data` to the
    /// canonical `[real, imag]` double pair. Narrow components are widened,
    /// never reinterpreted.
    ///
    /// # Safety
    /// `data` must point to at least `self.size()` readable bytes. No
    /// alignment is required.
    pub unsafe fn cast_to_cdouble(self, data: *const u8) -> [f64; 2] {
        unsafe {
            match self {
                ScalarType::Bool => [f64::from(u8::from(data.read() != 0)), 0.0],
                ScalarType::Int8 => [f64::from(data.cast::<i8>().read()), 0.0],
                ScalarType::Int16 => [f64::from(data.cast::<i16>().read_unaligned()), 0.0],
                ScalarType::Int32 => [f64::from(data.cast::<i32>().read_unaligned()), 0.0],
                ScalarType::Int64 => [data.cast::<i64>().read_unaligned() as f64, 0.0],
                ScalarType::UInt8 => [f64::from(data.read()), 0.0],
                ScalarType::UInt16 => [f64::from(data.cast::<u16>().read_unaligned()), 0.0],
                ScalarType::UInt32 => [f64::from(data.cast::<u32>().read_unaligned()), 0.0],
                ScalarType::UInt64 => [data.cast::<u64>().read_unaligned() as f64, 0.0],
                ScalarType::Float32 => [f64::from(data.cast::<f32>().read_unaligned()), 0.0],
                ScalarType::Float64 => [data.cast::<f64>().read_unaligned(), 0.0],
                ScalarType::Complex64 => {
                    let parts = data.cast::<[f32; 2]>().read_unaligned();
                    [f64::from(parts[0]), f64::from(parts[1])]
                }
                ScalarType::Complex128 => data.cast::<[f64; 2]>().read_unaligned(),
            }
        }
    }
}

/// A named field inside a structured layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub offset: usize,
    pub scalar: ScalarType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, offset: usize, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            offset,
            scalar,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.scalar.size()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Scalar(ScalarType),
    Struct {
        fields: Vec<FieldSpec>,
        itemsize: usize,
    },
}

impl Layout {
    /// Structured layout whose item size is the end of the last field.
    pub fn packed(fields: Vec<FieldSpec>) -> Self {
        let itemsize = fields.iter().map(FieldSpec::end).max().unwrap_or(0);
        Layout::Struct { fields, itemsize }
    }

    pub fn itemsize(&self) -> usize {
        match self {
            Layout::Scalar(scalar) => scalar.size(),
            Layout::Struct { itemsize, .. } => *itemsize,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Layout::Struct { .. })
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        match self {
            Layout::Scalar(_) => None,
            Layout::Struct { fields, .. } => fields.iter().find(|f| f.name == name),
        }
    }
}

/// Host object of kind `Descriptor`.
#[repr(C)]
pub struct DescriptorObject {
    pub head: HostObject,
    pub layout: Layout,
    /// Set on descriptors combined with the host's record kind.
    pub is_record: bool,
}

impl DescriptorObject {
    /// Borrow the descriptor behind a host reference, if it is one.
    pub fn from_ref(obj: &HostRef) -> Option<&DescriptorObject> {
        if obj.kind() != ObjectKind::Descriptor {
            return None;
        }
        // SAFETY: kind Descriptor guarantees the DescriptorObject layout, and
        // the reference keeps it alive for the borrow.
        Some(unsafe { &*(obj.as_ptr() as *const DescriptorObject) })
    }
}

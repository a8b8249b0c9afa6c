use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};

use bitflags::bitflags;
use owo_colors::OwoColorize;

use crate::{
    FieldAccessError, InstantiationError, Kind, ObjectRef, RawAccessError, Storage, Value,
};

/// Name of the root reference type every class implicitly extends.
pub const OBJECT: &str = "Object";

/// Size of the machine word sub-word fields are packed into.
pub const WORD_SIZE: usize = 4;

/// Classes live for the whole program, like compiled type descriptors.
pub type ClassRef = &'static Class;

/// A field handle: borrowed from its (leaked) declaring class.
pub type FieldRef = &'static Field;

/// Boxed error returned by constructor bodies.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// The code run by a [`Constructor`] on a freshly zeroed instance.
pub type ConstructorBody = dyn Fn(&mut Init<'_>, &[Value]) -> Result<(), BoxError> + Send + Sync;

bitflags! {
    /// Modifiers of a declared field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u32 {
        /// An empty set of flags
        const EMPTY = 0;

        /// The field belongs to the class, not to instances. It has no offset
        /// and is never part of an instance's layout.
        const STATIC = 1 << 0;

        /// Reflective access to this field is refused by the host policy.
        /// Only raw storage access can reach it.
        const RESTRICTED = 1 << 1;
    }
}

/// A field declared by a class.
///
/// Two fields are equal when they have the same name and the same declaring
/// class, regardless of where they sit in memory.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Field {
    /// Field name, unique within its declaring class
    pub name: &'static str,

    /// Name of the declaring class
    pub declaring: &'static str,

    /// Declared type
    pub kind: Kind,

    /// Modifiers
    pub flags: FieldFlags,

    /// Byte offset inside an instance; `None` for static fields
    pub offset: Option<usize>,
}

impl Field {
    /// Returns true if this is a static field
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldFlags::STATIC)
    }

    /// Returns true if reflective access to this field is refused
    pub fn is_restricted(&self) -> bool {
        self.flags.contains(FieldFlags::RESTRICTED)
    }

    /// Size in bytes of this field's slot
    pub fn size(&self) -> usize {
        self.kind.size()
    }

    /// Where this field lives inside its containing word, for sub-word
    /// instance fields. `None` for static fields and word-or-larger kinds.
    pub fn packed_slot(&self) -> Option<PackedSlot> {
        PackedSlot::locate(self.kind, self.offset?)
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring && self.name == other.name
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring, self.name)
    }
}

/// Location of a sub-word field inside its containing machine word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedSlot {
    /// Offset of the word-aligned containing word
    pub word_offset: usize,
    /// Bit position of the field's least significant bit within the word
    pub shift: u32,
    /// Width of the field in bits
    pub width: u32,
}

impl PackedSlot {
    /// Locates a sub-word slot of `kind` at byte `offset` within its
    /// containing word. `None` for word-or-larger kinds.
    pub fn locate(kind: Kind, offset: usize) -> Option<PackedSlot> {
        kind.is_sub_word().then(|| PackedSlot::within_word(kind.size(), offset))
    }

    /// The slot of `size` bytes at byte `offset`. The slot must not straddle
    /// a word boundary, which holds for any field aligned to its own size.
    pub fn within_word(size: usize, offset: usize) -> PackedSlot {
        let word_offset = offset & !(WORD_SIZE - 1);
        let byte_in_word = offset - word_offset;
        let shift = if cfg!(target_endian = "little") {
            byte_in_word * 8
        } else {
            (WORD_SIZE - size - byte_in_word) * 8
        };
        PackedSlot {
            word_offset,
            shift: shift as u32,
            width: (size * 8) as u32,
        }
    }

    /// Mask selecting exactly this field's bits within the containing word
    pub fn mask(self) -> u32 {
        (((1u64 << self.width) - 1) as u32) << self.shift
    }
}

/// A constructor declared by a class.
pub struct Constructor {
    declaring: &'static str,
    index: usize,
    params: Vec<Kind>,
    body: Arc<ConstructorBody>,
}

impl Constructor {
    /// Name of the declaring class
    pub fn declaring(&self) -> &'static str {
        self.declaring
    }

    /// Declared parameter kinds, in order
    pub fn params(&self) -> &[Kind] {
        &self.params
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl PartialEq for Constructor {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring && self.index == other.index
    }
}

impl fmt::Display for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.declaring)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Write access to an instance while one of its constructors runs.
///
/// Constructors initialize their own class, so the host's access policy does
/// not apply here.
pub struct Init<'a> {
    class: ClassRef,
    storage: &'a mut Storage,
}

impl Init<'_> {
    /// The class being constructed
    pub fn class(&self) -> ClassRef {
        self.class
    }

    fn resolve(&self, name: &str) -> Result<FieldRef, FieldAccessError> {
        match self.class.find_field(name) {
            Some(field) if field.is_static() => Err(FieldAccessError::Static { field }),
            Some(field) => Ok(field),
            None => Err(FieldAccessError::NoSuchField {
                class: self.class,
                name: String::from(name),
            }),
        }
    }

    /// Sets the named field (searched from the class up through its ancestors)
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), FieldAccessError> {
        let field = self.resolve(name)?;
        let value = value.into();
        if !value.is_exactly(field.kind) {
            return Err(FieldAccessError::IllegalArgument {
                field,
                actual: value.value_type(),
            });
        }
        self.storage.write(field, &value)
    }

    /// Reads the named field
    pub fn get(&self, name: &str) -> Result<Value, FieldAccessError> {
        let field = self.resolve(name)?;
        self.storage.read(field)
    }
}

/// Describes a class: its place in the hierarchy, its declared fields and
/// constructors, and the layout of its instances.
pub struct Class {
    name: &'static str,
    superclass: Option<ClassRef>,
    fields: Vec<Field>,
    constructors: Vec<Constructor>,
    /// First byte past the last instance field, before padding
    fields_end: usize,
    /// Padded instance size
    instance_size: usize,
}

impl Class {
    /// Returns a builder for a new class
    pub fn builder(name: &'static str) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// The class name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The direct superclass, or `None` if this class directly extends `Object`
    pub fn superclass(&self) -> Option<ClassRef> {
        self.superclass
    }

    /// Fields declared by this class itself, in declaration order
    pub fn declared_fields(&self) -> &[Field] {
        &self.fields
    }

    /// Constructors declared by this class
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Number of bytes an instance occupies
    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    /// This class followed by each of its ancestors, most derived first
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Returns true if this class is `name`, descends from it, or `name` is
    /// the root `Object` type
    pub fn is_subclass_of(&self, name: &str) -> bool {
        name == OBJECT || self.ancestors().any(|c| c.name == name)
    }

    /// Returns true if `field` is declared by this class or one of its
    /// ancestors
    pub fn has_field(&self, field: &Field) -> bool {
        self.ancestors()
            .any(|c| c.name == field.declaring && c.fields.iter().any(|f| f == field))
    }

    /// The field named `name` declared by this class itself
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The field named `name`, searched from this class up through its
    /// ancestors; the most derived declaration wins
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.ancestors().find_map(|c| c.field(name))
    }

    /// Every instance field of this class and its ancestors, most derived
    /// class first, declaration order within each class
    pub fn instance_fields(&self) -> impl Iterator<Item = &Field> {
        self.ancestors()
            .flat_map(|c| c.fields.iter())
            .filter(|f| !f.is_static())
    }

    /// Allocates zeroed storage laid out for this class without running any
    /// constructor
    pub fn allocate_storage(&self) -> Result<Storage, RawAccessError> {
        Storage::zeroed(self.instance_size)
    }

    /// Allocates a zeroed instance of this class without running any
    /// constructor
    pub fn allocate_zeroed(&'static self) -> Result<ObjectRef, InstantiationError> {
        let storage = self
            .allocate_storage()
            .map_err(|source| InstantiationError::Storage {
                class: self,
                source,
            })?;
        Ok(crate::Object::from_storage(self, storage))
    }

    /// Runs `constructor` with `args` on a freshly zeroed instance.
    ///
    /// Arguments must already be of exactly the declared parameter kinds.
    pub fn instantiate(
        &'static self,
        constructor: &Constructor,
        args: &[Value],
    ) -> Result<ObjectRef, InstantiationError> {
        if constructor.declaring != self.name {
            return Err(InstantiationError::ForeignConstructor {
                class: self,
                declaring: constructor.declaring,
            });
        }
        if constructor.arity() != args.len() {
            return Err(InstantiationError::ArgumentCount {
                class: self,
                expected: constructor.arity(),
                actual: args.len(),
            });
        }
        for (index, (kind, arg)) in constructor.params.iter().zip(args).enumerate() {
            if !arg.is_exactly(*kind) {
                return Err(InstantiationError::IllegalArgument {
                    class: self,
                    index,
                    expected: *kind,
                    actual: arg.value_type(),
                });
            }
        }

        let mut storage = self
            .allocate_storage()
            .map_err(|source| InstantiationError::Storage {
                class: self,
                source,
            })?;
        let mut init = Init {
            class: self,
            storage: &mut storage,
        };
        (constructor.body)(&mut init, args).map_err(|err| InstantiationError::Raised {
            class: self,
            source: Arc::from(err),
        })?;
        Ok(crate::Object::from_storage(self, storage))
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Class {}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.blue())
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("superclass", &self.superclass.map(|c| c.name))
            .field("fields", &self.fields)
            .field("constructors", &self.constructors)
            .field("instance_size", &self.instance_size)
            .finish()
    }
}

/// Iterator over a class and its ancestors
pub struct Ancestors<'a> {
    next: Option<&'a Class>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Class;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.superclass;
        Some(current)
    }
}

struct PendingField {
    name: &'static str,
    kind: Kind,
    flags: FieldFlags,
}

/// Builder for [`Class`]
pub struct ClassBuilder {
    name: &'static str,
    superclass: Option<ClassRef>,
    fields: Vec<PendingField>,
    constructors: Vec<(Vec<Kind>, Arc<ConstructorBody>)>,
}

impl ClassBuilder {
    /// Creates a builder for a class named `name`
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            superclass: None,
            fields: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Sets the direct superclass
    pub fn extends(mut self, superclass: ClassRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Declares an instance field
    pub fn field(self, name: &'static str, kind: Kind) -> Self {
        self.field_with_flags(name, kind, FieldFlags::EMPTY)
    }

    /// Declares a static field
    pub fn static_field(self, name: &'static str, kind: Kind) -> Self {
        self.field_with_flags(name, kind, FieldFlags::STATIC)
    }

    /// Declares a field with explicit modifiers
    pub fn field_with_flags(mut self, name: &'static str, kind: Kind, flags: FieldFlags) -> Self {
        self.fields.push(PendingField { name, kind, flags });
        self
    }

    /// Declares a constructor taking `params`
    pub fn constructor<F>(mut self, params: &[Kind], body: F) -> Self
    where
        F: Fn(&mut Init<'_>, &[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.constructors.push((params.to_vec(), Arc::new(body)));
        self
    }

    /// Lays out the class and leaks it, returning a `'static` handle.
    ///
    /// Instance fields start right after the superclass's fields, widest
    /// first, each aligned to its own size. Sub-word fields of a subclass may
    /// therefore share a machine word with fields of its superclass.
    pub fn build(self) -> Result<ClassRef, ClassError> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ClassError::DuplicateField {
                    class: self.name,
                    field: field.name,
                });
            }
        }
        if self.name == OBJECT {
            return Err(ClassError::ReservedName { class: self.name });
        }

        let mut cursor = self.superclass.map_or(0, |s| s.fields_end);
        let mut offsets: Vec<Option<usize>> = alloc::vec![None; self.fields.len()];

        let mut order: Vec<usize> = (0..self.fields.len())
            .filter(|&i| !self.fields[i].flags.contains(FieldFlags::STATIC))
            .collect();
        // stable: declaration order is kept among fields of equal size
        order.sort_by_key(|&i| core::cmp::Reverse(self.fields[i].kind.size()));

        for i in order {
            let size = self.fields[i].kind.size();
            cursor = cursor.next_multiple_of(size);
            offsets[i] = Some(cursor);
            cursor += size;
        }

        let fields = self
            .fields
            .into_iter()
            .zip(offsets)
            .map(|(pending, offset)| Field {
                name: pending.name,
                declaring: self.name,
                kind: pending.kind,
                flags: pending.flags,
                offset,
            })
            .collect();

        let constructors = self
            .constructors
            .into_iter()
            .enumerate()
            .map(|(index, (params, body))| Constructor {
                declaring: self.name,
                index,
                params,
                body,
            })
            .collect();

        let class = Class {
            name: self.name,
            superclass: self.superclass,
            fields,
            constructors,
            fields_end: cursor,
            instance_size: cursor.next_multiple_of(crate::raw::BLOCK_ALIGN),
        };
        Ok(Box::leak(Box::new(class)))
    }
}

/// A class description was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClassError {
    /// Two fields of one class share a name
    DuplicateField {
        /// Class being built
        class: &'static str,
        /// Repeated field name
        field: &'static str,
    },
    /// The name of the root type cannot be reused
    ReservedName {
        /// Rejected name
        class: &'static str,
    },
}

impl fmt::Display for ClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassError::DuplicateField { class, field } => write!(
                f,
                "Class {} declares field {} more than once",
                class.blue(),
                field.yellow()
            ),
            ClassError::ReservedName { class } => {
                write!(f, "{} is the name of the root type", class.red())
            }
        }
    }
}

impl core::error::Error for ClassError {}

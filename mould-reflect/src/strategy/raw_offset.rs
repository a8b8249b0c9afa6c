use core::fmt;

use mould_core::{
    ClassRef, FieldRef, InstantiationError, Object, ObjectRef, Storage, Value,
};

use super::{DirectCodec, FieldCodec, PackedCodec};
use crate::{BuildError, Builder, Phase, Strategy, trace};

/// What raw storage accesses the platform supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Native loads and stores of every width, floats included
    Native,
    /// Word-or-larger integer loads and stores only
    WordOnly,
}

impl Platform {
    /// The platform this program was compiled for. Android's raw access is
    /// word-only; everything else is native.
    pub fn host() -> Self {
        if cfg!(target_os = "android") {
            Platform::WordOnly
        } else {
            Platform::Native
        }
    }

    /// The codec that reads and writes fields on this platform
    pub fn codec(self) -> &'static dyn FieldCodec {
        match self {
            Platform::Native => &DirectCodec,
            Platform::WordOnly => &PackedCodec,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Native => f.write_str("native"),
            Platform::WordOnly => f.write_str("word-only"),
        }
    }
}

/// Writes recorded values straight into freshly allocated storage.
#[derive(Debug)]
pub struct RawOffset {
    platform: Platform,
    codec: &'static dyn FieldCodec,
}

impl RawOffset {
    /// The platform the codec was picked for
    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn offset(field: FieldRef) -> Result<usize, BuildError> {
        field.offset.ok_or(BuildError::StaticField { field })
    }
}

impl Strategy for RawOffset {
    type Binding = ();
    type Draft = Storage;

    fn allows_type_punning(&self) -> bool {
        true
    }

    fn check_access(&self, _field: FieldRef, _phase: Phase) -> Result<(), BuildError> {
        Ok(())
    }

    fn read_field(&self, source: &Object, field: FieldRef) -> Result<Value, BuildError> {
        let offset = Self::offset(field)?;
        let storage = source.lock();
        self.codec
            .read(&storage, field.kind, offset)
            .map_err(|err| BuildError::RawAccess { field, source: err })
    }

    fn allocate(&self, class: ClassRef, _binding: &()) -> Result<Storage, BuildError> {
        trace!("Allocating {} raw bytes for {}", class.instance_size(), class);
        class.allocate_storage().map_err(|source| BuildError::InstantiationFailure {
            class,
            cause: InstantiationError::Storage { class, source },
        })
    }

    fn commit(&self, draft: &mut Storage, field: FieldRef, value: &Value) -> Result<(), BuildError> {
        let offset = Self::offset(field)?;
        self.codec
            .write(draft, field.kind, offset, value)
            .map_err(|source| BuildError::RawAccess { field, source })
    }

    fn finish(&self, class: ClassRef, draft: Storage) -> ObjectRef {
        Object::from_storage(class, draft)
    }
}

/// Builds without running any constructor or honoring access restrictions,
/// by writing recorded values at their fields' byte offsets.
///
/// Fields of unrelated classes are accepted when the target class has a
/// field of the same name, size and compatible kind at the same offset.
pub type RawOffsetBuilder = Builder<RawOffset>;

impl Builder<RawOffset> {
    /// Creates a raw-offset builder for the host platform.
    pub fn new(class: ClassRef) -> Self {
        Self::with_platform(class, Platform::host())
    }

    /// Creates a raw-offset builder that accesses storage as `platform`
    /// allows.
    pub fn with_platform(class: ClassRef, platform: Platform) -> Self {
        trace!("Raw builder for {} on a {} platform", class, platform);
        let strategy = RawOffset {
            platform,
            codec: platform.codec(),
        };
        Self::from_parts(class, strategy, ())
    }

    /// The platform this builder accesses storage as
    pub fn platform(&self) -> Platform {
        self.strategy.platform
    }
}

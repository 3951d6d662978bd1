//! Typed keys: a literal store identifier plus the value type and default
//! that go with it.
//!
//! There are two key types, split on optionality:
//!
//! - [`Key<T>`] always resolves to a `T`. It cannot be built without a
//!   default, either explicit ([`Key::new`]) or the type's own
//!   ([`Key::with_type_default`], only for [`DefaultValue`] types).
//! - [`OptionalKey<T>`] resolves to `Option<T>`, with an optional explicit
//!   default. Writing `None` through it removes the entry.
//!
//! Both implement [`TypedKey`], which is what accessors are generic over.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use typed_defaults_core::RawValue;

use crate::bridge::{ArrayBridge, DefaultsBridge};

/// Types with a natural "nothing set yet" value.
///
/// Dates and URLs deliberately have none: a key of those types needs an
/// explicit default or must be optional.
///
/// ```compile_fail
/// use typed_defaults::Key;
///
/// let key: Key<typed_defaults::Url> = Key::with_type_default("homepage");
/// ```
pub trait DefaultValue {
    fn type_default() -> Self;
}

macro_rules! default_value {
    ($($ty:ty => $value:expr),+ $(,)?) => {$(
        impl DefaultValue for $ty {
            fn type_default() -> Self {
                $value
            }
        }
    )+};
}

default_value! {
    String => String::new(),
    i64 => 0,
    i32 => 0,
    u32 => 0,
    u64 => 0,
    f64 => 0.0,
    f32 => 0.0,
    bool => false,
    Bytes => Bytes::new(),
    BTreeMap<String, RawValue> => BTreeMap::new(),
}

impl<T: ArrayBridge> DefaultValue for Vec<T> {
    fn type_default() -> Self {
        Vec::new()
    }
}

/// What every key exposes regardless of its value type.
///
/// This trait is object-safe, so heterogeneous keys can be listed together
/// as `&dyn AnyKey` (for registering defaults or choosing keys to sync).
pub trait AnyKey {
    /// The literal store identifier.
    fn identifier(&self) -> &str;

    fn is_optional(&self) -> bool;

    /// The key's default in stored form, if it has one.
    fn default_raw(&self) -> Option<RawValue>;
}

/// A key whose value type is known.
pub trait TypedKey: AnyKey {
    /// The bridged value type.
    type Value: DefaultsBridge;

    /// What a read resolves to: `Value` for [`Key`], `Option<Value>` for
    /// [`OptionalKey`].
    type Output;

    /// The declared default, if any.
    fn default_value(&self) -> Option<&Self::Value>;

    /// Apply the default chain to a decoded value.
    fn resolve(&self, decoded: Option<Self::Value>) -> Self::Output;

    /// The value to store for `output`; `None` means remove.
    fn stored(output: &Self::Output) -> Option<&Self::Value>;

    /// A decoded value, else the declared default.
    fn fallback(&self, decoded: Option<Self::Value>) -> Option<Self::Value> {
        decoded.or_else(|| self.default_value().cloned())
    }
}

fn encode_default<T: DefaultsBridge>(identifier: &str, value: &T) -> Option<RawValue> {
    match value.serialize() {
        Ok(raw) => Some(raw),
        Err(e) => {
            log::warn!("Cannot encode default for '{}': {}", identifier, e);
            None
        }
    }
}

/// A key that always resolves to a value.
///
/// # Example
///
/// ```rust
/// use typed_defaults::Key;
///
/// let launch_count: Key<i64> = Key::with_type_default("launchCount");
/// assert_eq!(launch_count.identifier(), "launchCount");
/// assert_eq!(*launch_count.default(), 0);
///
/// let theme = Key::new("theme", "light".to_string());
/// assert_eq!(theme.default(), "light");
/// ```
#[derive(Clone)]
pub struct Key<T> {
    identifier: Cow<'static, str>,
    default: T,
}

impl<T: DefaultsBridge> Key<T> {
    /// A key with an explicit default.
    pub fn new(identifier: impl Into<Cow<'static, str>>, default: T) -> Self {
        Key {
            identifier: identifier.into(),
            default,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn default(&self) -> &T {
        &self.default
    }
}

impl<T: DefaultsBridge + DefaultValue> Key<T> {
    /// A key defaulting to the type's own default (`""`, `0`, `false`, ...).
    pub fn with_type_default(identifier: impl Into<Cow<'static, str>>) -> Self {
        Self::new(identifier, T::type_default())
    }
}

impl<T: DefaultsBridge> AnyKey for Key<T> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn is_optional(&self) -> bool {
        false
    }

    fn default_raw(&self) -> Option<RawValue> {
        encode_default(&self.identifier, &self.default)
    }
}

impl<T: DefaultsBridge> TypedKey for Key<T> {
    type Value = T;
    type Output = T;

    fn default_value(&self) -> Option<&T> {
        Some(&self.default)
    }

    fn resolve(&self, decoded: Option<T>) -> T {
        decoded.unwrap_or_else(|| self.default.clone())
    }

    fn stored(output: &T) -> Option<&T> {
        Some(output)
    }
}

impl<T: fmt::Debug> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("identifier", &self.identifier)
            .field("default", &self.default)
            .finish()
    }
}

/// A key that may resolve to nothing.
///
/// # Example
///
/// ```rust
/// use typed_defaults::OptionalKey;
///
/// let nickname: OptionalKey<String> = OptionalKey::new("nickname");
/// assert!(nickname.default().is_none());
///
/// let volume = OptionalKey::with_default("volume", 0.5f64);
/// assert_eq!(volume.default(), Some(&0.5));
/// ```
#[derive(Clone)]
pub struct OptionalKey<T> {
    identifier: Cow<'static, str>,
    default: Option<T>,
}

impl<T: DefaultsBridge> OptionalKey<T> {
    /// An optional key with no default.
    pub fn new(identifier: impl Into<Cow<'static, str>>) -> Self {
        OptionalKey {
            identifier: identifier.into(),
            default: None,
        }
    }

    /// An optional key that reads as `Some(default)` when nothing is stored.
    pub fn with_default(identifier: impl Into<Cow<'static, str>>, default: T) -> Self {
        OptionalKey {
            identifier: identifier.into(),
            default: Some(default),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn default(&self) -> Option<&T> {
        self.default.as_ref()
    }
}

impl<T: DefaultsBridge> AnyKey for OptionalKey<T> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn default_raw(&self) -> Option<RawValue> {
        self.default
            .as_ref()
            .and_then(|d| encode_default(&self.identifier, d))
    }
}

impl<T: DefaultsBridge> TypedKey for OptionalKey<T> {
    type Value = T;
    type Output = Option<T>;

    fn default_value(&self) -> Option<&T> {
        self.default.as_ref()
    }

    fn resolve(&self, decoded: Option<T>) -> Option<T> {
        self.fallback(decoded)
    }

    fn stored(output: &Option<T>) -> Option<&T> {
        output.as_ref()
    }
}

impl<T: fmt::Debug> fmt::Debug for OptionalKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionalKey")
            .field("identifier", &self.identifier)
            .field("default", &self.default)
            .finish()
    }
}

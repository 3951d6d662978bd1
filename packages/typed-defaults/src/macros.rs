//! Declarative helpers: key namespaces and opt-in bridges.

/// Declare a struct of named keys.
///
/// Each field is `name: Key<T>` or `name: OptionalKey<T>`, then `=` and the
/// store identifier, then optionally `=>` and an explicit default. A
/// `Key<T>` without an explicit default uses the type's own default, so `T`
/// must implement [`DefaultValue`](crate::DefaultValue).
///
/// The struct gets a `Default` impl that builds every key, and an
/// `all_keys()` listing for bulk operations such as registering defaults.
///
/// ```rust
/// use typed_defaults::define_keys;
///
/// define_keys! {
///     /// Keys used by the settings screen.
///     pub struct SettingsKeys {
///         launch_count: Key<i64> = "launchCount",
///         theme: Key<String> = "theme" => "light".to_string(),
///         nickname: OptionalKey<String> = "nickname",
///         volume: OptionalKey<f64> = "volume" => 0.5,
///     }
/// }
///
/// let keys = SettingsKeys::default();
/// assert_eq!(keys.theme.identifier(), "theme");
/// assert_eq!(keys.all_keys().len(), 4);
/// ```
#[macro_export]
macro_rules! define_keys {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $kind:ident<$value:ty> = $identifier:literal $(=> $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $crate::$kind<$value>,
            )*
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                $name {
                    $(
                        $field: $crate::__key_constructor!($kind, $identifier $(, $default)?),
                    )*
                }
            }
        }

        impl $name {
            /// Every key in this namespace, in declaration order.
            #[allow(dead_code)]
            pub fn all_keys(&self) -> ::std::vec::Vec<&dyn $crate::AnyKey> {
                ::std::vec![$(&self.$field as &dyn $crate::AnyKey),*]
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __key_constructor {
    (Key, $identifier:literal) => {
        $crate::Key::with_type_default($identifier)
    };
    (Key, $identifier:literal, $default:expr) => {
        $crate::Key::new($identifier, $default)
    };
    (OptionalKey, $identifier:literal) => {
        $crate::OptionalKey::new($identifier)
    };
    (OptionalKey, $identifier:literal, $default:expr) => {
        $crate::OptionalKey::with_default($identifier, $default)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __blob_bridge {
    ($codec:ty, $($ty:ty),+) => {$(
        impl $crate::DefaultsBridge for $ty {
            fn deserialize(raw: &$crate::RawValue) -> ::core::option::Option<Self> {
                $crate::bridge::decode_blob::<$codec, Self>(raw)
            }

            fn serialize(&self) -> ::core::result::Result<$crate::RawValue, $crate::Error> {
                $crate::bridge::encode_blob::<$codec, Self>(self)
            }
        }

        impl $crate::ArrayBridge for $ty {
            fn deserialize_array(
                raw: &$crate::RawValue,
            ) -> ::core::option::Option<::std::vec::Vec<Self>> {
                $crate::bridge::decode_blob::<$codec, ::std::vec::Vec<Self>>(raw)
            }

            fn serialize_array(
                values: &[Self],
            ) -> ::core::result::Result<$crate::RawValue, $crate::Error> {
                $crate::bridge::encode_blob::<$codec, [Self]>(values)
            }
        }
    )+};
}

/// Store a serde type as a JSON blob.
///
/// Arrays of the type are stored as one blob holding a JSON array. Blobs
/// that fail to decode read as `None`, so reads fall back to the key's
/// default.
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use typed_defaults::{impl_codable_bridge, DefaultsBridge, RawValue};
///
/// #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// struct Frog {
///     name: String,
/// }
///
/// impl_codable_bridge!(Frog);
///
/// let frog = Frog { name: "Froggy".to_string() };
/// let raw = DefaultsBridge::serialize(&frog).unwrap();
/// assert!(matches!(raw, RawValue::Bytes(_)));
/// assert_eq!(<Frog as DefaultsBridge>::deserialize(&raw), Some(frog));
/// ```
#[macro_export]
macro_rules! impl_codable_bridge {
    ($($ty:ty),+ $(,)?) => {
        $crate::__blob_bridge!($crate::JsonCodec, $($ty),+);
    };
}

/// Store a serde type as an archived binary blob.
///
/// Use this for object graphs that are not meant to be read by anything but
/// this library. Arrays are archived as one blob.
#[macro_export]
macro_rules! impl_archived_bridge {
    ($($ty:ty),+ $(,)?) => {
        $crate::__blob_bridge!($crate::ArchiveCodec, $($ty),+);
    };
}

/// Store a [`RawRepresentable`](crate::RawRepresentable) type as its raw
/// value.
///
/// Raw values with no matching variant read as `None`. Arrays are stored
/// as arrays of raw values; unknown entries are skipped on read.
///
/// ```rust
/// use typed_defaults::{impl_raw_representable_bridge, DefaultsBridge, RawRepresentable, RawValue};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Theme {
///     Light,
///     Dark,
/// }
///
/// impl RawRepresentable for Theme {
///     type Raw = String;
///
///     fn raw_value(&self) -> String {
///         match self {
///             Theme::Light => "light".to_string(),
///             Theme::Dark => "dark".to_string(),
///         }
///     }
///
///     fn from_raw_value(raw: String) -> Option<Self> {
///         match raw.as_str() {
///             "light" => Some(Theme::Light),
///             "dark" => Some(Theme::Dark),
///             _ => None,
///         }
///     }
/// }
///
/// impl_raw_representable_bridge!(Theme);
///
/// assert_eq!(DefaultsBridge::serialize(&Theme::Dark).unwrap(), RawValue::from("dark"));
/// assert_eq!(<Theme as DefaultsBridge>::deserialize(&RawValue::from("sepia")), None);
/// ```
#[macro_export]
macro_rules! impl_raw_representable_bridge {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::DefaultsBridge for $ty {
            fn deserialize(raw: &$crate::RawValue) -> ::core::option::Option<Self> {
                <<$ty as $crate::RawRepresentable>::Raw as $crate::DefaultsBridge>::deserialize(raw)
                    .and_then(<$ty as $crate::RawRepresentable>::from_raw_value)
            }

            fn serialize(&self) -> ::core::result::Result<$crate::RawValue, $crate::Error> {
                $crate::DefaultsBridge::serialize(&$crate::RawRepresentable::raw_value(self))
            }
        }

        impl $crate::ArrayBridge for $ty {
            fn deserialize_array(
                raw: &$crate::RawValue,
            ) -> ::core::option::Option<::std::vec::Vec<Self>> {
                ::core::option::Option::Some(
                    raw.as_array()?
                        .iter()
                        .filter_map(<Self as $crate::DefaultsBridge>::deserialize)
                        .collect(),
                )
            }
        }
    )+};
}

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use typed_defaults_core::{
    ChangeCallback, ChangeListener, DefaultsStore, Error, ObserveOptions, ObserverToken, RawValue,
};
use typed_defaults_serde::{document_from_json, document_to_json};

use crate::domain::{read_lock, write_lock, Domain, Entries};

/// How a [`JsonFileStore`] writes its suite file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonFileStoreOptions {
    /// Indent the JSON document.
    pub pretty: bool,
    /// Create missing parent directories on open.
    pub create_dirs: bool,
}

impl Default for JsonFileStoreOptions {
    fn default() -> Self {
        JsonFileStoreOptions {
            pretty: true,
            create_dirs: true,
        }
    }
}

impl JsonFileStoreOptions {
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }
}

/// A persistent preferences store backed by one JSON file per suite.
///
/// The whole document is loaded on open and rewritten on every write. The
/// rewrite goes to a sibling temporary file which is then renamed over the
/// suite file, so a crash never leaves a half-written document behind.
///
/// # Example
///
/// ```rust
/// use typed_defaults_json_store::JsonFileStore;
/// use typed_defaults_core::{DefaultsStore, RawValue};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = JsonFileStore::for_suite(dir.path(), "com.example.app").unwrap();
/// store.set_raw("launchCount", Some(RawValue::Integer(1))).unwrap();
///
/// let reopened = JsonFileStore::for_suite(dir.path(), "com.example.app").unwrap();
/// assert_eq!(reopened.get_raw("launchCount").unwrap(), Some(RawValue::Integer(1)));
/// ```
pub struct JsonFileStore {
    path: PathBuf,
    options: JsonFileStoreOptions,
    domain: Domain,
}

impl JsonFileStore {
    /// Open (or create) the store file at `path` with default options.
    pub fn open(path: impl Into<PathBuf>) -> Result<JsonFileStore, Error> {
        Self::open_with(path, JsonFileStoreOptions::default())
    }

    pub fn open_with(
        path: impl Into<PathBuf>,
        options: JsonFileStoreOptions,
    ) -> Result<JsonFileStore, Error> {
        let path = path.into();

        if path.is_dir() {
            return Err(Error::InvalidLocation {
                path,
                message: "store path is a directory".to_string(),
            });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                if options.create_dirs {
                    fs::create_dir_all(parent)?;
                } else {
                    return Err(Error::InvalidLocation {
                        path,
                        message: "parent directory does not exist".to_string(),
                    });
                }
            }
        }

        let entries = Self::load(&path)?;
        log::debug!(
            "Opened {} with {} entries",
            path.display(),
            entries.len()
        );

        Ok(JsonFileStore {
            path,
            options,
            domain: Domain::with_entries(entries),
        })
    }

    /// Open the store for `suite` inside `dir`: `<dir>/<suite>.json`.
    pub fn for_suite(dir: impl AsRef<Path>, suite: &str) -> Result<JsonFileStore, Error> {
        if suite.is_empty() || suite.contains(&['/', '\\'][..]) || suite.starts_with('.') {
            return Err(Error::InvalidLocation {
                path: dir.as_ref().to_path_buf(),
                message: format!("invalid suite name '{}'", suite),
            });
        }
        Self::open(dir.as_ref().join(format!("{}.json", suite)))
    }

    /// Open the conventional per-user store for `suite`, under the
    /// platform configuration directory.
    ///
    /// Applications that want a single process-wide store open this once
    /// and share the `Arc`.
    pub fn standard(suite: &str) -> Result<JsonFileStore, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| Error::InvalidLocation {
            path: PathBuf::new(),
            message: "no configuration directory for this user".to_string(),
        })?;
        Self::for_suite(config_dir.join("typed-defaults"), suite)
    }

    /// The suite file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of per-key observers registered for `identifier`.
    pub fn observer_count(&self, identifier: &str) -> usize {
        self.domain.hub().observer_count(identifier)
    }

    /// Re-read the suite file, replacing the in-memory entries.
    ///
    /// Observers are not notified for differences picked up this way.
    pub fn reload(&self) -> Result<(), Error> {
        let entries = Self::load(&self.path)?;
        *write_lock(self.domain.entries())? = entries;
        Ok(())
    }

    fn load(path: &Path) -> Result<Entries, Error> {
        log::debug!("Reading {}...", path.display());
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| Error::decode("json", e))?;
        document_from_json(json)
    }

    fn persist(path: &Path, pretty: bool, entries: &Entries) -> Result<(), Error> {
        let json = document_to_json(entries)?;
        let text = if pretty {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        }
        .map_err(|e| Error::encode("json", e))?;

        log::debug!("Writing {}...", path.display());

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

impl DefaultsStore for JsonFileStore {
    fn get_raw(&self, identifier: &str) -> Result<Option<RawValue>, Error> {
        self.domain.get(identifier)
    }

    fn set_raw(&self, identifier: &str, value: Option<RawValue>) -> Result<(), Error> {
        let path = &self.path;
        let pretty = self.options.pretty;
        self.domain
            .set(identifier, value, |entries| Self::persist(path, pretty, entries))
    }

    fn identifiers(&self) -> Result<BTreeSet<String>, Error> {
        self.domain.identifiers()
    }

    fn register_defaults(&self, defaults: BTreeMap<String, RawValue>) -> Result<(), Error> {
        self.domain.register(defaults)
    }

    fn add_observer(
        &self,
        identifier: &str,
        options: ObserveOptions,
        callback: ChangeCallback,
    ) -> Result<ObserverToken, Error> {
        self.domain.add_observer(identifier, options, callback)
    }

    fn add_change_listener(&self, listener: ChangeListener) -> Result<ObserverToken, Error> {
        Ok(self.domain.add_listener(listener))
    }

    fn remove_observer(&self, token: ObserverToken) {
        self.domain.remove_observer(token)
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = read_lock(self.domain.entries()).map(|e| e.len()).unwrap_or(0);
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("entries", &entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;
    use typed_defaults_core::Bytes;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("prefs.json")).unwrap();
        assert!(store.identifiers().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn values_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set_raw("name", Some(RawValue::from("frog"))).unwrap();
            store
                .set_raw("blob", Some(RawValue::Bytes(Bytes::from_static(b"\x00\x01"))))
                .unwrap();
            store
                .set_raw("scores", Some(RawValue::from(vec![1i64, 2, 3])))
                .unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_raw("name").unwrap(), Some(RawValue::from("frog")));
        assert_eq!(
            reopened.get_raw("blob").unwrap(),
            Some(RawValue::Bytes(Bytes::from_static(b"\x00\x01")))
        );
        assert_eq!(
            reopened.get_raw("scores").unwrap(),
            Some(RawValue::from(vec![1i64, 2, 3]))
        );
    }

    #[test]
    fn removal_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set_raw("k", Some(RawValue::Integer(1))).unwrap();
        store.set_raw("k", None).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_raw("k").unwrap(), None);
    }

    #[test]
    fn registered_defaults_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = JsonFileStore::open(&path).unwrap();
        store
            .register_defaults(btree! { "volume".to_string() => RawValue::Float(0.5) })
            .unwrap();
        store.set_raw("other", Some(RawValue::Bool(true))).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("volume"));
        assert_eq!(store.get_raw("volume").unwrap(), Some(RawValue::Float(0.5)));
    }

    #[test]
    fn file_format_is_tagged_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store =
            JsonFileStore::open_with(&path, JsonFileStoreOptions::default().pretty(false)).unwrap();
        store
            .set_raw("blob", Some(RawValue::Bytes(Bytes::from_static(&[1, 2, 3, 4]))))
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, r#"{"blob":{"$bytes":"AQIDBA=="}}"#);
    }

    #[test]
    fn for_suite_names_file_after_suite() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::for_suite(dir.path(), "group.frogs").unwrap();
        assert_eq!(store.path(), dir.path().join("group.frogs.json"));
    }

    #[test]
    fn for_suite_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonFileStore::for_suite(dir.path(), "../escape").is_err());
        assert!(JsonFileStore::for_suite(dir.path(), "").is_err());
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("prefs.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set_raw("k", Some(RawValue::Integer(1))).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_directories_rejected_without_create_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("prefs.json");
        let result =
            JsonFileStore::open_with(&path, JsonFileStoreOptions::default().create_dirs(false));
        assert!(matches!(result, Err(Error::InvalidLocation { .. })));
    }

    #[test]
    fn directory_path_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let result = JsonFileStore::open(dir.path());
        assert!(matches!(result, Err(Error::InvalidLocation { .. })));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{not json").unwrap();
        let result = JsonFileStore::open(&path);
        assert!(matches!(result, Err(Error::Decode { kind: "json", .. })));
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set_raw("k", Some(RawValue::Integer(1))).unwrap();

        fs::write(&path, r#"{"k": 2}"#).unwrap();
        store.reload().unwrap();
        assert_eq!(store.get_raw("k").unwrap(), Some(RawValue::Integer(2)));
    }
}

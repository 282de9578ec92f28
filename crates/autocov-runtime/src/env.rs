use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Values of the invoking process's environment, captured once per run.
///
/// Overlays are always computed from a snapshot instead of reading the live
/// process environment, so the harness never has to mutate it. Values are
/// kept as raw `OsString`s; nothing is dropped for not being UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get_os(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    /// UTF-8 view of a variable; `None` when unset or not valid UTF-8.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_os(key).and_then(OsStr::to_str)
    }
}

/// Variables set on a child process on top of the inherited environment.
///
/// Every builder method preserves the snapshot's existing value for the
/// variable it touches, byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    vars: BTreeMap<String, OsString>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to its existing value followed by `parts`, space separated.
    #[must_use]
    pub fn with_appended<S: AsRef<OsStr>>(
        mut self,
        key: &str,
        base: &EnvSnapshot,
        parts: &[S],
    ) -> Self {
        let mut value = self.current(key, base).unwrap_or_default();
        for part in parts.iter().map(AsRef::<OsStr>::as_ref) {
            if part.is_empty() {
                continue;
            }
            if !value.is_empty() {
                value.push(" ");
            }
            value.push(part);
        }
        self.vars.insert(key.to_owned(), value);
        self
    }

    /// Set `key` to `entry` followed by its existing value, colon separated.
    ///
    /// An unset or empty existing value does not leave a trailing `:`, which
    /// the dynamic loader would read as the current directory.
    #[must_use]
    pub fn with_prepended_path(mut self, key: &str, base: &EnvSnapshot, entry: &Path) -> Self {
        let mut value = entry.as_os_str().to_owned();
        if let Some(existing) = self.current(key, base).filter(|v| !v.is_empty()) {
            value.push(":");
            value.push(existing);
        }
        self.vars.insert(key.to_owned(), value);
        self
    }

    pub fn get_os(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(key).map(OsString::as_os_str)
    }

    /// UTF-8 view of a variable; `None` when unset or not valid UTF-8.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_os(key).and_then(OsStr::to_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_os_str()))
    }

    // A value already in the overlay takes precedence over the snapshot, so
    // chained builders stack instead of clobbering each other.
    fn current(&self, key: &str, base: &EnvSnapshot) -> Option<OsString> {
        self.get_os(key)
            .or_else(|| base.get_os(key))
            .map(OsStr::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    #[test]
    fn append_keeps_existing_value_first() {
        let base = EnvSnapshot::from_pairs([("CFLAGS", "-O2 -g")]);
        let overlay = EnvOverlay::new().with_appended("CFLAGS", &base, &["-fvisibility=default"]);
        assert_eq!(overlay.get("CFLAGS"), Some("-O2 -g -fvisibility=default"));
    }

    #[test]
    fn append_without_existing_has_no_leading_space() {
        let overlay =
            EnvOverlay::new().with_appended("CFLAGS", &EnvSnapshot::default(), &["-a", "-b"]);
        assert_eq!(overlay.get("CFLAGS"), Some("-a -b"));
    }

    #[test]
    fn prepend_keeps_existing_path() {
        let base = EnvSnapshot::from_pairs([("LD_LIBRARY_PATH", "/opt/lib:/usr/local/lib")]);
        let overlay = EnvOverlay::new().with_prepended_path(
            "LD_LIBRARY_PATH",
            &base,
            Path::new("/tmp/build/lib"),
        );
        assert_eq!(
            overlay.get("LD_LIBRARY_PATH"),
            Some("/tmp/build/lib:/opt/lib:/usr/local/lib")
        );
    }

    #[test]
    fn prepend_without_existing_has_no_trailing_colon() {
        let base = EnvSnapshot::from_pairs([("LD_LIBRARY_PATH", "")]);
        let overlay = EnvOverlay::new().with_prepended_path(
            "LD_LIBRARY_PATH",
            &base,
            Path::new("/tmp/build/lib"),
        );
        assert_eq!(overlay.get("LD_LIBRARY_PATH"), Some("/tmp/build/lib"));
    }

    #[test]
    fn chained_appends_stack() {
        let base = EnvSnapshot::from_pairs([("CFLAGS", "-O0")]);
        let overlay = EnvOverlay::new()
            .with_appended("CFLAGS", &base, &["-a"])
            .with_appended("CFLAGS", &base, &["-b"]);
        assert_eq!(overlay.get("CFLAGS"), Some("-O0 -a -b"));
    }

    #[test]
    fn non_utf8_flags_survive_append() {
        let caller = OsString::from_vec(b"-I/opt/caf\xe9 -O2".to_vec());
        let base = EnvSnapshot::from_pairs([("CFLAGS", caller)]);
        let overlay = EnvOverlay::new().with_appended("CFLAGS", &base, &["-fvisibility=default"]);

        let value = overlay.get_os("CFLAGS").unwrap().as_bytes();
        assert_eq!(value, b"-I/opt/caf\xe9 -O2 -fvisibility=default");
        assert_eq!(overlay.get("CFLAGS"), None);
    }

    #[test]
    fn non_utf8_library_path_survives_prepend() {
        let caller = OsString::from_vec(b"/opt/\xff/lib".to_vec());
        let base = EnvSnapshot::from_pairs([("LD_LIBRARY_PATH", caller)]);
        let overlay = EnvOverlay::new().with_prepended_path(
            "LD_LIBRARY_PATH",
            &base,
            Path::new("/tmp/build/lib"),
        );

        let value = overlay.get_os("LD_LIBRARY_PATH").unwrap().as_bytes();
        assert_eq!(value, b"/tmp/build/lib:/opt/\xff/lib");
    }

    #[test]
    fn snapshot_is_not_modified_by_overlay() {
        let base = EnvSnapshot::from_pairs([("CFLAGS", "-O2")]);
        let _ = EnvOverlay::new().with_appended("CFLAGS", &base, &["-x"]);
        assert_eq!(base.get("CFLAGS"), Some("-O2"));
    }
}

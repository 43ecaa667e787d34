//! `notify`-backed watch provider

use crate::provider::{ProviderCallback, ProviderNotice, WatchProvider};
use ahash::AHashMap;
use notify::event::{MetadataKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use quiesce_core::{ChangeKind, InterestMask, ProviderError, RegistrationError};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

struct Registration {
    /// Dropping the watcher stops the OS watch
    _watcher: RecommendedWatcher,
    is_file: bool,
}

/// Watch provider backed by `notify::RecommendedWatcher`
///
/// Each registration gets its own watcher. File targets watch their parent
/// directory and forward only events for the file itself, so editors that
/// save by writing a temp file and renaming it over the original keep being
/// observed.
#[derive(Default)]
pub struct NotifyProvider {
    registrations: Mutex<AHashMap<PathBuf, Registration>>,
}

impl NotifyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently registered, as they were given
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.registrations.lock().keys().cloned().collect()
    }

    fn register(
        &self,
        key: &Path,
        is_file: bool,
        recursive: bool,
        interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError> {
        if self.registrations.lock().contains_key(key) {
            return Err(RegistrationError::AlreadyRegistered(key.to_path_buf()));
        }

        let metadata = std::fs::metadata(key).map_err(|e| stat_error(key, e))?;
        if is_file && metadata.is_dir() {
            return Err(RegistrationError::NotAFile(key.to_path_buf()));
        }
        if !is_file && !metadata.is_dir() {
            return Err(RegistrationError::NotADirectory(key.to_path_buf()));
        }

        let (watch_root, only) = if is_file {
            let file = canonical_file_path(key)?;
            let parent = file
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| RegistrationError::NotAFile(key.to_path_buf()))?;
            (parent, Some(file))
        } else {
            (std::fs::canonicalize(key).map_err(|e| stat_error(key, e))?, None)
        };

        let scope = watch_root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                trace!("raw notify: {:?} {:?}", event.kind, event.paths);
                for notice in classify(&event, &interest, only.as_deref(), &scope) {
                    callback(notice);
                }
            }
            Err(err) => callback(ProviderNotice::Failed(ProviderError::Backend(err.to_string()))),
        })
        .map_err(|e| backend_error(key, e))?;

        let mode = if recursive && !is_file {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&watch_root, mode)
            .map_err(|e| backend_error(key, e))?;

        let mut registrations = self.registrations.lock();
        if registrations.contains_key(key) {
            // Lost a race with a concurrent registration of the same path
            return Err(RegistrationError::AlreadyRegistered(key.to_path_buf()));
        }
        registrations.insert(
            key.to_path_buf(),
            Registration {
                _watcher: watcher,
                is_file,
            },
        );

        debug!("Registered {} ({:?})", key.display(), mode);
        Ok(())
    }

    fn unregister(&self, key: &Path, is_file: bool) -> bool {
        let removed = {
            let mut registrations = self.registrations.lock();
            match registrations.get(key) {
                Some(registration) if registration.is_file == is_file => registrations.remove(key),
                _ => None,
            }
        };

        // Drop the watcher outside the lock; backends may wait for their thread
        match removed {
            Some(registration) => {
                drop(registration);
                debug!("Unregistered {}", key.display());
                true
            }
            None => false,
        }
    }
}

impl WatchProvider for NotifyProvider {
    fn add_file(
        &self,
        path: &Path,
        interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError> {
        self.register(path, true, false, interest, callback)
    }

    fn add_directory(
        &self,
        path: &Path,
        recursive: bool,
        interest: InterestMask,
        callback: ProviderCallback,
    ) -> Result<(), RegistrationError> {
        self.register(path, false, recursive, interest, callback)
    }

    fn remove_file(&self, path: &Path) -> bool {
        self.unregister(path, true)
    }

    fn remove_directory(&self, path: &Path) -> bool {
        self.unregister(path, false)
    }

    fn is_monitoring(&self) -> bool {
        !self.registrations.lock().is_empty()
    }
}

/// Canonical parent joined with the file's own name
///
/// The file itself is not canonicalized so a symlinked target is reported
/// under the name that was registered.
fn canonical_file_path(path: &Path) -> Result<PathBuf, RegistrationError> {
    let name = path
        .file_name()
        .ok_or_else(|| RegistrationError::NotAFile(path.to_path_buf()))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = std::fs::canonicalize(parent).map_err(|e| stat_error(path, e))?;
    Ok(parent.join(name))
}

fn stat_error(path: &Path, err: io::Error) -> RegistrationError {
    match err.kind() {
        io::ErrorKind::NotFound => RegistrationError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => RegistrationError::PermissionDenied(path.to_path_buf()),
        _ => RegistrationError::Backend {
            path: path.to_path_buf(),
            message: err.to_string(),
        },
    }
}

fn backend_error(path: &Path, err: notify::Error) -> RegistrationError {
    match err.kind {
        notify::ErrorKind::PathNotFound => RegistrationError::NotFound(path.to_path_buf()),
        notify::ErrorKind::Io(ref source) if source.kind() == io::ErrorKind::PermissionDenied => {
            RegistrationError::PermissionDenied(path.to_path_buf())
        }
        _ => RegistrationError::Backend {
            path: path.to_path_buf(),
            message: err.to_string(),
        },
    }
}

/// Translate one raw `notify` event into provider notices
///
/// `only` restricts output to a single file (file targets); `scope` is the
/// watched root, used to label overflow signals.
fn classify(
    event: &Event,
    interest: &InterestMask,
    only: Option<&Path>,
    scope: &Path,
) -> Vec<ProviderNotice> {
    if event.need_rescan() {
        return vec![ProviderNotice::Failed(ProviderError::Overflow {
            path: Some(scope.to_path_buf()),
        })];
    }

    let uniform = |kind: ChangeKind| -> Vec<(PathBuf, ChangeKind)> {
        event.paths.iter().map(|p| (p.clone(), kind)).collect()
    };

    let changes = match event.kind {
        EventKind::Create(_) => uniform(ChangeKind::Added),
        EventKind::Remove(_) => uniform(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(mode)) => {
            if !interest.wants_names() {
                return Vec::new();
            }
            match mode {
                RenameMode::From => uniform(ChangeKind::RenamedFrom),
                RenameMode::To => uniform(ChangeKind::RenamedTo),
                RenameMode::Both => rename_pair(&event.paths),
                // Backends that cannot tell the halves apart (FSEvents):
                // whichever side still exists is the new name
                RenameMode::Any | RenameMode::Other => event
                    .paths
                    .iter()
                    .map(|p| {
                        let kind = if p.exists() {
                            ChangeKind::RenamedTo
                        } else {
                            ChangeKind::RenamedFrom
                        };
                        (p.clone(), kind)
                    })
                    .collect(),
            }
        }
        EventKind::Modify(ModifyKind::Metadata(metadata)) => {
            if wants_metadata(interest, metadata) {
                uniform(ChangeKind::Modified)
            } else {
                Vec::new()
            }
        }
        EventKind::Modify(_) => {
            if interest.wants_content() {
                uniform(ChangeKind::Modified)
            } else {
                Vec::new()
            }
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    };

    changes
        .into_iter()
        .filter(|(path, _)| only.map_or(true, |file| path == file))
        .map(|(path, kind)| ProviderNotice::changed(path, kind))
        .collect()
}

fn rename_pair(paths: &[PathBuf]) -> Vec<(PathBuf, ChangeKind)> {
    match paths {
        [from, to, ..] => vec![
            (from.clone(), ChangeKind::RenamedFrom),
            (to.clone(), ChangeKind::RenamedTo),
        ],
        [only] => vec![(only.clone(), ChangeKind::RenamedTo)],
        [] => Vec::new(),
    }
}

fn wants_metadata(interest: &InterestMask, metadata: MetadataKind) -> bool {
    match metadata {
        MetadataKind::AccessTime => interest.last_access,
        MetadataKind::WriteTime => interest.last_write,
        MetadataKind::Permissions | MetadataKind::Ownership => interest.security,
        MetadataKind::Extended => interest.attributes || interest.creation,
        // inotify reports chmod/chown (IN_ATTRIB) without saying which
        MetadataKind::Any | MetadataKind::Other => {
            interest.attributes || interest.creation || interest.security
        }
    }
}

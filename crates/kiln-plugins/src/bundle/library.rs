//! Locating a bundle on disk and owning what it exported.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::descriptor::{BundleManifest, TypeDescriptor};
use super::opener::BundleOpener;
use crate::error::LoadError;

// =============================================================================
// Bundle Directory
// =============================================================================

/// The directory backend bundles are deployed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDirectory {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl BundleDirectory {
    /// A directory accepting files with any of `extensions` (compared
    /// case-insensitively, without the dot). An empty list accepts every
    /// regular file.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// The searched directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Finds the single bundle file whose name contains `bundle_name`,
    /// ignoring case.
    ///
    /// # Errors
    ///
    /// - [`LoadError::DirectoryUnreadable`] if the directory cannot be listed
    /// - [`LoadError::NotFound`] if no file matches
    /// - [`LoadError::Ambiguous`] if more than one file matches
    pub fn locate(&self, bundle_name: &str) -> Result<PathBuf, LoadError> {
        let unreadable = |source| LoadError::DirectoryUnreadable {
            dir: self.dir.clone(),
            source,
        };
        let needle = bundle_name.to_lowercase();

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if !path.is_file() || !self.accepts_extension(&path) {
                continue;
            }
            let Some(file_name) = path.file_name() else {
                continue;
            };
            if file_name.to_string_lossy().to_lowercase().contains(&needle) {
                debug!(bundle = bundle_name, candidate = %path.display(), "bundle candidate");
                candidates.push(path);
            } else {
                trace!(file = %path.display(), "not a candidate");
            }
        }

        candidates.sort();
        match candidates.len() {
            0 => Err(LoadError::NotFound {
                name: bundle_name.to_owned(),
                dir: self.dir.clone(),
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(LoadError::Ambiguous {
                name: bundle_name.to_owned(),
                candidates,
            }),
        }
    }
}

// =============================================================================
// Component Library Handle
// =============================================================================

/// A loaded bundle and its type inventory.
///
/// Immutable once created. The host keeps exactly one for the life of the
/// process.
#[derive(Debug)]
pub struct ComponentLibraryHandle {
    name: String,
    path: PathBuf,
    manifest: BundleManifest,
}

impl ComponentLibraryHandle {
    /// Locates `bundle_name` in `directory` and opens it.
    ///
    /// # Errors
    ///
    /// Any [`LoadError`] from the search, or [`LoadError::Open`] when the
    /// opener rejects the file.
    pub fn load(
        directory: &BundleDirectory,
        opener: &dyn BundleOpener,
        bundle_name: &str,
    ) -> Result<Self, LoadError> {
        let path = directory.locate(bundle_name)?;
        let manifest = opener.open(&path).map_err(|source| LoadError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self::from_manifest(bundle_name, path, manifest))
    }

    /// Wraps an already-opened manifest.
    #[must_use]
    pub fn from_manifest(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        manifest: BundleManifest,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            manifest,
        }
    }

    /// The name the bundle was requested by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file the bundle was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The namespace the bundle declares as its own.
    #[must_use]
    pub fn root_namespace(&self) -> &str {
        &self.manifest.root_namespace
    }

    /// Every publicly exported type, in registration order.
    ///
    /// The iterator borrows the handle and can be cloned or recreated at
    /// will.
    pub fn exported_types(&self) -> impl Iterator<Item = &TypeDescriptor> + Clone {
        self.manifest.types.iter().filter(|ty| ty.is_public())
    }

    /// Looks up a publicly exported type by `namespace::name`.
    #[must_use]
    pub fn find_type(&self, full_name: &str) -> Option<&TypeDescriptor> {
        self.exported_types().find(|ty| ty.full_name() == full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{BundleBuilder, StaticOpener};
    use crate::error::OpenError;
    use std::env::consts::DLL_EXTENSION;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    fn library_directory(dir: &Path) -> BundleDirectory {
        BundleDirectory::new(dir, vec![DLL_EXTENSION.to_owned()])
    }

    mod locate_tests {
        use super::*;

        #[test]
        fn finds_single_match_case_insensitively() {
            let tmp = tempfile::tempdir().unwrap();
            let expected = touch(tmp.path(), &format!("Kiln.Headless.Backend.{DLL_EXTENSION}"));
            touch(tmp.path(), "readme.txt");

            let found = library_directory(tmp.path()).locate("headless").unwrap();
            assert_eq!(found, expected);
        }

        #[test]
        fn zero_matches_is_not_found() {
            let tmp = tempfile::tempdir().unwrap();
            touch(tmp.path(), &format!("other.{DLL_EXTENSION}"));

            let err = library_directory(tmp.path()).locate("headless").unwrap_err();
            assert!(matches!(err, LoadError::NotFound { name, .. } if name == "headless"));
        }

        #[test]
        fn several_matches_are_ambiguous_and_sorted() {
            let tmp = tempfile::tempdir().unwrap();
            let b = touch(tmp.path(), &format!("backend_b.{DLL_EXTENSION}"));
            let a = touch(tmp.path(), &format!("backend_a.{DLL_EXTENSION}"));

            let err = library_directory(tmp.path()).locate("Backend").unwrap_err();
            match err {
                LoadError::Ambiguous { candidates, .. } => assert_eq!(candidates, [a, b]),
                other => panic!("expected ambiguity, got {other:?}"),
            }
        }

        #[test]
        fn other_extensions_are_ignored() {
            let tmp = tempfile::tempdir().unwrap();
            touch(tmp.path(), "headless.pdb");
            let expected = touch(tmp.path(), &format!("headless.{DLL_EXTENSION}"));

            let found = library_directory(tmp.path()).locate("headless").unwrap();
            assert_eq!(found, expected);
        }

        #[test]
        fn empty_extension_list_accepts_everything() {
            let tmp = tempfile::tempdir().unwrap();
            let expected = touch(tmp.path(), "headless.bundle");

            let found = BundleDirectory::new(tmp.path(), Vec::new())
                .locate("headless")
                .unwrap();
            assert_eq!(found, expected);
        }

        #[test]
        fn extensions_are_normalised() {
            let directory = BundleDirectory::new("bundles", vec![".SO".into()]);
            assert!(directory.accepts_extension(Path::new("a.so")));
            assert!(!directory.accepts_extension(Path::new("a.dll")));
        }

        #[test]
        fn directories_are_skipped() {
            let tmp = tempfile::tempdir().unwrap();
            fs::create_dir(tmp.path().join(format!("headless.{DLL_EXTENSION}"))).unwrap();

            let err = library_directory(tmp.path()).locate("headless").unwrap_err();
            assert!(matches!(err, LoadError::NotFound { .. }));
        }

        #[test]
        fn missing_directory_is_unreadable() {
            let tmp = tempfile::tempdir().unwrap();
            let missing = tmp.path().join("nope");

            let err = library_directory(&missing).locate("headless").unwrap_err();
            assert!(matches!(err, LoadError::DirectoryUnreadable { dir, .. } if dir == missing));
        }
    }

    mod handle_tests {
        use super::*;

        fn register(bundle: &mut BundleBuilder) {
            bundle.export::<u8>("Visible");
            bundle.export::<u16>("Hidden").internal();
            bundle.export::<u32>("Nested").namespace("headless::detail");
        }

        fn load(tmp: &Path) -> ComponentLibraryHandle {
            touch(tmp, &format!("headless.{DLL_EXTENSION}"));
            let opener = StaticOpener::new().with_bundle("headless", register);
            ComponentLibraryHandle::load(&library_directory(tmp), &opener, "Headless").unwrap()
        }

        #[test]
        fn exposes_name_path_and_namespace() {
            let tmp = tempfile::tempdir().unwrap();
            let handle = load(tmp.path());

            assert_eq!(handle.name(), "Headless");
            assert_eq!(handle.root_namespace(), "headless");
            assert_eq!(
                handle.path(),
                tmp.path().join(format!("headless.{DLL_EXTENSION}"))
            );
        }

        #[test]
        fn exported_types_skip_internal_types() {
            let tmp = tempfile::tempdir().unwrap();
            let handle = load(tmp.path());

            let names: Vec<_> = handle.exported_types().map(TypeDescriptor::name).collect();
            assert_eq!(names, ["Visible", "Nested"]);
        }

        #[test]
        fn exported_types_is_restartable() {
            let tmp = tempfile::tempdir().unwrap();
            let handle = load(tmp.path());

            let first = handle.exported_types();
            let again = first.clone();
            assert_eq!(first.count(), again.count());
            assert_eq!(handle.exported_types().count(), 2);
        }

        #[test]
        fn find_type_by_full_name() {
            let tmp = tempfile::tempdir().unwrap();
            let handle = load(tmp.path());

            assert!(handle.find_type("headless::Visible").is_some());
            assert!(handle.find_type("headless::detail::Nested").is_some());
            assert!(handle.find_type("headless::Hidden").is_none());
        }

        #[test]
        fn opener_failure_is_wrapped() {
            let tmp = tempfile::tempdir().unwrap();
            touch(tmp.path(), &format!("mystery.{DLL_EXTENSION}"));

            let err = ComponentLibraryHandle::load(
                &library_directory(tmp.path()),
                &StaticOpener::new(),
                "mystery",
            )
            .unwrap_err();
            assert!(matches!(
                err,
                LoadError::Open {
                    source: OpenError::UnknownStaticBundle { .. },
                    ..
                }
            ));
        }
    }
}

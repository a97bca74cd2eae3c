//! Game data discovery and the handoff to the game engine.

use std::path::{Path, PathBuf};

use crate::error::ControllerError;

/// Used when no known data file is present.
pub const DEFAULT_ASSET: &str = "RADDOOM/DOOM1.WAD";

/// Known data files, relative to the storage root, with menu titles.
pub const KNOWN_ASSETS: &[(&str, &str)] = &[
    ("RADDOOM/DOOM.WAD", "Doom SW"),
    ("RADDOOM/DOOM1.WAD", "Doom"),
    ("RADDOOM/DOOM2.WAD", "DoomII"),
    ("RADDOOM/plutonia.wad", "FDoom P.E."),
    ("RADDOOM/tnt.wad", "FDoom TNT E."),
    ("RADDOOM/chex.wad", "Chex Quest"),
    ("RADDOOM/hacx.wad", "Hacx"),
    ("RADDOOM/freedm.wad", "FreeDM"),
    ("RADDOOM/freedoom1.wad", "Freedoom P1"),
    ("RADDOOM/freedoom2.wad", "Freedoom P2"),
    ("RADDOOM/heretic.wad", "Heretic"),
    ("RADDOOM/heretic1.wad", "Heretic SW"),
    ("RADDOOM/hexen.wad", "Hexen"),
    ("RADDOOM/strife1.wad", "Strife"),
];

/// Consumer of the selected data file, started once the controller owns
/// the bus.
pub trait GameEngine {
    fn begin(&mut self, asset_path: &str);
}

/// A data file found on storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Menu key, 'A' for the first file found.
    pub key: char,
    pub path: &'static str,
    pub title: &'static str,
}

/// The known data files present under one storage root.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    root: PathBuf,
    present: Vec<AssetEntry>,
}

impl AssetCatalog {
    /// Check which known files exist under `root`.
    #[must_use]
    pub fn scan(root: &Path) -> Self {
        Self::from_present(root, |path| root.join(path).is_file())
    }

    /// Build a catalog from an existence predicate.
    #[must_use]
    pub fn from_present(root: &Path, mut exists: impl FnMut(&str) -> bool) -> Self {
        let present = KNOWN_ASSETS
            .iter()
            .filter(|&&(path, _)| exists(path))
            .zip('A'..='Z')
            .map(|(&(path, title), key)| AssetEntry { key, path, title })
            .collect::<Vec<_>>();
        log::debug!("{} known data files under {}", present.len(), root.display());
        Self {
            root: root.to_path_buf(),
            present,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Menu entries in key order.
    #[must_use]
    pub fn entries(&self) -> &[AssetEntry] {
        &self.present
    }

    #[must_use]
    pub fn by_key(&self, key: char) -> Option<&AssetEntry> {
        let key = key.to_ascii_uppercase();
        self.present.iter().find(|e| e.key == key)
    }

    /// Pick the data file to start.
    ///
    /// A single file present is taken without asking. With several, `choice`
    /// (a path or a menu key) must name one of them. With none, the default
    /// is returned and the engine reports the missing file itself.
    pub fn resolve(&self, choice: Option<&str>) -> Result<&'static str, ControllerError> {
        if let Some(choice) = choice {
            let mut chars = choice.chars();
            let by_key = match (chars.next(), chars.next()) {
                (Some(key), None) => self.by_key(key),
                _ => None,
            };
            return by_key
                .or_else(|| self.present.iter().find(|e| e.path.eq_ignore_ascii_case(choice)))
                .map(|e| e.path)
                .ok_or_else(|| ControllerError::UnknownAsset(choice.to_string()));
        }
        match self.present.as_slice() {
            [] => {
                log::warn!("no known data files found, falling back to {DEFAULT_ASSET}");
                Ok(DEFAULT_ASSET)
            }
            [only] => Ok(only.path),
            several => Err(ControllerError::AssetChoiceRequired(
                several.iter().map(|e| format!("{}) {}", e.key, e.path)).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(present: &[&str]) -> AssetCatalog {
        AssetCatalog::from_present(Path::new("/sd"), |p| present.contains(&p))
    }

    #[test]
    fn single_file_is_picked_automatically() {
        let catalog = catalog(&["RADDOOM/DOOM2.WAD"]);
        assert_eq!(catalog.resolve(None).ok(), Some("RADDOOM/DOOM2.WAD"));
    }

    #[test]
    fn several_files_need_a_choice() {
        let catalog = catalog(&["RADDOOM/DOOM1.WAD", "RADDOOM/hexen.wad"]);
        assert!(matches!(
            catalog.resolve(None),
            Err(ControllerError::AssetChoiceRequired(list)) if list.len() == 2
        ));
        assert_eq!(catalog.resolve(Some("b")).ok(), Some("RADDOOM/hexen.wad"));
        assert_eq!(catalog.resolve(Some("raddoom/doom1.wad")).ok(), Some("RADDOOM/DOOM1.WAD"));
        assert!(catalog.resolve(Some("RADDOOM/DOOM2.WAD")).is_err());
    }

    #[test]
    fn menu_keys_follow_catalog_order() {
        let catalog = catalog(&["RADDOOM/strife1.wad", "RADDOOM/DOOM.WAD"]);
        let keys: Vec<_> = catalog.entries().iter().map(|e| (e.key, e.title)).collect();
        assert_eq!(keys, [('A', "Doom SW"), ('B', "Strife")]);
    }

    #[test]
    fn nothing_found_falls_back_to_default() {
        assert_eq!(catalog(&[]).resolve(None).ok(), Some(DEFAULT_ASSET));
    }
}

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use crate::error::{Error, Result};
use crate::font::FontStyle;

/// Family-name fragments of the common color emoji fonts.
const COLOR_FONT_KEYWORDS: [&str; 6] = [
    "notocoloremoji",
    "color emoji",
    "seguiemj",
    "segoeuemoji",
    "twemoji",
    "apple color emoji",
];

/// Font database backed by `fontdb`, with lazily parsed `fontdue` fonts.
///
/// Registering a face only reads its metadata. The `fontdue::Font` is parsed
/// the first time the face is requested and kept for the lifetime of the
/// storage.
pub struct FontStorage {
    font_db: fontdb::Database,
    /// Faces parsed so far. Not every face in `font_db` ends up here.
    parsed: HashMap<fontdb::ID, Arc<fontdue::Font>, fxhash::FxBuildHasher>,
}

impl Default for FontStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl FontStorage {
    /// Creates an empty storage with no faces registered.
    pub fn new() -> Self {
        Self {
            font_db: fontdb::Database::new(),
            parsed: HashMap::with_hasher(fxhash::FxBuildHasher::default()),
        }
    }

    /// Storage preloaded with the fonts installed on this machine.
    pub fn with_system_fonts() -> Self {
        let mut storage = Self::new();
        storage.font_db.load_system_fonts();
        log::debug!("Registered {} system font faces", storage.len());
        storage
    }

    /// Returns `true` when no face has been registered.
    pub fn is_empty(&self) -> bool {
        self.font_db.is_empty()
    }

    /// Returns the number of registered faces.
    pub fn len(&self) -> usize {
        self.font_db.len()
    }
}

/// registration
impl FontStorage {
    /// Registers every face in `data`, returning their ids in file order.
    /// Data that contains no recognizable face yields an empty list.
    pub fn load_font_binary(&mut self, data: impl Into<Vec<u8>>) -> Vec<fontdb::ID> {
        let source = fontdb::Source::Binary(Arc::new(data.into()));
        self.font_db.load_font_source(source).iter().copied().collect()
    }

    /// Like [`load_font_binary`](Self::load_font_binary), but an unreadable
    /// file is an error instead of a silently skipped source.
    pub fn load_font_file(&mut self, path: PathBuf) -> Result<Vec<fontdb::ID>> {
        let data = std::fs::read(&path).map_err(|source| Error::FontFile { path, source })?;
        Ok(self.load_font_binary(data))
    }

    /// Registers every font file found under `dir`, recursively.
    ///
    /// Unreadable files are skipped by `fontdb`.
    pub fn load_fonts_dir(&mut self, dir: PathBuf) {
        self.font_db.load_fonts_dir(dir)
    }
}

/// lookup
impl FontStorage {
    /// Parsed font for `id`, parsing it on first use. Faces that fail to
    /// parse are logged and reported as missing.
    pub fn font(&mut self, id: fontdb::ID) -> Option<Arc<fontdue::Font>> {
        use std::collections::hash_map::Entry;

        match self.parsed.entry(id) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let parsed = self.font_db.with_face_data(id, |data, index| {
                    fontdue::Font::from_bytes(
                        data,
                        fontdue::FontSettings {
                            collection_index: index,
                            scale: 40.0,
                            load_substitutions: true,
                        },
                    )
                })?;

                match parsed {
                    Ok(font) => Some(Arc::clone(entry.insert(Arc::new(font)))),
                    Err(e) => {
                        log::error!("Failed to parse font (id: {id:?}): {e}");
                        None
                    }
                }
            }
        }
    }

    /// Sans-serif face with the weight and slant of `style`.
    pub fn query_style(&mut self, style: FontStyle) -> Option<(fontdb::ID, Arc<fontdue::Font>)> {
        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            weight: match style {
                FontStyle::Bold => fontdb::Weight::BOLD,
                _ => fontdb::Weight::NORMAL,
            },
            style: match style {
                FontStyle::Italic => fontdb::Style::Italic,
                _ => fontdb::Style::Normal,
            },
            stretch: fontdb::Stretch::Normal,
        };
        let id = self.font_db.query(&query)?;
        self.font(id).map(|font| (id, font))
    }

    /// First registered face that parses, whatever it is.
    pub fn any_face(&mut self) -> Option<(fontdb::ID, Arc<fontdue::Font>)> {
        let ids: Vec<fontdb::ID> = self.font_db.faces().map(|face| face.id).collect();
        ids.into_iter()
            .find_map(|id| self.font(id).map(|font| (id, font)))
    }

    /// Whether `id` looks like a color emoji font, judged by its family
    /// names, PostScript name and file name.
    pub fn is_color_face(&self, id: fontdb::ID) -> bool {
        let Some(info) = self.font_db.face(id) else {
            return false;
        };

        let mut names: Vec<String> = info
            .families
            .iter()
            .map(|(name, _)| name.to_lowercase())
            .collect();
        names.push(info.post_script_name.to_lowercase());
        if let fontdb::Source::File(path) = &info.source {
            names.push(path.to_string_lossy().to_lowercase());
        }

        names
            .iter()
            .any(|name| COLOR_FONT_KEYWORDS.iter().any(|keyword| name.contains(keyword)))
    }
}

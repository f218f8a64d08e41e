use std::{collections::HashMap, path::PathBuf, sync::Arc};

use crate::face::{FaceHandle, FontdueFace};

/// Font database plus a cache of shared faces ready for layout.
///
/// `fontdb` indexes the available font files; a [`FontdueFace`] is only parsed
/// the first time its id is requested. Every later request hands out a clone
/// of the same `Arc`, so all layouts using a font share one parsed face.
pub struct FontStorage {
    /// This is the font set that has been indexed by fontdb.
    font_db: fontdb::Database,
    /// Faces parsed so far. Not all fonts in fontdb are necessarily loaded here.
    loaded_faces: HashMap<fontdb::ID, Arc<FontdueFace>, fxhash::FxBuildHasher>,
}

impl Default for FontStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl FontStorage {
    /// Creates a new empty font storage.
    pub fn new() -> Self {
        Self {
            font_db: fontdb::Database::new(),
            loaded_faces: HashMap::with_hasher(fxhash::FxBuildHasher::default()),
        }
    }
}

/// Loading fonts into fontdb.
impl FontStorage {
    /// Loads a font from binary data.
    pub fn load_font_binary(&mut self, data: impl Into<Vec<u8>>) {
        self.font_db.load_font_data(data.into());
    }

    /// Loads a font from a file path.
    pub fn load_font_file(&mut self, path: PathBuf) -> Result<(), std::io::Error> {
        self.font_db.load_font_file(path)
    }

    /// Loads all fonts from a directory.
    pub fn load_fonts_dir(&mut self, dir: PathBuf) {
        self.font_db.load_fonts_dir(dir)
    }

    /// Loads the system fonts.
    pub fn load_system_fonts(&mut self) {
        self.font_db.load_system_fonts();
    }

    /// Removes a face by ID.
    ///
    /// Layouts that already hold the face keep it alive until they are reset.
    pub fn remove_face(&mut self, id: fontdb::ID) {
        self.font_db.remove_face(id);
        self.loaded_faces.remove(&id);
    }

    pub fn is_empty(&self) -> bool {
        self.font_db.is_empty()
    }

    /// Returns the number of indexed faces.
    pub fn len(&self) -> usize {
        self.font_db.len()
    }

    /// Number of faces parsed and cached so far.
    pub fn loaded_len(&self) -> usize {
        self.loaded_faces.len()
    }
}

/// Get faces
impl FontStorage {
    /// Queries for a face matching the description.
    pub fn query(&mut self, query: &fontdb::Query) -> Option<(fontdb::ID, FaceHandle)> {
        let id = self.font_db.query(query)?;
        self.face(id).map(|face| (id, face))
    }

    /// Retrieves a face by ID, parsing it on first use.
    pub fn face(&mut self, id: fontdb::ID) -> Option<FaceHandle> {
        self.fontdue_face(id).map(|face| face as FaceHandle)
    }

    /// Same as [`Self::face`] but keeps the concrete type.
    pub fn fontdue_face(&mut self, id: fontdb::ID) -> Option<Arc<FontdueFace>> {
        use std::collections::hash_map::Entry;

        match self.loaded_faces.entry(id) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let face_result = self
                    .font_db
                    .with_face_data(id, |data, index| FontdueFace::from_bytes(data, index))?;

                match face_result {
                    Ok(face) => {
                        let r: &mut Arc<FontdueFace> = entry.insert(Arc::new(face));
                        log::debug!("Loaded font face (id: {:?})", id);
                        Some(Arc::clone(r))
                    }
                    Err(e) => {
                        log::error!("Failed to load font (id: {:?}): {}", id, e);
                        None
                    }
                }
            }
        }
    }

    /// Returns an iterator over all indexed faces.
    pub fn faces(&self) -> impl Iterator<Item = &fontdb::FaceInfo> {
        self.font_db.faces()
    }

    /// Returns face info for an ID.
    pub fn face_info(&self, id: fontdb::ID) -> Option<&fontdb::FaceInfo> {
        self.font_db.face(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_storage_has_no_faces() {
        let mut storage = FontStorage::new();
        assert!(storage.is_empty());
        assert_eq!(storage.len(), 0);

        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            weight: fontdb::Weight::NORMAL,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        assert!(storage.query(&query).is_none());
        assert_eq!(storage.loaded_len(), 0);
    }

    #[test]
    fn garbage_binary_is_not_indexed() {
        let mut storage = FontStorage::new();
        storage.load_font_binary(vec![0u8; 16]);
        assert!(storage.is_empty());
    }
}

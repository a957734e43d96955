//! `lopdf`-backed page source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use discurso_core::{Error, Result};

use crate::content::{decode_operations, matrix_from, Form, Interpreter, PageFrame, ResourceScope, IDENTITY};
use crate::extractor::PageSource;
use crate::fonts::FontInfo;
use crate::layout::PageLayout;

/// US Letter, used when no MediaBox can be found in the page tree.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
/// Guard against cyclic `Parent` links.
const MAX_TREE_DEPTH: usize = 32;

/// Follow an indirect reference; anything else is returned as-is.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// An opened PDF. The parsed document lives as long as this value.
pub struct PdfDocument {
    doc: Document,
    path: PathBuf,
    pages: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .map_err(|e| Error::Pdf(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_document(doc, path))
    }

    pub fn from_document(doc: Document, path: impl Into<PathBuf>) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self {
            doc,
            path: path.into(),
            pages,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn page_dict(&self, page_id: ObjectId) -> Result<&Dictionary> {
        self.doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| Error::Pdf(format!("page {:?}: {}", page_id, e)))
    }

    /// Look `key` up on the page, then on its ancestors.
    fn inherited<'a>(&'a self, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut dict = page;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(obj) = dict.get(key) {
                return Some(resolve(&self.doc, obj));
            }
            dict = dict
                .get(b"Parent")
                .ok()
                .and_then(|p| resolve(&self.doc, p).as_dict().ok())?;
        }
        None
    }

    /// A page boundary box, normalized to `[left, bottom, right, top]`.
    fn page_box(&self, page: &Dictionary, key: &[u8]) -> Option<[f32; 4]> {
        let values: Vec<f32> = self
            .inherited(page, key)
            .and_then(|o| o.as_array().ok())
            .map(|arr| arr.iter().filter_map(|v| number(resolve(&self.doc, v))).collect())
            .unwrap_or_default();
        match values.as_slice() {
            [a, b, c, d] => Some([a.min(*c), b.min(*d), a.max(*c), b.max(*d)]),
            _ => None,
        }
    }

    /// The visible region: CropBox clipped to the MediaBox, or the MediaBox
    /// itself when the CropBox is missing or does not overlap it.
    fn visible_box(&self, page: &Dictionary) -> [f32; 4] {
        let media = self.page_box(page, b"MediaBox").unwrap_or(DEFAULT_MEDIA_BOX);
        let Some(crop) = self.page_box(page, b"CropBox") else {
            return media;
        };
        let clipped = [
            crop[0].max(media[0]),
            crop[1].max(media[1]),
            crop[2].min(media[2]),
            crop[3].min(media[3]),
        ];
        if clipped[0] < clipped[2] && clipped[1] < clipped[3] {
            clipped
        } else {
            media
        }
    }

    fn layout(&self, page_id: ObjectId) -> Result<PageLayout> {
        let page = self.page_dict(page_id)?;
        let [x0, y0, x1, y1] = self.visible_box(page);
        let resources = PdfResources::new(&self.doc, self.inherited(page, b"Resources"));

        let data = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| Error::Pdf(format!("page {:?} content: {}", page_id, e)))?;
        let operations = decode_operations(&data)
            .map_err(|e| Error::Pdf(format!("page {:?} content stream: {}", page_id, e)))?;

        let frame = PageFrame { left: x0, top: y1 };
        let glyphs = Interpreter::new(frame).run(&resources, &operations);
        debug!(
            "Page {:?}: {} operations, {} glyphs, {} fonts",
            page_id,
            operations.len(),
            glyphs.len(),
            resources.fonts.len()
        );
        Ok(PageLayout::new(x1 - x0, y1 - y0, glyphs))
    }
}

/// Fonts and XObjects of one `/Resources` dictionary.
struct PdfResources<'d> {
    doc: &'d Document,
    dict: Option<&'d Dictionary>,
    fonts: HashMap<Vec<u8>, Rc<FontInfo>>,
}

impl<'d> PdfResources<'d> {
    fn new(doc: &'d Document, resources: Option<&'d Object>) -> Self {
        let dict = resources.and_then(|r| resolve(doc, r).as_dict().ok());
        let mut fonts = HashMap::new();
        if let Some(font_dict) = dict
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| resolve(doc, f).as_dict().ok())
        {
            for (name, obj) in font_dict.iter() {
                if let Ok(font) = resolve(doc, obj).as_dict() {
                    fonts.insert(name.clone(), Rc::new(FontInfo::from_dict(doc, font)));
                }
            }
        }
        Self { doc, dict, fonts }
    }
}

impl ResourceScope for PdfResources<'_> {
    fn font(&self, name: &[u8]) -> Option<Rc<FontInfo>> {
        self.fonts.get(name).cloned()
    }

    fn form(&self, name: &[u8]) -> Option<Form<'_>> {
        let stream = self
            .dict?
            .get(b"XObject")
            .ok()
            .and_then(|x| resolve(self.doc, x).as_dict().ok())?
            .get(name)
            .ok()
            .and_then(|o| resolve(self.doc, o).as_stream().ok())?;
        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Form".as_slice()) {
            return None;
        }
        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let operations = match decode_operations(&data) {
            Ok(operations) => operations,
            Err(e) => {
                debug!("Skipping form {}: {}", String::from_utf8_lossy(name), e);
                return None;
            }
        };
        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| resolve(self.doc, m).as_array().ok())
            .and_then(|m| matrix_from(m))
            .unwrap_or(IDENTITY);
        let resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .map(|r| Box::new(PdfResources::new(self.doc, Some(r))) as Box<dyn ResourceScope + '_>);
        Some(Form {
            matrix,
            operations,
            resources,
        })
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<PageLayout> {
        let page_id = *self
            .pages
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("page {} of {}", index + 1, self.path.display())))?;
        self.layout(page_id)
    }
}

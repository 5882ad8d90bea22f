use std::collections::HashSet;

use log::warn;

use crate::objects::{Dict, ObjId, PdfObject};
use crate::parser::PdfReader;
use crate::resolver::{CyclePolicy, ResolveError, ResolveMode, Resolver};

// ── Error type ────────────────────────────────────────────────────────────────

/// Failures while materializing page records. These abort the page list
/// but leave the raw object graph usable.
#[derive(Debug, Clone, PartialEq)]
pub enum PageStructureError {
    /// The catalog has no usable `/Pages` entry.
    MissingPages,
    /// A page lacks `/MediaBox` even after walking the full parent chain.
    MissingMediaBox(ObjId),
    /// The pages tree is ill-formed (wrong node shape, cycle, bad kid).
    MalformedTree {
        detail: &'static str,
        object: Option<ObjId>,
    },
    Resolve(ResolveError),
}

impl std::fmt::Display for PageStructureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageStructureError::MissingPages => {
                write!(f, "catalog has no /Pages dictionary")
            }
            PageStructureError::MissingMediaBox(id) => {
                write!(f, "page {} R has no /MediaBox on it or any ancestor", id)
            }
            PageStructureError::MalformedTree { detail, object } => match object {
                Some(id) => write!(f, "malformed page tree at {} R: {}", id, detail),
                None => write!(f, "malformed page tree: {}", detail),
            },
            PageStructureError::Resolve(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PageStructureError {}

impl From<ResolveError> for PageStructureError {
    fn from(e: ResolveError) -> Self {
        PageStructureError::Resolve(e)
    }
}

// ── Page record types ─────────────────────────────────────────────────────────

/// An axis-aligned rectangle `[x1, y1, x2, y2]` in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }
}

/// The named resource bundle a content-stream interpreter consumes.
/// Slots are shallow clones keyed off the page's (possibly inherited)
/// `/Resources` dictionary; values inside remain unresolved handles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resources {
    pub font: Option<Dict>,
    pub x_object: Option<Dict>,
    pub ext_g_state: Option<Dict>,
    pub color_space: Option<Dict>,
    pub pattern: Option<Dict>,
    pub shading: Option<Dict>,
    pub proc_set: Option<Vec<String>>,
    pub properties: Option<Dict>,
}

/// The `/Contents` entry, preserving whether the file used a single
/// stream reference or an array of them.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContents {
    Single(ObjId),
    Array(Vec<ObjId>),
}

/// One leaf of the pages tree with its inherited attributes applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub object_ref: ObjId,
    pub media_box: Rect,
    /// Defaults to `media_box` when absent.
    pub crop_box: Rect,
    pub bleed_box: Option<Rect>,
    pub trim_box: Option<Rect>,
    pub art_box: Option<Rect>,
    pub resources: Resources,
    pub contents: Option<PageContents>,
    pub annots: Option<Vec<ObjId>>,
    /// Normalized to one of `{0, 90, 180, 270}`.
    pub rotate: i32,
    pub user_unit: f64,
    pub parent: Option<ObjId>,
}

impl Page {
    /// Horizontal extent of the crop box in units of `user_unit` points.
    pub fn width(&self) -> f64 {
        self.crop_box.width() * self.user_unit
    }

    pub fn height(&self) -> f64 {
        self.crop_box.height() * self.user_unit
    }

    pub fn rotation(&self) -> i32 {
        self.rotate
    }

    /// True iff the page renders wider than tall once `/Rotate` is
    /// accounted for.
    pub fn is_landscape(&self) -> bool {
        let (w, h) = if self.rotate % 180 == 90 {
            (self.height(), self.width())
        } else {
            (self.width(), self.height())
        };
        w > h
    }
}

// ── Page tree walk ────────────────────────────────────────────────────────────

/// Attributes that flow down the pages tree (PDF 32000-1:2008 Table 29:
/// `Resources`, `MediaBox`, `CropBox`, `Rotate`).
#[derive(Clone, Default)]
struct Inherited {
    resources: Option<Dict>,
    media_box: Option<Rect>,
    crop_box: Option<Rect>,
    rotate: Option<i64>,
}

/// Walk the catalog's page tree and build page records in traversal
/// order.
pub fn pages(reader: &PdfReader) -> Result<Vec<Page>, PageStructureError> {
    let mut resolver = reader.resolver();
    let root_id = reader.trailer().root;

    let catalog = resolver.resolve(root_id, ResolveMode::Shallow, CyclePolicy::Silent)?;
    let catalog_dict = catalog
        .value
        .as_dict()
        .ok_or(PageStructureError::MalformedTree {
            detail: "catalog is not a dictionary",
            object: Some(root_id),
        })?;
    let pages_ref = catalog_dict
        .get("Pages")
        .and_then(PdfObject::as_reference)
        .ok_or(PageStructureError::MissingPages)?;

    let mut out = Vec::new();
    let mut visited = HashSet::new();
    walk(
        &mut resolver,
        pages_ref,
        None,
        &Inherited::default(),
        &mut visited,
        &mut out,
    )?;

    // /Count on the root is advisory here; traversal order is
    // authoritative.
    let root = resolver.resolve(pages_ref, ResolveMode::Shallow, CyclePolicy::Silent)?;
    if let Some(count) = root
        .value
        .as_dict()
        .and_then(|d| d.get("Count"))
        .and_then(PdfObject::as_integer)
    {
        if count != out.len() as i64 {
            warn!(
                "page tree root {} R declares /Count {} but {} leaves were found",
                pages_ref,
                count,
                out.len()
            );
        }
    }

    Ok(out)
}

fn walk(
    resolver: &mut Resolver<'_>,
    node_id: ObjId,
    parent: Option<ObjId>,
    inherited: &Inherited,
    visited: &mut HashSet<ObjId>,
    out: &mut Vec<Page>,
) -> Result<(), PageStructureError> {
    if !visited.insert(node_id) {
        return Err(PageStructureError::MalformedTree {
            detail: "cycle in page tree",
            object: Some(node_id),
        });
    }

    let node = resolver.resolve(node_id, ResolveMode::Shallow, CyclePolicy::Silent)?;
    let dict = node
        .value
        .as_dict()
        .ok_or(PageStructureError::MalformedTree {
            detail: "page tree node is not a dictionary",
            object: Some(node_id),
        })?;

    let is_interior = match dict.get("Type").and_then(PdfObject::as_name) {
        Some("Pages") => true,
        Some("Page") => false,
        Some(_) => {
            return Err(PageStructureError::MalformedTree {
                detail: "node /Type is neither /Pages nor /Page",
                object: Some(node_id),
            })
        }
        None => {
            let has_kids = dict.contains_key("Kids");
            warn!(
                "page tree node {} R has no /Type; treating as {}",
                node_id,
                if has_kids { "/Pages" } else { "/Page" }
            );
            has_kids
        }
    };

    let mut inherited = inherited.clone();
    if let Some(PdfObject::Dictionary(res)) = entry(resolver, dict, "Resources")? {
        inherited.resources = Some(res);
    }
    if let Some(rect) = rect_entry(resolver, dict, "MediaBox")? {
        inherited.media_box = Some(rect);
    }
    if let Some(rect) = rect_entry(resolver, dict, "CropBox")? {
        inherited.crop_box = Some(rect);
    }
    if let Some(rotate) = entry(resolver, dict, "Rotate")?.and_then(|v| v.as_integer()) {
        inherited.rotate = Some(rotate);
    }

    if is_interior {
        let kids = entry(resolver, dict, "Kids")?;
        let kids = kids
            .as_ref()
            .and_then(PdfObject::as_array)
            .ok_or(PageStructureError::MalformedTree {
                detail: "/Pages node has no /Kids array",
                object: Some(node_id),
            })?;
        for kid in kids {
            let kid_id = kid
                .as_reference()
                .ok_or(PageStructureError::MalformedTree {
                    detail: "/Kids entry is not an indirect reference",
                    object: Some(node_id),
                })?;
            walk(resolver, kid_id, Some(node_id), &inherited, visited, out)?;
        }
    } else {
        out.push(build_page(resolver, node_id, dict, &inherited, parent)?);
    }
    Ok(())
}

fn build_page(
    resolver: &mut Resolver<'_>,
    id: ObjId,
    dict: &Dict,
    inherited: &Inherited,
    parent: Option<ObjId>,
) -> Result<Page, PageStructureError> {
    let media_box = inherited
        .media_box
        .ok_or(PageStructureError::MissingMediaBox(id))?;
    let crop_box = inherited.crop_box.unwrap_or(media_box);

    let resources = match &inherited.resources {
        Some(dict) => build_resources(resolver, dict)?,
        None => Resources::default(),
    };

    let contents = match dict.get("Contents") {
        None => None,
        Some(PdfObject::Reference(id)) => Some(PageContents::Single(*id)),
        Some(PdfObject::Array(items)) => {
            let refs = items
                .iter()
                .map(PdfObject::as_reference)
                .collect::<Option<Vec<ObjId>>>()
                .ok_or(PageStructureError::MalformedTree {
                    detail: "/Contents array entry is not a reference",
                    object: Some(id),
                })?;
            Some(PageContents::Array(refs))
        }
        Some(_) => {
            return Err(PageStructureError::MalformedTree {
                detail: "/Contents is neither a reference nor an array",
                object: Some(id),
            })
        }
    };

    // Downstream interpreters rely on every contents reference naming a
    // stream in the object table.
    if let Some(contents) = &contents {
        let refs: &[ObjId] = match contents {
            PageContents::Single(id) => std::slice::from_ref(id),
            PageContents::Array(ids) => ids,
        };
        for content_id in refs {
            let obj =
                resolver.resolve(*content_id, ResolveMode::Shallow, CyclePolicy::Silent)?;
            if obj.value.as_stream().is_none() {
                return Err(PageStructureError::MalformedTree {
                    detail: "/Contents does not reference a stream",
                    object: Some(*content_id),
                });
            }
        }
    }

    let annots = match entry(resolver, dict, "Annots")? {
        Some(PdfObject::Array(items)) => {
            let refs: Vec<ObjId> = items
                .iter()
                .filter_map(PdfObject::as_reference)
                .collect();
            if refs.len() != items.len() {
                warn!(
                    "page {} R: skipping {} non-reference /Annots entries",
                    id,
                    items.len() - refs.len()
                );
            }
            Some(refs)
        }
        _ => None,
    };

    let user_unit = entry(resolver, dict, "UserUnit")?
        .and_then(|v| v.as_number())
        .unwrap_or(1.0);

    Ok(Page {
        object_ref: id,
        media_box,
        crop_box,
        bleed_box: rect_entry(resolver, dict, "BleedBox")?,
        trim_box: rect_entry(resolver, dict, "TrimBox")?,
        art_box: rect_entry(resolver, dict, "ArtBox")?,
        resources,
        contents,
        annots,
        rotate: normalize_rotation(inherited.rotate.unwrap_or(0), id),
        user_unit,
        parent,
    })
}

/// Shallow-clone the standard slots out of a resources dictionary.
fn build_resources(
    resolver: &mut Resolver<'_>,
    dict: &Dict,
) -> Result<Resources, PageStructureError> {
    Ok(Resources {
        font: dict_slot(resolver, dict, "Font")?,
        x_object: dict_slot(resolver, dict, "XObject")?,
        ext_g_state: dict_slot(resolver, dict, "ExtGState")?,
        color_space: dict_slot(resolver, dict, "ColorSpace")?,
        pattern: dict_slot(resolver, dict, "Pattern")?,
        shading: dict_slot(resolver, dict, "Shading")?,
        proc_set: match entry(resolver, dict, "ProcSet")? {
            Some(PdfObject::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_name().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        },
        properties: dict_slot(resolver, dict, "Properties")?,
    })
}

fn dict_slot(
    resolver: &mut Resolver<'_>,
    dict: &Dict,
    key: &str,
) -> Result<Option<Dict>, PageStructureError> {
    match entry(resolver, dict, key)? {
        Some(PdfObject::Dictionary(d)) => Ok(Some(d)),
        Some(_) => {
            warn!("resource slot /{} is not a dictionary; ignoring", key);
            Ok(None)
        }
        None => Ok(None),
    }
}

/// A dict entry with one level of indirection resolved: a `Reference`
/// value is swapped for its table entry's value.
fn entry(
    resolver: &mut Resolver<'_>,
    dict: &Dict,
    key: &str,
) -> Result<Option<PdfObject>, ResolveError> {
    match dict.get(key) {
        None => Ok(None),
        Some(PdfObject::Reference(id)) => {
            let obj = resolver.resolve(*id, ResolveMode::Shallow, CyclePolicy::Silent)?;
            Ok(Some(obj.value.clone()))
        }
        Some(value) => Ok(Some(value.clone())),
    }
}

/// A `[x1 y1 x2 y2]` entry; array elements may themselves be indirect.
fn rect_entry(
    resolver: &mut Resolver<'_>,
    dict: &Dict,
    key: &str,
) -> Result<Option<Rect>, ResolveError> {
    let Some(value) = entry(resolver, dict, key)? else {
        return Ok(None);
    };
    let Some(items) = value.as_array() else {
        return Ok(None);
    };
    if items.len() != 4 {
        return Ok(None);
    }
    let mut coords = [0.0f64; 4];
    for (slot, item) in coords.iter_mut().zip(items) {
        let n = match item {
            PdfObject::Reference(id) => resolver
                .resolve(*id, ResolveMode::Shallow, CyclePolicy::Silent)?
                .value
                .as_number(),
            other => other.as_number(),
        };
        match n {
            Some(n) => *slot = n,
            None => return Ok(None),
        }
    }
    Ok(Some(Rect {
        x1: coords[0],
        y1: coords[1],
        x2: coords[2],
        y2: coords[3],
    }))
}

/// Clamp `/Rotate` into `{0, 90, 180, 270}`: reduce modulo 360, then
/// round to the nearest multiple of 90. Out-of-range inputs get a warning.
fn normalize_rotation(raw: i64, id: ObjId) -> i32 {
    let wrapped = raw.rem_euclid(360);
    let rounded = (((wrapped as f64 / 90.0).round() as i64) * 90) % 360;
    if rounded != raw {
        warn!(
            "page {} R: /Rotate {} normalized to {}",
            id, raw, rounded
        );
    }
    rounded as i32
}

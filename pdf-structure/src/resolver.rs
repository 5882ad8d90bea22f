use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::objects::{Dict, IndirectObject, ObjId, ObjectTable, PdfObject};

/// How far [`Resolver::resolve`] follows references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Return the table entry verbatim; nested references stay handles.
    Shallow,
    /// Recursively replace every reachable reference with its resolved
    /// indirect object.
    Deep,
}

/// What deep resolution does when it re-enters an object already on the
/// resolve stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Break the cycle by splicing in the raw, not-further-resolved table
    /// entry.
    #[default]
    Silent,
    /// Raise [`ResolveError::CircularReference`] on the cycle's closing
    /// edge.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// `(object_number, generation)` is absent from the object table.
    UnknownReference(ObjId),
    /// A reference cycle was encountered with [`CyclePolicy::Error`].
    CircularReference(ObjId),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UnknownReference(id) => {
                write!(f, "unknown reference {} R", id)
            }
            ResolveError::CircularReference(id) => {
                write!(f, "circular reference through {} R", id)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

struct CacheEntry {
    object: Rc<IndirectObject>,
    /// The key the cycle-breaking stub points at, if deep resolution had
    /// to break a cycle inside this tree.
    cycle: Option<ObjId>,
}

/// Dereferences indirect references against an object table.
///
/// Deep results are memoized and returned by identity (`Rc`), so
/// resolving the same key twice yields the same allocation. The cache
/// makes a resolver single-consumer: it is not safe to share across
/// threads, make one per consumer via [`PdfReader::resolver`].
///
/// [`PdfReader::resolver`]: crate::parser::PdfReader::resolver
pub struct Resolver<'a> {
    objects: &'a ObjectTable,
    cache: HashMap<ObjId, CacheEntry>,
}

impl<'a> Resolver<'a> {
    pub fn new(objects: &'a ObjectTable) -> Self {
        Resolver {
            objects,
            cache: HashMap::new(),
        }
    }

    /// Look up `id` and, in [`ResolveMode::Deep`], expand every reference
    /// reachable from its value. Array elements resolve left to right and
    /// dictionary entries in insertion order, so the cycle-breaking
    /// frontier is deterministic.
    pub fn resolve(
        &mut self,
        id: ObjId,
        mode: ResolveMode,
        on_cycle: CyclePolicy,
    ) -> Result<Rc<IndirectObject>, ResolveError> {
        match mode {
            ResolveMode::Shallow => self.lookup(id),
            ResolveMode::Deep => {
                let mut visiting = HashSet::new();
                self.resolve_deep(id, &mut visiting, on_cycle)
                    .map(|(object, _)| object)
            }
        }
    }

    fn lookup(&self, id: ObjId) -> Result<Rc<IndirectObject>, ResolveError> {
        self.objects
            .get(id)
            .cloned()
            .ok_or(ResolveError::UnknownReference(id))
    }

    fn resolve_deep(
        &mut self,
        id: ObjId,
        visiting: &mut HashSet<ObjId>,
        on_cycle: CyclePolicy,
    ) -> Result<(Rc<IndirectObject>, Option<ObjId>), ResolveError> {
        if let Some(entry) = self.cache.get(&id) {
            if let (Some(key), CyclePolicy::Error) = (entry.cycle, on_cycle) {
                return Err(ResolveError::CircularReference(key));
            }
            return Ok((entry.object.clone(), entry.cycle));
        }

        let raw = self.lookup(id)?;
        visiting.insert(id);
        let resolved = self.resolve_value(&raw.value, visiting, on_cycle);
        visiting.remove(&id);

        let (value, cycle) = resolved?;
        let object = Rc::new(IndirectObject { id, value });
        self.cache.insert(
            id,
            CacheEntry {
                object: object.clone(),
                cycle,
            },
        );
        Ok((object, cycle))
    }

    fn resolve_value(
        &mut self,
        value: &PdfObject,
        visiting: &mut HashSet<ObjId>,
        on_cycle: CyclePolicy,
    ) -> Result<(PdfObject, Option<ObjId>), ResolveError> {
        match value {
            PdfObject::Reference(id) => {
                if visiting.contains(id) {
                    match on_cycle {
                        CyclePolicy::Error => Err(ResolveError::CircularReference(*id)),
                        // The raw table entry, references intact, is the
                        // cycle's stub frontier.
                        CyclePolicy::Silent => {
                            let raw = self.lookup(*id)?;
                            Ok((PdfObject::Indirect(raw), Some(*id)))
                        }
                    }
                } else {
                    let (object, cycle) = self.resolve_deep(*id, visiting, on_cycle)?;
                    Ok((PdfObject::Indirect(object), cycle))
                }
            }
            PdfObject::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                let mut cycle = None;
                for item in items {
                    let (resolved, inner) = self.resolve_value(item, visiting, on_cycle)?;
                    out.push(resolved);
                    cycle = cycle.or(inner);
                }
                Ok((PdfObject::Array(out), cycle))
            }
            PdfObject::Dictionary(dict) => {
                let (dict, cycle) = self.resolve_dict(dict, visiting, on_cycle)?;
                Ok((PdfObject::Dictionary(dict), cycle))
            }
            PdfObject::Stream { dict, data } => {
                let (dict, cycle) = self.resolve_dict(dict, visiting, on_cycle)?;
                Ok((
                    PdfObject::Stream {
                        dict,
                        data: data.clone(),
                    },
                    cycle,
                ))
            }
            other => Ok((other.clone(), None)),
        }
    }

    fn resolve_dict(
        &mut self,
        dict: &Dict,
        visiting: &mut HashSet<ObjId>,
        on_cycle: CyclePolicy,
    ) -> Result<(Dict, Option<ObjId>), ResolveError> {
        let mut out = Dict::new();
        let mut cycle = None;
        for (key, value) in dict.iter() {
            let (resolved, inner) = self.resolve_value(value, visiting, on_cycle)?;
            out.insert(key, resolved);
            cycle = cycle.or(inner);
        }
        Ok((out, cycle))
    }
}

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::Path;

use log::warn;

use crate::lexer::{Lexer, LexicalError, Token};
use crate::objects::{Dict, IndirectObject, ObjId, ObjectTable, PdfObject};
use crate::pages::{self, Page, PageStructureError};
use crate::resolver::Resolver;

// ── Error types ───────────────────────────────────────────────────────────────

/// Grammar-level failures from the file-structure parser.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralError {
    UnexpectedToken {
        expected: &'static str,
        found: String,
        offset: u64,
    },
    UnexpectedEof {
        expected: &'static str,
    },
    /// Object number outside 32 bits or generation outside 16.
    InvalidObjectId {
        object_number: i64,
        generation: i64,
    },
    /// A malformed field in an xref subsection.
    MalformedXref {
        detail: &'static str,
        object_number: Option<u32>,
    },
    /// The file ended without any trailer.
    MissingTrailer,
    /// A mandatory trailer key (`Size`, `Root`) is absent or ill-typed.
    MissingTrailerKey(&'static str),
}

impl std::fmt::Display for StructuralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructuralError::UnexpectedToken {
                expected,
                found,
                offset,
            } => write!(
                f,
                "expected {} but found {} near offset {}",
                expected, found, offset
            ),
            StructuralError::UnexpectedEof { expected } => {
                write!(f, "unexpected end of file while expecting {}", expected)
            }
            StructuralError::InvalidObjectId {
                object_number,
                generation,
            } => write!(
                f,
                "invalid object id {} {}: object numbers are 32-bit, generations 16-bit",
                object_number, generation
            ),
            StructuralError::MalformedXref {
                detail,
                object_number,
            } => match object_number {
                Some(n) => write!(f, "malformed xref entry for object {}: {}", n, detail),
                None => write!(f, "malformed xref section: {}", detail),
            },
            StructuralError::MissingTrailer => write!(f, "no trailer found"),
            StructuralError::MissingTrailerKey(key) => {
                write!(f, "trailer is missing mandatory key /{}", key)
            }
        }
    }
}

impl std::error::Error for StructuralError {}

/// Errors that can occur while parsing a PDF file.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    Lexical(LexicalError),
    Structural(StructuralError),
    /// An I/O error occurred while opening a file.
    Io(String),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Lexical(e) => write!(f, "lexical error: {}", e),
            ReadError::Structural(e) => write!(f, "structural error: {}", e),
            ReadError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<LexicalError> for ReadError {
    fn from(e: LexicalError) -> Self {
        ReadError::Lexical(e)
    }
}

impl From<StructuralError> for ReadError {
    fn from(e: StructuralError) -> Self {
        ReadError::Structural(e)
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e.to_string())
    }
}

// ── Cross-reference table ─────────────────────────────────────────────────────

/// One xref table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefEntry {
    /// Byte offset from the start of the buffer.
    pub offset: u64,
    pub generation: u16,
    /// `n` entries are in use; `f` entries are free.
    pub in_use: bool,
}

/// Maps each object number to its latest xref entry. Successive xref
/// sections merge in file order, later sections shadowing earlier ones.
#[derive(Debug, Default)]
pub struct XrefTable {
    entries: HashMap<u32, XrefEntry>,
}

impl XrefTable {
    pub fn new() -> Self {
        XrefTable {
            entries: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, object_number: u32, entry: XrefEntry) {
        self.entries.insert(object_number, entry);
    }

    pub fn get(&self, object_number: u32) -> Option<&XrefEntry> {
        self.entries.get(&object_number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &XrefEntry)> {
        self.entries.iter()
    }
}

// ── Trailer ───────────────────────────────────────────────────────────────────

/// A parsed trailer dictionary. Multiple trailers exist in incrementally
/// updated files; the last-written one is the authoritative head.
#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    pub size: u32,
    pub root: ObjId,
    pub info: Option<ObjId>,
    pub id: Option<[Vec<u8>; 2]>,
    /// Surfaced for a security handler; never applied by the core.
    pub encrypt: Option<PdfObject>,
    /// Byte offset of the previous revision's xref section.
    pub prev: Option<u64>,
    /// The full trailer dictionary as parsed.
    pub raw: Dict,
}

impl Trailer {
    fn from_dict(raw: Dict) -> Result<Self, StructuralError> {
        let size = raw
            .get("Size")
            .and_then(PdfObject::as_integer)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(StructuralError::MissingTrailerKey("Size"))?;
        let root = raw
            .get("Root")
            .and_then(PdfObject::as_reference)
            .ok_or(StructuralError::MissingTrailerKey("Root"))?;
        let info = raw.get("Info").and_then(PdfObject::as_reference);
        let prev = raw
            .get("Prev")
            .and_then(PdfObject::as_integer)
            .and_then(|n| u64::try_from(n).ok());
        let encrypt = raw.get("Encrypt").cloned();
        let id = raw.get("ID").and_then(PdfObject::as_array).and_then(|a| {
            match (a.first()?.as_string(), a.get(1)?.as_string()) {
                (Some(first), Some(second)) => Some([first.to_vec(), second.to_vec()]),
                _ => None,
            }
        });
        Ok(Trailer {
            size,
            root,
            info,
            id,
            encrypt,
            prev,
            raw,
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// A fully parsed PDF file: version, object table, cross-reference table,
/// and trailer chain. Construction is eager and the result immutable;
/// dereferencing indirect references is the [`Resolver`]'s job.
#[derive(Debug)]
pub struct PdfReader {
    version: String,
    objects: ObjectTable,
    xref: XrefTable,
    trailers: Vec<Trailer>,
    startxref: Option<u64>,
}

impl PdfReader {
    /// Open and parse a PDF from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Parse a PDF from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ReadError> {
        Parser::new(data).parse()
    }

    /// PDF version string from the header (e.g. `"1.7"`).
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub fn xref(&self) -> &XrefTable {
        &self.xref
    }

    /// The authoritative head trailer (the last one written).
    pub fn trailer(&self) -> &Trailer {
        self.trailers.last().expect("parse guarantees a trailer")
    }

    /// All trailers in file order.
    pub fn trailers(&self) -> &[Trailer] {
        &self.trailers
    }

    /// The last `startxref` offset, kept for diagnostics.
    pub fn startxref(&self) -> Option<u64> {
        self.startxref
    }

    /// A fresh resolver view over this file's object table. Resolvers
    /// carry their own cache; make one per consumer.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.objects)
    }

    /// Build the ordered page list by walking the catalog's page tree.
    pub fn pages(&self) -> Result<Vec<Page>, PageStructureError> {
        pages::pages(self)
    }
}

// ── Token source with pushback ────────────────────────────────────────────────

/// Wraps the lexer with the two tokens of lookahead the grammar needs
/// (`int int R` vs `int int obj` vs plain integers).
struct TokenSource<'a> {
    lexer: Lexer<'a>,
    buf: VecDeque<Token>,
}

impl<'a> TokenSource<'a> {
    fn new(data: &'a [u8]) -> Self {
        TokenSource {
            lexer: Lexer::new(data),
            buf: VecDeque::new(),
        }
    }

    fn next(&mut self) -> Result<Token, LexicalError> {
        match self.buf.pop_front() {
            Some(tok) => Ok(tok),
            None => self.lexer.next_token(),
        }
    }

    fn peek(&mut self, n: usize) -> Result<&Token, LexicalError> {
        while self.buf.len() <= n {
            let tok = self.lexer.next_token()?;
            self.buf.push_back(tok);
        }
        Ok(&self.buf[n])
    }

    /// Cursor offset, for error reporting. Points past any buffered
    /// lookahead, so it is approximate by at most a token or two.
    fn offset(&self) -> u64 {
        self.lexer.position()
    }

    fn set_stream_length_hint(&mut self, len: Option<usize>) {
        // A hint is only meaningful when the `stream` keyword has not
        // been lexed yet; clearing (None) is always safe.
        debug_assert!(
            len.is_none() || self.buf.is_empty(),
            "length hint set with buffered tokens"
        );
        self.lexer.set_stream_length_hint(len);
    }
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser<'a> {
    tokens: TokenSource<'a>,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8]) -> Self {
        Parser {
            tokens: TokenSource::new(data),
        }
    }

    /// Parse the whole file: header, then any number of
    /// body / xref / trailer triples until end of tokens.
    fn parse(mut self) -> Result<PdfReader, ReadError> {
        let version = match self.tokens.next()? {
            Token::Header(version) => version,
            _ => return Err(LexicalError::MissingHeader.into()),
        };

        let mut objects = ObjectTable::new();
        let mut xref = XrefTable::new();
        let mut trailers = Vec::new();
        let mut startxref = None;

        loop {
            match self.tokens.next()? {
                Token::Eof => break,
                Token::Integer(num) => {
                    let obj = self.parse_indirect_object(num)?;
                    objects.insert(obj);
                }
                Token::Keyword(ref kw) if kw == "xref" => {
                    self.parse_xref_section(&mut xref)?;
                }
                Token::Keyword(ref kw) if kw == "trailer" => {
                    trailers.push(self.parse_trailer()?);
                }
                Token::Keyword(ref kw) if kw == "startxref" => {
                    startxref = Some(self.expect_offset("startxref offset")?);
                }
                other => {
                    return Err(StructuralError::UnexpectedToken {
                        expected: "indirect object, xref, trailer, or startxref",
                        found: describe(&other),
                        offset: self.tokens.offset(),
                    }
                    .into())
                }
            }
        }

        if trailers.is_empty() {
            return Err(StructuralError::MissingTrailer.into());
        }

        Ok(PdfReader {
            version,
            objects,
            xref,
            trailers,
            startxref,
        })
    }

    /// `num gen obj value [endobj]`, with `num` already consumed.
    fn parse_indirect_object(&mut self, num: i64) -> Result<IndirectObject, ReadError> {
        let gen = match self.tokens.next()? {
            Token::Integer(gen) => gen,
            other => {
                return Err(StructuralError::UnexpectedToken {
                    expected: "generation number",
                    found: describe(&other),
                    offset: self.tokens.offset(),
                }
                .into())
            }
        };
        match self.tokens.next()? {
            Token::ObjStart => {}
            other => {
                return Err(StructuralError::UnexpectedToken {
                    expected: "obj",
                    found: describe(&other),
                    offset: self.tokens.offset(),
                }
                .into())
            }
        }

        let id = match (u32::try_from(num), u16::try_from(gen)) {
            (Ok(n), Ok(g)) => ObjId(n, g),
            _ => {
                return Err(StructuralError::InvalidObjectId {
                    object_number: num,
                    generation: gen,
                }
                .into())
            }
        };

        let value = self.parse_value()?;

        // `endobj` is tolerated missing.
        if matches!(self.tokens.peek(0)?, Token::ObjEnd) {
            self.tokens.next()?;
        }

        Ok(IndirectObject { id, value })
    }

    fn parse_value(&mut self) -> Result<PdfObject, ReadError> {
        let tok = self.tokens.next()?;
        self.parse_value_from(tok)
    }

    fn parse_value_from(&mut self, tok: Token) -> Result<PdfObject, ReadError> {
        match tok {
            Token::Null => Ok(PdfObject::Null),
            Token::Boolean(b) => Ok(PdfObject::Boolean(b)),
            Token::Real(f) => Ok(PdfObject::Real(f)),
            Token::String(bytes) | Token::HexString(bytes) => Ok(PdfObject::String(bytes)),
            Token::Name(name) => Ok(PdfObject::Name(name)),
            Token::Integer(num) => self.parse_integer_or_reference(num),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => self.parse_dict_or_stream(),
            other => Err(StructuralError::UnexpectedToken {
                expected: "object value",
                found: describe(&other),
                offset: self.tokens.offset(),
            }
            .into()),
        }
    }

    /// A window of `k g R` (both integers in range) is an indirect
    /// reference; in any other context an integer stands for itself.
    fn parse_integer_or_reference(&mut self, num: i64) -> Result<PdfObject, ReadError> {
        let gen = match self.tokens.peek(0)? {
            Token::Integer(gen) => *gen,
            _ => return Ok(PdfObject::Integer(num)),
        };
        if matches!(self.tokens.peek(1)?, Token::IndirectRefMarker) {
            if let (Ok(n), Ok(g)) = (u32::try_from(num), u16::try_from(gen)) {
                self.tokens.next()?;
                self.tokens.next()?;
                return Ok(PdfObject::Reference(ObjId(n, g)));
            }
        }
        Ok(PdfObject::Integer(num))
    }

    fn parse_array(&mut self) -> Result<PdfObject, ReadError> {
        let mut items = Vec::new();
        loop {
            match self.tokens.peek(0)? {
                Token::ArrayEnd => {
                    self.tokens.next()?;
                    return Ok(PdfObject::Array(items));
                }
                Token::Eof => {
                    return Err(StructuralError::UnexpectedEof { expected: "]" }.into())
                }
                _ => items.push(self.parse_value()?),
            }
        }
    }

    /// A dictionary, possibly continued by a `stream` payload. The dict's
    /// `/Length` (when a direct integer) bounds the payload; an indirect
    /// `/Length` cannot be dereferenced mid-parse and falls back to the
    /// sentinel scan.
    fn parse_dict_or_stream(&mut self) -> Result<PdfObject, ReadError> {
        let dict = self.parse_dict_body()?;

        let length = match dict.get("Length") {
            Some(PdfObject::Integer(n)) => usize::try_from(*n).ok(),
            Some(PdfObject::Reference(id)) => {
                warn!("stream /Length is an indirect reference ({}); using sentinel scan", id);
                None
            }
            _ => None,
        };

        self.tokens.set_stream_length_hint(length);
        if matches!(self.tokens.peek(0)?, Token::Stream(_)) {
            match self.tokens.next()? {
                Token::Stream(data) => Ok(PdfObject::Stream { dict, data }),
                _ => unreachable!("peeked token changed"),
            }
        } else {
            self.tokens.set_stream_length_hint(None);
            Ok(PdfObject::Dictionary(dict))
        }
    }

    /// Entries after `<<`, through the closing `>>`. Duplicate keys are
    /// last-write-wins.
    fn parse_dict_body(&mut self) -> Result<Dict, ReadError> {
        let mut dict = Dict::new();
        loop {
            match self.tokens.next()? {
                Token::DictEnd => return Ok(dict),
                Token::Name(key) => {
                    let value = self.parse_value()?;
                    dict.insert(key, value);
                }
                Token::Eof => {
                    return Err(StructuralError::UnexpectedEof { expected: ">>" }.into())
                }
                other => {
                    return Err(StructuralError::UnexpectedToken {
                        expected: "name key or >>",
                        found: describe(&other),
                        offset: self.tokens.offset(),
                    }
                    .into())
                }
            }
        }
    }

    /// One or more xref subsections, each `start count` followed by
    /// `count` entries of `offset gen n|f`. Stops before `trailer`.
    fn parse_xref_section(&mut self, xref: &mut XrefTable) -> Result<(), ReadError> {
        loop {
            let start = match self.tokens.peek(0)? {
                Token::Integer(start) => *start,
                _ => return Ok(()),
            };
            self.tokens.next()?;
            let start = u32::try_from(start).map_err(|_| StructuralError::MalformedXref {
                detail: "negative subsection start",
                object_number: None,
            })?;

            let count = match self.tokens.next()? {
                Token::Integer(count) => u32::try_from(count).map_err(|_| {
                    StructuralError::MalformedXref {
                        detail: "subsection count out of range",
                        object_number: None,
                    }
                })?,
                _ => {
                    return Err(StructuralError::MalformedXref {
                        detail: "subsection count is not an integer",
                        object_number: None,
                    }
                    .into())
                }
            };

            for i in 0..count {
                let object_number =
                    start.checked_add(i).ok_or(StructuralError::MalformedXref {
                        detail: "object number overflow in subsection",
                        object_number: None,
                    })?;
                let entry = self.parse_xref_entry(object_number)?;
                xref.insert(object_number, entry);
            }
        }
    }

    fn parse_xref_entry(&mut self, object_number: u32) -> Result<XrefEntry, ReadError> {
        let malformed = |detail| StructuralError::MalformedXref {
            detail,
            object_number: Some(object_number),
        };

        let offset = match self.tokens.next()? {
            Token::Integer(n) => {
                u64::try_from(n).map_err(|_| malformed("negative byte offset"))?
            }
            _ => return Err(malformed("byte offset is not an integer").into()),
        };
        let generation = match self.tokens.next()? {
            Token::Integer(n) => {
                u16::try_from(n).map_err(|_| malformed("generation out of range"))?
            }
            _ => return Err(malformed("generation is not an integer").into()),
        };
        let in_use = match self.tokens.next()? {
            Token::Keyword(ref kw) if kw == "n" => true,
            Token::Keyword(ref kw) if kw == "f" => false,
            _ => return Err(malformed("flag is neither 'n' nor 'f'").into()),
        };

        Ok(XrefEntry {
            offset,
            generation,
            in_use,
        })
    }

    /// `trailer` has been consumed; parse the dictionary that follows.
    /// The `startxref int` pair after it is handled by the main loop.
    fn parse_trailer(&mut self) -> Result<Trailer, ReadError> {
        match self.tokens.next()? {
            Token::DictStart => {}
            other => {
                return Err(StructuralError::UnexpectedToken {
                    expected: "trailer dictionary",
                    found: describe(&other),
                    offset: self.tokens.offset(),
                }
                .into())
            }
        }
        let dict = self.parse_dict_body()?;
        Ok(Trailer::from_dict(dict)?)
    }

    fn expect_offset(&mut self, expected: &'static str) -> Result<u64, ReadError> {
        match self.tokens.next()? {
            Token::Integer(n) if n >= 0 => Ok(n as u64),
            other => Err(StructuralError::UnexpectedToken {
                expected,
                found: describe(&other),
                offset: self.tokens.offset(),
            }
            .into()),
        }
    }
}

/// Short human-readable form of a token for error messages.
fn describe(tok: &Token) -> String {
    match tok {
        Token::Header(v) => format!("header %PDF-{}", v),
        Token::Integer(n) => format!("integer {}", n),
        Token::Real(f) => format!("real {}", f),
        Token::Boolean(b) => format!("boolean {}", b),
        Token::Null => "null".to_string(),
        Token::Name(n) => format!("name /{}", n),
        Token::String(_) => "literal string".to_string(),
        Token::HexString(_) => "hex string".to_string(),
        Token::ArrayStart => "[".to_string(),
        Token::ArrayEnd => "]".to_string(),
        Token::DictStart => "<<".to_string(),
        Token::DictEnd => ">>".to_string(),
        Token::ObjStart => "obj".to_string(),
        Token::ObjEnd => "endobj".to_string(),
        Token::IndirectRefMarker => "R".to_string(),
        Token::Stream(_) => "stream payload".to_string(),
        Token::Keyword(kw) => format!("keyword {}", kw),
        Token::Eof => "end of file".to_string(),
    }
}

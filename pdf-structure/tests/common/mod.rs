#![allow(dead_code)]

//! Fixture builder assembling syntactically valid PDFs with correct xref
//! offsets, so parser tests exercise real file structure instead of
//! hand-counted byte positions.

/// Builds one `body / xref / trailer` revision. `build()` produces a
/// whole file; `append_to()` stacks an incremental update onto an
/// existing one, wiring the trailer's `/Prev` automatically.
pub struct PdfBuilder {
    version: String,
    objects: Vec<(u32, u16, Vec<u8>)>,
    root: (u32, u16),
    trailer_extra: String,
}

impl PdfBuilder {
    pub fn new() -> Self {
        PdfBuilder {
            version: "1.7".to_string(),
            objects: Vec::new(),
            root: (1, 0),
            trailer_extra: String::new(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn root(mut self, num: u32, gen: u16) -> Self {
        self.root = (num, gen);
        self
    }

    /// Raw text appended inside the trailer dictionary.
    pub fn trailer_entry(mut self, raw: &str) -> Self {
        if !self.trailer_extra.is_empty() {
            self.trailer_extra.push(' ');
        }
        self.trailer_extra.push_str(raw);
        self
    }

    /// An indirect object whose body is the given source text.
    pub fn object(mut self, num: u32, gen: u16, body: &str) -> Self {
        self.objects.push((num, gen, body.as_bytes().to_vec()));
        self
    }

    /// A stream object with a correct `/Length` and the given extra
    /// dictionary entries.
    pub fn stream_object(
        mut self,
        num: u32,
        gen: u16,
        dict_entries: &str,
        payload: &[u8],
    ) -> Self {
        let mut body = if dict_entries.is_empty() {
            format!("<< /Length {} >>\nstream\n", payload.len())
        } else {
            format!("<< {} /Length {} >>\nstream\n", dict_entries, payload.len())
        }
        .into_bytes();
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\nendstream");
        self.objects.push((num, gen, body));
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.append_to(Vec::new())
    }

    pub fn append_to(self, mut out: Vec<u8>) -> Vec<u8> {
        let prev = if out.is_empty() {
            None
        } else {
            last_startxref(&out)
        };
        if out.is_empty() {
            out.extend_from_slice(format!("%PDF-{}\n", self.version).as_bytes());
        }

        let mut offsets = Vec::new();
        for (num, gen, body) in &self.objects {
            offsets.push((*num, *gen, out.len() as u64));
            out.extend_from_slice(format!("{} {} obj\n", num, gen).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
        for (num, gen, offset) in &offsets {
            out.extend_from_slice(
                format!("{} 1\n{:010} {:05} n \n", num, offset, gen).as_bytes(),
            );
        }

        let size = self
            .objects
            .iter()
            .map(|(num, _, _)| num + 1)
            .max()
            .unwrap_or(1);
        let mut trailer = format!(
            "trailer\n<< /Size {} /Root {} {} R",
            size, self.root.0, self.root.1
        );
        if let Some(prev) = prev {
            trailer.push_str(&format!(" /Prev {}", prev));
        }
        if !self.trailer_extra.is_empty() {
            trailer.push(' ');
            trailer.push_str(&self.trailer_extra);
        }
        trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF\n", xref_offset));
        out.extend_from_slice(trailer.as_bytes());
        out
    }
}

/// The offset recorded after the last `startxref` keyword.
fn last_startxref(data: &[u8]) -> Option<u64> {
    let keyword = b"startxref";
    let pos = data.windows(keyword.len()).rposition(|w| w == keyword)?;
    let rest = &data[pos + keyword.len()..];
    let digits: Vec<u8> = rest
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .take_while(|b| b.is_ascii_digit())
        .collect();
    std::str::from_utf8(&digits).ok()?.parse().ok()
}

/// 44-byte Helvetica "Hello World" content stream.
pub const HELLO_CONTENT: &[u8] = b"BT /F1 24 Tf 100 700 Td (Hello World) Tj ET\n";

/// A minimal five-object document: catalog, pages, one page, a content
/// stream, and a Helvetica font.
pub fn minimal_document() -> Vec<u8> {
    PdfBuilder::new()
        .object(1, 0, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, 0, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            0,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .stream_object(4, 0, "", HELLO_CONTENT)
        .object(
            5,
            0,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>",
        )
        .build()
}

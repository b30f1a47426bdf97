/*!
 * Structural view of a markup document.
 *
 * A document is read with a streaming XML parser and cut into:
 * - an optional prologue (XML declaration, doctype, leading comments)
 * - the opening wrapper, from the root element through the `<body>` start tag
 * - the ordered content units, i.e. every top-level node inside `<body>`
 * - the closing wrapper, from `</body>` to the end of the document
 *
 * Content units are kept as verbatim source slices, so rendering a document
 * back never rewrites markup inside a unit.
 */

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::errors::StructureError;

/// A document decomposed into wrapper and content units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDocument {
    /// Name used in error messages (source path or task id)
    pub name: String,
    /// Declaration/doctype block, emitted once per rendered document
    pub prologue: Option<String>,
    /// Root element start through the `<body ...>` start tag
    pub header: String,
    /// Top-level nodes inside `<body>`, in document order
    pub units: Vec<String>,
    /// `</body>` through end of document
    pub footer: String,
}

impl MarkupDocument {
    /// Parse `content` into wrapper and content units.
    ///
    /// Fails with a `StructureError` when the parser rejects the markup or when
    /// the `<body>` element cannot be located or is never closed.
    pub fn parse(name: &str, content: &str) -> Result<Self, StructureError> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(false);
        reader.check_end_names(true);
        reader.expand_empty_elements(false);

        let mut depth = 0usize;
        let mut root_start: Option<usize> = None;
        let mut body_depth: Option<usize> = None;
        let mut header_end: Option<usize> = None;
        let mut footer_start: Option<usize> = None;
        let mut unit_start: Option<usize> = None;
        let mut units = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| StructureError::malformed(name, reader.buffer_position(), e.to_string()))?;
            let end = reader.buffer_position();

            // True while reading direct children of <body>
            let at_unit_level = body_depth == Some(depth) && unit_start.is_none();

            match event {
                Event::Start(ref e) => {
                    let start = tag_start(content, end);
                    root_start.get_or_insert(start);
                    depth += 1;

                    if header_end.is_none() && e.local_name().as_ref() == b"body" {
                        body_depth = Some(depth);
                        header_end = Some(end);
                    } else if body_depth.is_some_and(|body| depth == body + 1) {
                        unit_start = Some(start);
                    }
                }
                Event::Empty(_) => {
                    let start = tag_start(content, end);
                    root_start.get_or_insert(start);

                    if at_unit_level {
                        units.push(content[start..end].to_string());
                    }
                }
                Event::End(_) => {
                    if let Some(body) = body_depth {
                        if depth == body + 1 {
                            if let Some(start) = unit_start.take() {
                                units.push(content[start..end].to_string());
                            }
                        } else if depth == body {
                            footer_start = Some(tag_start(content, end));
                            body_depth = None;
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Text(ref t) => {
                    if at_unit_level {
                        let text = String::from_utf8_lossy(t);
                        let text = text.trim();
                        if !text.is_empty() {
                            units.push(text.to_string());
                        }
                    }
                }
                Event::CData(ref t) if at_unit_level => {
                    units.push(format!("<![CDATA[{}]]>", String::from_utf8_lossy(t)));
                }
                Event::Comment(ref t) if at_unit_level => {
                    units.push(format!("<!--{}-->", String::from_utf8_lossy(t)));
                }
                Event::PI(ref t) if at_unit_level => {
                    units.push(format!("<?{}?>", String::from_utf8_lossy(t)));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let header_end = header_end.ok_or_else(|| StructureError::missing_opening(name))?;
        let footer_start = footer_start.ok_or_else(|| StructureError::missing_closing(name))?;
        // A <body> start tag implies at least one start tag was seen
        let root_start = root_start.unwrap_or(0);

        let prologue = content[..root_start].trim();

        Ok(Self {
            name: name.to_string(),
            prologue: (!prologue.is_empty()).then(|| prologue.to_string()),
            header: content[root_start..header_end].to_string(),
            units,
            footer: content[footer_start..].to_string(),
        })
    }

    /// Render this document back to markup
    pub fn to_markup(&self) -> String {
        render(self.prologue.as_deref(), &self.header, &self.units, &self.footer)
    }

    /// Number of content units
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

/// Assemble prologue, wrapper and units into one document.
///
/// Units are newline-joined between the opening and closing wrapper.
pub fn render(prologue: Option<&str>, header: &str, units: &[String], footer: &str) -> String {
    let capacity = prologue.map_or(0, str::len)
        + header.len()
        + footer.len()
        + units.iter().map(|u| u.len() + 1).sum::<usize>()
        + 2;
    let mut out = String::with_capacity(capacity);

    if let Some(prologue) = prologue {
        out.push_str(prologue);
        out.push('\n');
    }
    out.push_str(header);
    out.push('\n');
    for unit in units {
        out.push_str(unit);
        out.push('\n');
    }
    out.push_str(footer);

    out
}

/// Full well-formedness pass: balanced tags, a single root element and no
/// character data outside it.
pub fn check_well_formed(name: &str, content: &str) -> Result<(), StructureError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(false);
    reader.check_end_names(true);

    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| StructureError::malformed(name, reader.buffer_position(), e.to_string()))?;
        let position = reader.buffer_position();

        match event {
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::Empty(_) if depth == 0 => roots += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(ref t) if depth == 0 => {
                if !String::from_utf8_lossy(t).trim().is_empty() {
                    return Err(StructureError::malformed(name, position, "text outside the root element"));
                }
            }
            Event::CData(_) if depth == 0 => {
                return Err(StructureError::malformed(name, position, "CDATA outside the root element"));
            }
            Event::Eof => break,
            _ => {}
        }

        if roots > 1 {
            return Err(StructureError::malformed(name, position, "more than one root element"));
        }
    }

    if depth > 0 {
        return Err(StructureError::malformed(
            name,
            content.len(),
            format!("{} element(s) left unclosed", depth),
        ));
    }
    if roots == 0 {
        return Err(StructureError::malformed(name, content.len(), "no root element"));
    }

    Ok(())
}

/// Offset of the `<` opening the tag that ends at `end`
fn tag_start(content: &str, end: usize) -> usize {
    content[..end].rfind('<').unwrap_or(0)
}

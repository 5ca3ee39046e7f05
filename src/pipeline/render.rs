//! Document rendering: [`QaPair`] list → Markdown or PDF bytes.
//!
//! Both formats share one layout: a title localised by
//! [`OutputLanguage::title`], then per pair a bold numbered question and an
//! indented answer paragraph.
//!
//! The PDF writer uses the standard Helvetica fonts with `WinAnsiEncoding`,
//! so no font file is embedded; characters outside that code page are
//! replaced with `?`. Lines are wrapped with the Helvetica AFM widths and
//! flowed onto as many A4 pages as needed.

use crate::config::{OutputFormat, OutputLanguage};
use crate::error::QaGenError;
use crate::output::QaPair;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ── Markdown ─────────────────────────────────────────────────────────────

/// Render pairs as Markdown.
pub fn render_markdown(pairs: &[QaPair], language: OutputLanguage) -> String {
    let mut md = format!("# {}\n", language.title());
    for (i, pair) in pairs.iter().enumerate() {
        md.push_str(&format!("\n## {}. {}\n", i + 1, pair.question));
        if pair.has_answer() {
            md.push_str(&format!("\n{}\n", pair.answer));
        }
    }
    md
}

// ── PDF layout ───────────────────────────────────────────────────────────

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 72.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const LEADING: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Paragraph style; sizes in points.
#[derive(Debug, Clone, Copy)]
struct Style {
    font: Font,
    size: f32,
    indent: f32,
    space_before: f32,
    space_after: f32,
    centred: bool,
    colour: [f32; 3],
}

const DARK_BLUE: [f32; 3] = [0.0, 0.0, 0.545];
const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

const TITLE: Style = Style {
    font: Font::Bold,
    size: 16.0,
    indent: 0.0,
    space_before: 0.0,
    space_after: 24.0,
    centred: true,
    colour: DARK_BLUE,
};

const QUESTION: Style = Style {
    font: Font::Bold,
    size: 12.0,
    indent: 0.0,
    space_before: 10.0,
    space_after: 6.0,
    centred: false,
    colour: DARK_BLUE,
};

const ANSWER: Style = Style {
    font: Font::Regular,
    size: 10.0,
    indent: 20.0,
    space_before: 0.0,
    space_after: 12.0,
    centred: false,
    colour: BLACK,
};

/// One positioned line of text.
#[derive(Debug, Clone)]
struct PlacedLine {
    font: Font,
    size: f32,
    x: f32,
    y: f32,
    colour: [f32; 3],
    text: String,
}

/// Flows paragraphs top to bottom, opening a new page when one fills up.
struct Layout {
    pages: Vec<Vec<PlacedLine>>,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn paragraph(&mut self, text: &str, style: Style) {
        let at_top = self.cursor >= PAGE_HEIGHT - MARGIN;
        if !at_top {
            self.cursor -= style.space_before;
        }

        let line_height = style.size * LEADING;
        let width = TEXT_WIDTH - style.indent;

        for line in wrap_text(text, style.font, style.size, width) {
            if self.cursor - line_height < MARGIN {
                self.new_page();
            }
            self.cursor -= line_height;

            let x = if style.centred {
                (PAGE_WIDTH - text_width(&line, style.font, style.size)) / 2.0
            } else {
                MARGIN + style.indent
            };

            if let Some(page) = self.pages.last_mut() {
                page.push(PlacedLine {
                    font: style.font,
                    size: style.size,
                    x,
                    y: self.cursor,
                    colour: style.colour,
                    text: line,
                });
            }
        }

        self.cursor -= style.space_after;
    }
}

/// Render pairs as a paginated A4 PDF.
pub fn render_pdf(pairs: &[QaPair], language: OutputLanguage) -> Result<Vec<u8>, QaGenError> {
    let mut layout = Layout::new();
    layout.paragraph(language.title(), TITLE);
    for (i, pair) in pairs.iter().enumerate() {
        layout.paragraph(&format!("{}. {}", i + 1, pair.question), QUESTION);
        layout.paragraph(&pair.answer, ANSWER);
    }
    debug!("Laid out {} pairs on {} pages", pairs.len(), layout.pages.len());

    write_pdf(&layout.pages, language.title())
}

fn write_pdf(pages: &[Vec<PlacedLine>], title: &str) -> Result<Vec<u8>, QaGenError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource_name() => regular_id,
            Font::Bold.resource_name() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let content = Content {
            operations: page_operations(lines),
        };
        let encoded = content
            .encode()
            .map_err(|e| QaGenError::RenderFailed(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::String(b"edgequake-pdf2qa".to_vec(), StringFormat::Literal),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| QaGenError::RenderFailed(e.to_string()))?;
    Ok(buf)
}

fn page_operations(lines: &[PlacedLine]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(lines.len() * 5);
    for line in lines {
        let [r, g, b] = line.colour;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        ops.push(Operation::new(
            "Tf",
            vec![line.font.resource_name().into(), line.size.into()],
        ));
        ops.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(&line.text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

// ── Text measurement ─────────────────────────────────────────────────────

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Helvetica-Bold advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

/// Width used for anything outside ASCII (accented letters are close to it).
const FALLBACK_WIDTH: u16 = 556;

fn char_width(c: char, font: Font) -> u16 {
    let table = match font {
        Font::Regular => &HELVETICA_WIDTHS,
        Font::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    match c as u32 {
        code @ 32..=126 => table[(code - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c, font))).sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap. Words wider than a line are broken by character.
fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if text_width(&candidate, font, size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, font, size) <= max_width {
            current = word.to_string();
        } else {
            for c in word.chars() {
                current.push(c);
                if text_width(&current, font, size) > max_width {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Encode text for a `WinAnsiEncoding` font; unmapped characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\t' => b' ',
            '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

// ── Files ────────────────────────────────────────────────────────────────

/// Render pairs in the requested format.
pub fn render_document(
    pairs: &[QaPair],
    language: OutputLanguage,
    format: OutputFormat,
) -> Result<Vec<u8>, QaGenError> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(pairs, language).into_bytes()),
        OutputFormat::Pdf => render_pdf(pairs, language),
    }
}

/// Append the format's extension when `path` has none.
pub fn ensure_extension(path: &Path, format: OutputFormat) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(format.extension())
    }
}

/// Render and write the document atomically (temp file + rename).
///
/// Parent directories are created as needed.
pub async fn write_document(
    path: &Path,
    pairs: &[QaPair],
    language: OutputLanguage,
    format: OutputFormat,
) -> Result<(), QaGenError> {
    let bytes = render_document(pairs, language, format)?;

    let write_err = |source| QaGenError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!(
        "Wrote {} Q&A pairs to {} ({} bytes)",
        pairs.len(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

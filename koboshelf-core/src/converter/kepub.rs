//! KEPUB converter implementation
//!
//! KEPUB is Kobo's EPUB variant. Text in each content document is wrapped in
//! `koboSpan` elements used for reading position tracking, and the body is
//! wrapped in the `book-columns` / `book-inner` divs the Kobo renderer
//! expects. Everything else in the archive is copied unchanged.

use super::{ConversionOptions, Converter, Hyphenation, Replacement};
use crate::error::ConversionError;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const BOOK_OPEN: &str = r#"<div id="book-columns"><div id="book-inner">"#;
const BOOK_CLOSE: &str = "</div></div>";

const HYPHENATE_CSS: &str =
    "* { -webkit-hyphens: auto !important; hyphens: auto !important; }\n";
const NO_HYPHENATE_CSS: &str =
    "* { -webkit-hyphens: none !important; hyphens: none !important; }\n";
const FULLSCREEN_CSS: &str = "body { margin: 0 !important; padding: 0 !important; }\n\
#book-inner { margin-top: 0 !important; margin-bottom: 0 !important; }\n";

/// Elements that start a new koboSpan paragraph
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "td", "th", "dt", "dd",
    "figcaption", "caption", "section", "article", "aside", "pre",
];

/// Elements whose text is never wrapped
const SKIP_TAGS: &[&str] = &["script", "style", "svg", "math"];

/// Converter producing Kobo kepubs from plain EPUBs
#[derive(Debug, Clone, Default)]
pub struct KepubConverter;

impl KepubConverter {
    pub fn new() -> Self {
        Self
    }

    /// Read every file entry of the source archive into memory
    fn read_entries(&self, input: &Path) -> Result<Vec<(String, Vec<u8>)>, ConversionError> {
        let mut archive = ZipArchive::new(BufReader::new(File::open(input)?))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push((name, data));
        }

        Ok(entries)
    }

    fn write_kepub(
        &self,
        output: &Path,
        entries: &[(String, Vec<u8>)],
        options: &ConversionOptions,
    ) -> Result<(), ConversionError> {
        let stylesheets: HashMap<&str, String> = if options.inline_styles {
            entries
                .iter()
                .filter(|(name, _)| name.to_lowercase().ends_with(".css"))
                .map(|(name, data)| (name.as_str(), String::from_utf8_lossy(data).into_owned()))
                .collect()
        } else {
            HashMap::new()
        };

        let css = injected_css(options);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut writer = ZipWriter::new(BufWriter::new(File::create(output)?));

        // mimetype must be the first entry and uncompressed
        if let Some((_, data)) = entries.iter().find(|(name, _)| name == "mimetype") {
            writer.start_file("mimetype", stored)?;
            writer.write_all(data)?;
        }

        for (name, data) in entries {
            if name == "mimetype" {
                continue;
            }

            writer.start_file(name.as_str(), deflated)?;
            if is_content_document(name) {
                let html = String::from_utf8_lossy(data);
                let processed = self.process_document(name, &html, options, &css, &stylesheets);
                writer.write_all(processed.as_bytes())?;
            } else {
                writer.write_all(data)?;
            }
        }

        let mut inner = writer.finish()?;
        inner.flush()?;
        Ok(())
    }

    /// Rewrite one XHTML document
    fn process_document(
        &self,
        name: &str,
        html: &str,
        options: &ConversionOptions,
        css: &str,
        stylesheets: &HashMap<&str, String>,
    ) -> String {
        let mut html = if options.inline_styles {
            inline_stylesheets(name, html, stylesheets)
        } else {
            html.to_string()
        };

        if !css.is_empty() {
            if let Some(pos) = html.find("</head>") {
                html.insert_str(
                    pos,
                    &format!(
                        "<style type=\"text/css\" class=\"kobostylehacks\">\n{}</style>\n",
                        css
                    ),
                );
            }
        }

        self.add_kobo_spans(&html, &options.replacements)
    }

    /// Wrap body text runs in koboSpans and the body in the book divs
    fn add_kobo_spans(&self, html: &str, replacements: &[Replacement]) -> String {
        let mut result = String::with_capacity(html.len() * 2);
        let mut rest = html;
        let mut in_body = false;
        let mut skip_depth = 0usize;
        let mut paragraph = 0usize;
        let mut segment = 0usize;

        while !rest.is_empty() {
            if let Some(end) = passthrough_end(rest) {
                result.push_str(&rest[..end]);
                rest = &rest[end..];
                continue;
            }

            if rest.starts_with('<') {
                let end = tag_end(rest);
                let tag = &rest[..end];
                let closing = tag.starts_with("</");
                let self_closing = tag.ends_with("/>");
                let name = tag_name(tag);

                if name == "body" && !closing {
                    result.push_str(tag);
                    result.push_str(BOOK_OPEN);
                    in_body = true;
                } else if name == "body" {
                    result.push_str(BOOK_CLOSE);
                    result.push_str(tag);
                    in_body = false;
                } else {
                    if in_body && !closing && BLOCK_TAGS.contains(&name.as_str()) {
                        paragraph += 1;
                        segment = 0;
                    }
                    if SKIP_TAGS.contains(&name.as_str()) {
                        if closing {
                            skip_depth = skip_depth.saturating_sub(1);
                        } else if !self_closing {
                            skip_depth += 1;
                        }
                    }
                    result.push_str(tag);
                }

                rest = &rest[end..];
                continue;
            }

            let end = rest.find('<').unwrap_or(rest.len());
            let text = &rest[..end];
            if in_body && skip_depth == 0 {
                let text = apply_replacements(text, replacements);
                if text.trim().is_empty() {
                    result.push_str(&text);
                } else {
                    segment += 1;
                    result.push_str(&format!(
                        r#"<span class="koboSpan" id="kobo.{}.{}">{}</span>"#,
                        paragraph, segment, text
                    ));
                }
            } else {
                result.push_str(text);
            }
            rest = &rest[end..];
        }

        result
    }
}

impl Converter for KepubConverter {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConversionError> {
        let entries = self.read_entries(input)?;
        let result = self.write_kepub(output, &entries, options);
        if result.is_err() {
            // Don't leave a truncated kepub behind for --update to skip
            let _ = fs::remove_file(output);
        }
        result
    }

    fn name(&self) -> &str {
        "kepub"
    }
}

fn is_content_document(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".xhtml") || lower.ends_with(".html") || lower.ends_with(".htm")
}

/// CSS injected into every content document
fn injected_css(options: &ConversionOptions) -> String {
    let mut css = String::new();
    match options.hyphenation {
        Some(Hyphenation::Force) => css.push_str(HYPHENATE_CSS),
        Some(Hyphenation::Disable) => css.push_str(NO_HYPHENATE_CSS),
        None => {}
    }
    if options.fullscreen_fixes {
        css.push_str(FULLSCREEN_CSS);
    }
    if let Some(extra) = &options.extra_css {
        css.push_str(extra);
        if !extra.ends_with('\n') {
            css.push('\n');
        }
    }
    css
}

fn apply_replacements(text: &str, replacements: &[Replacement]) -> String {
    replacements
        .iter()
        .fold(text.to_string(), |acc, r| acc.replace(&r.find, &r.replace))
}

/// Length of a comment, CDATA section or processing instruction at the start of `s`
fn passthrough_end(s: &str) -> Option<usize> {
    let terminator = if s.starts_with("<!--") {
        "-->"
    } else if s.starts_with("<![CDATA[") {
        "]]>"
    } else if s.starts_with("<?") {
        "?>"
    } else {
        return None;
    };
    Some(
        s.find(terminator)
            .map(|i| i + terminator.len())
            .unwrap_or(s.len()),
    )
}

/// Byte offset just past the `>` closing the tag at the start of `s`
fn tag_end(s: &str) -> usize {
    let mut quote: Option<u8> = None;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
    }
    s.len()
}

/// Lowercase local element name of a tag, without the namespace prefix
fn tag_name(tag: &str) -> String {
    let name: String = tag
        .trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == ':' || *c == '-' || *c == '_')
        .collect();
    name.rsplit(':').next().unwrap_or_default().to_lowercase()
}

/// Compile `pattern` once into `cell`
fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn link_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"(?is)<link\b[^>]*>")
}

fn stylesheet_rel_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r#"(?i)\brel\s*=\s*["']stylesheet["']"#)
}

fn href_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r#"(?i)\bhref\s*=\s*["']([^"']+)["']"#)
}

/// Replace stylesheet links with `<style>` blocks holding the sheet's text
fn inline_stylesheets(document: &str, html: &str, stylesheets: &HashMap<&str, String>) -> String {
    let (Some(link), Some(rel), Some(href)) = (link_regex(), stylesheet_rel_regex(), href_regex())
    else {
        return html.to_string();
    };

    link
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            if !rel.is_match(tag) {
                return tag.to_string();
            }
            let sheet = href
                .captures(tag)
                .map(|found| resolve_href(document, &found[1]))
                .and_then(|path| stylesheets.get(path.as_str()));
            match sheet {
                Some(css) => format!("<style type=\"text/css\">\n{}\n</style>", css),
                None => tag.to_string(),
            }
        })
        .into_owned()
}

/// Resolve an href found in `document` to an archive entry name
fn resolve_href(document: &str, href: &str) -> String {
    let href = href.split(['#', '?']).next().unwrap_or_default();
    let mut parts: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        document
            .rsplit_once('/')
            .map(|(dir, _)| dir.split('/').collect())
            .unwrap_or_default()
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter</title><link rel="stylesheet" type="text/css" href="../Styles/style.css"/></head>
<body>
<h1>Heading</h1>
<p>Hello <em>world</em></p>
<script>var x = 1;</script>
</body>
</html>"#;

    fn write_epub(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_spans_wrap_body_text() {
        let converter = KepubConverter::new();
        let html = converter.add_kobo_spans(CHAPTER, &[]);

        assert!(html.contains(r#"<h1><span class="koboSpan" id="kobo.1.1">Heading</span></h1>"#));
        assert!(html.contains(r#"<p><span class="koboSpan" id="kobo.2.1">Hello </span>"#));
        assert!(html.contains(r#"<em><span class="koboSpan" id="kobo.2.2">world</span></em>"#));
        assert!(html.contains("<script>var x = 1;</script>"));
        assert!(html.contains("<title>Chapter</title>"));
    }

    #[test]
    fn test_body_wrapped_in_book_divs() {
        let converter = KepubConverter::new();
        let html = converter.add_kobo_spans(CHAPTER, &[]);

        assert!(html.contains(&format!("<body>{}", BOOK_OPEN)));
        assert!(html.contains(&format!("{}</body>", BOOK_CLOSE)));
    }

    #[test]
    fn test_whitespace_not_wrapped() {
        let converter = KepubConverter::new();
        let html = converter.add_kobo_spans("<body>\n  <p>  </p>\n</body>", &[]);
        assert!(!html.contains("koboSpan"));
    }

    #[test]
    fn test_replacements_apply_to_body_text() {
        let converter = KepubConverter::new();
        let html = converter.add_kobo_spans(
            "<head><title>teh</title></head><body><p>teh cat</p></body>",
            &[Replacement::new("teh", "the"), Replacement::new("the cat", "a dog")],
        );

        assert!(html.contains("<title>teh</title>"));
        assert!(html.contains(">a dog</span>"));
    }

    #[test]
    fn test_comments_pass_through() {
        let converter = KepubConverter::new();
        let html = converter.add_kobo_spans("<body><!-- <p>note</p> --><p>x</p></body>", &[]);
        assert!(html.contains("<!-- <p>note</p> -->"));
        assert!(html.contains(r#"id="kobo.1.1">x</span>"#));
    }

    #[test]
    fn test_tag_helpers() {
        assert_eq!(tag_name("<p class=\"a\">"), "p");
        assert_eq!(tag_name("</BODY>"), "body");
        assert_eq!(tag_name("<svg:svg>"), "svg");
        assert_eq!(tag_end("<a title=\"x > y\">rest"), 17);
    }

    #[test]
    fn test_stylesheet_patterns_compile() {
        assert!(link_regex().is_some());
        assert!(stylesheet_rel_regex().is_some());
        assert!(href_regex().is_some());
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("OEBPS/Text/ch1.xhtml", "../Styles/style.css"),
            "OEBPS/Styles/style.css"
        );
        assert_eq!(resolve_href("ch1.xhtml", "style.css#x"), "style.css");
        assert_eq!(resolve_href("a/b.xhtml", "/root.css"), "root.css");
    }

    #[test]
    fn test_injected_css() {
        let options = ConversionOptions::new()
            .with_hyphenation(Some(Hyphenation::Disable))
            .with_fullscreen_fixes(true)
            .with_extra_css("p { color: red; }");
        let css = injected_css(&options);

        assert!(css.contains("hyphens: none"));
        assert!(css.contains("#book-inner"));
        assert!(css.ends_with("p { color: red; }\n"));
        assert!(injected_css(&ConversionOptions::new()).is_empty());
    }

    #[test]
    fn test_convert_archive() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("book.epub");
        let output = dir.path().join("book.kepub.epub");
        write_epub(
            &input,
            &[
                ("mimetype", "application/epub+zip"),
                ("OEBPS/Styles/style.css", "p { margin: 0; }"),
                ("OEBPS/Text/ch1.xhtml", CHAPTER),
            ],
        );

        let options = ConversionOptions::new()
            .with_inline_styles(true)
            .with_extra_css("p { color: red; }");
        KepubConverter::new()
            .convert(&input, &output, &options)
            .unwrap();

        let data = fs::read(&output).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        {
            let first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), CompressionMethod::Stored);
        }

        let mut chapter = String::new();
        archive
            .by_name("OEBPS/Text/ch1.xhtml")
            .unwrap()
            .read_to_string(&mut chapter)
            .unwrap();
        assert!(chapter.contains("koboSpan"));
        assert!(chapter.contains("p { margin: 0; }"));
        assert!(!chapter.contains("<link"));
        assert!(chapter.contains("kobostylehacks"));

        let mut css = String::new();
        archive
            .by_name("OEBPS/Styles/style.css")
            .unwrap()
            .read_to_string(&mut css)
            .unwrap();
        assert_eq!(css, "p { margin: 0; }");
    }

    #[test]
    fn test_convert_invalid_archive_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.epub");
        let output = dir.path().join("broken.kepub.epub");
        fs::write(&input, b"not a zip").unwrap();

        let result = KepubConverter::new().convert(&input, &output, &ConversionOptions::new());
        assert!(result.is_err());
        assert!(!output.exists());
    }
}

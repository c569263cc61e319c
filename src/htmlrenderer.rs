//! Implements a custom [`push_html`] on top of [`pulldown_cmark`] events.
//! [`pulldown_cmark::html::push_html`] can't give headings an `id`, which we
//! need so the table of contents (and readers) can link to sections. The
//! renderer buffers the inside of each heading, derives a slug from its text,
//! and records a [`Heading`] for the table of contents.

use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use std::collections::HashSet;
use std::fmt::{self, Display};
use std::io;

struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

struct EscapeHref<'a>(&'a str);

impl Display for EscapeHref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, self.0);
        adaptor.result
    }
}

struct EscapeHtml<'a>(&'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_html(&mut adaptor, self.0);
        adaptor.result
    }
}

/// A heading found while rendering, in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heading {
    /// 1 through 6.
    pub level: u32,

    /// The `id` attribute the heading was rendered with.
    pub id: String,

    /// The heading's plain text (markup stripped, not escaped).
    pub text: String,
}

/// The inside of a heading that hasn't been closed yet.
struct OpenHeading {
    level: u32,
    html: String,
    text: String,
}

enum TableState {
    Head,
    Body,
}

/// Renders markdown [`Event`]s into HTML. This is largely modeled after
/// [`pulldown_cmark`]'s private `HtmlWriter` struct.
struct HtmlRenderer {
    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    /// Non-zero while inside of an image; text goes to the `alt` attribute.
    image_depth: usize,

    heading: Option<OpenHeading>,
    headings: Vec<Heading>,
    used_ids: HashSet<String>,
}

impl<'a> HtmlRenderer {
    fn new() -> Self {
        HtmlRenderer {
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            image_depth: 0,
            heading: None,
            headings: Vec::new(),
            used_ids: HashSet::new(),
        }
    }

    fn on_event<W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        match self.heading.take() {
            None => self.on_event_direct(w, event),
            Some(heading) => {
                if let Event::End(Tag::Heading(_)) = event {
                    return self.close_heading(w, heading);
                }
                let mut heading = heading;
                match &event {
                    Event::Text(text) | Event::Code(text) => heading.text.push_str(text),
                    _ => {}
                }
                let result = self.on_event_direct(&mut heading.html, event);
                self.heading = Some(heading);
                result
            }
        }
    }

    fn on_event_direct<W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        if self.image_depth > 0 {
            return self.on_image_alt_event(w, event);
        }
        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => self.on_code(w, code),
            Event::FootnoteReference(name) => write!(
                w,
                r##"<sup class="footnote-reference" id="fnref-{}"><a href="#fn-{}">{}</a></sup>"##,
                EscapeHtml(&name),
                EscapeHtml(&name),
                EscapeHtml(&name),
            ),
            Event::HardBreak => w.write_str("<br />\n"),
            Event::Html(html) => w.write_str(&html),
            Event::Rule => w.write_str("<hr />\n"),
            Event::SoftBreak => w.write_str("\n"),
            Event::TaskListMarker(checked) => write!(
                w,
                r#"<input disabled="" type="checkbox" {}/>"#,
                match checked {
                    true => r#"checked="" "#,
                    false => "",
                }
            ),
            Event::Text(text) => escape_html(w, &text),
        }
    }

    /// Inside of an image only the text matters; it becomes the alt text.
    fn on_image_alt_event<W: StrWrite>(&mut self, w: &mut W, event: Event<'a>) -> io::Result<()> {
        match event {
            Event::Start(Tag::Image(..)) => {
                self.image_depth += 1;
                Ok(())
            }
            Event::End(Tag::Image(_, _, title)) => {
                self.image_depth -= 1;
                if self.image_depth > 0 {
                    return Ok(());
                }
                if title.is_empty() {
                    w.write_str(r#"" />"#)
                } else {
                    write!(w, r#"" title="{}" />"#, EscapeHtml(&title))
                }
            }
            Event::Text(text) | Event::Code(text) => escape_html(w, &text),
            _ => Ok(()),
        }
    }

    fn on_start<W: StrWrite>(&mut self, w: &mut W, tag: Tag<'a>) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("<blockquote>\n"),
            Tag::CodeBlock(kind) => match kind {
                CodeBlockKind::Fenced(info) => match info.split(' ').next() {
                    Some(lang) if !lang.is_empty() => {
                        write!(w, r#"<pre><code class="language-{}">"#, EscapeHtml(lang))
                    }
                    _ => w.write_str("<pre><code>"),
                },
                CodeBlockKind::Indented => w.write_str("<pre><code>"),
            },
            Tag::Emphasis => w.write_str("<em>"),
            Tag::FootnoteDefinition(name) => write!(
                w,
                r#"<div class="footnote-definition" id="fn-{}"><sup class="footnote-definition-label">{}</sup>"#,
                EscapeHtml(&name),
                EscapeHtml(&name),
            ),
            Tag::Heading(level) => {
                self.heading = Some(OpenHeading {
                    level,
                    html: String::new(),
                    text: String::new(),
                });
                Ok(())
            }
            Tag::Image(_link_type, dest, _title) => {
                self.image_depth += 1;
                write!(w, r#"<img src="{}" alt=""#, EscapeHref(&dest))
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link(LinkType::Email, dest, title) => {
                write!(w, r#"<a href="mailto:{}""#, EscapeHref(&dest))?;
                self.on_link_title(w, &title)
            }
            Tag::Link(_link_type, dest, title) => {
                write!(w, r#"<a href="{}""#, EscapeHref(&dest))?;
                self.on_link_title(w, &title)
            }
            Tag::List(None) => w.write_str("<ul>\n"),
            Tag::List(Some(1)) => w.write_str("<ol>\n"),
            Tag::List(Some(start)) => write!(w, "<ol start=\"{}\">\n", start),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" align="left""#,
                    Some(Alignment::Right) => r#" align="right""#,
                    Some(Alignment::Center) => r#" align="center""#,
                    _ => "",
                }
            ),
        }
    }

    fn on_link_title<W: StrWrite>(&mut self, w: &mut W, title: &str) -> io::Result<()> {
        if title.is_empty() {
            w.write_str(">")
        } else {
            write!(w, r#" title="{}">"#, EscapeHtml(title))
        }
    }

    fn on_end<W: StrWrite>(&mut self, w: &mut W, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>\n"),
            Tag::CodeBlock(_) => w.write_str("</code></pre>\n"),
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>\n"),
            // closed in `close_heading`
            Tag::Heading(_) => Ok(()),
            // closed in `on_image_alt_event`
            Tag::Image(_, _, _) => Ok(()),
            Tag::Item => w.write_str("</li>\n"),
            Tag::Link(_, _, _) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>\n"),
            Tag::List(None) => w.write_str("</ul>\n"),
            Tag::Paragraph => w.write_str("</p>\n"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => w.write_str("</tbody></table>\n"),
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>")
            }
            Tag::TableRow => w.write_str("</tr>"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }

    fn on_code<W: StrWrite>(&mut self, w: &mut W, s: CowStr) -> io::Result<()> {
        write!(w, "<code>{}</code>", EscapeHtml(&s))
    }

    fn close_heading<W: StrWrite>(&mut self, w: &mut W, heading: OpenHeading) -> io::Result<()> {
        let id = self.unique_id(&heading.text);
        write!(
            w,
            "<h{level} id=\"{id}\">{html}</h{level}>\n",
            level = heading.level,
            id = EscapeHtml(&id),
            html = heading.html,
        )?;
        self.headings.push(Heading {
            level: heading.level,
            id,
            text: heading.text,
        });
        Ok(())
    }

    /// Slugifies `text` and appends `-1`, `-2`, ... until the id hasn't been
    /// handed out yet.
    fn unique_id(&mut self, text: &str) -> String {
        let mut base = slug::slugify(text);
        if base.is_empty() {
            base = "section".to_owned();
        }
        let mut id = base.clone();
        let mut n = 0;
        while self.used_ids.contains(&id) {
            n += 1;
            id = format!("{}-{}", base, n);
        }
        self.used_ids.insert(id.clone());
        id
    }
}

/// Converts [`Event`]s into an HTML string much like
/// `pulldown_cmark::html::push_html` except that every heading gets an `id`.
/// Returns the headings in document order.
pub fn push_html<'a, I>(out: &mut String, events: I) -> io::Result<Vec<Heading>>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = HtmlRenderer::new();
    for event in events {
        renderer.on_event(out, event)?;
    }
    Ok(renderer.headings)
}

/// Renders `headings` as a nested list of links wrapped in
/// `<div class="toc">`. Returns an empty string when there are no headings.
pub fn toc_html(headings: &[Heading]) -> String {
    if headings.is_empty() {
        return String::new();
    }

    let mut out = String::from(r#"<div class="toc">"#);
    let mut open: Vec<u32> = Vec::new();
    for heading in headings {
        match open.last() {
            Some(&top) if heading.level <= top => {
                while let Some(&top) = open.last() {
                    if top <= heading.level {
                        break;
                    }
                    out.push_str("</li></ul>");
                    open.pop();
                }
                match open.last() {
                    Some(&top) if top == heading.level => out.push_str("</li>"),
                    _ => {
                        out.push_str("<ul>");
                        open.push(heading.level);
                    }
                }
            }
            _ => {
                out.push_str("<ul>");
                open.push(heading.level);
            }
        }
        out.push_str(&format!(
            r##"<li><a href="#{}">{}</a>"##,
            EscapeHtml(&heading.id),
            EscapeHtml(&heading.text)
        ));
    }
    for _ in open {
        out.push_str("</li></ul>");
    }
    out.push_str("</div>");
    out
}

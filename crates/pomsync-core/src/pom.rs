//! Owned XML tree for a POM file.
//!
//! The tree keeps everything the reconcilers do not touch (comments, attributes,
//! namespace declarations, unrelated elements) so a rewrite only changes what a
//! descriptor asks for. Whitespace between elements is treated as formatting: it
//! is dropped on parse and regenerated on render with the indent unit detected
//! from the source.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const DEFAULT_INDENT: &str = "    ";
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Qualified name as written in the source, e.g. `dependency` or `pom:dependency`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// A fresh element in this element's namespace, reusing its prefix.
    pub fn new_child(&self, local: &str) -> Element {
        let name = match self.prefix() {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        };
        Element {
            name,
            namespace: self.namespace.clone(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn is_child_named(&self, child: &Element, local: &str) -> bool {
        child.local_name() == local && child.namespace == self.namespace
    }

    /// Direct child elements named `local` in this element's namespace, with
    /// their positions among all child nodes.
    pub fn indexed_children<'a>(
        &'a self,
        local: &'a str,
    ) -> impl Iterator<Item = (usize, &'a Element)> + 'a {
        self.children
            .iter()
            .enumerate()
            .filter_map(move |(idx, node)| match node {
                Node::Element(el) if self.is_child_named(el, local) => Some((idx, el)),
                _ => None,
            })
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    fn child_index(&self, local: &str) -> Option<usize> {
        self.indexed_children(local).map(|(idx, _)| idx).next()
    }

    pub fn find(&self, local: &str) -> Option<&Element> {
        let idx = self.child_index(local)?;
        match self.children.get(idx) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn find_mut(&mut self, local: &str) -> Option<&mut Element> {
        let idx = self.child_index(local)?;
        self.element_at_mut(idx)
    }

    pub fn element_at_mut(&mut self, idx: usize) -> Option<&mut Element> {
        match self.children.get_mut(idx) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Concatenated text and CDATA content, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out.trim().to_string()
    }

    /// Text of the first child named `local`; `None` when there is no such child.
    pub fn child_text(&self, local: &str) -> Option<String> {
        self.find(local).map(Element::text)
    }

    pub fn set_text(&mut self, text: &str) {
        self.children
            .retain(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
        self.children.insert(0, Node::Text(text.to_string()));
    }

    pub fn remove_node(&mut self, idx: usize) -> Option<Node> {
        if idx < self.children.len() {
            Some(self.children.remove(idx))
        } else {
            None
        }
    }

    /// Removes every child named `local`; returns how many were removed.
    pub fn remove_children(&mut self, local: &str) -> usize {
        let before = self.children.len();
        let namespace = self.namespace.clone();
        self.children.retain(|node| match node {
            Node::Element(el) => !(el.local_name() == local && el.namespace == namespace),
            _ => true,
        });
        before - self.children.len()
    }

    /// Inserts `child` relative to its siblings according to `order`: before the
    /// first sibling that sorts after it, else after the last sibling that sorts
    /// before it, else at the end. Siblings not listed in `order` are ignored
    /// when picking the slot. Returns the node index of the inserted child.
    pub fn insert_ordered(&mut self, child: Element, order: &[&str]) -> usize {
        let idx = self.ordered_slot(child.local_name(), order);
        self.children.insert(idx, Node::Element(child));
        idx
    }

    fn ordered_slot(&self, local: &str, order: &[&str]) -> usize {
        let Some(rank) = order.iter().position(|name| *name == local) else {
            return self.children.len();
        };
        let rank_of = |node: &Node| match node {
            Node::Element(el) if el.namespace == self.namespace => {
                order.iter().position(|name| *name == el.local_name())
            }
            _ => None,
        };

        if let Some(idx) = self
            .children
            .iter()
            .position(|node| rank_of(node).is_some_and(|r| r > rank))
        {
            return idx;
        }
        if let Some(idx) = self
            .children
            .iter()
            .rposition(|node| rank_of(node).is_some_and(|r| r <= rank))
        {
            return idx + 1;
        }
        self.children.len()
    }

    /// Replaces the text of the first child named `local`, creating the child at
    /// its ordered position if it does not exist.
    pub fn set_child_text(&mut self, local: &str, text: &str, order: &[&str]) {
        if let Some(child) = self.find_mut(local) {
            child.set_text(text);
            return;
        }
        let mut child = self.new_child(local);
        child.set_text(text);
        self.insert_ordered(child, order);
    }

    /// Returns the first child named `local`, creating it at its ordered position
    /// when absent. The flag is true when the child was created.
    pub fn ensure_child(&mut self, local: &str, order: &[&str]) -> (&mut Element, bool) {
        let (idx, created) = match self.child_index(local) {
            Some(idx) => (idx, false),
            None => {
                let child = self.new_child(local);
                (self.insert_ordered(child, order), true)
            }
        };
        match &mut self.children[idx] {
            Node::Element(el) => (el, created),
            _ => unreachable!("child index always points at an element"),
        }
    }

    pub fn push_element(&mut self, child: Element) -> usize {
        self.children.push(Node::Element(child));
        self.children.len() - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDocument {
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
    indent: String,
}

impl PomDocument {
    pub fn parse(src: &str) -> Result<Self> {
        let mut reader = Reader::from_str(src);
        let mut stack: Vec<Element> = Vec::new();
        let mut scopes: Vec<Vec<(String, String)>> = Vec::new();
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => bail!("malformed XML at byte {}: {err}", reader.error_position()),
            };
            match event {
                Event::Start(e) => {
                    let el = open_element(&e, &mut scopes)?;
                    stack.push(el);
                }
                Event::Empty(e) => {
                    let el = open_element(&e, &mut scopes)?;
                    scopes.pop();
                    attach(el, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let mut el = stack.pop().context("unbalanced closing tag")?;
                    scopes.pop();
                    drop_formatting_whitespace(&mut el);
                    attach(el, &mut stack, &mut root)?;
                }
                Event::Text(e) => {
                    let text = e.unescape().context("decode XML text")?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                        None if text.trim().is_empty() => {}
                        None => bail!("text outside the root element: {:?}", text.trim()),
                    }
                }
                Event::CData(e) => {
                    let text = utf8(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::CData(text)),
                        None => bail!("CDATA outside the root element"),
                    }
                }
                Event::Comment(e) => {
                    let node = Node::Comment(utf8(&e)?);
                    place_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
                }
                Event::PI(e) => {
                    let node = Node::ProcessingInstruction(utf8(&e)?);
                    place_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
                }
                Event::DocType(e) => {
                    prolog.push(Node::DocType(utf8(&e)?.trim().to_string()));
                }
                Event::Decl(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            bail!("unclosed element <{}>", open.name);
        }
        let root = root.context("document has no root element")?;
        Ok(Self {
            prolog,
            root,
            epilog,
            indent: detect_indent(src),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("read POM: {}", path.display()))?;
        Self::parse(&src).with_context(|| format!("parse POM: {}", path.display()))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(XML_DECLARATION);
        out.push('\n');
        for node in &self.prolog {
            write_node(&mut out, node, 0, &self.indent);
        }
        write_element(&mut out, &self.root, 0, &self.indent);
        for node in &self.epilog {
            write_node(&mut out, node, 0, &self.indent);
        }
        out
    }

    /// Renders to a sibling temp file and renames it over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .with_context(|| format!("POM path has no file name: {}", path.display()))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        std::fs::write(&tmp, self.render().as_bytes())
            .with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    let s = std::str::from_utf8(bytes).context("XML is not valid UTF-8")?;
    Ok(s.to_string())
}

fn open_element(e: &BytesStart<'_>, scopes: &mut Vec<Vec<(String, String)>>) -> Result<Element> {
    let name = utf8(e.name().as_ref())?;
    let mut attributes = Vec::new();
    let mut scope = Vec::new();
    for attr in e.attributes() {
        let attr = attr.with_context(|| format!("malformed attribute on <{name}>"))?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr
            .unescape_value()
            .with_context(|| format!("decode attribute {key} on <{name}>"))?
            .into_owned();
        if key == "xmlns" {
            scope.push((String::new(), value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.push((prefix.to_string(), value.clone()));
        }
        attributes.push((key, value));
    }
    scopes.push(scope);

    let prefix = name.split_once(':').map_or("", |(prefix, _)| prefix);
    let namespace = scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter())
        .find(|(bound, _)| bound == prefix)
        .map(|(_, uri)| uri.clone())
        .filter(|uri| !uri.is_empty());
    if namespace.is_none() && !prefix.is_empty() && prefix != "xml" {
        bail!("undeclared namespace prefix {prefix:?} on <{name}>");
    }

    Ok(Element {
        name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn attach(el: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        bail!("document has more than one root element (second is <{}>)", el.name);
    }
    *root = Some(el);
    Ok(())
}

fn place_misc(
    node: Node,
    stack: &mut [Element],
    root: &Option<Element>,
    prolog: &mut Vec<Node>,
    epilog: &mut Vec<Node>,
) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => prolog.push(node),
        None => epilog.push(node),
    }
}

fn drop_formatting_whitespace(el: &mut Element) {
    let structured = el
        .children
        .iter()
        .any(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
    if structured {
        el.children
            .retain(|node| !matches!(node, Node::Text(t) if t.trim().is_empty()));
    }
}

fn detect_indent(src: &str) -> String {
    for line in src.lines() {
        let body = line.trim_start_matches([' ', '\t']);
        if body.len() < line.len() && body.starts_with('<') {
            return line[..line.len() - body.len()].to_string();
        }
    }
    DEFAULT_INDENT.to_string()
}

fn pad(out: &mut String, depth: usize, indent: &str) {
    for _ in 0..depth {
        out.push_str(indent);
    }
}

fn write_element(out: &mut String, el: &Element, depth: usize, indent: &str) {
    pad(out, depth, indent);
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attributes {
        let _ = write!(out, " {key}=\"{}\"", quick_xml::escape::escape(value.as_str()));
    }
    if el.children.is_empty() {
        out.push_str("/>\n");
        return;
    }

    let inline = el
        .children
        .iter()
        .all(|node| matches!(node, Node::Text(_) | Node::CData(_)));
    if inline {
        out.push('>');
        for node in &el.children {
            match node {
                Node::Text(t) => out.push_str(&quick_xml::escape::partial_escape(t.as_str())),
                Node::CData(t) => {
                    let _ = write!(out, "<![CDATA[{t}]]>");
                }
                _ => {}
            }
        }
    } else {
        out.push_str(">\n");
        for node in &el.children {
            write_node(out, node, depth + 1, indent);
        }
        pad(out, depth, indent);
    }
    let _ = writeln!(out, "</{}>", el.name);
}

fn write_node(out: &mut String, node: &Node, depth: usize, indent: &str) {
    match node {
        Node::Element(el) => write_element(out, el, depth, indent),
        Node::Text(t) => {
            let t = t.trim();
            if t.is_empty() {
                return;
            }
            pad(out, depth, indent);
            out.push_str(&quick_xml::escape::partial_escape(t));
            out.push('\n');
        }
        Node::CData(t) => {
            pad(out, depth, indent);
            let _ = writeln!(out, "<![CDATA[{t}]]>");
        }
        Node::Comment(c) => {
            pad(out, depth, indent);
            let _ = writeln!(out, "<!--{c}-->");
        }
        Node::ProcessingInstruction(p) => {
            pad(out, depth, indent);
            let _ = writeln!(out, "<?{p}?>");
        }
        Node::DocType(d) => {
            pad(out, depth, indent);
            let _ = writeln!(out, "<!DOCTYPE {d}>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<!-- project descriptor -->
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
  xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <artifactId>all</artifactId>
  <!-- keep this -->
  <properties>
    <note>a &amp; b</note>
    <empty/>
  </properties>
</project>
"#;

    #[test]
    fn parse_resolves_default_namespace() {
        let doc = PomDocument::parse(POM).expect("parse");
        let root = doc.root();
        assert_eq!(root.local_name(), "project");
        assert_eq!(root.namespace(), Some(crate::POM_NAMESPACE));
        let props = root.find("properties").expect("properties");
        assert_eq!(props.namespace(), Some(crate::POM_NAMESPACE));
        assert_eq!(props.child_text("note").as_deref(), Some("a & b"));
        assert_eq!(props.child_text("empty").as_deref(), Some(""));
        assert_eq!(props.child_text("missing"), None);
        assert_eq!(doc.indent(), "  ");
    }

    #[test]
    fn found_child_outlives_lookup_name() {
        let doc = PomDocument::parse(POM).expect("parse");
        let props = {
            let name = String::from("properties");
            doc.root().find(&name)
        };
        assert_eq!(
            props.and_then(|p| p.child_text("note")).as_deref(),
            Some("a & b")
        );
    }

    #[test]
    fn render_keeps_comments_and_escapes() {
        let doc = PomDocument::parse(POM).expect("parse");
        let out = doc.render();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- project descriptor -->\n<project "));
        assert!(out.contains("\n  <!-- keep this -->\n"), "{out}");
        assert!(out.contains("    <note>a &amp; b</note>\n"), "{out}");
        assert!(out.contains("    <empty/>\n"), "{out}");
        assert!(out.ends_with("</project>\n"));
    }

    #[test]
    fn render_is_stable_after_one_pass() {
        let first = PomDocument::parse(POM).expect("parse").render();
        let second = PomDocument::parse(&first).expect("reparse").render();
        assert_eq!(first, second);
    }

    #[test]
    fn new_children_reuse_parent_prefix() {
        let src = r#"<pom:project xmlns:pom="http://maven.apache.org/POM/4.0.0"><pom:dependencies/></pom:project>"#;
        let mut doc = PomDocument::parse(src).expect("parse");
        let deps = doc.root_mut().find_mut("dependencies").expect("deps");
        deps.set_child_text("dependency", "x", &[]);
        assert_eq!(doc.indent(), DEFAULT_INDENT);
        let out = doc.render();
        assert!(out.contains("<pom:dependency>x</pom:dependency>"), "{out}");
    }

    #[test]
    fn foreign_namespace_children_are_not_matched() {
        let src = r#"<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:x="urn:other"><x:dependencies/></project>"#;
        let doc = PomDocument::parse(src).expect("parse");
        assert!(doc.root().find("dependencies").is_none());
    }

    #[test]
    fn insert_ordered_places_between_known_siblings() {
        let src = "<dependency><groupId>g</groupId><artifactId>a</artifactId><scope>provided</scope><exclusions/></dependency>";
        let mut doc = PomDocument::parse(src).expect("parse");
        let order = ["groupId", "artifactId", "version", "type", "scope"];
        let dep = doc.root_mut();
        dep.set_child_text("version", "1.0", &order);
        dep.set_child_text("type", "zip", &order);
        let names: Vec<&str> = dep.child_elements().map(Element::local_name).collect();
        assert_eq!(
            names,
            vec!["groupId", "artifactId", "version", "type", "scope", "exclusions"]
        );
    }

    #[test]
    fn ensure_child_reports_creation() {
        let mut doc = PomDocument::parse("<a><b/></a>").expect("parse");
        let (_, created) = doc.root_mut().ensure_child("b", &[]);
        assert!(!created);
        let (c, created) = doc.root_mut().ensure_child("c", &[]);
        assert!(created);
        c.set_text("v");
        assert_eq!(doc.root().child_text("c").as_deref(), Some("v"));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(PomDocument::parse("<a><b></a>").is_err());
        assert!(PomDocument::parse("<a/><b/>").is_err());
        assert!(PomDocument::parse("   ").is_err());
        assert!(PomDocument::parse("<x:a/>").is_err());
    }

    #[test]
    fn save_replaces_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pom.xml");
        std::fs::write(&path, POM).expect("write");
        let mut doc = PomDocument::load(&path).expect("load");
        doc.root_mut()
            .set_child_text("packaging", "content-package", &[]);
        doc.save(&path).expect("save");

        let reloaded = PomDocument::load(&path).expect("reload");
        assert_eq!(
            reloaded.root().child_text("packaging").as_deref(),
            Some("content-package")
        );
        assert!(!dir.path().join("pom.xml.tmp").exists());
    }
}

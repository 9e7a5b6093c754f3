//! Minimal XML element tree used by the package writer.
//!
//! OOXML part generation builds a tree of elements and serializes it once at
//! the end; escaping lives here so the part-shape code never handles it.

/// An XML element: tag, attributes in insertion order, children.
#[derive(Clone, Debug, Default)]
pub struct XmlElement {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<XmlNode>,
}

/// A node in the tree: either a child element or a text run.
#[derive(Clone, Debug)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    pub fn new(tag: &'static str) -> Self {
        XmlElement {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute (builder style).
    pub fn attr<V: Into<String>>(mut self, key: &'static str, value: V) -> Self {
        self.attrs.push((key, value.into()));
        self
    }

    /// Add a child element (builder style).
    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Add a text child (builder style).
    pub fn text<S: Into<String>>(mut self, text: S) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Append a child element in place.
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Serialize the tree to a document string with the standard declaration.
    pub fn to_document(&self) -> String {
        let mut out =
            String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n");
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(value, out);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_into(out),
                XmlNode::Text(t) => escape_into(t, out),
            }
        }
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }
}

/// Escape the five XML-reserved characters into `out`.
fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_element_self_closes() {
        let e = XmlElement::new("dimension").attr("ref", "A1:B2");
        assert!(e.to_document().ends_with("<dimension ref=\"A1:B2\"/>"));
    }

    #[test]
    fn test_nested_elements_and_text() {
        let e = XmlElement::new("si").child(XmlElement::new("t").text("a<b&c"));
        assert!(e
            .to_document()
            .ends_with("<si><t>a&lt;b&amp;c</t></si>"));
    }

    #[test]
    fn test_attribute_escaping() {
        let e = XmlElement::new("sheet").attr("name", "R\"D & Co");
        assert!(e.to_document().contains("name=\"R&quot;D &amp; Co\""));
    }
}

use std::fmt::Write as _;

use itertools::Itertools as _;

use crate::error::ConfigError;
use crate::model::Workload;

const XML_DECLARATION: &str = "<?xml version='1.0' encoding='us-ascii'?>";
const INDENT: &str = "  ";

/// A node of the generated profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    children: Vec<Element>,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn attribute(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }

    fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(&'static str, String)] {
        &self.attributes
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    fn render(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        out.push('<');
        out.push_str(self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_attribute(out, value);
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str(" />\n");
            return;
        }

        out.push_str(">\n");
        for child in &self.children {
            child.render(out, depth + 1);
        }
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        out.push_str("</");
        out.push_str(self.name);
        out.push_str(">\n");
    }
}

/// Escape an attribute value for a US-ASCII document.
///
/// Anything outside ASCII becomes a decimal character reference.
fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#09;"),
            c if c.is_ascii() => out.push(c),
            c => {
                let _ = write!(out, "&#{};", c as u32);
            }
        }
    }
}

/// The uperf profile for a [`Workload`].
///
/// uperf only accepts indented profiles that end with a newline, so the rendered form is fixed:
/// an XML declaration, two spaces per nesting level and a single newline after `</profile>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDocument {
    root: Element,
}

impl ProfileDocument {
    /// Build the profile tree for a workload.
    pub fn emit(workload: &Workload) -> Result<Self, ConfigError> {
        workload.validate()?;

        let mut root = Element::new("profile").attribute("name", workload.name.as_str());
        for group in &workload.groups {
            let (key, value) = group.concurrency.attribute();
            let mut group_element = Element::new("group").attribute(key, value);

            for transaction in &group.transactions {
                let (key, value) = transaction.termination.attribute();
                let mut transaction_element = Element::new("transaction").attribute(key, value);

                for operation in &transaction.operations {
                    let mut flowop = Element::new("flowop").attribute("type", operation.kind.as_str());
                    if !operation.options.is_empty() {
                        flowop = flowop.attribute("options", operation.options.iter().join(" "));
                    }
                    transaction_element = transaction_element.child(flowop);
                }

                group_element = group_element.child(transaction_element);
            }

            root = root.child(group_element);
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Render the document as text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(XML_DECLARATION);
        out.push('\n');
        self.root.render(&mut out, 0);
        out
    }

    /// Writes the rendered document to a writer.
    pub fn write<W>(&self, mut writer: W) -> std::io::Result<()>
    where
        W: std::io::Write,
    {
        writer.write_all(self.render().as_bytes())?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Group, Operation, Transaction};

    fn tcp_stream() -> Workload {
        Workload::new("tcp-stream")
            .with_group(
                Group::threads(4)
                    .with_transaction(
                        Transaction::iterations(1).with_operation(
                            Operation::new("connect")
                                .with_option("remotehost", "127.0.0.1")
                                .with_option("protocol", "tcp"),
                        ),
                    )
                    .with_transaction(
                        Transaction::duration("30s")
                            .with_operation(Operation::new("write").with_option("size", 16384)),
                    ),
            )
            .with_group(
                Group::processes(1).with_transaction(
                    Transaction::rate(1000).with_operation(Operation::new("disconnect")),
                ),
            )
    }

    #[test]
    fn renders_indented_profile() {
        let document = ProfileDocument::emit(&tcp_stream()).expect("failed to emit profile");

        let expected = r#"<?xml version='1.0' encoding='us-ascii'?>
<profile name="tcp-stream">
  <group nthreads="4">
    <transaction iterations="1">
      <flowop type="connect" options="remotehost=127.0.0.1 protocol=tcp" />
    </transaction>
    <transaction duration="30s">
      <flowop type="write" options="size=16384" />
    </transaction>
  </group>
  <group nprocs="1">
    <transaction rate="1000">
      <flowop type="disconnect" />
    </transaction>
  </group>
</profile>
"#;
        assert_eq!(document.render(), expected);
    }

    #[test]
    fn tree_keeps_order_and_single_attributes() {
        let workload = tcp_stream();
        let document = ProfileDocument::emit(&workload).expect("failed to emit profile");
        let root = document.root();

        assert_eq!(root.name(), "profile");
        assert_eq!(root.get("name"), Some("tcp-stream"));
        assert_eq!(root.children().len(), workload.groups.len());

        for (group, group_element) in workload.groups.iter().zip(root.children()) {
            assert_eq!(group_element.attributes().len(), 1);
            let (key, value) = group.concurrency.attribute();
            assert_eq!(group_element.get(key), Some(value.as_str()));

            for (transaction, transaction_element) in
                group.transactions.iter().zip(group_element.children())
            {
                assert_eq!(transaction_element.attributes().len(), 1);
                let (key, value) = transaction.termination.attribute();
                assert_eq!(transaction_element.get(key), Some(value.as_str()));

                let kinds = transaction_element
                    .children()
                    .iter()
                    .map(|flowop| flowop.get("type").unwrap_or_default())
                    .collect::<Vec<_>>();
                let expected_kinds = transaction
                    .operations
                    .iter()
                    .map(|operation| operation.kind.as_str())
                    .collect::<Vec<_>>();
                assert_eq!(kinds, expected_kinds);
            }
        }
    }

    /// Value of the `key` attribute on a rendered line.
    fn attribute<'a>(line: &'a str, key: &str) -> Option<&'a str> {
        let start = line.find(&format!(" {key}=\""))? + key.len() + 3;
        let len = line[start..].find('"')?;
        Some(&line[start..start + len])
    }

    #[test]
    fn rendered_text_reads_back_in_order() {
        type Flowop = (String, Option<String>);
        type Txn = (String, Vec<Flowop>);

        let workload = tcp_stream();
        let rendered = ProfileDocument::emit(&workload)
            .expect("failed to emit profile")
            .render();

        let mut groups: Vec<(String, Vec<Txn>)> = Vec::new();
        for line in rendered.lines().map(str::trim_start) {
            if line.starts_with("<group ") {
                let concurrency = attribute(line, "nthreads")
                    .map(|n| format!("nthreads={n}"))
                    .or_else(|| attribute(line, "nprocs").map(|n| format!("nprocs={n}")))
                    .expect("group without concurrency");
                groups.push((concurrency, Vec::new()));
            } else if line.starts_with("<transaction ") {
                let termination = ["iterations", "duration", "rate"]
                    .into_iter()
                    .find_map(|key| attribute(line, key).map(|v| format!("{key}={v}")))
                    .expect("transaction without termination");
                groups
                    .last_mut()
                    .expect("transaction outside group")
                    .1
                    .push((termination, Vec::new()));
            } else if line.starts_with("<flowop ") {
                let flowop = (
                    attribute(line, "type").expect("flowop without type").to_string(),
                    attribute(line, "options").map(str::to_string),
                );
                groups
                    .last_mut()
                    .and_then(|group| group.1.last_mut())
                    .expect("flowop outside transaction")
                    .1
                    .push(flowop);
            }
        }

        let expected = workload
            .groups
            .iter()
            .map(|group| {
                let (key, value) = group.concurrency.attribute();
                let transactions = group
                    .transactions
                    .iter()
                    .map(|transaction| {
                        let (key, value) = transaction.termination.attribute();
                        let flowops = transaction
                            .operations
                            .iter()
                            .map(|operation| {
                                let options = (!operation.options.is_empty())
                                    .then(|| operation.options.join(" "));
                                (operation.kind.clone(), options)
                            })
                            .collect::<Vec<_>>();
                        (format!("{key}={value}"), flowops)
                    })
                    .collect::<Vec<_>>();
                (format!("{key}={value}"), transactions)
            })
            .collect::<Vec<_>>();

        assert_eq!(groups, expected);
    }

    #[test]
    fn minimal_profile_ends_with_one_newline() {
        let workload = Workload::new("minimal").with_group(
            Group::threads(1)
                .with_transaction(Transaction::iterations(1).with_operation(Operation::new("nop"))),
        );
        let rendered = ProfileDocument::emit(&workload)
            .expect("failed to emit profile")
            .render();

        assert!(rendered.ends_with("</profile>\n"));
        assert!(!rendered.ends_with("\n\n"));
        assert!(rendered.contains("      <flowop type=\"nop\" />\n"));
    }

    #[test]
    fn escapes_attribute_values() {
        let workload = Workload::new("a<b> & \"c\" caf\u{e9}").with_group(Group::threads(1));
        let rendered = ProfileDocument::emit(&workload)
            .expect("failed to emit profile")
            .render();

        assert!(rendered.contains(
            "<profile name=\"a&lt;b&gt; &amp; &quot;c&quot; caf&#233;\">"
        ));
        assert!(rendered.contains("  <group nthreads=\"1\" />\n"));
        assert!(rendered.is_ascii());
    }

    #[test]
    fn rejects_invalid_workload() {
        let err = ProfileDocument::emit(&Workload::new("no-groups")).unwrap_err();
        assert!(matches!(err, ConfigError::NoGroups(_)));
    }

    #[test]
    fn writes_to_writer() {
        let document = ProfileDocument::emit(&tcp_stream()).expect("failed to emit profile");
        let mut buffer = Vec::new();
        document.write(&mut buffer).expect("failed to write profile");
        assert_eq!(String::from_utf8(buffer).unwrap(), document.render());
    }
}

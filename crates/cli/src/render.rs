use routemap_graph::{FilteredSubgraph, ServiceNode};
use std::fmt::Write as _;

const CLASS_DEFS: [(&str, &str); 4] = [
    ("publicExposed", "#00ff00"),
    ("vulnerable", "#ff0000"),
    ("nonService", "#ffff00"),
    ("service", "#add8e6"),
];

/// Mermaid node id; mermaid rejects `-` in ids
fn mermaid_id(name: &str) -> String {
    name.replace('-', "_")
}

/// Styling class, first match wins: public, vulnerable, non-service, service
fn node_class(node: &ServiceNode) -> &'static str {
    if node.public_exposed {
        "publicExposed"
    } else if node.has_listed_vulnerabilities() {
        "vulnerable"
    } else if node.kind != "service" {
        "nonService"
    } else {
        "service"
    }
}

/// Render a subgraph as a Mermaid `graph TD` diagram
pub fn mermaid(subgraph: &FilteredSubgraph) -> String {
    let mut out = String::from("graph TD\n");

    for node in &subgraph.nodes {
        let _ = writeln!(out, "{}[{}]", mermaid_id(&node.name), node.name);
    }
    for edge in &subgraph.edges {
        let _ = writeln!(out, "{} --> {}", mermaid_id(&edge.from), mermaid_id(&edge.to));
    }
    for (class, fill) in CLASS_DEFS {
        let _ = writeln!(out, "classDef {class} fill:{fill}");
    }
    for node in &subgraph.nodes {
        let _ = writeln!(out, "class {} {}", mermaid_id(&node.name), node_class(node));
    }

    out
}

/// Standalone HTML page rendering the diagram in the browser
pub fn html_page(mermaid: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Service Routes</title>
    <script type="module">
        import mermaid from 'https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs';
        mermaid.initialize({{ startOnLoad: true }});
    </script>
</head>
<body>
    <h1>Filtered Graph</h1>
    <div class="mermaid">
{mermaid}
    </div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use routemap_graph::Edge;
    use serde_json::json;

    fn subgraph() -> FilteredSubgraph {
        FilteredSubgraph {
            nodes: vec![
                ServiceNode::new("ts-ui", "service").with_public_exposed(true),
                ServiceNode::new("ts-auth", "service").with_vulnerabilities(vec![json!("CVE-1")]),
                ServiceNode::new("ts-audit", "service").with_vulnerabilities(Vec::new()),
                ServiceNode::new("ts-db", "rds"),
            ],
            edges: vec![
                Edge::new("ts-ui", "ts-auth"),
                Edge::new("ts-auth", "ts-db"),
                Edge::new("ts-auth", "ts-audit"),
            ],
        }
    }

    #[test]
    fn test_mermaid_layout() {
        let expected = "\
graph TD
ts_ui[ts-ui]
ts_auth[ts-auth]
ts_audit[ts-audit]
ts_db[ts-db]
ts_ui --> ts_auth
ts_auth --> ts_db
ts_auth --> ts_audit
classDef publicExposed fill:#00ff00
classDef vulnerable fill:#ff0000
classDef nonService fill:#ffff00
classDef service fill:#add8e6
class ts_ui publicExposed
class ts_auth vulnerable
class ts_audit service
class ts_db nonService
";
        assert_eq!(mermaid(&subgraph()), expected);
    }

    #[test]
    fn test_empty_subgraph_still_has_class_defs() {
        let text = mermaid(&FilteredSubgraph::default());
        assert!(text.starts_with("graph TD\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("classDef")).count(), 4);
    }

    #[test]
    fn test_html_embeds_diagram() {
        let page = html_page("graph TD\na[a]\n");
        assert!(page.contains("<div class=\"mermaid\">"));
        assert!(page.contains("a[a]"));
        assert!(page.contains("startOnLoad: true"));
    }
}

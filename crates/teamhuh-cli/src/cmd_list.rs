use crate::OutputFormat;
use crate::cmd_get::to_json;
use anyhow::{Result, anyhow};
use teamhuh::{QueryNode, Resolution};

/// Attributes shown in the one-line summary, in order, when present.
const SUMMARY_ATTRIBUTES: &[&str] = &["id", "name", "number", "status", "href"];

pub fn run(root: &QueryNode, names: &[String], format: OutputFormat) -> Result<()> {
    let members = members(root, names)?;
    println!("{}", render(&members, format)?);
    Ok(())
}

fn members(root: &QueryNode, names: &[String]) -> Result<Vec<QueryNode>> {
    match root.path(names) {
        Resolution::Node(node) => Ok(node.children()),
        Resolution::Collection(collection) => Ok(collection.into_items()),
        Resolution::Scalar(value) => Err(anyhow!(
            "{} is a value ({:?}), not a collection",
            names.join("."),
            value
        )),
        Resolution::NotFound => Err(anyhow!("Could not resolve {}", names.join("."))),
    }
}

fn render(members: &[QueryNode], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Xml => Ok(members
            .iter()
            .map(summary_line)
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json { pretty } => {
            let roots: Vec<_> = members
                .iter()
                .filter_map(|m| m.document().and_then(|d| d.root()))
                .collect();
            to_json(&roots, pretty)
        }
    }
}

fn summary_line(member: &QueryNode) -> String {
    let Some(root) = member.document().and_then(|d| d.root()) else {
        return String::new();
    };
    let mut line = root.name().to_string();
    for attr in SUMMARY_ATTRIBUTES {
        if let Some(value) = root.attribute(attr) {
            line.push_str(&format!(" {}={:?}", attr, value));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use teamhuh::{Credentials, MemoryTransport};

    fn root() -> QueryNode {
        let transport = MemoryTransport::new("http://ci")
            .with_document(
                "/httpAuth/app/rest/projects",
                r#"<projects count="2"><project id="_Root" name="Root"/><project id="Main" name="Main project"/></projects>"#,
            )
            .with_document("/httpAuth/app/rest/server", r#"<server version="1"/>"#);
        QueryNode::new("http://ci", Credentials::default(), Arc::new(transport))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_members_of_collection() {
        let found = members(&root(), &names(&["projects"])).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_members_of_scalar_is_error() {
        let err = members(&root(), &names(&["server", "version"])).unwrap_err();
        assert!(err.to_string().contains("not a collection"));
    }

    #[test]
    fn test_render_summary_lines() {
        let found = members(&root(), &names(&["projects"])).unwrap();
        let out = render(&found, OutputFormat::Xml).unwrap();
        assert_eq!(
            out,
            "project id=\"_Root\" name=\"Root\"\nproject id=\"Main\" name=\"Main project\""
        );
    }

    #[test]
    fn test_render_json() {
        let found = members(&root(), &names(&["projects"])).unwrap();
        let out = render(&found, OutputFormat::Json { pretty: false }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[1]["attributes"][0]["value"], "Main");
    }

    #[test]
    fn test_run_missing_is_error() {
        assert!(run(&root(), &names(&["projects", "nothing"]), OutputFormat::Xml).is_err());
    }
}

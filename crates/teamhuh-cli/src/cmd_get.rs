use crate::OutputFormat;
use anyhow::{Result, bail};
use teamhuh::{QueryNode, Resolution};

pub fn run(root: &QueryNode, names: &[String], format: OutputFormat) -> Result<()> {
    let resolution = root.path(names);
    println!("{}", render(&resolution, names, format)?);
    Ok(())
}

fn render(resolution: &Resolution, names: &[String], format: OutputFormat) -> Result<String> {
    match (resolution, format) {
        (Resolution::NotFound, _) => bail!("Could not resolve {}", names.join(".")),
        (Resolution::Scalar(value), OutputFormat::Xml) => Ok(value.clone()),
        (Resolution::Scalar(value), OutputFormat::Json { pretty }) => {
            to_json(&serde_json::Value::String(value.clone()), pretty)
        }
        (Resolution::Node(node), _) => render_node(node, format),
        (Resolution::Collection(collection), OutputFormat::Xml) => {
            let blocks = collection
                .items()
                .iter()
                .map(|item| item.to_xml_string())
                .collect::<teamhuh::Result<Vec<_>>>()?;
            Ok(blocks.join("\n"))
        }
        (Resolution::Collection(collection), OutputFormat::Json { pretty }) => {
            let roots: Vec<_> = collection
                .items()
                .iter()
                .filter_map(|item| item.document().and_then(|d| d.root()))
                .collect();
            to_json(&roots, pretty)
        }
    }
}

pub(crate) fn render_node(node: &QueryNode, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Xml => Ok(node.to_xml_string()?),
        OutputFormat::Json { pretty } => {
            to_json(&node.document().and_then(|d| d.root()), pretty)
        }
    }
}

pub(crate) fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

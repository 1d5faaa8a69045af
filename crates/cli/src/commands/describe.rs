//! Describe command: resolve an identifier and explain what it is

use anyhow::Result;
use colored::Colorize;

use gwm_engine::{ClusterClient, Error, Resolution};

use crate::output::{self, OutputFormat};

pub async fn run(
    client: &ClusterClient,
    identifier: &str,
    namespace: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let job = match gwm_engine::resolve(client, identifier, namespace).await? {
        Resolution::Resolved(job) => job,
        Resolution::Ambiguous(candidates) => {
            return Err(Error::Ambiguous {
                identifier: identifier.to_string(),
                candidates: candidates.iter().map(|c| c.display()).collect(),
            }
            .into());
        }
        Resolution::NotFound => return Err(Error::NotFound(identifier.to_string()).into()),
    };

    let description = gwm_engine::describe(client, &job).await?;

    if matches!(format, OutputFormat::Json) {
        #[derive(serde::Serialize)]
        struct JsonView<'a> {
            logical_name: &'a str,
            namespace: &'a str,
            shape: String,
            native_status: &'a str,
            children: &'a [String],
            #[serde(flatten)]
            description: &'a gwm_engine::Description,
        }
        let view = JsonView {
            logical_name: &job.logical_name,
            namespace: &job.namespace,
            shape: job.shape.to_string(),
            native_status: &job.native_status,
            children: &job.children,
            description: &description,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}: {}", "Name".bold(), job.logical_name);
    println!("{}: {}", "Namespace".bold(), job.namespace);
    println!(
        "{}: {}",
        "Kind".bold(),
        job.detected_kind
            .map(|k| k.as_str())
            .unwrap_or("unknown")
    );
    println!("{}: {}", "Shape".bold(), job.shape);
    println!(
        "{}: {} ({})",
        "Status".bold(),
        output::color_status(&description.status.display()),
        job.native_status
    );
    if !job.children.is_empty() {
        println!("{}: {}", "Pods".bold(), job.children.join(", "));
    }
    if !job.ambiguity_candidates.is_empty() {
        output::print_warning(&format!(
            "other matches in this namespace: {}",
            job.ambiguity_candidates
                .iter()
                .map(|c| c.display())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if let Some(access) = &description.access {
        println!(
            "{}: {}:{}",
            "Access".bold(),
            access.service_dns,
            access.port
        );
    }
    if !description.events.is_empty() {
        println!("{}:", "Events".bold());
        for event in &description.events {
            println!("  {event}");
        }
    }
    println!("{}:", "Recovered spec".bold());
    let yaml = serde_yaml::to_string(&description.spec)?;
    for line in yaml.lines() {
        println!("  {line}");
    }
    Ok(())
}

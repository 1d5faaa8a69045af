//! List command: enumerate managed jobs

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use gwm_engine::ClusterClient;

use crate::output::{self, OutputFormat};

#[derive(Tabled, Serialize)]
struct Row {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "NAMESPACE")]
    namespace: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "AGE")]
    age: String,
}

pub async fn run(
    client: &ClusterClient,
    namespace: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let jobs = gwm_engine::list(client, namespace).await?;
    let rows: Vec<Row> = jobs
        .into_iter()
        .map(|job| Row {
            name: job.name,
            namespace: job.namespace,
            kind: job.kind,
            status: match format {
                OutputFormat::Table => output::color_status(&job.status),
                OutputFormat::Json => job.status,
            },
            age: job.age,
        })
        .collect();
    output::print_table(&rows, format);
    Ok(())
}

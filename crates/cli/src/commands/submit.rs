//! Submit command: compile a job description and apply it to the cluster

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use gwm_engine::spec::{
    EnvEntry, Environment, JobMetadata, JobSpec, ResourceRequest, ServiceConfig, Storage,
};
use gwm_engine::{ClusterClient, JobKind, Priority};

use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Training,
    Inference,
    Notebook,
    Compute,
}

impl From<KindArg> for JobKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Training => JobKind::Training,
            KindArg::Inference => JobKind::Inference,
            KindArg::Notebook => JobKind::Notebook,
            KindArg::Compute => JobKind::Compute,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::High => Priority::High,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::Low => Priority::Low,
        }
    }
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Declarative job file (YAML); flags below are ignored when set
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Job name
    #[arg(long)]
    pub name: Option<String>,

    /// Job kind
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,

    /// Container image
    #[arg(long, short)]
    pub image: Option<String>,

    /// Scheduling priority
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,

    /// Whole GPUs per replica
    #[arg(long, default_value_t = 0)]
    pub gpu: i64,

    /// GPU model, e.g. a100-80g
    #[arg(long)]
    pub gpu_type: Option<String>,

    /// Fractional GPU share in (0, 1]
    #[arg(long)]
    pub gpu_share: Option<f64>,

    /// CPU quantity, e.g. 4 or 500m
    #[arg(long, default_value = "1")]
    pub cpu: String,

    /// Memory quantity, e.g. 16Gi
    #[arg(long, default_value = "1Gi")]
    pub memory: String,

    /// Resource pool (omit for the default pool)
    #[arg(long)]
    pub pool: Option<String>,

    /// Replica count for endpoint-bearing kinds
    #[arg(long, default_value_t = 1)]
    pub replicas: i32,

    /// Service port (0 = kind default)
    #[arg(long, default_value_t = 0)]
    pub port: u16,

    /// HTTP health-check path; enables liveness/readiness probes
    #[arg(long)]
    pub health_check_path: Option<String>,

    /// Host directory mounted into every replica (repeatable)
    #[arg(long = "workdir")]
    pub workdirs: Vec<String>,

    /// Environment variable as KEY=VALUE (repeatable)
    #[arg(long = "env", short = 'e')]
    pub env: Vec<String>,

    /// Image pull secret name
    #[arg(long)]
    pub pull_secret: Option<String>,

    /// Training epochs
    #[arg(long)]
    pub epochs: Option<u32>,

    /// Batch size
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Command and arguments, after `--`
    #[arg(last = true)]
    pub command: Vec<String>,
}

pub async fn run(
    client: &ClusterClient,
    args: SubmitArgs,
    namespace: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let spec = match &args.file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => build_spec(&args)?,
    };

    let set = gwm_engine::compile(&spec, namespace.unwrap_or_default())?;
    let receipt = gwm_engine::submit(client, &set).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        OutputFormat::Table => output::print_success(&format!(
            "{} '{}' in namespace '{}'",
            receipt.action, receipt.canonical_name, receipt.namespace
        )),
    }
    Ok(())
}

/// Build a job description from individual flags
fn build_spec(args: &SubmitArgs) -> Result<JobSpec> {
    let Some(name) = args.name.clone() else {
        bail!("either --file or --name is required");
    };
    let Some(kind) = args.kind else {
        bail!("--kind is required when submitting from flags");
    };
    let Some(image) = args.image.clone() else {
        bail!("--image is required when submitting from flags");
    };

    Ok(JobSpec {
        kind: kind.into(),
        metadata: JobMetadata {
            name,
            namespace: String::new(),
            priority: args.priority.map(Into::into).unwrap_or_default(),
            description: args.description.clone(),
            epochs: args.epochs,
            batch_size: args.batch_size,
        },
        environment: Environment {
            image,
            pull_secret: args.pull_secret.clone(),
            command: args.command.clone(),
            args: Vec::new(),
            env: parse_env(&args.env)?,
        },
        resources: ResourceRequest {
            pool: args.pool.clone(),
            gpu_count: args.gpu,
            gpu_type: args.gpu_type.clone(),
            cpu: args.cpu.clone(),
            memory: args.memory.clone(),
            gpu_share: args.gpu_share,
        },
        storage: Storage {
            workdirs: args.workdirs.clone(),
        },
        service: ServiceConfig {
            replicas: args.replicas,
            port: args.port,
            health_check_path: args.health_check_path.clone(),
            timeout: None,
        },
    })
}

fn parse_env(entries: &[String]) -> Result<Vec<EnvEntry>> {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => Ok(EnvEntry {
                name: name.to_string(),
                value: value.to_string(),
            }),
            None => bail!("environment entry '{entry}' is not KEY=VALUE"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SubmitArgs,
    }

    fn parse(line: &[&str]) -> SubmitArgs {
        Harness::try_parse_from(std::iter::once("gwm").chain(line.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_build_spec_from_flags() {
        let args = parse(&[
            "--name",
            "bert-train",
            "--kind",
            "training",
            "--image",
            "pytorch/pytorch:2.1",
            "--gpu",
            "4",
            "--env",
            "LR=0.001",
            "--",
            "python",
            "train.py",
        ]);
        let spec = build_spec(&args).unwrap();
        assert_eq!(spec.kind, JobKind::Training);
        assert_eq!(spec.metadata.name, "bert-train");
        assert_eq!(spec.resources.gpu_count, 4);
        assert_eq!(spec.environment.command, vec!["python", "train.py"]);
        assert_eq!(spec.environment.env[0].name, "LR");
    }

    #[test]
    fn test_missing_required_flags() {
        let args = parse(&["--name", "x"]);
        assert!(build_spec(&args).is_err());
    }

    #[test]
    fn test_malformed_env_entry() {
        assert!(parse_env(&["NOVALUE".to_string()]).is_err());
        let parsed = parse_env(&["A=b=c".to_string()]).unwrap();
        assert_eq!(parsed[0].value, "b=c");
    }

    #[test]
    fn test_yaml_spec_parses() {
        let yaml = r#"
kind: training
metadata:
  name: bert-train
  priority: high
environment:
  image: pytorch/pytorch:2.1
  command: ["python", "train.py"]
resources:
  gpuCount: 2
  cpu: "8"
  memory: 32Gi
storage:
  workdirs: ["/data"]
"#;
        let spec: JobSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.kind, JobKind::Training);
        assert_eq!(spec.resources.gpu_count, 2);
        assert_eq!(spec.metadata.priority, Priority::High);
        assert!(spec.validate().is_ok());
    }
}

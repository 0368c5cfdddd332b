//! Generate, save and summarize the pipeline document.

use std::path::{Path, PathBuf};

use pipegen_core::{AssemblyOptions, Document, GenerateError, PipelineAssembler};

use crate::cli_config::CliConfig;
use crate::output;
use crate::Cli;

/// Effective settings after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GenerateSettings {
    pub root: PathBuf,
    pub output: PathBuf,
    pub pipeline: String,
    pub world_group: Option<String>,
}

impl GenerateSettings {
    pub fn resolve(cli: &Cli, config: CliConfig) -> Self {
        let world_group_name = cli.worldgroup_name.clone().unwrap_or(config.worldgroup_name);
        Self {
            root: PathBuf::from(cli.root.clone().unwrap_or(config.root)),
            output: PathBuf::from(cli.output.clone().unwrap_or(config.output)),
            pipeline: cli.pipeline.clone().unwrap_or(config.pipeline),
            world_group: (cli.worldgroup || config.worldgroup).then_some(world_group_name),
        }
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        let options = AssemblyOptions::new(&self.root).with_pipeline(&self.pipeline);
        match &self.world_group {
            Some(name) => options.with_world_group(name),
            None => options,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum CommandError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("failed to serialize pipeline: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("failed to write to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Build the document, write it to the output path and print a summary.
pub(crate) async fn run(settings: &GenerateSettings) -> Result<Document, CommandError> {
    tracing::debug!(?settings, "Generating pipeline");

    let document = PipelineAssembler::new(settings.assembly_options())
        .assemble()
        .await?;
    save_document(&settings.output, &document)?;

    output::success(format!("Wrote {}", settings.output.display()));
    output::pipeline_stats(&document);
    Ok(document)
}

/// Serialize `document` as YAML into `path`.
pub(crate) fn save_document(path: &Path, document: &Document) -> Result<(), CommandError> {
    let yaml = document.to_yaml()?;
    std::fs::write(path, yaml).map_err(|e| CommandError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pipegen-ctl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = GenerateSettings::resolve(&cli(&[]), CliConfig::default());
        assert_eq!(settings.root, PathBuf::from("."));
        assert_eq!(settings.output, PathBuf::from("pipeline.generated.yaml"));
        assert_eq!(settings.pipeline, "");
        assert_eq!(settings.world_group, None);
    }

    #[test]
    fn test_flags_override_config() {
        let config = CliConfig {
            root: "ci".to_string(),
            output: "from-config.yml".to_string(),
            pipeline: "nightly".to_string(),
            worldgroup: false,
            worldgroup_name: "ALL".to_string(),
        };
        let settings = GenerateSettings::resolve(
            &cli(&["--output", "flag.yml", "--pipeline", "release", "--worldgroup"]),
            config,
        );
        assert_eq!(settings.root, PathBuf::from("ci"));
        assert_eq!(settings.output, PathBuf::from("flag.yml"));
        assert_eq!(settings.pipeline, "release");
        assert_eq!(settings.world_group.as_deref(), Some("ALL"));
    }

    #[test]
    fn test_worldgroup_name_flag() {
        let settings = GenerateSettings::resolve(
            &cli(&["--worldgroup", "--worldgroup-name", "EVERYTHING"]),
            CliConfig::default(),
        );
        assert_eq!(settings.world_group.as_deref(), Some("EVERYTHING"));
    }

    #[tokio::test]
    async fn test_run_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("jobs")).unwrap();
        fs::write(
            dir.path().join("jobs").join("build.yml"),
            "meta:\n  name: build\ndata:\n  plan: []\n",
        )
        .unwrap();

        let settings = GenerateSettings {
            root: dir.path().to_path_buf(),
            output: dir.path().join("pipeline.generated.yaml"),
            pipeline: String::new(),
            world_group: Some("WORLD".to_string()),
        };
        let document = run(&settings).await.unwrap();
        assert_eq!(document.jobs.len(), 1);

        let written: Document =
            serde_yaml::from_str(&fs::read_to_string(&settings.output).unwrap()).unwrap();
        assert_eq!(written, document);
        assert_eq!(written.groups[0].name(), Some("WORLD"));
    }

    #[tokio::test]
    async fn test_run_reports_generation_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("jobs")).unwrap();
        fs::write(dir.path().join("jobs").join("bad.yml"), "meta:\n  name: bad\n").unwrap();

        let settings = GenerateSettings {
            root: dir.path().to_path_buf(),
            output: dir.path().join("out.yaml"),
            pipeline: String::new(),
            world_group: None,
        };
        let err = run(&settings).await.unwrap_err();
        assert!(matches!(err, CommandError::Generate(_)));
        assert!(!settings.output.exists());
    }
}

//! Nextflow invocation for one source assembly

use crate::error::{IngestError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{error, info};

/// Everything needed to launch the remap/cluster workflow once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInvocation {
    pub source_assembly: String,
    /// Working directory of the child process
    pub assembly_directory: PathBuf,
    pub params_file: PathBuf,
    pub work_dir: PathBuf,
    pub log_file: PathBuf,
    pub resume: bool,
}

#[async_trait]
pub trait PipelineRunner: Send + Sync {
    /// Run to completion. A non-zero exit is returned as `IngestError::PipelineFailed`.
    async fn run(&self, invocation: &PipelineInvocation) -> Result<()>;
}

pub struct NextflowRunner {
    executable: String,
    pipeline: PathBuf,
}

impl NextflowRunner {
    pub fn new(executable: impl Into<String>, pipeline: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            pipeline: pipeline.into(),
        }
    }

    /// Arguments passed to nextflow, in order
    pub fn arguments(&self, invocation: &PipelineInvocation) -> Vec<String> {
        let mut args = vec![
            "-log".to_string(),
            invocation.log_file.display().to_string(),
            "run".to_string(),
            self.pipeline.display().to_string(),
            "-params-file".to_string(),
            invocation.params_file.display().to_string(),
            "-work-dir".to_string(),
            invocation.work_dir.display().to_string(),
        ];
        if invocation.resume {
            args.push("-resume".to_string());
        }
        args
    }
}

#[async_trait]
impl PipelineRunner for NextflowRunner {
    async fn run(&self, invocation: &PipelineInvocation) -> Result<()> {
        let args = self.arguments(invocation);
        info!(
            assembly = %invocation.source_assembly,
            command = %format!("{} {}", self.executable, args.join(" ")),
            "Starting Nextflow remapping process"
        );

        let status = Command::new(&self.executable)
            .args(&args)
            .current_dir(&invocation.assembly_directory)
            .status()
            .await?;

        if !status.success() {
            error!(assembly = %invocation.source_assembly, %status, "Nextflow remapping pipeline failed");
            return Err(IngestError::PipelineFailed {
                assembly: invocation.source_assembly.clone(),
                status: status.to_string(),
            });
        }

        info!(assembly = %invocation.source_assembly, "Nextflow remapping process completed");
        Ok(())
    }
}

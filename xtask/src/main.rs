//! Build automation tasks for the assembly ingestion tools

use clap::Parser;
use eva_assembly_ingestion::cli::{AddTargetAssemblyCli, GenomeTargetTrackerCli};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for the assembly ingestion tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the command-line reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let add_target_assembly = clap_markdown::help_markdown::<AddTargetAssemblyCli>();
    let genome_target_tracker = clap_markdown::help_markdown::<GenomeTargetTrackerCli>();

    let content = format!(
        r#"# Assembly Ingestion CLI Reference

Generated from the CLI definitions on {}.

## Configuration

`add_target_assembly` reads a YAML config from `--config`, then `$ASSEMBLYCONFIG`,
then `~/.assembly_config.yml`. Database and service credentials come from the
Maven settings file and profile it names.

- `EVA_LOG_LEVEL` - trace, debug, info, warn, error
- `EVA_LOG_FORMAT` - text or json
- `EVA_LOG_DIR` - also write daily rotated log files here
- `EVA_LOG_FILTER` - additional filter directives, e.g. `sqlx=warn`

## Typical run

```bash
# Everything: load the tracker, remap and cluster, then update the databases
add_target_assembly --taxonomy 9913 --target_assembly GCA_002263795.2 --release_version 5

# Retry after a failed pipeline, resuming Nextflow
add_target_assembly --taxonomy 9913 --target_assembly GCA_002263795.2 --release_version 5 \
  --tasks remap_cluster update_dbs --resume

# Compare supported assemblies with Ensembl
genome_target_tracker --private_config_xml_file ~/settings.xml
```

{}

{}

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        add_target_assembly,
        genome_target_tracker
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}

//! Namespace Migrator
//!
//! Command line entry point with three phases:
//!
//! - `export`: discover and write the namespace's resources
//! - `transform`: generate a patch or white-out per exported manifest
//! - `apply`: produce the output tree from exports and transforms

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kube::config::Kubeconfig;
use namespace_migrator::{
    connect, resolve_target, ApplyConfig, ApplyEngine, DiscoveryConfig, DiscoveryPipeline,
    DocumentFormat, Error, GeneratorConfig, KubeCatalog, KubeLister, ManifestWriter, Result,
    ScopePolicy, SortKey, TransformGenerator, TransformIndex, WriterConfig, FAILURES_DIR,
    RESOURCES_DIR,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Namespace Migrator - move a namespace's resources between clusters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the resources of one namespace
    Export(ExportArgs),
    /// Generate transforms for an export tree
    Transform(TransformArgs),
    /// Apply transforms and write the output tree
    Apply(ApplyArgs),
}

#[derive(ClapArgs, Debug)]
struct ExportArgs {
    /// Export root directory
    #[arg(long, env = "EXPORT_DIR", default_value = "export")]
    export_dir: PathBuf,

    /// Kubeconfig context (defaults to the current context)
    #[arg(long, env = "KUBE_CONTEXT")]
    context: Option<String>,

    /// Namespace to export; a namespace set on the context takes precedence
    #[arg(long, env = "NAMESPACE")]
    namespace: Option<String>,

    /// Ordering key for exported resources (kind, name, group)
    #[arg(long, env = "SORT_BY", default_value = "kind")]
    sort_by: SortKey,

    /// Also export cluster-scoped resource types
    #[arg(long, env = "INCLUDE_CLUSTER_SCOPED")]
    include_cluster_scoped: bool,

    /// Manifest format (yaml, json)
    #[arg(long, env = "EXPORT_FORMAT", default_value = "yaml")]
    format: DocumentFormat,

    /// Maximum concurrent list requests
    #[arg(long, env = "LIST_CONCURRENCY", default_value = "8")]
    list_concurrency: usize,
}

#[derive(ClapArgs, Debug)]
struct TransformArgs {
    /// Export root directory
    #[arg(long, env = "EXPORT_DIR", default_value = "export")]
    export_dir: PathBuf,

    /// Transform root directory
    #[arg(long, env = "TRANSFORM_DIR", default_value = "transform")]
    transform_dir: PathBuf,

    /// Image registry prefix to replace
    #[arg(long, env = "OLD_IMAGE_REGISTRY")]
    old_image_registry: Option<String>,

    /// Image registry prefix to substitute
    #[arg(long, env = "NEW_IMAGE_REGISTRY")]
    new_image_registry: Option<String>,

    /// Source cluster is OpenShift
    #[arg(long, env = "FROM_OPENSHIFT")]
    from_openshift: bool,
}

#[derive(ClapArgs, Debug)]
struct ApplyArgs {
    /// Export root directory
    #[arg(long, env = "EXPORT_DIR", default_value = "export")]
    export_dir: PathBuf,

    /// Transform root directory
    #[arg(long, env = "TRANSFORM_DIR", default_value = "transform")]
    transform_dir: PathBuf,

    /// Output root directory
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Output manifest format (yaml, json)
    #[arg(long, env = "OUTPUT_FORMAT", default_value = "yaml")]
    format: DocumentFormat,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;
    info!("Namespace Migrator {}", namespace_migrator::VERSION);

    match args.command {
        Command::Export(export) => run_export(export).await,
        Command::Transform(transform) => run_transform(transform).await,
        Command::Apply(apply) => run_apply(apply).await,
    }
}

// =============================================================================
// Phases
// =============================================================================

async fn run_export(args: ExportArgs) -> Result<()> {
    let kubeconfig = Kubeconfig::read()?;
    let target = resolve_target(
        &kubeconfig,
        args.context.as_deref(),
        args.namespace.as_deref(),
    )?;
    info!("Exporting namespace {} from context {}", target.namespace, target.context);

    let base = args.export_dir.join(&target.namespace);
    let resources_dir = base.join(RESOURCES_DIR);
    let failures_dir = base.join(FAILURES_DIR);
    create_root(&resources_dir).await?;
    create_root(&failures_dir).await?;

    let client = connect(kubeconfig, &target).await?;

    let scope = if args.include_cluster_scoped {
        ScopePolicy::IncludeClusterScoped
    } else {
        ScopePolicy::NamespacedOnly
    };
    let pipeline = DiscoveryPipeline::new(
        DiscoveryConfig {
            scope,
            sort_key: args.sort_by,
            list_concurrency: args.list_concurrency,
        },
        Arc::new(KubeCatalog::new(client.clone())),
        Arc::new(KubeLister::new(client)),
    );
    let outcome = pipeline.run(&target.namespace).await?;

    let writer = ManifestWriter::new(WriterConfig {
        format: args.format,
    });
    let mut write_failures = writer.write_groups(&outcome.groups, &resources_dir).await;
    write_failures.extend(writer.write_failures(&outcome.failures, &failures_dir).await);

    for failure in &write_failures {
        match &failure.path {
            Some(path) => warn!("Write failed for {:?}: {}", path, failure.error),
            None => warn!("Write failed: {}", failure.error),
        }
    }

    let objects: usize = outcome.groups.iter().map(|g| g.objects.len()).sum();
    info!(
        "Export complete: {} objects in {} types, {} list failures, {} write failures",
        objects,
        outcome.groups.len(),
        outcome.failures.len(),
        write_failures.len()
    );
    Ok(())
}

async fn run_transform(args: TransformArgs) -> Result<()> {
    if args.old_image_registry.is_some() != args.new_image_registry.is_some() {
        return Err(Error::Configuration(
            "--old-image-registry and --new-image-registry must be set together".into(),
        ));
    }

    let index = TransformIndex::new(args.export_dir, args.transform_dir);
    let generator = TransformGenerator::new(GeneratorConfig {
        old_image_registry: args.old_image_registry,
        new_image_registry: args.new_image_registry,
        from_openshift: args.from_openshift,
    });

    let report = generator.generate_tree(&index).await?;
    for failure in &report.failures {
        warn!("Transform failed for {:?}: {}", failure.path, failure.error);
    }
    Ok(())
}

async fn run_apply(args: ApplyArgs) -> Result<()> {
    let index = TransformIndex::new(args.export_dir, args.transform_dir);
    let engine = ApplyEngine::new(
        ApplyConfig {
            output_root: args.output_dir,
            format: args.format,
        },
        index,
    );

    let report = engine.apply_all().await?;
    if report.has_failures() {
        warn!("{} manifests could not be applied", report.failed());
    }
    Ok(())
}

async fn create_root(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| Error::RootDirectory {
            path: dir.to_path_buf(),
            source,
        })
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let filter = log_filter(&args.log_level)?;

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}

fn log_filter(log_level: &str) -> Result<EnvFilter> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let directive = |d: &str| {
        d.parse::<Directive>()
            .map_err(|e| Error::Configuration(format!("Invalid log directive {}: {}", d, e)))
    };

    // kube's client speaks HTTP through hyper and tower
    Ok(EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive(directive("kube=info")?)
        .add_directive(directive("hyper=warn")?)
        .add_directive(directive("tower=warn")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_caps_client_transport() {
        let filter = log_filter("debug").unwrap().to_string();
        assert!(filter.contains("kube=info"));
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("tower=warn"));
        assert!(filter.contains("debug"));
    }

    #[test]
    fn test_cli_parses_phases() {
        let args = Args::try_parse_from([
            "namespace-migrator",
            "apply",
            "--output-dir",
            "out",
            "--format",
            "json",
        ])
        .unwrap();
        match args.command {
            Command::Apply(apply) => {
                assert_eq!(apply.output_dir, PathBuf::from("out"));
                assert_eq!(apply.format, DocumentFormat::Json);
            }
            other => panic!("expected apply, got {:?}", other),
        }
    }
}

mod backend;
mod process_image;

use std::path::PathBuf;

use clap::Parser;
use ort::execution_providers::CPUExecutionProvider;
use ort::execution_providers::CUDAExecutionProvider;
use tracing_subscriber::prelude::*;
use wardrobe_common::config::PipelineConfig;
use wardrobe_common::model::Category;

use crate::backend::Backend;
use crate::process_image::ItemContext;

#[derive(Debug, Parser)]
pub struct Args {
    /// Clothing photos (.jpeg/.png/.webp/.gif/.bmp) to analyze.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Background segmentation onnx model (u2net style, 1x3xHxW in, 1x1xHxW out).
    #[arg(long, default_value = "_models/u2netp.onnx")]
    segmentation_model: PathBuf,
    /// ImageNet style classifier onnx model used for pattern and attribute tags.
    #[arg(long, default_value = "_models/mobilenetv2-12.onnx")]
    classifier_model: PathBuf,
    /// Classifier label file, one label per line.
    #[arg(long, default_value = "_models/imagenet_labels.txt")]
    labels: PathBuf,
    /// Use an HTTP inference service instead of local onnx models.
    #[arg(long)]
    remote: Option<String>,
    /// Whether to attempt to use `cuda` hw acceleration.
    /// This may silently fail and fallback to cpu acceleration presently.
    #[arg(long, action, default_value = "false")]
    cuda: bool,
    /// Garment category (Tops, Bottoms, Dresses, ...) used to pick detailed attributes.
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    subcategory: Option<String>,
    /// Skip background removal and analyze the whole image with coarse color buckets.
    #[arg(long, action, default_value = "false")]
    simple: bool,
    /// Pipeline settings file (toml, json or yaml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Inference deadline in seconds, overrides the config file.
    #[arg(long)]
    timeout: Option<u64>,
}

/// File (if any), then `WARDROBE_*` environment variables, then CLI flags.
fn load_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    }
    let mut pipeline: PipelineConfig = builder
        .add_source(
            config::Environment::with_prefix("WARDROBE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    if args.timeout.is_some() {
        pipeline.inference_timeout_secs = args.timeout;
    }
    Ok(pipeline)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warn,wardrobe_ort=info,wardrobe_common=info,ort_common=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    log::debug!("{config:?}");

    let category = args
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;

    let backend = match &args.remote {
        Some(url) => Backend::remote(url, &config)?,
        None => {
            let (ep, ep_name) = if args.cuda {
                (CUDAExecutionProvider::default().build(), "cuda")
            } else {
                (CPUExecutionProvider::default().build(), "cpu")
            };
            ort::init().with_execution_providers([ep]).commit()?;
            log::info!("Using ort {ep_name} execution provider");
            Backend::local(
                &args.segmentation_model,
                &args.classifier_model,
                &args.labels,
                &config,
            )?
        }
    };

    let ctx = ItemContext {
        category,
        subcategory: args.subcategory.clone(),
        simple: args.simple,
    };

    let mut failed = 0;
    for input in &args.inputs {
        if let Err(e) = process_image::process_image(input, &backend, &ctx) {
            log::error!("Failed to process {input:?}: {e:#}");
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} images failed", args.inputs.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_layers() {
        let path = std::env::temp_dir().join(format!("wardrobe_cfg_{}.toml", std::process::id()));
        std::fs::write(&path, "max_dimension = 512\ninference_timeout_secs = 10\n").unwrap();
        let config_arg = path.to_str().unwrap();

        let args = Args::parse_from(["wardrobe_ort", "shirt.jpg", "--config", config_arg]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.max_dimension, 512);
        assert_eq!(config.inference_timeout_secs, Some(10));

        // environment beats the file, the flag beats both
        std::env::set_var("WARDROBE_INFERENCE_TIMEOUT_SECS", "20");
        let env_config = load_config(&args);
        let args = Args::parse_from([
            "wardrobe_ort",
            "shirt.jpg",
            "--config",
            config_arg,
            "--timeout",
            "5",
        ]);
        let flag_config = load_config(&args);
        std::env::remove_var("WARDROBE_INFERENCE_TIMEOUT_SECS");
        std::fs::remove_file(&path).unwrap();

        let env_config = env_config.unwrap();
        assert_eq!(env_config.inference_timeout_secs, Some(20));
        assert_eq!(env_config.max_dimension, 512);
        let flag_config = flag_config.unwrap();
        assert_eq!(flag_config.inference_timeout_secs, Some(5));
        assert_eq!(flag_config.max_dimension, 512);
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use geometry::GenerationOptionsPatch;
use runtime::{GenerationObserver, GenerationRequest, GeometryPipeline, LocatorSource};
use tools::write_outputs;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Extruded polygon and outline meshes from GeoJSON")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project a FeatureCollection and write merged shape/outline buffers
    Generate {
        /// File path, file:// URL or http(s) URL of a GeoJSON FeatureCollection
        locator: String,

        /// Projection center: lon,lat in degrees
        #[arg(long, allow_hyphen_values = true)]
        center: String,

        /// JSON file with generation options (camelCase keys)
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        scale: Option<f64>,

        /// Translation: x,y
        #[arg(long, allow_hyphen_values = true)]
        translate: Option<String>,

        #[arg(long)]
        depth: Option<f64>,

        #[arg(long)]
        line_offset: Option<f64>,

        #[arg(long)]
        no_shape: bool,

        #[arg(long)]
        no_outline: bool,

        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<(), String> {
    match Args::parse().command {
        Command::Generate {
            locator,
            center,
            config,
            scale,
            translate,
            depth,
            line_offset,
            no_shape,
            no_outline,
            out,
        } => {
            let file_patch = match config {
                Some(path) => {
                    let payload = std::fs::read_to_string(&path)
                        .map_err(|e| format!("read {}: {e}", path.display()))?;
                    GenerationOptionsPatch::from_json_str(&payload)
                        .map_err(|e| format!("{}: {e}", path.display()))?
                }
                None => GenerationOptionsPatch::default(),
            };
            let flag_patch = GenerationOptionsPatch {
                mercator_scale: scale,
                mercator_translate: translate.as_deref().map(parse_pair).transpose()?,
                extrude_depth: depth,
                line_offset,
                need_shape_geometry: no_shape.then_some(false),
                need_line_geometry: no_outline.then_some(false),
            };

            let request = GenerationRequest::new(
                locator,
                parse_pair(&center)?,
                file_patch.overlay(flag_patch),
            );
            cmd_generate(request, out).await
        }
    }
}

async fn cmd_generate(request: GenerationRequest, out: PathBuf) -> Result<(), String> {
    let observers: Vec<Arc<dyn GenerationObserver>> = Vec::new();
    let pipeline =
        GeometryPipeline::start(Arc::new(LocatorSource::new()), request.clone(), observers)
            .await
            .map_err(|e| e.to_string())?;
    let result = pipeline.result().ok_or_else(|| {
        pipeline
            .last_error()
            .unwrap_or_else(|| "generation did not run".to_string())
    })?;
    let manifest = write_outputs(&out, &request, &result).map_err(|e| e.to_string())?;

    info!(
        rings = manifest.stats.rings,
        shape_vertices = manifest.stats.shape_vertices,
        outline_vertices = manifest.stats.outline_vertices,
        "generation finished"
    );
    eprintln!(
        "wrote {} buffer(s) for {} ring(s) to {}",
        manifest.buffers.len(),
        manifest.stats.rings,
        out.display()
    );
    Ok(())
}

/// Parses `a,b` into two finite numbers.
fn parse_pair(s: &str) -> Result<[f64; 2], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(format!("expected two comma-separated numbers, got '{s}'"));
    }
    let mut out = [0.0; 2];
    for (slot, part) in out.iter_mut().zip(&parts) {
        let v: f64 = part
            .parse()
            .map_err(|_| format!("invalid number '{part}' in '{s}'"))?;
        if !v.is_finite() {
            return Err(format!("non-finite number '{part}' in '{s}'"));
        }
        *slot = v;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::parse_pair;

    #[test]
    fn parses_signed_pairs() {
        assert_eq!(parse_pair("-73.9, 40.7"), Ok([-73.9, 40.7]));
        assert_eq!(parse_pair("104,35"), Ok([104.0, 35.0]));
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(parse_pair("1").is_err());
        assert!(parse_pair("1,2,3").is_err());
        assert!(parse_pair("a,2").is_err());
        assert!(parse_pair("inf,2").is_err());
    }
}

//! YAML configuration loading.
//!
//! Values may reference the environment as `${VAR}` or `${VAR:-default}`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::ServiceConfig;

/// Load a service configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to parse config from {:?}", path))?;
    debug!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

/// Parse configuration YAML after environment expansion.
pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let expanded = expand_env_vars(content)?;
    let config: ServiceConfig = serde_yaml::from_str(&expanded)?;
    Ok(config.fill_default_bands())
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`. An empty variable takes the default.
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_raster::{BoundsSource, Compression, NumericType, ZoomMismatchPolicy};

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("RASTERIZER_TEST_DIR", "/data/tiles");
        let result = expand_env_vars("path: ${RASTERIZER_TEST_DIR}/q1").unwrap();
        assert_eq!(result, "path: /data/tiles/q1");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("RASTERIZER_UNSET_ZOOM");
        let result = expand_env_vars("zoom_level: ${RASTERIZER_UNSET_ZOOM:-12}").unwrap();
        assert_eq!(result, "zoom_level: 12");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("RASTERIZER_REQUIRED");
        assert!(expand_env_vars("${RASTERIZER_REQUIRED}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_plain_dollar_is_kept() {
        assert_eq!(expand_env_vars("cost: $5").unwrap(), "cost: $5");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
raster:
  zoom_level: 12
  bands:
    - column: avg_d_kbps
      dtype: uint32
    - column: avg_lat_ms
      dtype: uint16
  bounds:
    mode: data_derived
  compression: none
  zoom_mismatch: wrap
input:
  limit: 1000
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.raster.zoom_level, 12);
        assert_eq!(config.raster.bands[1].dtype, NumericType::UInt16);
        assert_eq!(config.raster.bounds, BoundsSource::DataDerived);
        assert_eq!(config.raster.compression, Compression::None);
        assert_eq!(config.raster.zoom_mismatch, ZoomMismatchPolicy::Wrap);
        assert_eq!(config.input.limit, Some(1000));
        assert_eq!(config.input.quadkey_column, "quadkey");
    }

    #[test]
    fn test_raster_section_without_bands_gets_ookla_bands() {
        let config = parse_config("raster:\n  zoom_level: 8\n").unwrap();
        assert_eq!(config.raster.zoom_level, 8);
        assert_eq!(config.raster.bands.len(), 5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/rasterize.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}

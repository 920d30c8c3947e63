use std::path::Path;
use std::str::FromStr;

use lrnorm_core::internal::*;
use serde::Deserialize;

use crate::CliResult;

/// Run parameters, as read from an optional JSON file then overridden by
/// command line flags. Missing JSON fields keep their default.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LrnConfig {
    #[serde(alias = "radius")]
    pub depth_radius: f64,
    pub bias: f64,
    pub alpha: f64,
    pub beta: f64,
    pub region: String,
    /// 0 for one worker per cpu, 1 for the calling thread only.
    pub threads: usize,
}

impl Default for LrnConfig {
    fn default() -> LrnConfig {
        let LrnArgs { depth_radius, bias, alpha, beta, region } = LrnArgs::default();
        LrnConfig { depth_radius, bias, alpha, beta, region, threads: 1 }
    }
}

impl LrnConfig {
    pub fn from_json(json: &str) -> CliResult<LrnConfig> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> CliResult<LrnConfig> {
        let path = path.as_ref();
        let json = fs_err::read_to_string(path)?;
        LrnConfig::from_json(&json).with_context(|| format!("Parsing parameters from {path:?}"))
    }

    pub fn from_clap(matches: &clap::ArgMatches) -> CliResult<LrnConfig> {
        let mut config = if let Some(path) = matches.value_of("params") {
            LrnConfig::from_path(path)?
        } else {
            LrnConfig::default()
        };
        if let Some(radius) = parsed::<f64>(matches, "radius")? {
            config.depth_radius = radius;
        }
        if let Some(bias) = parsed::<f64>(matches, "bias")? {
            config.bias = bias;
        }
        if let Some(alpha) = parsed::<f64>(matches, "alpha")? {
            config.alpha = alpha;
        }
        if let Some(beta) = parsed::<f64>(matches, "beta")? {
            config.beta = beta;
        }
        if let Some(region) = matches.value_of("region") {
            config.region = region.to_string();
        }
        if let Some(threads) = parsed::<usize>(matches, "threads")? {
            config.threads = threads;
        }
        Ok(config)
    }

    pub fn lrn_args(&self) -> LrnArgs {
        LrnArgs {
            depth_radius: self.depth_radius,
            bias: self.bias,
            alpha: self.alpha,
            beta: self.beta,
            region: self.region.clone(),
        }
    }

    pub fn executor(&self) -> CliResult<Executor> {
        match self.threads {
            1 => Ok(Executor::SingleThread),
            0 => Executor::multithread(num_cpus::get()),
            n => Executor::multithread(n),
        }
    }
}

fn parsed<T>(matches: &clap::ArgMatches, name: &str) -> CliResult<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .map(|s| s.parse::<T>().with_context(|| format!("Parsing --{name} {s:?}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> clap::ArgMatches {
        let args = ["lrnorm", "x.npy", "-o", "y.npy"].into_iter().chain(args.iter().copied());
        crate::command().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn defaults() {
        let config = LrnConfig::from_clap(&matches(&[])).unwrap();
        assert_eq!(config, LrnConfig::default());
        assert_eq!(config.lrn_args(), LrnArgs::default());
        assert!(matches!(config.executor().unwrap(), Executor::SingleThread));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = LrnConfig::from_json(r#"{ "radius": 2, "beta": 0.75 }"#).unwrap();
        assert_eq!(config.depth_radius, 2.0);
        assert_eq!(config.beta, 0.75);
        assert_eq!(config.bias, 1.0);
        assert_eq!(config.region, "across_channels");
        assert!(LrnConfig::from_json(r#"{ "gamma": 2 }"#).is_err());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        fs_err::write(&path, r#"{ "depth_radius": 3, "alpha": 0.5, "region": "within_channel" }"#)
            .unwrap();
        let config = LrnConfig::from_clap(&matches(&[
            "--params",
            path.to_str().unwrap(),
            "--alpha",
            "1e-4",
            "--threads",
            "2",
        ]))
        .unwrap();
        assert_eq!(config.depth_radius, 3.0);
        assert_eq!(config.alpha, 1e-4);
        assert_eq!(config.region, "within_channel");
        let lrn = config.lrn_args().to_op().unwrap();
        assert_eq!(lrn, Lrn::new(3, 1.0, 1e-4, 0.5, LrnRegion::WithinChannel));
        assert!(matches!(config.executor().unwrap(), Executor::MultiThread(_)));
    }

    #[test]
    fn bad_flags() {
        assert!(LrnConfig::from_clap(&matches(&["--bias", "one"])).is_err());
        assert!(LrnConfig::from_clap(&matches(&["--threads", "many"])).is_err());
        let config = LrnConfig::from_clap(&matches(&["--radius", "2.5"])).unwrap();
        let e = config.lrn_args().to_op().unwrap_err();
        assert_eq!(e.downcast_ref::<InvalidArgument>(), Some(&InvalidArgument::Radius(2.5)));
    }
}

#[macro_use]
extern crate log;

use std::process;

use clap::{crate_version, Arg, ArgMatches, Command};
use lrnorm_core::internal::*;

mod npy;
mod params;

use crate::params::LrnConfig;

pub type CliResult<T> = lrnorm_core::anyhow::Result<T>;

fn command() -> Command<'static> {
    Command::new("lrnorm")
        .version(crate_version!())
        .about("Local response normalization of a rank 3 (HWC) or rank 4 (NHWC) npy tensor")
        .arg(Arg::new("input").required(true).help("Input tensor, f32 or f64 npy"))
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .required(true)
                .help("Where to write the normalized tensor"),
        )
        .arg(
            Arg::new("params")
                .long("params")
                .takes_value(true)
                .help("JSON file with depth_radius, bias, alpha, beta, region and threads"),
        )
        .arg(Arg::new("radius").long("radius").takes_value(true).help("Depth radius [default: 5]"))
        .arg(Arg::new("bias").long("bias").takes_value(true).help("Bias [default: 1]"))
        .arg(Arg::new("alpha").long("alpha").takes_value(true).help("Scale [default: 1]"))
        .arg(Arg::new("beta").long("beta").takes_value(true).help("Exponent [default: 0.5]"))
        .arg(
            Arg::new("region")
                .long("region")
                .takes_value(true)
                .help("across_channels or within_channel [default: across_channels]"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .takes_value(true)
                .help("Worker threads, 0 for one per cpu [default: 1]"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .multiple_occurrences(true)
                .help("Sets the level of verbosity."),
        )
}

/// Entrypoint for the command-line interface.
fn main() {
    let matches = command().get_matches();

    let level = match matches.occurrences_of("verbosity") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    if let Err(e) = handle(&matches) {
        error!("{e:?}");
        process::exit(1)
    }
}

fn handle(matches: &ArgMatches) -> CliResult<()> {
    let config = LrnConfig::from_clap(matches)?;
    info!("Running with {config:?}");
    set_default_executor(config.executor()?);

    let input_path = matches.value_of("input").context("No input given")?;
    let output_path = matches.value_of("output").context("No output given")?;
    let input = npy::load(input_path)?;
    info!("Loaded {input:?} from {input_path}");

    let input = LrnInput::from_tensor(input)?;
    let output = local_response_normalization(input, &config.lrn_args(), None)?;
    npy::save(output.tensor(), output_path)?;
    info!("Wrote {:?} to {output_path}", output.tensor());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> CliResult<()> {
        let args = std::iter::once("lrnorm").chain(args.iter().copied());
        let matches = command().try_get_matches_from(args)?;
        handle(&matches)
    }

    #[test]
    fn normalizes_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("x.npy");
        let output = dir.path().join("y.npy");
        npy::save(&tensor3(&[[[1f64, 2., 3.]]]), &input).unwrap();
        run(&[input.to_str().unwrap(), "-o", output.to_str().unwrap(), "--radius", "1"]).unwrap();
        let y = npy::load(&output).unwrap();
        let expected = tensor3(&[[[1. / 6f64.sqrt(), 2. / 15f64.sqrt(), 3. / 14f64.sqrt()]]]);
        y.close_enough(&expected, Approximation::Close).unwrap();
    }

    #[test]
    fn rejects_a_bad_rank() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("x.npy");
        let output = dir.path().join("y.npy");
        npy::save(&tensor2(&[[1f32, 2.]]), &input).unwrap();
        let e = run(&[input.to_str().unwrap(), "-o", output.to_str().unwrap()]).unwrap_err();
        assert!(e.downcast_ref::<InvalidArgument>().is_some());
        assert!(!output.exists());
    }

    #[test]
    fn output_is_required() {
        assert!(run(&["x.npy"]).is_err());
    }
}

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{App, Arg, ArgMatches};
use log::{info, warn};
use rand::{rngs::SmallRng, SeedableRng};
use rangegrid_algorithms::{
    summary::cloud_summary,
    synthetic::{corrupt_points, drop_points, sweep},
    LogObserver, RobustFitOptions, SphericalProjection,
};

struct Args {
    pub height: u32,
    pub width: u32,
    pub azimuth_start: f32,
    pub azimuth_step: f32,
    pub elevation_start: f32,
    pub elevation_step: f32,
    pub range: f32,
    pub dropout: f64,
    pub corrupt: f64,
    pub seed: u64,
    pub min_candidates: usize,
}

fn parse<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = matches
        .value_of(name)
        .with_context(|| format!("Missing value for {}", name))?;
    value
        .parse()
        .with_context(|| format!("Invalid value '{}' for {}", value, name))
}

fn ratio(matches: &ArgMatches, name: &str) -> Result<f64> {
    let value: f64 = parse(matches, name)?;
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be within [0, 1], got {}", name, value);
    }
    Ok(value)
}

fn app() -> App<'static, 'static> {
    App::new("rangegrid calibrate")
        .version("0.1")
        .about("Synthesizes a range sensor sweep and calibrates a spherical projection model from it")
        .arg(
            Arg::with_name("HEIGHT")
                .long("height")
                .takes_value(true)
                .default_value("32")
                .help("Number of rows of the sweep"),
        )
        .arg(
            Arg::with_name("WIDTH")
                .long("width")
                .takes_value(true)
                .default_value("1024")
                .help("Number of columns of the sweep"),
        )
        .arg(
            Arg::with_name("AZIMUTH_START")
                .long("azimuth-start")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-179.8")
                .help("Azimuth of the first column in degrees"),
        )
        .arg(
            Arg::with_name("AZIMUTH_STEP")
                .long("azimuth-step")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0.35")
                .help("Azimuth increment per column in degrees"),
        )
        .arg(
            Arg::with_name("ELEVATION_START")
                .long("elevation-start")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-22.5")
                .help("Elevation of the first row in degrees"),
        )
        .arg(
            Arg::with_name("ELEVATION_STEP")
                .long("elevation-step")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1.4")
                .help("Elevation increment per row in degrees"),
        )
        .arg(
            Arg::with_name("RANGE")
                .long("range")
                .takes_value(true)
                .default_value("10")
                .help("Distance of all points from the sensor"),
        )
        .arg(
            Arg::with_name("DROPOUT")
                .long("dropout")
                .takes_value(true)
                .default_value("0.2")
                .help("Fraction of points without a return"),
        )
        .arg(
            Arg::with_name("CORRUPT")
                .long("corrupt")
                .takes_value(true)
                .default_value("0.02")
                .help("Fraction of points moved to random directions"),
        )
        .arg(
            Arg::with_name("SEED")
                .long("seed")
                .takes_value(true)
                .default_value("0")
                .help("Seed for dropouts, corrupted points and the robust fit"),
        )
        .arg(
            Arg::with_name("MIN_CANDIDATES")
                .long("min-candidates")
                .takes_value(true)
                .default_value("25")
                .help("Minimum number of candidates per axis for the robust fit"),
        )
}

fn args_from(matches: &ArgMatches) -> Result<Args> {
    Ok(Args {
        height: parse(matches, "HEIGHT")?,
        width: parse(matches, "WIDTH")?,
        azimuth_start: parse::<f32>(matches, "AZIMUTH_START")?.to_radians(),
        azimuth_step: parse::<f32>(matches, "AZIMUTH_STEP")?.to_radians(),
        elevation_start: parse::<f32>(matches, "ELEVATION_START")?.to_radians(),
        elevation_step: parse::<f32>(matches, "ELEVATION_STEP")?.to_radians(),
        range: parse(matches, "RANGE")?,
        dropout: ratio(matches, "DROPOUT")?,
        corrupt: ratio(matches, "CORRUPT")?,
        seed: parse(matches, "SEED")?,
        min_candidates: parse(matches, "MIN_CANDIDATES")?,
    })
}

fn get_args() -> Result<Args> {
    args_from(&app().get_matches())
}

fn sensor(args: &Args) -> SphericalProjection {
    SphericalProjection::new(
        args.azimuth_start,
        args.azimuth_step,
        args.elevation_start,
        args.elevation_step,
        args.height,
        args.width,
    )
}

fn print_model(name: &str, model: &SphericalProjection, truth: &SphericalProjection) {
    println!("{}: {}", name, model);
    println!(
        "\tazimuth start error {:.4} deg, step error {:.6} deg",
        (model.azimuth_start() - truth.azimuth_start()).to_degrees(),
        (model.azimuth_step() - truth.azimuth_step()).to_degrees()
    );
    println!(
        "\televation start error {:.4} deg, step error {:.6} deg",
        (model.elevation_start() - truth.elevation_start()).to_degrees(),
        (model.elevation_step() - truth.elevation_step()).to_degrees()
    );
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;
    let truth = sensor(&args);
    println!("Sensor: {}", truth);

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let mut cloud = sweep(&truth, args.range)?;
    let dropped = drop_points(&mut cloud, args.dropout, &mut rng)?;
    let corrupted = corrupt_points(&mut cloud, args.corrupt, args.range, &mut rng)?;
    info!(
        "Synthesized {} points, {} dropped, {} corrupted.",
        cloud.num_points(),
        dropped.len(),
        corrupted.len()
    );
    print!("{}", cloud_summary(&cloud)?);

    let mut fast = SphericalProjection::default();
    match fast.fit_fast(&cloud) {
        Ok(()) => print_model("Fast fit", &fast, &truth),
        Err(e) => warn!("Fast fit failed, continuing with the robust fit: {}", e),
    }

    let mut robust = SphericalProjection::default();
    robust
        .fit_robust_with(
            &cloud,
            &mut rng,
            &RobustFitOptions {
                min_candidates: args.min_candidates,
            },
            &LogObserver,
        )
        .context("Robust fit failed")?;
    print_model("Robust fit", &robust, &truth);

    let report = robust.check(&cloud)?;
    println!(
        "Check: {} / {} valid points off their cell, mean residual {:.4} deg",
        report.mismatched_points,
        report.valid_points,
        report.mean_residual.to_degrees()
    );
    print!("{}", robust.model_summary());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sensor_fits_without_wrap() {
        let args = args_from(&app().get_matches_from(vec!["calibrate"])).unwrap();
        let truth = sensor(&args);
        assert!(truth.azimuth_start() > -std::f32::consts::PI);

        let cloud = sweep(&truth, args.range).unwrap();
        let mut fast = SphericalProjection::default();
        fast.fit_fast(&cloud).unwrap();
        assert!((fast.azimuth_start() - truth.azimuth_start()).abs() < 1e-3);
        assert!((fast.azimuth_step() - truth.azimuth_step()).abs() < 1e-5);
    }
}

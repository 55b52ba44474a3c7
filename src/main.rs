use std::{
    cell::{Cell, RefCell},
    path::PathBuf,
    rc::Rc,
};

use anyhow::Result;
use chrono::{Local, TimeDelta};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use colored::Colorize;
use human_panic::setup_panic;
use log::{debug, warn};

use metronome::clock::offset;
use metronome::config::{self, Config};
use metronome::hooks::Hook;
use metronome::time::TimeDeltaExt;
use metronome::{
    ms_to_time, schedule_countdown, schedule_interval, schedule_timeout, IntervalOptions,
    SystemClock, TimeoutOptions, TimerQueue,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Config file to use. [default: ${XDG_CONFIG_DIR}/metronome/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Wait once, then print the time the timeout fired
    Timeout {
        /// How long to wait, e.g. 90s or 5m
        #[arg(value_parser = TimeDelta::from_human)]
        duration: Option<TimeDelta>,
    },
    /// Print a line once per period
    Interval {
        /// Length of one period, e.g. 500ms or 1s
        #[arg(value_parser = TimeDelta::from_human)]
        duration: Option<TimeDelta>,
        /// Stop after this many ticks
        #[arg(short = 'n', long)]
        count: Option<u64>,
        /// Fire the first tick immediately instead of after one period
        #[arg(short, long, default_value_t = false)]
        skip_first_interval: bool,
    },
    /// Print the time remaining every second until it runs out
    Countdown {
        /// How long to count down, e.g. 25m or 1h30m
        #[arg(value_parser = TimeDelta::from_human)]
        duration: Option<TimeDelta>,
        /// Print each report as a JSON object
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn run_timeout(config: &Config, duration: TimeDelta) -> Result<()> {
    let queue = Rc::new(TimerQueue::new(SystemClock));
    let fired = Rc::new(Cell::new(false));

    println!("Waiting {}", duration.to_human().cyan());

    let done = fired.clone();
    let _timeout = schedule_timeout(
        &queue,
        move |timestamp| {
            println!(
                "Timeout fired at {}",
                timestamp.with_timezone(&Local).to_rfc3339().yellow()
            );
            done.set(true);
        },
        TimeoutOptions {
            duration,
            playing: true,
        },
    );

    queue.run_while(|| !fired.get());

    Hook::TimeoutEnd.run(&config.hooks_directory)
}

fn run_interval(
    config: &Config,
    duration: TimeDelta,
    count: Option<u64>,
    skip_first_interval: bool,
) -> Result<()> {
    if duration <= TimeDelta::zero() {
        warn!("Interval period is zero, ticks will fire as fast as the timer allows");
    }

    let queue = Rc::new(TimerQueue::new(SystemClock));
    let ticks = Rc::new(Cell::new(0u64));
    let failure: Rc<RefCell<Option<anyhow::Error>>> = Rc::new(RefCell::new(None));

    let tick_count = ticks.clone();
    let tick_failure = failure.clone();
    let hooks_directory = config.hooks_directory.clone();

    let _interval = schedule_interval(
        &queue,
        move |timestamp| {
            let n = tick_count.get() + 1;
            tick_count.set(n);

            println!(
                "{} {}",
                format!("#{}", n).magenta().bold(),
                timestamp.with_timezone(&Local).format("%H:%M:%S%.3f")
            );

            if let Err(e) = Hook::IntervalTick.run(&hooks_directory) {
                *tick_failure.borrow_mut() = Some(e);
            }
        },
        IntervalOptions {
            duration,
            skip_first_interval,
            ..Default::default()
        },
    );

    queue.run_while(|| {
        failure.borrow().is_none() && count.map_or(true, |count| ticks.get() < count)
    });

    let failure = failure.borrow_mut().take();
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run_countdown(config: &Config, duration: TimeDelta, json: bool) -> Result<()> {
    let queue = Rc::new(TimerQueue::new(SystemClock));
    let target = offset(queue.now(), duration);
    let finished = Rc::new(Cell::new(false));
    let failure: Rc<RefCell<Option<anyhow::Error>>> = Rc::new(RefCell::new(None));

    debug!("Counting down to {}", target.with_timezone(&Local).to_rfc3339());

    let report_finished = finished.clone();
    let report_failure = failure.clone();

    let _countdown = schedule_countdown(
        &queue,
        move |remaining: TimeDelta| {
            let left = remaining.max(TimeDelta::zero());

            if json {
                match serde_json::to_string(&ms_to_time(left)) {
                    Ok(line) => println!("{}", line),
                    Err(e) => *report_failure.borrow_mut() = Some(e.into()),
                }
            } else {
                println!("Time remaining: {}", left.to_kitchen().cyan());
            }

            if remaining <= TimeDelta::zero() {
                report_finished.set(true);
            }
        },
        target,
        false,
    );

    queue.run_while(|| !finished.get() && failure.borrow().is_none());

    let failure = failure.borrow_mut().take();
    if let Some(e) = failure {
        return Err(e);
    }

    if !json {
        println!("{}", "Done!".red().bold());
    }

    Hook::CountdownEnd.run(&config.hooks_directory)
}

fn main() -> Result<()> {
    setup_panic!();

    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let config_path = if let Some(conf_path) = args.config {
        conf_path
    } else {
        config::default_config_path()?
    };

    let config = Config::init(&config_path)?;
    debug!("Using config from {}", config_path.display());

    match args.command {
        Command::Timeout { duration } => {
            run_timeout(&config, duration.unwrap_or(config.timeout_duration))?;
        }
        Command::Interval {
            duration,
            count,
            skip_first_interval,
        } => {
            run_interval(
                &config,
                duration.unwrap_or(config.interval_duration),
                count,
                skip_first_interval || config.skip_first_interval,
            )?;
        }
        Command::Countdown { duration, json } => {
            run_countdown(&config, duration.unwrap_or(config.countdown_duration), json)?;
        }
    }

    Ok(())
}

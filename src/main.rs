#![warn(clippy::pedantic)]
#![allow(clippy::struct_excessive_bools)]

use std::path::PathBuf;

use clap::Parser;
use feascheck::{
    parser,
    report::{self, ConstraintLogOptions},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// The file containing the model to check
    file_name: PathBuf,
    /// Absolute tolerance for bound violations and near-bound checks
    #[arg(short, long, default_value_t = report::DEFAULT_TOL)]
    tol: f64,
    /// Report active constraints whose body violates their bounds
    #[arg(long)]
    constraints: bool,
    /// Report variables whose value violates their bounds
    #[arg(long)]
    bounds: bool,
    /// Report variables and constraints close to their bounds
    #[arg(long)]
    close_to_bounds: bool,
    /// List the active constraints without evaluating them
    #[arg(long)]
    active: bool,
    /// Include the constraint expression in violation lines
    #[arg(long)]
    expressions: bool,
    /// Include the values of the variables appearing in each flagged constraint
    #[arg(long)]
    variables: bool,
    /// Print the parsed model before reporting
    #[arg(long)]
    print_model: bool,
    /// Also log components skipped for missing values (debug level)
    #[arg(short, long)]
    verbose: bool,
}

pub fn main() {
    let args = CliArgs::parse();
    if args.verbose {
        init_logging("feascheck=debug");
    } else {
        init_logging("feascheck=info");
    }

    let model = parser::parse_file(&args.file_name).unwrap();
    if args.print_model {
        print!("{model}");
    }

    // With no report selected, run the two violation reports.
    let default_reports = !(args.constraints || args.bounds || args.close_to_bounds || args.active);
    if args.constraints || default_reports {
        report::log_infeasible_constraints(
            &model,
            args.tol,
            ConstraintLogOptions {
                log_expression: args.expressions,
                log_variables: args.variables,
            },
        );
    }
    if args.bounds || default_reports {
        report::log_infeasible_bounds(&model, args.tol);
    }
    if args.close_to_bounds {
        report::log_close_to_bounds(&model, args.tol);
    }
    if args.active {
        report::log_active_constraints(&model);
    }
}

fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .with_level(false)
        .with_ansi(false)
        .init();
}

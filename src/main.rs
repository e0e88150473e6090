use clap::{Args, Parser, Subcommand, ValueEnum};
use ndarray::{Array2, ArrayView2};
use schurvec::{
    classify_blocks, classify_pencil, eigenvectors, generalized_eigenvectors, io as mio,
    progress::{finish_progress, spinner_progress},
    reorder_generalized, reorder_schur, select_eigenvalues, select_generalized,
    EigenvalueSelector, EigenvectorConfig, Normalization, SchurError, SwapConfig,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// schurvec: eigenvectors and eigenvalue reordering for real Schur forms
#[derive(Parser, Debug)]
#[command(
    name = "schurvec",
    about = "Select, reorder and compute eigenvectors of real (generalized) Schur forms",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a predicate on every eigenvalue and write the selection array
    Select(SelectArgs),
    /// Move the selected eigenvalues to the leading part of the Schur form
    Reorder(ReorderArgs),
    /// Compute eigenvectors of the selected eigenvalues
    Eigenvectors(EigenvectorArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PredicateArg {
    All,
    LeftHalfPlane,
    InsideUnitCircle,
    Real,
    Complex,
}

impl From<PredicateArg> for EigenvalueSelector {
    fn from(p: PredicateArg) -> Self {
        match p {
            PredicateArg::All => EigenvalueSelector::All,
            PredicateArg::LeftHalfPlane => EigenvalueSelector::LeftHalfPlane,
            PredicateArg::InsideUnitCircle => EigenvalueSelector::InsideUnitCircle,
            PredicateArg::Real => EigenvalueSelector::Real,
            PredicateArg::Complex => EigenvalueSelector::Complex,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum NormalizationArg {
    MaxAbs,
    Euclidean,
}

#[derive(Args, Debug, Clone)]
struct FormArgs {
    /// Quasi-triangular matrix S (.npy or .csv)
    #[arg(short = 's', long, value_name = "S")]
    schur: PathBuf,
    /// Upper triangular T of a generalized Schur pencil (S, T)
    #[arg(short = 't', long, value_name = "T")]
    pencil: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SelectArgs {
    #[command(flatten)]
    form: FormArgs,
    /// Which eigenvalues to select
    #[arg(short, long, value_enum, default_value = "left-half-plane")]
    predicate: PredicateArg,
    /// Output selection file (one CSV line of 0/1 flags)
    #[arg(short, long, value_name = "SELECTION")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ReorderArgs {
    #[command(flatten)]
    form: FormArgs,
    /// Orthogonal factor Q accumulated so far (left factor for a pencil)
    #[arg(short = 'q', long, value_name = "Q")]
    left: Option<PathBuf>,
    /// Right orthogonal factor Z of a pencil
    #[arg(short = 'z', long, value_name = "Z", requires = "pencil")]
    right: Option<PathBuf>,
    /// Selection file written by `select`
    #[arg(long, value_name = "SELECTION")]
    selection: PathBuf,
    /// Directory for the reordered matrices, eigenvalue lists and final selection
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,
    /// Multiple of eps * ||block|| a swap may leave behind
    #[arg(long, default_value_t = 20.0)]
    threshold_factor: f64,
    /// Refinement sweeps for the small Sylvester solves
    #[arg(long, default_value_t = 2)]
    max_refinement_steps: usize,
}

#[derive(Args, Debug)]
struct EigenvectorArgs {
    #[command(flatten)]
    form: FormArgs,
    /// Back-transform with this orthogonal factor (Q for S, Z for a pencil)
    #[arg(short = 'q', long, value_name = "Q")]
    back_transform: Option<PathBuf>,
    /// Selection file; every eigenvalue is used when omitted
    #[arg(long, value_name = "SELECTION")]
    selection: Option<PathBuf>,
    /// Output eigenvector matrix
    #[arg(short, long, value_name = "X")]
    output: PathBuf,
    #[arg(long, value_enum, default_value = "max-abs")]
    normalization: NormalizationArg,
    /// Compute one eigenvector at a time instead of in parallel
    #[arg(long)]
    serial: bool,
}

fn to_io(err: SchurError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
}

fn load(path: &Path, what: &str) -> io::Result<Array2<f64>> {
    let m = mio::read_matrix(path)?;
    println!("✅ Loaded {} ({}x{}) from {}", what, m.nrows(), m.ncols(), path.display());
    Ok(m)
}

/// Prints eigenvalues as a table, selected rows highlighted
fn print_eigenvalue_table(
    real: &[f64],
    imag: &[f64],
    beta: Option<&[f64]>,
    selected: &[bool],
) -> io::Result<()> {
    let stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut stdout = stdout.lock();

    let mut header = ColorSpec::new();
    header.set_bold(true);
    stdout.set_color(&header)?;
    match beta {
        Some(_) => writeln!(stdout, "{:>5}  {:>14}  {:>14}  {:>14}  sel", "#", "real", "imag", "beta")?,
        None => writeln!(stdout, "{:>5}  {:>14}  {:>14}  sel", "#", "real", "imag")?,
    }
    stdout.reset()?;

    for i in 0..real.len() {
        let mut spec = ColorSpec::new();
        if selected.get(i).copied().unwrap_or(false) {
            spec.set_fg(Some(Color::Green)).set_bold(true);
        }
        stdout.set_color(&spec)?;
        write!(stdout, "{:>5}  {:>14.6e}  {:>14.6e}", i, real[i], imag[i])?;
        if let Some(beta) = beta {
            write!(stdout, "  {:>14.6e}", beta[i])?;
        }
        let mark = if selected.get(i).copied().unwrap_or(false) { "*" } else { "" };
        writeln!(stdout, "  {}", mark)?;
        stdout.reset()?;
    }
    Ok(())
}

fn run_select(args: SelectArgs) -> io::Result<()> {
    let selector = EigenvalueSelector::from(args.predicate);
    let s = load(&args.form.schur, "S")?;
    let selection = match &args.form.pencil {
        Some(path) => {
            let t = load(path, "T")?;
            select_generalized(s.view(), t.view(), |re, im, beta| {
                selector.accepts_generalized(re, im, beta)
            })
            .map_err(to_io)?
        }
        None => select_eigenvalues(s.view(), |re, im| selector.accepts(re, im)).map_err(to_io)?,
    };
    mio::write_selection(&selection.selected, &args.output)?;
    println!(
        "🎯 Selected {} of {} eigenvalues, saved to {}",
        selection.count,
        selection.selected.len(),
        args.output.display()
    );
    Ok(())
}

// One CSV line per list: real.csv, imag.csv and for a pencil beta.csv
fn write_eigenvalues(
    dir: &Path,
    real: &[f64],
    imag: &[f64],
    beta: Option<&[f64]>,
) -> io::Result<()> {
    mio::write_vector(real, dir.join("real.csv"))?;
    mio::write_vector(imag, dir.join("imag.csv"))?;
    if let Some(beta) = beta {
        mio::write_vector(beta, dir.join("beta.csv"))?;
    }
    Ok(())
}

fn back_transform_name(pencil: bool) -> &'static str {
    if pencil {
        "Z"
    } else {
        "Q"
    }
}

fn run_reorder(args: ReorderArgs) -> io::Result<()> {
    let config =
        SwapConfig::new(args.threshold_factor, args.max_refinement_steps).map_err(to_io)?;
    let mut s = load(&args.form.schur, "S")?;
    let mut q = args.left.as_deref().map(|p| load(p, "Q")).transpose()?;
    let mut selected = mio::read_selection(&args.selection)?;
    fs::create_dir_all(&args.output)?;

    let start = Instant::now();
    let pb = spinner_progress("reorder", "swapping diagonal blocks");

    match &args.form.pencil {
        Some(path) => {
            let mut t = load(path, "T")?;
            let mut z = args.right.as_deref().map(|p| load(p, "Z")).transpose()?;
            let report = reorder_generalized(
                s.view_mut(),
                t.view_mut(),
                q.as_mut().map(|m| m.view_mut()),
                z.as_mut().map(|m| m.view_mut()),
                &mut selected,
                &config,
            )
            .map_err(to_io)?;
            finish_progress(&pb, format!("{} swaps", report.swaps));
            if let Some(err) = &report.rejected {
                println!("⚠️ Partial reordering: {}", err);
            }
            let eig = &report.eigenvalues;
            print_eigenvalue_table(&eig.real, &eig.imag, Some(&eig.beta), &selected)?;
            mio::write_matrix(&t, args.output.join("T.npy"))?;
            if let Some(z) = &z {
                mio::write_matrix(z, args.output.join("Z.npy"))?;
            }
            write_eigenvalues(&args.output, &eig.real, &eig.imag, Some(&eig.beta))?;
        }
        None => {
            let report = reorder_schur(
                s.view_mut(),
                q.as_mut().map(|m| m.view_mut()),
                &mut selected,
                &config,
            )
            .map_err(to_io)?;
            finish_progress(&pb, format!("{} swaps", report.swaps));
            if let Some(err) = &report.rejected {
                println!("⚠️ Partial reordering: {}", err);
            }
            let eig = &report.eigenvalues;
            print_eigenvalue_table(&eig.real, &eig.imag, None, &selected)?;
            write_eigenvalues(&args.output, &eig.real, &eig.imag, None)?;
        }
    }

    mio::write_matrix(&s, args.output.join("S.npy"))?;
    if let Some(q) = &q {
        mio::write_matrix(q, args.output.join("Q.npy"))?;
    }
    mio::write_selection(&selected, args.output.join("selection.csv"))?;
    println!(
        "✨ Reordered form saved to {} in {:.2?}",
        args.output.display(),
        start.elapsed()
    );
    Ok(())
}

fn run_eigenvectors(args: EigenvectorArgs) -> io::Result<()> {
    let config = EigenvectorConfig {
        normalization: match args.normalization {
            NormalizationArg::MaxAbs => Normalization::MaxAbs,
            NormalizationArg::Euclidean => Normalization::Euclidean,
        },
        parallel: !args.serial,
    };
    let s = load(&args.form.schur, "S")?;
    let t = args.form.pencil.as_deref().map(|p| load(p, "T")).transpose()?;
    let acc_name = back_transform_name(t.is_some());
    let acc = args.back_transform.as_deref().map(|p| load(p, acc_name)).transpose()?;
    let selected = match &args.selection {
        Some(path) => mio::read_selection(path)?,
        None => vec![true; s.nrows()],
    };
    let acc_view: Option<ArrayView2<f64>> = acc.as_ref().map(|m| m.view());

    let start = Instant::now();
    let pb = spinner_progress("eigvec", "back-substituting");
    let out = match &t {
        Some(t) => generalized_eigenvectors(s.view(), t.view(), acc_view, &selected, &config),
        None => eigenvectors(s.view(), acc_view, &selected, &config),
    }
    .map_err(to_io)?;
    finish_progress(&pb, format!("{} columns", out.vectors.ncols()));

    let blocks = match &t {
        Some(t) => classify_pencil(s.view(), t.view()),
        None => classify_blocks(s.view()),
    }
    .map_err(to_io)?;
    let pairs = blocks
        .iter()
        .filter(|b| b.is_pair() && selected[b.start()])
        .count();
    println!(
        "📊 {} eigenvector columns ({} conjugate pairs)",
        out.vectors.ncols(),
        pairs
    );
    if !out.is_complete() {
        println!(
            "❗ Eigenvectors could not be computed for eigenvalues at rows {:?}",
            out.failed
        );
    }

    mio::write_matrix(&out.vectors, &args.output)?;
    println!(
        "✅ Eigenvectors saved to {} in {:.2?}",
        args.output.display(),
        start.elapsed()
    );
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Select(args) => run_select(args)?,
        Command::Reorder(args) => run_reorder(args)?,
        Command::Eigenvectors(args) => run_eigenvectors(args)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn right_factor_requires_a_pencil() {
        let base = ["schurvec", "reorder", "-s", "S.npy", "--selection", "sel.csv", "-o", "out"];
        let without: Vec<&str> = base.iter().copied().chain(["-z", "Z.npy"]).collect();
        assert!(Cli::try_parse_from(without).is_err());

        let with: Vec<&str> = base
            .iter()
            .copied()
            .chain(["-t", "T.npy", "-z", "Z.npy"])
            .collect();
        assert!(Cli::try_parse_from(with).is_ok());
    }

    #[test]
    fn back_transform_factor_is_named_by_problem() {
        assert_eq!(back_transform_name(false), "Q");
        assert_eq!(back_transform_name(true), "Z");
    }
}

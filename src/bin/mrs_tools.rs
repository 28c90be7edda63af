//! Command line tools for NIfTI-MRS files: inspect, merge, split, reorder,
//! reshape and conjugate.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use log::info;

use nifti_mrs::definitions::gyromagnetic_ratio;
use nifti_mrs::tools::{conjugate, merge, reorder, reshape, split};
use nifti_mrs::{DimRef, DimensionTag, NiftiMrs, Result, SplitSelector};

#[derive(Parser, Debug)]
#[command(name = "mrs_tools", author, version, about = "Tools for NIfTI-MRS files")]
struct Cli {
    /// Log more details (-v for progress, -vv for every transformation)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Output {
    /// Directory to write the output file(s) to
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Name of the output file, without extension
    #[arg(long)]
    filename: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of one or more files
    Info {
        /// NIfTI-MRS files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Concatenate files along a higher dimension
    Merge {
        /// Files to merge, in order
        #[arg(long, num_args = 2.., required = true)]
        files: Vec<PathBuf>,
        /// Tag of the dimension to merge along
        #[arg(long, value_parser = parse_tag)]
        dim: DimensionTag,
        /// Add the dimension as a new singleton dimension where a file lacks it
        #[arg(long)]
        newaxis: bool,
        #[command(flatten)]
        out: Output,
    },
    /// Split a file in two along a higher dimension
    Split {
        /// File to split
        #[arg(long)]
        file: PathBuf,
        /// Tag or index (4 to 6) of the dimension to split
        #[arg(long, value_parser = parse_dim)]
        dim: DimRef,
        /// Last index of the first output
        #[arg(long, conflicts_with = "indices", required_unless_present = "indices")]
        index: Option<usize>,
        /// Indices to move to the second output
        #[arg(long, num_args = 1..)]
        indices: Option<Vec<usize>>,
        #[command(flatten)]
        out: Output,
    },
    /// Reorder the higher dimensions
    Reorder {
        /// File to reorder
        #[arg(long)]
        file: PathBuf,
        /// New order of the dimension tags
        #[arg(long = "dim_order", num_args = 1..=3, required = true, value_parser = parse_tag)]
        dim_order: Vec<DimensionTag>,
        #[command(flatten)]
        out: Output,
    },
    /// Reshape the higher dimensions
    Reshape {
        /// File to reshape
        #[arg(long)]
        file: PathBuf,
        /// New sizes of the higher dimensions, one of which may be -1
        #[arg(long, num_args = 1..=3, required = true, allow_negative_numbers = true)]
        shape: Vec<isize>,
        /// Tag of the 5th dimension
        #[arg(long, value_parser = parse_tag)]
        d5: Option<DimensionTag>,
        /// Tag of the 6th dimension
        #[arg(long, value_parser = parse_tag)]
        d6: Option<DimensionTag>,
        /// Tag of the 7th dimension
        #[arg(long, value_parser = parse_tag)]
        d7: Option<DimensionTag>,
        #[command(flatten)]
        out: Output,
    },
    /// Take the complex conjugate of the data
    Conjugate {
        /// File to conjugate
        #[arg(long)]
        file: PathBuf,
        #[command(flatten)]
        out: Output,
    },
}

fn parse_tag(s: &str) -> ::std::result::Result<DimensionTag, String> {
    s.parse().map_err(|e: nifti_mrs::NiftiMrsError| e.to_string())
}

fn parse_dim(s: &str) -> ::std::result::Result<DimRef, String> {
    match s.parse::<usize>() {
        Ok(index) => Ok(DimRef::Index(index)),
        Err(_) => parse_tag(s).map(DimRef::Tag),
    }
}

/// File name without the `.nii` or `.nii.gz` extension.
fn stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.strip_suffix(".nii").unwrap_or(name).to_owned()
}

impl Output {
    fn save(&self, obj: &NiftiMrs, default_name: String) -> Result<()> {
        fs::create_dir_all(&self.output)?;
        let name = self.filename.clone().unwrap_or(default_name);
        let path = obj.save(self.output.join(name))?;
        info!("wrote {}", path.display());
        Ok(())
    }
}

fn print_info(path: &Path) -> Result<()> {
    let obj = NiftiMrs::load(path)?;
    let (major, minor) = obj.nifti_mrs_version()?;
    let tags: Vec<&str> = obj
        .dim_tags()
        .iter()
        .map(|t| t.map_or("None", DimensionTag::as_str))
        .collect();
    let frequencies: Vec<String> = obj
        .spectrometer_frequency()
        .iter()
        .map(|f| format!("{:.6}", f))
        .collect();

    println!("Read file {}", path.display());
    println!("NIfTI-MRS version {}.{}", major, minor);
    println!("Data shape {:?}", obj.shape());
    println!("Dimension tags: {}", tags.join(", "));
    println!("Spectrometer Frequency: {} MHz", frequencies.join(", "));
    println!("Resonant nucleus: {}", obj.nucleus().join(", "));
    let field = obj
        .nucleus()
        .first()
        .and_then(|n| gyromagnetic_ratio(n))
        .zip(obj.spectrometer_frequency().first());
    if let Some((gamma, frequency)) = field {
        println!("Field Strength: {:.2} T", frequency / gamma);
    }
    println!(
        "Dwelltime (Bandwidth): {:.3e}s ({:.0} Hz)",
        obj.dwelltime(),
        obj.bandwidth()
    );
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Info { files } => {
            for file in &files {
                print_info(file)?;
            }
        }
        Command::Merge {
            files,
            dim,
            newaxis,
            out,
        } => {
            let mut objs = files
                .iter()
                .map(NiftiMrs::load)
                .collect::<Result<Vec<_>>>()?;
            if newaxis {
                for obj in &mut objs {
                    let mut order: Vec<_> = obj.dim_tags().iter().copied().flatten().map(Some).collect();
                    if !order.contains(&Some(dim)) {
                        order.push(Some(dim));
                        *obj = reorder(obj, &order)?;
                    }
                }
            }
            let merged = merge(&objs, dim)?;
            let stems: Vec<String> = files.iter().map(|f| stem(f)).collect();
            out.save(&merged, format!("{}_merged", stems.join("_")))?;
        }
        Command::Split {
            file,
            dim,
            index,
            indices,
            out,
        } => {
            let obj = NiftiMrs::load(&file)?;
            let (selector, names) = match index {
                Some(k) => (SplitSelector::At(k), ["low", "high"]),
                None => (
                    SplitSelector::Indices(indices.unwrap_or_default()),
                    ["others", "selected"],
                ),
            };
            let (first, second) = split(&obj, dim, selector)?;
            let base = out.filename.clone().unwrap_or_else(|| stem(&file));
            fs::create_dir_all(&out.output)?;
            for (part, name) in [first, second].iter().zip(&names) {
                let path = part.save(out.output.join(format!("{}_{}", base, name)))?;
                info!("wrote {}", path.display());
            }
        }
        Command::Reorder {
            file,
            dim_order,
            out,
        } => {
            let obj = NiftiMrs::load(&file)?;
            let order: Vec<_> = dim_order.into_iter().map(Some).collect();
            let reordered = reorder(&obj, &order)?;
            out.save(&reordered, format!("{}_reordered", stem(&file)))?;
        }
        Command::Reshape {
            file,
            shape,
            d5,
            d6,
            d7,
            out,
        } => {
            let obj = NiftiMrs::load(&file)?;
            let reshaped = reshape(&obj, &shape, &[d5, d6, d7])?;
            out.save(&reshaped, format!("{}_reshaped", stem(&file)))?;
        }
        Command::Conjugate { file, out } => {
            let obj = NiftiMrs::load(&file)?;
            out.save(&conjugate(&obj), stem(&file))?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

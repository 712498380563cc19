use std::io::{self, Write};
use std::path::PathBuf;

use beadloom_core::{BeadShape, Symmetry};
use beadloom_runtime::{DesignStore, FileStorage, MemoryStorage, SaveOutcome, StoreConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::execute;
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(
    name = "beadloom",
    about = "Design bead patterns: place beads on strands, manage a palette, export and share",
    version
)]
pub struct Cli {
    /// Store configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the saved design and its backups.
    #[arg(
        long,
        global = true,
        env = "BEADLOOM_STATE_DIR",
        default_value = ".beadloom"
    )]
    pub state_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarise the current design.
    Show,

    /// Start a new, empty design. History is discarded.
    New {
        /// Design name.
        name: Option<String>,
    },

    /// Place or clear one bead.
    #[command(name = "set-cell")]
    SetCell(SetCellArgs),

    /// Fill a range of a strand with a pattern (ABAB, AABB, RANDOM).
    Pattern(PatternArgs),

    /// Fill a whole strand with random palette beads.
    #[command(name = "fill-random")]
    FillRandom {
        /// Strand number (1-based) or id.
        strand: String,
    },

    /// Empty one strand, or every strand.
    Clear {
        /// Strand number (1-based) or id. All strands when omitted.
        strand: Option<String>,
    },

    /// Add, remove or measure strands.
    #[command(subcommand)]
    Strand(StrandCommand),

    /// Set the editing symmetry.
    Symmetry {
        #[arg(value_enum)]
        mode: SymmetryArg,
    },

    /// Inspect and edit the palette and stock.
    #[command(subcommand)]
    Palette(PaletteCommand),

    /// Bill of materials: bead counts for the design.
    Bom {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the step-by-step assembly sequence.
    Sequence,

    /// Write the design, palette and inventory as JSON.
    Export {
        /// Output file. Standard output when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },

    /// Import a design JSON file ("-" for standard input).
    Import { path: PathBuf },

    /// Print a share code for the design.
    Share,

    /// Import a design from a share code.
    #[command(name = "import-code")]
    ImportCode { code: String },
}

#[derive(Debug, Clone, Args)]
pub struct SetCellArgs {
    /// Strand number (1-based) or id.
    #[arg(long)]
    pub strand: String,

    /// Cell position (0-based).
    #[arg(long)]
    pub index: usize,

    /// Bead id to place.
    #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
    pub bead: Option<String>,

    /// Empty the cell instead.
    #[arg(long)]
    pub clear: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PatternArgs {
    /// Strand number (1-based) or id.
    #[arg(long)]
    pub strand: String,

    /// First cell (0-based, inclusive).
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Last cell (inclusive). The end of the strand when omitted.
    #[arg(long)]
    pub end: Option<usize>,

    /// Pattern code.
    #[arg(long, default_value = "ABAB")]
    pub code: String,
}

#[derive(Debug, Subcommand)]
pub enum StrandCommand {
    /// Append an empty strand.
    Add,

    /// Remove a strand. The last strand is replaced by an empty one.
    Remove { strand: String },

    /// Set a strand's physical length in centimetres.
    Length { strand: String, cm: f64 },

    /// Set a strand's nominal bead diameter in millimetres.
    Diameter { strand: String, mm: f64 },
}

#[derive(Debug, Subcommand)]
pub enum PaletteCommand {
    /// List beads with their stock.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Add or replace a bead.
    Add(BeadArgs),

    /// Remove a bead and its stock record.
    Remove { id: String },

    /// Set a bead's stock level.
    Stock { id: String, count: u32 },
}

#[derive(Debug, Clone, Args)]
pub struct BeadArgs {
    pub id: String,

    #[arg(long)]
    pub name: String,

    /// Colour as `#rrggbb`.
    #[arg(long)]
    pub hex: String,

    #[arg(long, default_value_t = 6)]
    pub mm: u32,

    #[arg(long, value_enum, default_value_t = ShapeArg::Round)]
    pub shape: ShapeArg,

    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SymmetryArg {
    None,
    MirrorCenter,
}

impl From<SymmetryArg> for Symmetry {
    fn from(arg: SymmetryArg) -> Self {
        match arg {
            SymmetryArg::None => Symmetry::None,
            SymmetryArg::MirrorCenter => Symmetry::MirrorCenter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShapeArg {
    Round,
    Oval,
    Square,
    Tube,
    Bicone,
}

impl From<ShapeArg> for BeadShape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Round => BeadShape::Round,
            ShapeArg::Oval => BeadShape::Oval,
            ShapeArg::Square => BeadShape::Square,
            ShapeArg::Tube => BeadShape::Tube,
            ShapeArg::Bicone => BeadShape::Bicone,
        }
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)
}

/// Open the store under `cli.state_dir`, run the command, and shut down.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let config = match &cli.config {
        Some(path) => StoreConfig::from_toml_file(path)?,
        None => StoreConfig::default(),
    };
    let mut store = DesignStore::builder(config)
        .durable(FileStorage::new(&cli.state_dir))
        .session(MemoryStorage::new())
        .open()?;

    if let Some(notice) = store.take_recovery_notice() {
        eprintln!("warning: {}", notice.message);
    }

    let result = execute(&mut store, cli.command, out);
    store.shutdown();
    match store.last_save() {
        Some(SaveOutcome::Minimal) => {
            eprintln!("warning: storage is full; only bead placement was saved");
        }
        Some(SaveOutcome::Refused(reason) | SaveOutcome::Failed(reason)) => {
            eprintln!("warning: design was not saved: {reason}");
        }
        Some(SaveOutcome::Saved) | None => {}
    }
    result
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    fn invoke(dir: &Path, args: &[&str]) -> Result<String> {
        let mut argv = vec!["beadloom", "--state-dir"];
        argv.push(dir.to_str().unwrap());
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn set_cell_requires_bead_or_clear() {
        let parsed = Cli::try_parse_from(["beadloom", "set-cell", "--strand", "1", "--index", "0"]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from([
            "beadloom", "set-cell", "--strand", "1", "--index", "0", "--bead", "red", "--clear",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn brush_selection_is_not_a_command() {
        let parsed = Cli::try_parse_from(["beadloom", "palette", "select", "red"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn edits_persist_between_invocations() {
        let dir = tempfile::tempdir().unwrap();
        invoke(dir.path(), &["set-cell", "--strand", "1", "--index", "0", "--bead", "red"]).unwrap();
        invoke(dir.path(), &["set-cell", "--strand", "1", "--index", "1", "--bead", "red"]).unwrap();

        let bom = invoke(dir.path(), &["bom", "--json"]).unwrap();
        let entries: serde_json::Value = serde_json::from_str(&bom).unwrap();
        assert_eq!(entries[0]["beadId"], "red");
        assert_eq!(entries[0]["count"], 2);

        let palette = invoke(dir.path(), &["palette", "list"]).unwrap();
        let red = palette.lines().find(|line| line.starts_with("red")).unwrap();
        assert!(red.ends_with("stock 48"), "{red}");
    }

    #[test]
    fn export_then_import_into_fresh_state() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let exports = tempfile::tempdir().unwrap();
        invoke(source.path(), &["new", "Anklet"]).unwrap();
        invoke(source.path(), &["pattern", "--strand", "1", "--code", "AABB"]).unwrap();
        let file = exports.path().join("anklet.json");
        invoke(
            source.path(),
            &["export", "--pretty", "--output", file.to_str().unwrap()],
        )
        .unwrap();

        invoke(target.path(), &["import", file.to_str().unwrap()]).unwrap();
        let shown = invoke(target.path(), &["show"]).unwrap();
        assert!(shown.starts_with("Anklet"));
        assert!(shown.contains("30/30"));
    }

    #[test]
    fn share_code_round_trips_between_state_dirs() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        invoke(source.path(), &["set-cell", "--strand", "1", "--index", "3", "--bead", "teal"]).unwrap();
        let shared = invoke(source.path(), &["share"]).unwrap();
        let code = shared.lines().next().unwrap().to_string();

        invoke(target.path(), &["import-code", &code]).unwrap();
        let sequence = invoke(target.path(), &["sequence"]).unwrap();
        assert!(sequence.contains("4. Teal (#14b8a6)"));
    }

    #[test]
    fn bad_input_is_reported_not_applied() {
        let dir = tempfile::tempdir().unwrap();
        let err = invoke(dir.path(), &["set-cell", "--strand", "9", "--index", "0", "--bead", "red"])
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = invoke(dir.path(), &["import-code", "not base64!"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = invoke(dir.path(), &["palette", "add", "bad", "--name", "Bad", "--hex", "red"])
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}

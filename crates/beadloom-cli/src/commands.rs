//! Command execution against an open store.

use std::io::{Read, Write};
use std::path::Path;

use beadloom_core::{BeadSpec, Symmetry, share_token};
use beadloom_runtime::DesignStore;

use crate::cli::{BeadArgs, Command, PaletteCommand, PatternArgs, SetCellArgs, StrandCommand};
use crate::error::{CliError, Result};

pub fn execute(store: &mut DesignStore, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Show => show(store, out),
        Command::New { name } => {
            store.create_new_design(name.as_deref().unwrap_or_default());
            writeln!(out, "created {} ({})", store.design().name, store.design().id)?;
            Ok(())
        }
        Command::SetCell(args) => set_cell(store, &args, out),
        Command::Pattern(args) => pattern(store, &args, out),
        Command::FillRandom { strand } => {
            let id = resolve_strand(store, &strand)?;
            report(out, store.fill_random(&id), "filled strand")
        }
        Command::Clear { strand } => {
            let id = strand
                .as_deref()
                .map(|strand| resolve_strand(store, strand))
                .transpose()?;
            report(out, store.clear_all_beads(id.as_deref()), "cleared")
        }
        Command::Strand(command) => strand(store, command, out),
        Command::Symmetry { mode } => {
            let symmetry = Symmetry::from(mode);
            report(out, store.set_symmetry(symmetry), "symmetry updated")
        }
        Command::Palette(command) => palette(store, command, out),
        Command::Bom { json } => bom(store, json, out),
        Command::Sequence => {
            write!(out, "{}", store.export_sequence())?;
            Ok(())
        }
        Command::Export { output, pretty } => export(store, output.as_deref(), pretty, out),
        Command::Import { path } => {
            let json = read_input(&path)?;
            store.import_payload_json(&json)?;
            writeln!(out, "imported {}", store.design().name)?;
            Ok(())
        }
        Command::Share => {
            let code = store.share_code()?;
            writeln!(out, "{code}")?;
            writeln!(out, "token: {}", share_token(&code))?;
            Ok(())
        }
        Command::ImportCode { code } => {
            store.import_share_code(&code)?;
            writeln!(out, "imported {}", store.design().name)?;
            Ok(())
        }
    }
}

/// Accept a 1-based strand number or a strand id.
fn resolve_strand(store: &DesignStore, reference: &str) -> Result<String> {
    let strands = &store.design().strands;
    if let Some(strand) = strands.iter().find(|strand| strand.id == reference) {
        return Ok(strand.id.clone());
    }
    reference
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|position| strands.get(position))
        .map(|strand| strand.id.clone())
        .ok_or_else(|| {
            CliError::invalid(format!(
                "no strand {reference:?} (design has {})",
                strands.len()
            ))
        })
}

fn report(out: &mut dyn Write, changed: bool, message: &str) -> Result<()> {
    if changed {
        writeln!(out, "{message}")?;
    } else {
        writeln!(out, "no change")?;
    }
    Ok(())
}

fn show(store: &DesignStore, out: &mut dyn Write) -> Result<()> {
    let design = store.design();
    writeln!(out, "{} ({})", design.name, design.id)?;
    let symmetry = match design.symmetry {
        Symmetry::None => "none",
        Symmetry::MirrorCenter => "mirror-center",
    };
    writeln!(out, "symmetry: {symmetry}")?;
    for (n, strand) in design.strands.iter().enumerate() {
        writeln!(
            out,
            "{}. {} [{}] {}/{} beads, {}cm x {}mm (fits ~{})",
            n + 1,
            strand.name,
            strand.id,
            strand.filled_count(),
            strand.len(),
            strand.length_cm,
            strand.diameter_mm,
            strand.recommended_cell_count(),
        )?;
    }
    Ok(())
}

fn set_cell(store: &mut DesignStore, args: &SetCellArgs, out: &mut dyn Write) -> Result<()> {
    let id = resolve_strand(store, &args.strand)?;
    let len = store.design().strand(&id).map_or(0, |strand| strand.len());
    if args.index >= len {
        return Err(CliError::invalid(format!(
            "index {} is outside strand {} (0..{len})",
            args.index, args.strand
        )));
    }
    let bead = if args.clear { None } else { args.bead.as_deref() };
    if let Some(bead) = bead {
        if !store.palette().contains_key(bead) {
            tracing::warn!(bead_id = bead, "placing a bead that is not in the palette");
        }
    }
    let changed = store.set_cell(&id, args.index, bead);
    report(out, changed, "cell updated")?;
    if let Some(bead) = bead.filter(|_| changed) {
        writeln!(out, "{bead}: {} in stock", store.stock(bead))?;
    }
    Ok(())
}

fn pattern(store: &mut DesignStore, args: &PatternArgs, out: &mut dyn Write) -> Result<()> {
    let id = resolve_strand(store, &args.strand)?;
    let last = store
        .design()
        .strand(&id)
        .map_or(0, |strand| strand.len().saturating_sub(1));
    let end = args.end.unwrap_or(last);
    let changed = store.apply_pattern(&id, args.start, end, &args.code);
    report(out, changed, "pattern applied")
}

fn strand(store: &mut DesignStore, command: StrandCommand, out: &mut dyn Write) -> Result<()> {
    match command {
        StrandCommand::Add => {
            let id = store.add_strand();
            writeln!(out, "added strand {id}")?;
            Ok(())
        }
        StrandCommand::Remove { strand } => {
            let id = resolve_strand(store, &strand)?;
            report(out, store.remove_strand_or_reset(&id), "strand removed")
        }
        StrandCommand::Length { strand, cm } => {
            let id = resolve_strand(store, &strand)?;
            if !(cm.is_finite() && cm > 0.0) {
                return Err(CliError::invalid("length must be positive"));
            }
            report(out, store.update_strand_length(&id, cm), "length updated")
        }
        StrandCommand::Diameter { strand, mm } => {
            let id = resolve_strand(store, &strand)?;
            if !(mm.is_finite() && mm > 0.0) {
                return Err(CliError::invalid("diameter must be positive"));
            }
            report(out, store.update_strand_diameter(&id, mm), "diameter updated")
        }
    }
}

fn palette(store: &mut DesignStore, command: PaletteCommand, out: &mut dyn Write) -> Result<()> {
    match command {
        PaletteCommand::List { json } => {
            if json {
                serde_json::to_writer_pretty(&mut *out, &store.export_palette())?;
                writeln!(out)?;
                return Ok(());
            }
            for bead in store.palette().values() {
                writeln!(
                    out,
                    "{:<10} {:<12} {} {}mm {:<6} stock {}",
                    bead.id,
                    bead.name,
                    bead.hex,
                    bead.mm,
                    bead.shape.as_str(),
                    store.stock(&bead.id)
                )?;
            }
            Ok(())
        }
        PaletteCommand::Add(args) => {
            let bead = bead_from_args(args);
            let id = bead.id.clone();
            store.add_bead(bead)?;
            writeln!(out, "added {id} ({} in stock)", store.stock(&id))?;
            Ok(())
        }
        PaletteCommand::Remove { id } => report(out, store.remove_bead(&id), "bead removed"),
        PaletteCommand::Stock { id, count } => {
            store.update_inventory(&id, count);
            writeln!(out, "{id}: {count} in stock")?;
            Ok(())
        }
    }
}

fn bead_from_args(args: BeadArgs) -> BeadSpec {
    let bead = BeadSpec::new(args.id, args.name, args.hex)
        .with_mm(args.mm)
        .with_shape(args.shape.into());
    match args.note {
        Some(note) => bead.with_note(note),
        None => bead,
    }
}

fn bom(store: &DesignStore, json: bool, out: &mut dyn Write) -> Result<()> {
    let entries = store.export_bom();
    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }
    if entries.is_empty() {
        writeln!(out, "no beads placed")?;
        return Ok(());
    }
    for entry in &entries {
        let stock = store.stock(&entry.bead_id);
        let short = if entry.count > stock as usize { "  (short)" } else { "" };
        writeln!(
            out,
            "{:>4} x {:<12} {} {}mm {}{short}",
            entry.count, entry.name, entry.hex, entry.mm, entry.shape
        )?;
    }
    Ok(())
}

fn export(
    store: &DesignStore,
    output: Option<&Path>,
    pretty: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let payload = store.export_design_data();
    let json = if pretty {
        payload.to_json_pretty()?
    } else {
        payload.to_json()?
    };
    match output {
        Some(path) => {
            std::fs::write(path, json).map_err(|err| CliError::io(path, err))?;
            writeln!(out, "wrote {}", path.display())?;
        }
        None => writeln!(out, "{json}")?,
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut json = String::new();
        std::io::stdin()
            .read_to_string(&mut json)
            .map_err(|err| CliError::io(path, err))?;
        return Ok(json);
    }
    std::fs::read_to_string(path).map_err(|err| CliError::io(path, err))
}

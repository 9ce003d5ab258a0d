use anyhow::Result;
use serde::Serialize;

use msce::{FileFlags, LinkType, RegistryKeys, SectionEntry, SetupManifest, to_dos_8_3_name};

use std::io::Write;

pub fn write_json<W: Write>(out: &mut W, manifest: &SetupManifest) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, manifest)?;
    writeln!(out)?;
    Ok(())
}

/// One record per line. `kind` names what `record` holds.
#[derive(Serialize)]
struct JsonLine<'a, T: Serialize> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u16>,
    record: &'a T,
}

#[derive(Serialize)]
struct HeaderLine<'a> {
    #[serde(flatten)]
    header: &'a msce::ManifestHeader,
    app_name: &'a str,
    provider: &'a str,
}

fn line<W: Write, T: Serialize>(
    out: &mut W,
    kind: &'static str,
    id: Option<u16>,
    record: &T,
) -> Result<()> {
    serde_json::to_writer(&mut *out, &JsonLine { kind, id, record })?;
    writeln!(out)?;
    Ok(())
}

pub fn write_json_lines<W: Write>(out: &mut W, manifest: &SetupManifest) -> Result<()> {
    let header = HeaderLine {
        header: &manifest.header,
        app_name: &manifest.app_name,
        provider: &manifest.provider,
    };
    line(out, "header", None, &header)?;

    for (id, s) in manifest.strings.iter() {
        line(out, "string", Some(id), &s)?;
    }
    for (&id, dir) in &manifest.directories {
        line(out, "directory", Some(id), dir)?;
    }
    for (&id, file) in &manifest.files {
        line(out, "file", Some(id), file)?;
    }
    for (&id, hive) in &manifest.registry_hives {
        line(out, "registry_hive", Some(id), hive)?;
    }
    line(out, "registry_keys", None, &manifest.registry_keys)?;
    for (&id, link) in &manifest.links {
        line(out, "link", Some(id), link)?;
    }
    for warning in &manifest.warnings {
        line(out, "warning", None, warning)?;
    }

    Ok(())
}

fn write_table_row<W: Write>(out: &mut W, id: u16, value: &str) -> Result<()> {
    writeln!(out, "| {:<8} | {:<50} |", id, format!("\"{value}\""))?;
    Ok(())
}

fn write_file_flags<W: Write>(out: &mut W, flags: FileFlags) -> Result<()> {
    let names: Vec<&str> = flags.iter_names().map(|(name, _)| name).collect();
    let label = if names.is_empty() {
        "NONE".to_owned()
    } else {
        names.join(" | ")
    };
    writeln!(out, "Flags value: {} ({:08X})", label, flags.bits())?;

    if flags.is_empty() {
        writeln!(out, "No flags are set.")?;
        return Ok(());
    }
    for name in names {
        writeln!(out, "- {name}")?;
    }
    let unnamed = flags.bits() & !FileFlags::all().bits();
    if unnamed != 0 {
        writeln!(out, "- unnamed bits {unnamed:08X}")?;
    }
    Ok(())
}

fn section_rows(manifest: &SetupManifest) -> [(&'static str, SectionEntry); 6] {
    let s = &manifest.header.sections;
    [
        ("Strings", s.strings),
        ("Directories", s.directories),
        ("Files", s.files),
        ("Registry Hives", s.registry_hives),
        ("Registry Keys", s.registry_keys),
        ("Links", s.links),
    ]
}

pub fn write_text<W: Write>(out: &mut W, manifest: &SetupManifest, dos_names: bool) -> Result<()> {
    let header = &manifest.header;
    writeln!(out, "Size: {}", header.total_size)?;
    writeln!(
        out,
        "Target Architecture: {:?} ({})",
        header.architecture,
        header.architecture.code()
    )?;
    writeln!(out, "Windows CE Minimum version: {}", header.min_version)?;
    writeln!(out, "Windows CE Maximum version: {}", header.max_version)?;
    for (name, entry) in section_rows(manifest) {
        writeln!(out, "{name} Count: {}", entry.count)?;
    }
    for (name, entry) in section_rows(manifest) {
        writeln!(out, "{name} Offset: 0x{:08X}", entry.offset)?;
    }
    writeln!(out, "App Name: \"{}\"", manifest.app_name)?;
    writeln!(out, "Provider: \"{}\"", manifest.provider)?;

    writeln!(out)?;
    writeln!(out, "STRINGS:")?;
    for (id, s) in manifest.strings.iter() {
        write_table_row(out, id, s)?;
    }

    writeln!(out)?;
    writeln!(out, "DIRS:")?;
    for (&id, dir) in &manifest.directories {
        write_table_row(out, id, dir)?;
    }

    writeln!(out)?;
    writeln!(out, "FILES:")?;
    for (&id, file) in &manifest.files {
        let path = if dos_names {
            // Empty destinations have no 8.3 form; show them as stored.
            to_dos_8_3_name(&file.destination_path)
                .unwrap_or_else(|_| file.destination_path.clone())
        } else {
            file.destination_path.clone()
        };
        writeln!(out, "{id}: {path}")?;
        write_file_flags(out, file.flags)?;
        writeln!(out)?;
    }

    writeln!(out, "REGHIVES:")?;
    for (&id, hive) in &manifest.registry_hives {
        writeln!(out, "{id}: {}", hive.root)?;
        for fragment in &hive.spec {
            writeln!(out, "{fragment}")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "REGKEYS:")?;
    let RegistryKeys::Unsupported {
        declared_count,
        offset,
    } = &manifest.registry_keys;
    writeln!(
        out,
        "Reading REGKEYS is not supported ({declared_count} records declared at 0x{offset:08X})"
    )?;

    writeln!(out)?;
    writeln!(out, "LINKS:")?;
    for (&id, link) in &manifest.links {
        let target = link.target_path.as_deref().unwrap_or("<unresolved>");
        let link_type = match link.link_type {
            LinkType::Directory => "Directory".to_owned(),
            LinkType::File => "File".to_owned(),
            LinkType::Unknown(code) => format!("Unknown({code})"),
        };
        writeln!(
            out,
            "{id}: {} -> {target} ({link_type}) [{}]",
            link.base_directory,
            link.spec.join(", ")
        )?;
    }

    if !manifest.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "WARNINGS:")?;
        for warning in &manifest.warnings {
            writeln!(out, "- {warning}")?;
        }
    }

    Ok(())
}

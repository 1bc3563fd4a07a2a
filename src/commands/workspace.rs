use anyhow::{Result, bail};
use colored::Colorize;
use provider::workspace::{RENDERED_FILES, VARIABLES_FILE};
use provider::{Identity, parse_assignments};
use std::fs;
use std::io;

use super::Runtime;
use crate::ui;

pub fn list(rt: &Runtime) -> Result<()> {
    let root = rt.workspaces().root();
    let workspaces = rt.workspaces().list()?;

    if workspaces.is_empty() {
        ui::dim(&format!("No workspaces under {}", root.display()));
        return Ok(());
    }

    ui::header(&format!("Workspaces in {}", root.display()));
    for ws in &workspaces {
        let rendered = RENDERED_FILES
            .iter()
            .filter(|name| ws.file(name).exists())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {} {}",
            ws.identity().as_str().bold(),
            format!("[{rendered}]").dimmed()
        );
    }

    println!();
    ui::kv("Total", &workspaces.len().to_string());
    Ok(())
}

/// Print the rendered inputs of one workspace.
pub fn inspect(rt: &Runtime, name: &str) -> Result<()> {
    let identity = Identity::new(name)?;
    let Some(ws) = rt.workspaces().get(&identity) else {
        bail!(
            "No workspace for {name:?} under {}",
            rt.workspaces().root().display()
        );
    };

    ui::header(&format!("Workspace {name}"));
    ui::kv("path", &ws.path().display().to_string());

    for file in RENDERED_FILES {
        let text = match fs::read_to_string(ws.file(file)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        ui::section(file);
        if file == VARIABLES_FILE {
            for (key, value) in parse_assignments(&text)? {
                ui::kv(&key, &value);
            }
        } else {
            for line in text.lines() {
                ui::dim(line);
            }
        }
    }
    Ok(())
}

//! Diff command implementation.

use std::path::Path;
use usync_core::tracking::{tracker_for, TrackerOptions};
use usync_core::{ChangeDetailType, SyncChange};
use usync_xml::parse;

/// Property level changes importing `new` would make over `old`.
pub fn diff(old: &str, new: &str, include_no_change: bool) -> Result<Vec<SyncChange>, Box<dyn std::error::Error>> {
    let old = parse(old)?;
    let new = parse(new)?;

    let item_type = if new.is_empty_item() { old.name() } else { new.name() };
    let tracker = tracker_for(item_type).ok_or_else(|| format!("No tracker for item type '{item_type}'"))?;

    let options = TrackerOptions { include_no_change };
    Ok(tracker.get_changes(&new, Some(&old), &options))
}

/// Runs the diff command.
pub fn run(old: &Path, new: &Path, include_no_change: bool) -> Result<(), Box<dyn std::error::Error>> {
    let changes = diff(
        &std::fs::read_to_string(old)?,
        &std::fs::read_to_string(new)?,
        include_no_change,
    )?;

    if changes.is_empty() {
        println!("No changes.");
        return Ok(());
    }

    for change in &changes {
        let marker = match change.change() {
            ChangeDetailType::Create => "+",
            ChangeDetailType::Delete => "-",
            ChangeDetailType::Update => "~",
            ChangeDetailType::NoChange => "=",
            ChangeDetailType::Error | ChangeDetailType::Warning => "!",
        };
        println!("{marker} {}", change.path());
        match change.change() {
            ChangeDetailType::Update => {
                println!("    old: {}", change.old_value());
                println!("    new: {}", change.new_value());
            }
            ChangeDetailType::Delete => println!("    old: {}", change.old_value()),
            _ => println!("    {}", change.new_value()),
        }
    }
    println!();
    println!("{} changes", changes.iter().filter(|c| c.change() != ChangeDetailType::NoChange).count());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD: &str = r#"<Macro Key="5d3b2f9e-1c1a-4a57-9d0e-5a4c0f4b1f11" Alias="latestNews" Level="1">
  <Name>Latest news</Name>
</Macro>"#;

    const NEW: &str = r#"<Macro Key="5d3b2f9e-1c1a-4a57-9d0e-5a4c0f4b1f11" Alias="latestNews" Level="1">
  <Name>Recent news</Name>
</Macro>"#;

    #[test]
    fn identical_files_have_no_changes() {
        assert!(diff(OLD, OLD, false).unwrap().is_empty());
    }

    #[test]
    fn changed_files_report_updates() {
        let changes = diff(OLD, NEW, false).unwrap();
        assert!(!changes.is_empty());
        assert!(changes.iter().any(|c| c.change() == ChangeDetailType::Update));
    }

    #[test]
    fn unknown_item_type_is_an_error() {
        let widget = r#"<Widget Key="5d3b2f9e-1c1a-4a57-9d0e-5a4c0f4b1f11" />"#;
        assert!(diff(widget, widget, false).is_err());
    }
}

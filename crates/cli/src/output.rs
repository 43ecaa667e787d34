//! Terminal formatting helpers

use owo_colors::OwoColorize;
use quiesce_core::{ChangeEvent, ChangeKind, InterestMask};

/// Change kind label, padded and colored by kind
pub fn kind_label(kind: ChangeKind) -> String {
    let label = format!("{:<12}", kind.label());
    match kind {
        ChangeKind::Added => label.green().to_string(),
        ChangeKind::Removed => label.red().to_string(),
        ChangeKind::Modified => label.yellow().to_string(),
        ChangeKind::RenamedFrom | ChangeKind::RenamedTo => label.cyan().to_string(),
    }
}

/// One line per delivered change: `<kind> <path>`
pub fn change_line(event: &ChangeEvent) -> String {
    format!("{} {}", kind_label(event.kind), event.path.display())
}

/// Comma-separated names of the enabled interest flags
pub fn interest_summary(mask: &InterestMask) -> String {
    let flags = [
        ("file_name", mask.file_name),
        ("dir_name", mask.dir_name),
        ("attributes", mask.attributes),
        ("size", mask.size),
        ("last_write", mask.last_write),
        ("last_access", mask.last_access),
        ("creation", mask.creation),
        ("security", mask.security),
    ];

    let enabled: Vec<&str> = flags
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| *name)
        .collect();

    if enabled.is_empty() {
        "none".to_string()
    } else {
        enabled.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_summary() {
        assert_eq!(
            interest_summary(&InterestMask::default()),
            "file_name, dir_name, size, last_write"
        );
        assert_eq!(interest_summary(&InterestMask::none()), "none");
    }

    #[test]
    fn test_change_line_mentions_path() {
        let line = change_line(&ChangeEvent::new("src/lib.rs", ChangeKind::Removed));
        assert!(line.contains("removed"));
        assert!(line.ends_with("src/lib.rs"));
    }
}

use std::path::PathBuf;

/// Read-only view of the precondition artifacts a transition depends on.
///
/// Paths are relative to the project root. Neither method fails: an absent or
/// unreadable document is reported as `false`/`None`.
pub trait ArtifactProbe {
    fn exists(&self, path: &str) -> bool;

    /// Text of the section headed `title` (case-insensitive), trimmed, up to
    /// the next header of the same or a higher level.
    fn extract_section(&self, path: &str, title: &str) -> Option<String>;
}

/// Probe backed by the project's working tree.
#[derive(Debug, Clone)]
pub struct FsProbe {
    root: PathBuf,
}

impl FsProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactProbe for FsProbe {
    fn exists(&self, path: &str) -> bool {
        self.root.join(path).is_file()
    }

    fn extract_section(&self, path: &str, title: &str) -> Option<String> {
        let full = self.root.join(path);
        match std::fs::read_to_string(&full) {
            Ok(content) => extract_section(&content, title),
            Err(e) => {
                tracing::debug!(path = %full.display(), error = %e, "artifact not readable");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Markdown sections
// ---------------------------------------------------------------------------

/// Parse an ATX header line (`## Title`), returning its level and text.
fn header(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    // More than three spaces of indent is a code block, not a header.
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(|c: char| c == ' ' || c == '\t') {
        return None;
    }
    Some((level, rest.trim().trim_end_matches('#').trim_end()))
}

/// The fence marker a line opens or closes a code block with, if any.
fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Extract the section headed `title` from markdown `content`.
///
/// Lines inside fenced code blocks are never treated as headers. An empty
/// section is reported as `None`.
pub fn extract_section(content: &str, title: &str) -> Option<String> {
    let wanted = title.trim().to_lowercase();
    let mut fence: Option<&str> = None;
    let mut section: Option<(usize, Vec<&str>)> = None;

    for line in content.lines() {
        let marker = fence_marker(line);
        match (fence, marker) {
            (None, Some(m)) => fence = Some(m),
            // A fence only closes with the marker that opened it.
            (Some(open), Some(m)) if open == m => fence = None,
            _ => {}
        }
        let heading = if fence.is_some() || marker.is_some() {
            None
        } else {
            header(line)
        };

        if let Some((level, body)) = section.as_mut() {
            if matches!(heading, Some((l, _)) if l <= *level) {
                break;
            }
            body.push(line);
        } else if let Some((l, text)) = heading {
            if text.to_lowercase() == wanted {
                section = Some((l, Vec::new()));
            }
        }
    }

    let (_, body) = section?;
    let text = body.join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

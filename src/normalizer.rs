//! Submission normalizer
//!
//! Merges freelancer notes and uploaded artifacts into a single
//! adjudication payload. Pure string construction: deterministic for the
//! same inputs, no clock, no I/O, and it never fails - unknown byte
//! sequences are decoded lossily rather than rejected.

use crate::types::SubmissionPart;

/// Artifact name suffixes that are inlined verbatim into the payload.
/// Everything else is represented by a binary placeholder.
const TEXT_SUFFIXES: &[&str] = &[".py", ".js", ".txt", ".md", ".json", ".html", ".css"];

fn is_text_like(name: &str, mime_hint: Option<&str>) -> bool {
    if let Some(mime) = mime_hint {
        if mime.starts_with("text/") {
            return true;
        }
    }
    let lower = name.to_ascii_lowercase();
    TEXT_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Names of the artifact parts, in upload order. Recorded on the
/// submission and echoed in the payload header.
pub fn artifact_names(parts: &[SubmissionPart]) -> Vec<String> {
    parts
        .iter()
        .filter_map(|p| match p {
            SubmissionPart::Artifact { name, .. } => Some(name.clone()),
            SubmissionPart::Text(_) => None,
        })
        .collect()
}

/// Build the adjudication payload from notes plus content parts.
pub fn normalize_submission(notes: &str, parts: &[SubmissionPart]) -> String {
    let names = artifact_names(parts);

    let mut context = String::new();
    for part in parts {
        match part {
            SubmissionPart::Text(text) => {
                context.push_str("\n\n--- NOTE ---\n");
                context.push_str(text);
            }
            SubmissionPart::Artifact {
                name,
                bytes,
                mime_hint,
            } => {
                if is_text_like(name, mime_hint.as_deref()) {
                    context.push_str(&format!(
                        "\n\n--- FILE: {} ---\n{}",
                        name,
                        String::from_utf8_lossy(bytes)
                    ));
                } else {
                    context.push_str(&format!(
                        "\n\n--- ATTACHMENT ---\nFile '{}' (Binary) received.",
                        name
                    ));
                }
            }
        }
    }

    format!(
        "FREELANCER NOTES:\n{}\n\nFiles Uploaded: {}\n\n{}",
        notes,
        names.join(", "),
        context
    )
}

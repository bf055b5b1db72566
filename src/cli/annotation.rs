use std::fmt;
use std::io::Write;

use inquire::{InquireError, MultiSelect};

use crate::config::ServerConfig;
use crate::store::Store;
use crate::types::{Annotation, AnnotationSummary, Session};

use super::open_store;

struct AnnotationChoice(AnnotationSummary);

impl fmt::Display for AnnotationChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.0;
        write!(f, "#{} {} by {} ({})", a.annotation_id, a.text_title, a.username, a.method)?;
        if let Some(label) = &a.label {
            write!(f, " \"{label}\"")?;
        }
        Ok(())
    }
}

/// Returns `None` when the picker is cancelled.
fn pick_annotations(summaries: Vec<AnnotationSummary>) -> anyhow::Result<Option<Vec<i64>>> {
    if summaries.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let options = summaries.into_iter().map(AnnotationChoice).collect();
    let selection = MultiSelect::new("Annotations to dump:", options)
        .with_page_size(15)
        .with_help_message("Space to toggle, Enter to confirm")
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(selected) => Ok(Some(selected.into_iter().map(|c| c.0.annotation_id).collect())),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes each annotation as one line of JSON.
pub fn write_annotations<W: Write>(out: &mut W, annotations: &[Annotation]) -> anyhow::Result<()> {
    for annotation in annotations {
        serde_json::to_writer(&mut *out, annotation)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

pub fn run_annotation_dump(config: &ServerConfig, ids: Vec<i64>, all: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;

    let ids = if all {
        store
            .lookup_annotations(&Session::anonymous(), None)?
            .into_iter()
            .map(|a| a.annotation_id)
            .collect()
    } else if !ids.is_empty() {
        ids
    } else {
        let summaries = store.lookup_annotations(&Session::anonymous(), None)?;
        match pick_annotations(summaries)? {
            Some(ids) => ids,
            None => return Ok(()),
        }
    };

    let mut annotations = Vec::with_capacity(ids.len());
    for id in ids {
        match store.lookup_annotation(id)? {
            Some(annotation) => annotations.push(annotation),
            None => anyhow::bail!("Annotation {id} not found"),
        }
    }

    let stdout = std::io::stdout();
    write_annotations(&mut stdout.lock(), &annotations)
}

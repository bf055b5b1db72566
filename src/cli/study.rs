use std::fmt;
use std::io::Write;

use inquire::{InquireError, Select};
use serde::Serialize;

use crate::config::ServerConfig;
use crate::store::Store;
use crate::types::{Study, StudyDataRecord, StudyEvent};

use super::open_store;

struct StudyChoice(Study);

impl fmt::Display for StudyChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.0;
        write!(f, "#{} {}", s.id, s.name)?;
        match (s.begin_at, s.end_at) {
            (Some(begin), Some(end)) => write!(f, " ({} to {})", begin.date_naive(), end.date_naive()),
            (Some(begin), None) => write!(f, " (from {})", begin.date_naive()),
            (None, Some(end)) => write!(f, " (until {})", end.date_naive()),
            (None, None) => Ok(()),
        }
    }
}

/// Returns `None` when there is nothing to pick or the picker is cancelled.
fn pick_study(studies: Vec<Study>) -> anyhow::Result<Option<i64>> {
    if studies.is_empty() {
        eprintln!("No studies found.");
        return Ok(None);
    }

    let options = studies.into_iter().map(StudyChoice).collect();
    let selection = Select::new("Study to dump:", options)
        .with_page_size(15)
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(choice) => Ok(Some(choice.0.id)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[derive(Serialize)]
struct EventLine<'a> {
    #[serde(flatten)]
    record: &'a StudyDataRecord,
    #[serde(flatten)]
    event: &'a StudyEvent,
}

/// Writes one JSON line per logged event, each carrying the context of the
/// batch it came from. Batches that do not hold a JSON array are skipped with
/// a warning.
pub fn write_study_events<W: Write>(out: &mut W, records: &[StudyDataRecord]) -> anyhow::Result<()> {
    for record in records {
        let events = match record.events() {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(
                    study_data_id = record.study_data_id,
                    error = %e,
                    "skipping malformed study data"
                );
                continue;
            }
        };
        for event in &events {
            serde_json::to_writer(&mut *out, &EventLine { record, event })?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()?;
    Ok(())
}

pub fn run_study_dump(config: &ServerConfig, study_id: Option<i64>) -> anyhow::Result<()> {
    let store = open_store(config)?;

    let study_id = match study_id {
        Some(id) => {
            if store.get_study(id)?.is_none() {
                anyhow::bail!("Study {id} not found");
            }
            id
        }
        None => match pick_study(store.list_all_studies()?)? {
            Some(id) => id,
            None => return Ok(()),
        },
    };

    let records = store.get_study_data(study_id)?;
    let stdout = std::io::stdout();
    write_study_events(&mut stdout.lock(), &records)
}

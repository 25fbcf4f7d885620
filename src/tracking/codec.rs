//! Text format shared by every instance that reads the store.
//!
//! A project is `name&state&accumulated&iteration_start`, with the name percent-encoded and both
//! numbers in base 10. A list is its projects joined with `|`; the empty list is the empty string.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::utils::clock::Clock;

use super::{
    list::ProjectList,
    project::{Project, ProjectState},
};

const FIELD_SEPARATOR: char = '&';
const PROJECT_SEPARATOR: char = '|';

/// Marks `encodeURIComponent` leaves unescaped but `urlencoding` escapes.
const URI_COMPONENT_MARKS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unrecognized project state {0:?}")]
    MalformedState(String),
    #[error("{field} is not a valid number: {value:?}")]
    MalformedNumber { field: &'static str, value: String },
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("project name is not valid percent-encoded UTF-8: {0}")]
    MalformedName(String),
}

/// The stored fields of a project without its clock or subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProjectFields {
    pub name: String,
    pub state: ProjectState,
    pub accumulated_ms: u64,
    pub iteration_start: i64,
}

/// A list entry that couldn't be decoded. The rest of the list is unaffected by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub index: usize,
    pub raw: String,
    pub error: CodecError,
}

#[derive(Debug)]
pub struct DecodedList {
    pub projects: Vec<Project>,
    pub rejected: Vec<RejectedEntry>,
}

pub fn encode_project(project: &Project) -> String {
    format!(
        "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
        encode_name(project.name()),
        project.state().as_tag(),
        project.accumulated_ms(),
        project.iteration_start(),
    )
}

// Every `%` in the output starts an escape, so replacing whole escapes can't split one.
fn encode_name(name: &str) -> String {
    let mut encoded = urlencoding::encode(name).into_owned();
    for (escaped, mark) in URI_COMPONENT_MARKS {
        encoded = encoded.replace(escaped, mark);
    }
    encoded
}

pub fn decode_project(text: &str, clock: Arc<dyn Clock>) -> Result<Project, CodecError> {
    let fields = decode_fields(text)?;
    Ok(Project::restore(
        fields.name,
        fields.state,
        fields.accumulated_ms,
        fields.iteration_start,
        clock,
    ))
}

pub fn encode_list(list: &ProjectList) -> String {
    let mut encoded = String::new();
    for (index, project) in list.iter().enumerate() {
        if index > 0 {
            encoded.push(PROJECT_SEPARATOR);
        }
        encoded.push_str(&encode_project(project));
    }
    encoded
}

/// Decodes every entry it can. Malformed entries are collected in [DecodedList::rejected].
pub fn decode_list(text: &str, clock: &Arc<dyn Clock>) -> DecodedList {
    let mut decoded = DecodedList {
        projects: Vec::new(),
        rejected: Vec::new(),
    };
    if text.is_empty() {
        return decoded;
    }

    for (index, raw) in text.split(PROJECT_SEPARATOR).enumerate() {
        match decode_project(raw, clock.clone()) {
            Ok(project) => decoded.projects.push(project),
            Err(error) => {
                warn!("Skipping project {index} {raw:?}: {error}");
                decoded.rejected.push(RejectedEntry {
                    index,
                    raw: raw.into(),
                    error,
                });
            }
        }
    }
    decoded
}

pub(crate) fn decode_fields(text: &str) -> Result<ProjectFields, CodecError> {
    let mut parts = text.split(FIELD_SEPARATOR);

    let name = parts.next().ok_or(CodecError::MissingField("name"))?;
    let name = urlencoding::decode(name)
        .map_err(|e| CodecError::MalformedName(e.to_string()))?
        .into_owned();

    let state = parts
        .next()
        .ok_or(CodecError::MissingField("state"))?
        .parse::<ProjectState>()?;

    let accumulated_ms = parse_number(parts.next(), "accumulated time")?;
    let iteration_start = parse_number(parts.next(), "iteration start")?;

    Ok(ProjectFields {
        name,
        state,
        accumulated_ms,
        iteration_start,
    })
}

fn parse_number<T: std::str::FromStr>(
    value: Option<&str>,
    field: &'static str,
) -> Result<T, CodecError> {
    let value = value.ok_or(CodecError::MissingField(field))?;
    value.parse().map_err(|_| CodecError::MalformedNumber {
        field,
        value: value.into(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        tracking::{list::ProjectList, project::Project, project::ProjectState},
        utils::clock::{Clock, ManualClock},
    };

    use super::{decode_list, decode_project, encode_list, encode_project, CodecError};

    const TEST_START: i64 = 1_530_662_400_000;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::at(TEST_START))
    }

    fn fields(project: &Project) -> (String, ProjectState, u64, i64) {
        (
            project.name().to_string(),
            project.state(),
            project.accumulated_ms(),
            project.iteration_start(),
        )
    }

    #[test]
    fn test_encode_project_format() {
        let project = Project::restore(
            "Client work",
            ProjectState::Running,
            125_000,
            TEST_START,
            clock(),
        );

        assert_eq!(
            encode_project(&project),
            format!("Client%20work&running&125000&{TEST_START}")
        );
    }

    #[test]
    fn test_separators_in_name_are_escaped() {
        let clock = clock();
        let project = Project::restore(
            "R&D | 50% ünïcode",
            ProjectState::Stopped,
            7,
            0,
            clock.clone(),
        );

        let encoded = encode_project(&project);
        assert_eq!(encoded.matches('&').count(), 3);
        assert!(!encoded.contains('|'));

        let decoded = decode_project(&encoded, clock).unwrap();
        assert_eq!(fields(&decoded), fields(&project));
    }

    #[test]
    fn test_uri_component_escaping_is_reproduced() {
        let stored = "Side%20(fun)!*'~&stopped&0&0";
        let mut decoded = decode_project(stored, clock()).unwrap();
        assert_eq!(decoded.name(), "Side (fun)!*'~");
        assert_eq!(encode_project(&decoded), stored);

        // An escaped `%` followed by hex must stay escaped.
        decoded.deserialize("100%2521%2A&stopped&0&0").unwrap();
        assert_eq!(decoded.name(), "100%21*");
        assert_eq!(encode_project(&decoded), "100%2521*&stopped&0&0");
    }

    #[test]
    fn test_project_round_trip_keeps_running_clock() {
        let manual = ManualClock::at(TEST_START);
        let clock: Arc<dyn Clock> = Arc::new(manual.clone());
        let mut project = Project::new("Alpha", clock.clone());
        project.start();
        manual.advance(2_000);

        let decoded = decode_project(&encode_project(&project), clock).unwrap();

        assert_eq!(fields(&decoded), fields(&project));
        assert_eq!(decoded.time_spent(), project.time_spent());
    }

    #[test]
    fn test_decode_rejects_unknown_state() {
        assert_eq!(
            decode_project("a&paused&0&0", clock()).unwrap_err(),
            CodecError::MalformedState("paused".into())
        );
    }

    #[test]
    fn test_decode_rejects_non_numeric_fields() {
        assert_eq!(
            decode_project("a&stopped&abc&0", clock()).unwrap_err(),
            CodecError::MalformedNumber {
                field: "accumulated time",
                value: "abc".into()
            }
        );
        assert_eq!(
            decode_project("a&stopped&-5&0", clock()).unwrap_err(),
            CodecError::MalformedNumber {
                field: "accumulated time",
                value: "-5".into()
            }
        );
        assert_eq!(
            decode_project("a&running&0&", clock()).unwrap_err(),
            CodecError::MalformedNumber {
                field: "iteration start",
                value: "".into()
            }
        );
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert_eq!(
            decode_project("a", clock()).unwrap_err(),
            CodecError::MissingField("state")
        );
        assert_eq!(
            decode_project("a&stopped&0", clock()).unwrap_err(),
            CodecError::MissingField("iteration start")
        );
    }

    #[test]
    fn test_decode_rejects_invalid_utf8_name() {
        assert!(matches!(
            decode_project("%FF%FE&stopped&0&0", clock()).unwrap_err(),
            CodecError::MalformedName(_)
        ));
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let decoded = decode_project("a&stopped&3&0&future", clock()).unwrap();
        assert_eq!(decoded.accumulated_ms(), 3);
    }

    #[test]
    fn test_empty_list_round_trip() {
        let list = ProjectList::new();
        assert_eq!(encode_list(&list), "");

        let decoded = decode_list("", &clock());
        assert!(decoded.projects.is_empty());
        assert!(decoded.rejected.is_empty());
    }

    #[test]
    fn test_list_round_trip_preserves_order() {
        let clock = clock();
        let mut list = ProjectList::new();
        list.add(Project::restore("first", ProjectState::Stopped, 10, 0, clock.clone()));
        list.add(Project::restore(
            "second",
            ProjectState::Running,
            20,
            TEST_START - 100,
            clock.clone(),
        ));
        list.add(Project::new("third", clock.clone()));

        let encoded = encode_list(&list);
        assert_eq!(
            encoded,
            format!(
                "first&stopped&10&0|second&running&20&{}|third&stopped&0&0",
                TEST_START - 100
            )
        );

        let decoded = decode_list(&encoded, &clock);
        assert!(decoded.rejected.is_empty());
        assert_eq!(
            decoded.projects.iter().map(fields).collect::<Vec<_>>(),
            list.iter().map(fields).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_malformed_entry_does_not_affect_neighbours() {
        let decoded = decode_list("a&stopped&1&0|b&weird&2&0|c&stopped&x&0|d&stopped&4&0", &clock());

        assert_eq!(
            decoded
                .projects
                .iter()
                .map(|p| (p.name(), p.accumulated_ms()))
                .collect::<Vec<_>>(),
            vec![("a", 1), ("d", 4)]
        );
        assert_eq!(
            decoded
                .rejected
                .iter()
                .map(|r| (r.index, r.raw.as_str()))
                .collect::<Vec<_>>(),
            vec![(1, "b&weird&2&0"), (2, "c&stopped&x&0")]
        );
    }
}

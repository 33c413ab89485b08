//! Parsing of `pacmd list-sink-inputs` output.

use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;
use tracing::warn;

/// A sink input as seen by PulseAudio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkInput {
    pub index: String,
    /// `None` when the listing shows something other than `yes` or `no`.
    pub muted: Option<bool>,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?: index|muted|application\.process\.id).*?(\w+)")
            .expect("sink marker pattern is valid")
    })
}

/// Groups the `index`, `muted` and `application.process.id` markers of the
/// listing into sink inputs keyed by owning process id.
///
/// Markers come in triples; any other count means the listing was not what
/// we expect and nothing is returned.
pub fn parse_sink_inputs(output: &str) -> FxHashMap<String, SinkInput> {
    let values: Vec<&str> = marker_pattern()
        .captures_iter(output)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if values.len() % 3 != 0 {
        warn!(
            "Malformed sink listing: {} markers is not a multiple of three",
            values.len()
        );
        return FxHashMap::default();
    }

    values
        .chunks_exact(3)
        .map(|triple| {
            (
                triple[2].to_string(),
                SinkInput {
                    index: triple[0].to_string(),
                    muted: parse_flag(triple[1]),
                },
            )
        })
        .collect()
}

/// The sink input belonging to any of `pids`, in pid order.
pub fn find_target<'a>(
    inputs: &'a FxHashMap<String, SinkInput>,
    pids: &[&str],
) -> Option<&'a SinkInput> {
    pids.iter().find_map(|pid| inputs.get(*pid))
}
